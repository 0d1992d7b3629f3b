//! How a value of a declared type is laid out inside an object or container.

use evo_meta::registry::{TypeRegistry, UserType, class_id};
use evo_meta::{FieldType, PrimitiveKind, Value};

use crate::refs::{ReadRef, RefSlot, read_null_flag, write_null_flag};
use crate::serializer::PrimitiveSerializer;
use crate::{ClassInfo, CodecError, ReadContext, WriteContext};

// -----------------------------------------------------------------------------
// FieldRoute

/// Wire layout of a value, decided once from its declared type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FieldRoute {
    /// Raw bytes, never null.
    Primitive(PrimitiveKind),
    /// Null flag, then the payload of the class. Boxed, strings and enums.
    Nullable(u32),
    /// Reference flag, then the payload of a monomorphic class.
    Final(u32),
    /// Reference flag, then the container payload with `ty` pushed as generics.
    Container(FieldType),
    /// Reference flag, runtime class id, then its payload.
    Dynamic,
}

impl FieldRoute {
    pub(crate) fn of(ty: &FieldType, registry: &TypeRegistry) -> Result<Self, CodecError> {
        Ok(match ty {
            FieldType::Primitive(kind) => Self::Primitive(*kind),
            FieldType::Boxed(kind) => Self::Nullable(kind.type_id() + class_id::BOXED_OFFSET),
            FieldType::String => Self::Nullable(class_id::STRING),
            FieldType::Enum(name) => match registry.enum_def(name).and(registry.class_id_of(ty)) {
                Some(id) => Self::Nullable(id),
                None => return Err(CodecError::UnregisteredClass(name.clone())),
            },
            FieldType::Struct(_) if registry.is_monomorphic(ty) => {
                match registry.class_id_of(ty) {
                    Some(id) => Self::Final(id),
                    None => Self::Dynamic,
                }
            }
            FieldType::List(_) | FieldType::Set(_) | FieldType::Map(..) => {
                Self::Container(ty.clone())
            }
            FieldType::Struct(_) | FieldType::Any => Self::Dynamic,
        })
    }

    /// Layout of a field whose class id is embedded in its tag.
    pub(crate) fn for_class_id(id: u32, registry: &TypeRegistry) -> Result<Self, CodecError> {
        if let Some(kind) = PrimitiveKind::from_type_id(id) {
            return Ok(Self::Primitive(kind));
        }
        if (class_id::BOXED_BOOL..=class_id::BOXED_F64).contains(&id) || id == class_id::STRING {
            return Ok(Self::Nullable(id));
        }
        match registry.get(id) {
            Some(UserType::Enum(_)) => Ok(Self::Nullable(id)),
            Some(UserType::Class(_)) => Ok(Self::Final(id)),
            None => Err(CodecError::UnknownClassId(id)),
        }
    }
}

// -----------------------------------------------------------------------------
// Write

pub(crate) fn write_routed(
    ctx: &mut WriteContext<'_>,
    route: &FieldRoute,
    value: &Value,
) -> Result<(), CodecError> {
    match route {
        FieldRoute::Primitive(kind) => {
            PrimitiveSerializer::write_raw(*kind, ctx.config(), ctx.writer, value)
        }
        FieldRoute::Nullable(id) => {
            if write_null_flag(ctx.writer, value) {
                return Ok(());
            }
            let info = ctx.resolver().info(*id)?;
            info.serializer.write(ctx, value)
        }
        FieldRoute::Final(id) => {
            if ctx.write_ref_or_null(value) {
                return Ok(());
            }
            let info = ctx.resolver().info(*id)?;
            ctx.enter()?;
            info.serializer.write(ctx, value)?;
            ctx.leave();
            Ok(())
        }
        FieldRoute::Container(ty) => {
            if ctx.write_ref_or_null(value) {
                return Ok(());
            }
            let info = ctx.resolver().container_info(ty)?;
            write_container(ctx, info, ty.clone(), value)
        }
        FieldRoute::Dynamic => write_any(ctx, value),
    }
}

/// Writes any value with its reference flag and runtime class id.
pub(crate) fn write_any(ctx: &mut WriteContext<'_>, value: &Value) -> Result<(), CodecError> {
    if let Some(substitute) = write_replacement(ctx, value)? {
        write_any_as_is(ctx, &substitute)?;
        ctx.refs.replace_ref(value, &substitute);
        return Ok(());
    }
    write_any_as_is(ctx, value)
}

fn write_any_as_is(ctx: &mut WriteContext<'_>, value: &Value) -> Result<(), CodecError> {
    if ctx.write_ref_or_null(value) {
        return Ok(());
    }
    let info = ctx.resolver().info_of_value(value)?;
    ctx.writer.write_var_u32(info.id);
    write_payload(ctx, info, value)
}

/// Payload of a value whose class is already on the wire.
pub(crate) fn write_payload(
    ctx: &mut WriteContext<'_>,
    info: &ClassInfo,
    value: &Value,
) -> Result<(), CodecError> {
    if info.ty.is_container() {
        return write_container(ctx, info, info.ty.clone(), value);
    }
    ctx.enter()?;
    info.serializer.write(ctx, value)?;
    ctx.leave();
    Ok(())
}

pub(crate) fn write_container(
    ctx: &mut WriteContext<'_>,
    info: &ClassInfo,
    ty: FieldType,
    value: &Value,
) -> Result<(), CodecError> {
    ctx.enter()?;
    ctx.generics.push(ty);
    let result = info.serializer.write(ctx, value);
    ctx.generics.pop();
    ctx.leave();
    result
}

/// Substitute for an object whose class has a write-replace hook, unless the
/// object was already written in this call.
///
/// Hooks are applied until the substitute has no hook, keeps the class of
/// the object it replaces, or was already written. The substitute is then
/// written as is. A chain longer than `max_depth` is [`CodecError::DepthExceeded`].
pub(crate) fn write_replacement(
    ctx: &mut WriteContext<'_>,
    value: &Value,
) -> Result<Option<Value>, CodecError> {
    let registry = ctx.resolver().registry();
    let max_depth = ctx.config().max_depth;
    let mut replaced: Option<Value> = None;
    let mut hops = 0;
    loop {
        let current = replaced.as_ref().unwrap_or(value);
        let Value::Object(obj) = current else {
            break;
        };
        if ctx.refs.written_id(current).is_some() {
            break;
        }
        let obj = obj.try_borrow().map_err(|_| CodecError::ObjectBorrowed)?;
        let Some(hook) = registry.class(obj.class_name()).and_then(|def| def.write_replace()) else {
            break;
        };
        let substitute = hook(&*obj);
        if substitute.ptr_eq(current) {
            break;
        }
        let same_class = match &substitute {
            Value::Object(sub) => sub.try_borrow().is_ok_and(|sub| sub.class_name() == obj.class_name()),
            _ => false,
        };
        drop(obj);
        replaced = Some(substitute);
        if same_class {
            break;
        }
        hops += 1;
        if hops > max_depth {
            return Err(CodecError::DepthExceeded(max_depth));
        }
    }
    Ok(replaced)
}

// -----------------------------------------------------------------------------
// Read

pub(crate) fn read_routed(ctx: &mut ReadContext<'_>, route: &FieldRoute) -> Result<Value, CodecError> {
    match route {
        FieldRoute::Primitive(kind) => {
            PrimitiveSerializer::read_raw(*kind, ctx.config(), &mut ctx.reader)
        }
        FieldRoute::Nullable(id) => {
            if read_null_flag(&mut ctx.reader)? {
                return Ok(Value::Null);
            }
            let info = ctx.resolver().info(*id)?;
            info.serializer.read(ctx, RefSlot::NONE)
        }
        FieldRoute::Final(id) => match ctx.refs.try_preserve_ref_id(&mut ctx.reader)? {
            ReadRef::Null => Ok(Value::Null),
            ReadRef::Existing(value) => Ok(value),
            ReadRef::New(slot) => {
                let info = ctx.resolver().info(*id)?;
                ctx.enter()?;
                let value = info.serializer.read(ctx, slot)?;
                ctx.leave();
                Ok(value)
            }
        },
        FieldRoute::Container(ty) => match ctx.refs.try_preserve_ref_id(&mut ctx.reader)? {
            ReadRef::Null => Ok(Value::Null),
            ReadRef::Existing(value) => Ok(value),
            ReadRef::New(slot) => {
                let info = ctx.resolver().container_info(ty)?;
                read_container(ctx, info, ty.clone(), slot)
            }
        },
        FieldRoute::Dynamic => read_any(ctx),
    }
}

/// Reads a value written by [`write_any`].
pub(crate) fn read_any(ctx: &mut ReadContext<'_>) -> Result<Value, CodecError> {
    match ctx.refs.try_preserve_ref_id(&mut ctx.reader)? {
        ReadRef::Null => Ok(Value::Null),
        ReadRef::Existing(value) => Ok(value),
        ReadRef::New(slot) => {
            let id = ctx.reader.read_var_u32()?;
            let info = ctx.resolver().info(id)?;
            read_payload(ctx, info, slot)
        }
    }
}

pub(crate) fn read_payload(
    ctx: &mut ReadContext<'_>,
    info: &ClassInfo,
    slot: RefSlot,
) -> Result<Value, CodecError> {
    if info.ty.is_container() {
        return read_container(ctx, info, info.ty.clone(), slot);
    }
    ctx.enter()?;
    let value = info.serializer.read(ctx, slot)?;
    ctx.leave();
    Ok(value)
}

pub(crate) fn read_container(
    ctx: &mut ReadContext<'_>,
    info: &ClassInfo,
    ty: FieldType,
    slot: RefSlot,
) -> Result<Value, CodecError> {
    ctx.enter()?;
    ctx.generics.push(ty);
    let result = info.serializer.read(ctx, slot);
    ctx.generics.pop();
    ctx.leave();
    result
}
