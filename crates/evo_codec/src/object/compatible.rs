use alloc::sync::Arc;
use alloc::vec::Vec;
use core::ops::Range;

use evo_meta::registry::TypeRegistry;
use evo_meta::{ClassDef, Descriptor, FieldType, Value};
use log::{debug, trace};

use super::{Layout, Target};
use crate::binding::{
    FieldRoute, read_container, read_payload, read_routed, write_container, write_payload,
    write_replacement, write_routed,
};
use crate::refs::{ReadRef, RefSlot};
use crate::tags::{END_TAG, FieldTags, Tier, field_kind, read_tag, write_tag};
use crate::{ClassInfo, CodecError, ReadContext, WriteContext};

// -----------------------------------------------------------------------------
// CompatibleCodec

/// Writes every field behind its tag and ends the object with
/// [`END_TAG`], so readers with a different field set can skip unknown
/// fields and default missing ones.
///
/// Fields go out tier by tier, ascending by tag inside a tier. Reading
/// merges the stream with the local, identically sorted, tag list.
#[derive(Debug)]
pub struct CompatibleCodec {
    pub(super) layout: Layout,
    /// Tag of every layout field.
    tags: Vec<i64>,
    /// Kind byte of every layout field.
    kinds: Vec<u8>,
    /// Layout positions of every tier.
    tiers: [Range<usize>; 4],
}

impl CompatibleCodec {
    pub(super) fn new(
        def: Arc<ClassDef>,
        descriptors: Vec<Descriptor>,
        registry: &TypeRegistry,
    ) -> Result<Self, CodecError> {
        let field_tags = FieldTags::build(def.name(), descriptors, registry)?;

        let mut tiers: [Range<usize>; 4] = Default::default();
        let mut start = 0;
        for tier in Tier::ALL {
            let end = start + field_tags.tier(tier).len();
            tiers[tier.index()] = start..end;
            start = end;
        }
        let tags = field_tags.iter().map(|f| f.tag).collect();
        let kinds = field_tags.iter().map(|f| f.kind).collect();
        let ordered = field_tags.iter().map(|f| f.descriptor.clone()).collect();

        Ok(Self {
            layout: Layout::new(def, ordered, registry)?,
            tags,
            kinds,
            tiers,
        })
    }

    /// Fields and their tags in wire order.
    pub fn fields(&self) -> impl Iterator<Item = (i64, &Descriptor)> {
        self.tags
            .iter()
            .copied()
            .zip(self.layout.fields.iter().map(|f| &f.descriptor))
    }

    pub(super) fn write(&self, ctx: &mut WriteContext<'_>, value: &Value) -> Result<(), CodecError> {
        let values = self.layout.values_of(value)?;
        for tier in Tier::ALL {
            for pos in self.tiers[tier.index()].clone() {
                write_tag(ctx.writer, self.tags[pos]);
                let field = &self.layout.fields[pos];
                match tier {
                    Tier::HashSeparate => write_separate(ctx, self.kinds[pos], field.descriptor.ty(), &values[pos])?,
                    _ => write_routed(ctx, &field.route, &values[pos])?,
                }
            }
        }
        write_tag(ctx.writer, END_TAG);
        Ok(())
    }

    pub(super) fn read(&self, ctx: &mut ReadContext<'_>, slot: RefSlot) -> Result<Value, CodecError> {
        let mut target = self.layout.begin_read(ctx, slot)?;
        self.read_fields(ctx, &mut target)?;
        self.layout.finish(ctx, target, slot)
    }

    pub(super) fn read_fields(&self, ctx: &mut ReadContext<'_>, target: &mut Target) -> Result<(), CodecError> {
        let mut matched = 0;
        let mut tag = read_tag(&mut ctx.reader)?;

        for tier in Tier::ALL {
            let range = self.tiers[tier.index()].clone();
            let mut pos = range.start;
            while Tier::of_tag(tag) == Some(tier) {
                while pos < range.end && self.tags[pos] < tag {
                    pos += 1;
                }
                if pos < range.end && self.tags[pos] == tag {
                    let field = &self.layout.fields[pos];
                    let value = match tier {
                        Tier::HashSeparate => read_separate(ctx)?,
                        _ => read_routed(ctx, &field.route)?,
                    };
                    // Separate tags hash only the name, a retyped field keeps its tag.
                    let declared = field.descriptor.ty();
                    if tier != Tier::HashSeparate || fits(&value, declared) {
                        self.layout.assign(target, pos, value)?;
                        matched += 1;
                    } else {
                        debug!(
                            "`{}`: stream holds a {} for `{}: {}`, left at its default",
                            self.layout.def.name(),
                            value.kind_name(),
                            field.descriptor.name(),
                            declared.type_name(),
                        );
                    }
                    pos += 1;
                } else {
                    self.skip(ctx, tier, tag)?;
                }
                tag = read_tag(&mut ctx.reader)?;
            }
        }

        // Tags out of tier order are skipped up to the end sentinel.
        while tag != END_TAG {
            let Some(tier) = Tier::of_tag(tag) else {
                return Err(CodecError::CorruptedTag {
                    class: self.layout.def.name().clone(),
                    tag,
                });
            };
            self.skip(ctx, tier, tag)?;
            tag = read_tag(&mut ctx.reader)?;
        }

        if matched < self.tags.len() {
            debug!(
                "`{}`: {} of {} fields absent from the stream, left at their defaults",
                self.layout.def.name(),
                self.tags.len() - matched,
                self.tags.len(),
            );
        }
        Ok(())
    }

    fn skip(&self, ctx: &mut ReadContext<'_>, tier: Tier, tag: i64) -> Result<(), CodecError> {
        trace!("`{}`: skipping unknown field tag {tag:#x}", self.layout.def.name());
        match tier {
            Tier::HashSeparate => read_separate(ctx)?,
            _ => {
                let route = FieldRoute::for_class_id(tier.embedded_class_id(tag), ctx.resolver().registry())?;
                read_routed(ctx, &route)?
            }
        };
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// Separately typed fields

/// Writes a field whose type is not embedded in its tag.
///
/// After the reference flag comes the field's kind byte. Container kinds
/// record the declared element, key or value class ids so a reader can
/// decode the payload without the declaring class. A runtime value that
/// is no container of the declared shape falls back to
/// [`field_kind::OBJECT`].
fn write_separate(
    ctx: &mut WriteContext<'_>,
    kind: u8,
    declared: &FieldType,
    value: &Value,
) -> Result<(), CodecError> {
    if let Some(substitute) = write_replacement(ctx, value)? {
        write_separate_as_is(ctx, kind, declared, &substitute)?;
        ctx.refs.replace_ref(value, &substitute);
        return Ok(());
    }
    write_separate_as_is(ctx, kind, declared, value)
}

fn write_separate_as_is(
    ctx: &mut WriteContext<'_>,
    kind: u8,
    declared: &FieldType,
    value: &Value,
) -> Result<(), CodecError> {
    if ctx.write_ref_or_null(value) {
        return Ok(());
    }

    let resolver = ctx.resolver();
    let registry = resolver.registry();
    let info = resolver.info_of_value(value)?;

    let typed = match (kind, declared, &info.ty) {
        (
            field_kind::COLLECTION_ELEMENT_FINAL,
            FieldType::List(elem) | FieldType::Set(elem),
            FieldType::List(_) | FieldType::Set(_),
        ) => Some((with_element(&info.ty, (**elem).clone()), [Some(&**elem), None])),
        (field_kind::MAP_KEY_FINAL, FieldType::Map(key, _), FieldType::Map(..)) => {
            Some((FieldType::map((**key).clone(), FieldType::Any), [Some(&**key), None]))
        }
        (field_kind::MAP_VALUE_FINAL, FieldType::Map(_, val), FieldType::Map(..)) => {
            Some((FieldType::map(FieldType::Any, (**val).clone()), [Some(&**val), None]))
        }
        (field_kind::MAP_KV_FINAL, FieldType::Map(key, val), FieldType::Map(..)) => {
            Some((declared.clone(), [Some(&**key), Some(&**val)]))
        }
        _ => None,
    };

    let Some((ty, declared_parts)) = typed else {
        ctx.writer.write_u8(field_kind::OBJECT);
        ctx.writer.write_var_u32(info.id);
        return write_payload(ctx, info, value);
    };
    ctx.writer.write_u8(kind);
    for part in declared_parts.into_iter().flatten() {
        let id = registry
            .class_id_of(part)
            .ok_or_else(|| CodecError::UnregisteredClass(part.type_name().into()))?;
        ctx.writer.write_var_u32(id);
    }
    ctx.writer.write_var_u32(info.id);
    write_container(ctx, info, ty, value)
}

/// Reads a value written by [`write_separate`], also used to skip one.
fn read_separate(ctx: &mut ReadContext<'_>) -> Result<Value, CodecError> {
    let slot = match ctx.refs.try_preserve_ref_id(&mut ctx.reader)? {
        ReadRef::Null => return Ok(Value::Null),
        ReadRef::Existing(value) => return Ok(value),
        ReadRef::New(slot) => slot,
    };

    let resolver = ctx.resolver();
    let kind = ctx.reader.read_u8()?;
    if kind == field_kind::OBJECT {
        let info = resolver.info(ctx.reader.read_var_u32()?)?;
        return read_payload(ctx, info, slot);
    }

    let ty = match kind {
        field_kind::COLLECTION_ELEMENT_FINAL => {
            let elem = declared_type(ctx)?;
            let info = container(resolver.info(ctx.reader.read_var_u32()?)?, kind)?;
            return read_container(ctx, info, with_element(&info.ty, elem), slot);
        }
        field_kind::MAP_KEY_FINAL => FieldType::map(declared_type(ctx)?, FieldType::Any),
        field_kind::MAP_VALUE_FINAL => FieldType::map(FieldType::Any, declared_type(ctx)?),
        field_kind::MAP_KV_FINAL => {
            let key = declared_type(ctx)?;
            FieldType::map(key, declared_type(ctx)?)
        }
        other => return Err(CodecError::FieldKindMismatch(other)),
    };
    let info = resolver.info(ctx.reader.read_var_u32()?)?;
    if !matches!(info.ty, FieldType::Map(..)) {
        return Err(CodecError::FieldKindMismatch(kind));
    }
    read_container(ctx, info, ty, slot)
}

/// Whether a decoded value can be stored in a field declared as `ty`.
///
/// Objects fit any class field, a write-replace substitute may be of an
/// unrelated class.
fn fits(value: &Value, ty: &FieldType) -> bool {
    match (ty, value) {
        (_, Value::Null) | (FieldType::Any, _) => true,
        (FieldType::Primitive(kind) | FieldType::Boxed(kind), v) => kind.matches(v),
        (FieldType::String, Value::Str(_))
        | (FieldType::List(_) | FieldType::Set(_), Value::List(_) | Value::Set(_))
        | (FieldType::Map(..), Value::Map(_))
        | (FieldType::Struct(_), Value::Object(_)) => true,
        (FieldType::Enum(name), Value::Enum(v)) => v.enum_name == *name,
        _ => false,
    }
}

/// Type behind the next class id of the kind header.
fn declared_type(ctx: &mut ReadContext<'_>) -> Result<FieldType, CodecError> {
    let id = ctx.reader.read_var_u32()?;
    ctx.resolver()
        .registry()
        .field_type_of(id)
        .ok_or(CodecError::UnknownClassId(id))
}

fn container(info: &ClassInfo, kind: u8) -> Result<&ClassInfo, CodecError> {
    match info.ty {
        FieldType::List(_) | FieldType::Set(_) => Ok(info),
        _ => Err(CodecError::FieldKindMismatch(kind)),
    }
}

/// `collection` with its element type replaced.
fn with_element(collection: &FieldType, elem: FieldType) -> FieldType {
    match collection {
        FieldType::Set(_) => FieldType::set(elem),
        _ => FieldType::list(elem),
    }
}
