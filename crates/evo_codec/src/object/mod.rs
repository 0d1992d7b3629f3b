//! Codecs for instances of registered classes.
//!
//! [`ExactCodec`] assumes both sides share the class layout, [`CompatibleCodec`]
//! tolerates added and removed fields. Both read every field value through
//! the same per-type layout, see [`FieldRoute`](crate::binding::FieldRoute).

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;

use evo_meta::registry::TypeRegistry;
use evo_meta::{ClassDef, Construction, Descriptor, FieldAccessor, MetaError, ObjectRef, Value};
use log::debug;

use crate::binding::FieldRoute;
use crate::refs::RefSlot;
use crate::serializer::Serializer;
use crate::{CodecError, Config, Mode, ReadContext, WriteContext};

// -----------------------------------------------------------------------------
// Modules

mod compatible;
mod exact;

// -----------------------------------------------------------------------------
// Exports

pub use compatible::CompatibleCodec;
pub use exact::{ExactCodec, class_version_hash};

// -----------------------------------------------------------------------------
// ObjectCodec

/// The codec of one class, chosen by [`Config::mode`].
#[derive(Debug)]
pub enum ObjectCodec {
    Exact(ExactCodec),
    Compatible(CompatibleCodec),
}

impl ObjectCodec {
    /// Build the codec of `def`. Fails when the class cannot be constructed
    /// or two of its fields share a tag.
    pub fn new(def: Arc<ClassDef>, registry: &TypeRegistry, config: &Config) -> Result<Self, CodecError> {
        let descriptors = Descriptor::collect(&def, true);
        let codec = match config.mode {
            Mode::SchemaConsistent => Self::Exact(ExactCodec::new(def, descriptors, registry, config)?),
            Mode::Compatible => Self::Compatible(CompatibleCodec::new(def, descriptors, registry)?),
        };
        debug!(
            "built {} codec for `{}` with {} fields",
            match codec {
                Self::Exact(_) => "exact",
                Self::Compatible(_) => "compatible",
            },
            codec.class().name(),
            codec.layout().fields.len(),
        );
        Ok(codec)
    }

    #[inline]
    fn layout(&self) -> &Layout {
        match self {
            Self::Exact(c) => &c.layout,
            Self::Compatible(c) => &c.layout,
        }
    }

    #[inline]
    pub fn class(&self) -> &Arc<ClassDef> {
        &self.layout().def
    }

    /// Read the fields of the next object into `obj`, which an outer codec
    /// already allocated.
    pub fn read_and_set_fields(&self, ctx: &mut ReadContext<'_>, obj: &ObjectRef) -> Result<(), CodecError> {
        let mut target = Target::Object(obj.clone());
        match self {
            Self::Exact(c) => c.read_fields(ctx, &mut target),
            Self::Compatible(c) => c.read_fields(ctx, &mut target),
        }
    }
}

impl Serializer for ObjectCodec {
    fn write(&self, ctx: &mut WriteContext<'_>, value: &Value) -> Result<(), CodecError> {
        match self {
            Self::Exact(c) => c.write(ctx, value),
            Self::Compatible(c) => c.write(ctx, value),
        }
    }

    fn read(&self, ctx: &mut ReadContext<'_>, slot: RefSlot) -> Result<Value, CodecError> {
        match self {
            Self::Exact(c) => c.read(ctx, slot),
            Self::Compatible(c) => c.read(ctx, slot),
        }
    }
}

// -----------------------------------------------------------------------------
// Layout

/// A field with its wire layout, decided when the codec is built.
#[derive(Debug)]
pub(crate) struct ResolvedField {
    pub descriptor: Descriptor,
    pub route: FieldRoute,
}

/// Where read field values go.
pub(crate) enum Target {
    /// Fields are assigned as soon as they are read.
    Object(ObjectRef),
    /// Values are collected by field position and passed to the record
    /// constructor once complete.
    Record(Vec<Value>),
}

/// Field order and construction of a class, shared by both codecs.
#[derive(Debug)]
pub(crate) struct Layout {
    pub def: Arc<ClassDef>,
    pub fields: Vec<ResolvedField>,
    /// Record parameter index to field position.
    record_params: Option<Box<[usize]>>,
}

impl Layout {
    pub fn new(def: Arc<ClassDef>, ordered: Vec<Descriptor>, registry: &TypeRegistry) -> Result<Self, CodecError> {
        let fields = ordered
            .into_iter()
            .map(|descriptor| {
                let route = FieldRoute::of(descriptor.ty(), registry)?;
                Ok(ResolvedField { descriptor, route })
            })
            .collect::<Result<Vec<_>, CodecError>>()?;

        let record_params = match def.construction() {
            Construction::None => return Err(CodecError::MissingConstructor(def.name().clone())),
            // Dynamic instances only hold slots.
            Construction::Dynamic => {
                let custom = fields
                    .iter()
                    .any(|f| matches!(f.descriptor.accessor(), Some(FieldAccessor::Custom(_))));
                if custom {
                    return Err(CodecError::MissingConstructor(def.name().clone()));
                }
                None
            }
            Construction::Factory(_) => None,
            Construction::Record { params, .. } => {
                let positions = params
                    .iter()
                    .map(|param| {
                        fields
                            .iter()
                            .rposition(|f| f.descriptor.name() == param)
                            .ok_or_else(|| MetaError::UnknownField {
                                class: def.name().clone(),
                                field: param.clone(),
                            })
                    })
                    .collect::<Result<Box<[usize]>, MetaError>>()?;
                Some(positions)
            }
        };

        Ok(Self {
            def,
            fields,
            record_params,
        })
    }

    /// Current field values of `value`, in layout order. Fields without
    /// accessor contribute their type default.
    pub fn values_of(&self, value: &Value) -> Result<Vec<Value>, CodecError> {
        let Value::Object(obj) = value else {
            return Err(CodecError::mismatch(&**self.def.name(), value));
        };
        let obj = obj.try_borrow().map_err(|_| CodecError::ObjectBorrowed)?;
        if obj.class_name() != &**self.def.name() {
            return Err(CodecError::mismatch(&**self.def.name(), value));
        }
        self.fields
            .iter()
            .map(|f| match f.descriptor.accessor() {
                Some(acc) => Ok(acc.get(&*obj)?),
                None => Ok(f.descriptor.ty().default_value()),
            })
            .collect()
    }

    /// Allocate the instance of a non-record class and bind it, or prepare
    /// the value buffer of a record.
    pub fn begin_read(&self, ctx: &mut ReadContext<'_>, slot: RefSlot) -> Result<Target, CodecError> {
        if self.record_params.is_some() {
            let defaults = self.fields.iter().map(|f| f.descriptor.ty().default_value()).collect();
            return Ok(Target::Record(defaults));
        }
        let obj = self.def.instantiate()?;
        ctx.bind(slot, &Value::Object(obj.clone()));
        Ok(Target::Object(obj))
    }

    pub fn assign(&self, target: &mut Target, pos: usize, value: Value) -> Result<(), CodecError> {
        match target {
            Target::Record(values) => {
                if let Some(entry) = values.get_mut(pos) {
                    *entry = value;
                }
                Ok(())
            }
            Target::Object(obj) => {
                let Some(accessor) = self.fields.get(pos).and_then(|f| f.descriptor.accessor()) else {
                    return Ok(());
                };
                let mut obj = obj.try_borrow_mut().map_err(|_| CodecError::ObjectBorrowed)?;
                Ok(accessor.set(&mut *obj, value)?)
            }
        }
    }

    /// Construct a record from its collected values and bind it.
    pub fn finish(&self, ctx: &mut ReadContext<'_>, target: Target, slot: RefSlot) -> Result<Value, CodecError> {
        match (target, &self.record_params) {
            (Target::Object(obj), _) => Ok(Value::Object(obj)),
            (Target::Record(mut values), Some(params)) => {
                let args = params.iter().map(|&pos| core::mem::take(&mut values[pos])).collect();
                let value = Value::Object(self.def.construct(args)?);
                ctx.bind(slot, &value);
                Ok(value)
            }
            (Target::Record(_), None) => Err(CodecError::MissingConstructor(self.def.name().clone())),
        }
    }
}
