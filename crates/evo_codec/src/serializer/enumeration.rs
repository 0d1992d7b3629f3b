use alloc::sync::Arc;

use evo_meta::{EnumDef, Value};
use log::warn;

use super::Serializer;
use crate::refs::RefSlot;
use crate::{CodecError, ReadContext, WriteContext};

/// Enum constants as a varuint32 ordinal.
#[derive(Debug, Clone)]
pub struct EnumSerializer {
    def: Arc<EnumDef>,
}

impl EnumSerializer {
    #[inline]
    pub fn new(def: Arc<EnumDef>) -> Self {
        Self { def }
    }
}

impl Serializer for EnumSerializer {
    fn write(&self, ctx: &mut WriteContext<'_>, value: &Value) -> Result<(), CodecError> {
        match value {
            Value::Enum(v) if v.enum_name == *self.def.name() => {
                ctx.writer.write_var_u32(v.ordinal);
                Ok(())
            }
            other => Err(CodecError::mismatch(&**self.def.name(), other)),
        }
    }

    fn read(&self, ctx: &mut ReadContext<'_>, _slot: RefSlot) -> Result<Value, CodecError> {
        let ordinal = ctx.reader.read_var_u32()?;
        match self.def.value_of(ordinal) {
            Some(v) => Ok(Value::Enum(v)),
            None if ctx.config().unknown_enum_as_null => {
                warn!(
                    "enum `{}` has no ordinal {ordinal}, reading it as null",
                    self.def.name()
                );
                Ok(Value::Null)
            }
            None => Err(CodecError::UnknownEnumValue {
                enum_name: self.def.name().clone(),
                ordinal,
            }),
        }
    }
}
