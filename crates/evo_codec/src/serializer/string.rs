use alloc::string::String;

use evo_meta::Value;

use super::Serializer;
use crate::refs::RefSlot;
use crate::{CodecError, ReadContext, WriteContext};

/// UTF-8 with a varuint32 byte length.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringSerializer;

impl Serializer for StringSerializer {
    fn write(&self, ctx: &mut WriteContext<'_>, value: &Value) -> Result<(), CodecError> {
        match value {
            Value::Str(s) => {
                ctx.writer.write_str(s);
                Ok(())
            }
            other => Err(CodecError::mismatch("String", other)),
        }
    }

    fn read(&self, ctx: &mut ReadContext<'_>, _slot: RefSlot) -> Result<Value, CodecError> {
        Ok(Value::Str(String::from(ctx.reader.read_str()?)))
    }
}
