use evo_meta::{PrimitiveKind, Value};

use super::Serializer;
use crate::refs::RefSlot;
use crate::{CodecError, Config, ReadContext, WriteContext};

/// Fixed-size scalars. `i32` and `i64` honor the compression flags.
#[derive(Debug, Clone, Copy)]
pub struct PrimitiveSerializer(pub PrimitiveKind);

impl PrimitiveSerializer {
    pub(crate) fn write_raw(
        kind: PrimitiveKind,
        config: &Config,
        w: &mut evo_buffer::Writer,
        value: &Value,
    ) -> Result<(), CodecError> {
        match (kind, value) {
            (PrimitiveKind::Bool, Value::Bool(v)) => w.write_bool(*v),
            (PrimitiveKind::I8, Value::I8(v)) => w.write_i8(*v),
            (PrimitiveKind::I16, Value::I16(v)) => w.write_i16(*v),
            (PrimitiveKind::I32, Value::I32(v)) if config.compress_int => w.write_var_i32(*v),
            (PrimitiveKind::I32, Value::I32(v)) => w.write_i32(*v),
            (PrimitiveKind::I64, Value::I64(v)) if config.compress_long => w.write_var_i64(*v),
            (PrimitiveKind::I64, Value::I64(v)) => w.write_i64(*v),
            (PrimitiveKind::F32, Value::F32(v)) => w.write_f32(*v),
            (PrimitiveKind::F64, Value::F64(v)) => w.write_f64(*v),
            _ => return Err(CodecError::mismatch(kind.name(), value)),
        }
        Ok(())
    }

    pub(crate) fn read_raw(
        kind: PrimitiveKind,
        config: &Config,
        r: &mut evo_buffer::Reader<'_>,
    ) -> Result<Value, CodecError> {
        Ok(match kind {
            PrimitiveKind::Bool => Value::Bool(r.read_bool()?),
            PrimitiveKind::I8 => Value::I8(r.read_i8()?),
            PrimitiveKind::I16 => Value::I16(r.read_i16()?),
            PrimitiveKind::I32 if config.compress_int => Value::I32(r.read_var_i32()?),
            PrimitiveKind::I32 => Value::I32(r.read_i32()?),
            PrimitiveKind::I64 if config.compress_long => Value::I64(r.read_var_i64()?),
            PrimitiveKind::I64 => Value::I64(r.read_i64()?),
            PrimitiveKind::F32 => Value::F32(r.read_f32()?),
            PrimitiveKind::F64 => Value::F64(r.read_f64()?),
        })
    }
}

impl Serializer for PrimitiveSerializer {
    #[inline]
    fn write(&self, ctx: &mut WriteContext<'_>, value: &Value) -> Result<(), CodecError> {
        Self::write_raw(self.0, ctx.config(), ctx.writer, value)
    }

    #[inline]
    fn read(&self, ctx: &mut ReadContext<'_>, _slot: RefSlot) -> Result<Value, CodecError> {
        Self::read_raw(self.0, ctx.config(), &mut ctx.reader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evo_buffer::{Reader, Writer};

    #[test]
    fn compression_changes_int_width() {
        let packed = Config::default();
        let fixed = Config::default().with_number_compression(false);

        let mut w = Writer::new();
        PrimitiveSerializer::write_raw(PrimitiveKind::I32, &packed, &mut w, &Value::I32(5)).unwrap();
        assert_eq!(w.len(), 1);
        PrimitiveSerializer::write_raw(PrimitiveKind::I64, &fixed, &mut w, &Value::I64(5)).unwrap();
        assert_eq!(w.len(), 9);

        let bytes = w.into_vec();
        let mut r = Reader::new(&bytes);
        assert_eq!(PrimitiveSerializer::read_raw(PrimitiveKind::I32, &packed, &mut r).unwrap(), Value::I32(5));
        assert_eq!(PrimitiveSerializer::read_raw(PrimitiveKind::I64, &fixed, &mut r).unwrap(), Value::I64(5));
    }

    #[test]
    fn wrong_value_kind() {
        let mut w = Writer::new();
        let err = PrimitiveSerializer::write_raw(PrimitiveKind::F64, &Config::default(), &mut w, &Value::I32(1));
        assert!(matches!(err, Err(CodecError::TypeMismatch { found: "i32", .. })));
        assert!(w.is_empty());
    }
}
