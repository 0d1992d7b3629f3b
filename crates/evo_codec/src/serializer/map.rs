use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;

use evo_meta::Value;

use super::Serializer;
use crate::binding::{FieldRoute, read_routed, write_routed};
use crate::refs::RefSlot;
use crate::{CodecError, ReadContext, WriteContext};

/// Maps: a varuint32 entry count, then key and value of every entry, each
/// following the key or value type on top of the generics stack.
#[derive(Debug, Clone, Copy, Default)]
pub struct MapSerializer;

impl Serializer for MapSerializer {
    fn write(&self, ctx: &mut WriteContext<'_>, value: &Value) -> Result<(), CodecError> {
        let Value::Map(entries) = value else {
            return Err(CodecError::mismatch("Map", value));
        };
        let (key_ty, value_ty) = ctx.generics.entry();
        let registry = ctx.resolver().registry();
        let key_route = FieldRoute::of(&key_ty, registry)?;
        let value_route = FieldRoute::of(&value_ty, registry)?;

        let entries = entries.try_borrow().map_err(|_| CodecError::ObjectBorrowed)?;
        ctx.writer.write_var_u32(entries.len() as u32);
        for (k, v) in entries.iter() {
            write_routed(ctx, &key_route, k)?;
            write_routed(ctx, &value_route, v)?;
        }
        Ok(())
    }

    fn read(&self, ctx: &mut ReadContext<'_>, slot: RefSlot) -> Result<Value, CodecError> {
        let (key_ty, value_ty) = ctx.generics.entry();
        let registry = ctx.resolver().registry();
        let key_route = FieldRoute::of(&key_ty, registry)?;
        let value_route = FieldRoute::of(&value_ty, registry)?;
        let len = ctx.reader.read_var_u32()? as usize;

        let entries = Rc::new(RefCell::new(Vec::with_capacity(len.min(ctx.reader.remaining() / 2))));
        let value = Value::Map(entries.clone());
        ctx.bind(slot, &value);

        for _ in 0..len {
            let k = read_routed(ctx, &key_route)?;
            let v = read_routed(ctx, &value_route)?;
            entries.borrow_mut().push((k, v));
        }
        Ok(value)
    }
}
