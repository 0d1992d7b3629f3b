use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;

use evo_meta::Value;

use super::Serializer;
use crate::binding::{FieldRoute, read_routed, write_routed};
use crate::refs::RefSlot;
use crate::{CodecError, ReadContext, WriteContext};

/// Lists and sets: a varuint32 length, then every element.
///
/// Elements follow the element type on top of the generics stack. Elements
/// of a monomorphic type are written without class id, elements of any other
/// type carry their own.
#[derive(Debug, Clone, Copy)]
pub struct CollectionSerializer {
    set: bool,
}

impl CollectionSerializer {
    pub const LIST: Self = Self { set: false };
    pub const SET: Self = Self { set: true };
}

impl Serializer for CollectionSerializer {
    fn write(&self, ctx: &mut WriteContext<'_>, value: &Value) -> Result<(), CodecError> {
        let items = match (self.set, value) {
            (false, Value::List(items)) | (true, Value::Set(items)) => items,
            (false, other) => return Err(CodecError::mismatch("List", other)),
            (true, other) => return Err(CodecError::mismatch("Set", other)),
        };
        let route = FieldRoute::of(&ctx.generics.element(), ctx.resolver().registry())?;

        let items = items.try_borrow().map_err(|_| CodecError::ObjectBorrowed)?;
        ctx.writer.write_var_u32(items.len() as u32);
        for item in items.iter() {
            write_routed(ctx, &route, item)?;
        }
        Ok(())
    }

    fn read(&self, ctx: &mut ReadContext<'_>, slot: RefSlot) -> Result<Value, CodecError> {
        let route = FieldRoute::of(&ctx.generics.element(), ctx.resolver().registry())?;
        let len = ctx.reader.read_var_u32()? as usize;

        // Every element takes at least one byte.
        let items = Rc::new(RefCell::new(Vec::with_capacity(len.min(ctx.reader.remaining()))));
        let value = if self.set {
            Value::Set(items.clone())
        } else {
            Value::List(items.clone())
        };
        ctx.bind(slot, &value);

        for _ in 0..len {
            let item = read_routed(ctx, &route)?;
            items.borrow_mut().push(item);
        }
        Ok(value)
    }
}
