//! Serializers for the payload of one value.
//!
//! A serializer never writes the reference flag or the class id of its value,
//! those belong to the caller, see [`refs`](crate::refs).

use evo_meta::Value;

use crate::refs::RefSlot;
use crate::{CodecError, ReadContext, WriteContext};

// -----------------------------------------------------------------------------
// Modules

mod collection;
mod enumeration;
mod map;
mod primitive;
mod string;

// -----------------------------------------------------------------------------
// Exports

pub use collection::CollectionSerializer;
pub use enumeration::EnumSerializer;
pub use map::MapSerializer;
pub use primitive::PrimitiveSerializer;
pub use string::StringSerializer;

// -----------------------------------------------------------------------------
// Serializer

/// Writes and reads the payload of values of one class.
///
/// Implementations that create shared values (objects and containers) must
/// bind `slot` with [`ReadContext::bind`] before reading nested values, so a
/// nested back-reference to the value being read resolves.
pub trait Serializer: Send + Sync {
    fn write(&self, ctx: &mut WriteContext<'_>, value: &Value) -> Result<(), CodecError>;

    fn read(&self, ctx: &mut ReadContext<'_>, slot: RefSlot) -> Result<Value, CodecError>;
}
