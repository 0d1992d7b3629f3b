#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![no_std]

// -----------------------------------------------------------------------------
// No STD Support

extern crate alloc;

// -----------------------------------------------------------------------------
// Modules

mod accessor;
mod class;
mod descriptor;
mod error;
mod field_type;
mod instance;
mod value;

pub mod registry;

// -----------------------------------------------------------------------------
// Top-level exports

pub use accessor::{FieldAccessor, FieldValue};
pub use class::{ClassBuilder, ClassDef, Construction, EnumDef, FieldDef};
pub use class::{FactoryFn, RecordFn, WriteReplaceFn};
pub use descriptor::Descriptor;
pub use error::MetaError;
pub use field_type::{FieldType, PrimitiveKind};
pub use instance::{DynamicObject, Instance, new_object};
pub use registry::TypeRegistry;
pub use value::{EnumValue, ListRef, MapRef, ObjectRef, Value};
