#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![no_std]

// -----------------------------------------------------------------------------
// No STD Support

extern crate alloc;

// -----------------------------------------------------------------------------
// Modules

mod binding;
mod config;
mod context;
mod engine;
mod error;
mod generics;
mod resolver;

pub mod grouper;
pub mod object;
pub mod refs;
pub mod serializer;
pub mod tags;

#[cfg(test)]
mod tests;

// -----------------------------------------------------------------------------
// Top-level exports

pub use config::{Config, Mode};
pub use context::{ReadContext, WriteContext};
pub use engine::{Engine, EngineBuilder};
pub use error::CodecError;
pub use generics::Generics;
pub use resolver::{ClassInfo, ClassResolver};
