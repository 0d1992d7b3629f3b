#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![no_std]

pub use evo_buffer as buffer;
pub use evo_codec as codec;
pub use evo_meta as meta;
pub use evo_utils as utils;
