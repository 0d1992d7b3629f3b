#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![no_std]

// -----------------------------------------------------------------------------
// No STD Support

extern crate alloc;

// -----------------------------------------------------------------------------
// Modules

mod error;
mod reader;
mod writer;

// -----------------------------------------------------------------------------
// Top-level exports

pub use error::BufferError;
pub use reader::Reader;
pub use writer::Writer;

/// Maps a signed value onto an unsigned one so small magnitudes stay small.
#[inline(always)]
pub const fn zigzag_encode_i32(v: i32) -> u32 {
    ((v << 1) ^ (v >> 31)) as u32
}

/// Inverse of [`zigzag_encode_i32`].
#[inline(always)]
pub const fn zigzag_decode_i32(v: u32) -> i32 {
    ((v >> 1) as i32) ^ -((v & 1) as i32)
}

/// 64-bit version of [`zigzag_encode_i32`].
#[inline(always)]
pub const fn zigzag_encode_i64(v: i64) -> u64 {
    ((v << 1) ^ (v >> 63)) as u64
}

/// Inverse of [`zigzag_encode_i64`].
#[inline(always)]
pub const fn zigzag_decode_i64(v: u64) -> i64 {
    ((v >> 1) as i64) ^ -((v & 1) as i64)
}
