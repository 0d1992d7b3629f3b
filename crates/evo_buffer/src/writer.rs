use alloc::vec::Vec;

use crate::{zigzag_encode_i32, zigzag_encode_i64};

// -----------------------------------------------------------------------------
// Writer

/// Growable output buffer.
///
/// # Examples
///
/// ```
/// use evo_buffer::Writer;
///
/// let mut w = Writer::new();
/// w.write_i32(1);
/// w.write_var_u32(300);
/// assert_eq!(w.as_slice(), &[1, 0, 0, 0, 0xAC, 0x02]);
/// ```
#[derive(Debug, Default, Clone)]
pub struct Writer {
    buf: Vec<u8>,
}

macro_rules! write_le {
    ($($name:ident: $ty:ty),* $(,)?) => {
        $(
            #[doc = concat!("Append a little-endian `", stringify!($ty), "`.")]
            #[inline]
            pub fn $name(&mut self, v: $ty) {
                self.buf.extend_from_slice(&v.to_le_bytes());
            }
        )*
    };
}

impl Writer {
    #[inline]
    pub const fn new() -> Self {
        Self { buf: Vec::new() }
    }

    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Number of bytes written so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    #[inline]
    pub fn into_vec(self) -> Vec<u8> {
        self.buf
    }

    /// Drop the content but keep the allocation.
    #[inline]
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    #[inline]
    pub fn reserve(&mut self, additional: usize) {
        self.buf.reserve(additional);
    }

    #[inline]
    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    #[inline]
    pub fn write_i8(&mut self, v: i8) {
        self.buf.push(v as u8);
    }

    #[inline]
    pub fn write_bool(&mut self, v: bool) {
        self.buf.push(v as u8);
    }

    write_le! {
        write_u16: u16,
        write_i16: i16,
        write_u32: u32,
        write_i32: i32,
        write_u64: u64,
        write_i64: i64,
        write_f32: f32,
        write_f64: f64,
    }

    /// Append an unsigned LEB128 value, 1 to 5 bytes.
    pub fn write_var_u32(&mut self, mut v: u32) {
        while v >= 0x80 {
            self.buf.push((v as u8) | 0x80);
            v >>= 7;
        }
        self.buf.push(v as u8);
    }

    /// Append an unsigned LEB128 value, 1 to 10 bytes.
    pub fn write_var_u64(&mut self, mut v: u64) {
        while v >= 0x80 {
            self.buf.push((v as u8) | 0x80);
            v >>= 7;
        }
        self.buf.push(v as u8);
    }

    /// Zig-zag then LEB128.
    #[inline]
    pub fn write_var_i32(&mut self, v: i32) {
        self.write_var_u32(zigzag_encode_i32(v));
    }

    /// Zig-zag then LEB128.
    #[inline]
    pub fn write_var_i64(&mut self, v: i64) {
        self.write_var_u64(zigzag_encode_i64(v));
    }

    #[inline]
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Length-prefixed (varuint32) UTF-8 string.
    ///
    /// Strings longer than `u32::MAX` bytes are not representable on the wire.
    pub fn write_str(&mut self, s: &str) {
        self.write_var_u32(s.len() as u32);
        self.buf.extend_from_slice(s.as_bytes());
    }
}
