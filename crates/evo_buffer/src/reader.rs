use crate::{BufferError, zigzag_decode_i32, zigzag_decode_i64};

// -----------------------------------------------------------------------------
// Reader

/// Cursor over a borrowed byte slice.
///
/// Every read checks the remaining length and returns
/// [`BufferError::UnexpectedEof`] instead of reading past the end.
///
/// # Examples
///
/// ```
/// use evo_buffer::{Reader, Writer};
///
/// let mut w = Writer::new();
/// w.write_var_i32(-300);
/// w.write_str("evo");
///
/// let bytes = w.into_vec();
/// let mut r = Reader::new(&bytes);
/// assert_eq!(r.read_var_i32(), Ok(-300));
/// assert_eq!(r.read_str(), Ok("evo"));
/// assert!(r.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

macro_rules! read_le {
    ($($name:ident: $ty:ty),* $(,)?) => {
        $(
            #[doc = concat!("Read a little-endian `", stringify!($ty), "`.")]
            #[inline]
            pub fn $name(&mut self) -> Result<$ty, BufferError> {
                let bytes = self.take(size_of::<$ty>())?;
                let mut arr = [0_u8; size_of::<$ty>()];
                arr.copy_from_slice(bytes);
                Ok(<$ty>::from_le_bytes(arr))
            }
        )*
    };
}

impl<'a> Reader<'a> {
    #[inline]
    pub const fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Current cursor offset.
    #[inline]
    pub const fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub const fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], BufferError> {
        let remaining = self.remaining();
        if len > remaining {
            return Err(BufferError::UnexpectedEof {
                needed: len,
                remaining,
            });
        }
        let start = self.pos;
        self.pos += len;
        Ok(&self.buf[start..self.pos])
    }

    /// Look at the next byte without consuming it.
    #[inline]
    pub fn peek_u8(&self) -> Result<u8, BufferError> {
        self.buf
            .get(self.pos)
            .copied()
            .ok_or(BufferError::UnexpectedEof {
                needed: 1,
                remaining: 0,
            })
    }

    #[inline]
    pub fn read_u8(&mut self) -> Result<u8, BufferError> {
        let v = self.peek_u8()?;
        self.pos += 1;
        Ok(v)
    }

    #[inline]
    pub fn read_i8(&mut self) -> Result<i8, BufferError> {
        self.read_u8().map(|v| v as i8)
    }

    /// Any non-zero byte is `true`.
    #[inline]
    pub fn read_bool(&mut self) -> Result<bool, BufferError> {
        self.read_u8().map(|v| v != 0)
    }

    read_le! {
        read_u16: u16,
        read_i16: i16,
        read_u32: u32,
        read_i32: i32,
        read_u64: u64,
        read_i64: i64,
        read_f32: f32,
        read_f64: f64,
    }

    pub fn read_var_u32(&mut self) -> Result<u32, BufferError> {
        let offset = self.pos;
        let mut result = 0_u32;
        for i in 0..5 {
            let byte = self.read_u8()?;
            result |= ((byte & 0x7F) as u32) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(result);
            }
        }
        Err(BufferError::VarintOverflow {
            offset,
            max_bytes: 5,
        })
    }

    pub fn read_var_u64(&mut self) -> Result<u64, BufferError> {
        let offset = self.pos;
        let mut result = 0_u64;
        for i in 0..10 {
            let byte = self.read_u8()?;
            result |= ((byte & 0x7F) as u64) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(result);
            }
        }
        Err(BufferError::VarintOverflow {
            offset,
            max_bytes: 10,
        })
    }

    #[inline]
    pub fn read_var_i32(&mut self) -> Result<i32, BufferError> {
        self.read_var_u32().map(zigzag_decode_i32)
    }

    #[inline]
    pub fn read_var_i64(&mut self) -> Result<i64, BufferError> {
        self.read_var_u64().map(zigzag_decode_i64)
    }

    #[inline]
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], BufferError> {
        self.take(len)
    }

    /// Read a string written by [`Writer::write_str`](crate::Writer::write_str).
    pub fn read_str(&mut self) -> Result<&'a str, BufferError> {
        let len = self.read_var_u32()? as usize;
        let offset = self.pos;
        let bytes = self.take(len)?;
        core::str::from_utf8(bytes).map_err(|_| BufferError::InvalidUtf8 { offset })
    }

    #[inline]
    pub fn skip(&mut self, len: usize) -> Result<(), BufferError> {
        self.take(len).map(|_| ())
    }
}
