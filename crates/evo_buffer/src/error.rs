use thiserror::Error;

/// Failures while decoding from a [`Reader`](crate::Reader).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum BufferError {
    #[error("unexpected end of buffer: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof { needed: usize, remaining: usize },

    #[error("varint at offset {offset} is longer than {max_bytes} bytes")]
    VarintOverflow { offset: usize, max_bytes: usize },

    #[error("invalid utf-8 string at offset {offset}")]
    InvalidUtf8 { offset: usize },
}
