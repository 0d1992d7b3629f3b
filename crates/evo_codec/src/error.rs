use alloc::string::String;
use alloc::sync::Arc;

use evo_buffer::BufferError;
use evo_meta::MetaError;
use thiserror::Error;

// -----------------------------------------------------------------------------
// Error

/// Errors raised while building codecs or encoding and decoding values.
///
/// Nothing is retried. A failed write leaves the partial output in the
/// writer, a failed read discards everything materialized so far.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CodecError {
    #[error("class `{class}` version hash mismatch: expected {expected:#010x}, read {actual:#010x}")]
    VersionMismatch {
        class: Arc<str>,
        expected: i32,
        actual: i32,
    },

    #[error("corrupted field tag {tag:#018x} while reading `{class}`")]
    CorruptedTag { class: Arc<str>, tag: i64 },

    #[error("invalid reference flag {0}")]
    InvalidRefFlag(i8),

    #[error("reference id {0} does not point to a materialized object")]
    UnresolvedRef(u32),

    #[error("unknown class id {0}")]
    UnknownClassId(u32),

    #[error("class `{0}` is not registered")]
    UnregisteredClass(Arc<str>),

    #[error("enum `{enum_name}` has no variant with ordinal {ordinal}")]
    UnknownEnumValue { enum_name: Arc<str>, ordinal: u32 },

    #[error("class `{0}` has no way to construct instances")]
    MissingConstructor(Arc<str>),

    #[error("unknown field kind {0}")]
    FieldKindMismatch(u8),

    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: String,
        found: &'static str,
    },

    #[error("fields `{first}` and `{second}` of `{class}` share the tag {tag:#018x}")]
    TagCollision {
        class: Arc<str>,
        first: String,
        second: String,
        tag: i64,
    },

    #[error("nesting deeper than {0} levels")]
    DepthExceeded(u32),

    #[error("object is mutably borrowed while being serialized")]
    ObjectBorrowed,

    #[error("header {actual:#04x} does not match the local configuration {expected:#04x}")]
    HeaderMismatch { expected: u8, actual: u8 },

    #[error(transparent)]
    Buffer(#[from] BufferError),

    #[error(transparent)]
    Meta(#[from] MetaError),
}

impl CodecError {
    #[cold]
    pub(crate) fn mismatch(expected: impl Into<String>, found: &evo_meta::Value) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            found: found.kind_name(),
        }
    }
}
