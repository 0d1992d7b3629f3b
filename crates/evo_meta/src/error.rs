use alloc::sync::Arc;

use thiserror::Error;

// -----------------------------------------------------------------------------
// Error

/// Errors raised by accessors, class definitions and the registry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MetaError {
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("instance of `{found}` is not a `{expected}`")]
    InstanceMismatch { expected: &'static str, found: Arc<str> },

    #[error("class `{class}` has no field `{field}`")]
    UnknownField { class: Arc<str>, field: Arc<str> },

    #[error("field `{field}` of class `{class}` has no accessor")]
    NoAccessor { class: Arc<str>, field: Arc<str> },

    #[error("slot {slot} is out of range for `{class}` with {len} slots")]
    SlotOutOfRange { class: Arc<str>, slot: usize, len: usize },

    #[error("class `{0}` cannot be instantiated without its field values")]
    NotInstantiable(Arc<str>),

    #[error("record `{class}` expects {expected} arguments, got {actual}")]
    ArityMismatch {
        class: Arc<str>,
        expected: usize,
        actual: usize,
    },

    #[error("type name `{0}` is already registered")]
    DuplicateName(Arc<str>),

    #[error("class id {0} is already registered")]
    DuplicateId(u32),

    #[error("class id {0} is reserved for built-in types")]
    ReservedId(u32),
}
