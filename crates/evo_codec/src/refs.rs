//! Reference tracking: shared and cyclic object graphs.
//!
//! Every non-primitive value on the wire starts with a one-byte flag:
//!
//! | flag | meaning |
//! |---|---|
//! | [`NULL_FLAG`] | null, nothing follows |
//! | [`REF_FLAG`] | back-reference, a varuint32 id follows |
//! | [`NOT_NULL_VALUE_FLAG`] | a value that is not tracked follows |
//! | [`REF_VALUE_FLAG`] | a tracked value follows and takes the next id |
//!
//! Ids are assigned in first-seen order on both sides, so the writer never
//! writes them for new values.

use alloc::boxed::Box;
use alloc::vec::Vec;

use evo_buffer::{Reader, Writer};
use evo_meta::Value;
use evo_utils::hash::{HashMap, new_map};

use crate::CodecError;

// -----------------------------------------------------------------------------
// Flags

pub const NULL_FLAG: i8 = -3;
pub const REF_FLAG: i8 = -2;
pub const NOT_NULL_VALUE_FLAG: i8 = -1;
pub const REF_VALUE_FLAG: i8 = 0;

/// Read-side id reserved for a value that is being materialized.
///
/// `RefSlot::NONE` is used for untracked values, binding it does nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefSlot(Option<u32>);

impl RefSlot {
    pub const NONE: RefSlot = RefSlot(None);

    #[inline]
    pub const fn id(self) -> Option<u32> {
        self.0
    }
}

/// Outcome of reading a reference flag.
#[derive(Debug)]
pub enum ReadRef {
    Null,
    /// A back-reference to a value materialized earlier in the same call.
    Existing(Value),
    /// A new value follows, bind it to the slot before reading its children.
    New(RefSlot),
}

// -----------------------------------------------------------------------------
// RefResolver

/// Call-scoped reference table.
pub trait RefResolver {
    /// Writes the flag for `value`. Returns `true` when nothing else must be
    /// written, that is for null and for back-references.
    fn write_ref_or_null(&mut self, writer: &mut Writer, value: &Value) -> bool;

    /// Id already assigned to `value` in this call.
    fn written_id(&self, value: &Value) -> Option<u32>;

    /// Make later occurrences of `original` refer to the id of `substitute`.
    fn replace_ref(&mut self, original: &Value, substitute: &Value);

    fn try_preserve_ref_id(&mut self, reader: &mut Reader<'_>) -> Result<ReadRef, CodecError>;

    fn set_read_object(&mut self, slot: RefSlot, value: &Value);

    fn get_read_object(&self, id: u32) -> Option<&Value>;

    /// Forget all state of the current call.
    fn reset(&mut self);
}

/// Create the resolver matching the `ref_tracking` configuration.
pub fn new_resolver(ref_tracking: bool) -> Box<dyn RefResolver> {
    if ref_tracking {
        Box::new(MapRefResolver::new())
    } else {
        Box::new(NoRefResolver)
    }
}

/// Writes [`NULL_FLAG`] or [`NOT_NULL_VALUE_FLAG`], returns `true` for null.
#[inline]
pub fn write_null_flag(writer: &mut Writer, value: &Value) -> bool {
    if value.is_null() {
        writer.write_i8(NULL_FLAG);
        true
    } else {
        writer.write_i8(NOT_NULL_VALUE_FLAG);
        false
    }
}

/// Reads a flag written by [`write_null_flag`], returns `true` for null.
#[inline]
pub fn read_null_flag(reader: &mut Reader<'_>) -> Result<bool, CodecError> {
    match reader.read_i8()? {
        NULL_FLAG => Ok(true),
        NOT_NULL_VALUE_FLAG => Ok(false),
        other => Err(CodecError::InvalidRefFlag(other)),
    }
}

// -----------------------------------------------------------------------------
// MapRefResolver

/// Tracks objects, lists, sets and maps by allocation address.
///
/// # Examples
///
/// ```
/// use evo_buffer::{Reader, Writer};
/// use evo_codec::refs::{MapRefResolver, ReadRef, RefResolver};
/// use evo_meta::Value;
///
/// let shared = Value::list([]);
/// let mut w = Writer::new();
/// let mut refs = MapRefResolver::new();
/// assert!(!refs.write_ref_or_null(&mut w, &shared)); // first time, write it
/// assert!(refs.write_ref_or_null(&mut w, &shared)); // back-reference
///
/// let bytes = w.into_vec();
/// let mut r = Reader::new(&bytes);
/// let mut refs = MapRefResolver::new();
/// let ReadRef::New(slot) = refs.try_preserve_ref_id(&mut r).unwrap() else { panic!() };
/// let value = Value::list([]);
/// refs.set_read_object(slot, &value);
/// let ReadRef::Existing(again) = refs.try_preserve_ref_id(&mut r).unwrap() else { panic!() };
/// assert!(again.ptr_eq(&value));
/// ```
#[derive(Default)]
pub struct MapRefResolver {
    written: HashMap<usize, u32>,
    // Keeps written allocations alive so an address is never reused within
    // one call, substitutes from write-replace hooks may be temporaries.
    pinned: Vec<Value>,
    next_id: u32,
    read_objects: Vec<Option<Value>>,
}

impl MapRefResolver {
    pub fn new() -> Self {
        Self {
            written: new_map(),
            pinned: Vec::new(),
            next_id: 0,
            read_objects: Vec::new(),
        }
    }
}

impl RefResolver for MapRefResolver {
    fn write_ref_or_null(&mut self, writer: &mut Writer, value: &Value) -> bool {
        if value.is_null() {
            writer.write_i8(NULL_FLAG);
            return true;
        }
        let Some(addr) = value.identity() else {
            writer.write_i8(NOT_NULL_VALUE_FLAG);
            return false;
        };
        if let Some(&id) = self.written.get(&addr) {
            writer.write_i8(REF_FLAG);
            writer.write_var_u32(id);
            return true;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.written.insert(addr, id);
        self.pinned.push(value.clone());
        writer.write_i8(REF_VALUE_FLAG);
        false
    }

    fn written_id(&self, value: &Value) -> Option<u32> {
        self.written.get(&value.identity()?).copied()
    }

    fn replace_ref(&mut self, original: &Value, substitute: &Value) {
        let (Some(addr), Some(id)) = (original.identity(), self.written_id(substitute)) else {
            return;
        };
        self.written.insert(addr, id);
        self.pinned.push(original.clone());
    }

    fn try_preserve_ref_id(&mut self, reader: &mut Reader<'_>) -> Result<ReadRef, CodecError> {
        match reader.read_i8()? {
            NULL_FLAG => Ok(ReadRef::Null),
            NOT_NULL_VALUE_FLAG => Ok(ReadRef::New(RefSlot::NONE)),
            REF_VALUE_FLAG => {
                let id = self.read_objects.len() as u32;
                self.read_objects.push(None);
                Ok(ReadRef::New(RefSlot(Some(id))))
            }
            REF_FLAG => {
                let id = reader.read_var_u32()?;
                match self.get_read_object(id) {
                    Some(value) => Ok(ReadRef::Existing(value.clone())),
                    None => Err(CodecError::UnresolvedRef(id)),
                }
            }
            other => Err(CodecError::InvalidRefFlag(other)),
        }
    }

    fn set_read_object(&mut self, slot: RefSlot, value: &Value) {
        if let Some(id) = slot.0
            && let Some(entry) = self.read_objects.get_mut(id as usize)
        {
            *entry = Some(value.clone());
        }
    }

    #[inline]
    fn get_read_object(&self, id: u32) -> Option<&Value> {
        self.read_objects.get(id as usize)?.as_ref()
    }

    fn reset(&mut self) {
        self.written.clear();
        self.pinned.clear();
        self.next_id = 0;
        self.read_objects.clear();
    }
}

// -----------------------------------------------------------------------------
// NoRefResolver

/// Used when reference tracking is disabled: every value is written in full.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRefResolver;

impl RefResolver for NoRefResolver {
    #[inline]
    fn write_ref_or_null(&mut self, writer: &mut Writer, value: &Value) -> bool {
        write_null_flag(writer, value)
    }

    #[inline]
    fn written_id(&self, _value: &Value) -> Option<u32> {
        None
    }

    #[inline]
    fn replace_ref(&mut self, _original: &Value, _substitute: &Value) {}

    fn try_preserve_ref_id(&mut self, reader: &mut Reader<'_>) -> Result<ReadRef, CodecError> {
        match reader.read_i8()? {
            NULL_FLAG => Ok(ReadRef::Null),
            NOT_NULL_VALUE_FLAG => Ok(ReadRef::New(RefSlot::NONE)),
            other => Err(CodecError::InvalidRefFlag(other)),
        }
    }

    #[inline]
    fn set_read_object(&mut self, _slot: RefSlot, _value: &Value) {}

    #[inline]
    fn get_read_object(&self, _id: u32) -> Option<&Value> {
        None
    }

    #[inline]
    fn reset(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_all(bytes: &[u8], refs: &mut dyn RefResolver) -> Vec<ReadRef> {
        let mut r = Reader::new(bytes);
        let mut out = Vec::new();
        while !r.is_empty() {
            let read = refs.try_preserve_ref_id(&mut r).unwrap();
            if let ReadRef::New(slot) = read {
                refs.set_read_object(slot, &Value::list([]));
            }
            out.push(read);
        }
        out
    }

    #[test]
    fn scalars_are_never_tracked() {
        let mut w = Writer::new();
        let mut refs = MapRefResolver::new();
        assert!(!refs.write_ref_or_null(&mut w, &Value::I32(1)));
        assert!(!refs.write_ref_or_null(&mut w, &Value::I32(1)));
        assert!(refs.write_ref_or_null(&mut w, &Value::Null));
        assert_eq!(
            w.as_slice(),
            &[NOT_NULL_VALUE_FLAG as u8, NOT_NULL_VALUE_FLAG as u8, NULL_FLAG as u8]
        );
    }

    #[test]
    fn ids_in_first_seen_order() {
        let a = Value::list([]);
        let b = Value::map([]);
        let mut w = Writer::new();
        let mut refs = MapRefResolver::new();
        for v in [&a, &b, &b, &a] {
            refs.write_ref_or_null(&mut w, v);
        }
        assert_eq!(refs.written_id(&a), Some(0));
        assert_eq!(refs.written_id(&b), Some(1));
        assert_eq!(w.as_slice(), &[0, 0, REF_FLAG as u8, 1, REF_FLAG as u8, 0]);

        let mut reader = MapRefResolver::new();
        let reads = read_all(w.as_slice(), &mut reader);
        assert!(matches!(reads[0], ReadRef::New(RefSlot(Some(0)))));
        assert!(matches!(reads[1], ReadRef::New(RefSlot(Some(1)))));
        assert!(matches!(reads[2], ReadRef::Existing(_)));
        assert!(matches!(reads[3], ReadRef::Existing(_)));
    }

    #[test]
    fn unbound_back_reference() {
        let mut refs = MapRefResolver::new();
        let bytes = [REF_VALUE_FLAG as u8, REF_FLAG as u8, 0];
        let mut r = Reader::new(&bytes);
        assert!(matches!(refs.try_preserve_ref_id(&mut r), Ok(ReadRef::New(_))));
        // Id 0 is reserved but nothing was bound to it yet.
        assert!(matches!(
            refs.try_preserve_ref_id(&mut r),
            Err(CodecError::UnresolvedRef(0))
        ));
    }

    #[test]
    fn replace_ref_points_to_substitute() {
        let original = Value::list([]);
        let substitute = Value::list([Value::I32(1)]);
        let mut w = Writer::new();
        let mut refs = MapRefResolver::new();
        refs.write_ref_or_null(&mut w, &substitute);
        refs.replace_ref(&original, &substitute);
        assert_eq!(refs.written_id(&original), Some(0));
        assert!(refs.write_ref_or_null(&mut w, &original));
    }

    #[test]
    fn disabled_tracking_rejects_ref_flags() {
        let mut w = Writer::new();
        let mut refs = NoRefResolver;
        let list = Value::list([]);
        assert!(!refs.write_ref_or_null(&mut w, &list));
        assert!(!refs.write_ref_or_null(&mut w, &list));
        assert_eq!(w.as_slice(), &[NOT_NULL_VALUE_FLAG as u8; 2]);

        let mut r = Reader::new(&[REF_FLAG as u8, 0]);
        assert!(matches!(
            refs.try_preserve_ref_id(&mut r),
            Err(CodecError::InvalidRefFlag(REF_FLAG))
        ));
    }

    #[test]
    fn reset_clears_call_state() {
        let list = Value::list([]);
        let mut w = Writer::new();
        let mut refs = MapRefResolver::new();
        refs.write_ref_or_null(&mut w, &list);
        refs.reset();
        assert_eq!(refs.written_id(&list), None);
    }
}
