use alloc::rc::Rc;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;

use crate::Instance;

// -----------------------------------------------------------------------------
// Handles

/// Shared, mutable handle to an object. Identity is the allocation address.
pub type ObjectRef = Rc<RefCell<dyn Instance>>;

/// Shared list or set storage.
pub type ListRef = Rc<RefCell<Vec<Value>>>;

/// Shared map storage, entries keep insertion order.
pub type MapRef = Rc<RefCell<Vec<(Value, Value)>>>;

/// An enum constant: the enum type name and the variant ordinal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumValue {
    pub enum_name: Arc<str>,
    pub ordinal: u32,
}

// -----------------------------------------------------------------------------
// Value

/// A dynamically typed value.
///
/// Scalars and strings are plain values. Objects and containers are shared
/// handles, cloning a `Value` clones the handle, not the content.
///
/// # Examples
///
/// ```
/// use evo_meta::Value;
///
/// let list = Value::list([Value::I32(1), Value::I32(2)]);
/// let alias = list.clone();
/// assert!(list.ptr_eq(&alias));
/// assert_eq!(list, Value::list([Value::I32(1), Value::I32(2)]));
/// ```
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Str(String),
    Enum(EnumValue),
    List(ListRef),
    Set(ListRef),
    Map(MapRef),
    Object(ObjectRef),
}

impl Value {
    #[inline]
    pub fn str(s: &str) -> Self {
        Self::Str(String::from(s))
    }

    pub fn list(items: impl IntoIterator<Item = Value>) -> Self {
        Self::List(Rc::new(RefCell::new(items.into_iter().collect())))
    }

    pub fn set(items: impl IntoIterator<Item = Value>) -> Self {
        Self::Set(Rc::new(RefCell::new(items.into_iter().collect())))
    }

    pub fn map(entries: impl IntoIterator<Item = (Value, Value)>) -> Self {
        Self::Map(Rc::new(RefCell::new(entries.into_iter().collect())))
    }

    #[inline]
    pub fn object(obj: ObjectRef) -> Self {
        Self::Object(obj)
    }

    #[inline]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Short name of the variant, used in error messages.
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::I8(_) => "i8",
            Self::I16(_) => "i16",
            Self::I32(_) => "i32",
            Self::I64(_) => "i64",
            Self::F32(_) => "f32",
            Self::F64(_) => "f64",
            Self::Str(_) => "string",
            Self::Enum(_) => "enum",
            Self::List(_) => "list",
            Self::Set(_) => "set",
            Self::Map(_) => "map",
            Self::Object(_) => "object",
        }
    }

    /// Address of the shared allocation, `None` for plain values.
    pub fn identity(&self) -> Option<usize> {
        match self {
            Self::List(v) | Self::Set(v) => Some(Rc::as_ptr(v).cast::<()>() as usize),
            Self::Map(v) => Some(Rc::as_ptr(v).cast::<()>() as usize),
            Self::Object(v) => Some(Rc::as_ptr(v).cast::<()>() as usize),
            _ => None,
        }
    }

    /// Whether both values are the same shared allocation.
    pub fn ptr_eq(&self, other: &Value) -> bool {
        match (self.identity(), other.identity()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    #[inline]
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Self::Object(v) => Some(v),
            _ => None,
        }
    }

    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(v) => Some(v),
            _ => None,
        }
    }

    /// Copy out an integer of any width.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Self::I8(v) => Some(v as i64),
            Self::I16(v) => Some(v as i64),
            Self::I32(v) => Some(v as i64),
            Self::I64(v) => Some(v),
            _ => None,
        }
    }
}

/// Structural for plain values and containers, identity for objects.
///
/// Comparing containers borrows them, so a container must not be mutably
/// borrowed while compared.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::I8(a), Self::I8(b)) => a == b,
            (Self::I16(a), Self::I16(b)) => a == b,
            (Self::I32(a), Self::I32(b)) => a == b,
            (Self::I64(a), Self::I64(b)) => a == b,
            (Self::F32(a), Self::F32(b)) => a.to_bits() == b.to_bits(),
            (Self::F64(a), Self::F64(b)) => a.to_bits() == b.to_bits(),
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Enum(a), Self::Enum(b)) => a == b,
            (Self::List(a), Self::List(b)) | (Self::Set(a), Self::Set(b)) => {
                Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow()
            }
            (Self::Map(a), Self::Map(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            (Self::Object(a), Self::Object(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Objects print as `Class@address` and containers nested deeper than a
/// few levels print as `..`, so cyclic graphs stay printable.
impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&Nested(self, 0), f)
    }
}

const DEBUG_DEPTH: usize = 8;

struct Nested<'a>(&'a Value, usize);

impl fmt::Debug for Nested<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let depth = self.1 + 1;
        match self.0 {
            Value::Null => f.write_str("Null"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::I8(v) => write!(f, "{v}i8"),
            Value::I16(v) => write!(f, "{v}i16"),
            Value::I32(v) => write!(f, "{v}i32"),
            Value::I64(v) => write!(f, "{v}i64"),
            Value::F32(v) => write!(f, "{v}f32"),
            Value::F64(v) => write!(f, "{v}f64"),
            Value::Str(v) => write!(f, "{v:?}"),
            Value::Enum(v) => write!(f, "{}#{}", v.enum_name, v.ordinal),
            Value::List(_) | Value::Set(_) | Value::Map(_) if depth > DEBUG_DEPTH => {
                f.write_str("..")
            }
            Value::List(v) | Value::Set(v) => match v.try_borrow() {
                Ok(items) => f
                    .debug_list()
                    .entries(items.iter().map(|item| Nested(item, depth)))
                    .finish(),
                Err(_) => f.write_str("[<borrowed>]"),
            },
            Value::Map(v) => match v.try_borrow() {
                Ok(entries) => f
                    .debug_map()
                    .entries(entries.iter().map(|(k, v)| (Nested(k, depth), Nested(v, depth))))
                    .finish(),
                Err(_) => f.write_str("{<borrowed>}"),
            },
            Value::Object(v) => {
                let addr = Rc::as_ptr(v).cast::<()>() as usize;
                match v.try_borrow() {
                    Ok(obj) => write!(f, "{}@{addr:#x}", obj.class_name()),
                    Err(_) => write!(f, "<borrowed>@{addr:#x}"),
                }
            }
        }
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                #[inline]
                fn from(v: $ty) -> Self {
                    Self::$variant(v)
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    f32 => F32,
    f64 => F64,
    String => Str,
    EnumValue => Enum,
    ObjectRef => Object,
}

impl From<&str> for Value {
    #[inline]
    fn from(v: &str) -> Self {
        Self::str(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    #[inline]
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DynamicObject, new_object};
    use alloc::format;

    #[test]
    fn identity_only_for_shared_values() {
        assert_eq!(Value::I32(3).identity(), None);
        assert_eq!(Value::str("a").identity(), None);
        let list = Value::list([]);
        assert!(list.identity().is_some());
        assert!(!list.ptr_eq(&Value::list([])));
    }

    #[test]
    fn objects_compare_by_identity() {
        let a = Value::Object(new_object(DynamicObject::new("A", 0)));
        let b = Value::Object(new_object(DynamicObject::new("A", 0)));
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn float_equality_is_bitwise() {
        assert_eq!(Value::F64(f64::NAN), Value::F64(f64::NAN));
        assert_ne!(Value::F32(0.0), Value::F32(-0.0));
    }

    #[test]
    fn debug_of_cyclic_list_terminates() {
        let list = Rc::new(RefCell::new(Vec::new()));
        list.borrow_mut().push(Value::I32(1));
        let value = Value::List(list.clone());
        list.borrow_mut().push(value.clone());
        let text = format!("{value:?}");
        assert!(text.starts_with("[1i32, [1i32, "));
        assert!(text.contains(".."));
        list.borrow_mut().clear();
    }

    #[test]
    fn option_conversion() {
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::from(Some(7_i64)), Value::I64(7));
    }
}
