use alloc::boxed::Box;
use alloc::format;
use alloc::string::String;
use alloc::sync::Arc;

use crate::Value;

// -----------------------------------------------------------------------------
// PrimitiveKind

/// Fixed-size scalar kinds.
///
/// The discriminant doubles as the built-in class id, see
/// [`registry::class_id`](crate::registry::class_id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum PrimitiveKind {
    Bool = 1,
    I8 = 2,
    I16 = 3,
    I32 = 4,
    I64 = 5,
    F32 = 6,
    F64 = 7,
}

impl PrimitiveKind {
    pub const ALL: [PrimitiveKind; 7] = [
        Self::Bool,
        Self::I8,
        Self::I16,
        Self::I32,
        Self::I64,
        Self::F32,
        Self::F64,
    ];

    /// Size of the uncompressed wire form.
    #[inline]
    pub const fn size(self) -> usize {
        match self {
            Self::Bool | Self::I8 => 1,
            Self::I16 => 2,
            Self::I32 | Self::F32 => 4,
            Self::I64 | Self::F64 => 8,
        }
    }

    #[inline]
    pub const fn type_id(self) -> u32 {
        self as u32
    }

    #[inline]
    pub const fn from_type_id(id: u32) -> Option<Self> {
        Some(match id {
            1 => Self::Bool,
            2 => Self::I8,
            3 => Self::I16,
            4 => Self::I32,
            5 => Self::I64,
            6 => Self::F32,
            7 => Self::F64,
            _ => return None,
        })
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::F32 => "f32",
            Self::F64 => "f64",
        }
    }

    /// The zero value.
    pub const fn default_value(self) -> Value {
        match self {
            Self::Bool => Value::Bool(false),
            Self::I8 => Value::I8(0),
            Self::I16 => Value::I16(0),
            Self::I32 => Value::I32(0),
            Self::I64 => Value::I64(0),
            Self::F32 => Value::F32(0.0),
            Self::F64 => Value::F64(0.0),
        }
    }

    /// Whether `value` is a non-null value of this kind.
    pub const fn matches(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (Self::Bool, Value::Bool(_))
                | (Self::I8, Value::I8(_))
                | (Self::I16, Value::I16(_))
                | (Self::I32, Value::I32(_))
                | (Self::I64, Value::I64(_))
                | (Self::F32, Value::F32(_))
                | (Self::F64, Value::F64(_))
        )
    }
}

// -----------------------------------------------------------------------------
// FieldType

/// Declared type of a field, including generic arguments of containers.
///
/// # Examples
///
/// ```
/// use evo_meta::{FieldType, PrimitiveKind};
///
/// let ty = FieldType::map(FieldType::STRING, FieldType::list(FieldType::I32));
/// assert_eq!(ty.type_name(), "Map<String, List<i32>>");
/// assert!(ty.is_container());
/// assert_eq!(FieldType::I64.primitive(), Some(PrimitiveKind::I64));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// Never null, written without a flag.
    Primitive(PrimitiveKind),
    /// Nullable primitive.
    Boxed(PrimitiveKind),
    String,
    Enum(Arc<str>),
    /// A registered class, by name.
    Struct(Arc<str>),
    List(Box<FieldType>),
    Set(Box<FieldType>),
    Map(Box<FieldType>, Box<FieldType>),
    /// Declared as "any object", the runtime class is written with the value.
    Any,
}

impl FieldType {
    pub const BOOL: Self = Self::Primitive(PrimitiveKind::Bool);
    pub const I8: Self = Self::Primitive(PrimitiveKind::I8);
    pub const I16: Self = Self::Primitive(PrimitiveKind::I16);
    pub const I32: Self = Self::Primitive(PrimitiveKind::I32);
    pub const I64: Self = Self::Primitive(PrimitiveKind::I64);
    pub const F32: Self = Self::Primitive(PrimitiveKind::F32);
    pub const F64: Self = Self::Primitive(PrimitiveKind::F64);
    pub const STRING: Self = Self::String;

    #[inline]
    pub fn boxed(kind: PrimitiveKind) -> Self {
        Self::Boxed(kind)
    }

    #[inline]
    pub fn object(class: &str) -> Self {
        Self::Struct(Arc::from(class))
    }

    #[inline]
    pub fn enumeration(name: &str) -> Self {
        Self::Enum(Arc::from(name))
    }

    #[inline]
    pub fn list(elem: FieldType) -> Self {
        Self::List(Box::new(elem))
    }

    #[inline]
    pub fn set(elem: FieldType) -> Self {
        Self::Set(Box::new(elem))
    }

    #[inline]
    pub fn map(key: FieldType, value: FieldType) -> Self {
        Self::Map(Box::new(key), Box::new(value))
    }

    #[inline]
    pub fn primitive(&self) -> Option<PrimitiveKind> {
        match self {
            Self::Primitive(k) => Some(*k),
            _ => None,
        }
    }

    #[inline]
    pub fn is_container(&self) -> bool {
        matches!(self, Self::List(_) | Self::Set(_) | Self::Map(..))
    }

    /// Stable textual name, part of the class version hash.
    pub fn type_name(&self) -> String {
        match self {
            Self::Primitive(k) => String::from(k.name()),
            Self::Boxed(k) => format!("Boxed<{}>", k.name()),
            Self::String => String::from("String"),
            Self::Enum(name) | Self::Struct(name) => String::from(&**name),
            Self::List(e) => format!("List<{}>", e.type_name()),
            Self::Set(e) => format!("Set<{}>", e.type_name()),
            Self::Map(k, v) => format!("Map<{}, {}>", k.type_name(), v.type_name()),
            Self::Any => String::from("Any"),
        }
    }

    /// Value a field of this type holds when nothing was read for it.
    #[inline]
    pub fn default_value(&self) -> Value {
        match self {
            Self::Primitive(k) => k.default_value(),
            _ => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_ids_roundtrip() {
        for kind in PrimitiveKind::ALL {
            assert_eq!(PrimitiveKind::from_type_id(kind.type_id()), Some(kind));
        }
        assert_eq!(PrimitiveKind::from_type_id(0), None);
        assert_eq!(PrimitiveKind::from_type_id(8), None);
    }

    #[test]
    fn defaults() {
        assert_eq!(FieldType::I32.default_value(), Value::I32(0));
        assert_eq!(FieldType::BOOL.default_value(), Value::Bool(false));
        assert!(FieldType::boxed(PrimitiveKind::I32).default_value().is_null());
        assert!(FieldType::list(FieldType::I32).default_value().is_null());
    }

    #[test]
    fn type_names() {
        assert_eq!(FieldType::boxed(PrimitiveKind::F64).type_name(), "Boxed<f64>");
        assert_eq!(FieldType::set(FieldType::object("Point")).type_name(), "Set<Point>");
        assert_eq!(FieldType::Any.type_name(), "Any");
    }
}
