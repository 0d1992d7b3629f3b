use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;
use core::any::type_name;
use core::fmt;

use crate::{DynamicObject, EnumValue, Instance, ListRef, MapRef, MetaError, ObjectRef, Value};

// -----------------------------------------------------------------------------
// FieldValue

/// Conversion between a Rust field type and [`Value`], used by typed accessors.
pub trait FieldValue: Sized {
    fn into_value(self) -> Value;

    fn from_value(value: Value) -> Result<Self, MetaError>;
}

#[inline(never)]
#[cold]
fn mismatch<T>(found: &Value) -> MetaError {
    MetaError::TypeMismatch {
        expected: type_name::<T>(),
        found: found.kind_name(),
    }
}

macro_rules! impl_field_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl FieldValue for $ty {
                #[inline]
                fn into_value(self) -> Value {
                    Value::$variant(self)
                }

                #[inline]
                fn from_value(value: Value) -> Result<Self, MetaError> {
                    match value {
                        Value::$variant(v) => Ok(v),
                        other => Err(mismatch::<$ty>(&other)),
                    }
                }
            }
        )*
    };
}

impl_field_value! {
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
    MapRef => Map,
}

/// Lists and sets share the same storage type.
impl FieldValue for ListRef {
    #[inline]
    fn into_value(self) -> Value {
        Value::List(self)
    }

    fn from_value(value: Value) -> Result<Self, MetaError> {
        match value {
            Value::List(v) | Value::Set(v) => Ok(v),
            other => Err(mismatch::<ListRef>(&other)),
        }
    }
}

impl FieldValue for Value {
    #[inline]
    fn into_value(self) -> Value {
        self
    }

    #[inline]
    fn from_value(value: Value) -> Result<Self, MetaError> {
        Ok(value)
    }
}

/// `None` maps to [`Value::Null`].
impl<T: FieldValue> FieldValue for Option<T> {
    #[inline]
    fn into_value(self) -> Value {
        self.map_or(Value::Null, T::into_value)
    }

    #[inline]
    fn from_value(value: Value) -> Result<Self, MetaError> {
        match value {
            Value::Null => Ok(None),
            v => T::from_value(v).map(Some),
        }
    }
}

// -----------------------------------------------------------------------------
// FieldAccessor

type GetFn = dyn Fn(&dyn Instance) -> Result<Value, MetaError> + Send + Sync;
type SetFn = dyn Fn(&mut dyn Instance, Value) -> Result<(), MetaError> + Send + Sync;

/// Reads and writes one field of an instance.
///
/// `Slot` addresses a [`DynamicObject`] slot, `Custom` wraps closures over a
/// concrete struct type.
///
/// # Examples
///
/// ```
/// use evo_meta::{FieldAccessor, Value, impl_instance};
///
/// #[derive(Debug, Default)]
/// struct Point {
///     x: i32,
/// }
/// impl_instance!(Point => "Point");
///
/// let acc = FieldAccessor::typed(|p: &Point| p.x, |p: &mut Point, v| p.x = v);
///
/// let mut p = Point::default();
/// acc.set(&mut p, Value::I32(4)).unwrap();
/// assert_eq!(acc.get(&p), Ok(Value::I32(4)));
/// assert!(acc.set(&mut p, Value::str("no")).is_err());
/// ```
#[derive(Clone)]
pub enum FieldAccessor {
    Slot(usize),
    Custom(Arc<CustomAccessor>),
}

#[doc(hidden)]
pub struct CustomAccessor {
    get: Box<GetFn>,
    set: Box<SetFn>,
}

impl FieldAccessor {
    /// Accessor for a [`DynamicObject`] slot.
    #[inline]
    pub const fn slot(index: usize) -> Self {
        Self::Slot(index)
    }

    /// Accessor over a struct field of type `V`.
    pub fn typed<T, V>(
        get: impl Fn(&T) -> V + Send + Sync + 'static,
        set: impl Fn(&mut T, V) + Send + Sync + 'static,
    ) -> Self
    where
        T: Instance,
        V: FieldValue,
    {
        let get = move |obj: &dyn Instance| -> Result<Value, MetaError> {
            let obj = obj.as_any().downcast_ref::<T>().ok_or_else(|| {
                MetaError::InstanceMismatch {
                    expected: type_name::<T>(),
                    found: Arc::from(obj.class_name()),
                }
            })?;
            Ok(get(obj).into_value())
        };
        let set = move |obj: &mut dyn Instance, value: Value| -> Result<(), MetaError> {
            let found: Arc<str> = Arc::from(obj.class_name());
            let obj = obj
                .as_any_mut()
                .downcast_mut::<T>()
                .ok_or(MetaError::InstanceMismatch {
                    expected: type_name::<T>(),
                    found,
                })?;
            set(obj, V::from_value(value)?);
            Ok(())
        };
        Self::Custom(Arc::new(CustomAccessor {
            get: Box::new(get),
            set: Box::new(set),
        }))
    }

    pub fn get(&self, obj: &dyn Instance) -> Result<Value, MetaError> {
        match self {
            Self::Slot(index) => dynamic(obj)?.slot(*index).cloned(),
            Self::Custom(custom) => (custom.get)(obj),
        }
    }

    pub fn set(&self, obj: &mut dyn Instance, value: Value) -> Result<(), MetaError> {
        match self {
            Self::Slot(index) => dynamic_mut(obj)?.set_slot(*index, value),
            Self::Custom(custom) => (custom.set)(obj, value),
        }
    }
}

fn dynamic(obj: &dyn Instance) -> Result<&DynamicObject, MetaError> {
    obj.as_any()
        .downcast_ref::<DynamicObject>()
        .ok_or_else(|| MetaError::InstanceMismatch {
            expected: "DynamicObject",
            found: Arc::from(obj.class_name()),
        })
}

fn dynamic_mut(obj: &mut dyn Instance) -> Result<&mut DynamicObject, MetaError> {
    let found: Arc<str> = Arc::from(obj.class_name());
    obj.as_any_mut()
        .downcast_mut::<DynamicObject>()
        .ok_or(MetaError::InstanceMismatch {
            expected: "DynamicObject",
            found,
        })
}

impl fmt::Debug for FieldAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Slot(index) => f.debug_tuple("Slot").field(index).finish(),
            Self::Custom(_) => f.write_str("Custom"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impl_instance;

    #[derive(Debug, Default)]
    struct User {
        name: String,
        age: Option<i32>,
    }

    impl_instance!(User => "User");

    #[test]
    fn typed_optional_field() {
        let acc = FieldAccessor::typed(|u: &User| u.age, |u: &mut User, v| u.age = v);
        let mut user = User::default();

        assert_eq!(acc.get(&user), Ok(Value::Null));
        acc.set(&mut user, Value::I32(30)).unwrap();
        assert_eq!(user.age, Some(30));
        acc.set(&mut user, Value::Null).unwrap();
        assert_eq!(user.age, None);
    }

    #[test]
    fn wrong_instance_type() {
        let acc = FieldAccessor::typed(|u: &User| u.name.clone(), |u: &mut User, v| u.name = v);
        let mut obj = DynamicObject::new("User", 1);
        assert!(matches!(
            acc.set(&mut obj, Value::str("x")),
            Err(MetaError::InstanceMismatch { .. })
        ));
        assert!(matches!(
            FieldAccessor::slot(0).get(&User::default()),
            Err(MetaError::InstanceMismatch { .. })
        ));
    }

    #[test]
    fn slot_accessor() {
        let mut obj = DynamicObject::new("A", 2);
        let acc = FieldAccessor::slot(1);
        acc.set(&mut obj, Value::str("v")).unwrap();
        assert_eq!(acc.get(&obj), Ok(Value::str("v")));
    }
}
