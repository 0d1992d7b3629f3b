use alloc::rc::Rc;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::Any;
use core::cell::RefCell;
use core::fmt::Debug;

use crate::{MetaError, ObjectRef, Value};

// -----------------------------------------------------------------------------
// Instance

/// An object the codecs can read fields from and write fields into.
///
/// Implemented by [`DynamicObject`] and, through [`impl_instance!`], by plain
/// Rust structs whose fields are reached with typed accessors.
///
/// [`impl_instance!`]: crate::impl_instance
pub trait Instance: Any + Debug {
    /// Name of the class this instance belongs to.
    fn class_name(&self) -> &str;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Wrap an instance into a shared [`ObjectRef`].
#[inline]
pub fn new_object<T: Instance>(value: T) -> ObjectRef {
    Rc::new(RefCell::new(value))
}

/// Implement [`Instance`] for a struct with a fixed class name.
///
/// # Examples
///
/// ```
/// use evo_meta::{Instance, impl_instance};
///
/// #[derive(Debug, Default)]
/// struct Point {
///     x: i32,
///     y: i32,
/// }
///
/// impl_instance!(Point => "demo.Point");
///
/// assert_eq!(Point::default().class_name(), "demo.Point");
/// ```
#[macro_export]
macro_rules! impl_instance {
    ($ty:ty => $name:expr) => {
        impl $crate::Instance for $ty {
            #[inline]
            fn class_name(&self) -> &str {
                $name
            }

            #[inline]
            fn as_any(&self) -> &dyn ::core::any::Any {
                self
            }

            #[inline]
            fn as_any_mut(&mut self) -> &mut dyn ::core::any::Any {
                self
            }
        }
    };
}

// -----------------------------------------------------------------------------
// DynamicObject

/// Slot-backed instance of a class known only at runtime.
///
/// Slots follow the class hierarchy: inherited fields first, then the fields
/// declared by the class itself.
#[derive(Debug, Clone)]
pub struct DynamicObject {
    class: Arc<str>,
    slots: Vec<Value>,
}

impl DynamicObject {
    /// Create an object with `len` null slots.
    pub fn new(class: &str, len: usize) -> Self {
        Self {
            class: Arc::from(class),
            slots: alloc::vec![Value::Null; len],
        }
    }

    #[inline]
    pub fn with_slots(class: Arc<str>, slots: Vec<Value>) -> Self {
        Self { class, slots }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn slots(&self) -> &[Value] {
        &self.slots
    }

    pub fn slot(&self, index: usize) -> Result<&Value, MetaError> {
        let len = self.slots.len();
        self.slots.get(index).ok_or_else(|| MetaError::SlotOutOfRange {
            class: self.class.clone(),
            slot: index,
            len,
        })
    }

    pub fn set_slot(&mut self, index: usize, value: Value) -> Result<(), MetaError> {
        let len = self.slots.len();
        match self.slots.get_mut(index) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(MetaError::SlotOutOfRange {
                class: self.class.clone(),
                slot: index,
                len,
            }),
        }
    }
}

impl Instance for DynamicObject {
    #[inline]
    fn class_name(&self) -> &str {
        &self.class
    }

    #[inline]
    fn as_any(&self) -> &dyn Any {
        self
    }

    #[inline]
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots() {
        let mut obj = DynamicObject::new("A", 2);
        obj.set_slot(1, Value::I32(5)).unwrap();
        assert_eq!(obj.slot(1), Ok(&Value::I32(5)));
        assert!(obj.slot(0).unwrap().is_null());
        assert!(matches!(
            obj.set_slot(2, Value::Null),
            Err(MetaError::SlotOutOfRange { slot: 2, len: 2, .. })
        ));
    }

    #[test]
    fn downcast_through_object_ref() {
        let obj = new_object(DynamicObject::new("A", 1));
        let borrowed = obj.borrow();
        assert_eq!(borrowed.class_name(), "A");
        assert!(borrowed.as_any().downcast_ref::<DynamicObject>().is_some());
    }
}
