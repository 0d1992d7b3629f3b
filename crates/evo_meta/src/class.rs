use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use crate::{DynamicObject, EnumValue, FieldAccessor, FieldType, FieldValue};
use crate::{Instance, MetaError, ObjectRef, Value, new_object};

// -----------------------------------------------------------------------------
// Hooks

/// Creates an empty instance whose fields are assigned afterwards.
pub type FactoryFn = Arc<dyn Fn() -> ObjectRef + Send + Sync>;

/// Creates an immutable instance from all field values at once, in the
/// order of the record parameters.
pub type RecordFn = Arc<dyn Fn(Vec<Value>) -> Result<ObjectRef, MetaError> + Send + Sync>;

/// Returns the value to serialize in place of an instance.
pub type WriteReplaceFn = Arc<dyn Fn(&dyn Instance) -> Value + Send + Sync>;

/// How the codec obtains a fresh instance of a class while reading.
#[derive(Clone)]
pub enum Construction {
    /// A [`DynamicObject`] with one slot per field of the hierarchy.
    Dynamic,
    Factory(FactoryFn),
    Record {
        params: Box<[Arc<str>]>,
        ctor: RecordFn,
    },
    /// Write-only class.
    None,
}

impl fmt::Debug for Construction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dynamic => f.write_str("Dynamic"),
            Self::Factory(_) => f.write_str("Factory"),
            Self::Record { params, .. } => f.debug_struct("Record").field("params", params).finish(),
            Self::None => f.write_str("None"),
        }
    }
}

// -----------------------------------------------------------------------------
// FieldDef

/// A field declared by one class.
///
/// A field without accessor is part of the schema, so it counts for tags and
/// the version hash, but never carries a value in this process.
#[derive(Debug, Clone)]
pub struct FieldDef {
    name: Arc<str>,
    ty: FieldType,
    accessor: Option<FieldAccessor>,
}

impl FieldDef {
    #[inline]
    pub fn name(&self) -> &Arc<str> {
        &self.name
    }

    #[inline]
    pub fn ty(&self) -> &FieldType {
        &self.ty
    }

    #[inline]
    pub fn accessor(&self) -> Option<&FieldAccessor> {
        self.accessor.as_ref()
    }
}

// -----------------------------------------------------------------------------
// ClassDef

/// Runtime description of a class: its fields, parent, and construction.
///
/// # Examples
///
/// ```
/// use evo_meta::{ClassDef, FieldType, Value};
///
/// let base = ClassDef::builder("Base").field("id", FieldType::I64).build();
/// let user = ClassDef::builder("User")
///     .extends(base)
///     .field("name", FieldType::STRING)
///     .build();
///
/// let obj = user.instantiate().unwrap();
/// user.set(&obj, "id", Value::I64(9)).unwrap();
/// assert_eq!(user.get(&obj, "id"), Ok(Value::I64(9)));
/// assert_eq!(user.get(&obj, "name"), Ok(Value::Null));
/// ```
pub struct ClassDef {
    name: Arc<str>,
    parent: Option<Arc<ClassDef>>,
    fields: Box<[FieldDef]>,
    slot_count: usize,
    is_final: bool,
    construction: Construction,
    write_replace: Option<WriteReplaceFn>,
}

impl ClassDef {
    #[inline]
    pub fn builder(name: &str) -> ClassBuilder {
        ClassBuilder::new(name)
    }

    #[inline]
    pub fn name(&self) -> &Arc<str> {
        &self.name
    }

    #[inline]
    pub fn parent(&self) -> Option<&Arc<ClassDef>> {
        self.parent.as_ref()
    }

    /// Fields declared by this class only.
    #[inline]
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// A final class has no subclasses, so a field declared with it always
    /// holds exactly this class.
    #[inline]
    pub fn is_final(&self) -> bool {
        self.is_final
    }

    #[inline]
    pub fn construction(&self) -> &Construction {
        &self.construction
    }

    #[inline]
    pub fn write_replace(&self) -> Option<&WriteReplaceFn> {
        self.write_replace.as_ref()
    }

    /// Slot count of a [`DynamicObject`] of this class.
    #[inline]
    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    /// Classes from the root ancestor down to `self`.
    pub fn hierarchy(&self) -> Vec<&ClassDef> {
        let mut chain = Vec::new();
        let mut cur = Some(self);
        while let Some(def) = cur {
            chain.push(def);
            cur = def.parent.as_deref();
        }
        chain.reverse();
        chain
    }

    /// Finds a field by name, the most derived declaration wins.
    pub fn find_field(&self, name: &str) -> Option<&FieldDef> {
        let mut cur = Some(self);
        while let Some(def) = cur {
            if let Some(field) = def.fields.iter().find(|f| &*f.name == name) {
                return Some(field);
            }
            cur = def.parent.as_deref();
        }
        None
    }

    /// Creates an empty instance, fields hold their type defaults.
    pub fn instantiate(&self) -> Result<ObjectRef, MetaError> {
        match &self.construction {
            Construction::Dynamic => {
                let mut slots = Vec::with_capacity(self.slot_count);
                for def in self.hierarchy() {
                    for field in def.fields.iter() {
                        if let Some(FieldAccessor::Slot(_)) = field.accessor {
                            slots.push(field.ty.default_value());
                        }
                    }
                }
                Ok(new_object(DynamicObject::with_slots(self.name.clone(), slots)))
            }
            Construction::Factory(factory) => Ok(factory()),
            Construction::Record { .. } | Construction::None => {
                Err(MetaError::NotInstantiable(self.name.clone()))
            }
        }
    }

    /// Builds a record instance from values in parameter order.
    pub fn construct(&self, values: Vec<Value>) -> Result<ObjectRef, MetaError> {
        match &self.construction {
            Construction::Record { params, ctor } => {
                if params.len() != values.len() {
                    return Err(MetaError::ArityMismatch {
                        class: self.name.clone(),
                        expected: params.len(),
                        actual: values.len(),
                    });
                }
                ctor(values)
            }
            _ => Err(MetaError::NotInstantiable(self.name.clone())),
        }
    }

    pub fn get(&self, obj: &ObjectRef, field: &str) -> Result<Value, MetaError> {
        let accessor = self.accessor_of(field)?;
        accessor.get(&*obj.borrow())
    }

    pub fn set(&self, obj: &ObjectRef, field: &str, value: Value) -> Result<(), MetaError> {
        let accessor = self.accessor_of(field)?;
        accessor.set(&mut *obj.borrow_mut(), value)
    }

    fn accessor_of(&self, field: &str) -> Result<&FieldAccessor, MetaError> {
        let def = self.find_field(field).ok_or_else(|| MetaError::UnknownField {
            class: self.name.clone(),
            field: Arc::from(field),
        })?;
        def.accessor().ok_or_else(|| MetaError::NoAccessor {
            class: self.name.clone(),
            field: def.name.clone(),
        })
    }
}

impl fmt::Debug for ClassDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassDef")
            .field("name", &self.name)
            .field("parent", &self.parent.as_ref().map(|p| p.name.clone()))
            .field("fields", &self.fields)
            .field("is_final", &self.is_final)
            .field("construction", &self.construction)
            .finish()
    }
}

// -----------------------------------------------------------------------------
// ClassBuilder

enum PendingAccess {
    Slot,
    Custom(FieldAccessor),
    Phantom,
}

/// Builder of [`ClassDef`], see [`ClassDef::builder`].
pub struct ClassBuilder {
    name: Arc<str>,
    parent: Option<Arc<ClassDef>>,
    fields: Vec<(Arc<str>, FieldType, PendingAccess)>,
    is_final: bool,
    construction: Construction,
    write_replace: Option<WriteReplaceFn>,
}

impl ClassBuilder {
    fn new(name: &str) -> Self {
        Self {
            name: Arc::from(name),
            parent: None,
            fields: Vec::new(),
            is_final: true,
            construction: Construction::Dynamic,
            write_replace: None,
        }
    }

    pub fn extends(mut self, parent: Arc<ClassDef>) -> Self {
        self.parent = Some(parent);
        self
    }

    /// A field stored in a [`DynamicObject`] slot.
    pub fn field(mut self, name: &str, ty: FieldType) -> Self {
        self.fields.push((Arc::from(name), ty, PendingAccess::Slot));
        self
    }

    /// A field of struct `T`, reached through closures.
    pub fn typed_field<T, V>(
        mut self,
        name: &str,
        ty: FieldType,
        get: impl Fn(&T) -> V + Send + Sync + 'static,
        set: impl Fn(&mut T, V) + Send + Sync + 'static,
    ) -> Self
    where
        T: Instance,
        V: FieldValue,
    {
        let accessor = FieldAccessor::typed(get, set);
        self.fields
            .push((Arc::from(name), ty, PendingAccess::Custom(accessor)));
        self
    }

    /// A declared field this process never reads or writes.
    pub fn phantom_field(mut self, name: &str, ty: FieldType) -> Self {
        self.fields.push((Arc::from(name), ty, PendingAccess::Phantom));
        self
    }

    /// Allow subclasses, fields of this type then carry the runtime class.
    pub fn non_final(mut self) -> Self {
        self.is_final = false;
        self
    }

    pub fn factory(mut self, factory: impl Fn() -> ObjectRef + Send + Sync + 'static) -> Self {
        self.construction = Construction::Factory(Arc::new(factory));
        self
    }

    /// Shortcut for a factory of `T::default()`.
    pub fn default_factory<T: Instance + Default>(self) -> Self {
        self.factory(|| new_object(T::default()))
    }

    pub fn record(
        mut self,
        params: &[&str],
        ctor: impl Fn(Vec<Value>) -> Result<ObjectRef, MetaError> + Send + Sync + 'static,
    ) -> Self {
        self.construction = Construction::Record {
            params: params.iter().map(|p| Arc::from(*p)).collect(),
            ctor: Arc::new(ctor),
        };
        self
    }

    pub fn no_constructor(mut self) -> Self {
        self.construction = Construction::None;
        self
    }

    pub fn write_replace(mut self, hook: impl Fn(&dyn Instance) -> Value + Send + Sync + 'static) -> Self {
        self.write_replace = Some(Arc::new(hook));
        self
    }

    pub fn build(self) -> Arc<ClassDef> {
        let mut slot = self.parent.as_ref().map_or(0, |p| p.slot_count);
        let fields = self
            .fields
            .into_iter()
            .map(|(name, ty, access)| {
                let accessor = match access {
                    PendingAccess::Slot => {
                        slot += 1;
                        Some(FieldAccessor::Slot(slot - 1))
                    }
                    PendingAccess::Custom(acc) => Some(acc),
                    PendingAccess::Phantom => None,
                };
                FieldDef { name, ty, accessor }
            })
            .collect();

        Arc::new(ClassDef {
            name: self.name,
            parent: self.parent,
            fields,
            slot_count: slot,
            is_final: self.is_final,
            construction: self.construction,
            write_replace: self.write_replace,
        })
    }
}

// -----------------------------------------------------------------------------
// EnumDef

/// An enum type: a name and its variants in ordinal order.
#[derive(Debug, Clone)]
pub struct EnumDef {
    name: Arc<str>,
    variants: Box<[Arc<str>]>,
}

impl EnumDef {
    pub fn new(name: &str, variants: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            name: Arc::from(name),
            variants: variants.iter().map(|v| Arc::from(*v)).collect(),
        })
    }

    #[inline]
    pub fn name(&self) -> &Arc<str> {
        &self.name
    }

    #[inline]
    pub fn variants(&self) -> &[Arc<str>] {
        &self.variants
    }

    /// The constant with the given variant name.
    pub fn value(&self, variant: &str) -> Option<EnumValue> {
        let ordinal = self.variants.iter().position(|v| &**v == variant)?;
        Some(EnumValue {
            enum_name: self.name.clone(),
            ordinal: ordinal as u32,
        })
    }

    /// The constant with the given ordinal, `None` when out of range.
    pub fn value_of(&self, ordinal: u32) -> Option<EnumValue> {
        ((ordinal as usize) < self.variants.len()).then(|| EnumValue {
            enum_name: self.name.clone(),
            ordinal,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impl_instance;
    use alloc::vec;

    #[test]
    fn slots_follow_hierarchy() {
        let base = ClassDef::builder("Base")
            .field("a", FieldType::I32)
            .phantom_field("ghost", FieldType::I32)
            .build();
        let derived = ClassDef::builder("Derived")
            .extends(base.clone())
            .field("b", FieldType::I64)
            .build();

        assert_eq!(base.slot_count(), 1);
        assert_eq!(derived.slot_count(), 2);
        assert!(matches!(derived.fields()[0].accessor(), Some(FieldAccessor::Slot(1))));
        assert_eq!(
            derived.hierarchy().iter().map(|c| &**c.name()).collect::<Vec<_>>(),
            ["Base", "Derived"]
        );

        let obj = derived.instantiate().unwrap();
        assert_eq!(derived.get(&obj, "a"), Ok(Value::I32(0)));
        assert_eq!(derived.get(&obj, "b"), Ok(Value::I64(0)));
        assert!(matches!(derived.get(&obj, "ghost"), Err(MetaError::NoAccessor { .. })));
        assert!(matches!(derived.get(&obj, "nope"), Err(MetaError::UnknownField { .. })));
    }

    #[derive(Debug)]
    struct Pair {
        left: i32,
        right: i32,
    }

    impl_instance!(Pair => "Pair");

    #[test]
    fn record_construction() {
        let def = ClassDef::builder("Pair")
            .typed_field("left", FieldType::I32, |p: &Pair| p.left, |p: &mut Pair, v| p.left = v)
            .typed_field("right", FieldType::I32, |p: &Pair| p.right, |p: &mut Pair, v| p.right = v)
            .record(&["left", "right"], |mut args| {
                let right = i32::from_value(args.pop().unwrap_or_default())?;
                let left = i32::from_value(args.pop().unwrap_or_default())?;
                Ok(new_object(Pair { left, right }))
            })
            .build();

        assert!(matches!(def.instantiate(), Err(MetaError::NotInstantiable(_))));
        assert!(matches!(
            def.construct(vec![Value::I32(1)]),
            Err(MetaError::ArityMismatch { expected: 2, actual: 1, .. })
        ));

        let obj = def.construct(vec![Value::I32(1), Value::I32(2)]).unwrap();
        assert_eq!(def.get(&obj, "right"), Ok(Value::I32(2)));
    }

    #[test]
    fn enum_values() {
        let color = EnumDef::new("Color", &["Red", "Green"]);
        assert_eq!(color.value("Green").map(|v| v.ordinal), Some(1));
        assert!(color.value_of(2).is_none());
        assert_eq!(color.value_of(0), color.value("Red"));
    }
}
