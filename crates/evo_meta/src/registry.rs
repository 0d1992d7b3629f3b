//! Class ids and the type registry.

use alloc::sync::Arc;
use alloc::vec::Vec;

use evo_utils::hash::{HashMap, NoOpHashMap, new_map, new_noop_map};

use crate::{ClassDef, EnumDef, FieldType, MetaError, PrimitiveKind};

// -----------------------------------------------------------------------------
// Class ids

/// Built-in class ids. User types are registered from [`FIRST_USER_ID`].
///
/// [`FIRST_USER_ID`]: class_id::FIRST_USER_ID
pub mod class_id {
    /// Marks "no embedded class", used by separately typed field tags.
    pub const NO_CLASS_ID: u32 = 0;

    pub const BOOL: u32 = 1;
    pub const I8: u32 = 2;
    pub const I16: u32 = 3;
    pub const I32: u32 = 4;
    pub const I64: u32 = 5;
    pub const F32: u32 = 6;
    pub const F64: u32 = 7;

    /// Boxed ids are the primitive id plus this offset.
    pub const BOXED_OFFSET: u32 = 7;
    pub const BOXED_BOOL: u32 = 8;
    pub const BOXED_F64: u32 = 14;

    pub const STRING: u32 = 15;
    pub const LIST: u32 = 16;
    pub const SET: u32 = 17;
    pub const MAP: u32 = 18;

    pub const FIRST_USER_ID: u32 = 32;
}

use class_id::*;

// -----------------------------------------------------------------------------
// TypeRegistry

/// A registered user type.
#[derive(Debug, Clone)]
pub enum UserType {
    Class(Arc<ClassDef>),
    Enum(Arc<EnumDef>),
}

impl UserType {
    #[inline]
    pub fn name(&self) -> &Arc<str> {
        match self {
            Self::Class(def) => def.name(),
            Self::Enum(def) => def.name(),
        }
    }
}

/// Maps user classes and enums to small class ids.
///
/// Built-in types need no registration, their ids are fixed in [`class_id`].
///
/// # Examples
///
/// ```
/// use evo_meta::{ClassDef, FieldType, TypeRegistry};
/// use evo_meta::registry::class_id;
///
/// let mut registry = TypeRegistry::new();
/// registry.register_class(ClassDef::builder("Point").build(), 40).unwrap();
///
/// assert_eq!(registry.class_id_of(&FieldType::object("Point")), Some(40));
/// assert_eq!(registry.class_id_of(&FieldType::STRING), Some(class_id::STRING));
/// assert!(registry.is_monomorphic(&FieldType::object("Point")));
/// assert!(!registry.is_monomorphic(&FieldType::Any));
/// ```
#[derive(Debug)]
pub struct TypeRegistry {
    by_id: NoOpHashMap<u32, UserType>,
    by_name: HashMap<Arc<str>, u32>,
    // Registration order, keeps iteration deterministic.
    order: Vec<u32>,
}

impl Default for TypeRegistry {
    /// See [`TypeRegistry::new`].
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self {
            by_id: new_noop_map(),
            by_name: new_map(),
            order: Vec::new(),
        }
    }

    pub fn register_class(&mut self, def: Arc<ClassDef>, id: u32) -> Result<(), MetaError> {
        self.insert(UserType::Class(def), id)
    }

    pub fn register_enum(&mut self, def: Arc<EnumDef>, id: u32) -> Result<(), MetaError> {
        self.insert(UserType::Enum(def), id)
    }

    fn insert(&mut self, ty: UserType, id: u32) -> Result<(), MetaError> {
        if id < FIRST_USER_ID {
            return Err(MetaError::ReservedId(id));
        }
        if self.by_id.contains_key(&id) {
            return Err(MetaError::DuplicateId(id));
        }
        let name = ty.name().clone();
        if self.by_name.contains_key(&name) {
            return Err(MetaError::DuplicateName(name));
        }
        self.by_name.insert(name, id);
        self.by_id.insert(id, ty);
        self.order.push(id);
        Ok(())
    }

    /// Registered user types in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &UserType)> {
        self.order
            .iter()
            .filter_map(|id| self.by_id.get(id).map(|ty| (*id, ty)))
    }

    #[inline]
    pub fn get(&self, id: u32) -> Option<&UserType> {
        self.by_id.get(&id)
    }

    #[inline]
    pub fn id_of_name(&self, name: &str) -> Option<u32> {
        self.by_name.get(name).copied()
    }

    pub fn class(&self, name: &str) -> Option<&Arc<ClassDef>> {
        match self.by_id.get(&self.id_of_name(name)?)? {
            UserType::Class(def) => Some(def),
            UserType::Enum(_) => None,
        }
    }

    pub fn enum_def(&self, name: &str) -> Option<&Arc<EnumDef>> {
        match self.by_id.get(&self.id_of_name(name)?)? {
            UserType::Enum(def) => Some(def),
            UserType::Class(_) => None,
        }
    }

    /// Class id of a declared type, `None` for [`FieldType::Any`] and
    /// unregistered names.
    pub fn class_id_of(&self, ty: &FieldType) -> Option<u32> {
        match ty {
            FieldType::Primitive(k) => Some(k.type_id()),
            FieldType::Boxed(k) => Some(k.type_id() + BOXED_OFFSET),
            FieldType::String => Some(STRING),
            FieldType::List(_) => Some(LIST),
            FieldType::Set(_) => Some(SET),
            FieldType::Map(..) => Some(MAP),
            FieldType::Enum(name) | FieldType::Struct(name) => self.id_of_name(name),
            FieldType::Any => None,
        }
    }

    /// Type a class id stands for, containers get [`FieldType::Any`]
    /// generic arguments.
    pub fn field_type_of(&self, id: u32) -> Option<FieldType> {
        if let Some(kind) = PrimitiveKind::from_type_id(id) {
            return Some(FieldType::Primitive(kind));
        }
        if (BOXED_BOOL..=BOXED_F64).contains(&id) {
            return PrimitiveKind::from_type_id(id - BOXED_OFFSET).map(FieldType::Boxed);
        }
        match id {
            STRING => Some(FieldType::String),
            LIST => Some(FieldType::list(FieldType::Any)),
            SET => Some(FieldType::set(FieldType::Any)),
            MAP => Some(FieldType::map(FieldType::Any, FieldType::Any)),
            _ => match self.by_id.get(&id)? {
                UserType::Class(def) => Some(FieldType::Struct(def.name().clone())),
                UserType::Enum(def) => Some(FieldType::Enum(def.name().clone())),
            },
        }
    }

    /// Whether every value of `ty` has exactly the declared class.
    ///
    /// Containers are never monomorphic, their element types travel through
    /// the generic arguments instead. Neither is a class with a write
    /// replacement hook, its instances may be written as another class.
    pub fn is_monomorphic(&self, ty: &FieldType) -> bool {
        match ty {
            FieldType::Primitive(_) | FieldType::Boxed(_) | FieldType::String => true,
            FieldType::Enum(name) => self.enum_def(name).is_some(),
            FieldType::Struct(name) => self.class(name)
                .is_some_and(|def| def.is_final() && def.write_replace().is_none()),
            FieldType::List(_) | FieldType::Set(_) | FieldType::Map(..) | FieldType::Any => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_ids() {
        let registry = TypeRegistry::new();
        for kind in PrimitiveKind::ALL {
            let prim = FieldType::Primitive(kind);
            let boxed = FieldType::Boxed(kind);
            let id = registry.class_id_of(&prim).unwrap();
            let boxed_id = registry.class_id_of(&boxed).unwrap();
            assert_eq!(registry.field_type_of(id), Some(prim));
            assert_eq!(registry.field_type_of(boxed_id), Some(boxed));
            assert!((BOXED_BOOL..=BOXED_F64).contains(&boxed_id));
        }
        assert_eq!(registry.field_type_of(MAP), Some(FieldType::map(FieldType::Any, FieldType::Any)));
        assert_eq!(registry.field_type_of(NO_CLASS_ID), None);
        assert_eq!(registry.field_type_of(99), None);
    }

    #[test]
    fn registration_rules() {
        let mut registry = TypeRegistry::new();
        let point = ClassDef::builder("Point").build();

        assert_eq!(registry.register_class(point.clone(), 5), Err(MetaError::ReservedId(5)));
        registry.register_class(point.clone(), 32).unwrap();
        assert_eq!(registry.register_class(point, 33), Err(MetaError::DuplicateName("Point".into())));
        assert_eq!(
            registry.register_enum(EnumDef::new("Color", &["Red"]), 32),
            Err(MetaError::DuplicateId(32))
        );
        registry.register_enum(EnumDef::new("Color", &["Red"]), 33).unwrap();

        assert!(registry.class("Color").is_none());
        assert!(registry.enum_def("Color").is_some());
        assert_eq!(registry.field_type_of(33), Some(FieldType::enumeration("Color")));
        assert_eq!(registry.iter().map(|(id, _)| id).collect::<Vec<_>>(), [32, 33]);
    }

    #[test]
    fn monomorphism() {
        let mut registry = TypeRegistry::new();
        registry.register_class(ClassDef::builder("Leaf").build(), 40).unwrap();
        registry
            .register_class(ClassDef::builder("Shape").non_final().build(), 41)
            .unwrap();

        assert!(registry.is_monomorphic(&FieldType::I32));
        assert!(registry.is_monomorphic(&FieldType::STRING));
        assert!(registry.is_monomorphic(&FieldType::object("Leaf")));
        assert!(!registry.is_monomorphic(&FieldType::object("Shape")));
        assert!(!registry.is_monomorphic(&FieldType::object("Unknown")));
        assert!(!registry.is_monomorphic(&FieldType::list(FieldType::I32)));
        assert_eq!(registry.class_id_of(&FieldType::object("Unknown")), None);
    }
}
