use alloc::format;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::{ClassDef, FieldAccessor, FieldType};

/// One instance field of a class hierarchy, flattened for the codecs.
///
/// The same field name may appear once per declaring class, `declaring_class`
/// tells them apart.
#[derive(Debug, Clone)]
pub struct Descriptor {
    declaring_class: Arc<str>,
    name: Arc<str>,
    ty: FieldType,
    accessor: Option<FieldAccessor>,
}

impl Descriptor {
    pub fn new(declaring_class: &str, name: &str, ty: FieldType) -> Self {
        Self {
            declaring_class: Arc::from(declaring_class),
            name: Arc::from(name),
            ty,
            accessor: None,
        }
    }

    #[inline]
    pub fn with_accessor(mut self, accessor: FieldAccessor) -> Self {
        self.accessor = Some(accessor);
        self
    }

    /// Collects the fields of `def`, ancestors first when `include_inherited`.
    ///
    /// # Examples
    ///
    /// ```
    /// use evo_meta::{ClassDef, Descriptor, FieldType};
    ///
    /// let base = ClassDef::builder("Base").field("id", FieldType::I64).build();
    /// let user = ClassDef::builder("User")
    ///     .extends(base)
    ///     .field("id", FieldType::STRING)
    ///     .build();
    ///
    /// let all = Descriptor::collect(&user, true);
    /// assert_eq!(all.len(), 2);
    /// assert_eq!(all[0].qualified_name(), "Base.id");
    /// assert_eq!(Descriptor::collect(&user, false).len(), 1);
    /// ```
    pub fn collect(def: &ClassDef, include_inherited: bool) -> Vec<Descriptor> {
        let classes = if include_inherited {
            def.hierarchy()
        } else {
            alloc::vec![def]
        };

        classes
            .into_iter()
            .flat_map(|class| {
                class.fields().iter().map(|field| Descriptor {
                    declaring_class: class.name().clone(),
                    name: field.name().clone(),
                    ty: field.ty().clone(),
                    accessor: field.accessor().cloned(),
                })
            })
            .collect()
    }

    #[inline]
    pub fn declaring_class(&self) -> &Arc<str> {
        &self.declaring_class
    }

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

    /// `Declaring.name`, unique within a hierarchy.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.declaring_class, self.name)
    }
}
