//! Canonical field order of a class.
//!
//! Fields are split into six groups and each group is sorted by a fixed
//! comparator, so two processes with the same class layout agree on the
//! order no matter how the fields were declared.

use alloc::vec::Vec;
use core::cmp::{Ordering, Reverse};

use evo_meta::registry::TypeRegistry;
use evo_meta::{Descriptor, FieldType, PrimitiveKind};

/// The group a field belongs to, in canonical write order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FieldGroup {
    Primitive,
    Boxed,
    /// Monomorphic non-primitive types: strings, enums, final classes.
    Final,
    /// Types whose runtime class travels with the value.
    Other,
    Collection,
    Map,
}

impl FieldGroup {
    pub fn of(ty: &FieldType, registry: &TypeRegistry) -> Self {
        match ty {
            FieldType::Primitive(_) => Self::Primitive,
            FieldType::Boxed(_) => Self::Boxed,
            FieldType::List(_) | FieldType::Set(_) => Self::Collection,
            FieldType::Map(..) => Self::Map,
            _ if registry.is_monomorphic(ty) => Self::Final,
            _ => Self::Other,
        }
    }
}

/// Descriptors of one class, grouped and sorted.
///
/// # Examples
///
/// ```
/// use evo_codec::grouper::DescriptorGrouper;
/// use evo_meta::{Descriptor, FieldType, TypeRegistry};
///
/// let fields = vec![
///     Descriptor::new("A", "name", FieldType::STRING),
///     Descriptor::new("A", "flag", FieldType::BOOL),
///     Descriptor::new("A", "id", FieldType::I64),
///     Descriptor::new("A", "ratio", FieldType::F64),
/// ];
///
/// let grouper = DescriptorGrouper::new(fields, &TypeRegistry::new(), false, false);
/// let names: Vec<_> = grouper.sorted().iter().map(|d| d.name().to_string()).collect();
/// // Larger primitives first, ties by descending type id.
/// assert_eq!(names, ["ratio", "id", "flag", "name"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct DescriptorGrouper {
    primitives: Vec<Descriptor>,
    boxed: Vec<Descriptor>,
    finals: Vec<Descriptor>,
    others: Vec<Descriptor>,
    collections: Vec<Descriptor>,
    maps: Vec<Descriptor>,
}

impl DescriptorGrouper {
    /// `compress_int` and `compress_long` move the variable-width kinds to
    /// the end of the primitive and boxed groups.
    pub fn new(
        descriptors: Vec<Descriptor>,
        registry: &TypeRegistry,
        compress_int: bool,
        compress_long: bool,
    ) -> Self {
        let mut grouper = Self::default();
        for d in descriptors {
            let group = match FieldGroup::of(d.ty(), registry) {
                FieldGroup::Primitive => &mut grouper.primitives,
                FieldGroup::Boxed => &mut grouper.boxed,
                FieldGroup::Final => &mut grouper.finals,
                FieldGroup::Other => &mut grouper.others,
                FieldGroup::Collection => &mut grouper.collections,
                FieldGroup::Map => &mut grouper.maps,
            };
            group.push(d);
        }

        let numeric = |d: &Descriptor| {
            let kind = match d.ty() {
                FieldType::Primitive(k) | FieldType::Boxed(k) => *k,
                _ => PrimitiveKind::Bool,
            };
            let compressed = (compress_int && kind == PrimitiveKind::I32)
                || (compress_long && kind == PrimitiveKind::I64);
            (compressed, Reverse(kind.size()), Reverse(kind.type_id()))
        };
        let by_numeric = |a: &Descriptor, b: &Descriptor| {
            numeric(a)
                .cmp(&numeric(b))
                .then_with(|| by_identity(a, b))
        };
        grouper.primitives.sort_by(by_numeric);
        grouper.boxed.sort_by(by_numeric);

        for group in [
            &mut grouper.finals,
            &mut grouper.others,
            &mut grouper.collections,
            &mut grouper.maps,
        ] {
            group.sort_by(by_type_name);
        }
        grouper
    }

    #[inline]
    pub fn primitives(&self) -> &[Descriptor] {
        &self.primitives
    }

    #[inline]
    pub fn boxed(&self) -> &[Descriptor] {
        &self.boxed
    }

    #[inline]
    pub fn finals(&self) -> &[Descriptor] {
        &self.finals
    }

    #[inline]
    pub fn others(&self) -> &[Descriptor] {
        &self.others
    }

    #[inline]
    pub fn collections(&self) -> &[Descriptor] {
        &self.collections
    }

    #[inline]
    pub fn maps(&self) -> &[Descriptor] {
        &self.maps
    }

    /// All descriptors: primitive, boxed, final, other, collection, map.
    pub fn sorted(self) -> Vec<Descriptor> {
        let mut all = self.primitives;
        all.extend(self.boxed);
        all.extend(self.finals);
        all.extend(self.others);
        all.extend(self.collections);
        all.extend(self.maps);
        all
    }
}

fn by_identity(a: &Descriptor, b: &Descriptor) -> Ordering {
    a.name()
        .cmp(b.name())
        .then_with(|| a.declaring_class().cmp(b.declaring_class()))
}

fn by_type_name(a: &Descriptor, b: &Descriptor) -> Ordering {
    a.ty()
        .type_name()
        .cmp(&b.ty().type_name())
        .then_with(|| by_identity(a, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::{String, ToString};
    use alloc::vec;
    use evo_meta::{ClassDef, EnumDef};

    fn names(ds: &[Descriptor]) -> Vec<String> {
        ds.iter().map(|d| d.qualified_name()).collect()
    }

    fn registry() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        registry.register_class(ClassDef::builder("Leaf").build(), 40).unwrap();
        registry
            .register_class(ClassDef::builder("Shape").non_final().build(), 41)
            .unwrap();
        registry.register_enum(EnumDef::new("Color", &["Red"]), 42).unwrap();
        registry
    }

    #[test]
    fn groups() {
        let fields = vec![
            Descriptor::new("A", "m", FieldType::map(FieldType::STRING, FieldType::I32)),
            Descriptor::new("A", "l", FieldType::list(FieldType::I32)),
            Descriptor::new("A", "shape", FieldType::object("Shape")),
            Descriptor::new("A", "any", FieldType::Any),
            Descriptor::new("A", "leaf", FieldType::object("Leaf")),
            Descriptor::new("A", "color", FieldType::enumeration("Color")),
            Descriptor::new("A", "s", FieldType::STRING),
            Descriptor::new("A", "count", FieldType::boxed(PrimitiveKind::I32)),
            Descriptor::new("A", "x", FieldType::I16),
        ];
        let g = DescriptorGrouper::new(fields, &registry(), false, false);

        assert_eq!(names(g.primitives()), ["A.x"]);
        assert_eq!(names(g.boxed()), ["A.count"]);
        // Sorted by type name: "Color" < "Leaf" < "String".
        assert_eq!(names(g.finals()), ["A.color", "A.leaf", "A.s"]);
        assert_eq!(names(g.others()), ["A.any", "A.shape"]);
        assert_eq!(names(g.collections()), ["A.l"]);
        assert_eq!(names(g.maps()), ["A.m"]);
        assert_eq!(g.sorted().len(), 9);
    }

    #[test]
    fn compressed_numbers_go_last() {
        let fields = vec![
            Descriptor::new("A", "a", FieldType::I64),
            Descriptor::new("A", "b", FieldType::I32),
            Descriptor::new("A", "c", FieldType::F32),
            Descriptor::new("A", "d", FieldType::I8),
        ];
        let plain = DescriptorGrouper::new(fields.clone(), &registry(), false, false);
        assert_eq!(names(plain.primitives()), ["A.a", "A.c", "A.b", "A.d"]);

        let packed = DescriptorGrouper::new(fields, &registry(), true, true);
        assert_eq!(names(packed.primitives()), ["A.c", "A.d", "A.a", "A.b"]);
    }

    #[test]
    fn ties_broken_by_name_then_declaring_class() {
        let fields = vec![
            Descriptor::new("Child", "v", FieldType::I32),
            Descriptor::new("Base", "v", FieldType::I32),
            Descriptor::new("Base", "u", FieldType::I32),
        ];
        let g = DescriptorGrouper::new(fields, &registry(), false, false);
        assert_eq!(names(g.primitives()), ["Base.u", "Base.v", "Child.v"]);
        assert_eq!(g.primitives()[0].name().to_string(), "u");
    }
}
