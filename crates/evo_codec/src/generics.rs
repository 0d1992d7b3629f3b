use alloc::vec::Vec;

use evo_meta::FieldType;

/// Declared container types of the values currently being written or read.
///
/// A field of type `List<T>` pushes its type before handing the list to the
/// collection serializer, which looks at [`top`](Self::top) for `T`.
#[derive(Debug, Default)]
pub struct Generics {
    stack: Vec<FieldType>,
}

impl Generics {
    #[inline]
    pub const fn new() -> Self {
        Self { stack: Vec::new() }
    }

    #[inline]
    pub fn push(&mut self, ty: FieldType) {
        self.stack.push(ty);
    }

    #[inline]
    pub fn pop(&mut self) {
        self.stack.pop();
    }

    #[inline]
    pub fn top(&self) -> Option<&FieldType> {
        self.stack.last()
    }

    /// Element type of the list or set on top, [`FieldType::Any`] otherwise.
    pub fn element(&self) -> FieldType {
        match self.top() {
            Some(FieldType::List(e) | FieldType::Set(e)) => (**e).clone(),
            _ => FieldType::Any,
        }
    }

    /// Key and value types of the map on top, [`FieldType::Any`] otherwise.
    pub fn entry(&self) -> (FieldType, FieldType) {
        match self.top() {
            Some(FieldType::Map(k, v)) => ((**k).clone(), (**v).clone()),
            _ => (FieldType::Any, FieldType::Any),
        }
    }

    #[inline]
    pub fn clear(&mut self) {
        self.stack.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_containers() {
        let mut generics = Generics::new();
        assert_eq!(generics.element(), FieldType::Any);

        generics.push(FieldType::map(FieldType::STRING, FieldType::list(FieldType::I64)));
        assert_eq!(generics.entry(), (FieldType::STRING, FieldType::list(FieldType::I64)));
        // A map on top says nothing about list elements.
        assert_eq!(generics.element(), FieldType::Any);

        generics.push(FieldType::list(FieldType::I64));
        assert_eq!(generics.element(), FieldType::I64);
        generics.pop();
        assert!(matches!(generics.top(), Some(FieldType::Map(..))));
    }
}
