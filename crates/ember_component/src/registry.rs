//! Runtime type identification for component kinds.
//!
//! The [`TypeRegistry`] assigns a small dense integer — a [`TypeIndex`] — to
//! each distinct component type the first time it is seen. That index is what
//! the storage uses to address its sparse per-entity arrays, so indices must
//! stay dense and stable; they are never reused or reclaimed.
//!
//! The registry is an owned value, not a process global: whoever owns the
//! storage owns the registry that indexes it, and registration is
//! single-threaded by the same external synchronisation that guards the
//! storage.

use std::any::{TypeId, type_name};
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::component::Component;

/// Dense runtime identifier for a component kind.
///
/// Assigned by [`TypeRegistry::index_of`] in registration order, starting at
/// 0. Used directly as an index into per-entity sparse arrays and presence
/// bitsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeIndex(u32);

impl TypeIndex {
    /// Create a type index from its raw value.
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw dense index.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for TypeIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Metadata recorded for each registered component kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeDescriptor {
    /// The Rust type name, for diagnostics.
    pub name: &'static str,
    /// The runtime `TypeId` of the component type.
    pub type_id: TypeId,
}

/// Maps component types to dense [`TypeIndex`] values.
///
/// The mapping is injective and stable for the registry's lifetime: the first
/// [`index_of`] call for a type assigns the next free index, every later call
/// returns the same one. There is no removal.
///
/// [`index_of`]: TypeRegistry::index_of
#[derive(Debug, Default)]
pub struct TypeRegistry {
    indices: HashMap<TypeId, TypeIndex>,
    descriptors: Vec<TypeDescriptor>,
}

impl TypeRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The index for component type `T`, assigning a fresh one on first use.
    ///
    /// O(1) amortized.
    pub fn index_of<T: Component>(&mut self) -> TypeIndex {
        let type_id = TypeId::of::<T>();
        if let Some(&index) = self.indices.get(&type_id) {
            return index;
        }

        let index = TypeIndex::new(self.descriptors.len() as u32);
        self.indices.insert(type_id, index);
        self.descriptors.push(TypeDescriptor {
            name: type_name::<T>(),
            type_id,
        });
        index
    }

    /// The index for component type `T`, if it has been registered.
    #[must_use]
    pub fn get<T: Component>(&self) -> Option<TypeIndex> {
        self.indices.get(&TypeId::of::<T>()).copied()
    }

    /// The descriptor recorded for `index`, if any.
    #[must_use]
    pub fn descriptor(&self, index: TypeIndex) -> Option<&TypeDescriptor> {
        self.descriptors.get(index.get() as usize)
    }

    /// The type name registered for `index`, for diagnostics.
    #[must_use]
    pub fn name(&self, index: TypeIndex) -> Option<&'static str> {
        self.descriptor(index).map(|desc| desc.name)
    }

    /// Number of component kinds registered so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Whether no component kind has been registered yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Position;
    struct Velocity;
    impl Component for Position {}
    impl Component for Velocity {}

    #[test]
    fn test_indices_are_dense_and_stable() {
        let mut registry = TypeRegistry::new();
        let p = registry.index_of::<Position>();
        let v = registry.index_of::<Velocity>();

        assert_eq!(p, TypeIndex::new(0));
        assert_eq!(v, TypeIndex::new(1));
        // Re-registration returns the cached index.
        assert_eq!(registry.index_of::<Position>(), p);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_get_without_registration() {
        let registry = TypeRegistry::new();
        assert_eq!(registry.get::<Position>(), None);
    }

    #[test]
    fn test_descriptor_names() {
        let mut registry = TypeRegistry::new();
        let p = registry.index_of::<Position>();
        assert!(registry.name(p).unwrap().ends_with("Position"));
        assert_eq!(registry.name(TypeIndex::new(9)), None);
    }
}
