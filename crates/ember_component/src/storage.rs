//! Per-entity component storage.
//!
//! One entry per entity slot. Each entry is a sparse array of owned component
//! instances indexed by [`TypeIndex`], plus a parallel presence bitset. The
//! bitset answers composition queries in O(1) without touching component
//! data, and its snapshot ([`ComponentStorage::type_list`]) is what a query /
//! matching layer tests signatures against.
//!
//! The storage addresses entries by `id.index()` alone — it has no opinion on
//! handle validity. The owning coordinator checks ids against the pool before
//! mutating here (see the crate docs).
//!
//! References returned by [`get`] cannot be held across [`add`] or
//! [`resize`], since growth may relocate the backing arrays. The borrow
//! checker enforces exactly that: both take `&mut self`.
//!
//! [`get`]: ComponentStorage::get
//! [`add`]: ComponentStorage::add
//! [`resize`]: ComponentStorage::resize

use fixedbitset::FixedBitSet;
use thiserror::Error;

use crate::component::Component;
use crate::entity::EntityId;
use crate::registry::TypeIndex;

/// Errors produced by [`ComponentStorage`] operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StorageError {
    /// The entity slot holds no component with the given type index.
    #[error("no component with type index {type_index} on entity slot {index}")]
    MissingComponent {
        /// The entity's slot index.
        index: u32,
        /// The requested component kind.
        type_index: TypeIndex,
    },
}

/// The component set attached to a single entity slot.
///
/// Both arrays grow together as higher type indices are observed; the bit at
/// `t` is set iff `components[t]` holds a live instance.
#[derive(Default)]
struct EntityEntry {
    components: Vec<Option<Box<dyn Component>>>,
    type_list: FixedBitSet,
}

/// Owns every component instance attached to any entity.
///
/// Attach, detach, and presence checks are O(1); [`remove_all`] is O(k) in
/// the number of component kinds the entity ever held, not in the total
/// number of kinds the system knows about.
///
/// [`remove_all`]: ComponentStorage::remove_all
#[derive(Default)]
pub struct ComponentStorage {
    entries: Vec<EntityEntry>,
}

impl ComponentStorage {
    /// Create an empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a storage pre-grown to `capacity` entity slots.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let mut storage = Self::default();
        storage.resize(capacity);
        storage
    }

    /// Attach `component` to the entity under `type_index`.
    ///
    /// The storage takes exclusive ownership of the instance. Attaching a
    /// kind the entity already has replaces (and drops) the previous
    /// instance. Arrays grow on demand: the entity's sparse array extends to
    /// `type_index + 1`, and the outer per-slot array extends to cover
    /// `id.index()`.
    pub fn add(&mut self, id: EntityId, component: Box<dyn Component>, type_index: TypeIndex) {
        let index = id.index() as usize;
        if index >= self.entries.len() {
            self.entries.resize_with(index + 1, EntityEntry::default);
        }

        let entry = &mut self.entries[index];
        let t = type_index.get() as usize;
        if t >= entry.components.len() {
            entry.components.resize_with(t + 1, || None);
        }
        entry.components[t] = Some(component);
        entry.type_list.grow(t + 1);
        entry.type_list.insert(t);
    }

    /// Detach and drop the entity's component of kind `type_index`.
    ///
    /// Removing a kind that is not present is a checked error; callers that
    /// cannot know should ask [`has`] first.
    ///
    /// [`has`]: ComponentStorage::has
    pub fn remove(&mut self, id: EntityId, type_index: TypeIndex) -> Result<(), StorageError> {
        let index = id.index() as usize;
        let t = type_index.get() as usize;
        let missing = StorageError::MissingComponent {
            index: id.index(),
            type_index,
        };

        let Some(entry) = self.entries.get_mut(index) else {
            return Err(missing);
        };
        match entry.components.get_mut(t) {
            Some(slot) if slot.is_some() => {
                *slot = None;
                entry.type_list.set(t, false);
                Ok(())
            }
            _ => Err(missing),
        }
    }

    /// Drop every component attached to the entity and empty its presence
    /// bitset, in one pass.
    pub fn remove_all(&mut self, id: EntityId) {
        if let Some(entry) = self.entries.get_mut(id.index() as usize) {
            entry.components.clear();
            entry.type_list = FixedBitSet::new();
        }
    }

    /// Borrow the entity's component of kind `type_index`.
    ///
    /// Absence is a checked error, mirroring [`remove`].
    ///
    /// [`remove`]: ComponentStorage::remove
    pub fn get(&self, id: EntityId, type_index: TypeIndex) -> Result<&dyn Component, StorageError> {
        self.entries
            .get(id.index() as usize)
            .and_then(|entry| entry.components.get(type_index.get() as usize))
            .and_then(|slot| slot.as_deref())
            .ok_or(StorageError::MissingComponent {
                index: id.index(),
                type_index,
            })
    }

    /// Mutably borrow the entity's component of kind `type_index`.
    pub fn get_mut(
        &mut self,
        id: EntityId,
        type_index: TypeIndex,
    ) -> Result<&mut dyn Component, StorageError> {
        self.entries
            .get_mut(id.index() as usize)
            .and_then(|entry| entry.components.get_mut(type_index.get() as usize))
            .and_then(|slot| slot.as_deref_mut())
            .ok_or(StorageError::MissingComponent {
                index: id.index(),
                type_index,
            })
    }

    /// Whether the entity currently has a component of kind `type_index`.
    ///
    /// O(1) bitset test. A type index beyond what this entity's arrays ever
    /// grew to reads as absent, never as an error.
    #[must_use]
    pub fn has(&self, id: EntityId, type_index: TypeIndex) -> bool {
        self.entries
            .get(id.index() as usize)
            .is_some_and(|entry| entry.type_list.contains(type_index.get() as usize))
    }

    /// Every live component on the entity, in ascending type-index order.
    ///
    /// Introspection helper — not the per-frame query path.
    #[must_use]
    pub fn components(&self, id: EntityId) -> Vec<&dyn Component> {
        self.entries
            .get(id.index() as usize)
            .map(|entry| entry.components.iter().filter_map(|slot| slot.as_deref()).collect())
            .unwrap_or_default()
    }

    /// A snapshot of the entity's presence bitset.
    ///
    /// Query / matching layers test subset relations against this copy
    /// without touching component data.
    #[must_use]
    pub fn type_list(&self, id: EntityId) -> FixedBitSet {
        self.entries
            .get(id.index() as usize)
            .map(|entry| entry.type_list.clone())
            .unwrap_or_default()
    }

    /// Grow the outer per-slot array to hold at least `amount` entities.
    ///
    /// New entries start with no components. Shrinking is not supported.
    pub fn resize(&mut self, amount: usize) {
        if amount > self.entries.len() {
            self.entries.resize_with(amount, EntityEntry::default);
        }
    }

    /// Discard every entry and all owned components.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of entity slots the storage currently holds.
    #[must_use]
    pub fn size(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TypeRegistry;

    #[derive(Debug, PartialEq)]
    struct Position {
        x: f32,
        y: f32,
    }
    #[derive(Debug, PartialEq)]
    struct Velocity {
        x: f32,
        y: f32,
    }
    struct Tag;

    impl Component for Position {}
    impl Component for Velocity {}
    impl Component for Tag {}

    fn downcast<T: Component>(component: &dyn Component) -> &T {
        let any: &dyn std::any::Any = component;
        any.downcast_ref::<T>().unwrap()
    }

    /// The round-trip invariant: bit set iff the slot holds a live instance.
    fn assert_consistent(storage: &ComponentStorage, id: EntityId) {
        let entry = &storage.entries[id.index() as usize];
        for (t, slot) in entry.components.iter().enumerate() {
            assert_eq!(entry.type_list.contains(t), slot.is_some());
        }
    }

    #[test]
    fn test_add_then_query() {
        let mut registry = TypeRegistry::new();
        let mut storage = ComponentStorage::with_capacity(4);
        let id = EntityId::new(0, 0);
        let t = registry.index_of::<Position>();

        storage.add(id, Box::new(Position { x: 1.0, y: 2.0 }), t);
        assert!(storage.has(id, t));
        assert_eq!(downcast::<Position>(storage.get(id, t).unwrap()).x, 1.0);
        assert_consistent(&storage, id);
    }

    #[test]
    fn test_overwrite_replaces_instance() {
        let mut registry = TypeRegistry::new();
        let mut storage = ComponentStorage::with_capacity(1);
        let id = EntityId::new(0, 0);
        let t = registry.index_of::<Position>();

        storage.add(id, Box::new(Position { x: 1.0, y: 1.0 }), t);
        storage.add(id, Box::new(Position { x: 9.0, y: 9.0 }), t);
        assert_eq!(
            downcast::<Position>(storage.get(id, t).unwrap()),
            &Position { x: 9.0, y: 9.0 }
        );
        assert_consistent(&storage, id);
    }

    #[test]
    fn test_remove_clears_bit() {
        let mut registry = TypeRegistry::new();
        let mut storage = ComponentStorage::with_capacity(1);
        let id = EntityId::new(0, 0);
        let t = registry.index_of::<Position>();

        storage.add(id, Box::new(Position { x: 0.0, y: 0.0 }), t);
        storage.remove(id, t).unwrap();
        assert!(!storage.has(id, t));
        assert!(storage.get(id, t).is_err());
        assert_consistent(&storage, id);
    }

    #[test]
    fn test_remove_absent_is_checked() {
        let mut registry = TypeRegistry::new();
        let mut storage = ComponentStorage::with_capacity(1);
        let id = EntityId::new(0, 0);
        let t = registry.index_of::<Position>();

        assert_eq!(
            storage.remove(id, t),
            Err(StorageError::MissingComponent {
                index: 0,
                type_index: t
            })
        );
    }

    #[test]
    fn test_has_beyond_grown_capacity_is_absent() {
        let mut storage = ComponentStorage::with_capacity(1);
        let id = EntityId::new(0, 0);
        assert!(!storage.has(id, TypeIndex::new(1000)));
        // Out-of-range entity slot reads as absent too.
        assert!(!storage.has(EntityId::new(50, 0), TypeIndex::new(0)));
    }

    #[test]
    fn test_growth_preserves_lower_indices() {
        let mut registry = TypeRegistry::new();
        let mut storage = ComponentStorage::with_capacity(1);
        let id = EntityId::new(0, 0);
        let p = registry.index_of::<Position>();

        storage.add(id, Box::new(Position { x: 3.0, y: 4.0 }), p);
        // Force a far larger type index than the entry has grown to.
        storage.add(id, Box::new(Tag), TypeIndex::new(63));

        assert!(storage.has(id, p));
        assert_eq!(downcast::<Position>(storage.get(id, p).unwrap()).y, 4.0);
        assert!(storage.has(id, TypeIndex::new(63)));
        assert_consistent(&storage, id);
    }

    #[test]
    fn test_remove_all_clears_exactly_this_entity() {
        let mut registry = TypeRegistry::new();
        let mut storage = ComponentStorage::with_capacity(2);
        let a = EntityId::new(0, 0);
        let b = EntityId::new(1, 0);
        let p = registry.index_of::<Position>();
        let v = registry.index_of::<Velocity>();

        storage.add(a, Box::new(Position { x: 1.0, y: 1.0 }), p);
        storage.add(a, Box::new(Velocity { x: 2.0, y: 2.0 }), v);
        storage.add(b, Box::new(Position { x: 5.0, y: 5.0 }), p);

        storage.remove_all(a);
        assert!(!storage.has(a, p));
        assert!(!storage.has(a, v));
        assert!(storage.type_list(a).is_clear());

        // The other entity is untouched.
        assert!(storage.has(b, p));
        assert_eq!(downcast::<Position>(storage.get(b, p).unwrap()).x, 5.0);
        assert_consistent(&storage, b);
    }

    #[test]
    fn test_components_ascend_by_type_index() {
        let mut registry = TypeRegistry::new();
        let mut storage = ComponentStorage::with_capacity(1);
        let id = EntityId::new(0, 0);
        let p = registry.index_of::<Position>();
        let v = registry.index_of::<Velocity>();

        // Attach in reverse registration order.
        storage.add(id, Box::new(Velocity { x: 0.0, y: 1.0 }), v);
        storage.add(id, Box::new(Position { x: 1.0, y: 0.0 }), p);

        let all = storage.components(id);
        assert_eq!(all.len(), 2);
        assert_eq!(downcast::<Position>(all[0]), &Position { x: 1.0, y: 0.0 });
        assert_eq!(downcast::<Velocity>(all[1]), &Velocity { x: 0.0, y: 1.0 });
    }

    #[test]
    fn test_type_list_snapshot_for_matching() {
        let mut registry = TypeRegistry::new();
        let mut storage = ComponentStorage::with_capacity(1);
        let id = EntityId::new(0, 0);
        let p = registry.index_of::<Position>();
        let v = registry.index_of::<Velocity>();

        storage.add(id, Box::new(Position { x: 0.0, y: 0.0 }), p);
        storage.add(id, Box::new(Velocity { x: 0.0, y: 0.0 }), v);

        // A filter requiring only Position is a subset of the entity's list.
        let mut filter = FixedBitSet::with_capacity(2);
        filter.insert(p.get() as usize);
        assert!(filter.is_subset(&storage.type_list(id)));

        // The snapshot is a copy: mutating storage does not change it.
        let snapshot = storage.type_list(id);
        storage.remove(id, v).unwrap();
        assert!(snapshot.contains(v.get() as usize));
        assert!(!storage.type_list(id).contains(v.get() as usize));
    }

    #[test]
    fn test_resize_and_clear() {
        let mut registry = TypeRegistry::new();
        let mut storage = ComponentStorage::new();
        let t = registry.index_of::<Tag>();

        storage.resize(8);
        assert_eq!(storage.size(), 8);
        storage.resize(2);
        assert_eq!(storage.size(), 8);

        storage.add(EntityId::new(3, 0), Box::new(Tag), t);
        storage.clear();
        assert_eq!(storage.size(), 0);
        assert!(!storage.has(EntityId::new(3, 0), t));
    }
}
