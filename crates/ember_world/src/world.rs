//! The lifecycle coordinator.
//!
//! A [`World`] owns one [`EntityIdPool`], one [`ComponentStorage`], and the
//! [`TypeRegistry`] that indexes it, and drives every mutation of the three.
//! Entity creation is immediate; activation, deactivation, and killing are
//! queued and take effect only when [`refresh`] drains the queues. The pool
//! and storage themselves never defer anything; pending state lives entirely
//! in the world's queues, and a killed entity's id stays valid until the
//! refresh actually removes it.
//!
//! [`refresh`]: World::refresh

use std::any::{Any, type_name};

use fixedbitset::FixedBitSet;
use thiserror::Error;
use tracing::{debug, trace};

use ember_component::{
    Component, ComponentStorage, EntityId, EntityIdPool, TypeIndex, TypeRegistry,
};

/// Errors surfaced by [`World`] operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorldError {
    /// The id refers to a recycled or never-created entity.
    #[error("stale entity id {0}")]
    StaleEntity(EntityId),

    /// The entity has no component of the requested type.
    #[error("entity {id} has no component of type {name}")]
    MissingComponent {
        /// The entity the component was requested on.
        id: EntityId,
        /// The Rust name of the requested component type.
        name: &'static str,
    },
}

/// The coordinator that owns all entity and component state.
///
/// Ids handed out by [`create`] are freely copyable values; validity is
/// re-derived from the pool on every operation, so a stale copy is rejected
/// with [`WorldError::StaleEntity`] instead of touching another entity's
/// data. Query-style calls ([`has_component`], [`is_activated`]) accept stale
/// ids silently and answer `false`.
///
/// [`create`]: World::create
/// [`has_component`]: World::has_component
/// [`is_activated`]: World::is_activated
#[derive(Default)]
pub struct World {
    /// Slot allocator; the sole authority on id validity.
    pool: EntityIdPool,
    /// Owned component instances, one entry per slot.
    storage: ComponentStorage,
    /// Dense type indices for every component kind this world has seen.
    registry: TypeRegistry,
    /// Activation flag per slot. Always sized to `pool.size()`.
    activated: Vec<bool>,
    /// Ids queued for activation at the next refresh.
    to_activate: Vec<EntityId>,
    /// Ids queued for deactivation at the next refresh.
    to_deactivate: Vec<EntityId>,
    /// Ids queued for removal at the next refresh.
    to_kill: Vec<EntityId>,
}

impl World {
    /// Create an empty world.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a world pre-grown to `capacity` entity slots.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let mut world = Self::default();
        world.pool.resize(capacity);
        world.storage.resize(capacity);
        world.activated.resize(capacity, false);
        world
    }

    /// Create a new entity and return its id.
    ///
    /// The entity exists immediately and components can be attached right
    /// away, but it starts deactivated; call [`activate`] and [`refresh`] to
    /// flip the flag.
    ///
    /// [`activate`]: World::activate
    /// [`refresh`]: World::refresh
    pub fn create(&mut self) -> EntityId {
        let id = self.pool.create();
        let size = self.pool.size();
        self.storage.resize(size);
        if self.activated.len() < size {
            self.activated.resize(size, false);
        }
        trace!(entity = %id, "created entity");
        id
    }

    /// Whether `id` still names a current entity.
    #[must_use]
    pub fn is_valid(&self, id: EntityId) -> bool {
        self.pool.is_valid(id)
    }

    /// Whether the entity is activated. Stale ids read as not activated.
    #[must_use]
    pub fn is_activated(&self, id: EntityId) -> bool {
        self.pool.is_valid(id) && self.activated.get(id.index() as usize).copied().unwrap_or(false)
    }

    /// Queue the entity for activation at the next [`refresh`].
    ///
    /// [`refresh`]: World::refresh
    pub fn activate(&mut self, id: EntityId) -> Result<(), WorldError> {
        self.ensure_valid(id)?;
        self.to_activate.push(id);
        Ok(())
    }

    /// Queue the entity for deactivation at the next [`refresh`].
    ///
    /// [`refresh`]: World::refresh
    pub fn deactivate(&mut self, id: EntityId) -> Result<(), WorldError> {
        self.ensure_valid(id)?;
        self.to_deactivate.push(id);
        Ok(())
    }

    /// Queue the entity for removal at the next [`refresh`].
    ///
    /// Until then the id stays valid and its components stay attached.
    /// Killing the same entity twice before a refresh is allowed; the
    /// second queue entry is dropped during the drain.
    ///
    /// [`refresh`]: World::refresh
    pub fn kill(&mut self, id: EntityId) -> Result<(), WorldError> {
        self.ensure_valid(id)?;
        self.to_kill.push(id);
        Ok(())
    }

    /// Drain the lifecycle queues: apply activations, then deactivations,
    /// then kills.
    ///
    /// Killing removes all of the entity's components and bumps the slot's
    /// generation, so every retained copy of the id is stale afterwards. Ids
    /// that went stale while queued (e.g. a duplicate kill) are skipped.
    pub fn refresh(&mut self) {
        let to_activate = std::mem::take(&mut self.to_activate);
        let activated = to_activate.len();
        for id in to_activate {
            if self.pool.is_valid(id) {
                self.activated[id.index() as usize] = true;
            } else {
                debug!(entity = %id, "dropping stale id from activate queue");
            }
        }

        let to_deactivate = std::mem::take(&mut self.to_deactivate);
        let deactivated = to_deactivate.len();
        for id in to_deactivate {
            if self.pool.is_valid(id) {
                self.activated[id.index() as usize] = false;
            } else {
                debug!(entity = %id, "dropping stale id from deactivate queue");
            }
        }

        let to_kill = std::mem::take(&mut self.to_kill);
        let killed = to_kill.len();
        for id in to_kill {
            match self.pool.remove(id) {
                Ok(()) => {
                    self.storage.remove_all(id);
                    self.activated[id.index() as usize] = false;
                }
                Err(_) => debug!(entity = %id, "dropping stale id from kill queue"),
            }
        }

        debug!(activated, deactivated, killed, "world refreshed");
    }

    /// Attach `component` to the entity, replacing any existing instance of
    /// the same type.
    pub fn add_component<T: Component>(
        &mut self,
        id: EntityId,
        component: T,
    ) -> Result<(), WorldError> {
        self.ensure_valid(id)?;
        let type_index = self.registry.index_of::<T>();
        self.storage.add(id, Box::new(component), type_index);
        Ok(())
    }

    /// Detach and drop the entity's component of type `T`.
    ///
    /// Removing a component the entity does not have is an error; check
    /// [`has_component`] first when unsure.
    ///
    /// [`has_component`]: World::has_component
    pub fn remove_component<T: Component>(&mut self, id: EntityId) -> Result<(), WorldError> {
        self.ensure_valid(id)?;
        let type_index = self.registry.get::<T>().ok_or_else(|| Self::missing::<T>(id))?;
        self.storage
            .remove(id, type_index)
            .map_err(|_| Self::missing::<T>(id))
    }

    /// Drop every component attached to the entity.
    pub fn remove_all_components(&mut self, id: EntityId) -> Result<(), WorldError> {
        self.ensure_valid(id)?;
        self.storage.remove_all(id);
        Ok(())
    }

    /// Borrow the entity's component of type `T`.
    pub fn get_component<T: Component>(&self, id: EntityId) -> Result<&T, WorldError> {
        self.ensure_valid(id)?;
        let type_index = self.registry.get::<T>().ok_or_else(|| Self::missing::<T>(id))?;
        let component = self
            .storage
            .get(id, type_index)
            .map_err(|_| Self::missing::<T>(id))?;
        let any: &dyn Any = component;
        Ok(any
            .downcast_ref::<T>()
            .expect("a type index always maps back to the type that registered it"))
    }

    /// Mutably borrow the entity's component of type `T`.
    pub fn get_component_mut<T: Component>(&mut self, id: EntityId) -> Result<&mut T, WorldError> {
        self.ensure_valid(id)?;
        let type_index = self.registry.get::<T>().ok_or_else(|| Self::missing::<T>(id))?;
        let component = self
            .storage
            .get_mut(id, type_index)
            .map_err(|_| Self::missing::<T>(id))?;
        let any: &mut dyn Any = component;
        Ok(any
            .downcast_mut::<T>()
            .expect("a type index always maps back to the type that registered it"))
    }

    /// Whether the entity has a component of type `T`. Stale ids and
    /// never-registered types read as `false`.
    #[must_use]
    pub fn has_component<T: Component>(&self, id: EntityId) -> bool {
        self.pool.is_valid(id)
            && self
                .registry
                .get::<T>()
                .is_some_and(|type_index| self.storage.has(id, type_index))
    }

    /// Every live component on the entity, in ascending type-index order.
    pub fn components(&self, id: EntityId) -> Result<Vec<&dyn Component>, WorldError> {
        self.ensure_valid(id)?;
        Ok(self.storage.components(id))
    }

    /// A snapshot of the entity's presence bitset, for signature matching.
    pub fn component_type_list(&self, id: EntityId) -> Result<FixedBitSet, WorldError> {
        self.ensure_valid(id)?;
        Ok(self.storage.type_list(id))
    }

    /// The dense type index this world uses for `T`, registering it on first
    /// use. Intended for layers that match signatures against
    /// [`component_type_list`] snapshots.
    ///
    /// [`component_type_list`]: World::component_type_list
    pub fn type_index_of<T: Component>(&mut self) -> TypeIndex {
        self.registry.index_of::<T>()
    }

    /// The registry mapping component types to indices.
    #[must_use]
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// A borrow-scoped handle pairing this world with `id`.
    ///
    /// The handle does not assert validity — like any id, it may be stale,
    /// and every accessor re-derives validity from the pool.
    #[must_use]
    pub fn entity(&self, id: EntityId) -> EntityRef<'_> {
        EntityRef { world: self, id }
    }

    /// The authoritative id currently stored at `index`, for rebuilding
    /// handles while iterating slots.
    #[must_use]
    pub fn id_at(&self, index: u32) -> Option<EntityId> {
        self.pool.get(index)
    }

    /// Number of entities currently alive (created and not yet removed).
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.pool.live_count()
    }

    /// Number of slots the world currently holds.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.pool.size()
    }

    /// Discard every entity, component, and queued lifecycle change.
    ///
    /// Generation history is discarded with the pool, so ids from before the
    /// clear must not be used afterwards. Registered type indices survive:
    /// the type-to-index mapping is stable for the world's lifetime.
    pub fn clear(&mut self) {
        self.pool = EntityIdPool::new();
        self.storage.clear();
        self.activated.clear();
        self.to_activate.clear();
        self.to_deactivate.clear();
        self.to_kill.clear();
        debug!("world cleared");
    }

    fn ensure_valid(&self, id: EntityId) -> Result<(), WorldError> {
        if self.pool.is_valid(id) {
            Ok(())
        } else {
            Err(WorldError::StaleEntity(id))
        }
    }

    fn missing<T: Component>(id: EntityId) -> WorldError {
        WorldError::MissingComponent {
            id,
            name: type_name::<T>(),
        }
    }
}

/// A non-owning handle: a world reference plus an [`EntityId`].
///
/// Many handles may name the same entity at once; that is safe because every
/// accessor re-derives validity instead of caching it. Two handles are equal
/// when they name the same id in the same world.
#[derive(Clone, Copy)]
pub struct EntityRef<'w> {
    world: &'w World,
    id: EntityId,
}

impl<'w> EntityRef<'w> {
    /// The underlying id.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Whether this handle still names a current entity.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.world.is_valid(self.id)
    }

    /// Whether the entity is activated.
    #[must_use]
    pub fn is_activated(&self) -> bool {
        self.world.is_activated(self.id)
    }

    /// Whether the entity has a component of type `T`.
    #[must_use]
    pub fn has<T: Component>(&self) -> bool {
        self.world.has_component::<T>(self.id)
    }

    /// Borrow the entity's component of type `T`.
    pub fn get<T: Component>(&self) -> Result<&'w T, WorldError> {
        self.world.get_component::<T>(self.id)
    }

    /// Every live component on the entity, ascending by type index.
    pub fn components(&self) -> Result<Vec<&'w dyn Component>, WorldError> {
        self.world.components(self.id)
    }

    /// A snapshot of the entity's presence bitset.
    pub fn type_list(&self) -> Result<FixedBitSet, WorldError> {
        self.world.component_type_list(self.id)
    }
}

impl PartialEq for EntityRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.world, other.world) && self.id == other.id
    }
}

impl std::fmt::Debug for EntityRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityRef").field("id", &self.id).finish()
    }
}
