//! Generational entity id pool.
//!
//! The pool owns the universe of slot indices and is the single source of
//! truth for handle validity. Removing an id bumps its slot's generation, so
//! every previously issued id for that slot becomes detectably stale instead
//! of aliasing whatever entity reuses the slot later. Validity is a single
//! integer comparison with no indirection.

use thiserror::Error;

use crate::entity::EntityId;

/// Errors produced by [`EntityIdPool`] operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    /// The id's generation does not match the slot's current generation (or
    /// the slot does not exist). The slot was recycled, removed, or never
    /// created.
    #[error("stale entity id {id}: slot no longer carries this generation")]
    StaleId {
        /// The offending id.
        id: EntityId,
    },
}

/// A pool of recyclable entity ids.
///
/// The pool keeps one authoritative [`EntityId`] per slot and a free list of
/// slot indices available for reuse. [`create`] pops the free list when it
/// can and appends a fresh slot otherwise; [`remove`] bumps the slot's
/// generation and returns the index to the free list.
///
/// Ids are values, not addresses; internal array growth never invalidates an
/// outstanding id.
///
/// [`create`]: EntityIdPool::create
/// [`remove`]: EntityIdPool::remove
#[derive(Debug, Default)]
pub struct EntityIdPool {
    /// Append cursor: the next slot index handed out when the free list is
    /// empty. Always `<= entities.len()` after any public call returns.
    next_index: u32,
    /// Slot indices available for reuse.
    free: Vec<u32>,
    /// The authoritative id currently stored at each slot.
    entities: Vec<EntityId>,
}

impl EntityIdPool {
    /// Create an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pool pre-grown to `capacity` slots.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let mut pool = Self::default();
        pool.resize(capacity);
        pool
    }

    /// Hand out an id for a fresh or recycled slot.
    ///
    /// If a slot is available on the free list, its index is reused and the
    /// returned id carries that slot's current generation. Otherwise a new
    /// slot is appended with generation 0. Amortized O(1).
    pub fn create(&mut self) -> EntityId {
        if let Some(index) = self.free.pop() {
            return self.entities[index as usize];
        }

        let index = self.next_index;
        self.next_index += 1;
        if (index as usize) >= self.entities.len() {
            self.entities.push(EntityId::new(index, 0));
        }
        debug_assert_eq!(self.entities[index as usize].index(), index);
        self.entities[index as usize]
    }

    /// Invalidate `id` and return its slot to the free list.
    ///
    /// The slot's generation is incremented, so `id` and every other copy of
    /// it fail [`is_valid`] from this point on. Removing an id that is
    /// already stale is a checked error and leaves the pool untouched.
    ///
    /// [`is_valid`]: EntityIdPool::is_valid
    pub fn remove(&mut self, id: EntityId) -> Result<(), PoolError> {
        let Some(slot) = self.entities.get_mut(id.index() as usize) else {
            return Err(PoolError::StaleId { id });
        };
        if slot.generation() != id.generation() {
            return Err(PoolError::StaleId { id });
        }

        *slot = EntityId::new(id.index(), slot.generation().wrapping_add(1));
        self.free.push(id.index());
        Ok(())
    }

    /// The authoritative id currently stored at `index`, or `None` if the
    /// slot does not exist.
    ///
    /// Use this to reconstruct a fresh, valid id for a slot, e.g. when
    /// iterating all slots.
    #[must_use]
    pub fn get(&self, index: u32) -> Option<EntityId> {
        self.entities.get(index as usize).copied()
    }

    /// Whether `id` still names the entity it was issued for.
    ///
    /// True iff the slot exists and its stored generation matches
    /// `id.generation()`. This is the single source of truth for validity.
    #[must_use]
    pub fn is_valid(&self, id: EntityId) -> bool {
        self.entities
            .get(id.index() as usize)
            .is_some_and(|slot| slot.generation() == id.generation())
    }

    /// Grow the pool to hold at least `amount` slots.
    ///
    /// New slots start at generation 0 and are handed out by [`create`]'s
    /// append path. Shrinking is not supported, since slot indices are
    /// referenced externally; a smaller `amount` is a no-op.
    ///
    /// [`create`]: EntityIdPool::create
    pub fn resize(&mut self, amount: usize) {
        let current = self.entities.len();
        if amount <= current {
            return;
        }
        self.entities
            .extend((current..amount).map(|index| EntityId::new(index as u32, 0)));
    }

    /// Total number of slots the pool currently holds.
    #[must_use]
    pub fn size(&self) -> usize {
        self.entities.len()
    }

    /// Number of ids handed out and not yet removed.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.next_index as usize - self.free.len()
    }

    /// Number of slots waiting on the free list.
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.free.len()
    }
}
