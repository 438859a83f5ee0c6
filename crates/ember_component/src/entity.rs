//! Entity identifier value type.
//!
//! An [`EntityId`] pairs a slot index with a generation counter. The index
//! names a slot in the pool's arrays and in component storage; the generation
//! distinguishes entities that occupy the same slot at different points in
//! time. The id carries no data and owns nothing — validity is always
//! re-derived by asking the [`EntityIdPool`], never cached in the id.
//!
//! [`EntityIdPool`]: crate::pool::EntityIdPool

use serde::{Deserialize, Serialize};

/// A recyclable entity handle: a slot index plus a generation counter.
///
/// Two ids name the same logical entity if and only if both fields match.
/// An id whose generation no longer matches the pool's stored generation for
/// that slot is stale and fails [`EntityIdPool::is_valid`].
///
/// [`EntityIdPool::is_valid`]: crate::pool::EntityIdPool::is_valid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId {
    index: u32,
    generation: u32,
}

impl EntityId {
    /// Create an id from a raw slot index and generation.
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// The slot index this id refers to.
    #[must_use]
    pub const fn index(self) -> u32 {
        self.index
    }

    /// The generation the slot had when this id was issued.
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}
