//! # ember_component
//!
//! Entity-component storage core: recyclable entity ids and dynamically
//! typed per-entity component storage.
//!
//! This crate provides:
//!
//! - [`EntityId`] — lightweight (index, generation) entity handles.
//! - [`EntityIdPool`] — generational slot allocator; the sole authority on
//!   handle validity.
//! - [`TypeRegistry`] — dense runtime [`TypeIndex`] per component kind.
//! - [`Component`] trait — the contract for data attached to entities.
//! - [`ComponentStorage`] — sparse, type-indexed per-entity storage with a
//!   parallel presence bitset.
//!
//! The pool and storage are passive, single-owner structures: a coordinator
//! (see the `ember_world` crate) owns one of each, checks ids against the
//! pool, and drives every mutation. Nothing here locks or defers: all
//! operations are synchronous and immediately visible.

pub mod component;
pub mod entity;
pub mod pool;
pub mod registry;
pub mod storage;

pub use component::Component;
pub use entity::EntityId;
pub use pool::{EntityIdPool, PoolError};
pub use registry::{TypeDescriptor, TypeIndex, TypeRegistry};
pub use storage::{ComponentStorage, StorageError};
