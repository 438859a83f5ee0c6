//! # ember_world
//!
//! Lifecycle coordinator for the ember entity-component core.
//!
//! The [`World`] owns the generational id pool, the component storage, and
//! the type registry from `ember_component`, and layers the deferred
//! lifecycle on top: entities are created immediately, but activation,
//! deactivation, and killing are queued until [`World::refresh`] drains them
//! at the caller's cadence, typically once per frame or tick.

pub mod world;

pub use world::{EntityRef, World, WorldError};
