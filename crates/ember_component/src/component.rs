//! Core [`Component`] trait.
//!
//! A component is a plain data record attached to an entity. The storage owns
//! every attached instance exclusively as a `Box<dyn Component>`; the `Any`
//! supertrait lets the typed API upcast to `dyn Any` and downcast back to the
//! concrete type once a [`TypeIndex`] lookup has identified it.
//!
//! [`TypeIndex`]: crate::registry::TypeIndex

use std::any::Any;

/// Marker trait for data that can be attached to an entity.
///
/// Components must be `Send + Sync + 'static` so a world can be moved across
/// threads as a whole (the storage itself is still single-owner, see the
/// crate docs). The trait is deliberately empty — components are identified
/// at runtime by the [`TypeRegistry`], not by any method on the value.
///
/// # Examples
///
/// ```rust
/// use ember_component::Component;
///
/// struct Health {
///     current: f32,
///     max: f32,
/// }
///
/// impl Component for Health {}
/// ```
///
/// [`TypeRegistry`]: crate::registry::TypeRegistry
pub trait Component: Any + Send + Sync {}
