//! # Component Registry
//!
//! Components are pure data containers with no behavior. Each concrete type
//! receives one dense integer id the first time a registry observes it.
//!
//! Ids are:
//! - zero-based and contiguous, so they index bitsets directly
//! - monotonic and never reused for the lifetime of the registry
//! - scoped to one registry, so independent worlds never share assignments

use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::fmt;

/// Marker trait for ECS components.
///
/// # Example
///
/// ```rust,ignore
/// struct Health(i32);
/// impl Component for Health {}
///
/// struct GameClock { tick: u64 }
/// impl Component for GameClock {
///     const SINGLETON: bool = true;
/// }
/// ```
pub trait Component: Send + Sync + 'static {
    /// Whether at most one entity may carry this component.
    ///
    /// Singletons act as world-global blackboards.
    const SINGLETON: bool = false;
}

/// Dense identifier of a component type within one registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ComponentId(u32);

impl ComponentId {
    /// Creates an id from its raw index.
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the id as a bit index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "component#{}", self.0)
    }
}

/// Metadata recorded when a component type is first registered.
#[derive(Clone, Debug)]
pub struct ComponentDesc {
    /// Assigned id.
    pub id: ComponentId,
    /// Rust type name, for diagnostics.
    pub name: &'static str,
    /// Runtime type identity.
    pub type_id: TypeId,
    /// `size_of` the payload.
    pub size: usize,
    /// Whether the type is a singleton.
    pub singleton: bool,
}

/// Registry mapping component types to dense ids.
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    by_type: HashMap<TypeId, ComponentId>,
    descs: Vec<ComponentDesc>,
}

impl ComponentRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id of `T`, assigning the next free id on first use.
    ///
    /// # Panics
    ///
    /// Panics if more than `u32::MAX` component types are registered.
    pub fn id_of<T: Component>(&mut self) -> ComponentId {
        let type_id = TypeId::of::<T>();
        if let Some(&id) = self.by_type.get(&type_id) {
            return id;
        }

        assert!(
            self.descs.len() < u32::MAX as usize,
            "component id space exhausted"
        );
        #[allow(clippy::cast_possible_truncation)]
        let id = ComponentId(self.descs.len() as u32);
        self.descs.push(ComponentDesc {
            id,
            name: type_name::<T>(),
            type_id,
            size: std::mem::size_of::<T>(),
            singleton: T::SINGLETON,
        });
        self.by_type.insert(type_id, id);
        tracing::trace!("registered component {} as {}", type_name::<T>(), id);
        id
    }

    /// Returns the id of `T` if it has been registered. Never assigns.
    #[inline]
    #[must_use]
    pub fn lookup<T: Component>(&self) -> Option<ComponentId> {
        self.by_type.get(&TypeId::of::<T>()).copied()
    }

    /// Returns the metadata for `id`.
    #[inline]
    #[must_use]
    pub fn describe(&self, id: ComponentId) -> Option<&ComponentDesc> {
        self.descs.get(id.index())
    }

    /// Number of registered types. Bounds bitset sizing.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.descs.len()
    }

    /// Returns `true` if no type has been registered yet.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descs.is_empty()
    }

    /// Iterates registered types in id order.
    pub fn iter(&self) -> impl Iterator<Item = &ComponentDesc> {
        self.descs.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Health;
    impl Component for Health {}

    struct Armor;
    impl Component for Armor {}

    struct Clock;
    impl Component for Clock {
        const SINGLETON: bool = true;
    }

    #[test]
    fn test_ids_are_stable_and_dense() {
        let mut registry = ComponentRegistry::new();
        let health = registry.id_of::<Health>();
        let armor = registry.id_of::<Armor>();

        assert_eq!(health.index(), 0);
        assert_eq!(armor.index(), 1);
        assert_eq!(registry.id_of::<Health>(), health);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_lookup_never_assigns() {
        let mut registry = ComponentRegistry::new();
        assert_eq!(registry.lookup::<Health>(), None);
        assert!(registry.is_empty());

        let id = registry.id_of::<Health>();
        assert_eq!(registry.lookup::<Health>(), Some(id));
    }

    #[test]
    fn test_registries_are_independent() {
        let mut a = ComponentRegistry::new();
        let mut b = ComponentRegistry::new();
        a.id_of::<Health>();

        assert_eq!(a.id_of::<Armor>().index(), 1);
        assert_eq!(b.id_of::<Armor>().index(), 0);
    }

    #[test]
    fn test_describe_records_metadata() {
        let mut registry = ComponentRegistry::new();
        let id = registry.id_of::<Clock>();
        let desc = registry.describe(id).unwrap();

        assert!(desc.singleton);
        assert!(desc.name.ends_with("Clock"));
        assert_eq!(desc.type_id, TypeId::of::<Clock>());
        assert!(registry.describe(ComponentId::from_raw(9)).is_none());
    }
}
