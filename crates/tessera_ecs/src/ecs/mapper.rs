//! # Component Mapper
//!
//! Typed access to one component type's storage through the world.
//!
//! Every mutation goes through the world, which updates the entity's flags
//! and aspect memberships before the call returns.

use std::marker::PhantomData;

use super::component::{Component, ComponentId};
use super::entity::Entity;
use super::storage::ComponentStorage;
use super::world::World;
use crate::error::{EcsError, EcsResult};

/// Handle for reading and mutating components of type `T`.
///
/// # Example
///
/// ```rust,ignore
/// let mut health = world.mapper::<Health>();
/// health.add(player, Health(100))?;
/// if let Some(h) = health.get_mut(player) {
///     h.0 -= 10;
/// }
/// ```
pub struct ComponentMapper<'w, T: Component> {
    world: &'w mut World,
    id: ComponentId,
    _marker: PhantomData<fn() -> T>,
}

impl<'w, T: Component> ComponentMapper<'w, T> {
    pub(crate) fn new(world: &'w mut World, id: ComponentId) -> Self {
        Self {
            world,
            id,
            _marker: PhantomData,
        }
    }

    /// The component id of `T` in this world.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ComponentId {
        self.id
    }

    /// Attaches `value` to `entity`, returning the value it replaced.
    ///
    /// A new attachment reports `ComponentAdded` and may change aspect
    /// membership; a replacement reports `ComponentUpdated`.
    ///
    /// # Errors
    ///
    /// - [`EcsError::InvalidEntity`] / [`EcsError::EntityDoesNotExist`] if
    ///   `entity` is not live.
    /// - [`EcsError::SingletonConflict`] if `T` is a singleton held by another
    ///   entity.
    pub fn add(&mut self, entity: Entity, value: T) -> EcsResult<Option<T>> {
        self.world.insert_component(self.id, entity, value)
    }

    /// Replaces the value of an existing component, returning the old value.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ComponentMissing`] if `entity` does not have `T`,
    /// or a lifecycle error if `entity` is not live.
    pub fn update(&mut self, entity: Entity, value: T) -> EcsResult<T> {
        self.world.check_entity(entity)?;
        if !self.has(entity) {
            return Err(EcsError::ComponentMissing {
                entity,
                component: std::any::type_name::<T>(),
            });
        }
        self.add(entity, value)?.ok_or(EcsError::ComponentMissing {
            entity,
            component: std::any::type_name::<T>(),
        })
    }

    /// Gets the component of `entity`.
    #[inline]
    #[must_use]
    pub fn get(&self, entity: Entity) -> Option<&T> {
        self.storage().and_then(|s| s.get(entity))
    }

    /// Gets the component of `entity` mutably.
    ///
    /// In-place edits do not report `ComponentUpdated`; use
    /// [`ComponentMapper::update`] when observers must see the change.
    #[inline]
    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        self.world.storage_mut::<T>(self.id).and_then(|s| s.get_mut(entity))
    }

    /// Checks if `entity` has `T`.
    #[inline]
    #[must_use]
    pub fn has(&self, entity: Entity) -> bool {
        self.storage().is_some_and(|s| s.contains(entity))
    }

    /// Detaches `T` from `entity`. Returns `Ok(None)` if it was not attached.
    ///
    /// # Errors
    ///
    /// Returns a lifecycle error if `entity` is not live.
    pub fn remove(&mut self, entity: Entity) -> EcsResult<Option<T>> {
        self.world.take_component(self.id, entity)
    }

    /// Number of entities holding `T`.
    #[must_use]
    pub fn len(&self) -> usize {
        self.storage().map_or(0, ComponentStorage::len)
    }

    /// Returns `true` if no entity holds `T`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates `(entity, value)` pairs in ascending entity order.
    pub fn iter(&self) -> impl Iterator<Item = (Entity, &T)> {
        self.storage().into_iter().flat_map(ComponentStorage::iter)
    }

    fn storage(&self) -> Option<&ComponentStorage<T>> {
        self.world.storage::<T>(self.id)
    }
}
