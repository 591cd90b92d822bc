//! Entity builder for setup and tooling code.

use super::component::Component;
use super::entity::Entity;
use super::world::World;
use crate::error::EcsResult;
use crate::policy;

/// Creates an entity and attaches components to it in one expression.
///
/// Not meant for hot paths: every `with` goes through a mapper lookup.
///
/// ```rust,ignore
/// let player = world
///     .build_entity()
///     .with(Position::default())
///     .with(Health(100))
///     .build();
/// ```
#[must_use = "the entity already exists; call `build` to get its id"]
pub struct EntityBuilder<'w> {
    world: &'w mut World,
    entity: Entity,
}

impl<'w> EntityBuilder<'w> {
    pub(crate) fn new(world: &'w mut World) -> Self {
        let entity = world.create_entity();
        Self { world, entity }
    }

    /// The entity under construction.
    #[inline]
    pub fn entity(&self) -> Entity {
        self.entity
    }

    /// Attaches `value`.
    ///
    /// # Panics
    ///
    /// In debug builds, panics if the component cannot be attached (a
    /// singleton already held elsewhere). Release builds log and skip it.
    pub fn with<T: Component>(self, value: T) -> Self {
        let entity = self.entity;
        if let Err(err) = self.world.mapper::<T>().add(entity, value) {
            policy::recover("entity builder could not attach component", err, ());
        }
        self
    }

    /// Attaches `value`, returning any error to the caller.
    ///
    /// # Errors
    ///
    /// Returns [`crate::EcsError::SingletonConflict`] if `T` is a singleton
    /// held by another entity.
    pub fn try_with<T: Component>(self, value: T) -> EcsResult<Self> {
        let entity = self.entity;
        self.world.mapper::<T>().add(entity, value)?;
        Ok(self)
    }

    /// Finishes building and returns the entity.
    #[inline]
    pub fn build(self) -> Entity {
        self.entity
    }
}
