//! # Iterating System
//!
//! The common case: run one closure per matching entity.
//!
//! Each update walks a frozen snapshot of the system's list and commits at
//! the end. Structural changes made while processing one entity reach later
//! entities of the same pass only through the live membership check: an
//! entity that was destroyed, or stopped matching, earlier in the walk is
//! skipped.
//!
//! Externally managed lists are owned by the caller, so only liveness is
//! rechecked; entities the owner removes mid-walk drop out on the next pass.

use crate::ecs::{Aspect, Entity, World};
use crate::error::EcsResult;
use crate::sync::SnapshotList;

use super::entity_system::{EntitySystem, Pass, SystemHints, SystemInit};

/// A system that processes each entity of its aspect with a closure.
///
/// # Example
///
/// ```rust,ignore
/// let aspect = world.aspect().all::<(Position, Velocity)>().build();
/// let movement = IteratingSystem::new("movement", aspect, Pass::FixedUpdate,
///     |world, entity, dt| {
///         let v = *world.get::<Velocity>(entity).unwrap();
///         if let Some(p) = world.mapper::<Position>().get_mut(entity) {
///             p.0 += v.0 * dt;
///         }
///         Ok(())
///     });
/// world.add_system(movement)?;
/// ```
pub struct IteratingSystem<F> {
    name: String,
    aspect: Aspect,
    pass: Pass,
    hints: SystemHints,
    dependencies: Vec<String>,
    process: F,
}

impl<F> IteratingSystem<F>
where
    F: FnMut(&mut World, Entity, f32) -> EcsResult<()> + Send,
{
    /// Creates a system named `name` running `process` in `pass`.
    pub fn new(name: impl Into<String>, aspect: Aspect, pass: Pass, process: F) -> Self {
        Self {
            name: name.into(),
            aspect,
            pass,
            hints: SystemHints::default(),
            dependencies: Vec::new(),
            process,
        }
    }

    /// Sets scheduling hints.
    #[must_use]
    pub fn with_hints(mut self, hints: SystemHints) -> Self {
        self.hints = hints;
        self
    }

    /// Requires the named system to be active when this one is registered.
    #[must_use]
    pub fn depends_on(mut self, system: impl Into<String>) -> Self {
        self.dependencies.push(system.into());
        self
    }

    /// Whether `entity` is still a live member of this system's aspect.
    fn is_member(&self, world: &World, entity: Entity) -> bool {
        if self.aspect.is_externally_managed() {
            world.is_alive(entity)
        } else {
            world.matches(entity, &self.aspect)
        }
    }
}

impl<F> EntitySystem for IteratingSystem<F>
where
    F: FnMut(&mut World, Entity, f32) -> EcsResult<()> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn aspect(&self) -> &Aspect {
        &self.aspect
    }

    fn pass(&self) -> Pass {
        self.pass
    }

    fn hints(&self) -> SystemHints {
        self.hints
    }

    fn initialize(&mut self, init: &mut SystemInit<'_>) -> EcsResult<()> {
        for dependency in &self.dependencies {
            init.require_system(dependency)?;
        }
        Ok(())
    }

    fn update(
        &mut self,
        world: &mut World,
        entities: &SnapshotList<Entity>,
        delta: f32,
    ) -> EcsResult<()> {
        let snapshot = entities.begin()?;
        for &entity in &snapshot {
            if !self.is_member(world, entity) {
                continue;
            }
            (self.process)(world, entity, delta)?;
        }
        snapshot.commit()
    }
}
