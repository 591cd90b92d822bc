//! # Entity Systems
//!
//! A system is processing logic bound to one [`Aspect`] and one [`Pass`].
//! It is inactive until [`World::add_system`] activates it, and stays
//! active until [`World::remove_system`].

use std::fmt;

use crate::ecs::{Aspect, AspectBuilder, Component, ComponentId, Entity, World};
use crate::error::{EcsError, EcsResult};
use crate::sync::SnapshotList;

/// A named simulation phase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Pass {
    /// Variable-rate simulation, once per frame.
    #[default]
    Update,
    /// Presentation, once per rendered frame.
    Draw,
    /// Fixed-rate simulation, zero or more times per frame.
    FixedUpdate,
}

/// Identity of a registered system within one world. Never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SystemId(u32);

impl SystemId {
    /// Creates an id from its raw value.
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "system#{}", self.0)
    }
}

/// Scheduling hints carried from a system declaration.
///
/// Recorded and reported only. Execution is sequential in declared order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SystemHints {
    /// The system depends on running in its declared position.
    pub ordered: bool,
    /// The system is a candidate for concurrent execution.
    pub async_hint: bool,
}

/// Snapshot of an active system, for tooling.
#[derive(Clone, Debug)]
pub struct SystemInfo {
    /// Registered id.
    pub id: SystemId,
    /// Unique name.
    pub name: String,
    /// Pass the system runs in.
    pub pass: Pass,
    /// Declared hints.
    pub hints: SystemHints,
    /// The system's aspect.
    pub aspect: Aspect,
    /// Current size of the system's entity list.
    pub entity_count: usize,
}

/// Processing logic bound to an aspect and a pass.
pub trait EntitySystem: Send {
    /// Unique name within a world. Defaults to the type name.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// The entities this system processes.
    fn aspect(&self) -> &Aspect;

    /// The pass this system runs in.
    fn pass(&self) -> Pass {
        Pass::Update
    }

    /// Scheduling hints.
    fn hints(&self) -> SystemHints {
        SystemHints::default()
    }

    /// Resolves dependencies before activation.
    ///
    /// # Errors
    ///
    /// Any error aborts registration; the system is not added.
    fn initialize(&mut self, init: &mut SystemInit<'_>) -> EcsResult<()> {
        let _ = init;
        Ok(())
    }

    /// Runs the system once.
    ///
    /// `entities` is the world-maintained list for [`EntitySystem::aspect`].
    ///
    /// # Errors
    ///
    /// Errors are returned from [`World::run_pass`], or handled by the build
    /// mode policy in [`World::update`] and friends.
    fn update(
        &mut self,
        world: &mut World,
        entities: &SnapshotList<Entity>,
        delta: f32,
    ) -> EcsResult<()>;
}

/// Registration context handed to [`EntitySystem::initialize`].
pub struct SystemInit<'w> {
    world: &'w mut World,
    system: &'w str,
}

impl<'w> SystemInit<'w> {
    pub(crate) fn new(world: &'w mut World, system: &'w str) -> Self {
        Self { world, system }
    }

    /// Name of the system being registered.
    #[must_use]
    pub fn system_name(&self) -> &str {
        self.system
    }

    /// Read access to the world.
    #[must_use]
    pub fn world(&self) -> &World {
        &*self.world
    }

    /// Registers `T`, returning its id.
    pub fn register<T: Component>(&mut self) -> ComponentId {
        self.world.components_mut().id_of::<T>()
    }

    /// Builds an aspect against the world's registry.
    pub fn aspect(&mut self) -> AspectBuilder<'_> {
        self.world.aspect()
    }

    /// Resolves another active system by name.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InjectionFailure`] if no such system is active.
    pub fn require_system(&self, name: &str) -> EcsResult<SystemId> {
        self.world
            .system_id(name)
            .ok_or_else(|| self.failure(format!("required system `{name}` is not registered")))
    }

    /// Resolves the entity holding singleton `T`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InjectionFailure`] if no entity holds `T`.
    pub fn require_singleton<T: Component>(&self) -> EcsResult<Entity> {
        self.world.singleton::<T>().ok_or_else(|| {
            self.failure(format!(
                "no entity holds `{}`",
                std::any::type_name::<T>()
            ))
        })
    }

    fn failure(&self, reason: String) -> EcsError {
        EcsError::InjectionFailure {
            system: self.system.to_owned(),
            reason,
        }
    }
}
