//! # Tessera ECS
//!
//! Entity Component System runtime built around a [`World`] that:
//! - Registers component types and gives each a dense [`ComponentId`]
//! - Tracks which components each entity carries as a bitset
//! - Keeps one entity list per [`Aspect`] subscription current on every
//!   structural change
//! - Runs systems in declared order over those lists
//!
//! ## Iteration Rules
//!
//! 1. **Snapshot iteration** - Systems and queries walk a frozen copy; live
//!    lists keep changing underneath
//! 2. **Immediate notification** - Membership changes notify observers at
//!    once, never deferred to the end of an iteration
//! 3. **Fail loud in debug** - Misuse panics in debug builds and is logged
//!    and skipped in release builds
//!
//! ## Example
//!
//! ```rust,ignore
//! use tessera_ecs::{IteratingSystem, Pass, World};
//!
//! let mut world = World::new();
//! let aspect = world.aspect().all::<(Position, Velocity)>().build();
//! world.add_system(IteratingSystem::new("movement", aspect, Pass::Update, movement))?;
//! world.update(1.0 / 60.0);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod ecs;
pub mod error;
pub mod events;
pub mod policy;
pub mod query;
pub mod sync;
pub mod system;

pub use config::{ScheduleConfig, TimestepConfig, WorldConfig};
pub use ecs::{
    Aspect, AspectBuilder, Component, ComponentDesc, ComponentFlags, ComponentFlagsBuilder,
    ComponentId, ComponentMapper, ComponentRegistry, ComponentSet, ComponentStorage, Entity,
    EntityBuilder, FlagIter, World, WorldId,
};
pub use error::{EcsError, EcsResult};
pub use events::{Observers, WorldEvent};
pub use query::EntityQuery;
pub use sync::{ListEvent, Snapshot, SnapshotList};
pub use system::{
    EntitySystem, FixedTimestep, IteratingSystem, Pass, SystemHints, SystemId, SystemInfo,
    SystemInit, TickReport,
};
