//! # Systems and Scheduling
//!
//! Systems run sequentially, one pass at a time, in declared order:
//!
//! ```text
//! World::update(dt)
//!   ├── before group   (ScheduleConfig::before, in order)
//!   ├── wildcard       (everything else, registration order)
//!   └── after group    (ScheduleConfig::after, in order)
//! ```
//!
//! Declared "ordered"/"async" hints are carried in [`SystemHints`] but do
//! not change this sequential contract.

mod entity_system;
mod iterating;
mod schedule;
mod timestep;

pub use entity_system::{EntitySystem, Pass, SystemHints, SystemId, SystemInfo, SystemInit};
pub use iterating::IteratingSystem;
pub use schedule::resolve_order;
pub use timestep::{FixedTimestep, TickReport};
