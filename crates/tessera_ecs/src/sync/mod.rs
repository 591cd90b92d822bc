//! # Iteration Under Mutation
//!
//! Gameplay systems routinely add and remove entities or components while
//! walking the very set being processed.
//!
//! ## The Problem
//!
//! ```text
//! for e in weapons:            weapons: [w0, w1, w2]
//!     spawn projectile         ──> membership changes mid-walk
//!     remove Ammo from e       ──> e leaves the set mid-walk
//! ```
//!
//! ## The Solution: Snapshot Iteration
//!
//! ```text
//! begin():   copy live store ──> frozen snapshot (walked)
//! mutations: applied to the live store, visible to point queries now
//! commit():  keep the live store
//! discard(): restore the frozen snapshot (preview passes)
//! ```

mod snapshot_list;

pub use snapshot_list::{ListEvent, Snapshot, SnapshotList};
