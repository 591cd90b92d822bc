//! # Entity Component System
//!
//! Data-oriented world state with declarative matching.
//!
//! ## Design Philosophy
//!
//! - Components are plain data; behavior lives in systems
//! - Component ids are dense per registry, so flags are plain bitsets
//! - Aspect matching is O(words), never O(types)
//! - Membership lists are maintained incrementally, never recomputed

mod aspect;
mod builder;
mod component;
mod entity;
mod flags;
mod mapper;
mod storage;
mod world;

pub use aspect::{Aspect, AspectBuilder, ComponentSet};
pub use builder::EntityBuilder;
pub use component::{Component, ComponentDesc, ComponentId, ComponentRegistry};
pub use entity::Entity;
pub use flags::{ComponentFlags, ComponentFlagsBuilder, FlagIter};
pub use mapper::ComponentMapper;
pub use storage::ComponentStorage;
pub use world::{World, WorldId};
