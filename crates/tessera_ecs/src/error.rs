//! # ECS Error Types
//!
//! All errors that can occur in the ECS runtime.
//!
//! Every variant is a programmer error raised synchronously at the violating
//! call. Nothing here is transient; there is no I/O to retry.

use thiserror::Error;

use crate::ecs::{ComponentId, Entity};
use crate::system::SystemId;

/// Errors that can occur in the ECS runtime.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// The invalid sentinel was passed where a live entity is required.
    #[error("invalid entity: the sentinel cannot be used here")]
    InvalidEntity,

    /// The entity is not alive in this world.
    #[error("entity {0} does not exist")]
    EntityDoesNotExist(Entity),

    /// The entity id is already in use.
    #[error("entity {0} already exists")]
    EntityAlreadyExists(Entity),

    /// An iteration was started on a list or query that is already iterating.
    #[error("reentrant iteration: an iteration is already in progress")]
    ReentrantIteration,

    /// An iteration was ended while none was in progress.
    #[error("no iteration in progress")]
    NotIterating,

    /// A query was modified or executed off the thread it is bound to.
    #[error("cross-thread access: query is bound to another thread")]
    CrossThreadAccess,

    /// A system's declared dependency could not be resolved at registration.
    #[error("injection failed for system `{system}`: {reason}")]
    InjectionFailure {
        /// The system being registered.
        system: String,
        /// What could not be resolved.
        reason: String,
    },

    /// A system with the same name is already active.
    #[error("system `{0}` is already registered")]
    SystemAlreadyRegistered(String),

    /// The system id does not refer to an active system.
    #[error("system {0} is not registered")]
    SystemNotRegistered(SystemId),

    /// The entity does not carry the requested component.
    #[error("entity {entity} has no `{component}` component")]
    ComponentMissing {
        /// The entity that was addressed.
        entity: Entity,
        /// Type name of the missing component.
        component: &'static str,
    },

    /// A singleton component is already attached to another entity.
    #[error("singleton `{component}` is already attached to entity {owner}")]
    SingletonConflict {
        /// Type name of the singleton component.
        component: &'static str,
        /// The entity currently holding it.
        owner: Entity,
    },

    /// A positional list operation was out of range.
    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds {
        /// The requested index.
        index: usize,
        /// The list length at the time of the call.
        len: usize,
    },

    /// A component id was used with a type other than the one it was
    /// registered for.
    #[error("{component} is not registered to `{requested}`")]
    StorageMismatch {
        /// The id that was addressed.
        component: ComponentId,
        /// Type name the caller asked for.
        requested: &'static str,
    },

    /// Invalid world configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for ECS operations.
pub type EcsResult<T> = Result<T, EcsError>;
