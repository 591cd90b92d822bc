//! # Change Notifications
//!
//! Observer lists backed by crossbeam channels.
//!
//! ```text
//! ┌─────────────┐  emit()   ┌──────────────┐  recv()  ┌────────────┐
//! │ World /     │──────────>│  Observers   │─────────>│ Receiver 1 │
//! │ SnapshotList│           │ (Sender list)│─────────>│ Receiver 2 │
//! └─────────────┘           └──────────────┘          └────────────┘
//! ```
//!
//! Notifications are sent at the mutating call, never deferred. Receivers
//! that were dropped are pruned on the next emit.

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::ecs::{ComponentId, Entity};

/// Structural changes reported by a [`crate::World`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorldEvent {
    /// An entity id became live.
    EntityCreated(Entity),
    /// An entity was destroyed after all its components were removed.
    EntityDestroyed(Entity),
    /// A component was attached to an entity that did not have it.
    ComponentAdded {
        /// The entity.
        entity: Entity,
        /// The component type.
        component: ComponentId,
    },
    /// A component value was replaced in place.
    ComponentUpdated {
        /// The entity.
        entity: Entity,
        /// The component type.
        component: ComponentId,
    },
    /// A component was detached from an entity.
    ComponentRemoved {
        /// The entity.
        entity: Entity,
        /// The component type.
        component: ComponentId,
    },
}

/// A list of channel senders that all receive every emitted event.
#[derive(Debug)]
pub struct Observers<E> {
    senders: Vec<Sender<E>>,
}

impl<E> Default for Observers<E> {
    fn default() -> Self {
        Self { senders: Vec::new() }
    }
}

impl<E: Clone> Observers<E> {
    /// Creates an empty observer list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new observer and returns its receiving end.
    pub fn subscribe(&mut self) -> Receiver<E> {
        let (tx, rx) = unbounded();
        self.senders.push(tx);
        rx
    }

    /// Sends `event` to every live observer.
    #[inline]
    pub fn emit(&mut self, event: &E) {
        if self.senders.is_empty() {
            return;
        }
        // An unbounded send only fails once the receiver is gone.
        self.senders.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Number of registered observers, including ones not yet pruned.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.senders.len()
    }

    /// Returns `true` if no observer is registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }
}
