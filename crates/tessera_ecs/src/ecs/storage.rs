//! # Component Storage
//!
//! Dense per-type storage keyed by entity index.
//!
//! The storage uses a dense array strategy:
//! - One slot per entity index, grown on demand
//! - Access is O(1) via entity index
//! - Slots are reused when an entity id is recycled

use std::any::Any;

use super::component::Component;
use super::entity::Entity;

/// Storage for a single component type.
///
/// # Type Parameters
///
/// * `T` - The component type to store
pub struct ComponentStorage<T: Component> {
    slots: Vec<Option<T>>,
    count: usize,
}

impl<T: Component> Default for ComponentStorage<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            count: 0,
        }
    }
}

impl<T: Component> ComponentStorage<T> {
    /// Creates storage with room for `capacity` entity slots.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self { slots, count: 0 }
    }

    /// Number of entities holding a value.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.count
    }

    /// Returns `true` if no entity holds a value.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Gets the component of `entity`.
    #[inline]
    #[must_use]
    pub fn get(&self, entity: Entity) -> Option<&T> {
        self.slots.get(entity.index()).and_then(Option::as_ref)
    }

    /// Gets the component of `entity` mutably.
    #[inline]
    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        self.slots.get_mut(entity.index()).and_then(Option::as_mut)
    }

    /// Checks if `entity` holds a value.
    #[inline]
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.get(entity).is_some()
    }

    /// Stores `value` for `entity`, returning the value it replaced.
    pub fn insert(&mut self, entity: Entity, value: T) -> Option<T> {
        let index = entity.index();
        if index >= self.slots.len() {
            self.slots.resize_with(index + 1, || None);
        }
        let previous = self.slots[index].replace(value);
        if previous.is_none() {
            self.count += 1;
        }
        previous
    }

    /// Takes the value of `entity` out of the storage.
    pub fn remove(&mut self, entity: Entity) -> Option<T> {
        let removed = self.slots.get_mut(entity.index()).and_then(Option::take);
        if removed.is_some() {
            self.count -= 1;
        }
        removed
    }

    /// Iterates stored values with their entities, in ascending entity order.
    pub fn iter(&self) -> impl Iterator<Item = (Entity, &T)> {
        self.slots.iter().enumerate().filter_map(|(i, slot)| {
            #[allow(clippy::cast_possible_truncation)]
            slot.as_ref().map(|value| (Entity::from_raw(i as u32), value))
        })
    }
}

/// Type-erased view of a [`ComponentStorage`], held by the world.
pub(crate) trait ErasedStorage: Send + Sync {
    /// Drops the value of `entity`, returning whether one existed.
    fn remove_entity(&mut self, entity: Entity) -> bool;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component> ErasedStorage for ComponentStorage<T> {
    fn remove_entity(&mut self, entity: Entity) -> bool {
        self.remove(entity).is_some()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
