//! # Entity Management
//!
//! Entities are bare integer identities. The allocator hands out the
//! smallest free id so arrays indexed by entity stay as short as possible.

use std::collections::BTreeSet;
use std::fmt;

use super::flags::ComponentFlagsBuilder;
use crate::error::{EcsError, EcsResult};

/// Opaque identifier for a simulated object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Entity(u32);

impl Entity {
    /// Invalid entity sentinel.
    pub const INVALID: Self = Self(u32::MAX);

    /// Creates an entity handle from a raw id.
    #[inline]
    #[must_use]
    pub const fn from_raw(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw id.
    #[inline]
    #[must_use]
    pub const fn id(self) -> u32 {
        self.0
    }

    /// Returns the id as an index into per-entity arrays.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Checks if this is the invalid sentinel.
    #[inline]
    #[must_use]
    pub const fn is_invalid(self) -> bool {
        self.0 == u32::MAX
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_invalid() {
            f.write_str("Entity(INVALID)")
        } else {
            write!(f, "Entity({})", self.0)
        }
    }
}

/// Per-slot bookkeeping: liveness and canonical component flags.
#[derive(Clone, Debug, Default)]
pub(crate) struct EntityRecord {
    pub(crate) flags: ComponentFlagsBuilder,
    pub(crate) alive: bool,
}

/// Smallest-free-id allocator.
#[derive(Debug, Default)]
pub(crate) struct EntityAllocator {
    records: Vec<EntityRecord>,
    free: BTreeSet<u32>,
    alive_count: usize,
}

impl EntityAllocator {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Vec::with_capacity(capacity),
            free: BTreeSet::new(),
            alive_count: 0,
        }
    }

    /// Allocates the smallest free id. Recycled ids start with empty flags.
    pub(crate) fn allocate(&mut self) -> Entity {
        let id = match self.free.pop_first() {
            Some(id) => id,
            None => {
                assert!(
                    self.records.len() < u32::MAX as usize,
                    "entity id space exhausted"
                );
                self.records.push(EntityRecord::default());
                #[allow(clippy::cast_possible_truncation)]
                let id = (self.records.len() - 1) as u32;
                id
            }
        };

        let record = &mut self.records[id as usize];
        record.flags.clear();
        record.alive = true;
        self.alive_count += 1;
        Entity(id)
    }

    /// Claims a specific id, padding the free set with any skipped ids.
    pub(crate) fn claim(&mut self, entity: Entity) -> EcsResult<()> {
        if entity.is_invalid() {
            return Err(EcsError::InvalidEntity);
        }
        if self.is_alive(entity) {
            return Err(EcsError::EntityAlreadyExists(entity));
        }

        let index = entity.index();
        if index >= self.records.len() {
            #[allow(clippy::cast_possible_truncation)]
            self.free.extend(self.records.len() as u32..entity.0);
            self.records.resize_with(index + 1, EntityRecord::default);
        } else {
            self.free.remove(&entity.0);
        }

        let record = &mut self.records[index];
        record.flags.clear();
        record.alive = true;
        self.alive_count += 1;
        Ok(())
    }

    /// Marks `entity` dead and returns its id to the free set.
    pub(crate) fn release(&mut self, entity: Entity) {
        if let Some(record) = self.records.get_mut(entity.index()) {
            if record.alive {
                record.alive = false;
                record.flags.clear();
                self.free.insert(entity.0);
                self.alive_count -= 1;
            }
        }
    }

    #[inline]
    pub(crate) fn is_alive(&self, entity: Entity) -> bool {
        self.records.get(entity.index()).is_some_and(|r| r.alive)
    }

    /// Validates that `entity` refers to a live slot.
    pub(crate) fn check(&self, entity: Entity) -> EcsResult<()> {
        if entity.is_invalid() {
            Err(EcsError::InvalidEntity)
        } else if !self.is_alive(entity) {
            Err(EcsError::EntityDoesNotExist(entity))
        } else {
            Ok(())
        }
    }

    #[inline]
    pub(crate) fn record(&self, entity: Entity) -> Option<&EntityRecord> {
        self.records.get(entity.index()).filter(|r| r.alive)
    }

    #[inline]
    pub(crate) fn record_mut(&mut self, entity: Entity) -> Option<&mut EntityRecord> {
        self.records.get_mut(entity.index()).filter(|r| r.alive)
    }

    #[inline]
    pub(crate) fn alive_count(&self) -> usize {
        self.alive_count
    }

    /// Live entities with their records, in ascending id order.
    pub(crate) fn iter_alive(&self) -> impl Iterator<Item = (Entity, &EntityRecord)> {
        self.records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.alive)
            .map(|(i, r)| {
                #[allow(clippy::cast_possible_truncation)]
                let entity = Entity(i as u32);
                (entity, r)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::ComponentId;

    #[test]
    fn test_entity_sentinel() {
        assert!(Entity::INVALID.is_invalid());
        assert!(!Entity::from_raw(0).is_invalid());
        assert_eq!(Entity::default(), Entity::INVALID);
        assert_eq!(Entity::from_raw(4).to_string(), "Entity(4)");
    }

    #[test]
    fn test_allocate_reuses_smallest_free_id() {
        let mut alloc = EntityAllocator::with_capacity(4);
        let ids: Vec<Entity> = (0..4).map(|_| alloc.allocate()).collect();
        assert_eq!(ids[3], Entity::from_raw(3));

        alloc.release(ids[2]);
        alloc.release(ids[0]);
        assert_eq!(alloc.alive_count(), 2);

        assert_eq!(alloc.allocate(), Entity::from_raw(0));
        assert_eq!(alloc.allocate(), Entity::from_raw(2));
        assert_eq!(alloc.allocate(), Entity::from_raw(4));
    }

    #[test]
    fn test_recycled_id_starts_with_empty_flags() {
        let mut alloc = EntityAllocator::default();
        let e = alloc.allocate();
        alloc
            .record_mut(e)
            .unwrap()
            .flags
            .enable(ComponentId::from_raw(3));

        alloc.release(e);
        let again = alloc.allocate();
        assert_eq!(again, e);
        assert!(alloc.record(again).unwrap().flags.build().is_empty());
    }

    #[test]
    fn test_claim_pads_free_set() {
        let mut alloc = EntityAllocator::default();
        alloc.claim(Entity::from_raw(3)).unwrap();

        assert!(alloc.is_alive(Entity::from_raw(3)));
        assert_eq!(
            alloc.claim(Entity::from_raw(3)),
            Err(EcsError::EntityAlreadyExists(Entity::from_raw(3)))
        );
        assert_eq!(alloc.claim(Entity::INVALID), Err(EcsError::InvalidEntity));
        assert_eq!(alloc.allocate(), Entity::from_raw(0));
        assert_eq!(alloc.allocate(), Entity::from_raw(1));
    }

    #[test]
    fn test_check() {
        let mut alloc = EntityAllocator::default();
        let e = alloc.allocate();
        assert!(alloc.check(e).is_ok());
        alloc.release(e);
        assert_eq!(alloc.check(e), Err(EcsError::EntityDoesNotExist(e)));
        assert_eq!(alloc.check(Entity::INVALID), Err(EcsError::InvalidEntity));
    }
}
