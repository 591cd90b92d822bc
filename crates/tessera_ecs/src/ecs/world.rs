//! # ECS World
//!
//! The aggregate root for one simulation instance. The world owns:
//! - the component registry and every component storage
//! - each entity's canonical component flags
//! - every aspect subscription list (systems and queries)
//! - the registered systems and their pass schedule
//!
//! It is the sole mutator of membership: every component add or remove
//! updates the entity's flags and re-evaluates the affected subscriptions
//! before returning, even while one of those lists is being iterated.

use std::any::type_name;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use crossbeam_channel::Receiver;

use super::aspect::{Aspect, AspectBuilder};
use super::builder::EntityBuilder;
use super::component::{Component, ComponentId, ComponentRegistry};
use super::entity::{Entity, EntityAllocator};
use super::flags::ComponentFlags;
use super::mapper::ComponentMapper;
use super::storage::{ComponentStorage, ErasedStorage};
use crate::config::WorldConfig;
use crate::error::{EcsError, EcsResult};
use crate::events::{Observers, WorldEvent};
use crate::policy;
use crate::sync::SnapshotList;
use crate::system::{
    resolve_order, EntitySystem, Pass, SystemHints, SystemId, SystemInfo, SystemInit,
};

static NEXT_WORLD_ID: AtomicU64 = AtomicU64::new(0);

/// Process-unique identity of a [`World`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WorldId(u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Owner {
    System(SystemId),
    Query,
}

/// An aspect-derived entity list kept current by the world.
///
/// The world holds the list weakly. A system slot or the queries using it
/// keep it alive; once they are gone the entry is pruned.
struct Subscription {
    owner: Owner,
    aspect: Aspect,
    list: Weak<SnapshotList<Entity>>,
}

struct SystemSlot {
    id: SystemId,
    name: String,
    pass: Pass,
    hints: SystemHints,
    aspect: Aspect,
    list: Arc<SnapshotList<Entity>>,
    /// `None` while the system's own update is running.
    system: Option<Box<dyn EntitySystem>>,
}

/// The ECS world.
///
/// # Example
///
/// ```rust,ignore
/// let mut world = World::new();
/// let player = world.create_entity();
/// world.mapper::<Health>().add(player, Health(100))?;
///
/// let aspect = world.aspect().all::<Health>().build();
/// world.add_system(IteratingSystem::new("regen", aspect, Pass::Update, regen))?;
///
/// world.update(1.0 / 60.0);
/// ```
pub struct World {
    id: WorldId,
    config: WorldConfig,
    components: ComponentRegistry,
    entities: EntityAllocator,
    /// Indexed by component id.
    storages: Vec<Option<Box<dyn ErasedStorage>>>,
    subscriptions: Vec<Subscription>,
    systems: Vec<SystemSlot>,
    next_system_id: u32,
    events: Observers<WorldEvent>,
    /// Flags before the current mutation, reused across calls.
    flag_scratch: Vec<u64>,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    /// Creates an empty world with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::build(WorldConfig::default())
    }

    /// Creates an empty world from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] if the configuration fails
    /// validation.
    pub fn with_config(config: WorldConfig) -> EcsResult<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: WorldConfig) -> Self {
        let id = WorldId(NEXT_WORLD_ID.fetch_add(1, Ordering::Relaxed));
        tracing::debug!("creating world {:?} ({} entity slots)", id, config.entity_capacity);
        Self {
            id,
            entities: EntityAllocator::with_capacity(config.entity_capacity),
            config,
            components: ComponentRegistry::new(),
            storages: Vec::new(),
            subscriptions: Vec::new(),
            systems: Vec::new(),
            next_system_id: 0,
            events: Observers::new(),
            flag_scratch: Vec::new(),
        }
    }

    /// Process-unique id of this world.
    #[inline]
    #[must_use]
    pub fn id(&self) -> WorldId {
        self.id
    }

    /// The configuration this world was created with.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// The component registry.
    #[inline]
    #[must_use]
    pub fn components(&self) -> &ComponentRegistry {
        &self.components
    }

    /// The component registry, for registering types ahead of use.
    #[inline]
    pub fn components_mut(&mut self) -> &mut ComponentRegistry {
        &mut self.components
    }

    /// Starts building an aspect against this world's registry.
    pub fn aspect(&mut self) -> AspectBuilder<'_> {
        Aspect::builder(&mut self.components)
    }

    /// Registers an observer for structural changes.
    pub fn subscribe(&mut self) -> Receiver<WorldEvent> {
        self.events.subscribe()
    }

    // =========================================================================
    // Entity lifecycle
    // =========================================================================

    /// Creates an entity with no components, reusing the smallest free id.
    pub fn create_entity(&mut self) -> Entity {
        let entity = self.entities.allocate();
        self.admit(entity);
        tracing::trace!("created {}", entity);
        self.events.emit(&WorldEvent::EntityCreated(entity));
        entity
    }

    /// Creates an entity with a specific id, e.g. when restoring a scene.
    ///
    /// # Errors
    ///
    /// - [`EcsError::InvalidEntity`] for the sentinel.
    /// - [`EcsError::EntityAlreadyExists`] if the id is live.
    pub fn spawn_at(&mut self, entity: Entity) -> EcsResult<()> {
        self.entities.claim(entity)?;
        self.admit(entity);
        tracing::trace!("spawned {} at requested id", entity);
        self.events.emit(&WorldEvent::EntityCreated(entity));
        Ok(())
    }

    /// Starts a builder for a new entity.
    pub fn build_entity(&mut self) -> EntityBuilder<'_> {
        EntityBuilder::new(self)
    }

    /// Destroys `entity`.
    ///
    /// Every component is removed first (each removal is reported), then the
    /// entity leaves every subscription list, then its id becomes reusable.
    ///
    /// # Errors
    ///
    /// - [`EcsError::InvalidEntity`] for the sentinel.
    /// - [`EcsError::EntityDoesNotExist`] if `entity` is not live.
    pub fn destroy_entity(&mut self, entity: Entity) -> EcsResult<()> {
        self.entities.check(entity)?;
        let Some(record) = self.entities.record_mut(entity) else {
            return Err(EcsError::EntityDoesNotExist(entity));
        };

        // Leave every list once, from the pre-destroy flags. Stripping the
        // components below must not re-evaluate aspects.
        self.flag_scratch.clear();
        self.flag_scratch.extend_from_slice(record.flags.words());
        let attached: Vec<ComponentId> = record.flags.iter().collect();
        record.flags.clear();

        let before = &self.flag_scratch;
        self.subscriptions.retain(|sub| {
            let Some(list) = sub.list.upgrade() else {
                return false;
            };
            if sub.aspect.is_externally_managed() || sub.aspect.matches_words(before) {
                list.remove(&entity);
            }
            true
        });

        for id in attached {
            let removed = self
                .storages
                .get_mut(id.index())
                .and_then(Option::as_mut)
                .is_some_and(|s| s.remove_entity(entity));
            if removed {
                self.events.emit(&WorldEvent::ComponentRemoved {
                    entity,
                    component: id,
                });
            }
        }

        self.entities.release(entity);
        tracing::trace!("destroyed {}", entity);
        self.events.emit(&WorldEvent::EntityDestroyed(entity));
        Ok(())
    }

    /// Checks if `entity` is live.
    #[inline]
    #[must_use]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.entities.is_alive(entity)
    }

    /// Number of live entities.
    #[inline]
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.alive_count()
    }

    /// Live entities in ascending id order.
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.entities.iter_alive().map(|(e, _)| e)
    }

    /// Snapshot of the component flags of `entity`.
    #[must_use]
    pub fn flags(&self, entity: Entity) -> Option<ComponentFlags> {
        self.entities.record(entity).map(|r| r.flags.build())
    }

    /// Tests the current flags of `entity` against `aspect`.
    ///
    /// Returns `false` for dead entities.
    #[inline]
    #[must_use]
    pub fn matches(&self, entity: Entity, aspect: &Aspect) -> bool {
        self.entities
            .record(entity)
            .is_some_and(|r| aspect.matches_words(r.flags.words()))
    }

    pub(crate) fn check_entity(&self, entity: Entity) -> EcsResult<()> {
        self.entities.check(entity)
    }

    /// Adds a fresh entity to every derived list whose aspect matches
    /// empty flags.
    fn admit(&mut self, entity: Entity) {
        for sub in &self.subscriptions {
            if sub.aspect.is_externally_managed() || !sub.aspect.matches_words(&[]) {
                continue;
            }
            if let Some(list) = sub.list.upgrade() {
                list.add(entity);
            }
        }
    }

    // =========================================================================
    // Components
    // =========================================================================

    /// Returns the mapper for `T`, registering the type on first use.
    pub fn mapper<T: Component>(&mut self) -> ComponentMapper<'_, T> {
        let id = self.components.id_of::<T>();
        ComponentMapper::new(self, id)
    }

    /// Gets the `T` component of `entity`.
    #[must_use]
    pub fn get<T: Component>(&self, entity: Entity) -> Option<&T> {
        let id = self.components.lookup::<T>()?;
        self.storage::<T>(id)?.get(entity)
    }

    /// Checks if `entity` has a `T` component.
    #[must_use]
    pub fn has<T: Component>(&self, entity: Entity) -> bool {
        self.get::<T>(entity).is_some()
    }

    /// Finds the entity holding the `T` component, if any.
    ///
    /// Meant for singleton components; for other types this returns the
    /// lowest holder.
    #[must_use]
    pub fn singleton<T: Component>(&self) -> Option<Entity> {
        let id = self.components.lookup::<T>()?;
        self.storage::<T>(id)?.iter().next().map(|(e, _)| e)
    }

    pub(crate) fn storage<T: Component>(&self, id: ComponentId) -> Option<&ComponentStorage<T>> {
        self.storages
            .get(id.index())?
            .as_ref()?
            .as_any()
            .downcast_ref::<ComponentStorage<T>>()
    }

    pub(crate) fn storage_mut<T: Component>(
        &mut self,
        id: ComponentId,
    ) -> Option<&mut ComponentStorage<T>> {
        self.storages
            .get_mut(id.index())?
            .as_mut()?
            .as_any_mut()
            .downcast_mut::<ComponentStorage<T>>()
    }

    pub(crate) fn insert_component<T: Component>(
        &mut self,
        id: ComponentId,
        entity: Entity,
        value: T,
    ) -> EcsResult<Option<T>> {
        self.entities.check(entity)?;

        if T::SINGLETON {
            if let Some(owner) = self.singleton::<T>() {
                if owner != entity {
                    return Err(EcsError::SingletonConflict {
                        component: type_name::<T>(),
                        owner,
                    });
                }
            }
        }

        let index = id.index();
        if index >= self.storages.len() {
            self.storages.resize_with(index + 1, || None);
        }
        if self.storages[index].is_none() {
            self.storages[index] =
                Some(Box::new(ComponentStorage::<T>::default()) as Box<dyn ErasedStorage>);
        }
        let storage = self
            .storage_mut::<T>(id)
            .ok_or(EcsError::StorageMismatch {
                component: id,
                requested: type_name::<T>(),
            })?;

        let previous = storage.insert(entity, value);
        if previous.is_some() {
            self.events.emit(&WorldEvent::ComponentUpdated {
                entity,
                component: id,
            });
        } else {
            self.set_flag(entity, id, true);
            self.events.emit(&WorldEvent::ComponentAdded {
                entity,
                component: id,
            });
        }
        Ok(previous)
    }

    pub(crate) fn take_component<T: Component>(
        &mut self,
        id: ComponentId,
        entity: Entity,
    ) -> EcsResult<Option<T>> {
        self.entities.check(entity)?;
        let Some(value) = self.storage_mut::<T>(id).and_then(|s| s.remove(entity)) else {
            return Ok(None);
        };
        self.set_flag(entity, id, false);
        self.events.emit(&WorldEvent::ComponentRemoved {
            entity,
            component: id,
        });
        Ok(Some(value))
    }

    /// Flips one flag bit and moves `entity` in or out of every derived
    /// list whose aspect mentions `id`.
    fn set_flag(&mut self, entity: Entity, id: ComponentId, enabled: bool) {
        let Some(record) = self.entities.record_mut(entity) else {
            return;
        };

        self.flag_scratch.clear();
        self.flag_scratch.extend_from_slice(record.flags.words());
        if enabled {
            record.flags.enable(id);
        } else {
            record.flags.disable(id);
        }
        let now = record.flags.words();
        let before = &self.flag_scratch;

        self.subscriptions.retain(|sub| {
            let aspect = &sub.aspect;
            if aspect.is_externally_managed() || !aspect.mentions(id) {
                return sub.list.strong_count() > 0;
            }
            let Some(list) = sub.list.upgrade() else {
                return false;
            };
            match (aspect.matches_words(before), aspect.matches_words(now)) {
                (false, true) => {
                    tracing::trace!("{} joins {:?} list", entity, sub.owner);
                    list.add(entity);
                }
                (true, false) => {
                    tracing::trace!("{} leaves {:?} list", entity, sub.owner);
                    list.remove(&entity);
                }
                _ => {}
            }
            true
        });
    }

    // =========================================================================
    // Subscriptions
    // =========================================================================

    /// Creates a list holding every live entity matching `aspect`, in
    /// ascending id order. Externally managed aspects start empty.
    fn seed(&self, aspect: &Aspect) -> Arc<SnapshotList<Entity>> {
        let members = if aspect.is_externally_managed() {
            Vec::new()
        } else {
            self.entities
                .iter_alive()
                .filter(|(_, r)| aspect.matches_words(r.flags.words()))
                .map(|(e, _)| e)
                .collect()
        };
        Arc::new(SnapshotList::from_vec(members))
    }

    /// Returns the shared, world-maintained list of entities matching
    /// `aspect`, creating it on first request.
    ///
    /// Equal aspects share one list. The world keeps it current only while
    /// some caller holds the returned `Arc`; after the last one is dropped
    /// the next request seeds a fresh list.
    pub fn subscription(&mut self, aspect: &Aspect) -> Arc<SnapshotList<Entity>> {
        self.subscriptions.retain(|s| s.list.strong_count() > 0);
        if let Some(list) = self
            .subscriptions
            .iter()
            .filter(|s| s.owner == Owner::Query && s.aspect == *aspect)
            .find_map(|s| s.list.upgrade())
        {
            return list;
        }

        let list = self.seed(aspect);
        self.subscriptions.push(Subscription {
            owner: Owner::Query,
            aspect: aspect.clone(),
            list: Arc::downgrade(&list),
        });
        tracing::debug!("new query subscription ({} members)", list.len());
        list
    }

    /// Number of subscription lists the world is keeping current, for
    /// systems and live queries together.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.subscriptions
            .iter()
            .filter(|s| s.list.strong_count() > 0)
            .count()
    }

    // =========================================================================
    // Systems
    // =========================================================================

    /// Registers and activates `system`.
    ///
    /// Runs the system's `initialize` hook, then seeds its list with every
    /// live matching entity (unless its aspect is externally managed).
    ///
    /// # Errors
    ///
    /// - [`EcsError::SystemAlreadyRegistered`] if a system with the same name
    ///   is active.
    /// - [`EcsError::InjectionFailure`] (or any error from `initialize`); the
    ///   system is not registered.
    pub fn add_system<S: EntitySystem + 'static>(&mut self, system: S) -> EcsResult<SystemId> {
        self.add_boxed_system(Box::new(system))
    }

    /// Boxed form of [`World::add_system`].
    ///
    /// # Errors
    ///
    /// See [`World::add_system`].
    pub fn add_boxed_system(&mut self, mut system: Box<dyn EntitySystem>) -> EcsResult<SystemId> {
        let name = system.name().to_owned();
        if self.system_id(&name).is_some() {
            return Err(EcsError::SystemAlreadyRegistered(name));
        }

        system.initialize(&mut SystemInit::new(self, &name))?;

        let id = SystemId::from_raw(self.next_system_id);
        self.next_system_id += 1;

        let aspect = system.aspect().clone();
        let pass = system.pass();
        let hints = system.hints();
        let list = self.seed(&aspect);
        self.subscriptions.push(Subscription {
            owner: Owner::System(id),
            aspect: aspect.clone(),
            list: Arc::downgrade(&list),
        });

        tracing::debug!(
            "registered system `{}` as {} ({:?}, {} members)",
            name,
            id,
            pass,
            list.len()
        );
        self.systems.push(SystemSlot {
            id,
            name,
            pass,
            hints,
            aspect,
            list,
            system: Some(system),
        });
        Ok(id)
    }

    /// Deactivates and drops a system. Legal during a pass; a system removed
    /// while its own update runs is dropped once that update returns.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::SystemNotRegistered`] if `id` is not active.
    pub fn remove_system(&mut self, id: SystemId) -> EcsResult<()> {
        let Some(index) = self.systems.iter().position(|s| s.id == id) else {
            return Err(EcsError::SystemNotRegistered(id));
        };
        let slot = self.systems.remove(index);
        self.subscriptions.retain(|s| s.owner != Owner::System(id));
        tracing::debug!("removed system `{}` ({})", slot.name, id);
        Ok(())
    }

    /// Looks up an active system by name.
    #[must_use]
    pub fn system_id(&self, name: &str) -> Option<SystemId> {
        self.systems.iter().find(|s| s.name == name).map(|s| s.id)
    }

    /// The entity list of an active system.
    ///
    /// Systems with externally managed aspects fill this list themselves.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::SystemNotRegistered`] if `id` is not active.
    pub fn system_entities(&self, id: SystemId) -> EcsResult<Arc<SnapshotList<Entity>>> {
        self.systems
            .iter()
            .find(|s| s.id == id)
            .map(|s| Arc::clone(&s.list))
            .ok_or(EcsError::SystemNotRegistered(id))
    }

    /// Describes every active system in registration order.
    #[must_use]
    pub fn systems(&self) -> Vec<SystemInfo> {
        self.systems
            .iter()
            .map(|s| SystemInfo {
                id: s.id,
                name: s.name.clone(),
                pass: s.pass,
                hints: s.hints,
                aspect: s.aspect.clone(),
                entity_count: s.list.len(),
            })
            .collect()
    }

    /// Systems of `pass` in execution order.
    #[must_use]
    pub fn schedule(&self, pass: Pass) -> Vec<SystemId> {
        resolve_order(
            &self.config.schedule,
            self.systems
                .iter()
                .filter(|s| s.pass == pass)
                .map(|s| (s.id, s.name.as_str())),
        )
    }

    fn run_system(&mut self, id: SystemId, delta: f32) -> EcsResult<()> {
        // Removed earlier in this pass, or already running in an outer pass.
        let Some(slot) = self.systems.iter_mut().find(|s| s.id == id) else {
            return Ok(());
        };
        let Some(mut system) = slot.system.take() else {
            return Ok(());
        };
        let list = Arc::clone(&slot.list);

        let result = system.update(self, &list, delta);

        match self.systems.iter_mut().find(|s| s.id == id) {
            Some(slot) => slot.system = Some(system),
            None => tracing::debug!("system {} removed during its own update", id),
        }
        result
    }

    /// Runs every active system of `pass` in declared order, stopping at the
    /// first error.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a system.
    pub fn run_pass(&mut self, pass: Pass, delta: f32) -> EcsResult<()> {
        for id in self.schedule(pass) {
            self.run_system(id, delta)?;
        }
        Ok(())
    }

    fn run_pass_settled(&mut self, pass: Pass, delta: f32) {
        for id in self.schedule(pass) {
            if let Err(err) = self.run_system(id, delta) {
                policy::recover(&format!("{id} failed during {pass:?}"), err, ());
            }
        }
    }

    /// Runs the [`Pass::Update`] systems.
    ///
    /// # Panics
    ///
    /// In debug builds, panics if a system fails. Release builds log the
    /// failure and continue with the next system.
    pub fn update(&mut self, delta: f32) {
        self.run_pass_settled(Pass::Update, delta);
    }

    /// Runs the [`Pass::Draw`] systems.
    ///
    /// # Panics
    ///
    /// In debug builds, panics if a system fails.
    pub fn draw(&mut self, delta: f32) {
        self.run_pass_settled(Pass::Draw, delta);
    }

    /// Runs the [`Pass::FixedUpdate`] systems.
    ///
    /// # Panics
    ///
    /// In debug builds, panics if a system fails.
    pub fn fixed_update(&mut self, delta: f32) {
        self.run_pass_settled(Pass::FixedUpdate, delta);
    }
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("id", &self.id)
            .field("entities", &self.entities.alive_count())
            .field("component_types", &self.components.len())
            .field("systems", &self.systems.len())
            .field("subscriptions", &self.subscription_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::ListEvent;
    use crate::system::IteratingSystem;

    #[derive(Debug, PartialEq)]
    struct Health(i32);
    impl Component for Health {}

    #[derive(Debug, PartialEq)]
    struct Poisoned;
    impl Component for Poisoned {}

    struct Clock(u64);
    impl Component for Clock {
        const SINGLETON: bool = true;
    }

    fn noop(_: &mut World, _: Entity, _: f32) -> EcsResult<()> {
        Ok(())
    }

    #[test]
    fn test_world_creation() {
        let world = World::new();
        assert_eq!(world.entity_count(), 0);
        assert_ne!(World::new().id(), world.id());
    }

    #[test]
    fn test_create_destroy_reuses_id_with_empty_flags() {
        let mut world = World::new();
        let a = world.create_entity();
        let _b = world.create_entity();
        world.mapper::<Health>().add(a, Health(5)).unwrap();

        world.destroy_entity(a).unwrap();
        assert!(!world.is_alive(a));
        assert_eq!(world.get::<Health>(a), None);

        let c = world.create_entity();
        assert_eq!(c, a);
        assert!(world.flags(c).unwrap().is_empty());
        assert!(!world.has::<Health>(c));
    }

    #[test]
    fn test_destroy_errors() {
        let mut world = World::new();
        assert_eq!(world.destroy_entity(Entity::INVALID), Err(EcsError::InvalidEntity));
        let e = world.create_entity();
        world.destroy_entity(e).unwrap();
        assert_eq!(world.destroy_entity(e), Err(EcsError::EntityDoesNotExist(e)));
    }

    #[test]
    fn test_spawn_at() {
        let mut world = World::new();
        world.spawn_at(Entity::from_raw(5)).unwrap();
        assert_eq!(
            world.spawn_at(Entity::from_raw(5)),
            Err(EcsError::EntityAlreadyExists(Entity::from_raw(5)))
        );
        assert_eq!(world.create_entity(), Entity::from_raw(0));
        assert_eq!(world.entity_count(), 2);
    }

    #[test]
    fn test_flags_track_mapper_membership() {
        let mut world = World::new();
        let e = world.create_entity();
        let health = world.components_mut().id_of::<Health>();

        world.mapper::<Health>().add(e, Health(1)).unwrap();
        assert!(world.flags(e).unwrap().contains(health));

        world.mapper::<Health>().remove(e).unwrap();
        assert!(!world.flags(e).unwrap().contains(health));
        assert_eq!(world.mapper::<Health>().remove(e), Ok(None));
    }

    #[test]
    fn test_mapper_update_requires_component() {
        let mut world = World::new();
        let e = world.create_entity();
        let mut mapper = world.mapper::<Health>();

        assert!(matches!(
            mapper.update(e, Health(1)),
            Err(EcsError::ComponentMissing { .. })
        ));
        mapper.add(e, Health(1)).unwrap();
        assert_eq!(mapper.update(e, Health(2)), Ok(Health(1)));
        assert_eq!(mapper.get(e), Some(&Health(2)));
        assert_eq!(mapper.len(), 1);
    }

    #[test]
    fn test_mapper_rejects_dead_entities() {
        let mut world = World::new();
        let e = world.create_entity();
        world.destroy_entity(e).unwrap();
        assert_eq!(
            world.mapper::<Health>().add(e, Health(1)),
            Err(EcsError::EntityDoesNotExist(e))
        );
        assert_eq!(
            world.mapper::<Health>().add(Entity::INVALID, Health(1)),
            Err(EcsError::InvalidEntity)
        );
    }

    #[test]
    fn test_membership_is_incremental() {
        let mut world = World::new();
        let aspect = world.aspect().all::<Health>().none::<Poisoned>().build();
        let list = world.subscription(&aspect);
        let e = world.create_entity();

        world.mapper::<Health>().add(e, Health(3)).unwrap();
        assert_eq!(list.to_vec(), vec![e]);

        world.mapper::<Poisoned>().add(e, Poisoned).unwrap();
        assert!(list.is_empty());

        world.mapper::<Poisoned>().remove(e).unwrap();
        world.mapper::<Health>().remove(e).unwrap();
        assert!(list.is_empty());
    }

    #[test]
    fn test_equal_aspects_share_a_subscription() {
        let mut world = World::new();
        let a = world.aspect().all::<Health>().build();
        let b = world.aspect().all::<Health>().build();
        assert!(Arc::ptr_eq(&world.subscription(&a), &world.subscription(&b)));
    }

    #[test]
    fn test_destroy_leaves_empty_flag_aspects() {
        let mut world = World::new();
        let everything = world.aspect().none::<Poisoned>().build();
        let list = world.subscription(&everything);

        let e = world.create_entity();
        assert_eq!(list.to_vec(), vec![e]);

        world.destroy_entity(e).unwrap();
        assert!(list.is_empty());
    }

    #[test]
    fn test_released_query_lists_stop_being_tracked() {
        let mut world = World::new();
        let e = world.create_entity();
        let a = world.aspect().all::<Health>().build();
        let b = world.aspect().none::<Poisoned>().build();

        let held = world.subscription(&a);
        drop(world.subscription(&b));
        assert_eq!(world.subscription_count(), 1);

        world.mapper::<Health>().add(e, Health(1)).unwrap();
        assert_eq!(held.to_vec(), vec![e]);

        drop(held);
        assert_eq!(world.subscription_count(), 0);
        world.mapper::<Poisoned>().add(e, Poisoned).unwrap();
        world.destroy_entity(e).unwrap();
        assert!(format!("{world:?}").contains("subscriptions: 0"));

        // A new request seeds from current state.
        let f = world.create_entity();
        world.mapper::<Health>().add(f, Health(2)).unwrap();
        assert_eq!(world.subscription(&a).to_vec(), vec![f]);
    }

    #[test]
    fn test_destroy_sends_no_transient_list_events() {
        let mut world = World::new();
        let healthy = world.aspect().none::<Poisoned>().build();
        let list = world.subscription(&healthy);
        let e = world.create_entity();
        let sick = world.create_entity();
        world.mapper::<Poisoned>().add(sick, Poisoned).unwrap();

        let events = list.subscribe();
        world.destroy_entity(sick).unwrap();
        world.destroy_entity(e).unwrap();

        let received: Vec<ListEvent<Entity>> = events.try_iter().collect();
        assert_eq!(received, vec![ListEvent::Removed(e)]);
    }

    #[test]
    fn test_id_used_with_wrong_type_is_an_error() {
        let mut world = World::new();
        let e = world.create_entity();
        world.mapper::<Health>().add(e, Health(1)).unwrap();
        let health = world.components_mut().id_of::<Health>();

        assert!(matches!(
            world.insert_component(health, e, Poisoned),
            Err(EcsError::StorageMismatch { component, .. }) if component == health
        ));
        assert_eq!(world.get::<Health>(e), Some(&Health(1)));
    }

    #[test]
    fn test_events_reported_in_order() {
        let mut world = World::new();
        let events = world.subscribe();
        let e = world.create_entity();
        let id = world.components_mut().id_of::<Health>();

        world.mapper::<Health>().add(e, Health(1)).unwrap();
        world.mapper::<Health>().add(e, Health(2)).unwrap();
        world.destroy_entity(e).unwrap();

        let received: Vec<WorldEvent> = events.try_iter().collect();
        assert_eq!(
            received,
            vec![
                WorldEvent::EntityCreated(e),
                WorldEvent::ComponentAdded { entity: e, component: id },
                WorldEvent::ComponentUpdated { entity: e, component: id },
                WorldEvent::ComponentRemoved { entity: e, component: id },
                WorldEvent::EntityDestroyed(e),
            ]
        );
    }

    #[test]
    fn test_singleton_conflict() {
        let mut world = World::new();
        let a = world.create_entity();
        let b = world.create_entity();

        world.mapper::<Clock>().add(a, Clock(0)).unwrap();
        world.mapper::<Clock>().add(a, Clock(1)).unwrap();
        assert_eq!(world.singleton::<Clock>(), Some(a));
        assert_eq!(
            world.mapper::<Clock>().add(b, Clock(2)).map(|_| ()),
            Err(EcsError::SingletonConflict {
                component: type_name::<Clock>(),
                owner: a,
            })
        );
        assert_eq!(world.get::<Clock>(a).map(|c| c.0), Some(1));
    }

    #[test]
    fn test_system_registration_seeds_and_rejects_duplicates() {
        let mut world = World::new();
        let a = world.create_entity();
        let _b = world.create_entity();
        world.mapper::<Health>().add(a, Health(1)).unwrap();

        let aspect = world.aspect().all::<Health>().build();
        let id = world
            .add_system(IteratingSystem::new("regen", aspect.clone(), Pass::Update, noop))
            .unwrap();
        assert_eq!(world.system_entities(id).unwrap().to_vec(), vec![a]);

        assert_eq!(
            world.add_system(IteratingSystem::new("regen", aspect, Pass::Update, noop)),
            Err(EcsError::SystemAlreadyRegistered("regen".into()))
        );

        world.remove_system(id).unwrap();
        assert_eq!(world.remove_system(id), Err(EcsError::SystemNotRegistered(id)));
        assert!(world.systems().is_empty());
    }

    #[test]
    fn test_externally_managed_lists_are_left_alone() {
        let mut world = World::new();
        let aspect = world.aspect().all::<Health>().externally_managed().build();
        let id = world
            .add_system(IteratingSystem::new("manual", aspect, Pass::Update, noop))
            .unwrap();
        let list = world.system_entities(id).unwrap();

        let e = world.create_entity();
        world.mapper::<Health>().add(e, Health(1)).unwrap();
        assert!(list.is_empty());

        list.add(e);
        world.destroy_entity(e).unwrap();
        assert!(list.is_empty());
    }

    #[test]
    fn test_build_entity() {
        let mut world = World::new();
        let e = world
            .build_entity()
            .with(Health(9))
            .with(Poisoned)
            .build();
        assert_eq!(world.get::<Health>(e), Some(&Health(9)));
        assert!(world.has::<Poisoned>(e));
    }

    #[test]
    fn test_with_config_validates() {
        let mut config = WorldConfig::default();
        config.timestep.max_steps = 0;
        assert!(matches!(
            World::with_config(config),
            Err(EcsError::InvalidConfig(_))
        ));
    }
}
