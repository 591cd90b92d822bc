//! # Entity Queries
//!
//! Ad hoc, unregistered alternative to declaring a system, for tooling and
//! other low-frequency code.
//!
//! A query is an [`Aspect`] plus an ordered chain of predicates. On first
//! execution against a world it resolves and caches that world's shared
//! list for the aspect. Every execution copies the list into the query's own
//! scratch buffer, walks the copy and applies the predicates in insertion
//! order. Queries over the same aspect therefore share one list but can
//! still be nested inside each other.
//!
//! ## Thread Affinity
//!
//! A query is bound to the thread that created it, for modification and for
//! execution. Use [`EntityQuery::fork`] to get an independent query (shared
//! definitions, fresh binding) for another thread or for nested use.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::{self, ThreadId};

use parking_lot::Mutex;

use crate::ecs::{Aspect, Component, Entity, World, WorldId};
use crate::error::{EcsError, EcsResult};
use crate::policy;
use crate::sync::SnapshotList;

type Predicate = Arc<dyn Fn(&World, Entity) -> bool + Send + Sync>;

/// The shareable part of a query.
#[derive(Clone)]
struct QueryDefinition {
    aspect: Aspect,
    predicates: Vec<Predicate>,
}

struct CachedList {
    world: WorldId,
    list: Arc<SnapshotList<Entity>>,
}

/// Clears the iterating flag when an execution ends, however it ends.
struct IterationGuard<'a>(&'a AtomicBool);

impl Drop for IterationGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Ad hoc entity query.
///
/// # Example
///
/// ```rust,ignore
/// let aspect = world.aspect().all::<Health>().build();
/// let mut wounded = EntityQuery::new(aspect);
/// wounded.filter_component::<Health, _>(|h| h.0 < 20)?;
///
/// for entity in wounded.execute(&mut world) {
///     // ...
/// }
/// ```
pub struct EntityQuery {
    definition: Arc<QueryDefinition>,
    owner: OnceLock<ThreadId>,
    iterating: AtomicBool,
    cache: Mutex<Option<CachedList>>,
    scratch: Mutex<Vec<Entity>>,
}

impl EntityQuery {
    /// Creates a query over `aspect`, bound to the calling thread.
    #[must_use]
    pub fn new(aspect: Aspect) -> Self {
        Self {
            definition: Arc::new(QueryDefinition {
                aspect,
                predicates: Vec::new(),
            }),
            owner: OnceLock::from(thread::current().id()),
            iterating: AtomicBool::new(false),
            cache: Mutex::new(None),
            scratch: Mutex::new(Vec::new()),
        }
    }

    /// The query's aspect.
    #[must_use]
    pub fn aspect(&self) -> &Aspect {
        &self.definition.aspect
    }

    /// Number of predicates in the chain.
    #[must_use]
    pub fn predicate_count(&self) -> usize {
        self.definition.predicates.len()
    }

    /// Binds an unbound query to the calling thread, then checks affinity.
    fn check_thread(&self) -> EcsResult<()> {
        let current = thread::current().id();
        if *self.owner.get_or_init(|| current) == current {
            Ok(())
        } else {
            Err(EcsError::CrossThreadAccess)
        }
    }

    /// Appends a predicate. Predicates run in insertion order.
    ///
    /// Forks made earlier keep their own chain.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::CrossThreadAccess`] off the bound thread.
    pub fn filter<P>(&mut self, predicate: P) -> EcsResult<&mut Self>
    where
        P: Fn(&World, Entity) -> bool + Send + Sync + 'static,
    {
        self.check_thread()?;
        Arc::make_mut(&mut self.definition)
            .predicates
            .push(Arc::new(predicate));
        Ok(self)
    }

    /// Appends a predicate over the entity's `T` component. Entities without
    /// `T` are rejected.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::CrossThreadAccess`] off the bound thread.
    pub fn filter_component<T, P>(&mut self, predicate: P) -> EcsResult<&mut Self>
    where
        T: Component,
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.filter(move |world, entity| world.get::<T>(entity).is_some_and(&predicate))
    }

    /// Returns an independent query sharing this one's definitions.
    ///
    /// The fork is unbound until first used, and has its own cache and
    /// iteration state.
    #[must_use]
    pub fn fork(&self) -> Self {
        Self {
            definition: Arc::clone(&self.definition),
            owner: OnceLock::new(),
            iterating: AtomicBool::new(false),
            cache: Mutex::new(None),
            scratch: Mutex::new(Vec::new()),
        }
    }

    fn resolve(&self, world: &mut World) -> Arc<SnapshotList<Entity>> {
        let mut cache = self.cache.lock();
        match cache.as_ref() {
            Some(cached) if cached.world == world.id() => Arc::clone(&cached.list),
            _ => {
                let list = world.subscription(&self.definition.aspect);
                *cache = Some(CachedList {
                    world: world.id(),
                    list: Arc::clone(&list),
                });
                list
            }
        }
    }

    /// Calls `f` for every matching entity, returning how many were visited.
    ///
    /// Entities that stop matching during the walk are skipped.
    ///
    /// # Errors
    ///
    /// - [`EcsError::CrossThreadAccess`] off the bound thread.
    /// - [`EcsError::ReentrantIteration`] if this query is already executing.
    /// - Any error returned by `f`, which stops the walk.
    pub fn try_for_each<F>(&self, world: &mut World, mut f: F) -> EcsResult<usize>
    where
        F: FnMut(&mut World, Entity) -> EcsResult<()>,
    {
        self.check_thread()?;
        if self.iterating.swap(true, Ordering::AcqRel) {
            return Err(EcsError::ReentrantIteration);
        }
        let _guard = IterationGuard(&self.iterating);

        let list = self.resolve(world);
        let mut snapshot = std::mem::take(&mut *self.scratch.lock());
        list.copy_into(&mut snapshot);

        let result = self.walk(world, &snapshot, &mut f);
        *self.scratch.lock() = snapshot;
        result
    }

    fn walk<F>(&self, world: &mut World, snapshot: &[Entity], f: &mut F) -> EcsResult<usize>
    where
        F: FnMut(&mut World, Entity) -> EcsResult<()>,
    {
        let definition = &self.definition;
        let mut visited = 0;
        for &entity in snapshot {
            if !world.matches(entity, &definition.aspect) {
                continue;
            }
            if definition.predicates.iter().all(|p| p(&*world, entity)) {
                f(world, entity)?;
                visited += 1;
            }
        }
        Ok(visited)
    }

    /// Collects every matching entity.
    ///
    /// # Errors
    ///
    /// See [`EntityQuery::try_for_each`].
    pub fn try_execute(&self, world: &mut World) -> EcsResult<Vec<Entity>> {
        let mut found = Vec::new();
        self.try_for_each(world, |_, entity| {
            found.push(entity);
            Ok(())
        })?;
        Ok(found)
    }

    /// Counts matching entities.
    ///
    /// # Errors
    ///
    /// See [`EntityQuery::try_for_each`].
    pub fn try_count(&self, world: &mut World) -> EcsResult<usize> {
        self.try_for_each(world, |_, _| Ok(()))
    }

    /// Returns the first matching entity in list order.
    ///
    /// # Errors
    ///
    /// See [`EntityQuery::try_for_each`].
    pub fn try_first(&self, world: &mut World) -> EcsResult<Option<Entity>> {
        let mut first = None;
        self.try_for_each(world, |_, entity| {
            first.get_or_insert(entity);
            Ok(())
        })?;
        Ok(first)
    }

    /// Collects every matching entity.
    ///
    /// # Panics
    ///
    /// In debug builds, panics on any error from
    /// [`EntityQuery::try_execute`]. Release builds log it and return an
    /// empty result.
    #[must_use]
    pub fn execute(&self, world: &mut World) -> Vec<Entity> {
        policy::settle("entity query failed", self.try_execute(world))
    }

    /// Calls `f` for every matching entity, returning how many were visited.
    ///
    /// # Panics
    ///
    /// In debug builds, panics on any error. Release builds log it and
    /// return zero.
    pub fn for_each<F>(&self, world: &mut World, mut f: F) -> usize
    where
        F: FnMut(&mut World, Entity),
    {
        policy::settle(
            "entity query failed",
            self.try_for_each(world, |w, e| {
                f(w, e);
                Ok(())
            }),
        )
    }

    /// Counts matching entities.
    ///
    /// # Panics
    ///
    /// In debug builds, panics on any error. Release builds log it and
    /// return zero.
    #[must_use]
    pub fn count(&self, world: &mut World) -> usize {
        policy::settle("entity query failed", self.try_count(world))
    }

    /// Returns the first matching entity in list order.
    ///
    /// # Panics
    ///
    /// In debug builds, panics on any error. Release builds log it and
    /// return `None`.
    #[must_use]
    pub fn first(&self, world: &mut World) -> Option<Entity> {
        policy::settle("entity query failed", self.try_first(world))
    }
}

impl fmt::Debug for EntityQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityQuery")
            .field("aspect", &self.definition.aspect)
            .field("predicates", &self.definition.predicates.len())
            .field("owner", &self.owner.get())
            .finish_non_exhaustive()
    }
}
