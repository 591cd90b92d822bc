//! Integration tests for entity query thread affinity.

use std::thread;

use tessera_ecs::{Component, EcsError, EntityQuery, World};

struct Marker;
impl Component for Marker {}

fn marked_world() -> World {
    let mut world = World::new();
    for _ in 0..4 {
        world.build_entity().with(Marker).build();
    }
    world
}

#[test]
fn test_execute_from_another_thread_fails() {
    let mut world = marked_world();
    let query = EntityQuery::new(world.aspect().all::<Marker>().build());

    let result = thread::scope(|s| s.spawn(|| query.try_execute(&mut world)).join().unwrap());
    assert_eq!(result, Err(EcsError::CrossThreadAccess));

    // The creating thread is unaffected.
    assert_eq!(query.try_execute(&mut world).map(|e| e.len()), Ok(4));
}

#[test]
fn test_filter_from_another_thread_fails() {
    let mut query = EntityQuery::new(tessera_ecs::Aspect::default());

    let result = thread::scope(|s| {
        s.spawn(|| query.filter(|_, _| true).map(|_| ()))
            .join()
            .unwrap()
    });
    assert_eq!(result, Err(EcsError::CrossThreadAccess));
    assert_eq!(query.predicate_count(), 0);
}

#[test]
fn test_fork_binds_to_the_thread_that_uses_it() {
    let mut world = marked_world();
    let query = EntityQuery::new(world.aspect().all::<Marker>().build());
    let fork = query.fork();

    let found = thread::scope(|s| s.spawn(|| fork.try_count(&mut world)).join().unwrap());
    assert_eq!(found, Ok(4));

    // Now bound to the worker thread.
    assert_eq!(fork.try_count(&mut world), Err(EcsError::CrossThreadAccess));
}

#[cfg(debug_assertions)]
#[test]
fn test_cross_thread_execute_panics_in_debug() {
    let mut world = marked_world();
    let query = EntityQuery::new(world.aspect().all::<Marker>().build());

    let joined = thread::scope(|s| s.spawn(|| query.execute(&mut world)).join());
    assert!(joined.is_err());
}

#[cfg(not(debug_assertions))]
#[test]
fn test_cross_thread_execute_is_empty_in_release() {
    let mut world = marked_world();
    let query = EntityQuery::new(world.aspect().all::<Marker>().build());

    let found = thread::scope(|s| s.spawn(|| query.execute(&mut world)).join().unwrap());
    assert!(found.is_empty());
}
