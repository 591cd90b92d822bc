//! Integration tests for world ticks: iterating systems, mutation during
//! iteration, and declared system order.

use std::sync::{Arc, Mutex};

use tessera_ecs::{
    Component, Entity, FixedTimestep, IteratingSystem, Pass, World, WorldConfig,
};

#[derive(Debug, Clone, Copy, PartialEq)]
struct Health(i32);
impl Component for Health {}

type Visits = Arc<Mutex<Vec<Entity>>>;

/// Three entities, `Health` on 0 and 2 only.
fn three_entities() -> (World, [Entity; 3]) {
    let mut world = World::new();
    let entities = [
        world.create_entity(),
        world.create_entity(),
        world.create_entity(),
    ];
    world.mapper::<Health>().add(entities[0], Health(10)).unwrap();
    world.mapper::<Health>().add(entities[2], Health(30)).unwrap();
    (world, entities)
}

fn drain(visits: &Visits) -> Vec<Entity> {
    std::mem::take(&mut *visits.lock().unwrap())
}

#[test]
fn test_basic_tick_visits_matching_entities_in_order() {
    let (mut world, [e0, _, e2]) = three_entities();
    let visits: Visits = Arc::default();

    let seen = Arc::clone(&visits);
    let aspect = world.aspect().all::<Health>().build();
    world
        .add_system(IteratingSystem::new("health", aspect, Pass::Update, move |_, e, _| {
            seen.lock().unwrap().push(e);
            Ok(())
        }))
        .unwrap();

    world.update(1.0 / 60.0);
    assert_eq!(drain(&visits), vec![e0, e2]);
}

#[test]
fn test_removal_mid_iteration_takes_effect_next_update() {
    let (mut world, [e0, _, e2]) = three_entities();
    let visits: Visits = Arc::default();

    let seen = Arc::clone(&visits);
    let aspect = world.aspect().all::<Health>().build();
    let id = world
        .add_system(IteratingSystem::new("cull", aspect, Pass::Update, move |w, e, _| {
            seen.lock().unwrap().push(e);
            if e == e0 {
                w.mapper::<Health>().remove(e)?;
            }
            Ok(())
        }))
        .unwrap();

    world.update(0.1);
    assert_eq!(drain(&visits), vec![e0, e2]);
    assert_eq!(world.system_entities(id).unwrap().to_vec(), vec![e2]);

    world.update(0.1);
    assert_eq!(drain(&visits), vec![e2]);
}

#[test]
fn test_entity_created_mid_iteration_waits_for_next_update() {
    let (mut world, [e0, _, e2]) = three_entities();
    let visits: Visits = Arc::default();
    let spawned = Arc::new(Mutex::new(None));

    let (seen, slot) = (Arc::clone(&visits), Arc::clone(&spawned));
    let aspect = world.aspect().all::<Health>().build();
    world
        .add_system(IteratingSystem::new("spawner", aspect, Pass::Update, move |w, e, _| {
            seen.lock().unwrap().push(e);
            let mut slot = slot.lock().unwrap();
            if slot.is_none() {
                let child = w.create_entity();
                w.mapper::<Health>().add(child, Health(1))?;
                *slot = Some(child);
            }
            Ok(())
        }))
        .unwrap();

    world.update(0.1);
    assert_eq!(drain(&visits), vec![e0, e2]);

    let child = spawned.lock().unwrap().unwrap();
    world.update(0.1);
    assert_eq!(drain(&visits), vec![e0, e2, child]);
}

#[test]
fn test_configured_schedule_orders_systems() {
    let config = WorldConfig::from_toml_str(
        r#"
        [schedule]
        before = ["input"]
        after = ["render"]
        "#,
    )
    .unwrap();
    let mut world = World::with_config(config).unwrap();
    world.create_entity();

    let order = Arc::new(Mutex::new(Vec::new()));
    for name in ["render", "ai", "input", "physics"] {
        let log = Arc::clone(&order);
        world
            .add_system(IteratingSystem::new(
                name,
                tessera_ecs::Aspect::default(),
                Pass::Update,
                move |_, _, _| {
                    log.lock().unwrap().push(name);
                    Ok(())
                },
            ))
            .unwrap();
    }

    world.update(0.0);
    assert_eq!(
        *order.lock().unwrap(),
        vec!["input", "ai", "physics", "render"]
    );
}

#[test]
fn test_passes_run_independently() {
    let (mut world, _) = three_entities();
    let passes = Arc::new(Mutex::new(Vec::new()));

    for pass in [Pass::Update, Pass::Draw, Pass::FixedUpdate] {
        let log = Arc::clone(&passes);
        let aspect = world.aspect().all::<Health>().build();
        world
            .add_system(IteratingSystem::new(
                format!("{pass:?}"),
                aspect,
                pass,
                move |_, _, _| {
                    log.lock().unwrap().push(pass);
                    Ok(())
                },
            ))
            .unwrap();
    }

    world.draw(0.0);
    assert_eq!(*passes.lock().unwrap(), vec![Pass::Draw, Pass::Draw]);
    passes.lock().unwrap().clear();

    let mut timestep = FixedTimestep::for_world(&world);
    let report = timestep.tick(&mut world, timestep.step() * 1.5);
    assert_eq!(report.fixed_steps, 1);
    assert_eq!(
        *passes.lock().unwrap(),
        vec![Pass::FixedUpdate, Pass::FixedUpdate, Pass::Update, Pass::Update]
    );
}
