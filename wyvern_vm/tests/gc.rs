//! Collection correctness over a populated world: reachability through
//! fiber stacks, connections and the interner.

use wyvern_vm::{Blueprint, Configuration, Fiber, Result, Scheduler, Value, World, builtins};

#[test]
fn test_collect_retains_exactly_the_rooted_array() -> Result<()> {
    let mut world = World::new();
    let mut scheduler = Scheduler::new(Configuration::default());

    let mut handles = Vec::new();
    for index in 0..1000 {
        let array = world.alloc_array(vec![Value::Int(index)])?;
        handles.push(array);
    }
    let before = world.objects().len();

    // Root array #500 through a fiber stack; everything else is garbage.
    let mut fiber = Fiber::new();
    fiber.push(handles[500]);
    scheduler.spawn(fiber);

    let report = world.collect(&scheduler);
    assert_eq!(999, report.swept);
    assert_eq!(before - 999, world.objects().len());

    let survivor = handles[500].as_handle()?;
    assert!(world.objects().is_live(survivor));
    assert_eq!(Value::Int(500), world.array(survivor)?.get(0));
    Ok(())
}

#[test]
fn test_interned_symbols_survive_collection() -> Result<()> {
    let mut world = World::new();
    builtins::install(&mut world)?;
    let scheduler = Scheduler::new(Configuration::default());

    let print = world.objects().lookup_symbol("print").expect("interned");
    world.collect(&scheduler);

    assert!(world.objects().is_live(print));
    assert_eq!(Some(print), world.objects().lookup_symbol("print"));
    // The builtin binding survived with the symbol.
    assert!(world.symbol(print)?.builtin().is_some());
    Ok(())
}

#[test]
fn test_connection_roots_its_player() -> Result<()> {
    let mut world = World::new();
    let scheduler = Scheduler::new(Configuration::default());

    let blueprint = world.alloc_blueprint(Blueprint::new("/world/player", None))?;
    let player = world.instantiate(blueprint)?;
    let connection = world.create_connection(7)?;
    world
        .connection_mut(connection)?
        .set_player(Value::Ref(player));

    world.collect(&scheduler);
    assert!(world.objects().is_live(player));
    assert!(world.objects().is_live(connection));

    // Dropping the connection from the live list orphans both.
    world.objects_mut().remove_connection(connection);
    world.collect(&scheduler);
    assert!(!world.objects().is_live(player));
    assert!(!world.objects().is_live(connection));
    Ok(())
}

#[test]
fn test_cyclic_instances_are_reclaimed_together() -> Result<()> {
    let mut world = World::new();
    let scheduler = Scheduler::new(Configuration::default());

    let blueprint = world.alloc_blueprint(Blueprint::new("/world/thing", None))?;
    let a = world.instantiate(blueprint)?;
    let b = world.instantiate(blueprint)?;
    world.instance_mut(a)?.set_stash(Value::Ref(b));
    world.instance_mut(b)?.set_stash(Value::Ref(a));

    // The blueprint is unreferenced from any root, so the whole clump
    // including the cycle goes.
    let report = world.collect(&scheduler);
    assert!(report.swept >= 3);
    assert!(!world.objects().is_live(a));
    assert!(!world.objects().is_live(b));
    Ok(())
}

#[test]
fn test_statistics_accumulate_across_cycles() -> Result<()> {
    let mut world = World::new();
    let scheduler = Scheduler::new(Configuration::default());

    world.alloc_array(Vec::new())?;
    world.collect(&scheduler);
    world.alloc_array(Vec::new())?;
    world.collect(&scheduler);

    let statistics = world.objects().statistics();
    assert_eq!(2, statistics.collections);
    assert_eq!(2, statistics.objects_swept);
    assert_eq!(0, statistics.live_objects);
    Ok(())
}
