//! Scheduler scenarios: connection life cycle, line delivery into
//! waiting fibers, heart-beats and blueprint reloads, driven through the
//! loopback server.

use std::time::Duration;
use wyvern_vm::{
    Blueprint, Configuration, ConfigurationBuilder, Fiber, FiberState, FunctionBuilder, Handle,
    Instruction, LoopbackServer, MemoryFilesystem, Operator, Result, Scheduler, ServerEvent,
    TypeTag, Value, VarDef, World, builtins, interpreter,
};

fn test_configuration() -> Configuration {
    ConfigurationBuilder::new()
        .tick_timeout(Duration::ZERO)
        .build()
}

/// A handler object whose `on_connect` greets, arms `input_to` with its
/// `on_line` method and parks the fiber; `on_line` returns the line.
fn install_login_handler(world: &mut World) -> Result<Handle> {
    let blueprint = world.alloc_blueprint(Blueprint::new("/secure/login", None))?;

    let on_line = world.intern("on_line")?;
    let method = FunctionBuilder::new(on_line)
        .instructions(&[Instruction::LoadLocal(1), Instruction::Return])?
        .locals(1)
        .build();
    let method = world.alloc_function(method)?;
    world.function_in_blueprint(method, blueprint)?;

    let on_connect = world.intern("on_connect")?;
    let print = world.intern("print")?;
    let input_to = world.intern("input_to")?;
    let wait_for_input = world.intern("wait_for_input")?;
    let welcome = world.alloc_string("welcome\n")?;

    let mut builder = FunctionBuilder::new(on_connect);
    let welcome_const = builder.constant(welcome);
    let print_const = builder.constant(Value::Ref(print));
    let on_line_const = builder.constant(Value::Ref(on_line));
    let input_to_const = builder.constant(Value::Ref(input_to));
    let wait_const = builder.constant(Value::Ref(wait_for_input));
    let method = builder
        .instructions(&[
            // print("welcome\n")
            Instruction::PushSelf,
            Instruction::PushConst(welcome_const),
            Instruction::Send(print_const, 1),
            // input_to(funcref(self, 'on_line))
            Instruction::PushSelf,
            Instruction::LoadFuncref(on_line_const),
            Instruction::Push,
            Instruction::Send(input_to_const, 1),
            // wait_for_input()
            Instruction::PushSelf,
            Instruction::Send(wait_const, 0),
            Instruction::Return,
        ])?
        .locals(1)
        .build();
    let method = world.alloc_function(method)?;
    world.function_in_blueprint(method, blueprint)?;

    let handler = world.instantiate(blueprint)?;
    let connect = world.alloc_funcref(Value::Ref(handler), on_connect)?;
    world.vars_mut().connect_handler = connect;
    Ok(handler)
}

#[test]
fn test_connection_lifecycle_delivers_input_line() -> Result<()> {
    let mut world = World::new();
    builtins::install(&mut world)?;
    install_login_handler(&mut world)?;

    let mut scheduler = Scheduler::new(test_configuration());
    let mut server = LoopbackServer::new();

    // Tick 1: the connection arrives and on_connect runs to the park.
    server.queue(vec![ServerEvent::Accepted(0)]);
    scheduler.tick(&mut world, &mut server);
    scheduler.run_pass(&mut world);
    scheduler.tick(&mut world, &mut server);
    assert_eq!(b"welcome\n".to_vec(), server.written_to(0));

    let connection = world.connection_by_token(0).expect("connection");
    let fiber_id = world.connection(connection)?.fiber().expect("bound fiber");
    assert_eq!(
        FiberState::WaitingForInput,
        scheduler.get(fiber_id).expect("fiber").state()
    );

    // Tick 2: a complete line reactivates the fiber through input_to.
    server.queue(vec![ServerEvent::Input(0, b"hi\r\n".to_vec())]);
    scheduler.tick(&mut world, &mut server);

    // Drive the reactivated fiber to completion by hand so the final
    // accumulator is observable before the scheduler retires it.
    {
        let fiber = scheduler.get_mut(fiber_id).expect("fiber");
        assert_eq!(FiberState::Running, fiber.state());
        interpreter::run(&mut world, fiber, 10_000);
    }
    let fiber = scheduler.get(fiber_id).expect("fiber");
    assert_eq!(FiberState::Stopped, fiber.state());
    let line = fiber.accumulator().as_handle()?;
    assert_eq!(b"hi", world.string(line)?.bytes());
    Ok(())
}

#[test]
fn test_closed_connection_reactivates_with_nil() -> Result<()> {
    let mut world = World::new();
    builtins::install(&mut world)?;
    install_login_handler(&mut world)?;

    let mut scheduler = Scheduler::new(test_configuration());
    let mut server = LoopbackServer::new();

    server.queue(vec![ServerEvent::Accepted(0)]);
    scheduler.tick(&mut world, &mut server);
    scheduler.run_pass(&mut world);

    let connection = world.connection_by_token(0).expect("connection");
    let fiber_id = world.connection(connection)?.fiber().expect("bound fiber");

    server.queue(vec![ServerEvent::Closed(0)]);
    scheduler.tick(&mut world, &mut server);

    let fiber = scheduler.get(fiber_id).expect("fiber");
    assert_eq!(FiberState::Running, fiber.state());
    assert_eq!(Value::Nil, fiber.accumulator());
    assert!(world.connection_by_token(0).is_none());
    Ok(())
}

#[test]
fn test_heartbeat_objects_are_notified_each_tick() -> Result<()> {
    let mut world = World::new();
    builtins::install(&mut world)?;

    // A counter object whose heartbeat increments its only slot.
    let count = world.intern("count")?;
    let mut blueprint = Blueprint::new("/world/clock", None);
    blueprint.add_var(VarDef::new(count, TypeTag::Int));
    let blueprint = world.alloc_blueprint(blueprint)?;

    let heartbeat = world.intern("heartbeat")?;
    let mut builder = FunctionBuilder::new(heartbeat);
    let one = builder.constant(Value::Int(1));
    let method = builder
        .instructions(&[
            Instruction::LoadMember(0),
            Instruction::Push,
            Instruction::LoadConst(one),
            Instruction::Op(Operator::Add.code()),
            Instruction::StoreMember(0),
            Instruction::Return,
        ])?
        .build();
    let method = world.alloc_function(method)?;
    world.function_in_blueprint(method, blueprint)?;

    let clock = world.instantiate(blueprint)?;
    world.set_member_slot(clock, blueprint, 0, Value::Int(0))?;
    world.objects_mut().add_heartbeat(clock);

    let mut scheduler = Scheduler::new(test_configuration());
    let mut server = LoopbackServer::new();
    for _ in 0..3 {
        scheduler.tick(&mut world, &mut server);
        scheduler.run_pass(&mut world);
    }
    assert_eq!(
        Value::Int(3),
        world.member_slot(clock, blueprint, 0)?
    );
    Ok(())
}

#[test]
fn test_blueprint_reload_keeps_soulmate_slots() -> Result<()> {
    let mut world = World::new();

    let hp = world.intern("hp")?;
    let mana = world.intern("mana")?;

    let mut version_one = Blueprint::new("/world/hero", None);
    version_one.add_var(VarDef::new(hp, TypeTag::Int));
    let version_one = world.alloc_blueprint(version_one)?;

    let hero = world.instantiate(version_one)?;
    world.set_member_slot(hero, version_one, 0, Value::Int(30))?;

    let mut version_two = Blueprint::new("/world/hero", None);
    version_two.add_var(VarDef::new(hp, TypeTag::Int));
    version_two.add_var(VarDef::new(mana, TypeTag::Int));
    let version_two = world.alloc_blueprint(version_two)?;

    let mut filesystem = MemoryFilesystem::new();
    filesystem.register_blueprint("/world/hero", version_one);
    filesystem.register_blueprint("/world/hero", version_two);
    world.set_filesystem(Box::new(filesystem));

    world.refresh_instance(hero)?;
    let instance = world.instance(hero)?;
    assert_eq!(Some(version_two), instance.master());
    assert_eq!(1, instance.pages().len());
    // The soulmate page kept its slots; the new layout's extra slot
    // starts nil.
    assert_eq!(Value::Int(30), world.member_slot(hero, version_two, 0)?);
    assert_eq!(Value::Nil, world.member_slot(hero, version_two, 1)?);
    Ok(())
}

#[test]
fn test_gc_runs_on_schedule_between_slices() -> Result<()> {
    let configuration = ConfigurationBuilder::new()
        .tick_timeout(Duration::ZERO)
        .gc_interval_ticks(2)
        .build();
    let mut world = World::new();
    let mut scheduler = Scheduler::new(configuration);
    let mut server = LoopbackServer::new();

    world.alloc_array(Vec::new())?;
    assert_eq!(1, world.objects().len());

    scheduler.tick(&mut world, &mut server);
    assert_eq!(1, world.objects().len());
    scheduler.tick(&mut world, &mut server);
    assert_eq!(0, world.objects().len());
    Ok(())
}

#[test]
fn test_explicit_gc_request_triggers_collection() -> Result<()> {
    let mut world = World::new();
    builtins::install(&mut world)?;

    // A driver fiber that calls the gc builtin.
    let gc = world.intern("gc")?;
    let name = world.intern("driver")?;
    // After collection only the interned symbols remain rooted.
    let interned = world.objects().len();
    let mut builder = FunctionBuilder::new(name);
    let gc_const = builder.constant(Value::Ref(gc));
    let function = builder
        .instructions(&[
            Instruction::PushSelf,
            Instruction::Send(gc_const, 0),
            Instruction::Return,
        ])?
        .build();
    let function = world.alloc_function(function)?;

    let mut fiber = Fiber::new();
    fiber.push(Value::Nil);
    fiber.push_frame(&mut world, function, 0)?;

    let mut scheduler = Scheduler::new(test_configuration());
    scheduler.spawn(fiber);
    scheduler.run_pass(&mut world);

    world.alloc_array(Vec::new())?;
    let mut server = LoopbackServer::new();
    scheduler.tick(&mut world, &mut server);
    // The garbage array went; the interned symbols stayed.
    assert_eq!(interned, world.objects().len());
    Ok(())
}
