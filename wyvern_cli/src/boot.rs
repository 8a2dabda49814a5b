use wyvern_vm::{
    Blueprint, FunctionBuilder, Instruction, MemoryFilesystem, Result, Value, World, builtins,
};

/// Assemble the boot world: builtins plus a hand-assembled login
/// blueprint that greets each connection and echoes its lines.
///
/// A production world would load its blueprints through the compiler and
/// the real filesystem; the built-in login object keeps the server useful
/// with neither attached.
pub(crate) fn boot_world() -> Result<World> {
    let mut world = World::new();
    builtins::install(&mut world)?;

    let blueprint = world.alloc_blueprint(Blueprint::new("/secure/login", None))?;

    let on_line = world.intern("on_line")?;
    let on_connect = world.intern("on_connect")?;
    let print = world.intern("print")?;
    let input_to = world.intern("input_to")?;
    let wait_for_input = world.intern("wait_for_input")?;

    // on_line(line): print("you said: ", line, "\n"), then re-arm the
    // handler and park for the next line.
    let prefix = world.alloc_string("you said: ")?;
    let newline = world.alloc_string("\n")?;
    let mut builder = FunctionBuilder::new(on_line);
    let prefix_const = builder.constant(prefix);
    let newline_const = builder.constant(newline);
    let print_const = builder.constant(Value::Ref(print));
    let on_line_const = builder.constant(Value::Ref(on_line));
    let input_to_const = builder.constant(Value::Ref(input_to));
    let wait_const = builder.constant(Value::Ref(wait_for_input));
    let function = builder
        .instructions(&[
            Instruction::PushSelf,
            Instruction::PushConst(prefix_const),
            Instruction::LoadLocal(1),
            Instruction::Push,
            Instruction::PushConst(newline_const),
            Instruction::Send(print_const, 3),
            Instruction::PushSelf,
            Instruction::LoadFuncref(on_line_const),
            Instruction::Push,
            Instruction::Send(input_to_const, 1),
            Instruction::PushSelf,
            Instruction::Send(wait_const, 0),
            Instruction::Return,
        ])?
        .locals(1)
        .build();
    let function = world.alloc_function(function)?;
    world.function_in_blueprint(function, blueprint)?;

    // on_connect(connection): greet, then hand the line loop its first
    // turn.
    let welcome = world.alloc_string("Welcome to Wyvern.\n")?;
    let mut builder = FunctionBuilder::new(on_connect);
    let welcome_const = builder.constant(welcome);
    let print_const = builder.constant(Value::Ref(print));
    let on_line_const = builder.constant(Value::Ref(on_line));
    let input_to_const = builder.constant(Value::Ref(input_to));
    let wait_const = builder.constant(Value::Ref(wait_for_input));
    let function = builder
        .instructions(&[
            Instruction::PushSelf,
            Instruction::PushConst(welcome_const),
            Instruction::Send(print_const, 1),
            Instruction::PushSelf,
            Instruction::LoadFuncref(on_line_const),
            Instruction::Push,
            Instruction::Send(input_to_const, 1),
            Instruction::PushSelf,
            Instruction::Send(wait_const, 0),
            Instruction::Return,
        ])?
        .locals(1)
        .build();
    let function = world.alloc_function(function)?;
    world.function_in_blueprint(function, blueprint)?;

    let login = world.instantiate(blueprint)?;
    let handler = world.alloc_funcref(Value::Ref(login), on_connect)?;
    world.vars_mut().connect_handler = handler;

    let mut filesystem = MemoryFilesystem::new();
    filesystem.register_blueprint("/secure/login", blueprint);
    filesystem.register_object("/secure/login", login);
    world.set_filesystem(Box::new(filesystem));
    Ok(world)
}
