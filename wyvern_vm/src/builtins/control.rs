use crate::error::Error::InvalidOperand;
use crate::error::Result;
use crate::fiber::Fiber;
use crate::value::Value;
use crate::world::World;

/// `pause()`: suspend the fiber until the scheduler resumes it.
pub(crate) fn pause(_world: &mut World, fiber: &mut Fiber, _args: &[Value]) -> Result<()> {
    fiber.pause();
    Ok(())
}

/// `wait_for_input()`: park the fiber until its connection delivers the
/// next complete line.
pub(crate) fn wait_for_input(_world: &mut World, fiber: &mut Fiber, _args: &[Value]) -> Result<()> {
    fiber.wait_for_input();
    Ok(())
}

/// `input_to(funcref)`: arm the one-shot handler the next input line is
/// delivered through.
pub(crate) fn input_to(world: &mut World, fiber: &mut Fiber, args: &[Value]) -> Result<()> {
    let funcref = args.first().copied().unwrap_or(Value::Nil);
    world.funcref(funcref.as_handle()?)?;
    fiber.set_input_to(funcref);
    Ok(())
}

/// `call(funcref, args...)`: invoke a funcref like a function; the bound
/// receiver and message go through ordinary dispatch.
pub(crate) fn call(world: &mut World, fiber: &mut Fiber, args: &[Value]) -> Result<()> {
    let funcref = args.first().copied().unwrap_or(Value::Nil);
    world.funcref(funcref.as_handle()?)?;
    crate::instruction::invoke_funcref(world, fiber, funcref, args.get(1..).unwrap_or(&[]))
}

/// `stop()`: stop the fiber; its stack is reclaimed on the next
/// collection cycle.
pub(crate) fn stop(_world: &mut World, fiber: &mut Fiber, _args: &[Value]) -> Result<()> {
    fiber.stop();
    Ok(())
}

/// `this_player()`: the fiber's player object.
pub(crate) fn this_player(_world: &mut World, fiber: &mut Fiber, _args: &[Value]) -> Result<()> {
    fiber.set_accumulator(fiber.this_player());
    Ok(())
}

/// `set_this_player(object)`: install the fiber's player object.
pub(crate) fn set_this_player(world: &mut World, fiber: &mut Fiber, args: &[Value]) -> Result<()> {
    let player = args.first().copied().unwrap_or(Value::Nil);
    if !player.is_nil() {
        let handle = player.as_handle()?;
        if world.instance(handle).is_err() {
            return Err(InvalidOperand {
                expected: "object or nil".to_string(),
                actual: world.type_name(player).to_string(),
            });
        }
    }
    fiber.set_this_player(player);
    // Adopt the player on the fiber's connection so output routing and
    // root marking see it.
    if let Some(connection) = fiber.connection() {
        world.connection_mut(connection)?.set_player(player);
    }
    fiber.set_accumulator(player);
    Ok(())
}
