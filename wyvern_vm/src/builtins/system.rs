use crate::error::Error::Crash;
use crate::error::Result;
use crate::fiber::Fiber;
use crate::value::Value;
use crate::world::World;

/// `gc()`: request a collection cycle at the scheduler's next safe point.
pub(crate) fn gc(world: &mut World, _fiber: &mut Fiber, _args: &[Value]) -> Result<()> {
    world.request_gc();
    Ok(())
}

/// `crash(message)`: abort the fiber (or land in a surrounding catch).
pub(crate) fn crash(world: &mut World, _fiber: &mut Fiber, args: &[Value]) -> Result<()> {
    let message = args
        .first()
        .map_or_else(|| "crash".to_string(), |value| world.display_value(*value));
    Err(Crash { message })
}

/// `shutdown()`: ask the driver loop to stop the world.
pub(crate) fn shutdown(world: &mut World, _fiber: &mut Fiber, _args: &[Value]) -> Result<()> {
    world.request_shutdown();
    Ok(())
}
