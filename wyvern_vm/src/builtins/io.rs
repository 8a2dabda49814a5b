use crate::error::Result;
use crate::fiber::Fiber;
use crate::value::Value;
use crate::world::World;
use tracing::debug;

fn render(world: &World, args: &[Value]) -> Vec<u8> {
    let mut text = String::new();
    for arg in args {
        text.push_str(&world.display_value(*arg));
    }
    text.into_bytes()
}

/// `print(values...)`: write to the fiber's own connection.
pub(crate) fn print(world: &mut World, fiber: &mut Fiber, args: &[Value]) -> Result<()> {
    let bytes = render(world, args);
    match fiber.connection() {
        Some(connection) => {
            let token = world.connection(connection)?.token();
            world.enqueue_output(token, bytes);
        }
        None => debug!("print without connection: {}", String::from_utf8_lossy(&bytes)),
    }
    Ok(())
}

/// `write(values...)`: write to the connection controlled by
/// `this_player`, falling back to the fiber's own connection.
pub(crate) fn write(world: &mut World, fiber: &mut Fiber, args: &[Value]) -> Result<()> {
    let bytes = render(world, args);
    let connection = world
        .connection_for_player(fiber.this_player())
        .or(fiber.connection());
    match connection {
        Some(connection) => {
            let token = world.connection(connection)?.token();
            world.enqueue_output(token, bytes);
        }
        None => debug!("write without connection: {}", String::from_utf8_lossy(&bytes)),
    }
    Ok(())
}
