use crate::error::Result;
use crate::fiber::Fiber;
use crate::value::Value;
use crate::world::World;

/// `heartbeat_on(object)`: add an object to the heart-beat list.
pub(crate) fn heartbeat_on(world: &mut World, _fiber: &mut Fiber, args: &[Value]) -> Result<()> {
    let object = args.first().copied().unwrap_or(Value::Nil).as_handle()?;
    world.instance(object)?;
    world.objects_mut().add_heartbeat(object);
    Ok(())
}

/// `heartbeat_off(object)`: remove an object from the heart-beat list.
pub(crate) fn heartbeat_off(world: &mut World, _fiber: &mut Fiber, args: &[Value]) -> Result<()> {
    let object = args.first().copied().unwrap_or(Value::Nil).as_handle()?;
    world.objects_mut().remove_heartbeat(object);
    Ok(())
}

/// `move_object(object, destination)`: relink the object in the
/// containment tree.
pub(crate) fn move_object(world: &mut World, fiber: &mut Fiber, args: &[Value]) -> Result<()> {
    let object = args.first().copied().unwrap_or(Value::Nil).as_handle()?;
    let destination = args.get(1).copied().unwrap_or(Value::Nil);
    world.move_instance(object, destination)?;
    fiber.set_accumulator(Value::Ref(object));
    Ok(())
}

/// `the_object(path)`: the singleton object registered for a virtual
/// path, or nil.
pub(crate) fn the_object(world: &mut World, fiber: &mut Fiber, args: &[Value]) -> Result<()> {
    let path = args.first().copied().unwrap_or(Value::Nil);
    let path = world.string(path.as_handle()?)?.to_text().into_owned();
    let object = world
        .filesystem()
        .get_object(&path)
        .map_or(Value::Nil, Value::Ref);
    fiber.set_accumulator(object);
    Ok(())
}

/// `resolve(path)`: the blueprint for a virtual path, or nil.
pub(crate) fn resolve(world: &mut World, fiber: &mut Fiber, args: &[Value]) -> Result<()> {
    let path = args.first().copied().unwrap_or(Value::Nil);
    let path = world.string(path.as_handle()?)?.to_text().into_owned();
    let blueprint = world
        .filesystem()
        .resolve(&path)
        .map_or(Value::Nil, Value::Ref);
    fiber.set_accumulator(blueprint);
    Ok(())
}

/// `update_object(object)`: switch the object to the newest version of
/// its master blueprint, keeping soulmate page slots.
pub(crate) fn update_object(world: &mut World, fiber: &mut Fiber, args: &[Value]) -> Result<()> {
    let object = args.first().copied().unwrap_or(Value::Nil).as_handle()?;
    world.refresh_instance(object)?;
    fiber.set_accumulator(Value::Ref(object));
    Ok(())
}

/// `stash(object)`: the object's scratch value.
pub(crate) fn stash(world: &mut World, fiber: &mut Fiber, args: &[Value]) -> Result<()> {
    let object = args.first().copied().unwrap_or(Value::Nil).as_handle()?;
    fiber.set_accumulator(world.instance(object)?.stash());
    Ok(())
}

/// `set_stash(object, value)`: replace the object's scratch value.
pub(crate) fn set_stash(world: &mut World, fiber: &mut Fiber, args: &[Value]) -> Result<()> {
    let object = args.first().copied().unwrap_or(Value::Nil).as_handle()?;
    let value = args.get(1).copied().unwrap_or(Value::Nil);
    world.instance_mut(object)?.set_stash(value);
    fiber.set_accumulator(value);
    Ok(())
}
