use crate::error::Result;
use crate::fiber::Fiber;
use crate::value::Value;
use crate::world::World;

/// `typeof(value)`: the interned symbol naming the value's runtime type.
pub(crate) fn type_of(world: &mut World, fiber: &mut Fiber, args: &[Value]) -> Result<()> {
    let value = args.first().copied().unwrap_or(Value::Nil);
    let name = world.type_name(value);
    let symbol = world.intern(name)?;
    fiber.set_accumulator(Value::Ref(symbol));
    Ok(())
}

/// `gensym(name)`: a fresh symbol outside the interning guarantee.
pub(crate) fn gensym(world: &mut World, fiber: &mut Fiber, args: &[Value]) -> Result<()> {
    let name = match args.first() {
        Some(value) if !value.is_nil() => {
            world.string(value.as_handle()?)?.to_text().into_owned()
        }
        _ => "gensym".to_string(),
    };
    let symbol = world.objects_mut().gensym(&name)?;
    fiber.set_accumulator(Value::Ref(symbol));
    Ok(())
}

/// `keys(mapping)`: the live keys in first-insertion order, as a new
/// array.
pub(crate) fn keys(world: &mut World, fiber: &mut Fiber, args: &[Value]) -> Result<()> {
    let mapping = args.first().copied().unwrap_or(Value::Nil).as_handle()?;
    let keys = world.mapping_keys(mapping)?;
    fiber.set_accumulator(keys);
    Ok(())
}

/// `substr(string, from, to)`: the clamped half-open byte range as a new
/// string.
pub(crate) fn substr(world: &mut World, fiber: &mut Fiber, args: &[Value]) -> Result<()> {
    let string = args.first().copied().unwrap_or(Value::Nil).as_handle()?;
    let from = args.get(1).copied().unwrap_or(Value::Int(0)).as_int()?;
    let to = args.get(2).copied().unwrap_or(Value::Int(i64::MAX)).as_int()?;
    let substring = world.string(string)?.substr(from, to);
    let value = world.alloc_string(substring.bytes().to_vec())?;
    fiber.set_accumulator(value);
    Ok(())
}

/// `strlen(string)`: the length in runes.
pub(crate) fn strlen(world: &mut World, fiber: &mut Fiber, args: &[Value]) -> Result<()> {
    let string = args.first().copied().unwrap_or(Value::Nil).as_handle()?;
    let length = world.string(string)?.rune_len();
    fiber.set_accumulator(Value::Int(i64::try_from(length).unwrap_or(i64::MAX)));
    Ok(())
}
