use crate::error::Error::InvalidConstantIndex;
use crate::error::Result;
use crate::fiber::Fiber;
use crate::instruction::word_index;
use crate::interpreter::ExecutionResult;
use crate::interpreter::ExecutionResult::Continue;
use crate::world::World;

/// `load_array`: collect the top `n` stack slots into a new array; the
/// first pushed slot becomes element 0.
#[inline]
pub(crate) fn load_array(
    world: &mut World,
    fiber: &mut Fiber,
    operand: i16,
) -> Result<ExecutionResult> {
    let count = word_index(operand)?;
    let values = fiber.drain_top(count)?;
    let array = world.alloc_array(values)?;
    fiber.set_accumulator(array);
    Ok(Continue)
}

/// `load_mapping`: collect the top `n` stack slots pairwise into a new
/// mapping; an odd count silently drops the unpaired slot.
#[inline]
pub(crate) fn load_mapping(
    world: &mut World,
    fiber: &mut Fiber,
    operand: i16,
) -> Result<ExecutionResult> {
    let count = word_index(operand)?;
    let mut values = fiber.drain_top(count)?;
    if values.len() % 2 != 0 {
        values.pop();
    }
    let mapping = world.alloc_mapping()?;
    let handle = mapping.as_handle()?;
    for pair in values.chunks_exact(2) {
        world.mapping_put(handle, pair[0], pair[1])?;
    }
    fiber.set_accumulator(mapping);
    Ok(Continue)
}

/// `load_funcref`: accumulator ← a funcref binding self to the message
/// symbol at the given constant index.
#[inline]
pub(crate) fn load_funcref(
    world: &mut World,
    fiber: &mut Fiber,
    operand: i16,
) -> Result<ExecutionResult> {
    let index = word_index(operand)?;
    let message = {
        let function = world.function(fiber.current_frame()?.function())?;
        let constant = function
            .constants()
            .get(index)
            .copied()
            .ok_or(InvalidConstantIndex(index))?;
        constant.as_handle()?
    };
    world.symbol(message)?;
    let receiver = fiber.self_value()?;
    let funcref = world.alloc_funcref(receiver, message)?;
    fiber.set_accumulator(funcref);
    Ok(Continue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn test_load_mapping_drops_odd_slot() -> Result<()> {
        let mut world = World::new();
        let mut fiber = Fiber::new();
        fiber.push(Value::Int(1));
        fiber.push(Value::Int(10));
        fiber.push(Value::Int(99));
        load_mapping(&mut world, &mut fiber, 3)?;
        let mapping = fiber.accumulator().as_handle()?;
        assert_eq!(1, world.mapping(mapping)?.size());
        assert_eq!(Value::Int(10), world.mapping_get(mapping, Value::Int(1))?);
        assert_eq!(0, fiber.sp());
        Ok(())
    }

    #[test]
    fn test_load_array_preserves_push_order() -> Result<()> {
        let mut world = World::new();
        let mut fiber = Fiber::new();
        fiber.push(Value::Int(1));
        fiber.push(Value::Int(2));
        load_array(&mut world, &mut fiber, 2)?;
        let array = fiber.accumulator().as_handle()?;
        assert_eq!(Value::Int(1), world.array(array)?.get(0));
        assert_eq!(Value::Int(2), world.array(array)?.get(1));
        Ok(())
    }
}
