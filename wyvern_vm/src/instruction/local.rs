use crate::error::Error::InvalidConstantIndex;
use crate::error::Result;
use crate::fiber::Fiber;
use crate::instruction::word_index;
use crate::interpreter::ExecutionResult;
use crate::interpreter::ExecutionResult::Continue;
use crate::world::World;

/// `load_self`: accumulator ← the frame's self value.
#[inline]
pub(crate) fn load_self(fiber: &mut Fiber) -> Result<ExecutionResult> {
    let value = fiber.self_value()?;
    fiber.set_accumulator(value);
    Ok(Continue)
}

fn constant(world: &World, fiber: &Fiber, operand: i16) -> Result<crate::value::Value> {
    let index = word_index(operand)?;
    let function = world.function(fiber.current_frame()?.function())?;
    function
        .constants()
        .get(index)
        .copied()
        .ok_or(InvalidConstantIndex(index))
}

/// `load_const`: accumulator ← constants\[k\].
#[inline]
pub(crate) fn load_const(world: &World, fiber: &mut Fiber, operand: i16) -> Result<ExecutionResult> {
    let value = constant(world, fiber, operand)?;
    fiber.set_accumulator(value);
    Ok(Continue)
}

/// `load_local`: accumulator ← frame slot `i`.
#[inline]
pub(crate) fn load_local(fiber: &mut Fiber, operand: i16) -> Result<ExecutionResult> {
    let value = fiber.local(word_index(operand)?)?;
    fiber.set_accumulator(value);
    Ok(Continue)
}

/// `store_local`: frame slot `i` ← accumulator.
#[inline]
pub(crate) fn store_local(fiber: &mut Fiber, operand: i16) -> Result<ExecutionResult> {
    let value = fiber.accumulator();
    fiber.set_local(word_index(operand)?, value)?;
    Ok(Continue)
}

/// `push_self`: push the frame's self value.
#[inline]
pub(crate) fn push_self(fiber: &mut Fiber) -> Result<ExecutionResult> {
    let value = fiber.self_value()?;
    fiber.push(value);
    Ok(Continue)
}

/// `push_const`: push constants\[k\].
#[inline]
pub(crate) fn push_const(world: &World, fiber: &mut Fiber, operand: i16) -> Result<ExecutionResult> {
    let value = constant(world, fiber, operand)?;
    fiber.push(value);
    Ok(Continue)
}

/// `push`: push the accumulator.
#[inline]
pub(crate) fn push(fiber: &mut Fiber) -> Result<ExecutionResult> {
    fiber.push(fiber.accumulator());
    Ok(Continue)
}

/// `pop`: accumulator ← popped stack top.
#[inline]
pub(crate) fn pop(fiber: &mut Fiber) -> Result<ExecutionResult> {
    let value = fiber.pop()?;
    fiber.set_accumulator(value);
    Ok(Continue)
}
