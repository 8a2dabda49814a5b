use crate::assignable;
use crate::error::Error::{InvalidTypeIndex, TypeMismatch};
use crate::error::Result;
use crate::fiber::Fiber;
use crate::instruction::word_index;
use crate::interpreter::ExecutionResult;
use crate::interpreter::ExecutionResult::Continue;
use crate::world::World;
use wyvern_bytecode::TypeTag;

fn referenced_type(world: &World, fiber: &Fiber, operand: i16) -> Result<TypeTag> {
    let index = word_index(operand)?;
    let function = world.function(fiber.current_frame()?.function())?;
    function
        .types()
        .get(index)
        .copied()
        .ok_or(InvalidTypeIndex(index))
}

/// `typecheck`: crash the fiber unless the accumulator satisfies the
/// referenced type.
#[inline]
pub(crate) fn typecheck(world: &World, fiber: &Fiber, operand: i16) -> Result<ExecutionResult> {
    let tag = referenced_type(world, fiber, operand)?;
    let value = fiber.accumulator();
    if assignable::satisfies(world, value, tag) {
        Ok(Continue)
    } else {
        Err(TypeMismatch {
            expected: tag.to_string(),
            actual: world.type_name(value).to_string(),
        })
    }
}

/// `typecast`: convert the accumulator to the referenced type or crash
/// the fiber.
#[inline]
pub(crate) fn typecast(world: &World, fiber: &mut Fiber, operand: i16) -> Result<ExecutionResult> {
    let tag = referenced_type(world, fiber, operand)?;
    let value = assignable::cast(world, fiber.accumulator(), tag)?;
    fiber.set_accumulator(value);
    Ok(Continue)
}
