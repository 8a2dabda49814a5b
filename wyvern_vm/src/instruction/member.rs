use crate::error::Error::InvalidOperand;
use crate::error::Result;
use crate::fiber::Fiber;
use crate::instruction::word_index;
use crate::interpreter::ExecutionResult;
use crate::interpreter::ExecutionResult::Continue;
use crate::world::World;
use wyvern_gc::Handle;

/// The instance behind self and the executing method's blueprint. Member
/// slots are page relative, so access outside a blueprint method or on a
/// primitive self is a type error.
fn member_target(world: &World, fiber: &Fiber) -> Result<(Handle, Handle)> {
    let self_value = fiber.self_value()?;
    let instance = self_value.handle().ok_or_else(|| InvalidOperand {
        expected: "object".to_string(),
        actual: world.type_name(self_value).to_string(),
    })?;
    world.instance(instance)?;
    let function = world.function(fiber.current_frame()?.function())?;
    let blueprint = function.blueprint().ok_or_else(|| InvalidOperand {
        expected: "blueprint method".to_string(),
        actual: "driver function".to_string(),
    })?;
    Ok((instance, blueprint))
}

/// `load_member`: accumulator ← self's instance slot `i`.
#[inline]
pub(crate) fn load_member(world: &World, fiber: &mut Fiber, operand: i16) -> Result<ExecutionResult> {
    let index = word_index(operand)?;
    let (instance, blueprint) = member_target(world, fiber)?;
    let value = world.member_slot(instance, blueprint, index)?;
    fiber.set_accumulator(value);
    Ok(Continue)
}

/// `store_member`: self's instance slot `i` ← accumulator.
#[inline]
pub(crate) fn store_member(
    world: &mut World,
    fiber: &mut Fiber,
    operand: i16,
) -> Result<ExecutionResult> {
    let index = word_index(operand)?;
    let (instance, blueprint) = member_target(world, fiber)?;
    world.set_member_slot(instance, blueprint, index, fiber.accumulator())?;
    Ok(Continue)
}
