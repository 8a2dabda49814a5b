use crate::error::Result;
use crate::fiber::Fiber;
use crate::instruction::word_index;
use crate::interpreter::ExecutionResult;
use crate::interpreter::ExecutionResult::{Continue, ContinueAt};

/// `jump`: continue at an absolute offset in the current function.
#[inline]
pub(crate) fn jump(operand: i16) -> Result<ExecutionResult> {
    Ok(ContinueAt(word_index(operand)?))
}

/// `jump_if`: jump when the accumulator is truthy.
#[inline]
pub(crate) fn jump_if(fiber: &Fiber, operand: i16) -> Result<ExecutionResult> {
    if fiber.accumulator().truthy() {
        return Ok(ContinueAt(word_index(operand)?));
    }
    Ok(Continue)
}

/// `jump_if_not`: jump when the accumulator is falsy.
#[inline]
pub(crate) fn jump_if_not(fiber: &Fiber, operand: i16) -> Result<ExecutionResult> {
    if fiber.accumulator().truthy() {
        return Ok(Continue);
    }
    Ok(ContinueAt(word_index(operand)?))
}

/// `catch`: arm the current frame's catch address. An error raised while
/// the frame is live unwinds here with the symbolic error value in the
/// accumulator.
#[inline]
pub(crate) fn catch_address(fiber: &mut Fiber, operand: i16) -> Result<ExecutionResult> {
    let address = word_index(operand)?;
    fiber.current_frame_mut()?.arm_catch(address);
    Ok(Continue)
}
