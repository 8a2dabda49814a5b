use crate::error::{Error, Result};
use crate::fiber::{CrashRecord, Fiber, FiberState};
use crate::instruction;
use crate::value::Value;
use crate::world::World;
use tracing::{debug, warn};
use wyvern_bytecode::Instruction;

/// How the dispatch loop proceeds after one instruction.
///
/// - `Continue`: execute the next instruction (the instruction pointer
///   was already advanced past the current one).
/// - `ContinueAt(offset)`: continue at an absolute offset in the current
///   function; used by the branch instructions.
/// - `Return`: pop the current frame and resume the caller.
#[derive(Debug, PartialEq)]
pub(crate) enum ExecutionResult {
    Continue,
    ContinueAt(usize),
    Return,
}

/// Advance a fiber by at most `budget` instructions.
///
/// The loop runs while the fiber is Running: a builtin that pauses or
/// parks the fiber ends the slice, an empty frame chain stops it, and an
/// exhausted budget yields with all state unchanged so the scheduler can
/// reschedule the fiber fairly. Instruction errors unwind to the nearest
/// armed catch address or crash the fiber; either way the loop itself
/// never fails.
pub fn run(world: &mut World, fiber: &mut Fiber, budget: usize) {
    let mut executed = 0;
    while fiber.state() == FiberState::Running {
        if executed >= budget {
            debug!("slice budget of {budget} exhausted, yielding");
            break;
        }
        executed += 1;

        if fiber.depth() == 0 {
            fiber.stop();
            break;
        }
        if let Err(error) = step(world, fiber) {
            deliver_error(world, fiber, &error);
        }
    }
}

/// Decode and execute the instruction at the current frame's instruction
/// pointer. An instruction pointer past the end of the function performs
/// the implicit return.
fn step(world: &mut World, fiber: &mut Fiber) -> Result<()> {
    let decoded = {
        let frame = fiber.current_frame()?;
        let ip = frame.ip();
        let function = world.function(frame.function())?;
        let code = function.code();
        if ip >= code.len() {
            None
        } else {
            Some(Instruction::decode(code, ip)?)
        }
    };

    let Some((instruction, next_ip)) = decoded else {
        fiber.pop_frame()?;
        return Ok(());
    };

    // The caller's resume point is recorded before the instruction runs,
    // so sends that push a frame return to the right place.
    fiber.current_frame_mut()?.set_ip(next_ip);

    match execute(world, fiber, instruction)? {
        ExecutionResult::Continue => {}
        ExecutionResult::ContinueAt(offset) => fiber.current_frame_mut()?.set_ip(offset),
        ExecutionResult::Return => fiber.pop_frame()?,
    }
    Ok(())
}

fn execute(
    world: &mut World,
    fiber: &mut Fiber,
    instruction: Instruction,
) -> Result<ExecutionResult> {
    match instruction {
        Instruction::Noop => Ok(ExecutionResult::Continue),
        Instruction::LoadSelf => instruction::load_self(fiber),
        Instruction::LoadConst(operand) => instruction::load_const(world, fiber, operand),
        Instruction::LoadArray(operand) => instruction::load_array(world, fiber, operand),
        Instruction::LoadMapping(operand) => instruction::load_mapping(world, fiber, operand),
        Instruction::LoadFuncref(operand) => instruction::load_funcref(world, fiber, operand),
        Instruction::LoadLocal(operand) => instruction::load_local(fiber, operand),
        Instruction::LoadMember(operand) => instruction::load_member(world, fiber, operand),
        Instruction::StoreLocal(operand) => instruction::store_local(fiber, operand),
        Instruction::StoreMember(operand) => instruction::store_member(world, fiber, operand),
        Instruction::PushSelf => instruction::push_self(fiber),
        Instruction::PushConst(operand) => instruction::push_const(world, fiber, operand),
        Instruction::Push => instruction::push(fiber),
        Instruction::Pop => instruction::pop(fiber),
        Instruction::Op(operand) => instruction::op(world, fiber, operand),
        Instruction::Send(operand, arity) => instruction::send(world, fiber, operand, arity),
        Instruction::SuperSend(operand, arity) => {
            instruction::super_send(world, fiber, operand, arity)
        }
        Instruction::Jump(operand) => instruction::jump(operand),
        Instruction::JumpIf(operand) => instruction::jump_if(fiber, operand),
        Instruction::JumpIfNot(operand) => instruction::jump_if_not(fiber, operand),
        Instruction::Return => Ok(ExecutionResult::Return),
        Instruction::Typecheck(operand) => instruction::typecheck(world, fiber, operand),
        Instruction::Typecast(operand) => instruction::typecast(world, fiber, operand),
        Instruction::Catch(operand) => instruction::catch_address(fiber, operand),
    }
}

/// Unwind an instruction error to the nearest frame with an armed catch
/// address, or crash the fiber.
///
/// A caught error leaves its symbolic error value in the accumulator and
/// resumes at the catch address; the catch is consumed. With no armed
/// catch anywhere in the chain the fiber transitions to Crashed and the
/// post-mortem is recorded.
fn deliver_error(world: &mut World, fiber: &mut Fiber, error: &Error) {
    let catch_depth = fiber
        .frames()
        .iter()
        .rposition(|frame| frame.catch_address().is_some());

    if let Some(depth) = catch_depth {
        fiber.unwind_to(depth + 1);
        let address = fiber.frames_mut()[depth].take_catch().unwrap_or(0);
        fiber.frames_mut()[depth].set_ip(address);
        match world.intern(error.symbol_name()) {
            Ok(symbol) => {
                debug!("caught {error}, resuming at {address}");
                fiber.set_accumulator(Value::Ref(symbol));
                return;
            }
            Err(intern_error) => {
                // Interning the error symbol failed; the catch cannot
                // run, so the fiber crashes with the original error.
                warn!("failed to intern error symbol: {intern_error}");
            }
        }
    }

    let record = crash_record(world, fiber, error);
    warn!("fiber crashed: {record}");
    fiber.crash(record);
}

fn crash_record(world: &World, fiber: &Fiber, error: &Error) -> CrashRecord {
    let (function, ip) = match fiber.current_frame() {
        Ok(frame) => {
            let name = world
                .function(frame.function())
                .and_then(|function| world.symbol_name(function.name()))
                .unwrap_or("<unknown>");
            (name.to_string(), frame.ip())
        }
        Err(..) => ("<no frame>".to_string(), 0),
    };
    CrashRecord {
        message: error.to_string(),
        function,
        ip,
    }
}
