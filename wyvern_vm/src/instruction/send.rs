use crate::error::Error::{InvalidConstantIndex, MethodNotFound, NoSuper, StackUnderflow};
use crate::error::Result;
use crate::fiber::Fiber;
use crate::instruction::word_index;
use crate::interpreter::ExecutionResult;
use crate::interpreter::ExecutionResult::Continue;
use crate::value::Value;
use crate::world::World;
use tracing::trace;
use wyvern_gc::Handle;

/// The message symbol at a constant index of the executing function.
fn message_symbol(world: &World, fiber: &Fiber, operand: i16) -> Result<Handle> {
    let index = word_index(operand)?;
    let function = world.function(fiber.current_frame()?.function())?;
    let constant = function
        .constants()
        .get(index)
        .copied()
        .ok_or(InvalidConstantIndex(index))?;
    let handle = constant.as_handle()?;
    world.symbol(handle)?;
    Ok(handle)
}

/// `send`: dispatch a message to the receiver below the top `arity`
/// argument slots.
#[inline]
pub(crate) fn send(
    world: &mut World,
    fiber: &mut Fiber,
    operand: i16,
    arity: u8,
) -> Result<ExecutionResult> {
    let message = message_symbol(world, fiber, operand)?;
    perform_send(world, fiber, message, usize::from(arity), None)
}

/// `super_send`: dispatch against the executing method's blueprint's
/// parent.
#[inline]
pub(crate) fn super_send(
    world: &mut World,
    fiber: &mut Fiber,
    operand: i16,
    arity: u8,
) -> Result<ExecutionResult> {
    let message = message_symbol(world, fiber, operand)?;
    let origin = {
        let function = world.function(fiber.current_frame()?.function())?;
        let blueprint = function.blueprint().ok_or(NoSuper)?;
        world.blueprint(blueprint)?.parent().ok_or(NoSuper)?
    };
    perform_send(world, fiber, message, usize::from(arity), Some(origin))
}

/// Invoke a funcref with the given arguments: push the bound receiver and
/// the arguments, then send the bound message. Used for `input_to`
/// handlers and connection setup.
pub(crate) fn invoke_funcref(
    world: &mut World,
    fiber: &mut Fiber,
    funcref: Value,
    args: &[Value],
) -> Result<()> {
    let (receiver, message) = {
        let funcref = world.funcref(funcref.as_handle()?)?;
        (funcref.receiver(), funcref.message())
    };
    fiber.push(receiver);
    for arg in args {
        fiber.push(*arg);
    }
    perform_send(world, fiber, message, args.len(), None)?;
    Ok(())
}

/// Message dispatch: resolve against a blueprint chain when one applies —
/// the dispatch origin for super-sends, the receiver's master blueprint
/// for scripted receivers, the per-world proxy's chain for everything
/// else — and fall through to the builtin bound to the message's interned
/// symbol. A found method runs with the original receiver as self; with
/// no method and no builtin the fiber crashes.
fn perform_send(
    world: &mut World,
    fiber: &mut Fiber,
    message: Handle,
    argc: usize,
    origin: Option<Handle>,
) -> Result<ExecutionResult> {
    if fiber.sp() < argc + 1 {
        return Err(StackUnderflow);
    }
    let receiver = fiber.top_slice(argc + 1)?[0];

    let start = match origin {
        Some(origin) => Some(origin),
        None => dispatch_origin(world, receiver),
    };
    if let Some(start) = start
        && let Some(method) = world.resolve_method(start, message)?
    {
        trace!(
            "send '{} -> method in {}",
            world.symbol_name(message)?,
            world.type_name(receiver)
        );
        fiber.push_frame(world, method, argc)?;
        return Ok(Continue);
    }

    // No scripted method: the interned symbol's builtin handles the
    // message.
    let name = world.symbol_name(message)?.to_string();
    let builtin = world
        .objects()
        .lookup_symbol(&name)
        .and_then(|symbol| world.symbol(symbol).ok())
        .and_then(crate::object::Symbol::builtin);
    match builtin {
        Some(builtin) => {
            trace!("send '{name} -> builtin");
            let args = fiber.drain_top(argc)?;
            fiber.pop()?;
            builtin(world, fiber, &args)?;
            Ok(Continue)
        }
        None => Err(MethodNotFound { message: name }),
    }
}

/// The blueprint chain a receiver's messages resolve against: scripted
/// receivers dispatch on their own master, anything else on the master of
/// the per-world proxy installed for its kind.
fn dispatch_origin(world: &World, receiver: Value) -> Option<Handle> {
    let master_of = |value: Value| {
        let object = world.objects().get(value.handle()?).ok()?;
        object.as_instance()?.master()
    };
    if let Some(master) = master_of(receiver) {
        return Some(master);
    }
    let object = receiver
        .handle()
        .and_then(|handle| world.objects().get(handle).ok());
    let proxy = world.vars().proxy_for(&receiver, object);
    master_of(proxy)
}
