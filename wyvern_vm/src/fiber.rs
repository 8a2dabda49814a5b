use crate::error::Error::{InternalError, InvalidLocalIndex, StackUnderflow};
use crate::error::Result;
use crate::frame::Frame;
use crate::value::Value;
use crate::world::World;
use std::fmt;
use wyvern_gc::Handle;

/// Identifier of a fiber within its scheduler's fiber table.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct FiberId(pub(crate) usize);

impl fmt::Display for FiberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fiber-{}", self.0)
    }
}

/// Execution state of a fiber.
///
/// Transitions: Running → Paused (`pause`), Running → WaitingForInput
/// (`wait_for_input`), WaitingForInput → Running (input delivery), any →
/// Crashed (irreversible), any → Stopped (frame chain empty or explicit
/// stop).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FiberState {
    Running,
    Paused,
    WaitingForInput,
    Stopped,
    Crashed,
}

/// Post-mortem record of a crashed fiber.
#[derive(Clone, Debug)]
pub struct CrashRecord {
    /// Human-readable crash reason.
    pub message: String,
    /// Name of the function that was executing.
    pub function: String,
    /// Instruction pointer at the time of the crash.
    pub ip: usize,
}

impl fmt::Display for CrashRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in {} at ip {}", self.message, self.function, self.ip)
    }
}

/// A cooperatively scheduled execution context.
///
/// A fiber owns its contiguous value stack and frame chain, an
/// accumulator, and its per-fiber variables: the bound connection, the
/// one-shot `input_to` funcref consumed by the next input line, and
/// `this_player`. Fibers never run concurrently; the scheduler advances
/// one fiber at a time by bounded slices.
#[derive(Debug)]
pub struct Fiber {
    stack: Vec<Value>,
    frames: Vec<Frame>,
    accumulator: Value,
    state: FiberState,
    connection: Option<Handle>,
    input_to: Option<Value>,
    this_player: Value,
    crash: Option<CrashRecord>,
}

impl Fiber {
    /// Create an empty running fiber; callers push the entry frame.
    #[must_use]
    pub fn new() -> Self {
        Self {
            stack: Vec::new(),
            frames: Vec::new(),
            accumulator: Value::Nil,
            state: FiberState::Running,
            connection: None,
            input_to: None,
            this_player: Value::Nil,
            crash: None,
        }
    }

    /// The fiber's state.
    #[must_use]
    pub fn state(&self) -> FiberState {
        self.state
    }

    /// The accumulator.
    #[must_use]
    pub fn accumulator(&self) -> Value {
        self.accumulator
    }

    /// Replace the accumulator.
    pub fn set_accumulator(&mut self, value: Value) {
        self.accumulator = value;
    }

    /// The bound connection, if any.
    #[must_use]
    pub fn connection(&self) -> Option<Handle> {
        self.connection
    }

    /// Bind a connection.
    pub fn bind_connection(&mut self, connection: Handle) {
        self.connection = Some(connection);
    }

    /// The fiber's player object.
    #[must_use]
    pub fn this_player(&self) -> Value {
        self.this_player
    }

    /// Replace the fiber's player object.
    pub fn set_this_player(&mut self, player: Value) {
        self.this_player = player;
    }

    /// The one-shot input handler, if armed.
    #[must_use]
    pub fn input_to(&self) -> Option<Value> {
        self.input_to
    }

    /// Arm the one-shot input handler.
    pub fn set_input_to(&mut self, funcref: Value) {
        self.input_to = Some(funcref);
    }

    /// Disarm and return the input handler.
    pub fn take_input_to(&mut self) -> Option<Value> {
        self.input_to.take()
    }

    /// The post-mortem record, for crashed fibers.
    #[must_use]
    pub fn crash_record(&self) -> Option<&CrashRecord> {
        self.crash.as_ref()
    }

    // ------------------------------------------------------------------
    // Value stack
    // ------------------------------------------------------------------

    /// Push a value onto the stack.
    pub fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    /// Pop the top of the stack.
    ///
    /// # Errors
    ///
    /// Returns an error when the stack is empty.
    pub fn pop(&mut self) -> Result<Value> {
        self.stack.pop().ok_or(StackUnderflow)
    }

    /// The current stack height.
    #[must_use]
    pub fn sp(&self) -> usize {
        self.stack.len()
    }

    /// The top `count` stack slots, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error when fewer than `count` slots are on the stack.
    pub fn top_slice(&self, count: usize) -> Result<&[Value]> {
        let length = self.stack.len();
        if count > length {
            return Err(StackUnderflow);
        }
        Ok(&self.stack[length - count..])
    }

    /// Remove the top `count` stack slots, returning them oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error when fewer than `count` slots are on the stack.
    pub fn drain_top(&mut self, count: usize) -> Result<Vec<Value>> {
        let length = self.stack.len();
        if count > length {
            return Err(StackUnderflow);
        }
        Ok(self.stack.split_off(length - count))
    }

    // ------------------------------------------------------------------
    // Frames
    // ------------------------------------------------------------------

    /// The frame chain depth.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// The executing frame.
    ///
    /// # Errors
    ///
    /// Returns an error when the frame chain is empty.
    pub fn current_frame(&self) -> Result<&Frame> {
        self.frames
            .last()
            .ok_or_else(|| InternalError("no executing frame".to_string()))
    }

    /// Mutable access to the executing frame.
    ///
    /// # Errors
    ///
    /// Returns an error when the frame chain is empty.
    pub fn current_frame_mut(&mut self) -> Result<&mut Frame> {
        self.frames
            .last_mut()
            .ok_or_else(|| InternalError("no executing frame".to_string()))
    }

    /// The executing frame's self value.
    ///
    /// # Errors
    ///
    /// Returns an error when the frame chain is empty.
    pub fn self_value(&self) -> Result<Value> {
        let base = self.current_frame()?.locals_base();
        self.stack
            .get(base)
            .copied()
            .ok_or_else(|| InternalError("missing self slot".to_string()))
    }

    /// Read frame slot `index` (0 is self, 1.. the locals).
    ///
    /// # Errors
    ///
    /// Returns an error when the slot is outside the frame.
    pub fn local(&self, index: usize) -> Result<Value> {
        let frame = self.current_frame()?;
        let slot = frame.locals_base() + index;
        if slot >= frame.operand_base() {
            return Err(InvalidLocalIndex(index));
        }
        self.stack
            .get(slot)
            .copied()
            .ok_or(InvalidLocalIndex(index))
    }

    /// Write frame slot `index`.
    ///
    /// # Errors
    ///
    /// Returns an error when the slot is outside the frame.
    pub fn set_local(&mut self, index: usize, value: Value) -> Result<()> {
        let frame = self.current_frame()?;
        let slot = frame.locals_base() + index;
        if slot >= frame.operand_base() {
            return Err(InvalidLocalIndex(index));
        }
        match self.stack.get_mut(slot) {
            Some(entry) => {
                *entry = value;
                Ok(())
            }
            None => Err(InvalidLocalIndex(index)),
        }
    }

    /// Push an activation of `function` whose self and arguments are the
    /// top `argc + 1` stack slots (self below the arguments).
    ///
    /// The frame reserves `locals + 1` slots: slot 0 is self, the first
    /// `argc` locals are the arguments, the rest start nil. A varargs
    /// function gathers arguments beyond `locals - 1` into a fresh array
    /// in its last local slot; a fixed function silently drops excess
    /// arguments.
    ///
    /// # Errors
    ///
    /// Returns an error when the stack is too shallow or allocation of
    /// the varargs array fails.
    pub fn push_frame(&mut self, world: &mut World, function: Handle, argc: usize) -> Result<()> {
        let (locals, varargs) = {
            let function = world.function(function)?;
            (function.locals(), function.is_varargs())
        };
        if self.stack.len() < argc + 1 {
            return Err(StackUnderflow);
        }
        let base = self.stack.len() - argc - 1;

        if varargs && locals > 0 {
            let fixed = locals - 1;
            let rest = if argc > fixed {
                self.stack.split_off(base + 1 + fixed)
            } else {
                Vec::new()
            };
            let rest = world.alloc_array(rest)?;
            self.stack.resize(base + locals, Value::Nil);
            self.stack.push(rest);
        } else if argc > locals {
            self.stack.truncate(base + 1 + locals);
        } else {
            self.stack.resize(base + 1 + locals, Value::Nil);
        }

        let operand_base = base + 1 + locals;
        self.frames.push(Frame::new(function, base, operand_base));
        Ok(())
    }

    /// Pop the executing frame, restoring the caller's stack. Popping the
    /// last frame stops the fiber.
    ///
    /// # Errors
    ///
    /// Returns an error when the frame chain is empty.
    pub fn pop_frame(&mut self) -> Result<()> {
        let frame = self
            .frames
            .pop()
            .ok_or_else(|| InternalError("no frame to pop".to_string()))?;
        self.stack.truncate(frame.locals_base());
        if self.frames.is_empty() && self.state == FiberState::Running {
            self.state = FiberState::Stopped;
        }
        Ok(())
    }

    /// Pop frames above `depth` and reset the stack to the surviving
    /// frame's operand base. Used by catch unwinding.
    pub(crate) fn unwind_to(&mut self, depth: usize) {
        self.frames.truncate(depth);
        if let Some(frame) = self.frames.last() {
            self.stack.truncate(frame.operand_base());
        } else {
            self.stack.clear();
        }
    }

    pub(crate) fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub(crate) fn frames_mut(&mut self) -> &mut [Frame] {
        &mut self.frames
    }

    // ------------------------------------------------------------------
    // State transitions
    // ------------------------------------------------------------------

    /// Running → Paused.
    pub fn pause(&mut self) {
        if self.state == FiberState::Running {
            self.state = FiberState::Paused;
        }
    }

    /// Paused → Running.
    pub fn resume(&mut self) {
        if self.state == FiberState::Paused {
            self.state = FiberState::Running;
        }
    }

    /// Running → WaitingForInput.
    pub fn wait_for_input(&mut self) {
        if self.state == FiberState::Running {
            self.state = FiberState::WaitingForInput;
        }
    }

    /// WaitingForInput → Running, with the delivered value in the
    /// accumulator.
    pub fn reactivate_with_value(&mut self, value: Value) {
        if self.state == FiberState::WaitingForInput {
            self.accumulator = value;
            self.state = FiberState::Running;
        }
    }

    /// Any → Stopped.
    pub fn stop(&mut self) {
        if self.state != FiberState::Crashed {
            self.state = FiberState::Stopped;
        }
    }

    /// Any → Crashed, irreversibly, recording the post-mortem.
    pub fn crash(&mut self, record: CrashRecord) {
        self.state = FiberState::Crashed;
        self.crash = Some(record);
    }

    /// Append every handle this fiber keeps alive: stack slots, the
    /// accumulator, executing functions, and the fiber variables.
    pub fn roots(&self, roots: &mut Vec<Handle>) {
        for value in &self.stack {
            if let Some(handle) = value.handle() {
                roots.push(handle);
            }
        }
        if let Some(handle) = self.accumulator.handle() {
            roots.push(handle);
        }
        for frame in &self.frames {
            roots.push(frame.function());
        }
        if let Some(connection) = self.connection {
            roots.push(connection);
        }
        if let Some(handle) = self.input_to.and_then(|value| value.handle()) {
            roots.push(handle);
        }
        if let Some(handle) = self.this_player.handle() {
            roots.push(handle);
        }
    }
}

impl Default for Fiber {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::FunctionBuilder;

    fn world_with_function(locals: usize) -> (World, Handle) {
        let mut world = World::new();
        let name = world.intern("test").expect("intern");
        let function = FunctionBuilder::new(name).locals(locals).build();
        let function = world.alloc_function(function).expect("alloc");
        (world, function)
    }

    #[test]
    fn test_push_frame_reserves_self_and_locals() -> Result<()> {
        let (mut world, function) = world_with_function(3);
        let mut fiber = Fiber::new();
        fiber.push(Value::Int(9)); // self
        fiber.push(Value::Int(1)); // argument 0
        fiber.push_frame(&mut world, function, 1)?;

        assert_eq!(1, fiber.depth());
        assert_eq!(Value::Int(9), fiber.self_value()?);
        assert_eq!(Value::Int(9), fiber.local(0)?);
        assert_eq!(Value::Int(1), fiber.local(1)?);
        assert_eq!(Value::Nil, fiber.local(2)?);
        assert_eq!(Value::Nil, fiber.local(3)?);
        assert!(fiber.local(4).is_err());
        assert_eq!(4, fiber.sp());
        Ok(())
    }

    #[test]
    fn test_pop_frame_restores_caller_stack() -> Result<()> {
        let (mut world, function) = world_with_function(1);
        let mut fiber = Fiber::new();
        fiber.push(Value::Int(7)); // caller operand
        fiber.push(Value::Nil); // self
        fiber.push_frame(&mut world, function, 0)?;
        fiber.pop_frame()?;

        assert_eq!(1, fiber.sp());
        assert_eq!(Value::Int(7), fiber.pop()?);
        assert_eq!(FiberState::Stopped, fiber.state());
        Ok(())
    }

    #[test]
    fn test_state_transitions() {
        let mut fiber = Fiber::new();
        assert_eq!(FiberState::Running, fiber.state());
        fiber.wait_for_input();
        assert_eq!(FiberState::WaitingForInput, fiber.state());
        fiber.reactivate_with_value(Value::Int(1));
        assert_eq!(FiberState::Running, fiber.state());
        assert_eq!(Value::Int(1), fiber.accumulator());
        fiber.crash(CrashRecord {
            message: "boom".to_string(),
            function: "test".to_string(),
            ip: 0,
        });
        assert_eq!(FiberState::Crashed, fiber.state());
        // Crashed is irreversible.
        fiber.stop();
        assert_eq!(FiberState::Crashed, fiber.state());
    }

    #[test]
    fn test_paused_fiber_keeps_its_frames() -> Result<()> {
        let (mut world, function) = world_with_function(0);
        let mut fiber = Fiber::new();
        fiber.push(Value::Nil);
        fiber.push_frame(&mut world, function, 0)?;
        fiber.pause();
        assert_eq!(FiberState::Paused, fiber.state());
        assert_eq!(0, fiber.current_frame()?.ip());
        Ok(())
    }
}
