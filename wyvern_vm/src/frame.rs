use wyvern_gc::Handle;

/// A per-call activation record.
///
/// A frame is created each time a method or driver function is invoked on
/// a fiber. It records the executing function, the instruction pointer,
/// where the frame's locals start in the fiber's value stack (slot 0 is
/// self, slots 1.. the locals), where its operand section starts, and the
/// armed catch address, if any.
#[derive(Clone, Copy, Debug)]
pub struct Frame {
    function: Handle,
    ip: usize,
    locals_base: usize,
    operand_base: usize,
    catch_address: Option<usize>,
}

impl Frame {
    /// Create a frame at the start of a function.
    #[must_use]
    pub fn new(function: Handle, locals_base: usize, operand_base: usize) -> Self {
        Self {
            function,
            ip: 0,
            locals_base,
            operand_base,
            catch_address: None,
        }
    }

    /// The executing function.
    #[must_use]
    pub fn function(&self) -> Handle {
        self.function
    }

    /// The instruction pointer: a byte offset into the function's
    /// bytecode stream.
    #[must_use]
    pub fn ip(&self) -> usize {
        self.ip
    }

    /// Move the instruction pointer.
    pub fn set_ip(&mut self, ip: usize) {
        self.ip = ip;
    }

    /// Index of the frame's self slot in the fiber's value stack.
    #[must_use]
    pub fn locals_base(&self) -> usize {
        self.locals_base
    }

    /// Index of the first operand slot above the locals.
    #[must_use]
    pub fn operand_base(&self) -> usize {
        self.operand_base
    }

    /// The armed catch address, if any.
    #[must_use]
    pub fn catch_address(&self) -> Option<usize> {
        self.catch_address
    }

    /// Arm the catch address.
    pub fn arm_catch(&mut self, address: usize) {
        self.catch_address = Some(address);
    }

    /// Disarm and return the catch address. Catches are one-shot: landing
    /// an error in a handler consumes it.
    pub fn take_catch(&mut self) -> Option<usize> {
        self.catch_address.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn function_handle() -> Handle {
        #[derive(Debug)]
        struct Dummy;
        impl wyvern_gc::Trace for Dummy {
            fn trace(&self, _tracer: &mut wyvern_gc::Tracer<'_>) {}
        }
        impl wyvern_gc::Finalize for Dummy {}
        let mut heap = wyvern_gc::Heap::new();
        heap.alloc(Dummy).expect("alloc")
    }

    #[test]
    fn test_new_frame_starts_at_zero() {
        let frame = Frame::new(function_handle(), 4, 7);
        assert_eq!(0, frame.ip());
        assert_eq!(4, frame.locals_base());
        assert_eq!(7, frame.operand_base());
        assert_eq!(None, frame.catch_address());
    }

    #[test]
    fn test_catch_is_one_shot() {
        let mut frame = Frame::new(function_handle(), 0, 1);
        frame.arm_catch(12);
        assert_eq!(Some(12), frame.catch_address());
        assert_eq!(Some(12), frame.take_catch());
        assert_eq!(None, frame.catch_address());
    }
}
