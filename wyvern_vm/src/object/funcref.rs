use crate::value::Value;
use wyvern_gc::Handle;

/// A bound pair of receiver and message symbol, callable like a function.
///
/// Invoking a funcref performs an ordinary message send: the receiver goes
/// through proxy rewriting and method resolution exactly as if the send
/// had been compiled in. Fibers use funcrefs as one-shot input handlers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Funcref {
    receiver: Value,
    message: Handle,
}

impl Funcref {
    /// Bind a receiver to a message symbol.
    #[must_use]
    pub fn new(receiver: Value, message: Handle) -> Self {
        Self { receiver, message }
    }

    /// The bound receiver.
    #[must_use]
    pub fn receiver(&self) -> Value {
        self.receiver
    }

    /// The bound message symbol.
    #[must_use]
    pub fn message(&self) -> Handle {
        self.message
    }
}
