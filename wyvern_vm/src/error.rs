//! Error handling for the Wyvern VM.
//!
//! Every error produced while a fiber executes bytecode is a crash reason:
//! the interpreter either lands it in a frame with an armed catch address
//! (leaving a symbolic error value in the accumulator) or transitions the
//! fiber to the `Crashed` state. No native panic escapes the interpreter.
//!
//! The central type is [`Error`]; the module also provides a type alias
//! [`Result<T>`](Result) for convenience.

/// Wyvern VM result type
///
/// This is a type alias for the standard library's [`Result`](core::result::Result) type with the
/// error type defaulting to [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Comprehensive error type for the Wyvern VM.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The object table refused an allocation
    #[error("Allocation failure: object table exhausted")]
    AllocationFailure,
    /// An error occurred while decoding bytecode
    #[error(transparent)]
    BytecodeError(#[from] wyvern_bytecode::Error),
    /// The `crash` builtin or a collaborator aborted the fiber
    #[error("Crash: {message}")]
    Crash { message: String },
    /// Division or remainder by zero
    #[error("Division by zero")]
    DivisionByZero,
    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(String),
    /// Invalid constant index
    #[error("Invalid constant index: {0}")]
    InvalidConstantIndex(usize),
    /// Invalid local variable index
    #[error("Invalid local variable index: {0}")]
    InvalidLocalIndex(usize),
    /// Invalid member slot index
    #[error("Invalid member slot index: {0}")]
    InvalidMemberIndex(usize),
    /// Invalid operand for the operation
    #[error("Invalid operand; expected {expected}, found {actual}")]
    InvalidOperand { expected: String, actual: String },
    /// Invalid program counter
    #[error("Invalid program counter: {0}")]
    InvalidProgramCounter(usize),
    /// Invalid type index into a function's types table
    #[error("Invalid type index: {0}")]
    InvalidTypeIndex(usize),
    /// No method or builtin bound to a message
    #[error("Method not found: {message}")]
    MethodNotFound { message: String },
    /// A word operand that must be an index was negative
    #[error("Invalid negative word operand: {0}")]
    NegativeOperand(i16),
    /// A super-send with no parent blueprint to dispatch from
    #[error("No super blueprint to dispatch from")]
    NoSuper,
    /// A blueprint path did not resolve
    #[error("Path not found: {0}")]
    PathNotFound(String),
    /// The fiber's value stack underflowed
    #[error("Value stack underflow")]
    StackUnderflow,
    /// A typecheck or typecast failed
    #[error("Type mismatch; expected {expected}, found {actual}")]
    TypeMismatch { expected: String, actual: String },
}

impl Error {
    /// The symbolic error value left in the accumulator when a catch
    /// handler receives this error.
    #[must_use]
    pub fn symbol_name(&self) -> &'static str {
        match self {
            Error::AllocationFailure => "allocation-failure",
            Error::BytecodeError(..) | Error::InvalidProgramCounter(..) => "bad-bytecode",
            Error::Crash { .. } => "crash",
            Error::DivisionByZero => "division-by-zero",
            Error::InternalError(..) => "internal-error",
            Error::InvalidConstantIndex(..)
            | Error::InvalidLocalIndex(..)
            | Error::InvalidMemberIndex(..)
            | Error::InvalidTypeIndex(..)
            | Error::StackUnderflow => "bad-frame",
            Error::NegativeOperand(..) => "bad-bytecode",
            Error::InvalidOperand { .. } | Error::TypeMismatch { .. } => "type-error",
            Error::MethodNotFound { .. } => "method-not-found",
            Error::NoSuper => "no-super",
            Error::PathNotFound(..) => "path-not-found",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_division_by_zero_mentions_zero() {
        let error = Error::DivisionByZero;
        assert!(error.to_string().contains("zero"));
        assert_eq!("division-by-zero", error.symbol_name());
    }

    #[test]
    fn test_invalid_operand_message() {
        let error = Error::InvalidOperand {
            expected: "int".to_string(),
            actual: "string".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid operand; expected int, found string"
        );
        assert_eq!("type-error", error.symbol_name());
    }

    #[test]
    fn test_bytecode_error_converts() {
        let error = Error::from(wyvern_bytecode::Error::InvalidInstruction(200));
        assert_eq!("bad-bytecode", error.symbol_name());
    }
}
