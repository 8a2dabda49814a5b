//! # Wyvern Bytecode
//!
//! A library for reading, writing and inspecting the bytecode executed by
//! the Wyvern virtual machine. Compiled functions are flat byte streams of
//! single-byte opcodes with little-endian word operands; this crate owns
//! the stable opcode enumeration, the operator codes executed by the `Op`
//! instruction, the runtime type tags referenced by `Typecheck` and
//! `Typecast`, and the function flags attached by the compiler.
//!
//! ## Examples
//!
//! ```rust
//! use wyvern_bytecode::{Instruction, Operator, assemble, disassemble};
//!
//! # fn main() -> wyvern_bytecode::Result<()> {
//! let code = assemble(&[
//!     Instruction::LoadConst(0),
//!     Instruction::Push,
//!     Instruction::LoadConst(1),
//!     Instruction::Op(Operator::Add.code()),
//!     Instruction::Return,
//! ])?;
//! assert_eq!(disassemble(&code)?.len(), 5);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_in_result)]

mod error;
mod flags;
mod instruction;
mod operator;
mod type_tag;

pub use error::{Error, Result};
pub use flags::FunctionFlags;
pub use instruction::{Instruction, assemble, disassemble};
pub use operator::Operator;
pub use type_tag::TypeTag;
