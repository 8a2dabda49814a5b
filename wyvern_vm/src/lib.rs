//! # Wyvern VM
//!
//! The runtime core of the Wyvern world server: a bytecode virtual
//! machine for LPC-style scripted objects, executed by cooperatively
//! scheduled fibers over a garbage-collected object table.
//!
//! Players connect over plain TCP; scripted objects (instances of
//! compiled blueprints loaded through the virtual filesystem) exchange
//! messages, and a single-threaded scheduler multiplexes their fibers
//! against server I/O. The compiler front-end, the on-disk filesystem and
//! the account database live behind collaborator interfaces; this crate
//! owns everything that executes.
//!
//! ## Examples
//!
//! ```rust
//! use wyvern_bytecode::{Instruction, Operator};
//! use wyvern_vm::{Fiber, FunctionBuilder, Value, World, interpreter};
//!
//! # fn main() -> wyvern_vm::Result<()> {
//! let mut world = World::new();
//! let name = world.intern("add")?;
//! let mut builder = FunctionBuilder::new(name);
//! let three = builder.constant(Value::Int(3));
//! let four = builder.constant(Value::Int(4));
//! let function = builder
//!     .instructions(&[
//!         Instruction::LoadConst(three),
//!         Instruction::Push,
//!         Instruction::LoadConst(four),
//!         Instruction::Op(Operator::Add.code()),
//!         Instruction::Return,
//!     ])?
//!     .build();
//! let function = world.alloc_function(function)?;
//!
//! let mut fiber = Fiber::new();
//! fiber.push(Value::Nil);
//! fiber.push_frame(&mut world, function, 0)?;
//! interpreter::run(&mut world, &mut fiber, 1000);
//! assert_eq!(Value::Int(7), fiber.accumulator());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_in_result)]

pub mod assignable;
pub mod builtins;
mod configuration;
mod error;
mod fiber;
mod filesystem;
mod frame;
mod instruction;
pub mod interpreter;
mod object;
mod object_table;
mod scheduler;
mod server;
mod value;
mod world;

pub use configuration::{Configuration, ConfigurationBuilder};
pub use error::{Error, Result};
pub use fiber::{CrashRecord, Fiber, FiberId, FiberState};
pub use filesystem::{Filesystem, MemoryFilesystem};
pub use frame::Frame;
pub use object::{
    Array, Blueprint, BuiltinFn, Connection, Funcref, Function, FunctionBuilder, HeapObject,
    INPUT_RING_CAPACITY, InputRing, Instance, Mapping, Page, StringObject, Symbol, VarDef,
};
pub use object_table::ObjectTable;
pub use scheduler::Scheduler;
pub use server::{LoopbackServer, Server, ServerEvent, TcpServer};
pub use value::Value;
pub use world::{World, WorldVars};
pub use wyvern_bytecode::{FunctionFlags, Instruction, Operator, TypeTag};
pub use wyvern_gc::Handle;
