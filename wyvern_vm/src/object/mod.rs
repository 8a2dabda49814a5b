//! The heap-allocated domain objects of a world.
//!
//! Every object a script can touch lives in the world's object table as a
//! [`HeapObject`]. The enum is the per-kind descriptor: one `Trace` and
//! one `Finalize` dispatch cover all kinds, and [`kind_name`] feeds the
//! per-kind statistics.
//!
//! [`kind_name`]: HeapObject::kind_name

mod array;
mod blueprint;
mod connection;
mod funcref;
mod function;
mod instance;
mod mapping;
mod string;
mod symbol;

pub use array::Array;
pub use blueprint::{Blueprint, VarDef};
pub use connection::{Connection, INPUT_RING_CAPACITY, InputRing};
pub use funcref::Funcref;
pub use function::{Function, FunctionBuilder};
pub use instance::{Instance, Page};
pub use mapping::Mapping;
pub use string::StringObject;
pub use symbol::{BuiltinFn, Symbol};

use tracing::trace;
use wyvern_gc::{Finalize, Trace, Tracer};

/// A domain object: the uniform payload of every object-table slot.
#[derive(Clone, Debug)]
pub enum HeapObject {
    String(StringObject),
    Symbol(Symbol),
    Array(Array),
    Mapping(Mapping),
    Function(Function),
    Funcref(Funcref),
    Blueprint(Blueprint),
    Instance(Instance),
    Connection(Connection),
}

impl HeapObject {
    /// The object's kind, for diagnostics and statistics.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            HeapObject::String(..) => "string",
            HeapObject::Symbol(..) => "symbol",
            HeapObject::Array(..) => "array",
            HeapObject::Mapping(..) => "mapping",
            HeapObject::Function(..) => "function",
            HeapObject::Funcref(..) => "funcref",
            HeapObject::Blueprint(..) => "blueprint",
            HeapObject::Instance(..) => "object",
            HeapObject::Connection(..) => "connection",
        }
    }

    /// The string payload, if this is a string.
    #[must_use]
    pub fn as_string(&self) -> Option<&StringObject> {
        match self {
            HeapObject::String(string) => Some(string),
            _ => None,
        }
    }

    /// The symbol payload, if this is a symbol.
    #[must_use]
    pub fn as_symbol(&self) -> Option<&Symbol> {
        match self {
            HeapObject::Symbol(symbol) => Some(symbol),
            _ => None,
        }
    }

    /// The array payload, if this is an array.
    #[must_use]
    pub fn as_array(&self) -> Option<&Array> {
        match self {
            HeapObject::Array(array) => Some(array),
            _ => None,
        }
    }

    /// The mapping payload, if this is a mapping.
    #[must_use]
    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            HeapObject::Mapping(mapping) => Some(mapping),
            _ => None,
        }
    }

    /// The function payload, if this is a function.
    #[must_use]
    pub fn as_function(&self) -> Option<&Function> {
        match self {
            HeapObject::Function(function) => Some(function),
            _ => None,
        }
    }

    /// The funcref payload, if this is a funcref.
    #[must_use]
    pub fn as_funcref(&self) -> Option<&Funcref> {
        match self {
            HeapObject::Funcref(funcref) => Some(funcref),
            _ => None,
        }
    }

    /// The blueprint payload, if this is a blueprint.
    #[must_use]
    pub fn as_blueprint(&self) -> Option<&Blueprint> {
        match self {
            HeapObject::Blueprint(blueprint) => Some(blueprint),
            _ => None,
        }
    }

    /// The instance payload, if this is a scripted object.
    #[must_use]
    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            HeapObject::Instance(instance) => Some(instance),
            _ => None,
        }
    }

    /// The connection payload, if this is a connection.
    #[must_use]
    pub fn as_connection(&self) -> Option<&Connection> {
        match self {
            HeapObject::Connection(connection) => Some(connection),
            _ => None,
        }
    }
}

impl Trace for HeapObject {
    fn trace(&self, tracer: &mut Tracer<'_>) {
        match self {
            // Strings and symbols hold no heap children.
            HeapObject::String(..) | HeapObject::Symbol(..) => {}
            HeapObject::Array(array) => {
                for value in array.values() {
                    value.trace(tracer);
                }
            }
            HeapObject::Mapping(mapping) => {
                for (key, value) in mapping.entries() {
                    key.trace(tracer);
                    value.trace(tracer);
                }
            }
            HeapObject::Function(function) => {
                tracer.mark(function.name());
                tracer.mark_optional(function.blueprint());
                for constant in function.constants() {
                    constant.trace(tracer);
                }
            }
            HeapObject::Funcref(funcref) => {
                funcref.receiver().trace(tracer);
                tracer.mark(funcref.message());
            }
            HeapObject::Blueprint(blueprint) => {
                tracer.mark_optional(blueprint.parent());
                for var in blueprint.vars() {
                    tracer.mark(var.name());
                }
                for method in blueprint.methods() {
                    tracer.mark(*method);
                }
            }
            HeapObject::Instance(instance) => {
                instance.parent().trace(tracer);
                instance.sibling().trace(tracer);
                instance.child().trace(tracer);
                instance.stash().trace(tracer);
                for page in instance.pages() {
                    tracer.mark(page.blueprint());
                    for slot in page.slots() {
                        slot.trace(tracer);
                    }
                }
            }
            HeapObject::Connection(connection) => {
                connection.player().trace(tracer);
            }
        }
    }
}

impl Finalize for HeapObject {
    fn finalize(&self) {
        trace!("destroying {}", self.kind_name());
    }
}
