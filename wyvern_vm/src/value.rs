use crate::error::Error::InvalidOperand;
use crate::error::Result;
use std::fmt;
use wyvern_gc::{Handle, Tracer};

/// The uniform tagged value carried on fiber stacks and in object slots.
///
/// A value is either one of the three primitives — nil, a 64-bit integer,
/// a Unicode scalar — or a handle to a heap object. Values are two words
/// and `Copy`; heap object contents live behind the handle in the world's
/// object table.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Value {
    /// The absent value; falsy.
    #[default]
    Nil,
    /// A signed 64-bit integer; zero is falsy.
    Int(i64),
    /// A Unicode scalar value; NUL is falsy.
    Char(char),
    /// A heap object reference; always truthy.
    Ref(Handle),
}

impl Value {
    /// Returns `true` when the value is nil.
    #[must_use]
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Truthiness: nil, integer zero and the NUL character are false;
    /// everything else is true.
    #[must_use]
    pub fn truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Int(0) | Value::Char('\0'))
    }

    /// Extract an integer, coercing a character to its scalar value.
    ///
    /// # Errors
    ///
    /// Returns an error for non-numeric values.
    pub fn as_int(&self) -> Result<i64> {
        match self {
            Value::Int(value) => Ok(*value),
            Value::Char(value) => Ok(i64::from(u32::from(*value))),
            _ => Err(InvalidOperand {
                expected: "int".to_string(),
                actual: self.tag_name().to_string(),
            }),
        }
    }

    /// Extract a character, coercing an integer to a Unicode scalar.
    ///
    /// # Errors
    ///
    /// Returns an error for non-numeric values and for integers outside
    /// the Unicode scalar range.
    pub fn as_char(&self) -> Result<char> {
        match self {
            Value::Char(value) => Ok(*value),
            Value::Int(value) => u32::try_from(*value)
                .ok()
                .and_then(char::from_u32)
                .ok_or_else(|| InvalidOperand {
                    expected: "char".to_string(),
                    actual: format!("int {value}"),
                }),
            _ => Err(InvalidOperand {
                expected: "char".to_string(),
                actual: self.tag_name().to_string(),
            }),
        }
    }

    /// Extract the heap handle.
    ///
    /// # Errors
    ///
    /// Returns an error for primitive values.
    pub fn as_handle(&self) -> Result<Handle> {
        match self {
            Value::Ref(handle) => Ok(*handle),
            _ => Err(InvalidOperand {
                expected: "object reference".to_string(),
                actual: self.tag_name().to_string(),
            }),
        }
    }

    /// The heap handle, when the value is one.
    #[must_use]
    pub fn handle(&self) -> Option<Handle> {
        match self {
            Value::Ref(handle) => Some(*handle),
            _ => None,
        }
    }

    /// The name of the value's tag, without consulting the heap. Heap
    /// references report their object kind through the world instead.
    #[must_use]
    pub fn tag_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Int(..) => "int",
            Value::Char(..) => "char",
            Value::Ref(..) => "ref",
        }
    }

    /// Mark the referenced heap object, if any. Primitives are no-ops.
    pub fn trace(&self, tracer: &mut Tracer<'_>) {
        if let Value::Ref(handle) = self {
            tracer.mark(*handle);
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Int(value) => write!(f, "{value}"),
            Value::Char(value) => write!(f, "'{value}'"),
            Value::Ref(handle) => write!(f, "{handle}"),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<char> for Value {
    fn from(value: char) -> Self {
        Value::Char(value)
    }
}

impl From<Handle> for Value {
    fn from(handle: Handle) -> Self {
        Value::Ref(handle)
    }
}
