use crate::error::Error::InvalidTypeTag;
use crate::error::Result;
use std::fmt;

/// A runtime type in the lattice consulted by `Typecheck` and `Typecast`.
///
/// Functions carry a side table of referenced type tags; the instruction's
/// word operand indexes that table. `Any` is the top of the lattice and
/// matches every value.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TypeTag {
    Any,
    Nil,
    Int,
    Char,
    String,
    Symbol,
    Array,
    Mapping,
    Function,
    Funcref,
    Object,
}

impl TypeTag {
    /// The stable code for this tag.
    #[must_use]
    pub fn code(&self) -> u8 {
        match self {
            TypeTag::Any => 0,
            TypeTag::Nil => 1,
            TypeTag::Int => 2,
            TypeTag::Char => 3,
            TypeTag::String => 4,
            TypeTag::Symbol => 5,
            TypeTag::Array => 6,
            TypeTag::Mapping => 7,
            TypeTag::Function => 8,
            TypeTag::Funcref => 9,
            TypeTag::Object => 10,
        }
    }

    /// Decode a tag from its stable code.
    ///
    /// # Errors
    ///
    /// Returns an error if the code is outside the lattice.
    pub fn from_code(code: u8) -> Result<TypeTag> {
        let tag = match code {
            0 => TypeTag::Any,
            1 => TypeTag::Nil,
            2 => TypeTag::Int,
            3 => TypeTag::Char,
            4 => TypeTag::String,
            5 => TypeTag::Symbol,
            6 => TypeTag::Array,
            7 => TypeTag::Mapping,
            8 => TypeTag::Function,
            9 => TypeTag::Funcref,
            10 => TypeTag::Object,
            _ => return Err(InvalidTypeTag(code)),
        };
        Ok(tag)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeTag::Any => write!(f, "any"),
            TypeTag::Nil => write!(f, "nil"),
            TypeTag::Int => write!(f, "int"),
            TypeTag::Char => write!(f, "char"),
            TypeTag::String => write!(f, "string"),
            TypeTag::Symbol => write!(f, "symbol"),
            TypeTag::Array => write!(f, "array"),
            TypeTag::Mapping => write!(f, "mapping"),
            TypeTag::Function => write!(f, "function"),
            TypeTag::Funcref => write!(f, "funcref"),
            TypeTag::Object => write!(f, "object"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_round_trip() -> Result<()> {
        for code in 0..=10 {
            let tag = TypeTag::from_code(code)?;
            assert_eq!(code, tag.code());
        }
        Ok(())
    }

    #[test]
    fn test_invalid_code() {
        assert_eq!(Err(InvalidTypeTag(11)), TypeTag::from_code(11));
    }

    #[test]
    fn test_display() {
        assert_eq!("any", TypeTag::Any.to_string());
        assert_eq!("mapping", TypeTag::Mapping.to_string());
    }
}
