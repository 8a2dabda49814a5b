use crate::error::Error::InvalidOperator;
use crate::error::Result;
use std::fmt;

/// The operator executed by an `Op` instruction, identified by its word
/// operand.
///
/// Like the opcode table, operator codes are a stable enumeration shared
/// with the compiler.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Operator {
    /// Addition; also concatenates strings and arrays.
    Add,
    /// Integer subtraction; also character arithmetic.
    Sub,
    /// Integer multiplication; also string repetition.
    Mul,
    /// Integer division; division by zero crashes the fiber.
    Div,
    /// Integer remainder; remainder by zero crashes the fiber.
    Rem,
    /// Value equality.
    Eq,
    /// Value inequality.
    Ne,
    /// Less than.
    Lt,
    /// Less than or equal.
    Le,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Ge,
    /// Arithmetic negation.
    Neg,
    /// Logical negation of truthiness.
    Not,
    /// Size of a string, array or mapping.
    Sizeof,
    /// Container indexing.
    Index,
    /// Container index assignment.
    IndexAssign,
    /// Instantiate a blueprint, resolved by path when given a string.
    New,
}

impl Operator {
    /// The word operand encoding this operator.
    #[must_use]
    pub fn code(&self) -> i16 {
        match self {
            Operator::Add => 0,
            Operator::Sub => 1,
            Operator::Mul => 2,
            Operator::Div => 3,
            Operator::Rem => 4,
            Operator::Eq => 5,
            Operator::Ne => 6,
            Operator::Lt => 7,
            Operator::Le => 8,
            Operator::Gt => 9,
            Operator::Ge => 10,
            Operator::Neg => 11,
            Operator::Not => 12,
            Operator::Sizeof => 13,
            Operator::Index => 14,
            Operator::IndexAssign => 15,
            Operator::New => 16,
        }
    }

    /// Decode an operator from its word operand.
    ///
    /// # Errors
    ///
    /// Returns an error if the code is outside the stable enumeration.
    pub fn from_code(code: i16) -> Result<Operator> {
        let operator = match code {
            0 => Operator::Add,
            1 => Operator::Sub,
            2 => Operator::Mul,
            3 => Operator::Div,
            4 => Operator::Rem,
            5 => Operator::Eq,
            6 => Operator::Ne,
            7 => Operator::Lt,
            8 => Operator::Le,
            9 => Operator::Gt,
            10 => Operator::Ge,
            11 => Operator::Neg,
            12 => Operator::Not,
            13 => Operator::Sizeof,
            14 => Operator::Index,
            15 => Operator::IndexAssign,
            16 => Operator::New,
            _ => return Err(InvalidOperator(code)),
        };
        Ok(operator)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::Add => write!(f, "+"),
            Operator::Sub => write!(f, "-"),
            Operator::Mul => write!(f, "*"),
            Operator::Div => write!(f, "/"),
            Operator::Rem => write!(f, "%"),
            Operator::Eq => write!(f, "=="),
            Operator::Ne => write!(f, "!="),
            Operator::Lt => write!(f, "<"),
            Operator::Le => write!(f, "<="),
            Operator::Gt => write!(f, ">"),
            Operator::Ge => write!(f, ">="),
            Operator::Neg => write!(f, "neg"),
            Operator::Not => write!(f, "not"),
            Operator::Sizeof => write!(f, "sizeof"),
            Operator::Index => write!(f, "index"),
            Operator::IndexAssign => write!(f, "index_assign"),
            Operator::New => write!(f, "new"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPERATORS: [Operator; 17] = [
        Operator::Add,
        Operator::Sub,
        Operator::Mul,
        Operator::Div,
        Operator::Rem,
        Operator::Eq,
        Operator::Ne,
        Operator::Lt,
        Operator::Le,
        Operator::Gt,
        Operator::Ge,
        Operator::Neg,
        Operator::Not,
        Operator::Sizeof,
        Operator::Index,
        Operator::IndexAssign,
        Operator::New,
    ];

    #[test]
    fn test_code_round_trip() -> Result<()> {
        for operator in OPERATORS {
            assert_eq!(operator, Operator::from_code(operator.code())?);
        }
        Ok(())
    }

    #[test]
    fn test_codes_are_stable() {
        for (expected, operator) in OPERATORS.iter().enumerate() {
            let expected = i16::try_from(expected).expect("code");
            assert_eq!(expected, operator.code());
        }
    }

    #[test]
    fn test_invalid_code() {
        assert_eq!(Err(InvalidOperator(17)), Operator::from_code(17));
        assert_eq!(Err(InvalidOperator(-1)), Operator::from_code(-1));
    }

    #[test]
    fn test_display() {
        assert_eq!("+", Operator::Add.to_string());
        assert_eq!("index_assign", Operator::IndexAssign.to_string());
    }
}
