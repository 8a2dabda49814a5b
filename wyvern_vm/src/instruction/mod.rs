//! Per-instruction implementations, grouped by family the way the
//! bytecode table groups them. Every function takes exactly the state it
//! touches and returns an [`ExecutionResult`](crate::interpreter::ExecutionResult)
//! telling the dispatch loop how to proceed.

mod branch;
mod literal;
mod local;
mod member;
mod operator;
mod send;
mod types;

pub(crate) use branch::{catch_address, jump, jump_if, jump_if_not};
pub(crate) use literal::{load_array, load_funcref, load_mapping};
pub(crate) use local::{
    load_const, load_local, load_self, pop, push, push_const, push_self, store_local,
};
pub(crate) use member::{load_member, store_member};
pub(crate) use operator::op;
pub(crate) use send::{invoke_funcref, send, super_send};
pub(crate) use types::{typecast, typecheck};

use crate::error::Error::NegativeOperand;
use crate::error::Result;

/// Convert a word operand into an index; word operands are signed on the
/// wire, and a negative index is malformed bytecode.
pub(crate) fn word_index(operand: i16) -> Result<usize> {
    usize::try_from(operand).map_err(|_| NegativeOperand(operand))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_index_rejects_negative_operands() {
        assert_eq!(3, word_index(3).expect("index"));
        assert!(word_index(-1).is_err());
    }
}
