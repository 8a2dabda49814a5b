//! Runtime type checks and casts for the `Typecheck` and `Typecast`
//! instructions.
//!
//! The lattice is flat with `Any` at the top. Integers and characters
//! satisfy each other because payload extraction coerces between them;
//! every other tag matches exactly one value kind.

use crate::error::Error::TypeMismatch;
use crate::error::Result;
use crate::object::HeapObject;
use crate::value::Value;
use crate::world::World;
use wyvern_bytecode::TypeTag;

/// Whether `value` satisfies `tag`.
#[must_use]
pub fn satisfies(world: &World, value: Value, tag: TypeTag) -> bool {
    match tag {
        TypeTag::Any => true,
        TypeTag::Nil => value.is_nil(),
        TypeTag::Int | TypeTag::Char => matches!(value, Value::Int(..) | Value::Char(..)),
        TypeTag::String
        | TypeTag::Symbol
        | TypeTag::Array
        | TypeTag::Mapping
        | TypeTag::Function
        | TypeTag::Funcref
        | TypeTag::Object => {
            let Some(handle) = value.handle() else {
                return false;
            };
            let Ok(object) = world.objects().get(handle) else {
                return false;
            };
            matches!(
                (tag, object),
                (TypeTag::String, HeapObject::String(..))
                    | (TypeTag::Symbol, HeapObject::Symbol(..))
                    | (TypeTag::Array, HeapObject::Array(..))
                    | (TypeTag::Mapping, HeapObject::Mapping(..))
                    | (TypeTag::Function, HeapObject::Function(..))
                    | (TypeTag::Funcref, HeapObject::Funcref(..))
                    | (TypeTag::Object, HeapObject::Instance(..))
            )
        }
    }
}

/// Convert `value` to `tag`, coercing between integers and characters.
///
/// # Errors
///
/// Returns a type mismatch when the value does not satisfy the tag.
pub fn cast(world: &World, value: Value, tag: TypeTag) -> Result<Value> {
    match tag {
        TypeTag::Int => {
            if let Ok(int) = value.as_int() {
                return Ok(Value::Int(int));
            }
        }
        TypeTag::Char => {
            if let Ok(char) = value.as_char() {
                return Ok(Value::Char(char));
            }
        }
        _ => {
            if satisfies(world, value, tag) {
                return Ok(value);
            }
        }
    }
    Err(TypeMismatch {
        expected: tag.to_string(),
        actual: world.type_name(value).to_string(),
    })
}
