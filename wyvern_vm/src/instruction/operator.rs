use crate::error::Error::{DivisionByZero, InvalidOperand};
use crate::error::Result;
use crate::fiber::Fiber;
use crate::interpreter::ExecutionResult;
use crate::interpreter::ExecutionResult::Continue;
use crate::object::HeapObject;
use crate::value::Value;
use crate::world::World;
use wyvern_bytecode::Operator;

/// `op`: execute the operator named by the word operand. Binary operators
/// consume the popped stack top as their left operand and the accumulator
/// as their right; unary operators consume the accumulator. The result
/// lands in the accumulator.
pub(crate) fn op(world: &mut World, fiber: &mut Fiber, operand: i16) -> Result<ExecutionResult> {
    let operator = Operator::from_code(operand)?;
    let result = match operator {
        Operator::Add => {
            let left = fiber.pop()?;
            add(world, left, fiber.accumulator())?
        }
        Operator::Sub => {
            let left = fiber.pop()?;
            Value::Int(left.as_int()?.wrapping_sub(fiber.accumulator().as_int()?))
        }
        Operator::Mul => {
            let left = fiber.pop()?;
            mul(world, left, fiber.accumulator())?
        }
        Operator::Div => {
            let left = fiber.pop()?;
            let divisor = fiber.accumulator().as_int()?;
            if divisor == 0 {
                return Err(DivisionByZero);
            }
            Value::Int(left.as_int()?.wrapping_div(divisor))
        }
        Operator::Rem => {
            let left = fiber.pop()?;
            let divisor = fiber.accumulator().as_int()?;
            if divisor == 0 {
                return Err(DivisionByZero);
            }
            Value::Int(left.as_int()?.wrapping_rem(divisor))
        }
        Operator::Eq => {
            let left = fiber.pop()?;
            bool_value(world.value_eq(left, fiber.accumulator()))
        }
        Operator::Ne => {
            let left = fiber.pop()?;
            bool_value(!world.value_eq(left, fiber.accumulator()))
        }
        Operator::Lt => compare(world, fiber, |ordering| ordering.is_lt())?,
        Operator::Le => compare(world, fiber, |ordering| ordering.is_le())?,
        Operator::Gt => compare(world, fiber, |ordering| ordering.is_gt())?,
        Operator::Ge => compare(world, fiber, |ordering| ordering.is_ge())?,
        Operator::Neg => Value::Int(fiber.accumulator().as_int()?.wrapping_neg()),
        Operator::Not => bool_value(!fiber.accumulator().truthy()),
        Operator::Sizeof => sizeof(world, fiber.accumulator())?,
        Operator::Index => {
            let container = fiber.pop()?;
            index(world, container, fiber.accumulator())?
        }
        Operator::IndexAssign => {
            let key = fiber.pop()?;
            let container = fiber.pop()?;
            index_assign(world, container, key, fiber.accumulator())?
        }
        Operator::New => new(world, fiber.accumulator())?,
    };
    fiber.set_accumulator(result);
    Ok(Continue)
}

fn bool_value(condition: bool) -> Value {
    Value::Int(i64::from(condition))
}

fn operand_error(world: &World, expected: &str, value: Value) -> crate::error::Error {
    InvalidOperand {
        expected: expected.to_string(),
        actual: world.type_name(value).to_string(),
    }
}

/// `+`: numeric addition with character coercion, string and array
/// concatenation; nil passes a string operand through.
fn add(world: &mut World, left: Value, right: Value) -> Result<Value> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => return Ok(Value::Int(a.wrapping_add(b))),
        (Value::Char(..) | Value::Int(..), Value::Char(..) | Value::Int(..)) => {
            let sum = left.as_int()?.wrapping_add(right.as_int()?);
            return Ok(Value::Char(Value::Int(sum).as_char()?));
        }
        _ => {}
    }

    let left_kind = heap_kind(world, left);
    let right_kind = heap_kind(world, right);
    match (left_kind, right_kind) {
        (Some(HeapObject::String(a)), Some(HeapObject::String(b))) => {
            let joined = a.concat(b);
            world.alloc_string(joined.bytes().to_vec())
        }
        (Some(HeapObject::String(..)), None) if right.is_nil() => Ok(left),
        (None, Some(HeapObject::String(..))) if left.is_nil() => Ok(right),
        (Some(HeapObject::Array(a)), Some(HeapObject::Array(b))) => {
            let joined = a.join(b);
            world.alloc_array(joined.values().to_vec())
        }
        _ => Err(operand_error(world, "addable operands", left)),
    }
}

/// `*`: integer multiplication, or string repetition with an integer.
fn mul(world: &mut World, left: Value, right: Value) -> Result<Value> {
    if let (Ok(a), Ok(b)) = (left.as_int(), right.as_int()) {
        return Ok(Value::Int(a.wrapping_mul(b)));
    }
    let (string, count) = match (heap_kind(world, left), heap_kind(world, right)) {
        (Some(HeapObject::String(string)), None) => (string, right.as_int()?),
        (None, Some(HeapObject::String(string))) => (string, left.as_int()?),
        _ => return Err(operand_error(world, "multipliable operands", left)),
    };
    let repeated = string.repeat(count);
    world.alloc_string(repeated.bytes().to_vec())
}

/// Ordering comparisons: numeric for integers and characters, bytewise
/// for strings, false for everything else.
fn compare(
    world: &World,
    fiber: &mut Fiber,
    accept: fn(std::cmp::Ordering) -> bool,
) -> Result<Value> {
    let left = fiber.pop()?;
    let right = fiber.accumulator();
    let ordering = match (left, right) {
        (Value::Int(..) | Value::Char(..), Value::Int(..) | Value::Char(..)) => {
            Some(left.as_int()?.cmp(&right.as_int()?))
        }
        (Value::Ref(a), Value::Ref(b)) => {
            match (world.objects().get(a), world.objects().get(b)) {
                (Ok(HeapObject::String(a)), Ok(HeapObject::String(b))) => {
                    Some(a.bytes().cmp(b.bytes()))
                }
                _ => None,
            }
        }
        _ => None,
    };
    Ok(bool_value(ordering.is_some_and(accept)))
}

/// `sizeof`: string byte length, array length, or live mapping entry
/// count.
fn sizeof(world: &World, value: Value) -> Result<Value> {
    let size = match heap_kind(world, value) {
        Some(HeapObject::String(string)) => string.len(),
        Some(HeapObject::Array(array)) => array.len(),
        Some(HeapObject::Mapping(mapping)) => mapping.size(),
        _ => return Err(operand_error(world, "string, array or mapping", value)),
    };
    Ok(Value::Int(i64::try_from(size).unwrap_or(i64::MAX)))
}

/// `index`: string byte, array element, mapping value, named instance
/// slot, or integer bit test.
fn index(world: &mut World, container: Value, key: Value) -> Result<Value> {
    if let Value::Int(bits) = container {
        let bit = key.as_int()?;
        if !(0..64).contains(&bit) {
            return Ok(Value::Int(0));
        }
        return Ok(bool_value(bits >> bit & 1 == 1));
    }
    let handle = container
        .handle()
        .ok_or_else(|| operand_error(world, "indexable container", container))?;
    match world.objects().get(handle)? {
        HeapObject::String(string) => {
            let index = usize::try_from(key.as_int()?).unwrap_or(usize::MAX);
            Ok(Value::Char(string.byte_at(index)))
        }
        HeapObject::Array(array) => Ok(array.get(key.as_int()?)),
        HeapObject::Mapping(..) => world.mapping_get(handle, key),
        HeapObject::Instance(..) => {
            let symbol = key.as_handle()?;
            match world.member_by_name(handle, symbol)? {
                Some((page, slot)) => Ok(world.instance(handle)?.pages()[page]
                    .slot(slot)
                    .unwrap_or(Value::Nil)),
                None => Ok(Value::Nil),
            }
        }
        _ => Err(operand_error(world, "indexable container", container)),
    }
}

/// `index_assign`: write through a container. Writing a bit of an integer
/// produces the updated integer, everything else passes the stored value
/// through.
fn index_assign(world: &mut World, container: Value, key: Value, value: Value) -> Result<Value> {
    if let Value::Int(bits) = container {
        let bit = key.as_int()?;
        if !(0..64).contains(&bit) {
            return Ok(container);
        }
        let mask = 1_i64 << bit;
        let updated = if value.truthy() { bits | mask } else { bits & !mask };
        return Ok(Value::Int(updated));
    }
    let handle = container
        .handle()
        .ok_or_else(|| operand_error(world, "indexable container", container))?;
    match world.objects().get(handle)? {
        HeapObject::Array(..) => {
            let index = key.as_int()?;
            world.array_mut(handle)?.put(index, value);
            Ok(value)
        }
        HeapObject::Mapping(..) => {
            world.mapping_put(handle, key, value)?;
            Ok(value)
        }
        HeapObject::Instance(..) => {
            let symbol = key.as_handle()?;
            if let Some((page, slot)) = world.member_by_name(handle, symbol)? {
                world.instance_mut(handle)?.pages_mut()[page].set_slot(slot, value);
            }
            Ok(value)
        }
        _ => Err(operand_error(world, "indexable container", container)),
    }
}

/// `new`: instantiate a blueprint, resolving a string operand as a
/// virtual path through the filesystem.
fn new(world: &mut World, operand: Value) -> Result<Value> {
    let blueprint = match heap_kind(world, operand) {
        Some(HeapObject::String(path)) => {
            let path = path.to_text().into_owned();
            world.resolve_path(&path)?
        }
        Some(HeapObject::Blueprint(..)) => operand.as_handle()?,
        Some(HeapObject::Instance(instance)) => instance.master().ok_or_else(|| {
            operand_error(world, "instantiable operand", operand)
        })?,
        _ => return Err(operand_error(world, "path, blueprint or object", operand)),
    };
    let instance = world.instantiate(blueprint)?;
    Ok(Value::Ref(instance))
}

fn heap_kind(world: &World, value: Value) -> Option<&HeapObject> {
    world.objects().get(value.handle()?).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_op(world: &mut World, fiber: &mut Fiber, operator: Operator) -> Result<()> {
        op(world, fiber, operator.code())?;
        Ok(())
    }

    #[test]
    fn test_int_addition() -> Result<()> {
        let mut world = World::new();
        let mut fiber = Fiber::new();
        fiber.push(Value::Int(3));
        fiber.set_accumulator(Value::Int(4));
        run_op(&mut world, &mut fiber, Operator::Add)?;
        assert_eq!(Value::Int(7), fiber.accumulator());
        Ok(())
    }

    #[test]
    fn test_char_addition_produces_char() -> Result<()> {
        let mut world = World::new();
        let mut fiber = Fiber::new();
        fiber.push(Value::Char('a'));
        fiber.set_accumulator(Value::Int(1));
        run_op(&mut world, &mut fiber, Operator::Add)?;
        assert_eq!(Value::Char('b'), fiber.accumulator());
        Ok(())
    }

    #[test]
    fn test_string_concatenation() -> Result<()> {
        let mut world = World::new();
        let mut fiber = Fiber::new();
        let left = world.alloc_string("foo")?;
        let right = world.alloc_string("bar")?;
        fiber.push(left);
        fiber.set_accumulator(right);
        run_op(&mut world, &mut fiber, Operator::Add)?;
        let result = fiber.accumulator().as_handle()?;
        assert_eq!(b"foobar", world.string(result)?.bytes());
        // Concatenation allocates; the operands are untouched.
        assert_eq!(b"foo", world.string(left.as_handle()?)?.bytes());
        Ok(())
    }

    #[test]
    fn test_nil_passes_string_through() -> Result<()> {
        let mut world = World::new();
        let mut fiber = Fiber::new();
        let string = world.alloc_string("foo")?;
        fiber.push(Value::Nil);
        fiber.set_accumulator(string);
        run_op(&mut world, &mut fiber, Operator::Add)?;
        assert_eq!(string, fiber.accumulator());
        Ok(())
    }

    #[test]
    fn test_division_by_zero() {
        let mut world = World::new();
        let mut fiber = Fiber::new();
        fiber.push(Value::Int(1));
        fiber.set_accumulator(Value::Int(0));
        let result = op(&mut world, &mut fiber, Operator::Div.code());
        assert!(matches!(result, Err(DivisionByZero)));
    }

    #[test]
    fn test_string_repetition() -> Result<()> {
        let mut world = World::new();
        let mut fiber = Fiber::new();
        let string = world.alloc_string("ab")?;
        fiber.push(string);
        fiber.set_accumulator(Value::Int(2));
        run_op(&mut world, &mut fiber, Operator::Mul)?;
        let result = fiber.accumulator().as_handle()?;
        assert_eq!(b"abab", world.string(result)?.bytes());
        Ok(())
    }

    #[test]
    fn test_string_comparison_is_bytewise() -> Result<()> {
        let mut world = World::new();
        let mut fiber = Fiber::new();
        let left = world.alloc_string("abc")?;
        let right = world.alloc_string("abd")?;
        fiber.push(left);
        fiber.set_accumulator(right);
        run_op(&mut world, &mut fiber, Operator::Lt)?;
        assert_eq!(Value::Int(1), fiber.accumulator());
        Ok(())
    }

    #[test]
    fn test_mismatched_comparison_is_false() -> Result<()> {
        let mut world = World::new();
        let mut fiber = Fiber::new();
        let string = world.alloc_string("abc")?;
        fiber.push(string);
        fiber.set_accumulator(Value::Int(1));
        run_op(&mut world, &mut fiber, Operator::Lt)?;
        assert_eq!(Value::Int(0), fiber.accumulator());
        Ok(())
    }

    #[test]
    fn test_bit_test_and_set() -> Result<()> {
        let mut world = World::new();
        let mut fiber = Fiber::new();
        fiber.push(Value::Int(0b100));
        fiber.set_accumulator(Value::Int(2));
        run_op(&mut world, &mut fiber, Operator::Index)?;
        assert_eq!(Value::Int(1), fiber.accumulator());

        fiber.push(Value::Int(0));
        fiber.push(Value::Int(3));
        fiber.set_accumulator(Value::Int(1));
        run_op(&mut world, &mut fiber, Operator::IndexAssign)?;
        assert_eq!(Value::Int(0b1000), fiber.accumulator());
        Ok(())
    }

    #[test]
    fn test_sizeof_counts_live_mapping_entries() -> Result<()> {
        let mut world = World::new();
        let mut fiber = Fiber::new();
        let mapping = world.alloc_mapping()?;
        let handle = mapping.as_handle()?;
        world.mapping_put(handle, Value::Int(1), Value::Int(10))?;
        world.mapping_put(handle, Value::Int(2), Value::Nil)?;
        fiber.set_accumulator(mapping);
        run_op(&mut world, &mut fiber, Operator::Sizeof)?;
        assert_eq!(Value::Int(1), fiber.accumulator());
        Ok(())
    }
}
