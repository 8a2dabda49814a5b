use crate::value::Value;

/// A dynamically grown ordered sequence of values.
///
/// Reads outside the populated range yield nil; writes outside it are
/// silently ignored. Backing storage doubles on growth.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Array {
    values: Vec<Value>,
}

impl Array {
    /// Create an empty array.
    #[must_use]
    pub fn new() -> Self {
        Self { values: Vec::new() }
    }

    /// Create an array from existing values.
    #[must_use]
    pub fn from_values(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` when the array has no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The element at `index`, or nil out of range.
    #[must_use]
    pub fn get(&self, index: i64) -> Value {
        usize::try_from(index)
            .ok()
            .and_then(|index| self.values.get(index).copied())
            .unwrap_or(Value::Nil)
    }

    /// Replace the element at `index`; out-of-range writes are ignored.
    pub fn put(&mut self, index: i64, value: Value) {
        if let Ok(index) = usize::try_from(index)
            && let Some(slot) = self.values.get_mut(index)
        {
            *slot = value;
        }
    }

    /// Append a value, growing the storage.
    pub fn append(&mut self, value: Value) {
        self.values.push(value);
    }

    /// A new array holding this array's elements followed by another's.
    #[must_use]
    pub fn join(&self, other: &Array) -> Array {
        let mut values = Vec::with_capacity(self.len() + other.len());
        values.extend_from_slice(&self.values);
        values.extend_from_slice(&other.values);
        Array { values }
    }

    /// The elements.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_out_of_range_is_nil() {
        let mut array = Array::new();
        array.append(Value::Int(1));
        assert_eq!(Value::Int(1), array.get(0));
        assert_eq!(Value::Nil, array.get(1));
        assert_eq!(Value::Nil, array.get(-1));
    }

    #[test]
    fn test_put_out_of_range_is_ignored() {
        let mut array = Array::from_values(vec![Value::Int(1)]);
        array.put(0, Value::Int(2));
        array.put(5, Value::Int(9));
        array.put(-1, Value::Int(9));
        assert_eq!(1, array.len());
        assert_eq!(Value::Int(2), array.get(0));
    }

    #[test]
    fn test_join() {
        let left = Array::from_values(vec![Value::Int(1)]);
        let right = Array::from_values(vec![Value::Int(2), Value::Int(3)]);
        let joined = left.join(&right);
        assert_eq!(3, joined.len());
        assert_eq!(Value::Int(1), joined.get(0));
        assert_eq!(Value::Int(3), joined.get(2));
        // The inputs are untouched.
        assert_eq!(1, left.len());
        assert_eq!(2, right.len());
    }
}
