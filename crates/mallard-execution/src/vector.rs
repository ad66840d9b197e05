//! Vector - the unit of columnar storage
//!
//! A `Vector` holds up to `VECTOR_SIZE` values of one logical type. Chunks
//! are built out of vectors, one per column.

use mallard_common::{Error, LogicalType, Result, Value};

/// Number of tuples processed per chunk
pub const VECTOR_SIZE: usize = 2048;

/// Per-row NULL tracking. `None` means every row is valid.
#[derive(Debug, Clone, Default)]
pub struct ValidityMask {
    mask: Option<Vec<u64>>,
}

impl ValidityMask {
    /// A mask where every row is valid
    pub fn all_valid() -> Self {
        ValidityMask { mask: None }
    }

    pub fn is_valid(&self, idx: usize) -> bool {
        match &self.mask {
            None => true,
            Some(words) => words
                .get(idx / 64)
                .map(|word| (word >> (idx % 64)) & 1 == 1)
                .unwrap_or(true),
        }
    }

    pub fn set(&mut self, idx: usize, valid: bool) {
        if valid && self.mask.is_none() {
            return;
        }
        let words = self
            .mask
            .get_or_insert_with(|| vec![u64::MAX; VECTOR_SIZE / 64]);
        let word_idx = idx / 64;
        while word_idx >= words.len() {
            words.push(u64::MAX);
        }
        if valid {
            words[word_idx] |= 1 << (idx % 64);
        } else {
            words[word_idx] &= !(1 << (idx % 64));
        }
    }

    /// Drop the mask, marking every row valid again
    pub fn reset(&mut self) {
        self.mask = None;
    }
}

/// Storage backing a vector
#[derive(Debug, Clone)]
enum VectorBuffer {
    /// One value slot per row
    Flat(Vec<Value>),
    /// A single value logically repeated for every row
    Constant(Value),
}

/// A column of values sharing one logical type
#[derive(Debug, Clone)]
pub struct Vector {
    logical_type: LogicalType,
    validity: ValidityMask,
    buffer: VectorBuffer,
}

impl Vector {
    /// Create an empty flat vector. Fails for types that cannot be
    /// materialized (e.g. ANY).
    pub fn try_new(logical_type: LogicalType) -> Result<Self> {
        if !logical_type.is_materializable() {
            return Err(Error::InvalidType(format!(
                "cannot materialize a vector of type {}",
                logical_type
            )));
        }
        Ok(Vector {
            logical_type,
            validity: ValidityMask::all_valid(),
            buffer: VectorBuffer::Flat(Vec::with_capacity(VECTOR_SIZE)),
        })
    }

    /// Create a constant vector holding `value` for every row
    pub fn new_constant(value: Value) -> Self {
        let logical_type = value.logical_type();
        let mut validity = ValidityMask::all_valid();
        if value.is_null() {
            validity.set(0, false);
        }
        Vector {
            logical_type,
            validity,
            buffer: VectorBuffer::Constant(value),
        }
    }

    pub fn logical_type(&self) -> &LogicalType {
        &self.logical_type
    }

    pub fn is_constant(&self) -> bool {
        matches!(self.buffer, VectorBuffer::Constant(_))
    }

    /// Number of value slots actually backed by storage. Constant vectors
    /// report `VECTOR_SIZE` since every row is addressable.
    pub fn len(&self) -> usize {
        match &self.buffer {
            VectorBuffer::Flat(values) => values.len(),
            VectorBuffer::Constant(_) => VECTOR_SIZE,
        }
    }

    pub fn is_empty(&self) -> bool {
        match &self.buffer {
            VectorBuffer::Flat(values) => values.is_empty(),
            VectorBuffer::Constant(_) => false,
        }
    }

    pub fn get_value(&self, idx: usize) -> Value {
        match &self.buffer {
            VectorBuffer::Constant(value) => value.clone(),
            VectorBuffer::Flat(values) => {
                if !self.validity.is_valid(idx) {
                    return Value::Null;
                }
                values.get(idx).cloned().unwrap_or(Value::Null)
            }
        }
    }

    /// Append one value, tracking validity. Writing to a constant vector
    /// first clears it to empty flat storage.
    pub fn push_value(&mut self, value: Value) {
        if let VectorBuffer::Constant(_) = self.buffer {
            self.flatten();
        }
        if let VectorBuffer::Flat(values) = &mut self.buffer {
            if value.is_null() {
                let idx = values.len();
                self.validity.set(idx, false);
            }
            values.push(value);
        }
    }

    /// Overwrite the value at `idx`, extending storage with NULLs if needed
    pub fn set_value(&mut self, idx: usize, value: Value) {
        if let VectorBuffer::Constant(_) = self.buffer {
            self.flatten();
        }
        if let VectorBuffer::Flat(values) = &mut self.buffer {
            while values.len() <= idx {
                values.push(Value::Null);
            }
            self.validity.set(idx, !value.is_null());
            values[idx] = value;
        }
    }

    /// Bulk-copy the first `count` rows of `other` onto the end of self
    pub fn append_from(&mut self, other: &Vector, count: usize) {
        for idx in 0..count {
            self.push_value(other.get_value(idx));
        }
    }

    /// Clear contents, retaining capacity
    pub fn reset(&mut self) {
        self.validity.reset();
        match &mut self.buffer {
            VectorBuffer::Flat(values) => values.clear(),
            VectorBuffer::Constant(_) => {
                self.buffer = VectorBuffer::Flat(Vec::with_capacity(VECTOR_SIZE));
            }
        }
    }

    fn flatten(&mut self) {
        self.validity.reset();
        self.buffer = VectorBuffer::Flat(Vec::with_capacity(VECTOR_SIZE));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validity_mask() {
        let mut mask = ValidityMask::all_valid();
        assert!(mask.is_valid(0));
        assert!(mask.is_valid(2047));

        mask.set(5, false);
        assert!(!mask.is_valid(5));
        assert!(mask.is_valid(4));
        assert!(mask.is_valid(6));

        mask.set(5, true);
        assert!(mask.is_valid(5));
    }

    #[test]
    fn test_push_and_get() {
        let mut v = Vector::try_new(LogicalType::Integer).unwrap();
        v.push_value(Value::Integer(1));
        v.push_value(Value::Null);
        v.push_value(Value::Integer(3));

        assert_eq!(v.len(), 3);
        assert_eq!(v.get_value(0), Value::Integer(1));
        assert!(v.get_value(1).is_null());
        assert_eq!(v.get_value(2), Value::Integer(3));
    }

    #[test]
    fn test_constant_vector() {
        let v = Vector::new_constant(Value::BigInt(42));
        assert!(v.is_constant());
        assert_eq!(v.get_value(0), Value::BigInt(42));
        assert_eq!(v.get_value(1999), Value::BigInt(42));
    }

    #[test]
    fn test_reset_clears_validity() {
        let mut v = Vector::try_new(LogicalType::Integer).unwrap();
        v.push_value(Value::Null);
        assert!(v.get_value(0).is_null());

        v.reset();
        v.push_value(Value::Integer(7));
        assert_eq!(v.get_value(0), Value::Integer(7));
    }

    #[test]
    fn test_any_is_rejected() {
        assert!(Vector::try_new(LogicalType::Any).is_err());
    }
}
