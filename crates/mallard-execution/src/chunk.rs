//! DataChunk - a batch of vectors passed between operators
//!
//! Chunks are allocated once at executor construction, `reset` between
//! uses, and dropped with the executor. All columns share one row count.

use crate::vector::{Vector, VECTOR_SIZE};
use mallard_common::{Error, LogicalType, Result, Value};

/// A fixed-capacity columnar batch of rows
#[derive(Debug, Clone, Default)]
pub struct DataChunk {
    vectors: Vec<Vector>,
    count: usize,
}

impl DataChunk {
    /// Create a chunk with one empty column per type. Fails with an
    /// invalid-type error for non-materializable column types.
    pub fn try_new(types: &[LogicalType]) -> Result<Self> {
        let vectors = types
            .iter()
            .map(|t| Vector::try_new(t.clone()))
            .collect::<Result<Vec<_>>>()?;
        Ok(DataChunk { vectors, count: 0 })
    }

    /// A chunk with no columns
    pub fn empty() -> Self {
        DataChunk::default()
    }

    pub fn column_count(&self) -> usize {
        self.vectors.len()
    }

    pub fn row_count(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn column(&self, idx: usize) -> &Vector {
        &self.vectors[idx]
    }

    pub fn column_mut(&mut self, idx: usize) -> &mut Vector {
        &mut self.vectors[idx]
    }

    pub fn types(&self) -> Vec<LogicalType> {
        self.vectors.iter().map(|v| v.logical_type().clone()).collect()
    }

    /// Set the row count after columns were filled directly
    pub fn set_row_count(&mut self, count: usize) {
        assert!(count <= VECTOR_SIZE);
        self.count = count;
    }

    /// Clear all rows, retaining column capacity
    pub fn reset(&mut self) {
        for vector in &mut self.vectors {
            vector.reset();
        }
        self.count = 0;
    }

    /// Replace this chunk's contents with a copy of `other`. Value
    /// storage is owned per vector, so this clones the column data
    /// rather than sharing buffers.
    pub fn reference(&mut self, other: &DataChunk) {
        self.vectors = other.vectors.clone();
        self.count = other.count;
    }

    /// Append all rows of `other` onto the end of this chunk
    pub fn append(&mut self, other: &DataChunk) -> Result<()> {
        if self.count + other.count > VECTOR_SIZE {
            return Err(Error::InvalidState(format!(
                "appending {} rows to a chunk holding {} would exceed the vector size",
                other.count, self.count
            )));
        }
        for (vector, other_vector) in self.vectors.iter_mut().zip(other.vectors.iter()) {
            vector.append_from(other_vector, other.count);
        }
        self.count += other.count;
        Ok(())
    }

    /// Append a single row. Returns false when the chunk is full.
    pub fn append_row(&mut self, values: &[Value]) -> bool {
        if self.count >= VECTOR_SIZE {
            return false;
        }
        for (vector, value) in self.vectors.iter_mut().zip(values.iter()) {
            vector.push_value(value.clone());
        }
        self.count += 1;
        true
    }

    /// Materialize one row as values
    pub fn row_values(&self, row_idx: usize) -> Vec<Value> {
        self.vectors.iter().map(|v| v.get_value(row_idx)).collect()
    }

    /// Build a chunk from row-oriented data. Rows beyond `VECTOR_SIZE` are
    /// not taken.
    pub fn from_rows(types: &[LogicalType], rows: &[Vec<Value>]) -> Result<Self> {
        let mut chunk = DataChunk::try_new(types)?;
        for row in rows.iter().take(VECTOR_SIZE) {
            chunk.append_row(row);
        }
        Ok(chunk)
    }

    /// Convert to row-oriented data
    pub fn to_rows(&self) -> Vec<Vec<Value>> {
        (0..self.count).map(|idx| self.row_values(idx)).collect()
    }

    /// Debug-mode invariant check: row count within bounds and every
    /// column backed for all rows.
    pub fn verify(&self) {
        debug_assert!(self.count <= VECTOR_SIZE);
        #[cfg(debug_assertions)]
        for vector in &self.vectors {
            debug_assert!(
                vector.is_constant() || vector.len() >= self.count,
                "column of type {} holds {} values for {} rows",
                vector.logical_type(),
                vector.len(),
                self.count
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_chunk(values: &[i32]) -> DataChunk {
        let rows: Vec<Vec<Value>> = values.iter().map(|v| vec![Value::Integer(*v)]).collect();
        DataChunk::from_rows(&[LogicalType::Integer], &rows).unwrap()
    }

    #[test]
    fn test_try_new() {
        let chunk = DataChunk::try_new(&[LogicalType::Integer, LogicalType::Varchar]).unwrap();
        assert_eq!(chunk.column_count(), 2);
        assert_eq!(chunk.row_count(), 0);
        assert!(chunk.is_empty());
    }

    #[test]
    fn test_try_new_rejects_any() {
        assert!(matches!(
            DataChunk::try_new(&[LogicalType::Any]),
            Err(Error::InvalidType(_))
        ));
    }

    #[test]
    fn test_append() {
        let mut chunk = int_chunk(&[1, 2, 3]);
        let other = int_chunk(&[4, 5]);
        chunk.append(&other).unwrap();
        assert_eq!(chunk.row_count(), 5);
        assert_eq!(chunk.column(0).get_value(4), Value::Integer(5));
    }

    #[test]
    fn test_append_overflow() {
        let rows: Vec<Vec<Value>> = (0..VECTOR_SIZE as i32).map(|v| vec![Value::Integer(v)]).collect();
        let mut chunk = DataChunk::from_rows(&[LogicalType::Integer], &rows).unwrap();
        let extra = int_chunk(&[1]);
        assert!(chunk.append(&extra).is_err());
    }

    #[test]
    fn test_reference() {
        let source = int_chunk(&[7, 8]);
        let mut target = DataChunk::try_new(&[LogicalType::Integer]).unwrap();
        target.reference(&source);
        assert_eq!(target.row_count(), 2);
        assert_eq!(target.row_values(0), vec![Value::Integer(7)]);
    }

    #[test]
    fn test_reset_retains_columns() {
        let mut chunk = int_chunk(&[1, 2]);
        chunk.reset();
        assert!(chunk.is_empty());
        assert_eq!(chunk.column_count(), 1);
        assert!(chunk.append_row(&[Value::Integer(9)]));
        assert_eq!(chunk.row_count(), 1);
    }

    #[test]
    fn test_round_trip_rows() {
        let rows = vec![
            vec![Value::Integer(1), Value::Varchar("a".to_string())],
            vec![Value::Null, Value::Varchar("b".to_string())],
        ];
        let chunk =
            DataChunk::from_rows(&[LogicalType::Integer, LogicalType::Varchar], &rows).unwrap();
        assert_eq!(chunk.to_rows(), rows);
    }
}
