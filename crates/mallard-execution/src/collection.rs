//! ChunkCollection - an owned, typed list of chunks
//!
//! The bridge between the execution engine and whatever owns materialized
//! data: scan sources read from a collection, collector sinks accumulate
//! into one.

use crate::chunk::DataChunk;
use crate::vector::VECTOR_SIZE;
use mallard_common::{LogicalType, Result, Value};

/// A list of chunks sharing one schema. Rows are re-chunked at
/// `VECTOR_SIZE` boundaries on append.
#[derive(Debug, Clone)]
pub struct ChunkCollection {
    types: Vec<LogicalType>,
    chunks: Vec<DataChunk>,
    count: usize,
}

impl ChunkCollection {
    pub fn new(types: Vec<LogicalType>) -> Self {
        ChunkCollection {
            types,
            chunks: Vec::new(),
            count: 0,
        }
    }

    pub fn types(&self) -> &[LogicalType] {
        &self.types
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn row_count(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn chunk(&self, idx: usize) -> Option<&DataChunk> {
        self.chunks.get(idx)
    }

    pub fn chunks(&self) -> &[DataChunk] {
        &self.chunks
    }

    /// Append all rows of `chunk`, filling the tail chunk before
    /// allocating a new one
    pub fn append(&mut self, chunk: &DataChunk) -> Result<()> {
        for row_idx in 0..chunk.row_count() {
            self.append_row(&chunk.row_values(row_idx))?;
        }
        Ok(())
    }

    /// Append one row
    pub fn append_row(&mut self, values: &[Value]) -> Result<()> {
        let needs_chunk = self
            .chunks
            .last()
            .map(|c| c.row_count() >= VECTOR_SIZE)
            .unwrap_or(true);
        if needs_chunk {
            self.chunks.push(DataChunk::try_new(&self.types)?);
        }
        if let Some(last) = self.chunks.last_mut() {
            last.append_row(values);
        }
        self.count += 1;
        Ok(())
    }

    /// Add a copy of `chunk` as its own unit, without re-packing rows
    /// into the tail chunk
    pub fn push_chunk(&mut self, chunk: &DataChunk) {
        if chunk.is_empty() {
            return;
        }
        self.count += chunk.row_count();
        self.chunks.push(chunk.clone());
    }

    /// Move all chunks of `other` into this collection. Chunks are taken
    /// as-is, without re-packing rows.
    pub fn extend(&mut self, other: ChunkCollection) {
        self.count += other.count;
        self.chunks.extend(other.chunks);
    }

    pub fn to_rows(&self) -> Vec<Vec<Value>> {
        self.chunks.iter().flat_map(|c| c.to_rows()).collect()
    }
}
