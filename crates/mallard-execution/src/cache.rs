//! Chunk cache - coalesces sparse operator outputs
//!
//! A selective filter can shrink a full input chunk down to a handful of
//! rows; every operator downstream then works on nearly-empty chunks. The
//! cache sits at an operator's output position and buffers such sparse
//! chunks until enough rows accumulate to hand a dense chunk downstream.
//! Partially-filled caches are flushed at finalize.

use crate::chunk::DataChunk;
use crate::vector::VECTOR_SIZE;
use mallard_common::{LogicalType, Result};

/// Outputs below this row count (from inputs at or above it) are buffered
pub const CACHE_THRESHOLD: usize = VECTOR_SIZE / 2;

/// Caching does not amortize below this vector size
pub const MIN_CACHE_VECTOR_SIZE: usize = 128;

/// A type can be cached iff it is not a variable-length nested type.
/// Structs are cacheable when every field is.
pub fn can_cache_type(logical_type: &LogicalType) -> bool {
    match logical_type {
        LogicalType::List(_) | LogicalType::Map { .. } => false,
        LogicalType::Struct(fields) => fields.iter().all(|(_, t)| can_cache_type(t)),
        _ => true,
    }
}

/// One cache slot at an operator's output position
#[derive(Debug)]
pub struct ChunkCache {
    chunk: DataChunk,
    types: Vec<LogicalType>,
}

impl ChunkCache {
    pub fn try_new(types: Vec<LogicalType>) -> Result<Self> {
        let chunk = DataChunk::try_new(&types)?;
        Ok(ChunkCache { chunk, types })
    }

    pub fn is_empty(&self) -> bool {
        self.chunk.is_empty()
    }

    pub fn chunk(&self) -> &DataChunk {
        &self.chunk
    }

    /// Interpose on an operator's output. When the operator dropped a
    /// significant share of a dense input, `current` is absorbed into the
    /// buffer: either swapped back out as a dense chunk (buffer full
    /// enough) or reset so the executor requests more input.
    pub fn cache(&mut self, input_rows: usize, current: &mut DataChunk) -> Result<()> {
        if input_rows >= CACHE_THRESHOLD && current.row_count() < CACHE_THRESHOLD {
            self.chunk.append(current)?;
            if self.chunk.row_count() >= VECTOR_SIZE - CACHE_THRESHOLD {
                std::mem::swap(current, &mut self.chunk);
                self.chunk = DataChunk::try_new(&self.types)?;
            } else {
                current.reset();
            }
        }
        Ok(())
    }
}
