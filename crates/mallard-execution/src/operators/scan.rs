//! Collection scan source

use crate::chunk::DataChunk;
use crate::collection::ChunkCollection;
use crate::context::ExecutionContext;
use crate::operator::{EmptyState, GlobalSourceState, LocalSourceState, Source};
use mallard_common::{Error, LogicalType, Result};
use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Scans a shared chunk collection. Sibling executors pick chunks off a
/// shared atomic cursor, so a collection is scanned once in total across
/// all executors of the pipeline.
pub struct CollectionScan {
    collection: Arc<ChunkCollection>,
    types: Vec<LogicalType>,
}

impl CollectionScan {
    pub fn new(collection: Arc<ChunkCollection>) -> Self {
        let types = collection.types().to_vec();
        CollectionScan { collection, types }
    }
}

struct CollectionScanState {
    next_chunk: AtomicUsize,
    cardinality: usize,
}

impl GlobalSourceState for CollectionScanState {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn max_cardinality(&self) -> Option<usize> {
        Some(self.cardinality)
    }
}

impl Source for CollectionScan {
    fn name(&self) -> &str {
        "collection_scan"
    }

    fn types(&self) -> &[LogicalType] {
        &self.types
    }

    fn global_source_state(&self) -> Arc<dyn GlobalSourceState> {
        Arc::new(CollectionScanState {
            next_chunk: AtomicUsize::new(0),
            cardinality: self.collection.row_count(),
        })
    }

    fn local_source_state(&self, _global: &dyn GlobalSourceState) -> Box<dyn LocalSourceState> {
        Box::new(EmptyState)
    }

    fn get_data(
        &self,
        _context: &mut ExecutionContext,
        chunk: &mut DataChunk,
        global: &dyn GlobalSourceState,
        _local: &mut dyn LocalSourceState,
    ) -> Result<()> {
        let state = global
            .as_any()
            .downcast_ref::<CollectionScanState>()
            .ok_or_else(|| Error::Internal("unexpected global state for collection scan".to_string()))?;
        let chunk_idx = state.next_chunk.fetch_add(1, Ordering::Relaxed);
        if let Some(next) = self.collection.chunk(chunk_idx) {
            chunk.reference(next);
        }
        // an exhausted cursor leaves the chunk empty: end-of-stream
        Ok(())
    }
}
