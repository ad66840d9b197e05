//! Collector sink

use crate::chunk::DataChunk;
use crate::collection::ChunkCollection;
use crate::context::ExecutionContext;
use crate::operator::{GlobalSinkState, LocalSinkState, Sink, SinkResult};
use mallard_common::{Error, LogicalType, Result, Value};
use parking_lot::Mutex;
use std::any::Any;
use std::sync::Arc;

/// Accumulates every chunk it is handed. Each executor buffers into its
/// local collection; `combine` merges the buffers into the shared result
/// under a lock, one executor at a time.
pub struct CollectorSink {
    types: Vec<LogicalType>,
    preserve_order: bool,
}

impl CollectorSink {
    pub fn new(types: Vec<LogicalType>) -> Self {
        CollectorSink {
            types,
            preserve_order: false,
        }
    }

    /// A collector that relies on rows arriving in source order, which
    /// disables chunk caching for the pipeline
    pub fn with_preserved_order(types: Vec<LogicalType>) -> Self {
        CollectorSink {
            types,
            preserve_order: true,
        }
    }
}

/// The shared result of a collector sink
pub struct CollectorSinkState {
    collection: Mutex<ChunkCollection>,
}

impl CollectorSinkState {
    pub fn rows(&self) -> Vec<Vec<Value>> {
        self.collection.lock().to_rows()
    }

    pub fn row_count(&self) -> usize {
        self.collection.lock().row_count()
    }

    /// Snapshot of the collected chunks, as they arrived
    pub fn chunks(&self) -> Vec<DataChunk> {
        self.collection.lock().chunks().to_vec()
    }
}

impl GlobalSinkState for CollectorSinkState {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct LocalCollectorState {
    collection: ChunkCollection,
}

impl LocalSinkState for LocalCollectorState {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl Sink for CollectorSink {
    fn name(&self) -> &str {
        "collector_sink"
    }

    fn global_sink_state(&self) -> Arc<dyn GlobalSinkState> {
        Arc::new(CollectorSinkState {
            collection: Mutex::new(ChunkCollection::new(self.types.clone())),
        })
    }

    fn local_sink_state(&self) -> Box<dyn LocalSinkState> {
        Box::new(LocalCollectorState {
            collection: ChunkCollection::new(self.types.clone()),
        })
    }

    fn sink(
        &self,
        _context: &mut ExecutionContext,
        _global: &dyn GlobalSinkState,
        local: &mut dyn LocalSinkState,
        chunk: &DataChunk,
    ) -> Result<SinkResult> {
        let local = local
            .as_any_mut()
            .downcast_mut::<LocalCollectorState>()
            .ok_or_else(|| Error::Internal("unexpected local state for collector sink".to_string()))?;
        local.collection.push_chunk(chunk);
        Ok(SinkResult::NeedMoreInput)
    }

    fn combine(
        &self,
        _context: &mut ExecutionContext,
        global: &dyn GlobalSinkState,
        local: &mut dyn LocalSinkState,
    ) -> Result<()> {
        let global = global
            .as_any()
            .downcast_ref::<CollectorSinkState>()
            .ok_or_else(|| Error::Internal("unexpected global state for collector sink".to_string()))?;
        let local = local
            .as_any_mut()
            .downcast_mut::<LocalCollectorState>()
            .ok_or_else(|| Error::Internal("unexpected local state for collector sink".to_string()))?;
        let buffered = std::mem::replace(
            &mut local.collection,
            ChunkCollection::new(self.types.clone()),
        );
        global.collection.lock().extend(buffered);
        Ok(())
    }

    fn sink_order_matters(&self) -> bool {
        self.preserve_order
    }
}
