//! Per-operator profiling
//!
//! Every operator invocation is bracketed by a start/end event pair on the
//! per-thread profiler. The end event is tagged with the output chunk's
//! row count when a chunk is in scope. At finalize, each executor flushes
//! its thread-local table into the query-wide profiler.

use crate::chunk::DataChunk;
use hashbrown::HashMap;
use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// Accumulated metrics for one operator
#[derive(Debug, Clone, Copy, Default)]
pub struct OperatorMetrics {
    /// Wall time spent inside the operator
    pub time: Duration,
    /// Number of invocations
    pub calls: u64,
    /// Rows emitted across invocations
    pub elements: u64,
}

#[derive(Debug)]
struct ActiveOperator {
    name: String,
    start: Instant,
}

/// Per-thread operator profiler. Not synchronized; one per executor.
#[derive(Debug)]
pub struct OperatorProfiler {
    enabled: bool,
    active: Option<ActiveOperator>,
    metrics: HashMap<String, OperatorMetrics>,
}

impl OperatorProfiler {
    pub fn new(enabled: bool) -> Self {
        OperatorProfiler {
            enabled,
            active: None,
            metrics: HashMap::new(),
        }
    }

    /// Record the start event of an operator invocation. At most one
    /// scope may be open per thread.
    pub fn start_operator(&mut self, name: &str) {
        if !self.enabled {
            return;
        }
        debug_assert!(
            self.active.is_none(),
            "operator scope already open for {}",
            self.active.as_ref().map(|a| a.name.as_str()).unwrap_or("")
        );
        self.active = Some(ActiveOperator {
            name: name.to_string(),
            start: Instant::now(),
        });
    }

    /// Record the end event, tagged with the output chunk's row count
    /// when a chunk is in scope. Runs on every exit path, errors included.
    pub fn end_operator(&mut self, chunk: Option<&DataChunk>) {
        if !self.enabled {
            return;
        }
        if let Some(active) = self.active.take() {
            let entry = self.metrics.entry(active.name).or_default();
            entry.time += active.start.elapsed();
            entry.calls += 1;
            if let Some(chunk) = chunk {
                entry.elements += chunk.row_count() as u64;
            }
        }
    }

    /// Drain the accumulated metrics
    pub fn take_metrics(&mut self) -> HashMap<String, OperatorMetrics> {
        std::mem::take(&mut self.metrics)
    }

    pub fn metrics(&self) -> &HashMap<String, OperatorMetrics> {
        &self.metrics
    }
}

/// Query-wide aggregate, shared by all sibling executors
#[derive(Debug, Default)]
pub struct QueryProfiler {
    metrics: Mutex<HashMap<String, OperatorMetrics>>,
}

impl QueryProfiler {
    /// Merge and clear one thread's metrics
    pub fn flush(&self, profiler: &mut OperatorProfiler) {
        let drained = profiler.take_metrics();
        if drained.is_empty() {
            return;
        }
        let mut metrics = self.metrics.lock();
        for (name, m) in drained {
            let entry = metrics.entry(name).or_default();
            entry.time += m.time;
            entry.calls += m.calls;
            entry.elements += m.elements;
        }
        tracing::trace!(operators = metrics.len(), "flushed thread profiler");
    }

    /// Snapshot of the aggregated metrics
    pub fn report(&self) -> HashMap<String, OperatorMetrics> {
        self.metrics.lock().clone()
    }
}
