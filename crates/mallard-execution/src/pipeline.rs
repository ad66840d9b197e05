//! Pipeline - an immutable execution topology
//!
//! A pipeline describes one linear chain: source, unary operators, and an
//! optional sink, together with the global states shared by every executor
//! driving it. The pipeline itself never changes during execution; each
//! executor keeps its own local states and buffers.

use crate::context::ThreadContext;
use crate::operator::{GlobalSinkState, GlobalSourceState, Operator, Sink, Source};
use crate::profiler::QueryProfiler;
use mallard_common::Error;
use parking_lot::Mutex;
use std::sync::Arc;

/// State shared across all sibling executors of one query: the aggregate
/// profiler and the pipeline-global error slot. This is the handoff
/// contract with the scheduler that owns the threads.
#[derive(Debug, Default)]
pub struct QueryState {
    profiler: QueryProfiler,
    error: Mutex<Option<Error>>,
}

impl QueryState {
    /// Record a failure. The first root cause wins; later errors from
    /// sibling executors are dropped.
    pub fn set_error(&self, error: Error) {
        let mut slot = self.error.lock();
        if slot.is_none() {
            tracing::warn!(%error, "pipeline failed");
            *slot = Some(error);
        }
    }

    pub fn has_error(&self) -> bool {
        self.error.lock().is_some()
    }

    pub fn error(&self) -> Option<Error> {
        self.error.lock().clone()
    }

    pub fn profiler(&self) -> &QueryProfiler {
        &self.profiler
    }

    /// Merge one executor's thread-local profiling into the aggregate
    pub fn flush(&self, thread: &mut ThreadContext) {
        self.profiler.flush(&mut thread.profiler);
    }
}

/// One source, a chain of unary operators, an optional sink
pub struct Pipeline {
    pub(crate) source: Arc<dyn Source>,
    pub(crate) operators: Vec<Arc<dyn Operator>>,
    pub(crate) sink: Option<Arc<dyn Sink>>,
    pub(crate) source_state: Arc<dyn GlobalSourceState>,
    pub(crate) sink_state: Option<Arc<dyn GlobalSinkState>>,
    pub(crate) query: Arc<QueryState>,
}

impl Pipeline {
    /// Build a pipeline, creating the shared global states once
    pub fn new(
        source: Arc<dyn Source>,
        operators: Vec<Arc<dyn Operator>>,
        sink: Option<Arc<dyn Sink>>,
    ) -> Self {
        let source_state = source.global_source_state();
        let sink_state = sink.as_ref().map(|s| s.global_sink_state());
        Pipeline {
            source,
            operators,
            sink,
            source_state,
            sink_state,
            query: Arc::new(QueryState::default()),
        }
    }

    pub fn source(&self) -> &Arc<dyn Source> {
        &self.source
    }

    pub fn operators(&self) -> &[Arc<dyn Operator>] {
        &self.operators
    }

    pub fn sink(&self) -> Option<&Arc<dyn Sink>> {
        self.sink.as_ref()
    }

    pub fn source_state(&self) -> &Arc<dyn GlobalSourceState> {
        &self.source_state
    }

    pub fn sink_state(&self) -> Option<&Arc<dyn GlobalSinkState>> {
        self.sink_state.as_ref()
    }

    pub fn query_state(&self) -> &Arc<QueryState> {
        &self.query
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_error_wins() {
        let state = QueryState::default();
        assert!(!state.has_error());

        state.set_error(Error::Interrupted);
        state.set_error(Error::Internal("late".to_string()));

        assert_eq!(state.error(), Some(Error::Interrupted));
    }
}
