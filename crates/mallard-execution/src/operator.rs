//! The operator contract
//!
//! A pipeline is made of three operator roles: one source, a chain of
//! unary operators, and an optional sink. Each role is a flat capability
//! trait; concrete operators are held behind `Arc<dyn ...>` and stay
//! immutable during execution. All mutable state lives in the state
//! objects: global states are shared across the sibling executors of one
//! pipeline (interior mutability), local states belong to exactly one
//! executor.

use crate::chunk::DataChunk;
use crate::context::ExecutionContext;
use mallard_common::{LogicalType, Result};
use std::any::Any;
use std::sync::Arc;

/// Result of a unary operator invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorResult {
    /// The current output was produced and the input is fully consumed;
    /// feed the next input
    NeedMoreInput,
    /// An output chunk was produced and more can be produced from the
    /// same input; re-enter this operator before fetching new input
    HaveMoreOutput,
    /// The operator will never produce again; terminate the pipeline
    Finished,
}

/// Result of a sink invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkResult {
    /// The sink wants more data
    NeedMoreInput,
    /// The sink is satisfied (e.g. a LIMIT); the pipeline terminates
    Finished,
}

/// State shared by every executor scanning the same source
pub trait GlobalSourceState: Send + Sync {
    fn as_any(&self) -> &dyn Any;

    /// Total-work hint for schedulers; `None` when unknown
    fn max_cardinality(&self) -> Option<usize> {
        None
    }
}

/// Per-executor source state
pub trait LocalSourceState: Send {
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Per-executor state of one unary operator
pub trait OperatorState: Send {
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Sink state shared by every executor; mutated through interior
/// mutability during `sink` and `combine`
pub trait GlobalSinkState: Send + Sync {
    fn as_any(&self) -> &dyn Any;
}

/// Per-executor sink state
pub trait LocalSinkState: Send {
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// A stateless placeholder for operators that need no local state
#[derive(Debug, Default)]
pub struct EmptyState;

impl LocalSourceState for EmptyState {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl OperatorState for EmptyState {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl LocalSinkState for EmptyState {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A data source. An empty output chunk signals end-of-stream.
pub trait Source: Send + Sync {
    /// Operator identity for profiling
    fn name(&self) -> &str;

    /// Output column types
    fn types(&self) -> &[LogicalType];

    fn global_source_state(&self) -> Arc<dyn GlobalSourceState>;

    fn local_source_state(&self, global: &dyn GlobalSourceState) -> Box<dyn LocalSourceState>;

    /// Fill `chunk` with up to `VECTOR_SIZE` rows
    fn get_data(
        &self,
        context: &mut ExecutionContext,
        chunk: &mut DataChunk,
        global: &dyn GlobalSourceState,
        local: &mut dyn LocalSourceState,
    ) -> Result<()>;
}

/// A unary operator transforming one input chunk into output chunks
pub trait Operator: Send + Sync {
    /// Operator identity for profiling
    fn name(&self) -> &str;

    /// Output column types
    fn types(&self) -> &[LogicalType];

    fn operator_state(&self) -> Box<dyn OperatorState>;

    fn execute(
        &self,
        context: &mut ExecutionContext,
        input: &DataChunk,
        chunk: &mut DataChunk,
        state: &mut dyn OperatorState,
    ) -> Result<OperatorResult>;

    /// Opt into output coalescing for operators that can emit sparse
    /// chunks (e.g. selective filters)
    fn requires_cache(&self) -> bool {
        false
    }
}

/// A terminal operator accumulating a per-thread result
pub trait Sink: Send + Sync {
    /// Operator identity for profiling
    fn name(&self) -> &str;

    fn global_sink_state(&self) -> Arc<dyn GlobalSinkState>;

    fn local_sink_state(&self) -> Box<dyn LocalSinkState>;

    fn sink(
        &self,
        context: &mut ExecutionContext,
        global: &dyn GlobalSinkState,
        local: &mut dyn LocalSinkState,
        chunk: &DataChunk,
    ) -> Result<SinkResult>;

    /// Merge one executor's local state into the global state. Called
    /// exactly once per executor, serialized by the scheduler, after any
    /// outcome of the main loop, error included. Implementations must
    /// tolerate a partially-populated local state.
    fn combine(
        &self,
        context: &mut ExecutionContext,
        global: &dyn GlobalSinkState,
        local: &mut dyn LocalSinkState,
    ) -> Result<()>;

    /// When true, the sink relies on rows arriving in source order and
    /// chunk caching is disabled for the whole pipeline
    fn sink_order_matters(&self) -> bool {
        false
    }
}
