//! Shared fixtures: chunk builders and test-only operators exercising
//! the corners of the operator contract.

#![allow(dead_code)]

use mallard_common::{LogicalType, Result, Value};
use mallard_execution::chunk::DataChunk;
use mallard_execution::collection::ChunkCollection;
use mallard_execution::context::{ClientConfig, ClientContext, ExecutionContext};
use mallard_execution::operator::{
    EmptyState, GlobalSinkState, GlobalSourceState, LocalSinkState, LocalSourceState, Operator,
    OperatorResult, OperatorState, Sink, SinkResult, Source,
};
use mallard_execution::operators::CollectorSinkState;
use mallard_execution::pipeline::Pipeline;
use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub fn client() -> Arc<ClientContext> {
    Arc::new(ClientContext::new(ClientConfig::default()))
}

pub fn client_with(config: ClientConfig) -> Arc<ClientContext> {
    Arc::new(ClientContext::new(config))
}

pub fn bigint_chunk(values: &[i64]) -> DataChunk {
    let rows: Vec<Vec<Value>> = values.iter().map(|v| vec![Value::BigInt(*v)]).collect();
    DataChunk::from_rows(&[LogicalType::BigInt], &rows).unwrap()
}

pub fn bigint_range_chunk(range: std::ops::Range<i64>) -> DataChunk {
    bigint_chunk(&range.collect::<Vec<_>>())
}

/// A collection with exactly the given chunk boundaries
pub fn collection_of_chunks(chunks: &[DataChunk]) -> ChunkCollection {
    let mut collection = ChunkCollection::new(vec![LogicalType::BigInt]);
    for chunk in chunks {
        collection.push_chunk(chunk);
    }
    collection
}

/// Flatten collected rows into bare i64s for terse assertions
pub fn as_i64s(rows: &[Vec<Value>]) -> Vec<i64> {
    rows.iter()
        .map(|row| row[0].as_i64().expect("bigint row"))
        .collect()
}

/// Downcast a pipeline's global sink state to the collector result
pub fn collector_state(pipeline: &Pipeline) -> &CollectorSinkState {
    pipeline
        .sink_state()
        .expect("pipeline has a sink")
        .as_any()
        .downcast_ref::<CollectorSinkState>()
        .expect("collector sink state")
}

// ---------------------------------------------------------------------
// test sources

/// Emits `first` once, then `rest` forever. The fetch counter proves
/// whether the executor kept pulling.
pub struct StagedRepeatSource {
    pub first: DataChunk,
    pub rest: DataChunk,
    types: Vec<LogicalType>,
}

impl StagedRepeatSource {
    pub fn new(first: DataChunk, rest: DataChunk) -> Self {
        let types = first.types();
        StagedRepeatSource { first, rest, types }
    }
}

#[derive(Default)]
pub struct FetchCountState {
    pub fetches: AtomicUsize,
}

impl GlobalSourceState for FetchCountState {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Source for StagedRepeatSource {
    fn name(&self) -> &str {
        "staged_repeat_source"
    }

    fn types(&self) -> &[LogicalType] {
        &self.types
    }

    fn global_source_state(&self) -> Arc<dyn GlobalSourceState> {
        Arc::new(FetchCountState::default())
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
            .downcast_ref::<FetchCountState>()
            .expect("fetch count state");
        let fetch = state.fetches.fetch_add(1, Ordering::Relaxed);
        if fetch == 0 {
            chunk.reference(&self.first);
        } else {
            chunk.reference(&self.rest);
        }
        Ok(())
    }
}

/// Emits one chunk, then raises the client interrupt flag so the next
/// operator boundary observes it
pub struct InterruptSource {
    pub chunk: DataChunk,
    types: Vec<LogicalType>,
}

impl InterruptSource {
    pub fn new(chunk: DataChunk) -> Self {
        let types = chunk.types();
        InterruptSource { chunk, types }
    }
}

impl Source for InterruptSource {
    fn name(&self) -> &str {
        "interrupt_source"
    }

    fn types(&self) -> &[LogicalType] {
        &self.types
    }

    fn global_source_state(&self) -> Arc<dyn GlobalSourceState> {
        Arc::new(FetchCountState::default())
    }

    fn local_source_state(&self, _global: &dyn GlobalSourceState) -> Box<dyn LocalSourceState> {
        Box::new(EmptyState)
    }

    fn get_data(
        &self,
        context: &mut ExecutionContext,
        chunk: &mut DataChunk,
        _global: &dyn GlobalSourceState,
        _local: &mut dyn LocalSourceState,
    ) -> Result<()> {
        chunk.reference(&self.chunk);
        context.client.interrupt();
        Ok(())
    }
}

// ---------------------------------------------------------------------
// test operators

/// Emits each input chunk three times: twice reporting more output
/// pending, then once consuming the input
pub struct FanOutOperator {
    types: Vec<LogicalType>,
}

impl FanOutOperator {
    pub fn new(types: Vec<LogicalType>) -> Self {
        FanOutOperator { types }
    }
}

#[derive(Default)]
struct FanOutState {
    emitted: usize,
}

impl OperatorState for FanOutState {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl Operator for FanOutOperator {
    fn name(&self) -> &str {
        "fan_out"
    }

    fn types(&self) -> &[LogicalType] {
        &self.types
    }

    fn operator_state(&self) -> Box<dyn OperatorState> {
        Box::<FanOutState>::default()
    }

    fn execute(
        &self,
        _context: &mut ExecutionContext,
        input: &DataChunk,
        chunk: &mut DataChunk,
        state: &mut dyn OperatorState,
    ) -> Result<OperatorResult> {
        let state = state
            .as_any_mut()
            .downcast_mut::<FanOutState>()
            .expect("fan out state");
        chunk.reference(input);
        state.emitted += 1;
        if state.emitted < 3 {
            Ok(OperatorResult::HaveMoreOutput)
        } else {
            state.emitted = 0;
            Ok(OperatorResult::NeedMoreInput)
        }
    }
}

// ---------------------------------------------------------------------
// test sinks

/// Counts sink and combine invocations; optionally reports itself
/// satisfied after a number of sink calls
pub struct ProbeSink {
    pub finish_after: Option<usize>,
}

#[derive(Default)]
pub struct ProbeSinkState {
    pub sink_calls: AtomicUsize,
    pub combine_calls: AtomicUsize,
    pub rows: AtomicUsize,
}

impl GlobalSinkState for ProbeSinkState {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Sink for ProbeSink {
    fn name(&self) -> &str {
        "probe_sink"
    }

    fn global_sink_state(&self) -> Arc<dyn GlobalSinkState> {
        Arc::new(ProbeSinkState::default())
    }

    fn local_sink_state(&self) -> Box<dyn LocalSinkState> {
        Box::new(EmptyState)
    }

    fn sink(
        &self,
        _context: &mut ExecutionContext,
        global: &dyn GlobalSinkState,
        _local: &mut dyn LocalSinkState,
        chunk: &DataChunk,
    ) -> Result<SinkResult> {
        let state = global
            .as_any()
            .downcast_ref::<ProbeSinkState>()
            .expect("probe sink state");
        let calls = state.sink_calls.fetch_add(1, Ordering::Relaxed) + 1;
        state.rows.fetch_add(chunk.row_count(), Ordering::Relaxed);
        if self.finish_after.map(|limit| calls >= limit).unwrap_or(false) {
            return Ok(SinkResult::Finished);
        }
        Ok(SinkResult::NeedMoreInput)
    }

    fn combine(
        &self,
        _context: &mut ExecutionContext,
        global: &dyn GlobalSinkState,
        _local: &mut dyn LocalSinkState,
    ) -> Result<()> {
        let state = global
            .as_any()
            .downcast_ref::<ProbeSinkState>()
            .expect("probe sink state");
        state.combine_calls.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

pub fn probe_state(pipeline: &Pipeline) -> &ProbeSinkState {
    pipeline
        .sink_state()
        .expect("pipeline has a sink")
        .as_any()
        .downcast_ref::<ProbeSinkState>()
        .expect("probe sink state")
}
