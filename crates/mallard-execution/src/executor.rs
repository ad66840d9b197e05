//! Pipeline executor - drives one pipeline to completion
//!
//! One executor is a single-threaded, use-once state machine over a shared
//! pipeline description. It owns every per-thread resource: the chunk
//! buffers between operators, the operators' local states, the chunk
//! caches, and the in-process operator stack that makes the traversal
//! re-entrant. Several executors may drive the same pipeline from
//! different threads; they share only the pipeline, the global operator
//! states, and the query state.
//!
//! Push mode (a sink is present) drives the whole pipeline via
//! `execute`; pull mode hands chunks back to the caller via
//! `execute_pull`. Either way the owner must call the matching finalize
//! exactly once, even after an error.

use crate::cache::{can_cache_type, ChunkCache, MIN_CACHE_VECTOR_SIZE};
use crate::chunk::DataChunk;
use crate::context::{ClientContext, ExecutionContext};
use crate::operator::{LocalSinkState, LocalSourceState, OperatorResult, OperatorState, SinkResult};
use crate::pipeline::Pipeline;
use crate::vector::VECTOR_SIZE;
use mallard_common::{Error, Result};
use std::mem;
use std::sync::Arc;

/// Executes one pipeline on one thread
pub struct PipelineExecutor {
    pipeline: Arc<Pipeline>,
    context: ExecutionContext,

    /// Buffer the source is fetched into; input of operator 0
    source_chunk: DataChunk,
    /// Buffer the last operator writes into; feeds the sink or the caller
    final_chunk: DataChunk,
    /// `intermediate_chunks[i]` is the output buffer of operator `i`,
    /// for every operator but the last
    intermediate_chunks: Vec<DataChunk>,
    /// Local state of each operator
    intermediate_states: Vec<Box<dyn OperatorState>>,
    /// Optional cache at each operator's output position
    cached_chunks: Vec<Option<ChunkCache>>,
    /// Operators that reported more output pending for their current
    /// input, deepest last; popped entries are re-entered before any new
    /// input is fetched
    in_process_operators: Vec<usize>,

    local_source_state: Box<dyn LocalSourceState>,
    local_sink_state: Option<Box<dyn LocalSinkState>>,

    finalized: bool,
    /// Set when the sink reported it is satisfied; suppresses the cache
    /// flush at finalize
    finished_processing: bool,
}

impl PipelineExecutor {
    /// Build the executor, allocating every buffer and local state
    pub fn new(client: Arc<ClientContext>, pipeline: Arc<Pipeline>) -> Result<Self> {
        let context = ExecutionContext::new(Arc::clone(&client));
        let local_source_state = pipeline
            .source
            .local_source_state(pipeline.source_state.as_ref());
        let local_sink_state = pipeline.sink.as_ref().map(|sink| sink.local_sink_state());

        let op_count = pipeline.operators.len();
        let caching_allowed = VECTOR_SIZE >= MIN_CACHE_VECTOR_SIZE
            && client.config().enable_operator_caching
            && pipeline
                .sink
                .as_ref()
                .map(|sink| !sink.sink_order_matters())
                .unwrap_or(false);

        let mut intermediate_chunks = Vec::with_capacity(op_count.saturating_sub(1));
        let mut intermediate_states = Vec::with_capacity(op_count);
        let mut cached_chunks = Vec::with_capacity(op_count);
        for (op_idx, operator) in pipeline.operators.iter().enumerate() {
            if op_idx + 1 < op_count {
                intermediate_chunks.push(DataChunk::try_new(operator.types())?);
            }
            intermediate_states.push(operator.operator_state());

            let cacheable = caching_allowed
                && operator.requires_cache()
                && operator.types().iter().all(can_cache_type);
            cached_chunks.push(if cacheable {
                Some(ChunkCache::try_new(operator.types().to_vec())?)
            } else {
                None
            });
        }

        let source_chunk = DataChunk::try_new(pipeline.source.types())?;
        let final_types = pipeline
            .operators
            .last()
            .map(|op| op.types())
            .unwrap_or_else(|| pipeline.source.types());
        let final_chunk = DataChunk::try_new(final_types)?;

        tracing::debug!(
            operators = op_count,
            has_sink = pipeline.sink.is_some(),
            caches = cached_chunks.iter().filter(|c| c.is_some()).count(),
            "initialized pipeline executor"
        );

        Ok(PipelineExecutor {
            pipeline,
            context,
            source_chunk,
            final_chunk,
            intermediate_chunks,
            intermediate_states,
            cached_chunks,
            in_process_operators: Vec::new(),
            local_source_state,
            local_sink_state,
            finalized: false,
            finished_processing: false,
        })
    }

    /// Push mode: drain the source through the operators into the sink,
    /// then finalize
    pub fn execute(&mut self) -> Result<()> {
        debug_assert!(self.pipeline.sink.is_some());
        loop {
            let mut chunk = mem::take(&mut self.source_chunk);
            chunk.reset();
            let fetched = self.fetch_from_source(&mut chunk);
            if let Err(error) = fetched {
                self.source_chunk = chunk;
                return Err(error);
            }
            if chunk.is_empty() {
                self.source_chunk = chunk;
                break;
            }
            let pushed = self.execute_push_internal(&chunk, 0);
            self.source_chunk = chunk;
            if pushed? == OperatorResult::Finished {
                self.finished_processing = true;
                break;
            }
        }
        self.push_finalize()
    }

    /// Streaming push entry: feed one externally produced chunk through
    /// the operators into the sink
    pub fn execute_push(&mut self, input: &DataChunk) -> Result<OperatorResult> {
        self.execute_push_internal(input, 0)
    }

    /// Exactly-once teardown for push mode: flush partially-filled
    /// caches, combine the sink state, flush profiling
    pub fn push_finalize(&mut self) -> Result<()> {
        if self.finalized {
            return Err(Error::InvalidState(
                "push finalize called on a pipeline executor that was already finalized".to_string(),
            ));
        }
        self.finalized = true;

        // replay buffered rows into the operator below each cache slot;
        // skipped when the sink already declared itself satisfied
        if !self.finished_processing {
            debug_assert!(self.in_process_operators.is_empty());
            for op_idx in 0..self.cached_chunks.len() {
                if let Some(cache) = self.cached_chunks[op_idx].take() {
                    if !cache.is_empty() {
                        self.execute_push_internal(cache.chunk(), op_idx + 1)?;
                    }
                }
            }
        }

        let pipeline = Arc::clone(&self.pipeline);
        let sink = pipeline.sink.as_ref().ok_or_else(|| {
            Error::InvalidState("push finalize on a pipeline without a sink".to_string())
        })?;
        let sink_state = pipeline
            .sink_state
            .as_ref()
            .ok_or_else(|| Error::Internal("missing global sink state".to_string()))?;
        let mut local = self.local_sink_state.take().ok_or_else(|| {
            Error::InvalidState("local sink state already released".to_string())
        })?;
        sink.combine(&mut self.context, sink_state.as_ref(), local.as_mut())?;

        pipeline.query.flush(&mut self.context.thread);
        tracing::trace!("pipeline executor finalized (push)");
        Ok(())
    }

    /// Pull mode: produce the next non-empty chunk into `result`; an
    /// empty result signals exhaustion. If a sibling executor already
    /// recorded a failure, that failure is surfaced in preference to a
    /// local one.
    pub fn execute_pull(&mut self, result: &mut DataChunk) -> Result<()> {
        let pulled = self.pull_inner(result);
        if let Err(error) = pulled {
            if let Some(root_cause) = self.pipeline.query.error() {
                return Err(root_cause);
            }
            return Err(error);
        }
        Ok(())
    }

    /// Exactly-once teardown for pull mode
    pub fn pull_finalize(&mut self) -> Result<()> {
        if self.finalized {
            return Err(Error::InvalidState(
                "pull finalize called on a pipeline executor that was already finalized".to_string(),
            ));
        }
        self.finalized = true;
        self.pipeline.query.flush(&mut self.context.thread);
        tracing::trace!("pipeline executor finalized (pull)");
        Ok(())
    }

    fn pull_inner(&mut self, result: &mut DataChunk) -> Result<()> {
        debug_assert!(self.pipeline.sink.is_none());
        let has_operators = !self.pipeline.operators.is_empty();
        while result.is_empty() {
            if self.in_process_operators.is_empty() {
                if !has_operators {
                    // no operators: the source writes straight into the
                    // caller's chunk
                    result.reset();
                    self.fetch_from_source(result)?;
                    break;
                }
                let mut chunk = mem::take(&mut self.source_chunk);
                chunk.reset();
                let fetched = self.fetch_from_source(&mut chunk);
                self.source_chunk = chunk;
                fetched?;
                if self.source_chunk.is_empty() {
                    break;
                }
            }
            let chunk = mem::take(&mut self.source_chunk);
            let executed = self.execute_chain(&chunk, result, 0);
            self.source_chunk = chunk;
            if executed? == OperatorResult::Finished {
                break;
            }
        }
        Ok(())
    }

    /// Run `input` through the operator chain into the sink, repeatedly
    /// while operators keep more output pending
    fn execute_push_internal(
        &mut self,
        input: &DataChunk,
        initial_op: usize,
    ) -> Result<OperatorResult> {
        let pipeline = Arc::clone(&self.pipeline);
        let sink = pipeline.sink.as_ref().ok_or_else(|| {
            Error::InvalidState("push execution on a pipeline without a sink".to_string())
        })?;
        let sink_state = pipeline
            .sink_state
            .as_ref()
            .ok_or_else(|| Error::Internal("missing global sink state".to_string()))?;
        if input.is_empty() {
            return Ok(OperatorResult::NeedMoreInput);
        }

        loop {
            let result = if pipeline.operators.is_empty() {
                OperatorResult::NeedMoreInput
            } else {
                let mut final_chunk = mem::take(&mut self.final_chunk);
                final_chunk.reset();
                let executed = self.execute_chain(input, &mut final_chunk, initial_op);
                self.final_chunk = final_chunk;
                match executed? {
                    OperatorResult::Finished => return Ok(OperatorResult::Finished),
                    other => other,
                }
            };

            let sink_chunk = if pipeline.operators.is_empty() {
                input
            } else {
                &self.final_chunk
            };
            if !sink_chunk.is_empty() {
                // sink scope: interrupt check, start/end events
                if self.context.client.is_interrupted() {
                    return Err(Error::Interrupted);
                }
                let Some(local) = self.local_sink_state.as_mut() else {
                    return Err(Error::InvalidState(
                        "local sink state already released".to_string(),
                    ));
                };
                self.context.thread.profiler.start_operator(sink.name());
                let sunk = sink.sink(
                    &mut self.context,
                    sink_state.as_ref(),
                    local.as_mut(),
                    sink_chunk,
                );
                self.context.thread.profiler.end_operator(None);
                if sunk? == SinkResult::Finished {
                    return Ok(OperatorResult::Finished);
                }
            }

            if result == OperatorResult::NeedMoreInput {
                return Ok(OperatorResult::NeedMoreInput);
            }
        }
    }

    /// The re-entrant operator traversal. Feeds `input` into operator
    /// `initial_op` (operators below it are bypassed, which is how cache
    /// flushes replay buffered rows) and advances chunk by chunk until a
    /// result-bound chunk is produced or the chain runs dry. An operator
    /// that reports more output pending is pushed on the in-process
    /// stack; a stacked operator is always resumed, with the same
    /// buffered input, before any new input is considered.
    fn execute_chain(
        &mut self,
        input: &DataChunk,
        result: &mut DataChunk,
        initial_op: usize,
    ) -> Result<OperatorResult> {
        if input.is_empty() {
            return Ok(OperatorResult::NeedMoreInput);
        }
        let pipeline = Arc::clone(&self.pipeline);
        let op_count = pipeline.operators.len();
        debug_assert!(op_count > 0);

        // resume the deepest in-process operator if any, else enter the
        // chain at the requested operator
        let mut current_op = match self.in_process_operators.pop() {
            Some(op_idx) => op_idx,
            None => initial_op,
        };
        debug_assert!(current_op >= initial_op);
        if current_op >= op_count {
            // no operators apply: a cache flush past the last operator
            result.reference(input);
            return Ok(OperatorResult::NeedMoreInput);
        }

        loop {
            if self.context.client.is_interrupted() {
                return Err(Error::Interrupted);
            }

            let operator = &pipeline.operators[current_op];
            let last_op = current_op + 1 == op_count;

            // the operator reads its predecessor's buffer and writes its
            // own; the last operator writes into the result chunk
            let (prev_chunk, current_chunk): (&DataChunk, &mut DataChunk) =
                if current_op == initial_op {
                    if last_op {
                        (input, &mut *result)
                    } else {
                        (input, &mut self.intermediate_chunks[current_op])
                    }
                } else if last_op {
                    (&self.intermediate_chunks[current_op - 1], &mut *result)
                } else {
                    let (before, after) = self.intermediate_chunks.split_at_mut(current_op);
                    (&before[current_op - 1], &mut after[0])
                };
            current_chunk.reset();
            let input_rows = prev_chunk.row_count();

            self.context.thread.profiler.start_operator(operator.name());
            let state = self.intermediate_states[current_op].as_mut();
            let executed = operator.execute(&mut self.context, prev_chunk, current_chunk, state);
            self.context.thread.profiler.end_operator(Some(&*current_chunk));
            #[cfg(debug_assertions)]
            current_chunk.verify();

            match executed? {
                OperatorResult::HaveMoreOutput => {
                    debug_assert!(
                        !current_chunk.is_empty(),
                        "operator {} reported more output pending but produced an empty chunk",
                        operator.name()
                    );
                    self.in_process_operators.push(current_op);
                }
                OperatorResult::Finished => {
                    debug_assert!(current_chunk.is_empty());
                    return Ok(OperatorResult::Finished);
                }
                OperatorResult::NeedMoreInput => {}
            }

            if let Some(cache) = self.cached_chunks[current_op].as_mut() {
                cache.cache(input_rows, current_chunk)?;
            }

            if current_chunk.is_empty() {
                // nothing came out: resume a stacked operator if one is
                // pending, otherwise ask for fresh input
                match self.in_process_operators.pop() {
                    Some(op_idx) => {
                        current_op = op_idx;
                        continue;
                    }
                    None => return Ok(OperatorResult::NeedMoreInput),
                }
            } else {
                current_op += 1;
                if current_op >= op_count {
                    // a result-bound chunk was produced
                    break;
                }
            }
        }

        Ok(if self.in_process_operators.is_empty() {
            OperatorResult::NeedMoreInput
        } else {
            OperatorResult::HaveMoreOutput
        })
    }

    /// Fetch the next chunk from the source within a profiling scope.
    /// An empty chunk signals end-of-stream.
    fn fetch_from_source(&mut self, chunk: &mut DataChunk) -> Result<()> {
        let pipeline = Arc::clone(&self.pipeline);
        let source = &pipeline.source;
        if self.context.client.is_interrupted() {
            return Err(Error::Interrupted);
        }
        self.context.thread.profiler.start_operator(source.name());
        let fetched = source.get_data(
            &mut self.context,
            chunk,
            pipeline.source_state.as_ref(),
            self.local_source_state.as_mut(),
        );
        self.context.thread.profiler.end_operator(Some(&*chunk));
        #[cfg(debug_assertions)]
        chunk.verify();
        fetched
    }
}
