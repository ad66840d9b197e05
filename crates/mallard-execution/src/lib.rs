//! Mallard Execution - vectorized pipeline execution engine
//!
//! Implements push-based pipeline execution over fixed-size columnar
//! chunks: one source feeds a chain of unary operators into a sink (push
//! mode) or back to the caller (pull mode). The pipeline executor keeps
//! the traversal re-entrant for operators that emit several output chunks
//! per input, coalesces sparse post-filter chunks through per-operator
//! caches, profiles every operator invocation, and polls the client
//! interrupt flag at each operator boundary.

pub mod cache;
pub mod chunk;
pub mod collection;
pub mod context;
pub mod executor;
pub mod expression;
pub mod operator;
pub mod operators;
pub mod pipeline;
pub mod profiler;
pub mod vector;

pub use chunk::DataChunk;
pub use collection::ChunkCollection;
pub use context::{ClientConfig, ClientContext, ExecutionContext};
pub use executor::PipelineExecutor;
pub use expression::{evaluate, BinaryOperator, Expression};
pub use operator::{Operator, OperatorResult, Sink, SinkResult, Source};
pub use pipeline::{Pipeline, QueryState};
pub use vector::{Vector, VECTOR_SIZE};
