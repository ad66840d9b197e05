//! Execution context
//!
//! The client context is shared by every executor of a query and carries
//! the interrupt flag and client configuration. The execution context is
//! per-executor: one client handle plus the per-thread state (profiler)
//! that operators may touch during a call.

use crate::profiler::OperatorProfiler;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Client-level execution settings
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Coalesce sparse post-filter chunks into dense ones
    pub enable_operator_caching: bool,
    /// Record per-operator timings
    pub enable_profiling: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            enable_operator_caching: true,
            enable_profiling: true,
        }
    }
}

/// Shared client handle: configuration plus the cooperative interrupt flag
#[derive(Debug, Default)]
pub struct ClientContext {
    interrupted: AtomicBool,
    config: ClientConfig,
}

impl ClientContext {
    pub fn new(config: ClientConfig) -> Self {
        ClientContext {
            interrupted: AtomicBool::new(false),
            config,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Request cooperative cancellation; observed at the next operator
    /// boundary
    pub fn interrupt(&self) {
        self.interrupted.store(true, Ordering::Relaxed);
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::Relaxed)
    }
}

/// Per-thread execution state
#[derive(Debug)]
pub struct ThreadContext {
    pub profiler: OperatorProfiler,
}

impl ThreadContext {
    pub fn new(client: &ClientContext) -> Self {
        ThreadContext {
            profiler: OperatorProfiler::new(client.config().enable_profiling),
        }
    }
}

/// The context handed into every operator invocation
#[derive(Debug)]
pub struct ExecutionContext {
    pub client: Arc<ClientContext>,
    pub thread: ThreadContext,
}

impl ExecutionContext {
    pub fn new(client: Arc<ClientContext>) -> Self {
        let thread = ThreadContext::new(&client);
        ExecutionContext { client, thread }
    }
}
