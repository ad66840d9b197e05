//! Limit operator

use crate::chunk::DataChunk;
use crate::context::ExecutionContext;
use crate::operator::{Operator, OperatorResult, OperatorState};
use mallard_common::{Error, LogicalType, Result};
use std::any::Any;

/// Skips `offset` rows, passes through `limit` rows, then reports
/// finished so the executor can stop pulling from the source.
pub struct LimitOperator {
    limit: usize,
    offset: usize,
    types: Vec<LogicalType>,
}

impl LimitOperator {
    pub fn new(limit: usize, offset: usize, types: Vec<LogicalType>) -> Self {
        LimitOperator {
            limit,
            offset,
            types,
        }
    }
}

#[derive(Default)]
struct LimitState {
    skipped: usize,
    returned: usize,
}

impl OperatorState for LimitState {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl Operator for LimitOperator {
    fn name(&self) -> &str {
        "limit"
    }

    fn types(&self) -> &[LogicalType] {
        &self.types
    }

    fn operator_state(&self) -> Box<dyn OperatorState> {
        Box::<LimitState>::default()
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
            .downcast_mut::<LimitState>()
            .ok_or_else(|| Error::Internal("unexpected operator state for limit".to_string()))?;

        if state.returned >= self.limit {
            return Ok(OperatorResult::Finished);
        }

        for row_idx in 0..input.row_count() {
            if state.skipped < self.offset {
                state.skipped += 1;
                continue;
            }
            if state.returned >= self.limit {
                break;
            }
            chunk.append_row(&input.row_values(row_idx));
            state.returned += 1;
        }
        Ok(OperatorResult::NeedMoreInput)
    }
}
