//! Filter operator

use crate::chunk::DataChunk;
use crate::context::ExecutionContext;
use crate::expression::{evaluate, Expression};
use crate::operator::{EmptyState, Operator, OperatorResult, OperatorState};
use mallard_common::{LogicalType, Result, Value};

/// Keeps the rows for which the predicate evaluates to true. NULL counts
/// as false. Opts into output caching since a selective predicate leaves
/// sparse chunks behind.
pub struct FilterOperator {
    predicate: Expression,
    types: Vec<LogicalType>,
}

impl FilterOperator {
    pub fn new(predicate: Expression, types: Vec<LogicalType>) -> Self {
        FilterOperator { predicate, types }
    }
}

impl Operator for FilterOperator {
    fn name(&self) -> &str {
        "filter"
    }

    fn types(&self) -> &[LogicalType] {
        &self.types
    }

    fn operator_state(&self) -> Box<dyn OperatorState> {
        Box::new(EmptyState)
    }

    fn execute(
        &self,
        _context: &mut ExecutionContext,
        input: &DataChunk,
        chunk: &mut DataChunk,
        _state: &mut dyn OperatorState,
    ) -> Result<OperatorResult> {
        for row_idx in 0..input.row_count() {
            let keep = evaluate(&self.predicate, input, row_idx)?;
            if keep == Value::Boolean(true) {
                chunk.append_row(&input.row_values(row_idx));
            }
        }
        Ok(OperatorResult::NeedMoreInput)
    }

    fn requires_cache(&self) -> bool {
        true
    }
}
