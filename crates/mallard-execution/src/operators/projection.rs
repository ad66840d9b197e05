//! Projection operator

use crate::chunk::DataChunk;
use crate::context::ExecutionContext;
use crate::expression::{evaluate, Expression};
use crate::operator::{EmptyState, Operator, OperatorResult, OperatorState};
use mallard_common::{LogicalType, Result};

/// Computes one output column per expression
pub struct ProjectionOperator {
    expressions: Vec<Expression>,
    types: Vec<LogicalType>,
}

impl ProjectionOperator {
    pub fn new(expressions: Vec<Expression>, types: Vec<LogicalType>) -> Self {
        assert_eq!(expressions.len(), types.len());
        ProjectionOperator { expressions, types }
    }
}

impl Operator for ProjectionOperator {
    fn name(&self) -> &str {
        "projection"
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
            for (col_idx, expr) in self.expressions.iter().enumerate() {
                let value = evaluate(expr, input, row_idx)?;
                chunk.column_mut(col_idx).push_value(value);
            }
        }
        chunk.set_row_count(input.row_count());
        Ok(OperatorResult::NeedMoreInput)
    }
}
