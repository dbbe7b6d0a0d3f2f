//! Lowering of expressions to circuit form.

use crate::be::{Be, BeManager};
use crate::encode::Evaluator;
use crate::errors::CheckResult;
use crate::expr::{ExprArena, ExprId};
use crate::symbols::SymbolRegistry;

/// Evaluate a Boolean expression into an untimed circuit term. Current and
/// next-state occurrences become untimed current/next variables; the BMC
/// unrolling later shifts them to concrete time frames.
pub fn expr_to_be(
    arena: &ExprArena,
    registry: &SymbolRegistry,
    manager: &mut BeManager,
    expr: ExprId,
) -> CheckResult<Be> {
    manager.sync_inputs(registry);
    Evaluator::new(arena, registry, manager).eval_bool(expr, false)
}
