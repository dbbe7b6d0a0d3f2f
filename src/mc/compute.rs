//! Quantitative `MIN`/`MAX` distance computation between state sets.

use crate::bdd::{expr_to_bdd, BddManager};
use crate::errors::CheckResult;
use crate::expr::{ExprArena, ExprId, Op};
use crate::fsm::BddFsm;
use crate::mc::eval::ex;
use crate::symbols::SymbolRegistry;

/// Result of a `COMPUTE` property.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ComputeResult {
    Finite(u64),
    Infinity,
}

impl std::fmt::Display for ComputeResult {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ComputeResult::Finite(value) => write!(f, "{value}"),
            ComputeResult::Infinity => write!(f, "infinity"),
        }
    }
}

/// Evaluate `MIN [ start , final ]` or `MAX [ start , final ]`: the
/// shortest (resp. longest) number of image steps separating a reachable
/// `start` state from a `final` state. `MAX` is infinite as soon as some
/// reachable `start` state cannot reach `final` at all.
pub fn compute_min_max(
    arena: &ExprArena,
    registry: &SymbolRegistry,
    manager: &mut BddManager,
    fsm: &BddFsm,
    expr: ExprId,
) -> CheckResult<ComputeResult> {
    let minimum = arena.op(expr) == Op::MinU;
    let start = expr_to_bdd(arena, registry, manager, arena.left(expr))?;
    let target = expr_to_bdd(arena, registry, manager, arena.right(expr))?;

    let reachable = &fsm.reachable(manager).total;
    let start = start.and(reachable).and(&fsm.invar);
    let target = target.and(&fsm.invar).and(manager.state_mask());
    if start.is_false() {
        return Ok(ComputeResult::Infinity);
    }

    // grow the backward distance-bounded region around the target
    let mut within = target;
    let mut distance: u64 = 0;
    loop {
        let hit = start.and(&within);
        let done = if minimum {
            !hit.is_false()
        } else {
            start.and_not(&within).is_false()
        };
        if done {
            return Ok(ComputeResult::Finite(distance));
        }
        let grown = within.or(&ex(manager, fsm, &within));
        if grown == within {
            return Ok(ComputeResult::Infinity);
        }
        within = grown;
        distance += 1;
    }
}
