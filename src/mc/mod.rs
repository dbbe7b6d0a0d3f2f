//! The BDD-based model checker: CTL evaluation with fairness, the AG-only
//! fast path, invariant checking, and quantitative MIN/MAX computation.

pub mod agonly;
pub mod compute;
pub mod eval;
pub mod explain;
pub mod fairness;
pub mod invar;

pub use compute::{compute_min_max, ComputeResult};
pub use eval::eval_ctl;

use crate::bdd::BddManager;
use crate::errors::CheckResult;
use crate::expr::{ExprArena, ExprId};
use crate::fsm::BddFsm;
use crate::symbols::SymbolRegistry;
use crate::trace::Trace;

/// Check a CTL property: the machine satisfies `expr` iff every fair
/// initial state does. Returns the verdict and, on failure, a
/// counterexample trace when one could be reconstructed.
pub fn check_ctl_spec(
    arena: &ExprArena,
    registry: &SymbolRegistry,
    manager: &mut BddManager,
    fsm: &BddFsm,
    expr: ExprId,
) -> CheckResult<(bool, Option<Trace>)> {
    // the AG-only fragment runs on plain reachability
    if agonly::is_ag_only(arena, expr) {
        return agonly::check_ag_only(arena, registry, manager, fsm, expr);
    }

    let satisfying = eval_ctl(arena, registry, manager, fsm, expr)?;
    let mut initial = fsm.init.and(&fsm.invar).and(manager.state_mask());
    if fsm.has_fairness() {
        initial = initial.and(fsm.fair_states(manager));
    }
    let violating = initial.and_not(&satisfying);
    if violating.is_false() {
        return Ok((true, None));
    }

    let trace = explain::counterexample(arena, registry, manager, fsm, expr, &violating)?;
    Ok((false, trace))
}
