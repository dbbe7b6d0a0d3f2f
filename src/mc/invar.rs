//! Invariant checking on the BDD FSM: plain forward reachability, and the
//! alternating forward/backward variant that stops at the first frontier
//! intersection.

use crate::bdd::{expr_to_bdd, BddManager};
use crate::errors::CheckResult;
use crate::expr::{ExprArena, ExprId};
use crate::fsm::BddFsm;
use crate::mc::eval::ex;
use crate::symbols::SymbolRegistry;
use crate::trace::synth::{cubes_to_trace, shortest_path_to};
use crate::trace::Trace;

use log::{debug, info};

/// Check the invariant `ψ` by forward reachability. A violation yields a
/// shortest path into the violating region.
pub fn check_invariant_forward(
    arena: &ExprArena,
    registry: &SymbolRegistry,
    manager: &mut BddManager,
    fsm: &BddFsm,
    expr: ExprId,
) -> CheckResult<(bool, Option<Trace>)> {
    let good = expr_to_bdd(arena, registry, manager, expr)?;
    let reachable = fsm.reachable(manager).total.clone();
    let violating = reachable.and_not(&good);
    if violating.is_false() {
        return Ok((true, None));
    }
    info!(
        "invariant violated by {} reachable states",
        manager.count_states(&violating)
    );
    let trace = shortest_path_to(manager, fsm, &violating)
        .map(|cubes| cubes_to_trace(manager, registry, fsm, &cubes, "counterexample", None));
    Ok((false, trace))
}

/// Check the invariant `ψ` by alternating one forward step from the initial
/// region with one backward step from the violating region, whichever
/// frontier is currently smaller. Stops at the first intersection (the
/// invariant fails) or when either side closes (the invariant holds).
pub fn check_invariant_forward_backward(
    arena: &ExprArena,
    registry: &SymbolRegistry,
    manager: &mut BddManager,
    fsm: &BddFsm,
    expr: ExprId,
) -> CheckResult<bool> {
    let good = expr_to_bdd(arena, registry, manager, expr)?;
    let bad = good.not().and(&fsm.invar).and(manager.state_mask());

    let mut forward = fsm.init.and(&fsm.invar).and(manager.state_mask());
    let mut backward = bad;
    if forward.is_false() || backward.is_false() {
        return Ok(true);
    }

    let mut forward_closed = false;
    let mut backward_closed = false;
    let mut steps = 0u32;
    loop {
        if !forward.and(&backward).is_false() {
            info!("invariant violated, frontiers met after {steps} steps");
            return Ok(false);
        }
        if forward_closed || backward_closed {
            return Ok(true);
        }
        // grow the currently smaller side
        if forward.size() <= backward.size() {
            let grown = forward.or(&fsm.forward_image(manager, &forward).and(&fsm.invar));
            forward_closed = grown == forward;
            forward = grown;
            debug!("forward step done: {} bdd nodes", forward.size());
        } else {
            let grown = backward.or(&ex(manager, fsm, &backward));
            backward_closed = grown == backward;
            backward = grown;
            debug!("backward step done: {} bdd nodes", backward.size());
        }
        steps += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsm::{PartitionMethod, SexpFsm};
    use crate::preprocessing::{parse_expression, parse_model};
    use crate::symbols::SymbolRegistry;

    fn counter() -> (ExprArena, SymbolRegistry, BddManager, BddFsm) {
        let mut arena = ExprArena::new();
        let mut registry = SymbolRegistry::new();
        let model = parse_model(
            "VAR c : 0..3;\nINIT c = 0\nTRANS next(c) = (c + 1) mod 4\n",
            &mut arena,
            &mut registry,
        )
        .unwrap();
        registry.encode_vars(&[]);
        let mut manager = BddManager::new(&registry);
        let sexp = SexpFsm::from_flat_model(&mut arena, &model);
        let fsm = BddFsm::build(
            &arena,
            &registry,
            &mut manager,
            &sexp,
            PartitionMethod::Monolithic,
        )
        .unwrap();
        (arena, registry, manager, fsm)
    }

    #[test]
    /// `c != 4` holds trivially, `c != 2` fails with a shortest path.
    fn forward_check() {
        let (mut arena, registry, mut manager, fsm) = counter();
        let good = parse_expression("c != 4", &mut arena).unwrap();
        let (verdict, _) =
            check_invariant_forward(&arena, &registry, &mut manager, &fsm, good).unwrap();
        assert!(verdict);

        let bad = parse_expression("c != 2", &mut arena).unwrap();
        let (verdict, trace) =
            check_invariant_forward(&arena, &registry, &mut manager, &fsm, bad).unwrap();
        assert!(!verdict);
        // 0 -> 1 -> 2 is the shortest violating path
        assert_eq!(trace.unwrap().len(), 3);
    }

    #[test]
    /// Both invariant strategies agree.
    fn strategies_agree() {
        for text in ["c != 4", "c != 2", "c < 4", "c > 0"] {
            let (mut arena, registry, mut manager, fsm) = counter();
            let expr = parse_expression(text, &mut arena).unwrap();
            let (forward, _) =
                check_invariant_forward(&arena, &registry, &mut manager, &fsm, expr).unwrap();
            let both =
                check_invariant_forward_backward(&arena, &registry, &mut manager, &fsm, expr)
                    .unwrap();
            assert_eq!(forward, both, "disagreement on {text}");
        }
    }
}
