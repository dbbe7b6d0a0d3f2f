//! The fast path for formulas built only from `AG`, conjunction and
//! propositional parts, checked directly against forward reachability.

use crate::bdd::{expr_to_bdd, BddManager};
use crate::errors::CheckResult;
use crate::expr::{ExprArena, ExprId, Op};
use crate::fsm::BddFsm;
use crate::mc::eval::contains_temporal;
use crate::symbols::SymbolRegistry;
use crate::trace::synth::{cubes_to_trace, shortest_path_to};
use crate::trace::Trace;

/// Is the formula a conjunction of `AG`s over propositional bodies (bodies
/// may themselves conjoin further `AG`s)?
pub fn is_ag_only(arena: &ExprArena, expr: ExprId) -> bool {
    match arena.op(expr) {
        Op::And => is_ag_only(arena, arena.left(expr)) && is_ag_only(arena, arena.right(expr)),
        Op::Ag => body_ok(arena, arena.left(expr)),
        _ => false,
    }
}

fn body_ok(arena: &ExprArena, expr: ExprId) -> bool {
    if !contains_temporal(arena, expr) {
        return true;
    }
    match arena.op(expr) {
        Op::And => body_ok(arena, arena.left(expr)) && body_ok(arena, arena.right(expr)),
        Op::Ag => body_ok(arena, arena.left(expr)),
        _ => false,
    }
}

/// Strip `AG` and conjunction down to the conjunction of the propositional
/// parts (sound because `AG` distributes over conjunction and absorbs
/// nested `AG`s).
fn strip(arena: &ExprArena, expr: ExprId, leaves: &mut Vec<ExprId>) {
    match arena.op(expr) {
        Op::And => {
            strip(arena, arena.left(expr), leaves);
            strip(arena, arena.right(expr), leaves);
        }
        Op::Ag => strip(arena, arena.left(expr), leaves),
        _ => leaves.push(expr),
    }
}

/// Decide an AG-only formula over the reachable states; a violation yields
/// a shortest counterexample path through the distance layering.
pub fn check_ag_only(
    arena: &ExprArena,
    registry: &SymbolRegistry,
    manager: &mut BddManager,
    fsm: &BddFsm,
    expr: ExprId,
) -> CheckResult<(bool, Option<Trace>)> {
    let mut leaves = Vec::new();
    strip(arena, expr, &mut leaves);
    let mut body = manager.mk_true();
    for leaf in leaves {
        body = body.and(&expr_to_bdd(arena, registry, manager, leaf)?);
    }

    let reachable = fsm.reachable(manager).total.clone();
    let violating = reachable.and_not(&body);
    if violating.is_false() {
        return Ok((true, None));
    }
    let trace = shortest_path_to(manager, fsm, &violating)
        .map(|cubes| cubes_to_trace(manager, registry, fsm, &cubes, "counterexample", None));
    Ok((false, trace))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsm::{PartitionMethod, SexpFsm};
    use crate::preprocessing::{parse_expression, parse_model};
    use crate::symbols::SymbolRegistry;

    fn toggle() -> (ExprArena, SymbolRegistry, BddManager, BddFsm) {
        let mut arena = ExprArena::new();
        let mut registry = SymbolRegistry::new();
        let model = parse_model(
            "VAR x : boolean;\nINIT x = FALSE\nTRANS next(x) = !x\n",
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
    fn recognizer() {
        let mut arena = ExprArena::new();
        let ag = parse_expression("AG (x = 0 | x = 1)", &mut arena).unwrap();
        assert!(is_ag_only(&arena, ag));
        let conj = parse_expression("AG a & AG (b & AG c)", &mut arena).unwrap();
        assert!(is_ag_only(&arena, conj));
        let not_ag = parse_expression("AG EF a", &mut arena).unwrap();
        assert!(!is_ag_only(&arena, not_ag));
        let bare = parse_expression("a & b", &mut arena).unwrap();
        assert!(!is_ag_only(&arena, bare));
    }

    #[test]
    /// The two-state toggle satisfies `AG (x | !x)` and violates `AG !x`
    /// with a length-1 counterexample.
    fn toggle_verdicts() {
        let (mut arena, registry, mut manager, fsm) = toggle();
        let good = parse_expression("AG (x | !x)", &mut arena).unwrap();
        let (verdict, trace) = check_ag_only(&arena, &registry, &mut manager, &fsm, good).unwrap();
        assert!(verdict);
        assert!(trace.is_none());

        let bad = parse_expression("AG !x", &mut arena).unwrap();
        let (verdict, trace) = check_ag_only(&arena, &registry, &mut manager, &fsm, bad).unwrap();
        assert!(!verdict);
        let trace = trace.unwrap();
        assert_eq!(trace.len(), 2);
        assert_eq!(trace.states[0][0].1.to_string(), "FALSE");
        assert_eq!(trace.states[1][0].1.to_string(), "TRUE");
    }

    #[test]
    /// The fast path and the general evaluator agree on the verdict.
    fn agrees_with_general_path() {
        let (mut arena, registry, mut manager, fsm) = toggle();
        for text in ["AG (x | !x)", "AG !x", "AG x"] {
            let expr = parse_expression(text, &mut arena).unwrap();
            let (fast, _) =
                check_ag_only(&arena, &registry, &mut manager, &fsm, expr).unwrap();
            let set =
                crate::mc::eval::eval_ctl(&arena, &registry, &mut manager, &fsm, expr).unwrap();
            let initial = fsm.init.and(&fsm.invar).and(manager.state_mask());
            let general = initial.and_not(&set).is_false();
            assert_eq!(fast, general, "disagreement on {text}");
        }
    }
}
