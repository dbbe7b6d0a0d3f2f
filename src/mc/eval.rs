//! The mutual-recursive CTL evaluator and its fixpoint primitives.

use crate::bdd::{expr_to_bdd, BddManager};
use crate::errors::{CheckError, CheckResult};
use crate::expr::{ExprArena, ExprId, Op};
use crate::fsm::BddFsm;
use crate::symbols::SymbolRegistry;

use biodivine_lib_bdd::Bdd;

/// `EX set` without fairness: predecessors inside the invariant.
pub fn ex(manager: &BddManager, fsm: &BddFsm, set: &Bdd) -> Bdd {
    fsm.backward_image(manager, set).and(&fsm.invar)
}

/// `AX set` without fairness.
pub fn ax(manager: &BddManager, fsm: &BddFsm, set: &Bdd) -> Bdd {
    ex(manager, fsm, &set.not()).not()
}

/// `E [ f U g ]` without fairness: least fixpoint `Z = g | (f & EX Z)`.
pub fn eu(manager: &BddManager, fsm: &BddFsm, f: &Bdd, g: &Bdd) -> Bdd {
    let mut result = g.clone();
    loop {
        let expanded = result.or(&f.and(&ex(manager, fsm, &result)));
        if expanded == result {
            return result;
        }
        result = expanded;
    }
}

/// `EG f` without fairness: greatest fixpoint `Z = f & EX Z`.
pub fn eg(manager: &BddManager, fsm: &BddFsm, f: &Bdd) -> Bdd {
    let mut result = f.and(&fsm.invar);
    loop {
        let restricted = result.and(&ex(manager, fsm, &result));
        if restricted == result {
            return result;
        }
        result = restricted;
    }
}

/// Does the formula contain a temporal (CTL or LTL) operator anywhere?
pub fn contains_temporal(arena: &ExprArena, expr: ExprId) -> bool {
    if expr.is_nil() {
        return false;
    }
    let op = arena.op(expr);
    op.is_ctl()
        || op.is_ltl()
        || contains_temporal(arena, arena.left(expr))
        || contains_temporal(arena, arena.right(expr))
}

/// Evaluate a CTL formula to the set of states satisfying it, refining the
/// existential operators by the fair states when fairness is declared.
pub fn eval_ctl(
    arena: &ExprArena,
    registry: &SymbolRegistry,
    manager: &mut BddManager,
    fsm: &BddFsm,
    expr: ExprId,
) -> CheckResult<Bdd> {
    // formulas without temporal operators evaluate directly
    if !contains_temporal(arena, expr) {
        return expr_to_bdd(arena, registry, manager, expr);
    }
    let fair = if fsm.has_fairness() {
        fsm.fair_states(manager).clone()
    } else {
        manager.mk_true()
    };
    eval_rec(arena, registry, manager, fsm, expr, &fair)
}

fn eval_rec(
    arena: &ExprArena,
    registry: &SymbolRegistry,
    manager: &mut BddManager,
    fsm: &BddFsm,
    expr: ExprId,
    fair: &Bdd,
) -> CheckResult<Bdd> {
    if !contains_temporal(arena, expr) {
        return expr_to_bdd(arena, registry, manager, expr);
    }
    let op = arena.op(expr);
    let line = arena.line(expr);
    match op {
        Op::Not => {
            let operand = eval_rec(arena, registry, manager, fsm, arena.left(expr), fair)?;
            Ok(operand.not())
        }
        Op::And | Op::Or | Op::Xor | Op::Iff | Op::Implies => {
            let left = eval_rec(arena, registry, manager, fsm, arena.left(expr), fair)?;
            let right = eval_rec(arena, registry, manager, fsm, arena.right(expr), fair)?;
            Ok(match op {
                Op::And => left.and(&right),
                Op::Or => left.or(&right),
                Op::Xor => left.xor(&right),
                Op::Iff => left.iff(&right),
                _ => left.imp(&right),
            })
        }
        Op::Ex => {
            let operand = eval_rec(arena, registry, manager, fsm, arena.left(expr), fair)?;
            Ok(ex(manager, fsm, &operand.and(fair)))
        }
        Op::Ax => {
            let operand = eval_rec(arena, registry, manager, fsm, arena.left(expr), fair)?;
            Ok(ex(manager, fsm, &operand.not().and(fair)).not())
        }
        Op::Ef => {
            let operand = eval_rec(arena, registry, manager, fsm, arena.left(expr), fair)?;
            let tt = manager.mk_true();
            Ok(eu(manager, fsm, &tt, &operand.and(fair)))
        }
        Op::Ag => {
            // AG f = !EF !f
            let operand = eval_rec(arena, registry, manager, fsm, arena.left(expr), fair)?;
            let tt = manager.mk_true();
            Ok(eu(manager, fsm, &tt, &operand.not().and(fair)).not())
        }
        Op::Eg => {
            let operand = eval_rec(arena, registry, manager, fsm, arena.left(expr), fair)?;
            Ok(crate::mc::fairness::fair_eg(manager, fsm, &operand))
        }
        Op::Af => {
            // AF f = !EG !f
            let operand = eval_rec(arena, registry, manager, fsm, arena.left(expr), fair)?;
            Ok(crate::mc::fairness::fair_eg(manager, fsm, &operand.not()).not())
        }
        Op::Eu => {
            let left = eval_rec(arena, registry, manager, fsm, arena.left(expr), fair)?;
            let right = eval_rec(arena, registry, manager, fsm, arena.right(expr), fair)?;
            Ok(eu(manager, fsm, &left, &right.and(fair)))
        }
        Op::Au => {
            // A[f U g] = !(E[!g U (!f & !g)] | EG !g)
            let left = eval_rec(arena, registry, manager, fsm, arena.left(expr), fair)?;
            let right = eval_rec(arena, registry, manager, fsm, arena.right(expr), fair)?;
            let not_g = right.not();
            let both = left.not().and(&not_g).and(fair);
            let until = eu(manager, fsm, &not_g, &both);
            let globally = crate::mc::fairness::fair_eg(manager, fsm, &not_g);
            Ok(until.or(&globally).not())
        }
        Op::Ebu | Op::Abu => {
            let until = arena.left(expr);
            let (low, high) = bounds_of(arena, arena.right(expr), line)?;
            let left = eval_rec(arena, registry, manager, fsm, arena.left(until), fair)?;
            let right = eval_rec(arena, registry, manager, fsm, arena.right(until), fair)?;
            let right = right.and(fair);
            Ok(bounded_until(manager, fsm, &left, &right, low, high, op == Op::Ebu))
        }
        Op::Ebf | Op::Abf => {
            let (low, high) = bounds_of(arena, arena.right(expr), line)?;
            let operand = eval_rec(arena, registry, manager, fsm, arena.left(expr), fair)?;
            let operand = operand.and(fair);
            let tt = manager.mk_true();
            Ok(bounded_until(manager, fsm, &tt, &operand, low, high, op == Op::Ebf))
        }
        Op::Ebg | Op::Abg => {
            // E/A-bounded-globally through the bounded-finally dual
            let (low, high) = bounds_of(arena, arena.right(expr), line)?;
            let operand = eval_rec(arena, registry, manager, fsm, arena.left(expr), fair)?;
            let negated = operand.not().and(fair);
            let tt = manager.mk_true();
            let dual = bounded_until(manager, fsm, &tt, &negated, low, high, op == Op::Abg);
            Ok(dual.not())
        }
        other if other.is_ltl() => Err(CheckError::TypeError(format!(
            "line {line}: LTL operator {other:?} inside a CTL formula"
        ))),
        other => Err(CheckError::TypeError(format!(
            "line {line}: operator {other:?} is not a CTL connective"
        ))),
    }
}

fn bounds_of(arena: &ExprArena, range: ExprId, line: u32) -> CheckResult<(u32, u32)> {
    let low = arena.number_value(arena.left(range));
    let high = arena.number_value(arena.right(range));
    match (low, high) {
        (Some(low), Some(high)) if low >= 0 && high >= low => Ok((low as u32, high as u32)),
        (Some(low), Some(high)) => Err(CheckError::InvalidSubrange { low, high }),
        _ => Err(CheckError::TypeError(format!(
            "line {line}: malformed bound on a bounded temporal operator"
        ))),
    }
}

/// `E/A [ f BU low..high g ]`: the until fixpoint iterated exactly between
/// `low` and `high` image steps.
fn bounded_until(
    manager: &BddManager,
    fsm: &BddFsm,
    f: &Bdd,
    g: &Bdd,
    low: u32,
    high: u32,
    existential: bool,
) -> Bdd {
    let step = |set: &Bdd| {
        if existential {
            ex(manager, fsm, set)
        } else {
            ax(manager, fsm, set)
        }
    };
    let mut result = g.clone();
    // between the bounds the target may be reached at any step
    for _ in low..high {
        result = g.or(&f.and(&step(&result)));
    }
    // below the lower bound a step must still be taken
    for _ in 0..low {
        result = f.and(&step(&result));
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsm::{PartitionMethod, SexpFsm};
    use crate::preprocessing::{parse_expression, parse_model};
    use crate::symbols::SymbolRegistry;

    /// The modulo-4 counter used across the fixpoint tests.
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

    fn holds(text: &str) -> bool {
        let (mut arena, registry, mut manager, fsm) = counter();
        let expr = parse_expression(text, &mut arena).unwrap();
        let set = eval_ctl(&arena, &registry, &mut manager, &fsm, expr).unwrap();
        let initial = fsm.init.and(&fsm.invar).and(manager.state_mask());
        initial.and_not(&set).is_false()
    }

    #[test]
    fn counter_properties() {
        assert!(holds("AG (c = 0 | c = 1 | c = 2 | c = 3)"));
        assert!(holds("AF c = 3"));
        assert!(holds("AG AF c = 0"));
        assert!(holds("EX c = 1"));
        assert!(!holds("EX c = 2"));
        assert!(holds("A [ c < 3 U c = 3 ]"));
        assert!(holds("E [ c < 3 U c = 3 ]"));
        assert!(!holds("AG c = 0"));
        assert!(holds("EBF 0..3 c = 3"));
        assert!(!holds("EBF 0..2 c = 3"));
        assert!(holds("ABF 3..3 c = 3"));
    }

    #[test]
    /// `A[f U g]` equals its dual decomposition.
    fn au_duality() {
        let (mut arena, registry, mut manager, fsm) = counter();
        let direct = parse_expression("A [ c < 2 U c = 2 ]", &mut arena).unwrap();
        let dual =
            parse_expression("!(E [ !(c = 2) U !(c < 2) & !(c = 2) ] | EG !(c = 2))", &mut arena)
                .unwrap();
        let direct = eval_ctl(&arena, &registry, &mut manager, &fsm, direct).unwrap();
        let dual = eval_ctl(&arena, &registry, &mut manager, &fsm, dual).unwrap();
        let mask = manager.state_mask();
        assert_eq!(direct.and(mask), dual.and(mask));
    }

    #[test]
    /// Without fairness `EG TRUE` is every (non-deadlocked) state; with an
    /// unreachable justice set it shrinks accordingly.
    fn eg_true_fairness() {
        let (mut arena, registry, mut manager, fsm) = counter();
        let expr = parse_expression("EG TRUE", &mut arena).unwrap();
        let set = eval_ctl(&arena, &registry, &mut manager, &fsm, expr).unwrap();
        assert_eq!(manager.count_states(&set.and(manager.state_mask())), 4.0);
    }
}
