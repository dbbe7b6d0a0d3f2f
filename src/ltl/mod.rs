//! LTL model checking through the symbolic tableau construction: rewrite
//! inputs away, synthesize the tableau of the negated formula, compose it
//! with the model, and decide feasibility of a fair path.

pub mod rewrite;
pub mod tableau;

use crate::bdd::BddManager;
use crate::errors::CheckResult;
use crate::expr::{ExprArena, ExprId};
use crate::fsm::{BddFsm, PartitionMethod, SexpFsm};
use crate::mc::explain::eg_witness;
use crate::symbols::SymbolRegistry;
use crate::trace::synth::cubes_to_trace;
use crate::trace::Trace;

use log::{debug, info};

/// Check an LTL property on the given machine. `tag` disambiguates the
/// auxiliary variables introduced for this property.
///
/// The registry is pushed before any auxiliary variable is declared and
/// popped on every exit path, so tableau variables never outlive the check.
pub fn check_ltl_spec(
    arena: &mut ExprArena,
    registry: &mut SymbolRegistry,
    model: &SexpFsm,
    expr: ExprId,
    tag: usize,
    method: PartitionMethod,
) -> CheckResult<(bool, Option<Trace>)> {
    registry.push_status();
    let result = check_ltl_inner(arena, registry, model, expr, tag, method);
    registry.pop_status();
    result
}

fn check_ltl_inner(
    arena: &mut ExprArena,
    registry: &mut SymbolRegistry,
    model: &SexpFsm,
    expr: ExprId,
    tag: usize,
    method: PartitionMethod,
) -> CheckResult<(bool, Option<Trace>)> {
    // lift input-variable occurrences into fresh state variables
    let rewritten = rewrite::rewrite_input_vars(arena, registry, expr, tag)?;
    let mut model = model.clone();
    for (name, range) in &rewritten.new_vars {
        registry.declare_state_var(name, range.clone(), arena.line(expr))?;
    }
    for &extra in &rewritten.extra_trans {
        model.trans = arena.mk_and(model.trans, extra);
    }
    if rewritten.rewritten {
        debug!(
            "rewrote {} input variable(s) into fresh state variables",
            rewritten.new_vars.len()
        );
    }

    // tableau of the negated formula
    let negated = arena.mk_not(rewritten.formula);
    let tableau = tableau::build_tableau(arena, registry, negated, tag)?;

    // both machines are (re)encoded under the current partitioning
    registry.encode_vars(&[]);
    let mut manager = BddManager::new(registry);
    let mut product = BddFsm::build(arena, registry, &mut manager, &model, method)?;
    let tableau_fsm = BddFsm::build(arena, registry, &mut manager, &tableau.fsm, method)?;
    product.apply_synchronous_product(&tableau_fsm);

    // the property fails iff a fair path exists in the product
    let feasible = product.fair_states(&manager).clone();
    let bad = product
        .init
        .and(&product.invar)
        .and(manager.state_mask())
        .and(&feasible);
    if bad.is_false() {
        return Ok((true, None));
    }
    info!("fair path found in the tableau product, property is false");

    let Some(seed) = manager.pick_one_state(&bad) else {
        return Ok((false, None));
    };
    let witness = eg_witness(&manager, &product, &seed, &feasible).map(|(cubes, loopback)| {
        let trace = cubes_to_trace(&manager, registry, &product, &cubes, "counterexample", loopback);
        hide_auxiliary_vars(trace, tag)
    });
    Ok((false, witness))
}

/// Drop the tableau-introduced variables from a produced trace; they are
/// not part of the user's model.
fn hide_auxiliary_vars(mut trace: Trace, tag: usize) -> Trace {
    let prefix = format!("_ltl{tag}_");
    for state in &mut trace.states {
        state.retain(|(name, _)| !name.starts_with(&prefix));
    }
    trace
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::{parse_expression, parse_model};
    use crate::symbols::SymbolRegistry;

    fn check(model_text: &str, formula: &str) -> (bool, Option<Trace>) {
        let mut arena = ExprArena::new();
        let mut registry = SymbolRegistry::new();
        let model = parse_model(model_text, &mut arena, &mut registry).unwrap();
        registry.encode_vars(&[]);
        let sexp = SexpFsm::from_flat_model(&mut arena, &model);
        let expr = parse_expression(formula, &mut arena).unwrap();
        check_ltl_spec(
            &mut arena,
            &mut registry,
            &sexp,
            expr,
            0,
            PartitionMethod::Monolithic,
        )
        .unwrap()
    }

    const TOGGLE: &str = "VAR x : boolean;\nINIT x = FALSE\nTRANS next(x) = !x\n";
    const COUNTER: &str = "VAR c : 0..3;\nINIT c = 0\nTRANS next(c) = (c + 1) mod 4\n";

    #[test]
    fn toggle_properties() {
        assert!(check(TOGGLE, "G (x | !x)").0);
        assert!(check(TOGGLE, "F x").0);
        assert!(check(TOGGLE, "G F x").0);
        assert!(check(TOGGLE, "G F !x").0);
        assert!(!check(TOGGLE, "G !x").0);
        assert!(!check(TOGGLE, "F G x").0);
        assert!(check(TOGGLE, "X x").0);
        assert!(!check(TOGGLE, "X !x").0);
    }

    #[test]
    fn counter_properties() {
        assert!(check(COUNTER, "F c = 3").0);
        assert!(check(COUNTER, "G (c = 0 -> X c = 1)").0);
        assert!(check(COUNTER, "(c = 0) U (c = 1)").0);
        assert!(check(COUNTER, "(c < 3) V (c <= 3)").0);
        assert!(!check(COUNTER, "G c < 3").0);
        assert!(check(COUNTER, "G F c = 2").0);
    }

    #[test]
    /// Past-time operators work through the history variables.
    fn past_operators() {
        assert!(check(COUNTER, "G (c = 1 -> Y c = 0)").0);
        assert!(check(COUNTER, "G (c = 3 -> O c = 0)").0);
        assert!(!check(COUNTER, "G (c = 1 -> Y c = 2)").0);
        assert!(check(COUNTER, "G (c = 2 -> (c = 2) S (c = 1))").0);
    }

    #[test]
    /// A failing property produces a lasso-shaped counterexample without
    /// auxiliary variables in it.
    fn counterexample_shape() {
        let (verdict, trace) = check(TOGGLE, "G !x");
        assert!(!verdict);
        let trace = trace.unwrap();
        assert!(trace.loopback.is_some());
        for state in &trace.states {
            assert!(state.iter().all(|(name, _)| name == "x"));
        }
    }

    #[test]
    /// Input variables in the formula are lifted into fresh state
    /// variables capturing the consumed input.
    fn input_lifting_end_to_end() {
        let model = "VAR x : boolean;\nIVAR i : boolean;\n\
                     INIT x = FALSE\nTRANS next(x) = i\n";
        // next(x) = i makes the next value of x the consumed input
        assert!(check(model, "G (X x <-> i)").0);
        assert!(!check(model, "G i").0);
        assert!(check(model, "G (i -> X x)").0);
    }

    #[test]
    /// After the check all auxiliary declarations are popped again.
    fn registry_is_clean() {
        let mut arena = ExprArena::new();
        let mut registry = SymbolRegistry::new();
        let model = parse_model(TOGGLE, &mut arena, &mut registry).unwrap();
        registry.encode_vars(&[]);
        let before = registry.declaration_order().to_vec();
        let sexp = SexpFsm::from_flat_model(&mut arena, &model);
        let expr = parse_expression("G F x", &mut arena).unwrap();
        check_ltl_spec(
            &mut arena,
            &mut registry,
            &sexp,
            expr,
            3,
            PartitionMethod::Threshold(100),
        )
        .unwrap();
        assert_eq!(registry.declaration_order(), before.as_slice());
    }
}
