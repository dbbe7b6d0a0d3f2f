//! Cone of influence: the dependency closure of the variables a formula
//! mentions, and the machine restriction it induces.

use crate::expr::{ExprArena, ExprId};
use crate::fsm::SexpFsm;
use crate::symbols::SymbolRegistry;

use std::collections::{HashMap, HashSet};

/// The state and input variables an expression depends on, looking through
/// define bodies.
pub fn free_vars(arena: &ExprArena, registry: &SymbolRegistry, expr: ExprId) -> HashSet<String> {
    let mut vars = HashSet::new();
    let mut pending: Vec<ExprId> = vec![expr];
    let mut expanded: HashSet<String> = HashSet::new();
    while let Some(current) = pending.pop() {
        let mut names = HashSet::new();
        arena.collect_atom_names(current, &mut names);
        for name in names {
            if registry.is_symbol_var(&name) {
                vars.insert(name);
            } else if let Some(body) = registry.get_define_body(&name) {
                if expanded.insert(name) {
                    pending.push(body);
                }
            }
        }
    }
    vars
}

/// Compute the cone of influence of `expr`: starting from its variables,
/// close under co-occurrence inside any top-level conjunct of the initial,
/// invariant, transition, or fairness predicates.
pub fn cone_of_influence(
    arena: &ExprArena,
    registry: &SymbolRegistry,
    model: &SexpFsm,
    expr: ExprId,
) -> HashSet<String> {
    // variable -> all variables co-occurring with it in some constraint
    let mut coupled: HashMap<String, HashSet<String>> = HashMap::new();
    let mut couple = |group: HashSet<String>| {
        for var in &group {
            coupled.entry(var.clone()).or_default().extend(group.clone());
        }
    };
    for conjunct in SexpFsm::conjuncts(arena, model.init) {
        couple(free_vars(arena, registry, conjunct));
    }
    for conjunct in SexpFsm::conjuncts(arena, model.invar) {
        couple(free_vars(arena, registry, conjunct));
    }
    for conjunct in SexpFsm::conjuncts(arena, model.trans) {
        couple(free_vars(arena, registry, conjunct));
    }
    for &justice in &model.justice {
        couple(free_vars(arena, registry, justice));
    }
    for &(p, q) in &model.compassion {
        let mut group = free_vars(arena, registry, p);
        group.extend(free_vars(arena, registry, q));
        couple(group);
    }

    let mut cone = free_vars(arena, registry, expr);
    let mut frontier: Vec<String> = cone.iter().cloned().collect();
    while let Some(var) = frontier.pop() {
        if let Some(group) = coupled.get(&var) {
            for other in group {
                if cone.insert(other.clone()) {
                    frontier.push(other.clone());
                }
            }
        }
    }
    cone
}

/// Project a machine onto a cone: keep the conjuncts whose support lies
/// inside the cone, and the fairness constraints entirely inside it.
pub fn restrict_fsm(
    arena: &mut ExprArena,
    model: &SexpFsm,
    registry: &SymbolRegistry,
    cone: &HashSet<String>,
) -> SexpFsm {
    let keep = |arena: &mut ExprArena, predicate: ExprId| {
        let conjuncts = SexpFsm::conjuncts(arena, predicate);
        let mut kept = arena.mk_true();
        for conjunct in conjuncts {
            if free_vars(arena, registry, conjunct).is_subset(cone) {
                kept = arena.mk_and(kept, conjunct);
            }
        }
        kept
    };
    let init = keep(arena, model.init);
    let invar = keep(arena, model.invar);
    let trans = keep(arena, model.trans);
    let input = keep(arena, model.input);
    let justice = model
        .justice
        .iter()
        .copied()
        .filter(|&j| free_vars(arena, registry, j).is_subset(cone))
        .collect();
    let compassion = model
        .compassion
        .iter()
        .copied()
        .filter(|&(p, q)| {
            free_vars(arena, registry, p).is_subset(cone)
                && free_vars(arena, registry, q).is_subset(cone)
        })
        .collect();
    SexpFsm {
        init,
        invar,
        trans,
        input,
        justice,
        compassion,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::display_expr;
    use crate::preprocessing::{parse_expression, parse_model};

    #[test]
    /// Independent sub-machines separate; coupled variables stay together.
    fn closure_and_restriction() {
        let mut arena = ExprArena::new();
        let mut registry = SymbolRegistry::new();
        let model = parse_model(
            "VAR a : boolean; b : boolean; c : boolean;\n\
             INIT a = FALSE & c = FALSE\n\
             TRANS next(a) = !a & next(b) = (a | b) & next(c) = !c\n",
            &mut arena,
            &mut registry,
        )
        .unwrap();
        let sexp = SexpFsm::from_flat_model(&mut arena, &model);

        // `b` depends on `a`, but `c` is independent of both
        let formula = parse_expression("b", &mut arena).unwrap();
        let cone = cone_of_influence(&arena, &registry, &sexp, formula);
        assert!(cone.contains("a") && cone.contains("b"));
        assert!(!cone.contains("c"));

        let restricted = restrict_fsm(&mut arena, &sexp, &registry, &cone);
        let trans = display_expr(&arena, restricted.trans);
        assert!(trans.contains("next(a)"));
        assert!(trans.contains("next(b)"));
        assert!(!trans.contains("next(c)"));

        // the cone of `c` is `c` alone
        let formula = parse_expression("c", &mut arena).unwrap();
        let cone = cone_of_influence(&arena, &registry, &sexp, formula);
        assert_eq!(cone.len(), 1);
    }

    #[test]
    /// Defines are looked through when collecting variables.
    fn defines_are_transparent() {
        let mut arena = ExprArena::new();
        let mut registry = SymbolRegistry::new();
        let model = parse_model(
            "VAR a : boolean; b : boolean;\n\
             DEFINE both := a & b;\n\
             TRANS next(a) = a & next(b) = b\n",
            &mut arena,
            &mut registry,
        )
        .unwrap();
        let sexp = SexpFsm::from_flat_model(&mut arena, &model);
        let formula = parse_expression("both", &mut arena).unwrap();
        let cone = cone_of_influence(&arena, &registry, &sexp, formula);
        assert!(cone.contains("a") && cone.contains("b"));
    }
}
