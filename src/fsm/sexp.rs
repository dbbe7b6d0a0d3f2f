//! The expression-level FSM: initial, invariant and transition predicates,
//! input constraints, and the fairness lists.

use crate::expr::{ExprArena, ExprId, Op};
use crate::preprocessing::model::{AssignKind, FlatModel};

/// An FSM whose pieces are plain expressions. The transition predicate may
/// refer to both the current and the next frame; all other predicates only
/// to the current one (inputs are current-frame by definition).
#[derive(Clone, Debug)]
pub struct SexpFsm {
    pub init: ExprId,
    pub invar: ExprId,
    pub trans: ExprId,
    pub input: ExprId,
    pub justice: Vec<ExprId>,
    pub compassion: Vec<(ExprId, ExprId)>,
}

impl SexpFsm {
    /// An FSM with no constraints at all.
    pub fn unconstrained(arena: &mut ExprArena) -> SexpFsm {
        let t = arena.mk_true();
        SexpFsm {
            init: t,
            invar: t,
            trans: t,
            input: t,
            justice: Vec::new(),
            compassion: Vec::new(),
        }
    }

    /// Assemble an FSM from a flattened model: constraint sections conjoin,
    /// assignments become equalities in their respective predicates.
    pub fn from_flat_model(arena: &mut ExprArena, model: &FlatModel) -> SexpFsm {
        let mut fsm = SexpFsm::unconstrained(arena);
        for &(expr, _) in &model.init {
            fsm.init = arena.mk_and(fsm.init, expr);
        }
        for &(expr, _) in &model.invar {
            fsm.invar = arena.mk_and(fsm.invar, expr);
        }
        for &(expr, _) in &model.trans {
            fsm.trans = arena.mk_and(fsm.trans, expr);
        }
        for assign in &model.assigns {
            let var = arena.mk_atom(&assign.var, assign.line);
            match assign.kind {
                AssignKind::Init => {
                    let constraint = assign_constraint(arena, var, assign.rhs);
                    fsm.init = arena.mk_and(fsm.init, constraint);
                }
                AssignKind::Current => {
                    let constraint = assign_constraint(arena, var, assign.rhs);
                    fsm.invar = arena.mk_and(fsm.invar, constraint);
                }
                AssignKind::Next => {
                    let next_var = arena.mk_next(var);
                    let constraint = assign_constraint(arena, next_var, assign.rhs);
                    fsm.trans = arena.mk_and(fsm.trans, constraint);
                }
            }
        }
        fsm.justice = model.justice.iter().map(|&(expr, _)| expr).collect();
        fsm.compassion = model
            .compassion
            .iter()
            .map(|&(p, q, _)| (p, q))
            .collect();
        fsm
    }

    /// Split a predicate into its top-level conjuncts.
    pub fn conjuncts(arena: &ExprArena, expr: ExprId) -> Vec<ExprId> {
        let mut out = Vec::new();
        let mut stack = vec![expr];
        while let Some(top) = stack.pop() {
            if arena.op(top) == Op::And {
                stack.push(arena.left(top));
                stack.push(arena.right(top));
            } else if !arena.is_true(top) {
                out.push(top);
            }
        }
        out.reverse();
        out
    }
}

/// The constraint form of `lhs := rhs`: set-valued right-hand sides turn
/// into membership, everything else into equality.
fn assign_constraint(arena: &mut ExprArena, lhs: ExprId, rhs: ExprId) -> ExprId {
    let op = match arena.op(rhs) {
        Op::Cons | Op::Union | Op::Range => Op::SetIn,
        _ => Op::Equal,
    };
    let line = arena.line(rhs);
    arena.intern(op, lhs, rhs, line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::display_expr;
    use crate::preprocessing::{parse_model, parse_expression};
    use crate::symbols::SymbolRegistry;

    #[test]
    /// Assignments land in the right predicate with the right shape.
    fn flat_model_assembly() {
        let mut arena = ExprArena::new();
        let mut registry = SymbolRegistry::new();
        let model = parse_model(
            "VAR x : boolean; c : 0..3;\n\
             ASSIGN init(x) := FALSE; next(x) := !x; \n\
             INIT c = 0\n\
             TRANS next(c) = c + 1\n",
            &mut arena,
            &mut registry,
        )
        .unwrap();
        let fsm = SexpFsm::from_flat_model(&mut arena, &model);

        assert_eq!(display_expr(&arena, fsm.init), "c = 0 & x = FALSE");
        assert_eq!(
            display_expr(&arena, fsm.trans),
            "next(c) = c + 1 & next(x) = (!x)"
        );
        assert!(arena.is_true(fsm.invar));
    }

    #[test]
    /// Set-valued assignment right-hand sides become membership.
    fn set_assignment() {
        let mut arena = ExprArena::new();
        let mut registry = SymbolRegistry::new();
        let model = parse_model(
            "VAR c : 0..3;\nASSIGN next(c) := {0, 1};\n",
            &mut arena,
            &mut registry,
        )
        .unwrap();
        let fsm = SexpFsm::from_flat_model(&mut arena, &model);
        assert_eq!(display_expr(&arena, fsm.trans), "next(c) in {0, 1}");
    }

    #[test]
    fn conjunct_splitting() {
        let mut arena = ExprArena::new();
        let expr = parse_expression("a & (b | c) & d", &mut arena).unwrap();
        let parts = SexpFsm::conjuncts(&arena, expr);
        let printed: Vec<String> = parts
            .iter()
            .map(|&part| display_expr(&arena, part))
            .collect();
        assert_eq!(printed, vec!["a", "b | c", "d"]);
    }
}
