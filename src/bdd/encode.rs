//! Lowering of expressions to BDDs.

use crate::bdd::manager::BddManager;
use crate::encode::Evaluator;
use crate::errors::CheckResult;
use crate::expr::{ExprArena, ExprId};
use crate::symbols::SymbolRegistry;

use biodivine_lib_bdd::Bdd;

/// Evaluate a Boolean expression over the current-state frame.
pub fn expr_to_bdd(
    arena: &ExprArena,
    registry: &SymbolRegistry,
    manager: &mut BddManager,
    expr: ExprId,
) -> CheckResult<Bdd> {
    Evaluator::new(arena, registry, manager).eval_bool(expr, false)
}

/// Evaluate a Boolean expression directly inside the next-state frame.
pub fn expr_to_bdd_next(
    arena: &ExprArena,
    registry: &SymbolRegistry,
    manager: &mut BddManager,
    expr: ExprId,
) -> CheckResult<Bdd> {
    Evaluator::new(arena, registry, manager).eval_bool(expr, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::parse_expression;
    use crate::symbols::{SymbolRegistry, VarRange};

    fn setup() -> (ExprArena, SymbolRegistry, BddManager) {
        let mut arena = ExprArena::new();
        let mut registry = SymbolRegistry::new();
        registry
            .declare_state_var("x", VarRange::boolean(), 1)
            .unwrap();
        registry
            .declare_state_var("c", VarRange::from_interval(0, 3).unwrap(), 2)
            .unwrap();
        registry
            .declare_input_var("i", VarRange::boolean(), 3)
            .unwrap();
        let body = parse_expression("c = 0 | c = 3", &mut arena).unwrap();
        registry.declare_define("edge", ExprId::NIL, body, 4).unwrap();
        registry.encode_vars(&[]);
        let manager = BddManager::new(&registry);
        (arena, registry, manager)
    }

    fn eval(text: &str) -> f64 {
        let (mut arena, registry, mut manager) = setup();
        let expr = parse_expression(text, &mut arena).unwrap();
        let bdd = expr_to_bdd(&arena, &registry, &mut manager, expr).unwrap();
        manager.count_states(&bdd.and(manager.state_mask()))
    }

    #[test]
    /// The evaluated sets agree with exhaustive enumeration of the 8 states.
    fn boolean_function_agreement() {
        assert_eq!(eval("TRUE"), 8.0);
        assert_eq!(eval("FALSE"), 0.0);
        assert_eq!(eval("x"), 4.0);
        assert_eq!(eval("c = 0"), 2.0);
        assert_eq!(eval("c < 2"), 4.0);
        assert_eq!(eval("c = 0 | c = 1 | c = 2 | c = 3"), 8.0);
        assert_eq!(eval("x & c != 1"), 3.0);
        assert_eq!(eval("c + 1 = 2"), 2.0);
        assert_eq!(eval("(c + 1) mod 4 = 0"), 2.0);
        assert_eq!(eval("c in {0, 2}"), 4.0);
        assert_eq!(eval("c in 1..3"), 6.0);
        assert_eq!(eval("edge"), 4.0);
        assert_eq!(eval("case x : c = 0; 1 : c = 3; esac"), 2.0);
    }

    #[test]
    /// Defines that expand themselves are reported as circular.
    fn circular_define() {
        let mut arena = ExprArena::new();
        let mut registry = SymbolRegistry::new();
        let body_a = parse_expression("b", &mut arena).unwrap();
        let body_b = parse_expression("a", &mut arena).unwrap();
        registry.declare_define("a", ExprId::NIL, body_a, 1).unwrap();
        registry.declare_define("b", ExprId::NIL, body_b, 2).unwrap();
        registry.encode_vars(&[]);
        let mut manager = BddManager::new(&registry);
        let expr = parse_expression("a", &mut arena).unwrap();
        let result = expr_to_bdd(&arena, &registry, &mut manager, expr);
        assert!(matches!(
            result,
            Err(crate::errors::CheckError::CircularDefinition { .. })
        ));
    }

    #[test]
    /// `next(...)` moves the evaluation into the next-state frame, and the
    /// renaming brings it back.
    fn next_frame_round_trip() {
        let (mut arena, registry, mut manager) = setup();
        let curr = parse_expression("c = 2", &mut arena).unwrap();
        let next = parse_expression("next(c) = 2", &mut arena).unwrap();
        let curr_bdd = expr_to_bdd(&arena, &registry, &mut manager, curr).unwrap();
        let next_bdd = expr_to_bdd(&arena, &registry, &mut manager, next).unwrap();
        assert_ne!(curr_bdd, next_bdd);
        assert_eq!(manager.next_to_current(&next_bdd), curr_bdd);
        assert_eq!(manager.current_to_next(&curr_bdd), next_bdd);
    }

    #[test]
    /// Shannon composition substitutes a function for a variable.
    fn compose_substitutes() {
        let (mut arena, registry, mut manager) = setup();
        let f = parse_expression("x & c = 0", &mut arena).unwrap();
        let g = parse_expression("c = 2", &mut arena).unwrap();
        let expected = parse_expression("c = 2 & c = 0", &mut arena).unwrap();
        let f = expr_to_bdd(&arena, &registry, &mut manager, f).unwrap();
        let g = expr_to_bdd(&arena, &registry, &mut manager, g).unwrap();
        let expected = expr_to_bdd(&arena, &registry, &mut manager, expected).unwrap();
        let x_position = registry.encoding().bits_of("x").unwrap()[0];
        let composed = manager.compose(&f, manager.curr_var(x_position), &g);
        assert_eq!(composed, expected);
    }

    #[test]
    /// Randomized picks always land inside the set and respect the mask.
    fn pick_one_state_rand() {
        use rand::prelude::StdRng;
        use rand::SeedableRng;

        let (mut arena, registry, mut manager) = setup();
        let expr = parse_expression("c != 1", &mut arena).unwrap();
        let set = expr_to_bdd(&arena, &registry, &mut manager, expr).unwrap();
        let mut rng = StdRng::seed_from_u64(17);
        for _ in 0..16 {
            let picked = manager.pick_one_state_rand(&set, &mut rng).unwrap();
            assert_eq!(manager.count_states(&picked), 1.0);
            assert!(picked.and_not(&set).is_false());
        }
        let empty = manager.mk_false();
        assert!(manager.pick_one_state_rand(&empty, &mut rng).is_none());
    }

    #[test]
    /// Deterministic picks return a single valid state.
    fn pick_one_state() {
        let (mut arena, registry, mut manager) = setup();
        let expr = parse_expression("c = 1", &mut arena).unwrap();
        let set = expr_to_bdd(&arena, &registry, &mut manager, expr).unwrap();
        let picked = manager.pick_one_state(&set).unwrap();
        assert_eq!(manager.count_states(&picked), 1.0);
        // picking twice is deterministic
        assert_eq!(manager.pick_one_state(&set).unwrap(), picked);
        let values = manager.decode_state(&registry, &picked);
        assert!(values
            .iter()
            .any(|(name, value)| name == "c" && value.to_string() == "1"));
    }
}
