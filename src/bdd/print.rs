//! Rendering of state and input assignments as `symbol = value` lines.

use crate::bdd::manager::BddManager;
use crate::symbols::{ScalarValue, SymbolRegistry};

use biodivine_lib_bdd::Bdd;

/// Format a single-state cube, one `symbol = value` line per variable.
/// With `changes_only`, variables whose value equals the one in `previous`
/// are suppressed.
pub fn format_state(
    manager: &BddManager,
    registry: &SymbolRegistry,
    cube: &Bdd,
    previous: Option<&[(String, ScalarValue)]>,
    changes_only: bool,
) -> Vec<String> {
    let values = manager.decode_state(registry, cube);
    let mut lines = Vec::new();
    for (name, value) in &values {
        if changes_only {
            if let Some(previous) = previous {
                if previous.iter().any(|(n, v)| n == name && v == value) {
                    continue;
                }
            }
        }
        lines.push(format!("{name} = {value}"));
    }
    lines
}

/// Format a single-input cube.
pub fn format_input(manager: &BddManager, registry: &SymbolRegistry, cube: &Bdd) -> Vec<String> {
    manager
        .decode_input(registry, cube)
        .iter()
        .map(|(name, value)| format!("{name} = {value}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bdd::encode::expr_to_bdd;
    use crate::expr::ExprArena;
    use crate::preprocessing::parse_expression;
    use crate::symbols::{SymbolRegistry, VarRange};

    #[test]
    /// `changes_only` suppresses unchanged variables.
    fn changes_only_output() {
        let mut arena = ExprArena::new();
        let mut registry = SymbolRegistry::new();
        registry
            .declare_state_var("x", VarRange::boolean(), 1)
            .unwrap();
        registry
            .declare_state_var("c", VarRange::from_interval(0, 3).unwrap(), 2)
            .unwrap();
        registry.encode_vars(&[]);
        let mut manager = BddManager::new(&registry);

        let first = parse_expression("!x & c = 0", &mut arena).unwrap();
        let second = parse_expression("!x & c = 1", &mut arena).unwrap();
        let first = expr_to_bdd(&arena, &registry, &mut manager, first).unwrap();
        let second = expr_to_bdd(&arena, &registry, &mut manager, second).unwrap();
        let first = manager.pick_one_state(&first).unwrap();
        let second = manager.pick_one_state(&second).unwrap();

        let full = format_state(&manager, &registry, &first, None, false);
        assert_eq!(full, vec!["x = FALSE".to_string(), "c = 0".to_string()]);

        let previous = manager.decode_state(&registry, &first);
        let delta = format_state(&manager, &registry, &second, Some(&previous), true);
        assert_eq!(delta, vec!["c = 1".to_string()]);
    }
}
