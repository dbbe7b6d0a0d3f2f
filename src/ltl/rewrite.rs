//! Rewriting of LTL formulas that mention input variables.
//!
//! An input occurrence refers to the input consumed at the current state;
//! it is observed one step later. Each input `i` gets a fresh state
//! variable `p` with the transition constraint `next(p) = i`, boolean
//! occurrences become `X p`, and terms over non-boolean inputs expand into
//! a finite disjunction over the input's range with `X (p = value)`
//! conjuncts.

use crate::coi::free_vars;
use crate::errors::CheckResult;
use crate::expr::{ExprArena, ExprId, Op};
use crate::symbols::{ScalarValue, SymbolRegistry, VarRange};

use std::collections::{HashMap, HashSet};

/// Outcome of the input-lifting pass.
pub struct RewriteResult {
    /// The (possibly rewritten) formula.
    pub formula: ExprId,
    /// Fresh state variables to declare, with the range of their input.
    pub new_vars: Vec<(String, VarRange)>,
    /// `next(p) = i` constraints to conjoin onto the model transition.
    pub extra_trans: Vec<ExprId>,
    /// Whether anything was rewritten at all.
    pub rewritten: bool,
}

/// Lift every input-variable occurrence of `expr` into a fresh state
/// variable. `tag` keeps the fresh names of concurrently checked
/// properties apart.
pub fn rewrite_input_vars(
    arena: &mut ExprArena,
    registry: &SymbolRegistry,
    expr: ExprId,
    tag: usize,
) -> CheckResult<RewriteResult> {
    // defines are looked through, so hidden input occurrences count too
    let mut inputs: Vec<String> = free_vars(arena, registry, expr)
        .into_iter()
        .filter(|name| registry.is_input_var(name))
        .collect();
    inputs.sort();

    if inputs.is_empty() {
        return Ok(RewriteResult {
            formula: expr,
            new_vars: Vec::new(),
            extra_trans: Vec::new(),
            rewritten: false,
        });
    }

    let mut fresh: HashMap<String, String> = HashMap::new();
    let mut new_vars = Vec::new();
    let mut extra_trans = Vec::new();
    for input in &inputs {
        let fresh_name = format!("_ltl{tag}_p_{input}");
        let range = registry
            .get_var_range(input)
            .expect("input variables always carry a range")
            .clone();
        let input_atom = arena.mk_atom(input, 0);
        let fresh_atom = arena.mk_atom(&fresh_name, 0);
        let next_fresh = arena.mk_next(fresh_atom);
        extra_trans.push(arena.mk_equal(next_fresh, input_atom));
        new_vars.push((fresh_name.clone(), range));
        fresh.insert(input.clone(), fresh_name);
    }

    let formula = expand(arena, registry, expr, &fresh)?;
    Ok(RewriteResult {
        formula,
        new_vars,
        extra_trans,
        rewritten: true,
    })
}

fn mentions_input(arena: &ExprArena, registry: &SymbolRegistry, expr: ExprId) -> bool {
    free_vars(arena, registry, expr)
        .iter()
        .any(|name| registry.is_input_var(name))
}

/// Replace define atoms whose body mentions an input by their bodies, so
/// the expansion below sees every input occurrence syntactically.
fn inline_input_defines(
    arena: &mut ExprArena,
    registry: &SymbolRegistry,
    expr: ExprId,
) -> ExprId {
    if expr.is_nil() {
        return expr;
    }
    match arena.op(expr) {
        Op::Atom | Op::Dot => {
            let Some(name) = arena.qualified_name(expr) else {
                return expr;
            };
            match registry.get_define_body(&name) {
                Some(body) if mentions_input(arena, registry, body) => {
                    inline_input_defines(arena, registry, body)
                }
                _ => expr,
            }
        }
        Op::Number | Op::TrueExp | Op::FalseExp | Op::SelfExp | Op::Nil => expr,
        op => {
            let (left, right, line) = (arena.left(expr), arena.right(expr), arena.line(expr));
            let left = inline_input_defines(arena, registry, left);
            let right = inline_input_defines(arena, registry, right);
            arena.intern(op, left, right, line)
        }
    }
}

/// Walk the boolean/temporal structure; atomic terms that mention inputs
/// are expanded in place.
fn expand(
    arena: &mut ExprArena,
    registry: &SymbolRegistry,
    expr: ExprId,
    fresh: &HashMap<String, String>,
) -> CheckResult<ExprId> {
    if expr.is_nil() || !mentions_input(arena, registry, expr) {
        return Ok(expr);
    }
    let op = arena.op(expr);
    match op {
        Op::Atom | Op::Dot => {
            let name = arena.qualified_name(expr).unwrap_or_default();
            if let Some(body) = registry.get_define_body(&name) {
                // the input is hidden behind a define
                return expand(arena, registry, body, fresh);
            }
            // a boolean input occurrence becomes `X p`
            let lifted = arena.mk_atom(&fresh[&name], arena.line(expr));
            Ok(arena.intern(Op::LtlX, lifted, ExprId::NIL, arena.line(expr)))
        }
        // boolean and temporal structure is walked through
        Op::Not | Op::And | Op::Or | Op::Xor | Op::Iff | Op::Implies => {
            expand_children(arena, registry, expr, fresh)
        }
        op if op.is_ltl() => expand_children(arena, registry, expr, fresh),
        // an atomic term over inputs expands into a finite disjunction
        _ => expand_term(arena, registry, expr, fresh),
    }
}

fn expand_children(
    arena: &mut ExprArena,
    registry: &SymbolRegistry,
    expr: ExprId,
    fresh: &HashMap<String, String>,
) -> CheckResult<ExprId> {
    let op = arena.op(expr);
    let (left, right, line) = (arena.left(expr), arena.right(expr), arena.line(expr));
    let left = expand(arena, registry, left, fresh)?;
    let right = if right.is_nil() {
        ExprId::NIL
    } else {
        expand(arena, registry, right, fresh)?
    };
    Ok(arena.intern(op, left, right, line))
}

/// Expand a term like `x < i` into
/// `(x < v1 & X (p = v1)) | (x < v2 & X (p = v2)) | ...` over the range
/// of `i` (and the cartesian product when several inputs occur).
fn expand_term(
    arena: &mut ExprArena,
    registry: &SymbolRegistry,
    expr: ExprId,
    fresh: &HashMap<String, String>,
) -> CheckResult<ExprId> {
    let expr = inline_input_defines(arena, registry, expr);
    let mut names = HashSet::new();
    arena.collect_atom_names(expr, &mut names);
    let mut present: Vec<String> = names
        .into_iter()
        .filter(|name| registry.is_input_var(name))
        .collect();
    present.sort();

    let line = arena.line(expr);
    let mut disjuncts = vec![(expr, arena.mk_true())];
    for input in &present {
        let range = registry.get_var_range(input).unwrap().values.clone();
        let fresh_atom = arena.mk_atom(&fresh[input], line);
        let mut expanded = Vec::new();
        for value in &range {
            let value_expr = scalar_to_expr(arena, value, line);
            for &(term, guard) in &disjuncts {
                let substituted = substitute_atom(arena, term, input, value_expr);
                let capture_eq = arena.mk_equal(fresh_atom, value_expr);
                let capture = arena.intern(Op::LtlX, capture_eq, ExprId::NIL, line);
                let guard = arena.mk_and(guard, capture);
                expanded.push((substituted, guard));
            }
        }
        disjuncts = expanded;
    }

    let mut result = arena.mk_false();
    for (term, guard) in disjuncts {
        let conjunct = arena.mk_and(term, guard);
        result = arena.mk_or(result, conjunct);
    }
    Ok(result)
}

fn scalar_to_expr(arena: &mut ExprArena, value: &ScalarValue, line: u32) -> ExprId {
    match value {
        ScalarValue::Bool(true) => arena.mk_true(),
        ScalarValue::Bool(false) => arena.mk_false(),
        ScalarValue::Int(value) => arena.mk_number(*value, line),
        ScalarValue::Sym(name) => arena.mk_atom(name, line),
    }
}

/// Replace every occurrence of the named atom by `replacement`.
fn substitute_atom(
    arena: &mut ExprArena,
    expr: ExprId,
    name: &str,
    replacement: ExprId,
) -> ExprId {
    if expr.is_nil() {
        return expr;
    }
    match arena.op(expr) {
        Op::Atom if arena.atom_str(expr) == name => replacement,
        Op::Atom | Op::Number | Op::TrueExp | Op::FalseExp | Op::SelfExp | Op::Nil => expr,
        op => {
            let (left, right, line) = (arena.left(expr), arena.right(expr), arena.line(expr));
            let left = substitute_atom(arena, left, name, replacement);
            let right = substitute_atom(arena, right, name, replacement);
            arena.intern(op, left, right, line)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::display_expr;
    use crate::preprocessing::parse_expression;

    fn registry_with_inputs() -> SymbolRegistry {
        let mut registry = SymbolRegistry::new();
        registry
            .declare_state_var("x", VarRange::from_interval(0, 3).unwrap(), 1)
            .unwrap();
        registry
            .declare_input_var("i", VarRange::boolean(), 2)
            .unwrap();
        registry
            .declare_input_var("j", VarRange::from_interval(0, 1).unwrap(), 3)
            .unwrap();
        registry
    }

    #[test]
    /// A formula without inputs is returned untouched.
    fn no_inputs_no_rewrite() {
        let mut arena = ExprArena::new();
        let registry = registry_with_inputs();
        let expr = parse_expression("G x = 0", &mut arena).unwrap();
        let result = rewrite_input_vars(&mut arena, &registry, expr, 0).unwrap();
        assert!(!result.rewritten);
        assert_eq!(result.formula, expr);
    }

    #[test]
    /// A boolean input becomes `X p`.
    fn boolean_occurrence() {
        let mut arena = ExprArena::new();
        let registry = registry_with_inputs();
        let expr = parse_expression("G i", &mut arena).unwrap();
        let result = rewrite_input_vars(&mut arena, &registry, expr, 7).unwrap();
        assert!(result.rewritten);
        assert_eq!(display_expr(&arena, result.formula), "G X _ltl7_p_i");
        assert_eq!(result.new_vars.len(), 1);
        assert_eq!(
            display_expr(&arena, result.extra_trans[0]),
            "next(_ltl7_p_i) = i"
        );
    }

    #[test]
    /// A relational term over a non-boolean input expands into the finite
    /// disjunction over its range.
    fn term_expansion() {
        let mut arena = ExprArena::new();
        let registry = registry_with_inputs();
        let expr = parse_expression("G (x < j)", &mut arena).unwrap();
        let result = rewrite_input_vars(&mut arena, &registry, expr, 0).unwrap();
        let printed = display_expr(&arena, result.formula);
        assert_eq!(
            printed,
            "G (x < 0 & X _ltl0_p_j = 0 | x < 1 & X _ltl0_p_j = 1)"
        );
    }
}
