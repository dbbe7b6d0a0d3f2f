//! Semantic checking of a flattened model before encoding: multiple
//! assignments, circular definitions, misuse of `next`, and input
//! variables in disallowed positions.

use crate::coi::free_vars;
use crate::errors::{CheckError, CheckResult};
use crate::expr::{ExprArena, ExprId, Op};
use crate::preprocessing::model::{AssignKind, FlatModel};
use crate::properties::PropKind;
use crate::symbols::SymbolRegistry;

use std::collections::{HashMap, HashSet};

/// Run all model-level checks. The first violation is reported.
pub fn check_model(
    arena: &ExprArena,
    registry: &SymbolRegistry,
    model: &FlatModel,
) -> CheckResult<()> {
    check_assignments(model)?;
    check_circular_definitions(arena, registry, model)?;
    check_next_usage(arena, model)?;
    check_input_positions(arena, registry, model)?;
    Ok(())
}

/// Canonical form of an assignable left-hand side.
fn lhs_name(kind: AssignKind, var: &str) -> String {
    match kind {
        AssignKind::Current => var.to_string(),
        AssignKind::Init => format!("init({var})"),
        AssignKind::Next => format!("next({var})"),
    }
}

/// Each left-hand side may be assigned once, and a direct assignment
/// excludes both the init and the next form.
fn check_assignments(model: &FlatModel) -> CheckResult<()> {
    let mut seen: HashMap<String, u32> = HashMap::new();
    for assign in &model.assigns {
        let name = lhs_name(assign.kind, &assign.var);
        let mut conflicting = vec![name.clone()];
        if assign.kind == AssignKind::Current {
            conflicting.push(lhs_name(AssignKind::Init, &assign.var));
            conflicting.push(lhs_name(AssignKind::Next, &assign.var));
        } else {
            conflicting.push(lhs_name(AssignKind::Current, &assign.var));
        }
        for key in conflicting {
            if let Some(&line) = seen.get(&key) {
                return Err(CheckError::MultipleAssignment {
                    lhs: name,
                    first_line: line,
                    second_line: assign.line,
                });
            }
        }
        seen.insert(name, assign.line);
    }
    Ok(())
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Open,
    Closed,
}

/// Walk right-hand sides through the define/assignment graph. A back-edge
/// into an open vertex is a circular definition.
fn check_circular_definitions(
    arena: &ExprArena,
    registry: &SymbolRegistry,
    model: &FlatModel,
) -> CheckResult<()> {
    // direct dependencies of each definitional symbol
    let mut deps: HashMap<String, (HashSet<String>, u32)> = HashMap::new();
    for name in registry.declaration_order() {
        if let Some(body) = registry.get_define_body(name) {
            let mut direct = HashSet::new();
            arena.collect_atom_names(body, &mut direct);
            deps.insert(name.clone(), (direct, arena.line(body)));
        }
    }
    for assign in &model.assigns {
        let mut direct = HashSet::new();
        match assign.kind {
            AssignKind::Current => {
                arena.collect_atom_names(assign.rhs, &mut direct);
                deps.insert(assign.var.clone(), (direct, assign.line));
            }
            AssignKind::Next => {
                // `next` is stripped at the boundary: next(v) := e may
                // only loop through other next-state references
                collect_next_scoped(arena, assign.rhs, &mut direct);
                deps.entry(format!("next({})", assign.var))
                    .or_insert((direct, assign.line));
            }
            AssignKind::Init => {}
        }
    }

    let mut marks: HashMap<String, Mark> = HashMap::new();
    let mut stack: Vec<String> = Vec::new();
    for name in deps.keys() {
        visit(name, &deps, &mut marks, &mut stack)?;
    }
    Ok(())
}

/// Symbols occurring under a `next(..)` inside the expression, plus
/// defines referenced anywhere (their bodies may hide a `next`).
fn collect_next_scoped(arena: &ExprArena, expr: ExprId, out: &mut HashSet<String>) {
    if expr.is_nil() {
        return;
    }
    if arena.op(expr) == Op::Next {
        let mut names = HashSet::new();
        arena.collect_atom_names(arena.left(expr), &mut names);
        out.extend(names.into_iter().map(|name| format!("next({name})")));
        return;
    }
    collect_next_scoped(arena, arena.left(expr), out);
    collect_next_scoped(arena, arena.right(expr), out);
}

fn visit(
    name: &str,
    deps: &HashMap<String, (HashSet<String>, u32)>,
    marks: &mut HashMap<String, Mark>,
    stack: &mut Vec<String>,
) -> CheckResult<()> {
    match marks.get(name) {
        Some(Mark::Closed) => return Ok(()),
        Some(Mark::Open) => {
            let line = deps.get(name).map(|(_, line)| *line).unwrap_or(0);
            return Err(CheckError::CircularDefinition {
                name: name.to_string(),
                line,
                stack: stack.clone(),
            });
        }
        None => {}
    }
    let Some((direct, _)) = deps.get(name) else {
        return Ok(());
    };
    marks.insert(name.to_string(), Mark::Open);
    stack.push(name.to_string());
    for dep in direct {
        visit(dep, deps, marks, stack)?;
    }
    stack.pop();
    marks.insert(name.to_string(), Mark::Closed);
    Ok(())
}

/// `next` nesting depth check: `depth` counts enclosing `next`s.
fn next_depth_ok(arena: &ExprArena, expr: ExprId, depth: u32, allowed: bool) -> CheckResult<()> {
    if expr.is_nil() {
        return Ok(());
    }
    if arena.op(expr) == Op::Next {
        let line = arena.line(expr);
        if depth > 0 {
            return Err(CheckError::NestedNext { line });
        }
        if !allowed {
            return Err(CheckError::UnexpectedNext { line });
        }
        return next_depth_ok(arena, arena.left(expr), depth + 1, allowed);
    }
    next_depth_ok(arena, arena.left(expr), depth, allowed)?;
    next_depth_ok(arena, arena.right(expr), depth, allowed)
}

/// `next` may appear (un-nested) in TRANS and in `next(v) := ...`
/// right-hand sides, nowhere else.
fn check_next_usage(arena: &ExprArena, model: &FlatModel) -> CheckResult<()> {
    for &(expr, _) in &model.trans {
        next_depth_ok(arena, expr, 0, true)?;
    }
    for &(expr, _) in &model.init {
        next_depth_ok(arena, expr, 0, false)?;
    }
    for &(expr, _) in &model.invar {
        next_depth_ok(arena, expr, 0, false)?;
    }
    for &(expr, _) in &model.justice {
        next_depth_ok(arena, expr, 0, false)?;
    }
    for &(p, q, _) in &model.compassion {
        next_depth_ok(arena, p, 0, false)?;
        next_depth_ok(arena, q, 0, false)?;
    }
    for assign in &model.assigns {
        let allowed = assign.kind == AssignKind::Next;
        next_depth_ok(arena, assign.rhs, 0, allowed)?;
    }
    Ok(())
}

fn reject_inputs(
    arena: &ExprArena,
    registry: &SymbolRegistry,
    expr: ExprId,
    position: &str,
) -> CheckResult<()> {
    for var in free_vars(arena, registry, expr) {
        if registry.is_input_var(&var) {
            return Err(CheckError::InputInDisallowedPosition {
                name: var,
                position: position.to_string(),
            });
        }
    }
    Ok(())
}

/// Input variables may only drive transitions: they are rejected in INIT,
/// INVAR, fairness constraints, and non-transition assignments.
fn check_input_positions(
    arena: &ExprArena,
    registry: &SymbolRegistry,
    model: &FlatModel,
) -> CheckResult<()> {
    for &(expr, _) in &model.init {
        reject_inputs(arena, registry, expr, "an INIT constraint")?;
    }
    for &(expr, _) in &model.invar {
        reject_inputs(arena, registry, expr, "an INVAR constraint")?;
    }
    for &(expr, _) in &model.justice {
        reject_inputs(arena, registry, expr, "a justice constraint")?;
    }
    for &(p, q, _) in &model.compassion {
        reject_inputs(arena, registry, p, "a compassion constraint")?;
        reject_inputs(arena, registry, q, "a compassion constraint")?;
    }
    for assign in &model.assigns {
        match assign.kind {
            AssignKind::Next => {}
            AssignKind::Init => {
                reject_inputs(arena, registry, assign.rhs, "an init(..) assignment")?;
            }
            AssignKind::Current => {
                reject_inputs(arena, registry, assign.rhs, "a direct assignment")?;
            }
        }
    }
    Ok(())
}

/// Property-level input restrictions: CTL and COMPUTE formulas reject
/// inputs; LTL formulas may mention them (they are rewritten away), and
/// invariants accept them outside of `next`.
pub fn check_property_inputs(
    arena: &ExprArena,
    registry: &SymbolRegistry,
    expr: ExprId,
    kind: PropKind,
) -> CheckResult<()> {
    match kind {
        PropKind::Ctl => reject_inputs(arena, registry, expr, "a CTL property"),
        PropKind::Compute => reject_inputs(arena, registry, expr, "a COMPUTE property"),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::parse_model;

    fn check(text: &str) -> CheckResult<()> {
        let mut arena = ExprArena::new();
        let mut registry = SymbolRegistry::new();
        let model = parse_model(text, &mut arena, &mut registry)?;
        check_model(&arena, &registry, &model)
    }

    #[test]
    /// Assigning the same left-hand side twice is an error, as is mixing a
    /// direct assignment with an init/next one.
    fn multiple_assignment() {
        let duplicate = "VAR x : boolean;\nASSIGN next(x) := x; next(x) := !x;\n";
        assert!(matches!(
            check(duplicate),
            Err(CheckError::MultipleAssignment { .. })
        ));
        let mixed = "VAR x : boolean;\nASSIGN x := TRUE; init(x) := FALSE;\n";
        assert!(matches!(
            check(mixed),
            Err(CheckError::MultipleAssignment { .. })
        ));
        let fine = "VAR x : boolean;\nASSIGN init(x) := FALSE; next(x) := !x;\n";
        assert!(check(fine).is_ok());
    }

    #[test]
    /// Recursive defines and assignment loops are caught.
    fn circular_definitions() {
        let through_defines = "VAR x : boolean;\nDEFINE a := b; b := a;\n";
        assert!(matches!(
            check(through_defines),
            Err(CheckError::CircularDefinition { .. })
        ));
        let through_assign = "VAR x : boolean; y : boolean;\n\
                              ASSIGN x := y & TRUE; y := x;\n";
        assert!(matches!(
            check(through_assign),
            Err(CheckError::CircularDefinition { .. })
        ));
        // next(x) := x is fine - the dependency crosses a time step
        let across_time = "VAR x : boolean;\nASSIGN next(x) := x;\n";
        assert!(check(across_time).is_ok());
        // but next(x) := next(x) loops inside one step
        let same_time = "VAR x : boolean;\nTRANS next(x) = x\n\
                         ASSIGN next(x) := !next(x);\n";
        assert!(matches!(
            check(same_time),
            Err(CheckError::CircularDefinition { .. })
        ));
    }

    #[test]
    /// `next` placement rules.
    fn next_usage() {
        assert!(matches!(
            check("VAR x : boolean;\nINIT next(x)\n"),
            Err(CheckError::UnexpectedNext { .. })
        ));
        assert!(matches!(
            check("VAR x : boolean;\nTRANS next(next(x))\n"),
            Err(CheckError::NestedNext { .. })
        ));
        assert!(check("VAR x : boolean;\nTRANS next(x) = !x\n").is_ok());
        assert!(matches!(
            check("VAR x : boolean;\nASSIGN init(x) := next(x);\n"),
            Err(CheckError::UnexpectedNext { .. })
        ));
    }

    #[test]
    /// Inputs are confined to transition right-hand sides.
    fn input_positions() {
        let in_init = "VAR x : boolean;\nIVAR i : boolean;\nINIT i\n";
        assert!(matches!(
            check(in_init),
            Err(CheckError::InputInDisallowedPosition { .. })
        ));
        let in_justice = "VAR x : boolean;\nIVAR i : boolean;\nJUSTICE i\n";
        assert!(matches!(
            check(in_justice),
            Err(CheckError::InputInDisallowedPosition { .. })
        ));
        let in_trans = "VAR x : boolean;\nIVAR i : boolean;\nTRANS next(x) = i\n";
        assert!(check(in_trans).is_ok());
    }
}
