//! Counterexample reconstruction for failed CTL properties, and the fair
//! lasso witness shared with the LTL decision procedure.

use crate::bdd::BddManager;
use crate::errors::CheckResult;
use crate::expr::{ExprArena, ExprId, Op};
use crate::fsm::BddFsm;
use crate::mc::eval::eval_ctl;
use crate::mc::fairness::fair_eg;
use crate::symbols::SymbolRegistry;
use crate::trace::synth::{constrained_path, cubes_to_trace};
use crate::trace::Trace;

use biodivine_lib_bdd::Bdd;

/// Build a linear counterexample for a failed property, starting from one
/// violating initial state. Universal connectives explain through their
/// existential duals; where no linear explanation exists the trace is the
/// single violating state.
pub fn counterexample(
    arena: &ExprArena,
    registry: &SymbolRegistry,
    manager: &mut BddManager,
    fsm: &BddFsm,
    expr: ExprId,
    violating: &Bdd,
) -> CheckResult<Option<Trace>> {
    let Some(seed) = manager.pick_one_state(violating) else {
        return Ok(None);
    };
    let universe = fsm.invar.and(manager.state_mask());

    let cubes: Option<(Vec<Bdd>, Option<usize>)> = match arena.op(expr) {
        Op::Ag => {
            // a path to a state violating the body
            let body = eval_ctl(arena, registry, manager, fsm, arena.left(expr))?;
            constrained_path(manager, fsm, &seed, &body.not().and(&universe), &universe)
                .map(|path| (path, None))
        }
        Op::Ax => {
            let body = eval_ctl(arena, registry, manager, fsm, arena.left(expr))?;
            let successors = fsm
                .forward_image(manager, &seed)
                .and(&body.not())
                .and(&universe);
            manager
                .pick_one_state(&successors)
                .map(|succ| (vec![seed.clone(), succ], None))
        }
        Op::Af => {
            // a fair lasso avoiding the body forever
            let body = eval_ctl(arena, registry, manager, fsm, arena.left(expr))?;
            let avoid = fair_eg(manager, fsm, &body.not());
            eg_witness(manager, fsm, &seed, &avoid)
        }
        Op::Au => {
            let f = eval_ctl(arena, registry, manager, fsm, arena.left(expr))?;
            let g = eval_ctl(arena, registry, manager, fsm, arena.right(expr))?;
            let not_g = g.not().and(&universe);
            // either reach a state violating both sides while g never held,
            // or stay away from g forever
            let stuck = f.not().and(&not_g);
            match constrained_path(manager, fsm, &seed, &stuck, &not_g) {
                Some(path) => Some((path, None)),
                None => {
                    let avoid = fair_eg(manager, fsm, &not_g);
                    eg_witness(manager, fsm, &seed, &avoid)
                }
            }
        }
        _ => None,
    };

    let trace = match cubes {
        Some((path, loopback)) => {
            cubes_to_trace(manager, registry, fsm, &path, "counterexample", loopback)
        }
        None => cubes_to_trace(manager, registry, fsm, &[seed], "counterexample", None),
    };
    Ok(Some(trace))
}

/// A lasso witness inside the fair-`EG` set `z`, seeded at `seed`: a stem
/// visiting every justice set (and every satisfiable compassion obligation)
/// followed by a closing edge back to an already-visited state. Returns the
/// state cubes and the loopback index.
pub fn eg_witness(
    manager: &BddManager,
    fsm: &BddFsm,
    seed: &Bdd,
    z: &Bdd,
) -> Option<(Vec<Bdd>, Option<usize>)> {
    if seed.and(z).is_false() {
        return None;
    }
    let mut targets: Vec<Bdd> = Vec::new();
    for justice in &fsm.justice {
        targets.push(z.and(justice));
    }
    for (p, q) in &fsm.compassion {
        let obligation = z.and(q);
        if !obligation.is_false() {
            targets.push(obligation);
        } else {
            // the pair is met by avoiding p; the cycle must stay clear of it
            targets.push(z.and(&p.not()));
        }
    }

    let mut path = vec![seed.clone()];
    let mut current = seed.clone();
    for target in &targets {
        if !current.and(target).is_false() {
            continue;
        }
        let segment = constrained_path(manager, fsm, &current, target, z)?;
        path.extend(segment.into_iter().skip(1));
        current = path.last().unwrap().clone();
    }

    // close the cycle with at least one transition
    let mut visited = manager.mk_false();
    for cube in &path {
        visited = visited.or(cube);
    }
    let after = fsm.forward_image(manager, &current).and(z);
    if after.is_false() {
        return None;
    }
    let closing = after.and(&visited);
    if !closing.is_false() {
        let back = manager.pick_one_state(&closing)?;
        let loopback = path.iter().position(|cube| *cube == back)?;
        path.push(back);
        return Some((path, Some(loopback)));
    }
    let segment = constrained_path(manager, fsm, &after, &visited, z)?;
    path.extend(segment);
    let last = path.last().unwrap().clone();
    let loopback = path.iter().position(|cube| *cube == last)?;
    Some((path, Some(loopback)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::ExprArena;
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
    /// A failed `AF` produces a lasso witness of the avoiding region.
    fn af_lasso() {
        let (mut arena, registry, mut manager, fsm) = counter();
        let expr = parse_expression("AF c = 4", &mut arena).unwrap();
        let initial = fsm.init.and(manager.state_mask());
        let trace = counterexample(&arena, &registry, &mut manager, &fsm, expr, &initial)
            .unwrap()
            .unwrap();
        assert!(trace.loopback.is_some());
        assert!(trace.len() >= 2);
    }

    #[test]
    /// A failed `AX` produces a two-state trace.
    fn ax_step() {
        let (mut arena, registry, mut manager, fsm) = counter();
        let expr = parse_expression("AX c = 2", &mut arena).unwrap();
        let initial = fsm.init.and(manager.state_mask());
        let trace = counterexample(&arena, &registry, &mut manager, &fsm, expr, &initial)
            .unwrap()
            .unwrap();
        assert_eq!(trace.len(), 2);
    }
}
