//! SAT-based invariant checking: the plain bounded check and the
//! base/step induction scheme with state uniqueness.

use crate::be::{expr_to_be, Be, BeManager, BeVar};
use crate::errors::CheckResult;
use crate::expr::{ExprArena, ExprId};
use crate::fsm::BeFsm;
use crate::symbols::SymbolRegistry;

/// `Base(k)`: a path from the initial states on which the invariant holds
/// for `k` steps and fails at step `k`.
pub fn invar_base_problem(
    arena: &ExprArena,
    registry: &SymbolRegistry,
    manager: &mut BeManager,
    fsm: &BeFsm,
    invariant: ExprId,
    k: u32,
) -> CheckResult<Be> {
    let good = expr_to_be(arena, registry, manager, invariant)?;
    let init = manager.shift_curr_next_to_time(fsm.init, 0);
    let invar = manager.shift_curr_next_to_time(fsm.invar, 0);
    let mut problem = manager.be_and(init, invar);
    for time in 0..k {
        let holds = manager.shift_curr_next_to_time(good, time);
        let trans = manager.shift_curr_next_to_time(fsm.trans, time);
        let invar = manager.shift_curr_next_to_time(fsm.invar, time + 1);
        let step = manager.be_and(holds, trans);
        let step = manager.be_and(step, invar);
        problem = manager.be_and(problem, step);
    }
    let failure = manager.shift_curr_next_to_time(good, k);
    Ok(manager.be_and(problem, failure.not()))
}

/// `Step(k)`: `k` transitions through pairwise distinct states on which
/// the invariant holds, ending in a state where it fails.
pub fn invar_step_problem(
    arena: &ExprArena,
    registry: &SymbolRegistry,
    manager: &mut BeManager,
    fsm: &BeFsm,
    invariant: ExprId,
    k: u32,
) -> CheckResult<Be> {
    let good = expr_to_be(arena, registry, manager, invariant)?;
    let invar0 = manager.shift_curr_next_to_time(fsm.invar, 0);
    let mut problem = invar0;
    for time in 0..k {
        let holds = manager.shift_curr_next_to_time(good, time);
        let trans = manager.shift_curr_next_to_time(fsm.trans, time);
        let invar = manager.shift_curr_next_to_time(fsm.invar, time + 1);
        let step = manager.be_and(holds, trans);
        let step = manager.be_and(step, invar);
        problem = manager.be_and(problem, step);
    }
    let failure = manager.shift_curr_next_to_time(good, k);
    let problem = manager.be_and(problem, failure.not());
    let unique = unique_states(manager, registry, k);
    Ok(manager.be_and(problem, unique))
}

/// Pairwise distinctness of the state cubes at times `0..k-1`: for every
/// pair some state bit differs.
fn unique_states(manager: &mut BeManager, registry: &SymbolRegistry, k: u32) -> Be {
    let encoding = registry.encoding();
    let state_positions: Vec<usize> = (0..encoding.bit_count())
        .filter(|&position| !encoding.bit(position).input)
        .collect();
    let mut unique = manager.be_true();
    for i in 0..k {
        for j in (i + 1)..k {
            let mut differ = manager.be_false();
            for &position in &state_positions {
                let at_i = manager.mk_var(BeVar::StateAt { position, time: i });
                let at_j = manager.mk_var(BeVar::StateAt { position, time: j });
                let xor = manager.be_xor(at_i, at_j);
                differ = manager.be_or(differ, xor);
            }
            unique = manager.be_and(unique, differ);
        }
    }
    unique
}
