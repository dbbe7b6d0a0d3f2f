//! Reconstruction of concrete traces from symbolic witnesses.

use crate::bdd::BddManager;
use crate::fsm::BddFsm;
use crate::symbols::SymbolRegistry;
use crate::trace::{Trace, TraceKind};

use biodivine_lib_bdd::Bdd;

/// A shortest path of single-state cubes from the initial region to a state
/// of `target`, guided by the reachability layering. `None` when no target
/// state is reachable.
pub fn shortest_path_to(manager: &BddManager, fsm: &BddFsm, target: &Bdd) -> Option<Vec<Bdd>> {
    let layers = fsm.reachable(manager).layers.clone();
    let distance = layers
        .iter()
        .position(|layer| !layer.and(target).is_false())?;
    let mut path = Vec::with_capacity(distance + 1);
    let mut current = manager.pick_one_state(&layers[distance].and(target))?;
    path.push(current.clone());
    for index in (0..distance).rev() {
        let predecessors = fsm.backward_image(manager, &current).and(&layers[index]);
        current = manager.pick_one_state(&predecessors)?;
        path.push(current.clone());
    }
    path.reverse();
    Some(path)
}

/// A shortest path of single-state cubes from `from` (one state cube) to a
/// state of `target`, staying inside `universe`. The returned path starts
/// at `from`; when `from` already intersects `target` it is the whole path.
pub fn constrained_path(
    manager: &BddManager,
    fsm: &BddFsm,
    from: &Bdd,
    target: &Bdd,
    universe: &Bdd,
) -> Option<Vec<Bdd>> {
    if !from.and(target).is_false() {
        return Some(vec![from.clone()]);
    }
    // breadth-first frontiers of fresh states; every state of frontier i+1
    // has a predecessor in frontier i
    let mut frontiers = vec![from.clone()];
    let mut visited = from.clone();
    let final_states = loop {
        let next = fsm
            .forward_image(manager, frontiers.last().unwrap())
            .and(universe);
        let hit = next.and(target);
        if !hit.is_false() {
            break hit;
        }
        let fresh = next.and_not(&visited);
        if fresh.is_false() {
            return None;
        }
        visited = visited.or(&fresh);
        frontiers.push(fresh);
    };
    let mut current = manager.pick_one_state(&final_states)?;
    let mut path = vec![current.clone()];
    for frontier in frontiers.iter().rev() {
        let predecessors = fsm.backward_image(manager, &current).and(frontier);
        current = manager.pick_one_state(&predecessors)?;
        path.push(current.clone());
    }
    path.reverse();
    Some(path)
}

/// Turn a sequence of single-state cubes into a trace, labelling every
/// transition with one concrete input assignment.
pub fn cubes_to_trace(
    manager: &BddManager,
    registry: &SymbolRegistry,
    fsm: &BddFsm,
    cubes: &[Bdd],
    name: &str,
    loopback: Option<usize>,
) -> Trace {
    let mut trace = Trace::new(name, TraceKind::CounterExample);
    trace.loopback = loopback;
    for (index, cube) in cubes.iter().enumerate() {
        let input = if index == 0 {
            None
        } else {
            let inputs = fsm.states_to_states_get_inputs(manager, &cubes[index - 1], cube);
            manager
                .pick_one_input(&inputs)
                .map(|cube| manager.decode_input(registry, &cube))
                .filter(|values| !values.is_empty())
        };
        trace.push_step(input, manager.decode_state(registry, cube));
    }
    trace
}
