//! The BDD-level FSM: images, reachability with distance layering, cached
//! fair states, and the machine well-formedness report.

use crate::bdd::{expr_to_bdd, BddManager};
use crate::errors::CheckResult;
use crate::expr::{ExprArena, ExprId};
use crate::fsm::partition::{PartitionMethod, TransPartition};
use crate::fsm::sexp::SexpFsm;
use crate::symbols::SymbolRegistry;

use biodivine_lib_bdd::{Bdd, BddVariable};
use log::warn;

use std::cell::OnceCell;

/// The forward-reachability result: the full set plus the distance layering
/// (layer `i` holds the states first reached after exactly `i` steps).
#[derive(Clone, Debug)]
pub struct ReachableStates {
    pub layers: Vec<Bdd>,
    pub total: Bdd,
}

/// A BDD-encoded FSM. Fair states and reachability are computed lazily and
/// cached for the lifetime of the machine.
pub struct BddFsm {
    pub init: Bdd,
    pub invar: Bdd,
    pub input: Bdd,
    pub trans: TransPartition,
    pub justice: Vec<Bdd>,
    pub compassion: Vec<(Bdd, Bdd)>,
    fair: OnceCell<Bdd>,
    reachable: OnceCell<ReachableStates>,
}

impl BddFsm {
    /// Encode an expression-level FSM. Degenerate pieces (empty initial
    /// region, empty invariant, empty fairness sets) are diagnosed but not
    /// fatal.
    pub fn build(
        arena: &ExprArena,
        registry: &SymbolRegistry,
        manager: &mut BddManager,
        fsm: &SexpFsm,
        method: PartitionMethod,
    ) -> CheckResult<BddFsm> {
        let init = expr_to_bdd(arena, registry, manager, fsm.init)?;
        let invar = expr_to_bdd(arena, registry, manager, fsm.invar)?;
        let input = expr_to_bdd(arena, registry, manager, fsm.input)?;

        let mut factors = Vec::new();
        for conjunct in SexpFsm::conjuncts(arena, fsm.trans) {
            factors.push(expr_to_bdd(arena, registry, manager, conjunct)?);
        }
        let trans = TransPartition::new(manager, factors, method);

        let mut justice = Vec::new();
        for &expr in &fsm.justice {
            let set = expr_to_bdd(arena, registry, manager, expr)?;
            if set.and(manager.state_mask()).is_false() {
                warn!("justice constraint is an empty set of states");
            }
            justice.push(set);
        }
        let mut compassion = Vec::new();
        for &(p, q) in &fsm.compassion {
            let p = expr_to_bdd(arena, registry, manager, p)?;
            let q = expr_to_bdd(arena, registry, manager, q)?;
            compassion.push((p, q));
        }

        if init.and(&invar).and(manager.state_mask()).is_false() {
            warn!("the initial region is empty");
        }
        if invar.and(manager.state_mask()).is_false() {
            warn!("the invariant region is empty");
        }

        Ok(BddFsm {
            init,
            invar,
            input,
            trans,
            justice,
            compassion,
            fair: OnceCell::new(),
            reachable: OnceCell::new(),
        })
    }

    pub fn partition_method(&self) -> PartitionMethod {
        self.trans.method()
    }

    /// States with a `T`-successor of `set`, over current-frame variables.
    pub fn backward_image(&self, manager: &BddManager, set: &Bdd) -> Bdd {
        let target = manager.current_to_next(&set.and(manager.state_mask()));
        let quantify: Vec<BddVariable> = manager
            .next_state_vars()
            .iter()
            .chain(manager.input_vars().iter())
            .copied()
            .collect();
        let masked = target.and(&self.input.and(manager.input_mask()));
        self.trans.relational_product(&masked, &quantify)
    }

    /// `T`-successors of `set`, renamed back to the current frame.
    pub fn forward_image(&self, manager: &BddManager, set: &Bdd) -> Bdd {
        let quantify: Vec<BddVariable> = manager
            .curr_state_vars()
            .iter()
            .chain(manager.input_vars().iter())
            .copied()
            .collect();
        let source = set
            .and(manager.state_mask())
            .and(&self.input.and(manager.input_mask()));
        let image = self.trans.relational_product(&source, &quantify);
        manager.next_to_current(&image)
    }

    /// The reachable states (with the mandatory distance layering),
    /// computed on first use.
    pub fn reachable(&self, manager: &BddManager) -> &ReachableStates {
        self.reachable.get_or_init(|| {
            let mut total = self.init.and(&self.invar).and(manager.state_mask());
            let mut layers = vec![total.clone()];
            let mut frontier = total.clone();
            let mut distance = 0usize;
            while !frontier.is_false() {
                let image = self.forward_image(manager, &frontier).and(&self.invar);
                frontier = image.and_not(&total);
                if frontier.is_false() {
                    break;
                }
                distance += 1;
                log::debug!(
                    "reachability: distance {distance}, frontier size {} nodes",
                    frontier.size()
                );
                total = total.or(&frontier);
                layers.push(frontier.clone());
            }
            ReachableStates { layers, total }
        })
    }

    /// States from which a fair path exists, computed on first use.
    pub fn fair_states(&self, manager: &BddManager) -> &Bdd {
        self.fair
            .get_or_init(|| crate::mc::fairness::compute_fair_states(manager, self))
    }

    pub fn has_fairness(&self) -> bool {
        !self.justice.is_empty() || !self.compassion.is_empty()
    }

    /// The inputs labelling transitions from `from` states to `to` states.
    pub fn states_to_states_get_inputs(&self, manager: &BddManager, from: &Bdd, to: &Bdd) -> Bdd {
        let target = manager.current_to_next(&to.and(manager.state_mask()));
        let source = from.and(manager.state_mask()).and(&target);
        let quantify: Vec<BddVariable> = manager
            .curr_state_vars()
            .iter()
            .chain(manager.next_state_vars().iter())
            .copied()
            .collect();
        self.trans
            .relational_product(&source, &quantify)
            .and(&self.input)
            .and(manager.input_mask())
    }

    /// Synchronous product: predicates conjoin, fairness unites. The other
    /// machine's clusters are appended, keeping the partitioning.
    pub fn apply_synchronous_product(&mut self, other: &BddFsm) {
        self.init = self.init.and(&other.init);
        self.invar = self.invar.and(&other.invar);
        self.input = self.input.and(&other.input);
        self.trans.extend(&other.trans);
        self.justice.extend(other.justice.iter().cloned());
        self.compassion.extend(other.compassion.iter().cloned());
        self.fair = OnceCell::new();
        self.reachable = OnceCell::new();
    }

    /// Well-formedness report: total/reachable sizes, the emptiness of the
    /// initial region, whether the invariant actually restricts the
    /// transition relation, and a deadlock witness if one is reachable.
    pub fn check_machine(&self, manager: &BddManager, registry: &SymbolRegistry) -> MachineReport {
        let reachable = self.reachable(manager).total.clone();
        let has_successor = self.backward_image(manager, &self.invar).and(&self.invar);
        let deadlocked = reachable.and_not(&has_successor);
        let deadlock_witness = manager
            .pick_one_state(&deadlocked)
            .map(|cube| manager.decode_state(registry, &cube));

        let relation = self.trans.monolithic(manager);
        let next_invar = manager.current_to_next(&self.invar);
        let invar_restricts = !relation.and_not(&next_invar).is_false();

        MachineReport {
            state_count: manager.count_states(&self.invar.and(manager.state_mask())),
            reachable_count: manager.count_states(&reachable),
            init_empty: self.init.and(&self.invar).and(manager.state_mask()).is_false(),
            invar_restricts,
            deadlock_witness,
        }
    }
}

/// The result of [BddFsm::check_machine].
#[derive(Clone, Debug)]
pub struct MachineReport {
    pub state_count: f64,
    pub reachable_count: f64,
    pub init_empty: bool,
    pub invar_restricts: bool,
    pub deadlock_witness: Option<Vec<(String, crate::symbols::ScalarValue)>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsm::sexp::SexpFsm;
    use crate::preprocessing::{parse_expression, parse_model};

    fn counter(method: PartitionMethod) -> (ExprArena, SymbolRegistry, BddManager, BddFsm) {
        let mut arena = ExprArena::new();
        let mut registry = SymbolRegistry::new();
        let model = parse_model(
            "VAR c : 0..3; x : boolean;\n\
             INIT c = 0 & x = FALSE\n\
             TRANS next(c) = (c + 1) mod 4 & next(x) = !x\n",
            &mut arena,
            &mut registry,
        )
        .unwrap();
        registry.encode_vars(&[]);
        let mut manager = BddManager::new(&registry);
        let sexp = SexpFsm::from_flat_model(&mut arena, &model);
        let fsm = BddFsm::build(&arena, &registry, &mut manager, &sexp, method).unwrap();
        (arena, registry, manager, fsm)
    }

    #[test]
    /// Every reachable set is contained in the backward image of its own
    /// forward image.
    fn image_identity() {
        let (mut arena, registry, mut manager, fsm) = counter(PartitionMethod::Monolithic);
        for text in ["c = 0 & !x", "c = 2", "c < 2 & x"] {
            let expr = parse_expression(text, &mut arena).unwrap();
            let set = crate::bdd::expr_to_bdd(&arena, &registry, &mut manager, expr)
                .unwrap()
                .and(&fsm.invar)
                .and(manager.state_mask());
            let forward = fsm.forward_image(&manager, &set);
            let back = fsm.backward_image(&manager, &forward);
            assert!(set.and_not(&back).is_false(), "identity fails for {text}");
        }
    }

    #[test]
    /// Reachability converges, is closed under the image, and its layering
    /// partitions the reachable set by distance.
    fn reachability_fixpoint() {
        let (_, _, manager, fsm) = counter(PartitionMethod::Monolithic);
        let reachable = fsm.reachable(&manager);
        // the counter visits all 8 (c, x) combinations
        assert_eq!(manager.count_states(&reachable.total), 8.0);
        let image = fsm.forward_image(&manager, &reachable.total).and(&fsm.invar);
        assert!(image.and_not(&reachable.total).is_false());

        let mut union = manager.mk_false();
        for layer in &reachable.layers {
            // layers are pairwise fresh
            assert!(layer.and(&union).is_false());
            union = union.or(layer);
        }
        assert_eq!(union, reachable.total);
    }

    #[test]
    /// All partitionings produce the same images.
    fn partitionings_agree() {
        let (mut arena, registry, mut manager, monolithic) =
            counter(PartitionMethod::Monolithic);
        let expr = parse_expression("c = 1", &mut arena).unwrap();
        let set = crate::bdd::expr_to_bdd(&arena, &registry, &mut manager, expr).unwrap();

        for method in [PartitionMethod::Threshold(2), PartitionMethod::Iwls95(2)] {
            let (_, _, other_manager, fsm) = counter(method);
            assert_eq!(
                fsm.forward_image(&other_manager, &set),
                monolithic.forward_image(&manager, &set),
            );
            assert_eq!(
                fsm.backward_image(&other_manager, &set),
                monolithic.backward_image(&manager, &set),
            );
        }
    }

    #[test]
    /// Transition labels between consecutive counter states exist, between
    /// non-successors they are empty.
    fn inputs_between_states() {
        let (mut arena, registry, mut manager, fsm) = counter(PartitionMethod::Monolithic);
        let from = parse_expression("c = 0 & !x", &mut arena).unwrap();
        let to = parse_expression("c = 1 & x", &mut arena).unwrap();
        let from = crate::bdd::expr_to_bdd(&arena, &registry, &mut manager, from).unwrap();
        let to = crate::bdd::expr_to_bdd(&arena, &registry, &mut manager, to).unwrap();
        // the machine has no inputs, so the label set is full on an edge
        assert!(!fsm.states_to_states_get_inputs(&manager, &from, &to).is_false());
        let wrong = parse_expression("c = 3", &mut arena).unwrap();
        let wrong = crate::bdd::expr_to_bdd(&arena, &registry, &mut manager, wrong).unwrap();
        assert!(fsm
            .states_to_states_get_inputs(&manager, &from, &wrong)
            .is_false());
    }
}

impl MachineReport {
    /// Render the report as printable lines.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("states satisfying the invariant: {}", self.state_count),
            format!("reachable states: {}", self.reachable_count),
        ];
        if self.init_empty {
            lines.push("the initial region is empty".to_string());
        }
        if self.invar_restricts {
            lines.push("the invariant restricts the transition relation".to_string());
        }
        match &self.deadlock_witness {
            None => lines.push("every reachable state has a successor".to_string()),
            Some(witness) => {
                lines.push("a reachable state has no successor:".to_string());
                for (name, value) in witness {
                    lines.push(format!("  {name} = {value}"));
                }
            }
        }
        lines
    }
}
