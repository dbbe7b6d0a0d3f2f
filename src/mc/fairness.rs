//! Fair-state computation: the greatest set of states from which a path
//! satisfying all justice and compassion constraints exists.

use crate::bdd::BddManager;
use crate::fsm::BddFsm;
use crate::mc::eval::{eg, eu, ex};

use biodivine_lib_bdd::Bdd;

/// `EG f` under the machine's fairness constraints.
///
/// The greatest fixpoint refines `f` by, per justice set `j`, the ability
/// to revisit `Z & j` while staying in `Z`, and per compassion pair
/// `(p, q)`, either the ability to revisit `Z & q` or a way to stay inside
/// `Z & !p` forever.
pub fn fair_eg(manager: &BddManager, fsm: &BddFsm, f: &Bdd) -> Bdd {
    if !fsm.has_fairness() {
        return eg(manager, fsm, f);
    }
    let mut result = f.and(&fsm.invar);
    loop {
        let previous = result.clone();
        for justice in &fsm.justice {
            let revisit = eu(manager, fsm, &result, &result.and(justice));
            result = result.and(&ex(manager, fsm, &revisit));
        }
        for (p, q) in &fsm.compassion {
            let revisit = eu(manager, fsm, &result, &result.and(q));
            let via_q = ex(manager, fsm, &revisit);
            let avoid_p = eg(manager, fsm, &result.and(&p.not()));
            result = result.and(&via_q.or(&avoid_p));
        }
        if result == previous {
            return result;
        }
    }
}

/// The fair states: `EG TRUE` under the current fairness constraints.
pub fn compute_fair_states(manager: &BddManager, fsm: &BddFsm) -> Bdd {
    let all = manager.mk_true();
    fair_eg(manager, fsm, &all)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::ExprArena;
    use crate::fsm::{BddFsm, PartitionMethod, SexpFsm};
    use crate::preprocessing::parse_model;
    use crate::symbols::SymbolRegistry;

    fn build(model: &str) -> (BddManager, BddFsm) {
        let mut arena = ExprArena::new();
        let mut registry = SymbolRegistry::new();
        let model = parse_model(model, &mut arena, &mut registry).unwrap();
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
        (manager, fsm)
    }

    #[test]
    /// In a machine that may stay in `c = 0` forever, justice `c = 1`
    /// removes no state (1 stays reachable) while justice on an unreachable
    /// value empties the fair set.
    fn justice_restricts_fair_states() {
        // self-loop on 0 or move to 1, 1 loops back to 0
        let model = "VAR c : 0..2;\n\
                     INIT c = 0\n\
                     TRANS (c = 0 & (next(c) = 0 | next(c) = 1)) | (c = 1 & next(c) = 0)\n";

        let (manager, fsm) = build(&format!("{model}JUSTICE c = 1\n"));
        let fair = fsm.fair_states(&manager).and(manager.state_mask());
        // states 0 and 1 can revisit 1 forever, 2 has no outgoing edge
        assert_eq!(manager.count_states(&fair), 2.0);

        let (manager, fsm) = build(&format!("{model}JUSTICE c = 2\n"));
        let fair = fsm.fair_states(&manager).and(manager.state_mask());
        assert_eq!(manager.count_states(&fair), 0.0);
    }

    #[test]
    /// A compassion pair `(p, q)` is vacuously satisfiable by avoiding `p`.
    fn compassion_avoidance() {
        let model = "VAR c : 0..2;\n\
                     INIT c = 0\n\
                     TRANS (c = 0 & (next(c) = 0 | next(c) = 1)) | (c = 1 & next(c) = 0)\n\
                     COMPASSION (c = 1, c = 2)\n";
        let (manager, fsm) = build(model);
        let fair = fsm.fair_states(&manager).and(manager.state_mask());
        // staying in c = 0 forever avoids p, so fair states exist
        assert!(manager.count_states(&fair) >= 1.0);
    }
}
