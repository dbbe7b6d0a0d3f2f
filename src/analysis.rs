//! High-level functionality regarding the whole verification process:
//! read a flattened model, check it, register its properties, and verify
//! them in order.

use crate::bdd::BddManager;
use crate::errors::CheckResult;
use crate::expr::ExprArena;
use crate::fsm::{BddFsm, MachineReport, SexpFsm};
use crate::preprocessing::parse_model;
use crate::properties::{PropDb, PropStatus, VerificationOptions};
use crate::result_print::{print_property_result, PrintOptions};
use crate::semantic;
use crate::symbols::SymbolRegistry;
use crate::trace::TraceManager;

/// The state a verification session accumulates: the expression arena, the
/// symbol registry, the machine, the property database, and all produced
/// traces.
pub struct Session {
    pub arena: ExprArena,
    pub registry: SymbolRegistry,
    pub model: SexpFsm,
    pub props: PropDb,
    pub traces: TraceManager,
}

impl Session {
    /// Load a flattened model: parse, semantically check, encode the
    /// variables (honoring an optional ordering prefix), and register the
    /// properties.
    pub fn load(text: &str, order_prefix: &[String]) -> CheckResult<Session> {
        let mut arena = ExprArena::new();
        let mut registry = SymbolRegistry::new();
        let flat = parse_model(text, &mut arena, &mut registry)?;
        semantic::check_model(&arena, &registry, &flat)?;
        registry.encode_vars(order_prefix);

        let model = SexpFsm::from_flat_model(&mut arena, &flat);
        let mut props = PropDb::new();
        for parsed in &flat.properties {
            props.create_and_add(&arena, &registry, parsed.expr, parsed.kind, parsed.line)?;
        }
        Ok(Session {
            arena,
            registry,
            model,
            props,
            traces: TraceManager::new(),
        })
    }

    /// Build the machine and report on its well-formedness (deadlocks,
    /// emptiness of the initial region, invariant restrictions).
    pub fn check_machine(&self, options: &VerificationOptions) -> CheckResult<MachineReport> {
        let mut manager = BddManager::new(&self.registry);
        let fsm = BddFsm::build(
            &self.arena,
            &self.registry,
            &mut manager,
            &self.model,
            options.partition,
        )?;
        Ok(fsm.check_machine(&manager, &self.registry))
    }

    /// Verify every property and report the verdicts.
    pub fn verify_all(
        &mut self,
        options: &VerificationOptions,
        print: PrintOptions,
    ) -> CheckResult<Vec<PropStatus>> {
        self.props.verify_all(
            &mut self.arena,
            &mut self.registry,
            &self.model,
            &mut self.traces,
            options,
        )?;
        let mut statuses = Vec::with_capacity(self.props.len());
        for prop in self.props.properties() {
            let trace = prop.trace.and_then(|id| self.traces.get(id));
            print_property_result(&self.arena, prop, trace, print);
            statuses.push(prop.status);
        }
        Ok(statuses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mc::ComputeResult;
    use crate::properties::{Engine, InvarStrategy, VerificationOptions};
    use crate::symbols::ScalarValue;

    fn run(model: &str) -> (Session, Vec<PropStatus>) {
        run_with(model, &VerificationOptions::default())
    }

    fn run_with(model: &str, options: &VerificationOptions) -> (Session, Vec<PropStatus>) {
        let mut session = Session::load(model, &[]).unwrap();
        let statuses = session.verify_all(options, PrintOptions::NoPrint).unwrap();
        (session, statuses)
    }

    #[test]
    /// The two-state toggle satisfies `AG (x = 0 | x = 1)`-style exhaustive
    /// invariants with no trace attached.
    fn toggle_holds() {
        let (session, statuses) = run(
            "VAR x : boolean;\n\
             ASSIGN init(x) := FALSE; next(x) := !x;\n\
             CTLSPEC AG (x | !x)\n",
        );
        assert_eq!(statuses, vec![PropStatus::True]);
        assert!(session.props.get(0).unwrap().trace.is_none());
    }

    #[test]
    /// A violated safety property yields a length-1 counterexample going
    /// from the initial state into the violating one.
    fn toggle_fails_with_trace() {
        let (session, statuses) = run(
            "VAR x : boolean;\n\
             ASSIGN init(x) := FALSE; next(x) := !x;\n\
             CTLSPEC AG !x\n",
        );
        assert_eq!(statuses, vec![PropStatus::False]);
        let trace_id = session.props.get(0).unwrap().trace.unwrap();
        let trace = session.traces.get(trace_id).unwrap();
        assert_eq!(trace.len(), 2);
        assert_eq!(
            trace.states[0],
            vec![("x".to_string(), ScalarValue::Bool(false))]
        );
        assert_eq!(
            trace.states[1],
            vec![("x".to_string(), ScalarValue::Bool(true))]
        );
    }

    #[test]
    /// Liveness of the modulo-4 counter.
    fn counter_liveness() {
        let (_, statuses) = run(
            "VAR c : 0..3;\n\
             ASSIGN init(c) := 0; next(c) := (c + 1) mod 4;\n\
             CTLSPEC AF c = 3\n",
        );
        assert_eq!(statuses, vec![PropStatus::True]);
    }

    #[test]
    /// The quantitative distance from the reset state to the last counter
    /// value.
    fn counter_min_distance() {
        let (_, statuses) = run(
            "VAR c : 0..3;\n\
             ASSIGN init(c) := 0; next(c) := (c + 1) mod 4;\n\
             COMPUTE MIN [ c = 0 , c = 3 ]\n",
        );
        assert_eq!(
            statuses,
            vec![PropStatus::Number(ComputeResult::Finite(3))]
        );
    }

    #[test]
    /// A trivially true invariant still encodes and proves at depth 10.
    fn invariant_trivially_true() {
        let model = "VAR c : 0..3;\n\
                     ASSIGN init(c) := 0; next(c) := (c + 1) mod 4;\n\
                     INVARSPEC c != 4\n";
        // forward reachability
        let (_, statuses) = run(model);
        assert_eq!(statuses, vec![PropStatus::True]);
        // and the induction scheme agree
        let options = VerificationOptions {
            invar_strategy: InvarStrategy::Induction,
            ..VerificationOptions::default()
        };
        let (_, statuses) = run_with(model, &options);
        assert_eq!(statuses, vec![PropStatus::True]);
    }

    #[test]
    /// An LTL property with an input variable: the transition stores the
    /// input, so the next state always reflects it.
    fn ltl_with_input() {
        let (_, statuses) = run(
            "VAR x : boolean;\n\
             IVAR i : boolean;\n\
             ASSIGN init(x) := FALSE; next(x) := i;\n\
             LTLSPEC G (X x <-> i)\n",
        );
        assert_eq!(statuses, vec![PropStatus::True]);
    }

    #[test]
    /// The same model verified once through the BDD route and once through
    /// the bounded route produces consistent verdicts for a false formula.
    fn engines_agree_on_failure() {
        let model = "VAR c : 0..3;\n\
                     ASSIGN init(c) := 0; next(c) := (c + 1) mod 4;\n\
                     LTLSPEC G c < 3\n";
        let (_, statuses) = run(model);
        assert_eq!(statuses, vec![PropStatus::False]);

        let options = VerificationOptions {
            engine: Engine::Bmc,
            ..VerificationOptions::default()
        };
        let (session, statuses) = run_with(model, &options);
        assert_eq!(statuses, vec![PropStatus::False]);
        let trace_id = session.props.get(0).unwrap().trace.unwrap();
        assert!(session.traces.get(trace_id).unwrap().len() >= 4);
    }

    #[test]
    /// Properties are verified at most once unless reset.
    fn verify_is_idempotent() {
        let model = "VAR x : boolean;\n\
                     ASSIGN init(x) := FALSE; next(x) := !x;\n\
                     CTLSPEC AG !x\n";
        let mut session = Session::load(model, &[]).unwrap();
        let options = VerificationOptions::default();
        session.verify_all(&options, PrintOptions::NoPrint).unwrap();
        let first_trace = session.props.get(0).unwrap().trace;
        session.verify_all(&options, PrintOptions::NoPrint).unwrap();
        // no second trace was produced
        assert_eq!(session.props.get(0).unwrap().trace, first_trace);
        assert_eq!(session.traces.len(), 1);

        session.props.reset(0);
        session.verify_all(&options, PrintOptions::NoPrint).unwrap();
        assert_eq!(session.traces.len(), 2);
    }

    #[test]
    /// The machine report spots reachable deadlocks and presents one as a
    /// witness.
    fn machine_report() {
        let live = Session::load(
            "VAR x : boolean;\nASSIGN init(x) := FALSE; next(x) := !x;\n",
            &[],
        )
        .unwrap();
        let report = live.check_machine(&VerificationOptions::default()).unwrap();
        assert!(report.deadlock_witness.is_none());
        assert!(!report.init_empty);
        assert_eq!(report.reachable_count, 2.0);

        // state 2 is reachable but has no outgoing transition
        let stuck = Session::load(
            "VAR c : 0..2;\nINIT c = 0\n\
             TRANS (c = 0 & next(c) = 1) | (c = 1 & next(c) = 2)\n",
            &[],
        )
        .unwrap();
        let report = stuck.check_machine(&VerificationOptions::default()).unwrap();
        let witness = report.deadlock_witness.unwrap();
        assert_eq!(witness[0].1.to_string(), "2");
    }

    #[test]
    /// Cone-of-influence restriction does not change verdicts.
    fn cone_preserves_verdicts() {
        let model = "VAR a : boolean; b : boolean;\n\
                     ASSIGN init(a) := FALSE; next(a) := !a;\n\
                     ASSIGN init(b) := FALSE; next(b) := b;\n\
                     CTLSPEC AF a\n";
        let options = VerificationOptions {
            cone_of_influence: true,
            ..VerificationOptions::default()
        };
        let (session, statuses) = run_with(model, &options);
        assert_eq!(statuses, vec![PropStatus::True]);
        let cone = session.props.get(0).unwrap().cone.as_ref().unwrap();
        assert!(cone.contains("a"));
        assert!(!cone.contains("b"));
    }
}
