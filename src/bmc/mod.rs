//! The bounded model checker: problem generation over increasing bounds,
//! solving, dumping, and counterexample extraction from SAT models.

pub mod dimacs;
pub mod invar;
pub mod tableau;
pub mod utils;

pub use utils::{parse_loopback, Loopback};

use crate::be::BeManager;
use crate::errors::{CheckError, CheckResult};
use crate::expr::{ExprArena, ExprId};
use crate::fsm::BeFsm;
use crate::ltl::tableau::to_nnf;
use crate::sat::{SatGroup, SatResult, SatSolver};
use crate::symbols::{ScalarValue, SymbolRegistry};
use crate::trace::{Trace, TraceKind};

use log::{info, warn};

use std::collections::HashMap;
use std::path::PathBuf;

/// Options of a bounded verification run.
#[derive(Clone, Debug)]
pub struct BmcOptions {
    /// The maximum path length `k`.
    pub bound: u32,
    /// The loopback regime for LTL problems.
    pub loopback: Loopback,
    /// Solve every length from 0 up to the bound, or only the bound itself.
    pub increasing: bool,
    /// Actually invoke the solver (problems may be dumped without solving).
    pub must_solve: bool,
    /// Dump filename template with `@k`/`@l` placeholders.
    pub dump_template: Option<String>,
    /// Name of the SAT engine behind the facade.
    pub solver_name: String,
}

impl Default for BmcOptions {
    fn default() -> Self {
        BmcOptions {
            bound: 10,
            loopback: Loopback::AllLoops,
            increasing: true,
            must_solve: true,
            dump_template: None,
            solver_name: "varisat".to_string(),
        }
    }
}

/// Outcome of a bounded LTL check.
#[derive(Debug)]
pub enum BmcOutcome {
    /// A counterexample of the reported length was found.
    Counterexample(Trace),
    /// No counterexample exists up to the bound (under the loopback regime).
    NoCounterexample,
    /// Problems were only dumped, nothing was decided.
    NotSolved,
}

/// Check an LTL property by unrolling up to `options.bound`. Stops at the
/// first satisfiable problem.
pub fn check_ltl_spec_bmc(
    arena: &mut ExprArena,
    registry: &SymbolRegistry,
    manager: &mut BeManager,
    fsm: &BeFsm,
    expr: ExprId,
    options: &BmcOptions,
) -> CheckResult<BmcOutcome> {
    let negated = arena.mk_not(expr);
    let nnf = to_nnf(arena, negated, false)?;

    if tableau::has_past_operators(arena, nnf) && options.loopback != Loopback::NoLoop {
        return Err(CheckError::TypeError(
            "past-time operators require the no-loopback regime".to_string(),
        ));
    }

    let k_min = if options.increasing { 0 } else { options.bound };
    let mut solved_any = false;
    for k in k_min..=options.bound {
        let loopback = options.loopback.absolute(k);
        if let Loopback::Loop(l) = loopback {
            if l < 0 || l >= i64::from(k) {
                warn!(
                    "problem with bound {k} and {} is not allowed: skipped",
                    loopback.describe()
                );
                continue;
            }
        }
        info!("generating problem with bound {k}, {}", loopback.describe());

        let path = tableau::unroll_path(manager, fsm, k);
        let negative = {
            let mut encoder = tableau::LtlEncoder::new(arena, registry, manager, k);
            match loopback {
                Loopback::NoLoop => encoder.encode_no_loop(nnf, 0)?,
                Loopback::Loop(l) => {
                    let l = l as u32;
                    let condition =
                        tableau::loop_condition(encoder.manager, registry, l, k);
                    let body = encoder.encode_loop(nnf, 0, l)?;
                    let fair = encoder.loop_fairness(&fsm.justice, l);
                    let looped = encoder.manager.be_and(condition, body);
                    encoder.manager.be_and(looped, fair)
                }
                Loopback::AllLoops => {
                    let mut any = encoder.manager.be_false();
                    for l in 0..k {
                        let condition =
                            tableau::loop_condition(encoder.manager, registry, l, k);
                        let body = encoder.encode_loop(nnf, 0, l)?;
                        let fair = encoder.loop_fairness(&fsm.justice, l);
                        let looped = encoder.manager.be_and(condition, body);
                        let looped = encoder.manager.be_and(looped, fair);
                        any = encoder.manager.be_or(any, looped);
                    }
                    any
                }
            }
        };
        let problem = manager.be_and(path, negative);
        let cnf = manager.convert_to_cnf(problem);

        if let Some(template) = &options.dump_template {
            let descriptor = match loopback {
                Loopback::NoLoop => "X".to_string(),
                Loopback::AllLoops => "all".to_string(),
                Loopback::Loop(l) => l.to_string(),
            };
            let path = PathBuf::from(dimacs::expand_template(template, k, &descriptor));
            dimacs::write_dimacs(&cnf, &path)?;
        }
        if !options.must_solve {
            continue;
        }
        solved_any = true;

        let mut solver = SatSolver::create(&options.solver_name, false)?;
        solver.add(&cnf, SatGroup::PERMANENT)?;
        solver.set_polarity(&cnf, 1, SatGroup::PERMANENT)?;
        match solver.solve_all_groups() {
            SatResult::Sat => {
                let model = solver.get_model().unwrap_or(&[]).to_vec();
                let found = find_loopback(manager, registry, &model, k, loopback);
                info!("counterexample of length {k} found");
                let trace = model_to_trace(manager, registry, &model, k, found);
                return Ok(BmcOutcome::Counterexample(trace));
            }
            SatResult::Unsat => {
                info!("no counterexample of length {k}");
            }
            SatResult::Timeout => return Err(CheckError::SolverTimeout),
            SatResult::Memout => return Err(CheckError::SolverMemout),
            SatResult::InternalError => {
                return Err(CheckError::SolverInternal("solve failed".to_string()));
            }
        }
    }
    if solved_any {
        Ok(BmcOutcome::NoCounterexample)
    } else {
        Ok(BmcOutcome::NotSolved)
    }
}

/// Outcome of the induction scheme for an invariant.
#[derive(Debug)]
pub enum InductionOutcome {
    /// The invariant is violated; the base case produced a witness.
    Falsified(Trace),
    /// Base and step both closed: the invariant holds.
    Proved,
    /// The bound was exhausted without an answer.
    Unknown,
}

/// Prove or refute an invariant by increasing-depth induction.
pub fn check_invar_induction(
    arena: &ExprArena,
    registry: &SymbolRegistry,
    manager: &mut BeManager,
    fsm: &BeFsm,
    invariant: ExprId,
    options: &BmcOptions,
) -> CheckResult<InductionOutcome> {
    for k in 0..=options.bound {
        // base: a reachable failure within k steps
        let base = invar::invar_base_problem(arena, registry, manager, fsm, invariant, k)?;
        let cnf = manager.convert_to_cnf(base);
        if let Some(template) = &options.dump_template {
            let path = PathBuf::from(dimacs::expand_template(template, k, "base"));
            dimacs::write_dimacs(&cnf, &path)?;
        }
        if options.must_solve {
            let mut solver = SatSolver::create(&options.solver_name, false)?;
            solver.add(&cnf, SatGroup::PERMANENT)?;
            solver.set_polarity(&cnf, 1, SatGroup::PERMANENT)?;
            match solver.solve_all_groups() {
                SatResult::Sat => {
                    let model = solver.get_model().unwrap_or(&[]).to_vec();
                    info!("invariant falsified at depth {k}");
                    let trace = model_to_trace(manager, registry, &model, k, None);
                    return Ok(InductionOutcome::Falsified(trace));
                }
                SatResult::Unsat => {}
                SatResult::Timeout => return Err(CheckError::SolverTimeout),
                SatResult::Memout => return Err(CheckError::SolverMemout),
                SatResult::InternalError => {
                    return Err(CheckError::SolverInternal("solve failed".to_string()));
                }
            }

            // step: k distinct invariant states cannot end in a failure
            let step = invar::invar_step_problem(arena, registry, manager, fsm, invariant, k)?;
            let cnf = manager.convert_to_cnf(step);
            let mut solver = SatSolver::create(&options.solver_name, false)?;
            solver.add(&cnf, SatGroup::PERMANENT)?;
            solver.set_polarity(&cnf, 1, SatGroup::PERMANENT)?;
            match solver.solve_all_groups() {
                SatResult::Unsat => {
                    info!("invariant proved by induction at depth {k}");
                    return Ok(InductionOutcome::Proved);
                }
                SatResult::Sat => {}
                SatResult::Timeout => return Err(CheckError::SolverTimeout),
                SatResult::Memout => return Err(CheckError::SolverMemout),
                SatResult::InternalError => {
                    return Err(CheckError::SolverInternal("solve failed".to_string()));
                }
            }
        }
    }
    Ok(InductionOutcome::Unknown)
}

/// For the all-loops regime, recover which loop point the model chose by
/// comparing the state bits of time `k` against each candidate.
fn find_loopback(
    manager: &BeManager,
    registry: &SymbolRegistry,
    model: &[i64],
    k: u32,
    loopback: Loopback,
) -> Option<usize> {
    match loopback {
        Loopback::NoLoop => None,
        Loopback::Loop(l) => Some(l as usize),
        Loopback::AllLoops => {
            let states = state_bits_by_time(manager, registry, model);
            let last = states.get(&k)?.clone();
            (0..k).find(|l| states.get(l).map(|bits| *bits == last).unwrap_or(false))
                .map(|l| l as usize)
        }
    }
}

type BitsByTime = HashMap<u32, Vec<bool>>;

fn state_bits_by_time(
    manager: &BeManager,
    registry: &SymbolRegistry,
    model: &[i64],
) -> BitsByTime {
    let encoding = registry.encoding();
    let mut assigned: HashMap<(usize, u32), bool> = HashMap::new();
    let mut times: Vec<u32> = Vec::new();
    for (var, value) in manager.cnf_model_to_be_model(model) {
        if let crate::be::BeVar::StateAt { position, time } = var {
            assigned.insert((position, time), value);
            if !times.contains(&time) {
                times.push(time);
            }
        }
    }
    let state_positions: Vec<usize> = (0..encoding.bit_count())
        .filter(|&position| !encoding.bit(position).input)
        .collect();
    let mut by_time = BitsByTime::new();
    for time in times {
        let bits = state_positions
            .iter()
            .map(|&position| assigned.get(&(position, time)).copied().unwrap_or(false))
            .collect();
        by_time.insert(time, bits);
    }
    by_time
}

/// Interpret a SAT model over `(variable, time)` pairs and pack it into a
/// state-input-state trace of length `k`.
pub fn model_to_trace(
    manager: &BeManager,
    registry: &SymbolRegistry,
    model: &[i64],
    k: u32,
    loopback: Option<usize>,
) -> Trace {
    let encoding = registry.encoding();
    let mut state_bits: HashMap<(usize, u32), bool> = HashMap::new();
    let mut input_bits: HashMap<(usize, u32), bool> = HashMap::new();
    for (var, value) in manager.cnf_model_to_be_model(model) {
        match var {
            crate::be::BeVar::StateAt { position, time } => {
                state_bits.insert((position, time), value);
            }
            crate::be::BeVar::InputAt { position, time } => {
                input_bits.insert((position, time), value);
            }
            _ => {}
        }
    }

    let decode = |bits: &HashMap<(usize, u32), bool>, name: &str, time: u32| {
        let positions = encoding.bits_of(name)?;
        let range = registry.get_var_range(name)?;
        let mut index = 0usize;
        for &position in positions {
            index = (index << 1) | usize::from(bits.get(&(position, time)).copied().unwrap_or(false));
        }
        if index < range.size() {
            Some(range.values[index].clone())
        } else {
            None
        }
    };

    let mut trace = Trace::new("counterexample", TraceKind::CounterExample);
    trace.loopback = loopback;
    for time in 0..=k {
        let mut state: Vec<(String, ScalarValue)> = Vec::new();
        let mut input: Vec<(String, ScalarValue)> = Vec::new();
        for name in registry.declaration_order() {
            if registry.is_state_var(name) {
                if let Some(value) = decode(&state_bits, name, time) {
                    state.push((name.clone(), value));
                }
            } else if registry.is_input_var(name) && time > 0 {
                // the input consumed on the transition into this state
                if let Some(value) = decode(&input_bits, name, time - 1) {
                    input.push((name.clone(), value));
                }
            }
        }
        let input = if input.is_empty() { None } else { Some(input) };
        trace.push_step(input, state);
    }
    trace
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsm::SexpFsm;
    use crate::preprocessing::{parse_expression, parse_model};

    fn setup(model_text: &str) -> (ExprArena, SymbolRegistry, BeManager, BeFsm) {
        let mut arena = ExprArena::new();
        let mut registry = SymbolRegistry::new();
        let model = parse_model(model_text, &mut arena, &mut registry).unwrap();
        registry.encode_vars(&[]);
        let mut manager = BeManager::new();
        let sexp = SexpFsm::from_flat_model(&mut arena, &model);
        let fsm = BeFsm::build(&arena, &registry, &mut manager, &sexp).unwrap();
        (arena, registry, manager, fsm)
    }

    const TOGGLE: &str = "VAR x : boolean;\nINIT x = FALSE\nTRANS next(x) = !x\n";
    const COUNTER: &str = "VAR c : 0..3;\nINIT c = 0\nTRANS next(c) = (c + 1) mod 4\n";

    fn check_ltl(model: &str, formula: &str, options: &BmcOptions) -> BmcOutcome {
        let (mut arena, registry, mut manager, fsm) = setup(model);
        let expr = parse_expression(formula, &mut arena).unwrap();
        check_ltl_spec_bmc(&mut arena, &registry, &mut manager, &fsm, expr, options).unwrap()
    }

    #[test]
    /// Safety violations surface as finite no-loop counterexamples.
    fn safety_counterexample() {
        let outcome = check_ltl(TOGGLE, "G !x", &BmcOptions::default());
        let BmcOutcome::Counterexample(trace) = outcome else {
            panic!("expected a counterexample");
        };
        // x toggles to true after one step
        assert_eq!(trace.states[0][0].1.to_string(), "FALSE");
        assert_eq!(trace.states[1][0].1.to_string(), "TRUE");
    }

    #[test]
    /// A liveness violation needs a lasso: `F G x` fails on the toggle
    /// with a loop-shaped counterexample.
    fn liveness_needs_loop() {
        let outcome = check_ltl(TOGGLE, "F G x", &BmcOptions::default());
        let BmcOutcome::Counterexample(trace) = outcome else {
            panic!("expected a counterexample");
        };
        assert!(trace.loopback.is_some());

        // under the no-loop regime the same property has no counterexample
        let options = BmcOptions {
            loopback: Loopback::NoLoop,
            bound: 4,
            ..BmcOptions::default()
        };
        assert!(matches!(
            check_ltl(TOGGLE, "F G x", &options),
            BmcOutcome::NoCounterexample
        ));
    }

    #[test]
    /// True properties stay unsatisfiable up to the bound.
    fn bounded_soundness() {
        assert!(matches!(
            check_ltl(COUNTER, "G c < 4", &BmcOptions::default()),
            BmcOutcome::NoCounterexample
        ));
        assert!(matches!(
            check_ltl(COUNTER, "F c = 3", &BmcOptions::default()),
            BmcOutcome::NoCounterexample
        ));
    }

    #[test]
    /// The counter violates `G c < 3` after exactly three steps.
    fn counterexample_length() {
        let options = BmcOptions {
            loopback: Loopback::NoLoop,
            ..BmcOptions::default()
        };
        let outcome = check_ltl(COUNTER, "G c < 3", &options);
        let BmcOutcome::Counterexample(trace) = outcome else {
            panic!("expected a counterexample");
        };
        assert_eq!(trace.len(), 4);
        assert_eq!(trace.states[3][0].1.to_string(), "3");
    }

    #[test]
    /// Induction proves `c != 4` (the bad state is not even encodable) and
    /// falsifies `c != 3` with a base-case witness.
    fn induction_outcomes() {
        let (mut arena, registry, mut manager, fsm) = setup(COUNTER);
        let good = parse_expression("c != 4", &mut arena).unwrap();
        let outcome = check_invar_induction(
            &arena,
            &registry,
            &mut manager,
            &fsm,
            good,
            &BmcOptions::default(),
        )
        .unwrap();
        assert!(matches!(outcome, InductionOutcome::Proved));

        let bad = parse_expression("c != 3", &mut arena).unwrap();
        let outcome = check_invar_induction(
            &arena,
            &registry,
            &mut manager,
            &fsm,
            bad,
            &BmcOptions::default(),
        )
        .unwrap();
        let InductionOutcome::Falsified(trace) = outcome else {
            panic!("expected falsification");
        };
        assert_eq!(trace.len(), 4);
    }

    #[test]
    /// Inputs appear on the transitions of BMC traces.
    fn input_positions() {
        let model = "VAR x : boolean;\nIVAR i : boolean;\n\
                     INIT x = FALSE\nTRANS next(x) = i\n";
        let outcome = check_ltl(model, "G !x", &BmcOptions::default());
        let BmcOutcome::Counterexample(trace) = outcome else {
            panic!("expected a counterexample");
        };
        assert!(trace.inputs[0].is_none());
        let input = trace.inputs[1].as_ref().unwrap();
        assert_eq!(input[0].0, "i");
        assert_eq!(input[0].1.to_string(), "TRUE");
    }
}
