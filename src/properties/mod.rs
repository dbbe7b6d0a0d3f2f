//! The property database: typed property records with status tracking,
//! the per-kind verification dispatch, and filtered report printing.

use crate::bdd::BddManager;
use crate::bmc::{self, BmcOptions};
use crate::be::BeManager;
use crate::coi;
use crate::errors::{CheckError, CheckResult};
use crate::expr::{display_expr, ExprArena, ExprId, Op};
use crate::fsm::{BddFsm, BeFsm, PartitionMethod, SexpFsm};
use crate::ltl;
use crate::mc;
use crate::mc::ComputeResult;
use crate::semantic;
use crate::symbols::SymbolRegistry;
use crate::trace::TraceManager;

use log::{error, info, warn};

use std::collections::HashSet;
use std::fmt;

/// The kind of a property.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PropKind {
    Ctl,
    Ltl,
    Invar,
    Compute,
    Psl,
    NoType,
}

impl fmt::Display for PropKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let text = match self {
            PropKind::Ctl => "CTL",
            PropKind::Ltl => "LTL",
            PropKind::Invar => "INVAR",
            PropKind::Compute => "COMPUTE",
            PropKind::Psl => "PSL",
            PropKind::NoType => "NoType",
        };
        write!(f, "{text}")
    }
}

impl PropKind {
    /// Verification order of the kinds.
    fn rank(self) -> u8 {
        match self {
            PropKind::Ctl => 0,
            PropKind::Compute => 1,
            PropKind::Ltl => 2,
            PropKind::Psl => 3,
            PropKind::Invar => 4,
            PropKind::NoType => 5,
        }
    }
}

/// The status of a property. Transitions are monotonic: once decided, a
/// property is not re-verified.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PropStatus {
    NoStatus,
    Unchecked,
    True,
    False,
    Number(ComputeResult),
    Wrong,
}

impl fmt::Display for PropStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let text = match self {
            PropStatus::NoStatus => "NoStatus",
            PropStatus::Unchecked => "Unchecked",
            PropStatus::True => "True",
            PropStatus::False => "False",
            PropStatus::Number(_) => "Number",
            PropStatus::Wrong => "Wrong",
        };
        write!(f, "{text}")
    }
}

/// One registered property.
#[derive(Clone, Debug)]
pub struct Property {
    pub index: usize,
    pub expr: ExprId,
    pub kind: PropKind,
    pub status: PropStatus,
    pub trace: Option<usize>,
    pub cone: Option<HashSet<String>>,
    pub line: u32,
    /// Memoized lowering of a PSL property.
    lowered: Option<PropKind>,
}

/// How invariants are decided.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum InvarStrategy {
    Forward,
    ForwardBackward,
    Induction,
}

/// Which engine decides LTL properties.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Engine {
    Bdd,
    Bmc,
}

/// Options threaded through every verification attempt.
#[derive(Clone, Debug)]
pub struct VerificationOptions {
    pub partition: PartitionMethod,
    pub engine: Engine,
    pub invar_strategy: InvarStrategy,
    pub bmc: BmcOptions,
    pub cone_of_influence: bool,
}

impl Default for VerificationOptions {
    fn default() -> Self {
        VerificationOptions {
            partition: PartitionMethod::default(),
            engine: Engine::Bdd,
            invar_strategy: InvarStrategy::Forward,
            bmc: BmcOptions::default(),
            cone_of_influence: false,
        }
    }
}

/// The dense, indexed property collection.
#[derive(Debug, Default)]
pub struct PropDb {
    props: Vec<Property>,
}

impl PropDb {
    pub fn new() -> PropDb {
        PropDb::default()
    }

    pub fn len(&self) -> usize {
        self.props.len()
    }

    pub fn is_empty(&self) -> bool {
        self.props.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Property> {
        self.props.get(index)
    }

    pub fn properties(&self) -> &[Property] {
        &self.props
    }

    /// Typecheck and register a property, returning its dense index.
    pub fn create_and_add(
        &mut self,
        arena: &ExprArena,
        registry: &SymbolRegistry,
        expr: ExprId,
        kind: PropKind,
        line: u32,
    ) -> CheckResult<usize> {
        typecheck(arena, expr, kind, line)?;
        semantic::check_property_inputs(arena, registry, expr, kind)?;
        let index = self.props.len();
        self.props.push(Property {
            index,
            expr,
            kind,
            status: PropStatus::Unchecked,
            trace: None,
            cone: None,
            line,
            lowered: None,
        });
        Ok(index)
    }

    /// Reset a property so a later `verify` call re-runs it.
    pub fn reset(&mut self, index: usize) {
        if let Some(prop) = self.props.get_mut(index) {
            prop.status = PropStatus::Unchecked;
            prop.trace = None;
        }
    }

    /// Verify one property. Properties whose status is already decided are
    /// left untouched.
    pub fn verify(
        &mut self,
        index: usize,
        arena: &mut ExprArena,
        registry: &mut SymbolRegistry,
        model: &SexpFsm,
        traces: &mut TraceManager,
        options: &VerificationOptions,
    ) -> CheckResult<()> {
        let Some(prop) = self.props.get(index) else {
            return Ok(());
        };
        if prop.status != PropStatus::Unchecked {
            return Ok(());
        }
        let expr = prop.expr;
        let kind = self.resolve_kind(index, arena)?;

        // restrict the machine to the cone of the property when asked to
        let (model, cone) = if options.cone_of_influence {
            let cone = coi::cone_of_influence(arena, registry, model, expr);
            let restricted = coi::restrict_fsm(arena, model, registry, &cone);
            (restricted, Some(cone))
        } else {
            (model.clone(), None)
        };
        self.props[index].cone = cone;

        let outcome = self.run_engine(index, kind, expr, arena, registry, &model, traces, options);
        match outcome {
            Ok(status) => {
                self.props[index].status = status;
                Ok(())
            }
            Err(err) => {
                self.props[index].status = PropStatus::Wrong;
                Err(err)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn run_engine(
        &mut self,
        index: usize,
        kind: PropKind,
        expr: ExprId,
        arena: &mut ExprArena,
        registry: &mut SymbolRegistry,
        model: &SexpFsm,
        traces: &mut TraceManager,
        options: &VerificationOptions,
    ) -> CheckResult<PropStatus> {
        match kind {
            PropKind::Ctl => {
                let mut manager = BddManager::new(registry);
                let fsm = BddFsm::build(arena, registry, &mut manager, model, options.partition)?;
                let (holds, trace) = mc::check_ctl_spec(arena, registry, &mut manager, &fsm, expr)?;
                if let Some(trace) = trace {
                    self.props[index].trace = Some(traces.register_trace(trace));
                }
                Ok(if holds { PropStatus::True } else { PropStatus::False })
            }
            PropKind::Compute => {
                let mut manager = BddManager::new(registry);
                let fsm = BddFsm::build(arena, registry, &mut manager, model, options.partition)?;
                let result = mc::compute_min_max(arena, registry, &mut manager, &fsm, expr)?;
                Ok(PropStatus::Number(result))
            }
            PropKind::Ltl => match options.engine {
                Engine::Bdd => {
                    let (holds, trace) = ltl::check_ltl_spec(
                        arena,
                        registry,
                        model,
                        expr,
                        index,
                        options.partition,
                    )?;
                    if let Some(trace) = trace {
                        self.props[index].trace = Some(traces.register_trace(trace));
                    }
                    Ok(if holds { PropStatus::True } else { PropStatus::False })
                }
                Engine::Bmc => {
                    let mut manager = BeManager::new();
                    let fsm = BeFsm::build(arena, registry, &mut manager, model)?;
                    let outcome = bmc::check_ltl_spec_bmc(
                        arena,
                        registry,
                        &mut manager,
                        &fsm,
                        expr,
                        &options.bmc,
                    )?;
                    match outcome {
                        bmc::BmcOutcome::Counterexample(trace) => {
                            self.props[index].trace = Some(traces.register_trace(trace));
                            Ok(PropStatus::False)
                        }
                        bmc::BmcOutcome::NoCounterexample => {
                            info!(
                                "no counterexample up to bound {}; property stays undecided",
                                options.bmc.bound
                            );
                            Ok(PropStatus::Unchecked)
                        }
                        bmc::BmcOutcome::NotSolved => Ok(PropStatus::Unchecked),
                    }
                }
            },
            PropKind::Invar => match options.invar_strategy {
                InvarStrategy::Forward => {
                    let mut manager = BddManager::new(registry);
                    let fsm =
                        BddFsm::build(arena, registry, &mut manager, model, options.partition)?;
                    let (holds, trace) = mc::invar::check_invariant_forward(
                        arena, registry, &mut manager, &fsm, expr,
                    )?;
                    if let Some(trace) = trace {
                        self.props[index].trace = Some(traces.register_trace(trace));
                    }
                    Ok(if holds { PropStatus::True } else { PropStatus::False })
                }
                InvarStrategy::ForwardBackward => {
                    let mut manager = BddManager::new(registry);
                    let fsm =
                        BddFsm::build(arena, registry, &mut manager, model, options.partition)?;
                    let holds = mc::invar::check_invariant_forward_backward(
                        arena, registry, &mut manager, &fsm, expr,
                    )?;
                    Ok(if holds { PropStatus::True } else { PropStatus::False })
                }
                InvarStrategy::Induction => {
                    let mut manager = BeManager::new();
                    let fsm = BeFsm::build(arena, registry, &mut manager, model)?;
                    let outcome = bmc::check_invar_induction(
                        arena,
                        registry,
                        &mut manager,
                        &fsm,
                        expr,
                        &options.bmc,
                    )?;
                    match outcome {
                        bmc::InductionOutcome::Falsified(trace) => {
                            self.props[index].trace = Some(traces.register_trace(trace));
                            Ok(PropStatus::False)
                        }
                        bmc::InductionOutcome::Proved => Ok(PropStatus::True),
                        bmc::InductionOutcome::Unknown => {
                            warn!(
                                "induction inconclusive up to depth {}",
                                options.bmc.bound
                            );
                            Ok(PropStatus::Unchecked)
                        }
                    }
                }
            },
            PropKind::Psl | PropKind::NoType => unreachable!("resolved before dispatch"),
        }
    }

    /// The kind a property is actually verified under; PSL properties lower
    /// to CTL or LTL on first use and the lowering is memoized.
    fn resolve_kind(&mut self, index: usize, arena: &ExprArena) -> CheckResult<PropKind> {
        let prop = &self.props[index];
        match prop.kind {
            PropKind::Psl => {
                if let Some(kind) = prop.lowered {
                    return Ok(kind);
                }
                let kind = lower_psl(arena, prop.expr, prop.line)?;
                self.props[index].lowered = Some(kind);
                Ok(kind)
            }
            kind => Ok(kind),
        }
    }

    /// Verify every unchecked property, by kind (CTL, COMPUTE, LTL, PSL,
    /// INVAR) and by ascending index within a kind. Memory exhaustion of
    /// the solver aborts the run; any other failure is reported and the
    /// remaining properties are still attempted.
    pub fn verify_all(
        &mut self,
        arena: &mut ExprArena,
        registry: &mut SymbolRegistry,
        model: &SexpFsm,
        traces: &mut TraceManager,
        options: &VerificationOptions,
    ) -> CheckResult<()> {
        let mut order: Vec<usize> = (0..self.props.len()).collect();
        order.sort_by_key(|&i| (self.props[i].kind.rank(), i));
        for index in order {
            match self.verify(index, arena, registry, model, traces, options) {
                Ok(()) => {}
                Err(CheckError::SolverMemout) => return Err(CheckError::SolverMemout),
                Err(err) => {
                    error!("property {index} failed: {err}");
                }
            }
        }
        Ok(())
    }

    /// Report lines for the properties matching the given filters.
    pub fn print_properties(
        &self,
        arena: &ExprArena,
        kind: Option<PropKind>,
        status: Option<&PropStatus>,
    ) -> Vec<String> {
        let mut lines = Vec::new();
        for prop in &self.props {
            if kind.map(|k| prop.kind != k).unwrap_or(false) {
                continue;
            }
            if status
                .map(|s| std::mem::discriminant(&prop.status) != std::mem::discriminant(s))
                .unwrap_or(false)
            {
                continue;
            }
            let value = match prop.status {
                PropStatus::Number(result) => format!(" = {result}"),
                _ => String::new(),
            };
            let trace = prop
                .trace
                .map(|id| format!(" [trace {id}]"))
                .unwrap_or_default();
            lines.push(format!(
                "[{:3}] {} [{}] [{}]{value}{trace}",
                prop.index,
                display_expr(arena, prop.expr),
                prop.kind,
                prop.status,
            ));
        }
        lines
    }
}

/// Kind-level typechecking: the operator families must match the property
/// kind.
fn typecheck(arena: &ExprArena, expr: ExprId, kind: PropKind, line: u32) -> CheckResult<()> {
    let has_ctl = contains_op(arena, expr, |op| op.is_ctl());
    let has_ltl = contains_op(arena, expr, |op| op.is_ltl());
    let has_compute = contains_op(arena, expr, |op| matches!(op, Op::MinU | Op::MaxU));
    match kind {
        PropKind::Ctl if has_ltl => Err(CheckError::TypeError(format!(
            "line {line}: LTL operators in a CTL property"
        ))),
        PropKind::Ltl if has_ctl => Err(CheckError::TypeError(format!(
            "line {line}: CTL operators in an LTL property"
        ))),
        PropKind::Invar if has_ctl || has_ltl || has_compute => Err(CheckError::TypeError(
            format!("line {line}: an invariant must be propositional"),
        )),
        PropKind::Compute if !matches!(arena.op(expr), Op::MinU | Op::MaxU) => {
            Err(CheckError::TypeError(format!(
                "line {line}: a COMPUTE property must be MIN [..] or MAX [..]"
            )))
        }
        _ if kind != PropKind::Compute && has_compute => Err(CheckError::TypeError(format!(
            "line {line}: MIN/MAX outside a COMPUTE property"
        ))),
        _ => Ok(()),
    }
}

fn contains_op(arena: &ExprArena, expr: ExprId, pred: impl Fn(Op) -> bool + Copy) -> bool {
    if expr.is_nil() {
        return false;
    }
    pred(arena.op(expr))
        || contains_op(arena, arena.left(expr), pred)
        || contains_op(arena, arena.right(expr), pred)
}

/// Lower a PSL property to the fragment it actually uses.
fn lower_psl(arena: &ExprArena, expr: ExprId, line: u32) -> CheckResult<PropKind> {
    let has_ctl = contains_op(arena, expr, |op| op.is_ctl());
    let has_ltl = contains_op(arena, expr, |op| op.is_ltl());
    match (has_ctl, has_ltl) {
        (true, true) => Err(CheckError::PslUnsupported(format!(
            "line {line}: branching and linear operators mixed"
        ))),
        (true, false) => Ok(PropKind::Ctl),
        _ => Ok(PropKind::Ltl),
    }
}
