//! Facade over the SAT solver: named instances, clause groups with
//! activation literals, polarity assertion, and model extraction.

use crate::be::Cnf;
use crate::errors::{CheckError, CheckResult};

use varisat::{ExtendFormula, Lit, Solver};

/// Outcome of a solver invocation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SatResult {
    Sat,
    Unsat,
    Timeout,
    Memout,
    InternalError,
}

/// Handle of a clause group. Group 0 is the permanent group.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SatGroup(usize);

impl SatGroup {
    pub const PERMANENT: SatGroup = SatGroup(0);
}

enum GroupState {
    Permanent,
    Active(i64),
    Removed,
}

/// An instance of the underlying solver. The incremental variant keeps
/// clause groups alive across queries; the non-incremental variant is meant
/// for one-shot problems and rejects group removal.
pub struct SatSolver {
    name: String,
    solver: Solver<'static>,
    groups: Vec<GroupState>,
    incremental: bool,
    last_model: Option<Vec<i64>>,
}

impl SatSolver {
    /// Create a solver instance by name. Only the built-in `varisat` engine
    /// is known.
    pub fn create(name: &str, incremental: bool) -> CheckResult<SatSolver> {
        if name != "varisat" {
            return Err(CheckError::NoSuchSolver(name.to_string()));
        }
        Ok(SatSolver {
            name: name.to_string(),
            solver: Solver::new(),
            groups: vec![GroupState::Permanent],
            incremental,
            last_model: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Open a new clause group guarded by the given activation variable.
    /// The variable must come from the same id space as the CNF literals
    /// (reserve it through the circuit manager).
    pub fn create_group(&mut self, activation_var: i64) -> SatGroup {
        let group = SatGroup(self.groups.len());
        self.groups.push(GroupState::Active(activation_var));
        group
    }

    fn group_literal(&self, group: SatGroup) -> CheckResult<Option<i64>> {
        match self.groups.get(group.0) {
            Some(GroupState::Permanent) => Ok(None),
            Some(GroupState::Active(var)) => Ok(Some(*var)),
            Some(GroupState::Removed) | None => Err(CheckError::SolverInternal(format!(
                "clause group {} is not live",
                group.0
            ))),
        }
    }

    fn add_clause(&mut self, clause: &[i64]) {
        let literals: Vec<Lit> = clause.iter().map(|&l| Lit::from_dimacs(l as isize)).collect();
        self.solver.add_clause(&literals);
    }

    /// Add all clauses of a CNF to a group. Unknown variables are introduced
    /// implicitly.
    pub fn add(&mut self, cnf: &Cnf, group: SatGroup) -> CheckResult<()> {
        let guard = self.group_literal(group)?;
        for clause in &cnf.clauses {
            match guard {
                None => self.add_clause(clause),
                Some(act) => {
                    let mut guarded = Vec::with_capacity(clause.len() + 1);
                    guarded.push(-act);
                    guarded.extend_from_slice(clause);
                    self.add_clause(&guarded);
                }
            }
        }
        Ok(())
    }

    /// Assert the output literal of a CNF (`polarity > 0`) or its negation
    /// (`polarity < 0`) inside a group.
    pub fn set_polarity(&mut self, cnf: &Cnf, polarity: i8, group: SatGroup) -> CheckResult<()> {
        let literal = if polarity >= 0 { cnf.output } else { -cnf.output };
        match self.group_literal(group)? {
            None => self.add_clause(&[literal]),
            Some(act) => self.add_clause(&[-act, literal]),
        }
        Ok(())
    }

    /// Permanently disable a group. Only available on incremental solvers;
    /// the permanent group can never be removed.
    pub fn remove_group(&mut self, group: SatGroup) -> CheckResult<()> {
        if !self.incremental {
            return Err(CheckError::SolverInternal(
                "cannot remove clause groups from a non-incremental solver".to_string(),
            ));
        }
        match self.groups.get(group.0) {
            Some(GroupState::Permanent) => Err(CheckError::SolverInternal(
                "the permanent clause group cannot be removed".to_string(),
            )),
            Some(GroupState::Active(var)) => {
                let var = *var;
                self.add_clause(&[-var]);
                self.groups[group.0] = GroupState::Removed;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn active_assumptions(&self) -> Vec<i64> {
        self.groups
            .iter()
            .filter_map(|state| match state {
                GroupState::Active(var) => Some(*var),
                _ => None,
            })
            .collect()
    }

    fn run_solver(&mut self, assumptions: &[i64]) -> SatResult {
        let literals: Vec<Lit> = assumptions.iter().map(|&l| Lit::from_dimacs(l as isize)).collect();
        self.solver.assume(&literals);
        match self.solver.solve() {
            Ok(true) => {
                self.last_model = self
                    .solver
                    .model()
                    .map(|model| model.iter().map(|lit| lit.to_dimacs() as i64).collect());
                SatResult::Sat
            }
            Ok(false) => {
                self.last_model = None;
                SatResult::Unsat
            }
            Err(_) => {
                self.last_model = None;
                SatResult::InternalError
            }
        }
    }

    /// Solve the conjunction of all live groups.
    pub fn solve_all_groups(&mut self) -> SatResult {
        let assumptions = self.active_assumptions();
        self.run_solver(&assumptions)
    }

    /// Solve all live groups under additional assumption literals.
    pub fn solve_under_assumptions(&mut self, literals: &[i64]) -> SatResult {
        let mut assumptions = self.active_assumptions();
        assumptions.extend_from_slice(literals);
        self.run_solver(&assumptions)
    }

    /// The model of the last satisfiable solve, as DIMACS literals.
    pub fn get_model(&self) -> Option<&[i64]> {
        self.last_model.as_deref()
    }
}
