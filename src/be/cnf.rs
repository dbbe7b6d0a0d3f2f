//! The CNF view of a circuit: clauses, a variable bound, and the output
//! literal that stands for the truth of the converted expression.

/// A Tseitin-converted formula. Literals are DIMACS-style signed variable
/// ids. Asserting `output` makes the CNF equisatisfiable with the circuit;
/// asserting `-output` with its negation.
#[derive(Clone, Debug)]
pub struct Cnf {
    pub clauses: Vec<Vec<i64>>,
    pub output: i64,
    pub max_var: i64,
}

impl Cnf {
    pub fn num_clauses(&self) -> usize {
        self.clauses.len()
    }
}
