//! The Boolean-expression back-end: a reduced AIG with complement edges,
//! per-time-frame variable replicas, and Tseitin CNF conversion.

pub mod cnf;
pub mod encode;

pub use cnf::Cnf;
pub use encode::expr_to_be;

use crate::encode::SymbolicFactory;
use crate::symbols::SymbolRegistry;

use std::collections::{HashMap, HashSet};

/// A handle into the AIG: node index plus a complement bit.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Ord, PartialOrd)]
pub struct Be(u32);

impl Be {
    /// The constant-true handle (node zero, not complemented).
    pub const TRUE: Be = Be(0);
    /// The constant-false handle (node zero, complemented).
    pub const FALSE: Be = Be(1);

    fn new(node: usize, negated: bool) -> Be {
        Be(((node as u32) << 1) | u32::from(negated))
    }

    fn node(self) -> usize {
        (self.0 >> 1) as usize
    }

    fn negated(self) -> bool {
        self.0 & 1 == 1
    }

    /// Complement edge: negation is free.
    pub fn not(self) -> Be {
        Be(self.0 ^ 1)
    }
}

/// An untimed or timed Boolean variable of the circuit layer. Untimed
/// variables refer to encoded bits of the current/next state or the inputs;
/// timed variables are their per-time-frame replicas used by unrolling.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum BeVar {
    Curr(usize),
    Next(usize),
    Input(usize),
    StateAt { position: usize, time: u32 },
    InputAt { position: usize, time: u32 },
}

#[derive(Clone, Copy, Debug)]
enum BeNode {
    True,
    Var(BeVar),
    And(Be, Be),
}

/// The manager owning the AIG. AND nodes are hash-consed, so structurally
/// equal sub-circuits share nodes across all time frames.
pub struct BeManager {
    nodes: Vec<BeNode>,
    var_cache: HashMap<BeVar, Be>,
    and_cache: HashMap<(Be, Be), Be>,
    cnf_ids: HashMap<usize, i64>,
    cnf_nodes: HashMap<i64, usize>,
    next_cnf_var: i64,
    input_positions: HashSet<usize>,
}

impl Default for BeManager {
    fn default() -> Self {
        Self::new()
    }
}

impl BeManager {
    pub fn new() -> BeManager {
        BeManager {
            nodes: vec![BeNode::True],
            var_cache: HashMap::new(),
            and_cache: HashMap::new(),
            cnf_ids: HashMap::new(),
            cnf_nodes: HashMap::new(),
            next_cnf_var: 0,
            input_positions: HashSet::new(),
        }
    }

    /// Record which encoded bit positions belong to input variables, so the
    /// expression evaluator produces input literals for them.
    pub fn sync_inputs(&mut self, registry: &SymbolRegistry) {
        let encoding = registry.encoding();
        self.input_positions = (0..encoding.bit_count())
            .filter(|&position| encoding.bit(position).input)
            .collect();
    }

    pub fn be_true(&self) -> Be {
        Be::TRUE
    }

    pub fn be_false(&self) -> Be {
        Be::FALSE
    }

    pub fn is_constant(&self, be: Be) -> bool {
        be.node() == 0
    }

    /// The (hash-consed) variable node for `var`.
    pub fn mk_var(&mut self, var: BeVar) -> Be {
        if let Some(&be) = self.var_cache.get(&var) {
            return be;
        }
        let be = Be::new(self.nodes.len(), false);
        self.nodes.push(BeNode::Var(var));
        self.var_cache.insert(var, be);
        be
    }

    pub fn be_not(&self, a: Be) -> Be {
        a.not()
    }

    pub fn be_and(&mut self, a: Be, b: Be) -> Be {
        if a == Be::FALSE || b == Be::FALSE || a == b.not() {
            return Be::FALSE;
        }
        if a == Be::TRUE {
            return b;
        }
        if b == Be::TRUE || a == b {
            return a;
        }
        let key = if a <= b { (a, b) } else { (b, a) };
        if let Some(&be) = self.and_cache.get(&key) {
            return be;
        }
        let be = Be::new(self.nodes.len(), false);
        self.nodes.push(BeNode::And(key.0, key.1));
        self.and_cache.insert(key, be);
        be
    }

    pub fn be_or(&mut self, a: Be, b: Be) -> Be {
        self.be_and(a.not(), b.not()).not()
    }

    pub fn be_xor(&mut self, a: Be, b: Be) -> Be {
        let left = self.be_and(a, b.not());
        let right = self.be_and(a.not(), b);
        self.be_or(left, right)
    }

    pub fn be_iff(&mut self, a: Be, b: Be) -> Be {
        self.be_xor(a, b).not()
    }

    pub fn be_ite(&mut self, c: Be, t: Be, e: Be) -> Be {
        let then_part = self.be_and(c, t);
        let else_part = self.be_and(c.not(), e);
        self.be_or(then_part, else_part)
    }

    /// Move an untimed expression to concrete time frames: current-state
    /// bits go to time `t`, next-state bits to `t + 1`, input bits to the
    /// transition `t -> t + 1`.
    pub fn shift_curr_next_to_time(&mut self, be: Be, time: u32) -> Be {
        let mut memo = HashMap::new();
        self.shift_rec(be, time, &mut memo)
    }

    fn shift_rec(&mut self, be: Be, time: u32, memo: &mut HashMap<usize, Be>) -> Be {
        let node_index = be.node();
        if let Some(&shifted) = memo.get(&node_index) {
            return if be.negated() { shifted.not() } else { shifted };
        }
        let shifted = match self.nodes[node_index] {
            BeNode::True => Be::TRUE,
            BeNode::Var(BeVar::Curr(position)) => self.mk_var(BeVar::StateAt { position, time }),
            BeNode::Var(BeVar::Next(position)) => self.mk_var(BeVar::StateAt {
                position,
                time: time + 1,
            }),
            BeNode::Var(BeVar::Input(position)) => self.mk_var(BeVar::InputAt { position, time }),
            BeNode::Var(timed) => self.mk_var(timed),
            BeNode::And(a, b) => {
                let a = self.shift_rec(a, time, memo);
                let b = self.shift_rec(b, time, memo);
                self.be_and(a, b)
            }
        };
        memo.insert(node_index, shifted);
        if be.negated() {
            shifted.not()
        } else {
            shifted
        }
    }

    /// Reserve a fresh CNF variable outside of the circuit (used for solver
    /// group activation literals).
    pub fn reserve_cnf_var(&mut self) -> i64 {
        self.next_cnf_var += 1;
        self.next_cnf_var
    }

    fn cnf_id_of(&mut self, node: usize) -> i64 {
        if let Some(&id) = self.cnf_ids.get(&node) {
            return id;
        }
        self.next_cnf_var += 1;
        self.cnf_ids.insert(node, self.next_cnf_var);
        self.cnf_nodes.insert(self.next_cnf_var, node);
        self.next_cnf_var
    }

    /// The variable behind a CNF id, when the id belongs to a variable node
    /// (and not to a Tseitin gate or an activation literal).
    pub fn cnf_var_to_be_var(&self, cnf_id: i64) -> Option<BeVar> {
        let node = *self.cnf_nodes.get(&cnf_id)?;
        match self.nodes[node] {
            BeNode::Var(var) => Some(var),
            _ => None,
        }
    }

    /// Tseitin conversion. The returned CNF is satisfiable together with its
    /// asserted output literal iff the expression is satisfiable.
    pub fn convert_to_cnf(&mut self, be: Be) -> Cnf {
        let mut clauses: Vec<Vec<i64>> = Vec::new();
        if self.is_constant(be) {
            // encode the constant through a forced fresh variable
            let var = self.reserve_cnf_var();
            clauses.push(vec![var]);
            let output = if be == Be::TRUE { var } else { -var };
            return Cnf {
                clauses,
                output,
                max_var: self.next_cnf_var,
            };
        }
        let mut emitted: HashSet<usize> = HashSet::new();
        let mut stack = vec![be.node()];
        while let Some(node_index) = stack.pop() {
            if !emitted.insert(node_index) {
                continue;
            }
            if let BeNode::And(a, b) = self.nodes[node_index] {
                let gate = self.cnf_id_of(node_index);
                let a_lit = self.literal_of(a);
                let b_lit = self.literal_of(b);
                clauses.push(vec![-gate, a_lit]);
                clauses.push(vec![-gate, b_lit]);
                clauses.push(vec![gate, -a_lit, -b_lit]);
                stack.push(a.node());
                stack.push(b.node());
            }
        }
        let output = self.literal_of(be);
        Cnf {
            clauses,
            output,
            max_var: self.next_cnf_var,
        }
    }

    fn literal_of(&mut self, be: Be) -> i64 {
        let id = self.cnf_id_of(be.node());
        if be.negated() {
            -id
        } else {
            id
        }
    }

    /// Project a CNF model (DIMACS literals) back to the circuit variables.
    pub fn cnf_model_to_be_model(&self, model: &[i64]) -> Vec<(BeVar, bool)> {
        let mut assignment = Vec::new();
        for &literal in model {
            if let Some(var) = self.cnf_var_to_be_var(literal.abs()) {
                assignment.push((var, literal > 0));
            }
        }
        assignment
    }
}

/// The factory view of the manager used by the generic expression evaluator.
impl SymbolicFactory for BeManager {
    type Term = Be;

    fn mk_true(&mut self) -> Be {
        Be::TRUE
    }

    fn mk_false(&mut self) -> Be {
        Be::FALSE
    }

    fn mk_not(&mut self, a: &Be) -> Be {
        a.not()
    }

    fn mk_and(&mut self, a: &Be, b: &Be) -> Be {
        self.be_and(*a, *b)
    }

    fn mk_or(&mut self, a: &Be, b: &Be) -> Be {
        self.be_or(*a, *b)
    }

    fn mk_ite(&mut self, c: &Be, t: &Be, e: &Be) -> Be {
        self.be_ite(*c, *t, *e)
    }

    fn bit(&mut self, position: usize, next: bool) -> Be {
        if self.input_positions.contains(&position) {
            self.mk_var(BeVar::Input(position))
        } else if next {
            self.mk_var(BeVar::Next(position))
        } else {
            self.mk_var(BeVar::Curr(position))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    /// Structural sharing and constant rules of the AIG.
    fn aig_sharing() {
        let mut mgr = BeManager::new();
        let a = mgr.mk_var(BeVar::Curr(0));
        let b = mgr.mk_var(BeVar::Curr(1));
        assert_eq!(mgr.be_and(a, b), mgr.be_and(b, a));
        assert_eq!(mgr.be_and(a, Be::TRUE), a);
        assert_eq!(mgr.be_and(a, Be::FALSE), Be::FALSE);
        assert_eq!(mgr.be_and(a, a.not()), Be::FALSE);
        assert_eq!(mgr.be_or(a, a), a);
        assert_eq!(a.not().not(), a);
    }

    #[test]
    /// Shifting renames current to time t and next to time t + 1, and
    /// distinct frames give distinct variables with shared structure.
    fn time_shifting() {
        let mut mgr = BeManager::new();
        let curr = mgr.mk_var(BeVar::Curr(0));
        let next = mgr.mk_var(BeVar::Next(0));
        let trans = mgr.be_iff(next, curr.not());

        let at0 = mgr.shift_curr_next_to_time(trans, 0);
        let at1 = mgr.shift_curr_next_to_time(trans, 1);
        assert_ne!(at0, at1);
        // shifting is stable
        assert_eq!(mgr.shift_curr_next_to_time(trans, 0), at0);

        let s0 = mgr.mk_var(BeVar::StateAt { position: 0, time: 0 });
        let s1 = mgr.mk_var(BeVar::StateAt { position: 0, time: 1 });
        let expected = mgr.be_iff(s1, s0.not());
        assert_eq!(at0, expected);
    }

    #[test]
    /// CNF carries an output literal equisatisfiable with the circuit.
    fn cnf_shape() {
        let mut mgr = BeManager::new();
        let a = mgr.mk_var(BeVar::Curr(0));
        let b = mgr.mk_var(BeVar::Curr(1));
        let and = mgr.be_and(a, b);
        let cnf = mgr.convert_to_cnf(and);
        assert_eq!(cnf.clauses.len(), 3);
        assert!(cnf.output > 0);
        assert!(cnf.max_var >= 3);

        let constant = mgr.convert_to_cnf(Be::FALSE);
        assert!(constant.output < 0);
        assert_eq!(constant.clauses.len(), 1);
    }
}
