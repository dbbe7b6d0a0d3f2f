//! The arena that owns all expression nodes, with hash-consing and a free
//! list for short-lived nodes.

use crate::expr::node::{AtomId, ExprData, ExprId, ExprNode, Op};

use std::collections::{HashMap, HashSet};

/// Node storage grows in fixed-size chunks to keep reallocation rare.
const NODE_CHUNK: usize = 1024;

/// Arena owning every expression node of a session.
///
/// Nodes come in two provenances. Interned nodes are canonical: structurally
/// equal requests return the same id, and interned nodes are never freed.
/// Fresh nodes created by [ExprArena::make] are not canonical and may be
/// returned to the free list with [ExprArena::release].
pub struct ExprArena {
    nodes: Vec<ExprNode>,
    table: HashMap<(Op, ExprData), ExprId>,
    free: Vec<u32>,
    atoms: Vec<String>,
    atom_table: HashMap<String, AtomId>,
}

impl Default for ExprArena {
    fn default() -> Self {
        Self::new()
    }
}

impl ExprArena {
    pub fn new() -> ExprArena {
        let mut arena = ExprArena {
            nodes: Vec::with_capacity(NODE_CHUNK),
            table: HashMap::new(),
            free: Vec::new(),
            atoms: Vec::new(),
            atom_table: HashMap::new(),
        };
        // slot zero is the shared nil node
        arena.nodes.push(ExprNode {
            op: Op::Nil,
            data: ExprData::Pair(ExprId::NIL, ExprId::NIL),
            line: 0,
            interned: true,
        });
        arena
    }

    /// Access a node by id.
    pub fn node(&self, id: ExprId) -> &ExprNode {
        &self.nodes[id.index()]
    }

    pub fn op(&self, id: ExprId) -> Op {
        self.nodes[id.index()].op
    }

    pub fn left(&self, id: ExprId) -> ExprId {
        self.nodes[id.index()].left()
    }

    pub fn right(&self, id: ExprId) -> ExprId {
        self.nodes[id.index()].right()
    }

    pub fn line(&self, id: ExprId) -> u32 {
        self.nodes[id.index()].line
    }

    /// The string of an atom node. Panics when `id` is not an atom.
    pub fn atom_str(&self, id: ExprId) -> &str {
        match self.nodes[id.index()].data {
            ExprData::Atom(atom) => &self.atoms[atom.0 as usize],
            _ => panic!("expression node is not an atom"),
        }
    }

    /// The value of a number node, if `id` is one.
    pub fn number_value(&self, id: ExprId) -> Option<i64> {
        match self.nodes[id.index()].data {
            ExprData::Number(value) => Some(value),
            _ => None,
        }
    }

    fn allocate(&mut self, node: ExprNode) -> ExprId {
        if let Some(slot) = self.free.pop() {
            self.nodes[slot as usize] = node;
            return ExprId(slot);
        }
        if self.nodes.len() == self.nodes.capacity() {
            self.nodes.reserve(NODE_CHUNK);
        }
        let id = ExprId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    fn intern_data(&mut self, op: Op, data: ExprData, line: u32) -> ExprId {
        if let Some(&id) = self.table.get(&(op, data)) {
            return id;
        }
        let id = self.allocate(ExprNode {
            op,
            data,
            line,
            interned: true,
        });
        self.table.insert((op, data), id);
        id
    }

    /// Return the canonical node for `(op, left, right)`, creating it on
    /// first use. Structurally equal nodes share identity.
    pub fn intern(&mut self, op: Op, left: ExprId, right: ExprId, line: u32) -> ExprId {
        self.intern_data(op, ExprData::Pair(left, right), line)
    }

    /// Allocate a fresh, non-canonical node. The caller may later hand it
    /// back with [ExprArena::release].
    pub fn make(&mut self, op: Op, left: ExprId, right: ExprId, line: u32) -> ExprId {
        self.allocate(ExprNode {
            op,
            data: ExprData::Pair(left, right),
            line,
            interned: false,
        })
    }

    /// Return a node created by [ExprArena::make] to the free list.
    /// Releasing an interned node is silently ignored.
    pub fn release(&mut self, id: ExprId) {
        if id.is_nil() || self.nodes[id.index()].interned {
            return;
        }
        self.free.push(id.0);
    }

    fn intern_atom_id(&mut self, name: &str) -> AtomId {
        if let Some(&atom) = self.atom_table.get(name) {
            return atom;
        }
        let atom = AtomId(self.atoms.len() as u32);
        self.atoms.push(name.to_string());
        self.atom_table.insert(name.to_string(), atom);
        atom
    }

    /// Canonical atom node for `name`.
    pub fn mk_atom(&mut self, name: &str, line: u32) -> ExprId {
        let atom = self.intern_atom_id(name);
        self.intern_data(Op::Atom, ExprData::Atom(atom), line)
    }

    /// Canonical number node for `value`.
    pub fn mk_number(&mut self, value: i64, line: u32) -> ExprId {
        self.intern_data(Op::Number, ExprData::Number(value), line)
    }

    pub fn mk_true(&mut self) -> ExprId {
        self.intern(Op::TrueExp, ExprId::NIL, ExprId::NIL, 0)
    }

    pub fn mk_false(&mut self) -> ExprId {
        self.intern(Op::FalseExp, ExprId::NIL, ExprId::NIL, 0)
    }

    pub fn is_true(&self, id: ExprId) -> bool {
        self.op(id) == Op::TrueExp
    }

    pub fn is_false(&self, id: ExprId) -> bool {
        self.op(id) == Op::FalseExp
    }

    /// Conjunction with true/false absorption.
    pub fn mk_and(&mut self, a: ExprId, b: ExprId) -> ExprId {
        if self.is_false(a) || self.is_false(b) {
            return self.mk_false();
        }
        if self.is_true(a) {
            return b;
        }
        if self.is_true(b) || a == b {
            return a;
        }
        let line = self.line(a);
        self.intern(Op::And, a, b, line)
    }

    /// Disjunction with true/false absorption.
    pub fn mk_or(&mut self, a: ExprId, b: ExprId) -> ExprId {
        if self.is_true(a) || self.is_true(b) {
            return self.mk_true();
        }
        if self.is_false(a) {
            return b;
        }
        if self.is_false(b) || a == b {
            return a;
        }
        let line = self.line(a);
        self.intern(Op::Or, a, b, line)
    }

    /// Negation; constants fold and double negation collapses.
    pub fn mk_not(&mut self, a: ExprId) -> ExprId {
        if self.is_true(a) {
            return self.mk_false();
        }
        if self.is_false(a) {
            return self.mk_true();
        }
        if self.op(a) == Op::Not {
            return self.left(a);
        }
        let line = self.line(a);
        self.intern(Op::Not, a, ExprId::NIL, line)
    }

    pub fn mk_implies(&mut self, a: ExprId, b: ExprId) -> ExprId {
        if self.is_false(a) || self.is_true(b) {
            return self.mk_true();
        }
        if self.is_true(a) {
            return b;
        }
        let line = self.line(a);
        self.intern(Op::Implies, a, b, line)
    }

    pub fn mk_iff(&mut self, a: ExprId, b: ExprId) -> ExprId {
        if a == b {
            return self.mk_true();
        }
        if self.is_true(a) {
            return b;
        }
        if self.is_true(b) {
            return a;
        }
        let line = self.line(a);
        self.intern(Op::Iff, a, b, line)
    }

    /// `case cond : t; 1 : e; esac`, folded when the condition is constant.
    pub fn mk_ite(&mut self, cond: ExprId, t: ExprId, e: ExprId) -> ExprId {
        if self.is_true(cond) {
            return t;
        }
        if self.is_false(cond) {
            return e;
        }
        let line = self.line(cond);
        let branch = self.intern(Op::Colon, cond, t, line);
        self.intern(Op::Case, branch, e, line)
    }

    pub fn mk_next(&mut self, a: ExprId) -> ExprId {
        let line = self.line(a);
        self.intern(Op::Next, a, ExprId::NIL, line)
    }

    pub fn mk_equal(&mut self, a: ExprId, b: ExprId) -> ExprId {
        let line = self.line(a);
        self.intern(Op::Equal, a, b, line)
    }

    pub fn mk_cons(&mut self, head: ExprId, tail: ExprId) -> ExprId {
        let line = self.line(head);
        self.intern(Op::Cons, head, tail, line)
    }

    /// Build a right-spined `Cons` list from the given items.
    pub fn mk_list(&mut self, items: &[ExprId]) -> ExprId {
        let mut list = ExprId::NIL;
        for &item in items.iter().rev() {
            list = self.mk_cons(item, list);
        }
        list
    }

    /// Iterate the items of a right-spined `Cons` list.
    pub fn list_items(&self, mut list: ExprId) -> Vec<ExprId> {
        let mut items = Vec::new();
        while !list.is_nil() {
            debug_assert_eq!(self.op(list), Op::Cons);
            items.push(self.left(list));
            list = self.right(list);
        }
        items
    }

    /// Flatten a `Dot`-chained identifier into its textual form, if the
    /// expression is an identifier at all.
    pub fn qualified_name(&self, id: ExprId) -> Option<String> {
        match self.op(id) {
            Op::Atom => Some(self.atom_str(id).to_string()),
            Op::Dot => {
                let right = self.qualified_name(self.right(id))?;
                if self.left(id).is_nil() {
                    // a null context denotes an absolute name
                    Some(right)
                } else {
                    let left = self.qualified_name(self.left(id))?;
                    Some(format!("{left}.{right}"))
                }
            }
            _ => None,
        }
    }

    /// Collect the names of all identifiers occurring in `id`, looking
    /// through every operator including `next`.
    pub fn collect_atom_names(&self, id: ExprId, out: &mut HashSet<String>) {
        if id.is_nil() {
            return;
        }
        match self.op(id) {
            Op::Atom | Op::Dot => {
                if let Some(name) = self.qualified_name(id) {
                    out.insert(name);
                }
            }
            Op::Number | Op::TrueExp | Op::FalseExp | Op::SelfExp | Op::Nil => {}
            _ => {
                self.collect_atom_names(self.left(id), out);
                self.collect_atom_names(self.right(id), out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::expr::{ExprArena, ExprId, Op};

    #[test]
    /// Interning the same structure twice must return the same id, and
    /// releasing an interned node must be a no-op.
    fn interning_is_canonical() {
        let mut arena = ExprArena::new();
        let x = arena.mk_atom("x", 1);
        let y = arena.mk_atom("y", 1);
        let a = arena.intern(Op::And, x, y, 1);
        let b = arena.intern(Op::And, x, y, 7);
        assert_eq!(a, b);

        arena.release(a);
        let c = arena.intern(Op::And, x, y, 2);
        assert_eq!(a, c);
        assert_eq!(arena.op(a), Op::And);
    }

    #[test]
    /// Fresh nodes are not canonical and their slots are recycled.
    fn fresh_nodes_recycle() {
        let mut arena = ExprArena::new();
        let x = arena.mk_atom("x", 1);
        let a = arena.make(Op::Not, x, ExprId::NIL, 1);
        let b = arena.make(Op::Not, x, ExprId::NIL, 1);
        assert_ne!(a, b);

        arena.release(b);
        let c = arena.make(Op::Or, x, x, 1);
        assert_eq!(b, c);
    }

    #[test]
    /// Lists are right-spined cons chains terminated by nil.
    fn list_round_trip() {
        let mut arena = ExprArena::new();
        let items = vec![
            arena.mk_number(1, 0),
            arena.mk_number(2, 0),
            arena.mk_number(3, 0),
        ];
        let list = arena.mk_list(&items);
        assert_eq!(arena.list_items(list), items);
    }

    #[test]
    /// Constant folding in the smart constructors.
    fn smart_constructors_fold() {
        let mut arena = ExprArena::new();
        let t = arena.mk_true();
        let f = arena.mk_false();
        let x = arena.mk_atom("x", 1);

        assert_eq!(arena.mk_and(t, x), x);
        assert_eq!(arena.mk_and(f, x), f);
        assert_eq!(arena.mk_or(f, x), x);
        assert_eq!(arena.mk_or(t, x), t);
        let not_x = arena.mk_not(x);
        assert_eq!(arena.mk_not(not_x), x);
        assert_eq!(arena.mk_ite(t, x, f), x);
    }
}
