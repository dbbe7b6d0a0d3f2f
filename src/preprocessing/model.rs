//! The flattened model contract between the front-end and the verification
//! core: constraint sections, assignments, fairness, and property lists.

use crate::expr::ExprId;
use crate::properties::PropKind;

/// Which form of assignment a statement uses.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AssignKind {
    /// `v := e` - an invariant constraint.
    Current,
    /// `init(v) := e` - an initial-state constraint.
    Init,
    /// `next(v) := e` - a transition constraint.
    Next,
}

/// One assignment statement.
#[derive(Clone, Debug)]
pub struct ModelAssign {
    pub kind: AssignKind,
    pub var: String,
    pub rhs: ExprId,
    pub line: u32,
}

/// A property as read from the model file.
#[derive(Clone, Debug)]
pub struct ParsedProperty {
    pub kind: PropKind,
    pub expr: ExprId,
    pub line: u32,
}

/// A flattened model: expression sections partitioned by their role, plus
/// the per-kind property list. Variable declarations live in the registry.
#[derive(Debug, Default)]
pub struct FlatModel {
    pub init: Vec<(ExprId, u32)>,
    pub invar: Vec<(ExprId, u32)>,
    pub trans: Vec<(ExprId, u32)>,
    pub assigns: Vec<ModelAssign>,
    pub justice: Vec<(ExprId, u32)>,
    pub compassion: Vec<(ExprId, ExprId, u32)>,
    pub properties: Vec<ParsedProperty>,
}
