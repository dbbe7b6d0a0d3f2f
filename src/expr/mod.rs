//! Hash-consed expression DAG - the substrate for formulas, FSM predicates and
//! symbolic terms shared by every other component.

pub mod arena;
pub mod node;
pub mod print;

pub use arena::ExprArena;
pub use node::{AtomId, ExprData, ExprId, ExprNode, Op};
pub use print::display_expr;
