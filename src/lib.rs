//! A symbolic model checker for finite-state reactive systems.
//! The library covers:
//!  - A hash-consed expression DAG shared by formulas and machine predicates.
//!  - Scalar-variable registration with Boolean bit-vector encoding.
//!  - BDD-based CTL model checking with justice/compassion fairness,
//!    an AG-only fast path, and quantitative MIN/MAX computation.
//!  - LTL model checking via the symbolic tableau construction, including
//!    the rewriting of input-variable occurrences.
//!  - SAT-based bounded model checking with loopback handling and
//!    invariant proving by induction.
//!  - Counterexample trace reconstruction from both engines.
//!

pub mod analysis;
pub mod bdd;
pub mod be;
pub mod bmc;
pub mod coi;
pub mod encode;
pub mod errors;
pub mod expr;
pub mod fsm;
pub mod ltl;
pub mod mc;
pub mod preprocessing;
pub mod properties;
pub mod result_print;
pub mod sat;
pub mod semantic;
pub mod symbols;
pub mod trace;
