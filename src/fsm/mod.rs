//! Finite-state machines in their three forms: expression level, BDD level,
//! and circuit level.

pub mod bdd_fsm;
pub mod be_fsm;
pub mod partition;
pub mod sexp;

pub use bdd_fsm::{BddFsm, MachineReport, ReachableStates};
pub use be_fsm::BeFsm;
pub use partition::{PartitionMethod, TransPartition};
pub use sexp::SexpFsm;
