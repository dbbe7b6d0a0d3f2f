//! The circuit-level FSM used by bounded model checking.

use crate::be::{expr_to_be, Be, BeManager};
use crate::errors::CheckResult;
use crate::expr::ExprArena;
use crate::fsm::sexp::SexpFsm;
use crate::symbols::SymbolRegistry;

/// An FSM whose predicates are untimed circuit terms: current-state bits,
/// next-state bits, and input bits, ready to be shifted to time frames.
pub struct BeFsm {
    pub init: Be,
    pub invar: Be,
    pub trans: Be,
    pub justice: Vec<Be>,
}

impl BeFsm {
    pub fn build(
        arena: &ExprArena,
        registry: &SymbolRegistry,
        manager: &mut BeManager,
        fsm: &SexpFsm,
    ) -> CheckResult<BeFsm> {
        let init = expr_to_be(arena, registry, manager, fsm.init)?;
        let invar = expr_to_be(arena, registry, manager, fsm.invar)?;
        let input = expr_to_be(arena, registry, manager, fsm.input)?;
        let trans_body = expr_to_be(arena, registry, manager, fsm.trans)?;
        let trans = manager.be_and(trans_body, input);
        let mut justice = Vec::with_capacity(fsm.justice.len());
        for &expr in &fsm.justice {
            justice.push(expr_to_be(arena, registry, manager, expr)?);
        }
        Ok(BeFsm {
            init,
            invar,
            trans,
            justice,
        })
    }
}
