//! Propositional encodings of bounded LTL problems: the unrolled path and
//! the formula recurrences for the no-loop and single-loop regimes.

use crate::be::{expr_to_be, Be, BeManager, BeVar};
use crate::errors::{CheckError, CheckResult};
use crate::expr::{ExprArena, ExprId, Op};
use crate::fsm::BeFsm;
use crate::symbols::SymbolRegistry;

use std::collections::HashMap;

/// `Path(k) = I(s0) & V(s0) & AND_i T(s_i, i_i, s_i+1) & V(s_i+1)`.
pub fn unroll_path(manager: &mut BeManager, fsm: &BeFsm, k: u32) -> Be {
    let init = manager.shift_curr_next_to_time(fsm.init, 0);
    let invar = manager.shift_curr_next_to_time(fsm.invar, 0);
    let mut path = manager.be_and(init, invar);
    for time in 0..k {
        let trans = manager.shift_curr_next_to_time(fsm.trans, time);
        let invar = manager.shift_curr_next_to_time(fsm.invar, time + 1);
        let step = manager.be_and(trans, invar);
        path = manager.be_and(path, step);
    }
    path
}

/// `Loop(l, k)`: every state bit agrees between times `l` and `k`.
pub fn loop_condition(manager: &mut BeManager, registry: &SymbolRegistry, l: u32, k: u32) -> Be {
    let encoding = registry.encoding();
    let mut condition = manager.be_true();
    for position in 0..encoding.bit_count() {
        if encoding.bit(position).input {
            continue;
        }
        let at_l = manager.mk_var(BeVar::StateAt { position, time: l });
        let at_k = manager.mk_var(BeVar::StateAt { position, time: k });
        let agree = manager.be_iff(at_l, at_k);
        condition = manager.be_and(condition, agree);
    }
    condition
}

/// Does the formula use past-time operators anywhere?
pub fn has_past_operators(arena: &ExprArena, expr: ExprId) -> bool {
    if expr.is_nil() {
        return false;
    }
    arena.op(expr).is_ltl_past()
        || has_past_operators(arena, arena.left(expr))
        || has_past_operators(arena, arena.right(expr))
}

/// Encoder of one LTL formula over a `k`-unrolled path. The formula must
/// be in negation normal form (`F`/`G`/`O`/`H` already normalized away).
pub struct LtlEncoder<'a> {
    pub arena: &'a ExprArena,
    pub registry: &'a SymbolRegistry,
    pub manager: &'a mut BeManager,
    pub k: u32,
    memo: HashMap<(ExprId, u32), Be>,
    loop_memo: HashMap<(ExprId, u32, u32), Be>,
    leaves: HashMap<ExprId, Be>,
}

impl<'a> LtlEncoder<'a> {
    pub fn new(
        arena: &'a ExprArena,
        registry: &'a SymbolRegistry,
        manager: &'a mut BeManager,
        k: u32,
    ) -> LtlEncoder<'a> {
        LtlEncoder {
            arena,
            registry,
            manager,
            k,
            memo: HashMap::new(),
            loop_memo: HashMap::new(),
            leaves: HashMap::new(),
        }
    }

    fn leaf_at(&mut self, expr: ExprId, time: u32) -> CheckResult<Be> {
        let untimed = match self.leaves.get(&expr) {
            Some(&be) => be,
            None => {
                let be = expr_to_be(self.arena, self.registry, self.manager, expr)?;
                self.leaves.insert(expr, be);
                be
            }
        };
        Ok(self.manager.shift_curr_next_to_time(untimed, time))
    }

    /// Finite-prefix (pessimistic) semantics at position `time`.
    pub fn encode_no_loop(&mut self, expr: ExprId, time: u32) -> CheckResult<Be> {
        if let Some(&be) = self.memo.get(&(expr, time)) {
            return Ok(be);
        }
        let k = self.k;
        let op = self.arena.op(expr);
        let left = self.arena.left(expr);
        let right = self.arena.right(expr);
        let result = match op {
            Op::And | Op::Or => {
                let l = self.encode_no_loop(left, time)?;
                let r = self.encode_no_loop(right, time)?;
                if op == Op::And {
                    self.manager.be_and(l, r)
                } else {
                    self.manager.be_or(l, r)
                }
            }
            Op::LtlX => {
                if time < k {
                    self.encode_no_loop(left, time + 1)?
                } else {
                    self.manager.be_false()
                }
            }
            Op::LtlU => {
                // g now, or f now and the rest later
                let mut result = self.manager.be_false();
                let mut prefix = self.manager.be_true();
                for j in time..=k {
                    let g = self.encode_no_loop(right, j)?;
                    let hit = self.manager.be_and(prefix, g);
                    result = self.manager.be_or(result, hit);
                    let f = self.encode_no_loop(left, j)?;
                    prefix = self.manager.be_and(prefix, f);
                }
                result
            }
            Op::LtlV => {
                // without a loop the release must be discharged by f
                let mut result = self.manager.be_false();
                let mut prefix = self.manager.be_true();
                for j in time..=k {
                    let g = self.encode_no_loop(right, j)?;
                    prefix = self.manager.be_and(prefix, g);
                    let f = self.encode_no_loop(left, j)?;
                    let hit = self.manager.be_and(prefix, f);
                    result = self.manager.be_or(result, hit);
                }
                result
            }
            Op::LtlY | Op::LtlZ => {
                if time > 0 {
                    self.encode_no_loop(left, time - 1)?
                } else if op == Op::LtlY {
                    self.manager.be_false()
                } else {
                    self.manager.be_true()
                }
            }
            Op::LtlS => {
                let mut result = self.manager.be_false();
                let mut suffix = self.manager.be_true();
                for j in (0..=time).rev() {
                    let g = self.encode_no_loop(right, j)?;
                    let hit = self.manager.be_and(suffix, g);
                    result = self.manager.be_or(result, hit);
                    let f = self.encode_no_loop(left, j)?;
                    suffix = self.manager.be_and(suffix, f);
                }
                result
            }
            Op::LtlT => {
                let mut result = self.manager.be_false();
                let mut suffix = self.manager.be_true();
                for j in (0..=time).rev() {
                    let g = self.encode_no_loop(right, j)?;
                    suffix = self.manager.be_and(suffix, g);
                    let f = self.encode_no_loop(left, j)?;
                    let hit = self.manager.be_and(suffix, f);
                    result = self.manager.be_or(result, hit);
                }
                let all = suffix;
                self.manager.be_or(result, all)
            }
            Op::Not => {
                // NNF leaves negations only on propositional parts
                let l = self.leaf_at(expr, time)?;
                l
            }
            op if op.is_ltl() || op.is_ctl() => {
                return Err(CheckError::TypeError(format!(
                    "operator {op:?} is not supported by the bounded encoding"
                )));
            }
            _ => self.leaf_at(expr, time)?,
        };
        self.memo.insert((expr, time), result);
        Ok(result)
    }

    /// Lasso semantics at position `time` for the loop point `l`. The
    /// positions of the infinite path are `0..k-1` with the successor of
    /// `k - 1` being `l`. Past operators are not supported here.
    pub fn encode_loop(&mut self, expr: ExprId, time: u32, l: u32) -> CheckResult<Be> {
        if let Some(&be) = self.loop_memo.get(&(expr, time, l)) {
            return Ok(be);
        }
        let result = self.encode_loop_uncached(expr, time, l)?;
        self.loop_memo.insert((expr, time, l), result);
        Ok(result)
    }

    fn encode_loop_uncached(&mut self, expr: ExprId, time: u32, l: u32) -> CheckResult<Be> {
        let k = self.k;
        let op = self.arena.op(expr);
        let left = self.arena.left(expr);
        let right = self.arena.right(expr);
        match op {
            Op::And | Op::Or => {
                let lhs = self.encode_loop(left, time, l)?;
                let rhs = self.encode_loop(right, time, l)?;
                Ok(if op == Op::And {
                    self.manager.be_and(lhs, rhs)
                } else {
                    self.manager.be_or(lhs, rhs)
                })
            }
            Op::LtlX => {
                let successor = if time + 1 < k { time + 1 } else { l };
                self.encode_loop(left, successor, l)
            }
            Op::LtlU => {
                // the forward part of the lasso
                let mut result = self.manager.be_false();
                let mut prefix = self.manager.be_true();
                for j in time..k {
                    let g = self.encode_loop(right, j, l)?;
                    let hit = self.manager.be_and(prefix, g);
                    result = self.manager.be_or(result, hit);
                    let f = self.encode_loop(left, j, l)?;
                    prefix = self.manager.be_and(prefix, f);
                }
                // wrap around: f holds to the end, then from l up to time
                let mut wrap = prefix;
                let mut inner = self.manager.be_false();
                let mut loop_prefix = self.manager.be_true();
                for j in l..time {
                    let g = self.encode_loop(right, j, l)?;
                    let hit = self.manager.be_and(loop_prefix, g);
                    inner = self.manager.be_or(inner, hit);
                    let f = self.encode_loop(left, j, l)?;
                    loop_prefix = self.manager.be_and(loop_prefix, f);
                }
                wrap = self.manager.be_and(wrap, inner);
                Ok(self.manager.be_or(result, wrap))
            }
            Op::LtlV => {
                // g forever along the visited positions
                let from = time.min(l);
                let mut always = self.manager.be_true();
                for j in from..k {
                    let g = self.encode_loop(right, j, l)?;
                    always = self.manager.be_and(always, g);
                }
                // or f releases within the forward part
                let mut result = always;
                let mut prefix = self.manager.be_true();
                for j in time..k {
                    let g = self.encode_loop(right, j, l)?;
                    prefix = self.manager.be_and(prefix, g);
                    let f = self.encode_loop(left, j, l)?;
                    let hit = self.manager.be_and(prefix, f);
                    result = self.manager.be_or(result, hit);
                }
                // or f releases after the wrap-around
                let mut loop_part = self.manager.be_false();
                let mut loop_prefix = prefix;
                for j in l..time {
                    let g = self.encode_loop(right, j, l)?;
                    loop_prefix = self.manager.be_and(loop_prefix, g);
                    let f = self.encode_loop(left, j, l)?;
                    let hit = self.manager.be_and(loop_prefix, f);
                    loop_part = self.manager.be_or(loop_part, hit);
                }
                Ok(self.manager.be_or(result, loop_part))
            }
            op if op.is_ltl_past() => Err(CheckError::TypeError(
                "past-time operators are not supported under loopbacks".to_string(),
            )),
            op if op.is_ltl() || op.is_ctl() => Err(CheckError::TypeError(format!(
                "operator {op:?} is not supported by the bounded encoding"
            ))),
            _ => self.leaf_at(expr, time),
        }
    }

    /// The justice constraints along the loop body `l..k-1`.
    pub fn loop_fairness(&mut self, justice: &[Be], l: u32) -> Be {
        let mut all = self.manager.be_true();
        for &constraint in justice {
            let mut seen = self.manager.be_false();
            for j in l..self.k {
                let at_j = self.manager.shift_curr_next_to_time(constraint, j);
                seen = self.manager.be_or(seen, at_j);
            }
            all = self.manager.be_and(all, seen);
        }
        all
    }
}
