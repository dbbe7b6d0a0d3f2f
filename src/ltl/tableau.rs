//! Synthesis of the symbolic tableau of an LTL formula: an auxiliary FSM
//! whose fair paths are exactly the paths satisfying the formula.

use crate::errors::{CheckError, CheckResult};
use crate::expr::{ExprArena, ExprId, Op};
use crate::fsm::SexpFsm;
use crate::symbols::{SymbolRegistry, VarRange};

use std::collections::HashMap;

/// The synthesized tableau: its FSM and the names of the variables it
/// introduced (already declared in the registry).
pub struct Tableau {
    pub fsm: SexpFsm,
    pub vars: Vec<String>,
}

/// Build the tableau of `formula` and declare its elementary variables as
/// fresh boolean state variables in the registry.
pub fn build_tableau(
    arena: &mut ExprArena,
    registry: &mut SymbolRegistry,
    formula: ExprId,
    tag: usize,
) -> CheckResult<Tableau> {
    let nnf = to_nnf(arena, formula, false)?;
    let mut builder = Builder {
        arena,
        registry,
        tag,
        counter: 0,
        memo: HashMap::new(),
        trans: Vec::new(),
        init: Vec::new(),
        justice: Vec::new(),
        vars: Vec::new(),
    };
    let characteristic = builder.sat(nnf)?;
    builder.init.insert(0, characteristic);

    let mut fsm = SexpFsm::unconstrained(builder.arena);
    for constraint in builder.init {
        fsm.init = builder.arena.mk_and(fsm.init, constraint);
    }
    for constraint in builder.trans {
        fsm.trans = builder.arena.mk_and(fsm.trans, constraint);
    }
    fsm.justice = builder.justice;
    Ok(Tableau {
        fsm,
        vars: builder.vars,
    })
}

/// Negation normal form over the LTL connectives. `F`, `G`, `O` and `H`
/// normalize into their until/release (since/trigger) forms, so the
/// tableau only handles `X`, `U`, `V`, `Y`, `Z`, `S` and `T`.
pub(crate) fn to_nnf(arena: &mut ExprArena, expr: ExprId, negate: bool) -> CheckResult<ExprId> {
    let op = arena.op(expr);
    let line = arena.line(expr);
    let left = arena.left(expr);
    let right = arena.right(expr);
    match op {
        Op::Not => to_nnf(arena, left, !negate),
        Op::And | Op::Or => {
            let l = to_nnf(arena, left, negate)?;
            let r = to_nnf(arena, right, negate)?;
            let flipped = (op == Op::And) == negate;
            Ok(if flipped {
                arena.mk_or(l, r)
            } else {
                arena.mk_and(l, r)
            })
        }
        Op::Implies => {
            if negate {
                // !(a -> b) = a & !b
                let l = to_nnf(arena, left, false)?;
                let r = to_nnf(arena, right, true)?;
                Ok(arena.mk_and(l, r))
            } else {
                let l = to_nnf(arena, left, true)?;
                let r = to_nnf(arena, right, false)?;
                Ok(arena.mk_or(l, r))
            }
        }
        Op::Iff | Op::Xor => {
            // (a <-> b) = (a & b) | (!a & !b); xor is its negation
            let flip = (op == Op::Xor) != negate;
            let a = to_nnf(arena, left, false)?;
            let na = to_nnf(arena, left, true)?;
            let b = to_nnf(arena, right, flip)?;
            let nb = to_nnf(arena, right, !flip)?;
            let both = arena.mk_and(a, b);
            let neither = arena.mk_and(na, nb);
            Ok(arena.mk_or(both, neither))
        }
        Op::LtlX => {
            let operand = to_nnf(arena, left, negate)?;
            Ok(arena.intern(Op::LtlX, operand, ExprId::NIL, line))
        }
        Op::LtlF | Op::LtlG => {
            // F f = TRUE U f, G f = FALSE V f
            let operand = to_nnf(arena, left, negate)?;
            let finally = (op == Op::LtlF) != negate;
            Ok(if finally {
                let t = arena.mk_true();
                arena.intern(Op::LtlU, t, operand, line)
            } else {
                let f = arena.mk_false();
                arena.intern(Op::LtlV, f, operand, line)
            })
        }
        Op::LtlU | Op::LtlV => {
            let l = to_nnf(arena, left, negate)?;
            let r = to_nnf(arena, right, negate)?;
            let until = (op == Op::LtlU) != negate;
            Ok(arena.intern(if until { Op::LtlU } else { Op::LtlV }, l, r, line))
        }
        Op::LtlY | Op::LtlZ => {
            let operand = to_nnf(arena, left, negate)?;
            let strong = (op == Op::LtlY) != negate;
            Ok(arena.intern(if strong { Op::LtlY } else { Op::LtlZ }, operand, ExprId::NIL, line))
        }
        Op::LtlO | Op::LtlH => {
            // O f = TRUE S f, H f = FALSE T f
            let operand = to_nnf(arena, left, negate)?;
            let once = (op == Op::LtlO) != negate;
            Ok(if once {
                let t = arena.mk_true();
                arena.intern(Op::LtlS, t, operand, line)
            } else {
                let f = arena.mk_false();
                arena.intern(Op::LtlT, f, operand, line)
            })
        }
        Op::LtlS | Op::LtlT => {
            let l = to_nnf(arena, left, negate)?;
            let r = to_nnf(arena, right, negate)?;
            let since = (op == Op::LtlS) != negate;
            Ok(arena.intern(if since { Op::LtlS } else { Op::LtlT }, l, r, line))
        }
        op if op.is_ctl() => Err(CheckError::TypeError(format!(
            "line {line}: CTL operator {op:?} inside an LTL formula"
        ))),
        // propositional leaf; negation stays local
        _ => Ok(if negate { arena.mk_not(expr) } else { expr }),
    }
}

struct Builder<'a> {
    arena: &'a mut ExprArena,
    registry: &'a mut SymbolRegistry,
    tag: usize,
    counter: usize,
    memo: HashMap<ExprId, ExprId>,
    trans: Vec<ExprId>,
    init: Vec<ExprId>,
    justice: Vec<ExprId>,
    vars: Vec<String>,
}

impl Builder<'_> {
    fn fresh_var(&mut self, line: u32) -> CheckResult<ExprId> {
        let name = format!("_ltl{}_el_{}", self.tag, self.counter);
        self.counter += 1;
        self.registry
            .declare_state_var(&name, VarRange::boolean(), line)?;
        self.vars.push(name.clone());
        Ok(self.arena.mk_atom(&name, line))
    }

    /// The characteristic formula of a subformula over the tableau
    /// variables, emitting the supporting constraints on the way.
    fn sat(&mut self, expr: ExprId) -> CheckResult<ExprId> {
        if let Some(&known) = self.memo.get(&expr) {
            return Ok(known);
        }
        let op = self.arena.op(expr);
        let line = self.arena.line(expr);
        let result = match op {
            Op::And | Op::Or => {
                let l = self.sat(self.arena.left(expr))?;
                let r = self.sat(self.arena.right(expr))?;
                if op == Op::And {
                    self.arena.mk_and(l, r)
                } else {
                    self.arena.mk_or(l, r)
                }
            }
            Op::LtlX => {
                let body = self.sat(self.arena.left(expr))?;
                let var = self.fresh_var(line)?;
                let next_body = self.arena.mk_next(body);
                let link = self.arena.mk_iff(var, next_body);
                self.trans.push(link);
                var
            }
            Op::LtlU | Op::LtlV => {
                let f = self.sat(self.arena.left(expr))?;
                let g = self.sat(self.arena.right(expr))?;
                let var = self.fresh_var(line)?;
                let characteristic = if op == Op::LtlU {
                    // f U g  =  g | (f & X (f U g))
                    let tail = self.arena.mk_and(f, var);
                    self.arena.mk_or(g, tail)
                } else {
                    // f V g  =  g & (f | X (f V g))
                    let tail = self.arena.mk_or(f, var);
                    self.arena.mk_and(g, tail)
                };
                let next_char = self.arena.mk_next(characteristic);
                let link = self.arena.mk_iff(var, next_char);
                self.trans.push(link);
                if op == Op::LtlU {
                    // the obligation must be discharged infinitely often
                    let not_char = self.arena.mk_not(characteristic);
                    let fair = self.arena.mk_or(not_char, g);
                    self.justice.push(fair);
                }
                characteristic
            }
            Op::LtlY | Op::LtlZ => {
                let body = self.sat(self.arena.left(expr))?;
                let var = self.fresh_var(line)?;
                let next_var = self.arena.mk_next(var);
                let link = self.arena.mk_iff(next_var, body);
                self.trans.push(link);
                let initial = if op == Op::LtlY {
                    self.arena.mk_not(var)
                } else {
                    var
                };
                self.init.push(initial);
                var
            }
            Op::LtlS | Op::LtlT => {
                let f = self.sat(self.arena.left(expr))?;
                let g = self.sat(self.arena.right(expr))?;
                let var = self.fresh_var(line)?;
                let characteristic = if op == Op::LtlS {
                    // f S g  =  g | (f & Y (f S g))
                    let tail = self.arena.mk_and(f, var);
                    self.arena.mk_or(g, tail)
                } else {
                    // f T g  =  g & (f | Z (f T g))
                    let tail = self.arena.mk_or(f, var);
                    self.arena.mk_and(g, tail)
                };
                // the history variable records the current characteristic
                let next_var = self.arena.mk_next(var);
                let link = self.arena.mk_iff(next_var, characteristic);
                self.trans.push(link);
                let initial = if op == Op::LtlS {
                    self.arena.mk_not(var)
                } else {
                    var
                };
                self.init.push(initial);
                characteristic
            }
            // propositional parts pass through unchanged
            _ => expr,
        };
        self.memo.insert(expr, result);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::display_expr;
    use crate::preprocessing::parse_expression;

    #[test]
    /// Negations push to the leaves and F/G normalize away.
    fn nnf_forms() {
        let mut arena = ExprArena::new();
        let cases = [
            ("!(a & b)", "!a | !b"),
            ("!G a", "TRUE U !a"),
            ("!F a", "FALSE V !a"),
            ("!(a U b)", "!a V !b"),
            ("!X a", "X !a"),
            ("!(Y a)", "Z !a"),
            ("!(a S b)", "!a T !b"),
        ];
        for (input, expected) in cases {
            let expr = parse_expression(input, &mut arena).unwrap();
            let nnf = to_nnf(&mut arena, expr, false).unwrap();
            assert_eq!(display_expr(&arena, nnf), expected, "nnf of {input}");
        }
    }

    #[test]
    /// Until subformulas contribute exactly one justice constraint.
    fn until_justice() {
        let mut arena = ExprArena::new();
        let mut registry = SymbolRegistry::new();
        let expr = parse_expression("a U b", &mut arena).unwrap();
        let tableau = build_tableau(&mut arena, &mut registry, expr, 1).unwrap();
        assert_eq!(tableau.fsm.justice.len(), 1);
        assert_eq!(tableau.vars.len(), 1);
        assert!(registry.is_state_var("_ltl1_el_0"));
    }

    #[test]
    /// A CTL operator inside an LTL formula is rejected.
    fn rejects_ctl() {
        let mut arena = ExprArena::new();
        let mut registry = SymbolRegistry::new();
        let expr = parse_expression("G EX a", &mut arena).unwrap();
        assert!(build_tableau(&mut arena, &mut registry, expr, 0).is_err());
    }
}
