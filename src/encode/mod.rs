//! Evaluation of scalar expressions into symbolic terms.
//!
//! The evaluator is generic over a [SymbolicFactory], so the same
//! range-partitioning logic lowers expressions both to BDDs and to Boolean
//! circuits. A scalar expression evaluates to a partition: a list of
//! `(value, guard)` pairs whose guards are disjoint and cover all valid
//! assignments of the participating variable bits.

use crate::errors::{CheckError, CheckResult};
use crate::expr::{ExprArena, ExprId, Op};
use crate::symbols::encoding::value_bits;
use crate::symbols::{ScalarValue, SymbolRegistry};

use std::collections::HashMap;

/// The term-building operations a symbolic back-end must provide.
pub trait SymbolicFactory {
    type Term: Clone;

    fn mk_true(&mut self) -> Self::Term;
    fn mk_false(&mut self) -> Self::Term;
    fn mk_not(&mut self, a: &Self::Term) -> Self::Term;
    fn mk_and(&mut self, a: &Self::Term, b: &Self::Term) -> Self::Term;
    fn mk_or(&mut self, a: &Self::Term, b: &Self::Term) -> Self::Term;
    fn mk_ite(&mut self, c: &Self::Term, t: &Self::Term, e: &Self::Term) -> Self::Term;

    /// The literal of an encoded bit at the given global ordering position,
    /// in the current or the next frame.
    fn bit(&mut self, position: usize, next: bool) -> Self::Term;
}

/// One scalar partition: disjoint guards per possible value.
pub type Partition<T> = Vec<(ScalarValue, T)>;

/// Expression evaluator over a symbolic factory.
///
/// Defines expand on first use and their expansions are memoized; a define
/// that (transitively) expands itself is reported as a circular definition
/// together with the stack of names being resolved.
pub struct Evaluator<'a, F: SymbolicFactory> {
    pub arena: &'a ExprArena,
    pub registry: &'a SymbolRegistry,
    pub factory: &'a mut F,
    define_memo: HashMap<(ExprId, bool), F::Term>,
    define_stack: Vec<String>,
}

impl<'a, F: SymbolicFactory> Evaluator<'a, F> {
    pub fn new(
        arena: &'a ExprArena,
        registry: &'a SymbolRegistry,
        factory: &'a mut F,
    ) -> Evaluator<'a, F> {
        Evaluator {
            arena,
            registry,
            factory,
            define_memo: HashMap::new(),
            define_stack: Vec::new(),
        }
    }

    /// Evaluate a Boolean expression; `next` selects the next-state frame.
    pub fn eval_bool(&mut self, expr: ExprId, next: bool) -> CheckResult<F::Term> {
        let line = self.arena.line(expr);
        match self.arena.op(expr) {
            Op::TrueExp => Ok(self.factory.mk_true()),
            Op::FalseExp => Ok(self.factory.mk_false()),
            Op::Number => match self.arena.number_value(expr) {
                Some(0) => Ok(self.factory.mk_false()),
                Some(1) => Ok(self.factory.mk_true()),
                _ => Err(CheckError::TypeError(format!(
                    "line {line}: number used as a boolean"
                ))),
            },
            Op::Not => {
                let operand = self.eval_bool(self.arena.left(expr), next)?;
                Ok(self.factory.mk_not(&operand))
            }
            Op::And => {
                let left = self.eval_bool(self.arena.left(expr), next)?;
                let right = self.eval_bool(self.arena.right(expr), next)?;
                Ok(self.factory.mk_and(&left, &right))
            }
            Op::Or => {
                let left = self.eval_bool(self.arena.left(expr), next)?;
                let right = self.eval_bool(self.arena.right(expr), next)?;
                Ok(self.factory.mk_or(&left, &right))
            }
            Op::Xor => {
                let left = self.eval_bool(self.arena.left(expr), next)?;
                let right = self.eval_bool(self.arena.right(expr), next)?;
                let not_right = self.factory.mk_not(&right);
                let not_left = self.factory.mk_not(&left);
                let a = self.factory.mk_and(&left, &not_right);
                let b = self.factory.mk_and(&not_left, &right);
                Ok(self.factory.mk_or(&a, &b))
            }
            Op::Iff => {
                let left = self.eval_bool(self.arena.left(expr), next)?;
                let right = self.eval_bool(self.arena.right(expr), next)?;
                let xor = {
                    let not_right = self.factory.mk_not(&right);
                    let not_left = self.factory.mk_not(&left);
                    let a = self.factory.mk_and(&left, &not_right);
                    let b = self.factory.mk_and(&not_left, &right);
                    self.factory.mk_or(&a, &b)
                };
                Ok(self.factory.mk_not(&xor))
            }
            Op::Implies => {
                let left = self.eval_bool(self.arena.left(expr), next)?;
                let right = self.eval_bool(self.arena.right(expr), next)?;
                let not_left = self.factory.mk_not(&left);
                Ok(self.factory.mk_or(&not_left, &right))
            }
            Op::Next => {
                if next {
                    return Err(CheckError::NestedNext { line });
                }
                self.eval_bool(self.arena.left(expr), true)
            }
            Op::Case => {
                let branch = self.arena.left(expr);
                let cond = self.eval_bool(self.arena.left(branch), next)?;
                let then = self.eval_bool(self.arena.right(branch), next)?;
                let other = self.eval_bool(self.arena.right(expr), next)?;
                Ok(self.factory.mk_ite(&cond, &then, &other))
            }
            Op::Atom | Op::Dot | Op::Context => self.eval_bool_ident(expr, next),
            Op::Equal | Op::NotEqual | Op::Lt | Op::Le | Op::Gt | Op::Ge => {
                self.eval_relational(expr, next)
            }
            Op::SetIn => self.eval_membership(expr, next),
            other => Err(CheckError::TypeError(format!(
                "line {line}: operator {other:?} does not produce a boolean"
            ))),
        }
    }

    fn eval_bool_ident(&mut self, expr: ExprId, next: bool) -> CheckResult<F::Term> {
        let line = self.arena.line(expr);
        let name = self
            .arena
            .qualified_name(expr)
            .ok_or_else(|| CheckError::TypeError(format!("line {line}: not an identifier")))?;
        if let Some(body) = self.registry.get_define_body(&name) {
            return self.eval_define(&name, body, next, line);
        }
        if let Some(range) = self.registry.get_var_range(&name) {
            if !range.is_boolean() {
                return Err(CheckError::TypeError(format!(
                    "line {line}: variable '{name}' is not boolean"
                )));
            }
            return Ok(self.var_value_guard(&name, 1, next));
        }
        Err(CheckError::UndefinedSymbol { name, line })
    }

    fn eval_define(
        &mut self,
        name: &str,
        body: ExprId,
        next: bool,
        line: u32,
    ) -> CheckResult<F::Term> {
        if let Some(term) = self.define_memo.get(&(body, next)) {
            return Ok(term.clone());
        }
        if self.define_stack.iter().any(|open| open == name) {
            return Err(CheckError::CircularDefinition {
                name: name.to_string(),
                line,
                stack: self.define_stack.clone(),
            });
        }
        self.define_stack.push(name.to_string());
        let term = self.eval_bool(body, next);
        self.define_stack.pop();
        let term = term?;
        self.define_memo.insert((body, next), term.clone());
        Ok(term)
    }

    /// The guard of `var == range.values[index]`, a cube over the variable
    /// bits. Zero-width variables (singleton ranges) guard trivially.
    fn var_value_guard(&mut self, var: &str, index: usize, next: bool) -> F::Term {
        let encoding = self.registry.encoding();
        let positions = encoding.bits_of(var).unwrap_or(&[]).to_vec();
        let bits = value_bits(index, positions.len());
        let mut guard = self.factory.mk_true();
        for (position, bit_value) in positions.iter().zip(bits) {
            let literal = self.factory.bit(*position, next);
            let literal = if bit_value {
                literal
            } else {
                self.factory.mk_not(&literal)
            };
            guard = self.factory.mk_and(&guard, &literal);
        }
        guard
    }

    fn eval_relational(&mut self, expr: ExprId, next: bool) -> CheckResult<F::Term> {
        let op = self.arena.op(expr);
        let line = self.arena.line(expr);
        let left = self.eval_scalar(self.arena.left(expr), next)?;
        let right = self.eval_scalar(self.arena.right(expr), next)?;
        let mut result = self.factory.mk_false();
        for (lv, lg) in &left {
            for (rv, rg) in &right {
                if scalar_relation(op, lv, rv, line)? {
                    let both = self.factory.mk_and(lg, rg);
                    result = self.factory.mk_or(&result, &both);
                }
            }
        }
        Ok(result)
    }

    fn eval_membership(&mut self, expr: ExprId, next: bool) -> CheckResult<F::Term> {
        let left = self.eval_scalar(self.arena.left(expr), next)?;
        let members = self.set_values(self.arena.right(expr))?;
        let mut result = self.factory.mk_false();
        for (lv, lg) in &left {
            if members.contains(lv) {
                result = self.factory.mk_or(&result, lg);
            }
        }
        Ok(result)
    }

    /// The members of a set expression: a literal list, a union chain,
    /// a numeric range, or a single value.
    pub fn set_values(&self, expr: ExprId) -> CheckResult<Vec<ScalarValue>> {
        let line = self.arena.line(expr);
        match self.arena.op(expr) {
            Op::Cons => {
                let mut values = Vec::new();
                for item in self.arena.list_items(expr) {
                    values.extend(self.set_values(item)?);
                }
                Ok(values)
            }
            Op::Union => {
                let mut values = self.set_values(self.arena.left(expr))?;
                values.extend(self.set_values(self.arena.right(expr))?);
                Ok(values)
            }
            Op::Range => {
                let low = self
                    .arena
                    .number_value(self.arena.left(expr))
                    .ok_or(CheckError::TypeError(format!("line {line}: bad range")))?;
                let high = self
                    .arena
                    .number_value(self.arena.right(expr))
                    .ok_or(CheckError::TypeError(format!("line {line}: bad range")))?;
                if low > high {
                    return Err(CheckError::InvalidSubrange { low, high });
                }
                Ok((low..=high).map(ScalarValue::Int).collect())
            }
            Op::Number => Ok(vec![ScalarValue::Int(
                self.arena.number_value(expr).unwrap(),
            )]),
            Op::TrueExp => Ok(vec![ScalarValue::Bool(true)]),
            Op::FalseExp => Ok(vec![ScalarValue::Bool(false)]),
            Op::Atom => {
                let name = self.arena.atom_str(expr);
                if self.registry.is_constant(name) {
                    Ok(vec![ScalarValue::Sym(name.to_string())])
                } else {
                    Err(CheckError::TypeError(format!(
                        "line {line}: '{name}' is not a constant"
                    )))
                }
            }
            other => Err(CheckError::TypeError(format!(
                "line {line}: {other:?} is not a set expression"
            ))),
        }
    }

    /// Evaluate a scalar expression into its value partition.
    pub fn eval_scalar(&mut self, expr: ExprId, next: bool) -> CheckResult<Partition<F::Term>> {
        let line = self.arena.line(expr);
        match self.arena.op(expr) {
            Op::Number => {
                let value = self.arena.number_value(expr).unwrap();
                Ok(vec![(ScalarValue::Int(value), self.factory.mk_true())])
            }
            Op::Atom | Op::Dot | Op::Context => {
                let name = self.arena.qualified_name(expr).ok_or_else(|| {
                    CheckError::TypeError(format!("line {line}: not an identifier"))
                })?;
                if self.registry.is_constant(&name) {
                    return Ok(vec![(ScalarValue::Sym(name), self.factory.mk_true())]);
                }
                if let Some(body) = self.registry.get_define_body(&name) {
                    if self.define_stack.iter().any(|open| open == &name) {
                        return Err(CheckError::CircularDefinition {
                            name,
                            line,
                            stack: self.define_stack.clone(),
                        });
                    }
                    self.define_stack.push(name.clone());
                    let result = self.eval_scalar(body, next);
                    self.define_stack.pop();
                    return result;
                }
                if let Some(range) = self.registry.get_var_range(&name) {
                    let values = range.values.clone();
                    let mut partition = Vec::with_capacity(values.len());
                    for (index, value) in values.into_iter().enumerate() {
                        let guard = self.var_value_guard(&name, index, next);
                        partition.push((value, guard));
                    }
                    return Ok(partition);
                }
                Err(CheckError::UndefinedSymbol { name, line })
            }
            Op::Next => {
                if next {
                    return Err(CheckError::NestedNext { line });
                }
                self.eval_scalar(self.arena.left(expr), true)
            }
            Op::Plus | Op::Minus | Op::Times | Op::Divide | Op::Mod => {
                let left = self.eval_scalar(self.arena.left(expr), next)?;
                let right = self.eval_scalar(self.arena.right(expr), next)?;
                let op = self.arena.op(expr);
                let mut partition: Partition<F::Term> = Vec::new();
                for (lv, lg) in &left {
                    for (rv, rg) in &right {
                        let value = scalar_arith(op, lv, rv, line)?;
                        let guard = self.factory.mk_and(lg, rg);
                        merge_partition(self.factory, &mut partition, value, guard);
                    }
                }
                Ok(partition)
            }
            Op::UnaryMinus => {
                let operand = self.eval_scalar(self.arena.left(expr), next)?;
                let mut partition: Partition<F::Term> = Vec::new();
                for (value, guard) in operand {
                    let value = match value.as_int() {
                        Some(int) => ScalarValue::Int(-int),
                        None => {
                            return Err(CheckError::TypeError(format!(
                                "line {line}: cannot negate '{value}'"
                            )));
                        }
                    };
                    merge_partition(self.factory, &mut partition, value, guard);
                }
                Ok(partition)
            }
            Op::Case => {
                let branch = self.arena.left(expr);
                let cond = self.eval_bool(self.arena.left(branch), next)?;
                let then = self.eval_scalar(self.arena.right(branch), next)?;
                let other = self.eval_scalar(self.arena.right(expr), next)?;
                let not_cond = self.factory.mk_not(&cond);
                let mut partition: Partition<F::Term> = Vec::new();
                for (value, guard) in then {
                    let guard = self.factory.mk_and(&cond, &guard);
                    merge_partition(self.factory, &mut partition, value, guard);
                }
                for (value, guard) in other {
                    let guard = self.factory.mk_and(&not_cond, &guard);
                    merge_partition(self.factory, &mut partition, value, guard);
                }
                Ok(partition)
            }
            // everything else must be a boolean-valued expression
            _ => {
                let term = self.eval_bool(expr, next)?;
                let negated = self.factory.mk_not(&term);
                Ok(vec![
                    (ScalarValue::Bool(false), negated),
                    (ScalarValue::Bool(true), term),
                ])
            }
        }
    }
}

fn merge_partition<F: SymbolicFactory>(
    factory: &mut F,
    partition: &mut Partition<F::Term>,
    value: ScalarValue,
    guard: F::Term,
) {
    for (existing, existing_guard) in partition.iter_mut() {
        if *existing == value {
            *existing_guard = factory.mk_or(existing_guard, &guard);
            return;
        }
    }
    partition.push((value, guard));
}

fn scalar_relation(op: Op, left: &ScalarValue, right: &ScalarValue, line: u32) -> CheckResult<bool> {
    match op {
        Op::Equal => Ok(left == right),
        Op::NotEqual => Ok(left != right),
        _ => {
            let (Some(l), Some(r)) = (left.as_int(), right.as_int()) else {
                return Err(CheckError::TypeError(format!(
                    "line {line}: ordered comparison of symbolic values"
                )));
            };
            Ok(match op {
                Op::Lt => l < r,
                Op::Le => l <= r,
                Op::Gt => l > r,
                Op::Ge => l >= r,
                _ => unreachable!(),
            })
        }
    }
}

fn scalar_arith(
    op: Op,
    left: &ScalarValue,
    right: &ScalarValue,
    line: u32,
) -> CheckResult<ScalarValue> {
    let (Some(l), Some(r)) = (left.as_int(), right.as_int()) else {
        return Err(CheckError::TypeError(format!(
            "line {line}: arithmetic on symbolic values"
        )));
    };
    let value = match op {
        Op::Plus => l.wrapping_add(r),
        Op::Minus => l.wrapping_sub(r),
        Op::Times => l.wrapping_mul(r),
        Op::Divide => {
            if r == 0 {
                return Err(CheckError::DivisionByZero { line });
            }
            l / r
        }
        Op::Mod => {
            if r == 0 {
                return Err(CheckError::DivisionByZero { line });
            }
            l.rem_euclid(r)
        }
        _ => unreachable!(),
    };
    Ok(ScalarValue::Int(value))
}
