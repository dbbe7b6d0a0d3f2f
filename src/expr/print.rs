//! Precedence-aware printing of expressions.

use crate::expr::arena::ExprArena;
use crate::expr::node::{ExprId, Op};

use std::fmt;
use std::fmt::Write as _;

/// Render an expression into its concrete textual form.
pub fn display_expr(arena: &ExprArena, id: ExprId) -> String {
    let mut out = String::new();
    write_expr(&mut out, arena, id, 0).expect("writing to a string cannot fail");
    out
}

/// Binding strength of an operator; higher binds tighter. Leaves and
/// bracketed forms are atomic.
fn precedence(op: Op) -> u8 {
    match op {
        Op::Iff => 1,
        Op::Implies => 2,
        Op::Or | Op::Xor => 3,
        Op::And => 4,
        Op::LtlU | Op::LtlV | Op::LtlS | Op::LtlT => 5,
        Op::Not
        | Op::Ex
        | Op::Ax
        | Op::Ef
        | Op::Af
        | Op::Eg
        | Op::Ag
        | Op::Ebf
        | Op::Abf
        | Op::Ebg
        | Op::Abg
        | Op::LtlX
        | Op::LtlF
        | Op::LtlG
        | Op::LtlY
        | Op::LtlZ
        | Op::LtlH
        | Op::LtlO => 6,
        Op::Equal | Op::NotEqual | Op::Lt | Op::Le | Op::Gt | Op::Ge | Op::SetIn => 7,
        Op::Union => 8,
        Op::Range => 9,
        Op::Plus | Op::Minus => 10,
        Op::Times | Op::Divide | Op::Mod => 11,
        Op::UnaryMinus => 12,
        _ => 13,
    }
}

fn binary_symbol(op: Op) -> Option<&'static str> {
    match op {
        Op::And => Some("&"),
        Op::Or => Some("|"),
        Op::Xor => Some("xor"),
        Op::Iff => Some("<->"),
        Op::Implies => Some("->"),
        Op::Plus => Some("+"),
        Op::Minus => Some("-"),
        Op::Times => Some("*"),
        Op::Divide => Some("/"),
        Op::Mod => Some("mod"),
        Op::Equal => Some("="),
        Op::NotEqual => Some("!="),
        Op::Lt => Some("<"),
        Op::Le => Some("<="),
        Op::Gt => Some(">"),
        Op::Ge => Some(">="),
        Op::SetIn => Some("in"),
        Op::Union => Some("union"),
        Op::LtlU => Some("U"),
        Op::LtlV => Some("V"),
        Op::LtlS => Some("S"),
        Op::LtlT => Some("T"),
        _ => None,
    }
}

fn prefix_symbol(op: Op) -> Option<&'static str> {
    match op {
        Op::Ex => Some("EX"),
        Op::Ax => Some("AX"),
        Op::Ef => Some("EF"),
        Op::Af => Some("AF"),
        Op::Eg => Some("EG"),
        Op::Ag => Some("AG"),
        Op::LtlX => Some("X"),
        Op::LtlF => Some("F"),
        Op::LtlG => Some("G"),
        Op::LtlY => Some("Y"),
        Op::LtlZ => Some("Z"),
        Op::LtlH => Some("H"),
        Op::LtlO => Some("O"),
        _ => None,
    }
}

fn write_expr(out: &mut String, arena: &ExprArena, id: ExprId, parent: u8) -> fmt::Result {
    if id.is_nil() {
        return Ok(());
    }
    let op = arena.op(id);
    let prec = precedence(op);
    let bracket = prec < parent;
    if bracket {
        out.push('(');
    }
    match op {
        Op::Nil => {}
        Op::Atom => write!(out, "{}", arena.atom_str(id))?,
        Op::Number => write!(out, "{}", arena.number_value(id).unwrap())?,
        Op::TrueExp => out.push_str("TRUE"),
        Op::FalseExp => out.push_str("FALSE"),
        Op::SelfExp => out.push_str("self"),
        Op::Dot => {
            if !arena.left(id).is_nil() {
                write_expr(out, arena, arena.left(id), 13)?;
                out.push('.');
            }
            write_expr(out, arena, arena.right(id), 13)?;
        }
        Op::Bit => {
            write_expr(out, arena, arena.left(id), 13)?;
            out.push('.');
            write_expr(out, arena, arena.right(id), 13)?;
        }
        Op::Array => {
            write_expr(out, arena, arena.left(id), 13)?;
            out.push('[');
            write_expr(out, arena, arena.right(id), 0)?;
            out.push(']');
        }
        Op::Context => {
            write_expr(out, arena, arena.right(id), prec + 1)?;
            out.push_str(" IN ");
            write_expr(out, arena, arena.left(id), prec + 1)?;
        }
        Op::Next => {
            out.push_str("next(");
            write_expr(out, arena, arena.left(id), 0)?;
            out.push(')');
        }
        Op::Smallinit => {
            out.push_str("init(");
            write_expr(out, arena, arena.left(id), 0)?;
            out.push(')');
        }
        Op::Case => {
            out.push_str("case ");
            let mut cursor = id;
            while arena.op(cursor) == Op::Case {
                let branch = arena.left(cursor);
                write_expr(out, arena, arena.left(branch), 0)?;
                out.push_str(" : ");
                write_expr(out, arena, arena.right(branch), 0)?;
                out.push_str("; ");
                cursor = arena.right(cursor);
            }
            // the default branch prints with the constant-true condition
            out.push_str("1 : ");
            write_expr(out, arena, cursor, 0)?;
            out.push_str("; esac");
        }
        Op::Colon => {
            write_expr(out, arena, arena.left(id), 0)?;
            out.push_str(" : ");
            write_expr(out, arena, arena.right(id), 0)?;
        }
        Op::Cons => {
            out.push('{');
            let mut first = true;
            for item in arena.list_items(id) {
                if !first {
                    out.push_str(", ");
                }
                first = false;
                write_expr(out, arena, item, 0)?;
            }
            out.push('}');
        }
        Op::Not => {
            out.push('!');
            write_expr(out, arena, arena.left(id), prec)?;
        }
        Op::UnaryMinus => {
            out.push('-');
            write_expr(out, arena, arena.left(id), prec)?;
        }
        Op::Range => {
            write_expr(out, arena, arena.left(id), prec + 1)?;
            out.push_str("..");
            write_expr(out, arena, arena.right(id), prec + 1)?;
        }
        Op::Eu | Op::Au => {
            out.push_str(if op == Op::Eu { "E [ " } else { "A [ " });
            write_expr(out, arena, arena.left(id), 0)?;
            out.push_str(" U ");
            write_expr(out, arena, arena.right(id), 0)?;
            out.push_str(" ]");
        }
        Op::Ebu | Op::Abu => {
            // left child is the plain until node, right child the bound range
            let until = arena.left(id);
            out.push_str(if op == Op::Ebu { "E [ " } else { "A [ " });
            write_expr(out, arena, arena.left(until), 0)?;
            out.push_str(" BU ");
            write_expr(out, arena, arena.right(id), 0)?;
            out.push(' ');
            write_expr(out, arena, arena.right(until), 0)?;
            out.push_str(" ]");
        }
        Op::Ebf | Op::Abf | Op::Ebg | Op::Abg => {
            let name = match op {
                Op::Ebf => "EBF",
                Op::Abf => "ABF",
                Op::Ebg => "EBG",
                _ => "ABG",
            };
            write!(out, "{name} ")?;
            write_expr(out, arena, arena.right(id), 0)?;
            out.push(' ');
            write_expr(out, arena, arena.left(id), prec)?;
        }
        Op::MinU | Op::MaxU => {
            out.push_str(if op == Op::MinU { "MIN [ " } else { "MAX [ " });
            write_expr(out, arena, arena.left(id), 0)?;
            out.push_str(" , ");
            write_expr(out, arena, arena.right(id), 0)?;
            out.push_str(" ]");
        }
        _ => {
            if let Some(symbol) = prefix_symbol(op) {
                write!(out, "{symbol} ")?;
                write_expr(out, arena, arena.left(id), prec)?;
            } else if let Some(symbol) = binary_symbol(op) {
                write_expr(out, arena, arena.left(id), prec)?;
                write!(out, " {symbol} ")?;
                write_expr(out, arena, arena.right(id), prec + 1)?;
            } else {
                unreachable!("operator {op:?} has no concrete form");
            }
        }
    }
    if bracket {
        out.push(')');
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::expr::{display_expr, ExprArena, Op};

    #[test]
    /// Precedence must bracket only where needed.
    fn boolean_precedence() {
        let mut arena = ExprArena::new();
        let a = arena.mk_atom("a", 1);
        let b = arena.mk_atom("b", 1);
        let c = arena.mk_atom("c", 1);
        let a_or_b = arena.mk_or(a, b);
        let and = arena.mk_and(a_or_b, c);
        assert_eq!(display_expr(&arena, and), "(a | b) & c");

        let not_a = arena.mk_not(a);
        let or = arena.mk_or(not_a, b);
        assert_eq!(display_expr(&arena, or), "!a | b");
    }

    #[test]
    /// Case chains print with the trailing constant-true branch.
    fn case_form() {
        let mut arena = ExprArena::new();
        let c = arena.mk_atom("c", 1);
        let one = arena.mk_number(1, 1);
        let zero = arena.mk_number(0, 1);
        let eq = arena.mk_equal(c, one);
        let ite = arena.mk_ite(eq, zero, one);
        assert_eq!(display_expr(&arena, ite), "case c = 1 : 0; 1 : 1; esac");
    }

    #[test]
    /// Temporal operators keep their textual forms.
    fn temporal_forms() {
        let mut arena = ExprArena::new();
        let a = arena.mk_atom("a", 1);
        let b = arena.mk_atom("b", 1);
        let eu = arena.intern(Op::Eu, a, b, 1);
        assert_eq!(display_expr(&arena, eu), "E [ a U b ]");
        let next = arena.mk_next(a);
        let ag = arena.intern(Op::Ag, next, crate::expr::ExprId::NIL, 1);
        assert_eq!(display_expr(&arena, ag), "AG next(a)");
    }
}
