//! Recursive-descent parsing of expressions and flattened model files.

use crate::errors::{CheckError, CheckResult};
use crate::expr::{ExprArena, ExprId, Op};
use crate::preprocessing::model::{AssignKind, FlatModel, ModelAssign, ParsedProperty};
use crate::preprocessing::tokenizer::{tokenize, ModelToken};
use crate::properties::PropKind;
use crate::symbols::{ScalarValue, SymbolRegistry, VarRange};

/// Word tokens that can never be used as identifiers.
const RESERVED: &[&str] = &[
    "EX", "AX", "EF", "AF", "EG", "AG", "EBF", "ABF", "EBG", "ABG", "E", "A", "X", "F", "G", "Y",
    "Z", "H", "O", "U", "S", "V", "T", "MIN", "MAX", "case", "esac", "next", "init", "self",
    "TRUE", "FALSE", "boolean", "xor", "mod", "union", "in",
];

/// Section keywords of a flattened model file.
const SECTIONS: &[&str] = &[
    "MODULE",
    "VAR",
    "IVAR",
    "DEFINE",
    "ASSIGN",
    "INIT",
    "TRANS",
    "INVAR",
    "JUSTICE",
    "FAIRNESS",
    "COMPASSION",
    "CTLSPEC",
    "SPEC",
    "LTLSPEC",
    "INVARSPEC",
    "COMPUTE",
    "PSLSPEC",
];

struct Parser<'a> {
    tokens: Vec<(ModelToken, u32)>,
    pos: usize,
    arena: &'a mut ExprArena,
    /// Inside `E [ .. U .. ]`/`A [ .. U .. ]` the bare binary temporal
    /// operators are suppressed, so the bracket form owns its `U`.
    until_suppressed: bool,
}

/// Parse a standalone expression string.
pub fn parse_expression(text: &str, arena: &mut ExprArena) -> CheckResult<ExprId> {
    let mut parser = Parser {
        tokens: tokenize(text)?,
        pos: 0,
        arena,
        until_suppressed: false,
    };
    let expr = parser.parse_expr()?;
    if !parser.at_end() {
        return Err(parser.error("trailing tokens after expression"));
    }
    Ok(expr)
}

/// Parse a flattened model file: variable declarations go into `registry`,
/// constraint sections and properties into the returned [FlatModel].
pub fn parse_model(
    text: &str,
    arena: &mut ExprArena,
    registry: &mut SymbolRegistry,
) -> CheckResult<FlatModel> {
    let mut parser = Parser {
        tokens: tokenize(text)?,
        pos: 0,
        arena,
        until_suppressed: false,
    };
    let mut model = FlatModel::default();

    while !parser.at_end() {
        let line = parser.line();
        let section = match parser.next_token() {
            ModelToken::Ident(word) if SECTIONS.contains(&word.as_str()) => word,
            other => {
                return Err(CheckError::Parse {
                    message: format!("expected a section keyword, found {other:?}"),
                    line,
                });
            }
        };
        match section.as_str() {
            "MODULE" => {
                // flattened models carry a single module header; skip its name
                if !parser.at_end() {
                    parser.next_token();
                }
            }
            "VAR" => parser.parse_var_section(registry, false)?,
            "IVAR" => parser.parse_var_section(registry, true)?,
            "DEFINE" => parser.parse_define_section(registry)?,
            "ASSIGN" => parser.parse_assign_section(&mut model)?,
            "INIT" => {
                let expr = parser.parse_expr()?;
                parser.skip_semicolons();
                model.init.push((expr, line));
            }
            "TRANS" => {
                let expr = parser.parse_expr()?;
                parser.skip_semicolons();
                model.trans.push((expr, line));
            }
            "INVAR" => {
                let expr = parser.parse_expr()?;
                parser.skip_semicolons();
                model.invar.push((expr, line));
            }
            "JUSTICE" | "FAIRNESS" => {
                let expr = parser.parse_expr()?;
                parser.skip_semicolons();
                model.justice.push((expr, line));
            }
            "COMPASSION" => {
                parser.expect(ModelToken::LParen)?;
                let p = parser.parse_expr()?;
                parser.expect(ModelToken::Comma)?;
                let q = parser.parse_expr()?;
                parser.expect(ModelToken::RParen)?;
                parser.skip_semicolons();
                model.compassion.push((p, q, line));
            }
            "CTLSPEC" | "SPEC" => parser.parse_property(&mut model, PropKind::Ctl, line)?,
            "LTLSPEC" => parser.parse_property(&mut model, PropKind::Ltl, line)?,
            "INVARSPEC" => parser.parse_property(&mut model, PropKind::Invar, line)?,
            "COMPUTE" => parser.parse_property(&mut model, PropKind::Compute, line)?,
            "PSLSPEC" => parser.parse_property(&mut model, PropKind::Psl, line)?,
            _ => unreachable!(),
        }
    }
    Ok(model)
}

impl<'a> Parser<'a> {
    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn line(&self) -> u32 {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|(_, line)| *line)
            .unwrap_or(0)
    }

    fn peek(&self) -> Option<&ModelToken> {
        self.tokens.get(self.pos).map(|(token, _)| token)
    }

    fn peek_ident(&self) -> Option<&str> {
        match self.peek() {
            Some(ModelToken::Ident(word)) => Some(word.as_str()),
            _ => None,
        }
    }

    fn next_token(&mut self) -> ModelToken {
        let token = self.tokens[self.pos].0.clone();
        self.pos += 1;
        token
    }

    fn error(&self, message: &str) -> CheckError {
        CheckError::Parse {
            message: message.to_string(),
            line: self.line(),
        }
    }

    fn expect(&mut self, token: ModelToken) -> CheckResult<()> {
        if self.at_end() {
            return Err(self.error(&format!("expected {token:?}, found end of input")));
        }
        let found = self.next_token();
        if found != token {
            return Err(self.error(&format!("expected {token:?}, found {found:?}")));
        }
        Ok(())
    }

    fn expect_ident(&mut self) -> CheckResult<String> {
        if self.at_end() {
            return Err(self.error("expected an identifier, found end of input"));
        }
        match self.next_token() {
            ModelToken::Ident(word) if !RESERVED.contains(&word.as_str()) => Ok(word),
            other => Err(self.error(&format!("expected an identifier, found {other:?}"))),
        }
    }

    fn eat_ident(&mut self, word: &str) -> bool {
        if self.peek_ident() == Some(word) {
            self.pos += 1;
            return true;
        }
        false
    }

    fn eat(&mut self, token: &ModelToken) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            return true;
        }
        false
    }

    fn skip_semicolons(&mut self) {
        while self.eat(&ModelToken::Semicolon) {}
    }

    fn at_section(&self) -> bool {
        matches!(self.peek_ident(), Some(word) if SECTIONS.contains(&word))
    }

    // ---------- model sections ----------

    fn parse_var_section(&mut self, registry: &mut SymbolRegistry, input: bool) -> CheckResult<()> {
        while !self.at_end() && !self.at_section() {
            let line = self.line();
            let name = self.expect_ident()?;
            self.expect(ModelToken::Colon)?;
            let range = self.parse_var_range(registry, line)?;
            self.expect(ModelToken::Semicolon)?;
            if input {
                registry.declare_input_var(&name, range, line)?;
            } else {
                registry.declare_state_var(&name, range, line)?;
            }
        }
        Ok(())
    }

    fn parse_var_range(
        &mut self,
        registry: &mut SymbolRegistry,
        line: u32,
    ) -> CheckResult<VarRange> {
        if self.eat_ident("boolean") {
            return Ok(VarRange::boolean());
        }
        if self.eat(&ModelToken::LBrace) {
            let mut values = Vec::new();
            loop {
                if self.at_end() {
                    return Err(self.error("unterminated range literal"));
                }
                match self.next_token() {
                    ModelToken::Number(value) => values.push(ScalarValue::Int(value)),
                    ModelToken::Ident(word) if !RESERVED.contains(&word.as_str()) => {
                        // symbolic range values double as declared constants
                        registry.declare_constant(&word, line)?;
                        values.push(ScalarValue::Sym(word));
                    }
                    other => {
                        return Err(self.error(&format!("unexpected range value {other:?}")));
                    }
                }
                if !self.eat(&ModelToken::Comma) {
                    break;
                }
            }
            self.expect(ModelToken::RBrace)?;
            return Ok(VarRange { values });
        }
        // numeric subrange `low..high`
        let low = self.parse_signed_number()?;
        self.expect(ModelToken::DotDot)?;
        let high = self.parse_signed_number()?;
        VarRange::from_interval(low, high)
    }

    fn parse_signed_number(&mut self) -> CheckResult<i64> {
        let negative = self.eat(&ModelToken::Minus);
        if self.at_end() {
            return Err(self.error("expected a number, found end of input"));
        }
        match self.next_token() {
            ModelToken::Number(value) => Ok(if negative { -value } else { value }),
            other => Err(self.error(&format!("expected a number, found {other:?}"))),
        }
    }

    fn parse_define_section(&mut self, registry: &mut SymbolRegistry) -> CheckResult<()> {
        while !self.at_end() && !self.at_section() {
            let line = self.line();
            let name = self.expect_ident()?;
            self.expect(ModelToken::Assign)?;
            let body = self.parse_expr()?;
            self.expect(ModelToken::Semicolon)?;
            registry.declare_define(&name, ExprId::NIL, body, line)?;
        }
        Ok(())
    }

    fn parse_assign_section(&mut self, model: &mut FlatModel) -> CheckResult<()> {
        while !self.at_end() && !self.at_section() {
            let line = self.line();
            let kind = if self.eat_ident("init") {
                self.expect(ModelToken::LParen)?;
                let var = self.expect_ident()?;
                self.expect(ModelToken::RParen)?;
                (AssignKind::Init, var)
            } else if self.eat_ident("next") {
                self.expect(ModelToken::LParen)?;
                let var = self.expect_ident()?;
                self.expect(ModelToken::RParen)?;
                (AssignKind::Next, var)
            } else {
                (AssignKind::Current, self.expect_ident()?)
            };
            self.expect(ModelToken::Assign)?;
            let rhs = self.parse_expr()?;
            self.expect(ModelToken::Semicolon)?;
            model.assigns.push(ModelAssign {
                kind: kind.0,
                var: kind.1,
                rhs,
                line,
            });
        }
        Ok(())
    }

    fn parse_property(
        &mut self,
        model: &mut FlatModel,
        kind: PropKind,
        line: u32,
    ) -> CheckResult<()> {
        let expr = self.parse_expr()?;
        self.skip_semicolons();
        model.properties.push(ParsedProperty { kind, expr, line });
        Ok(())
    }

    // ---------- expressions, loosest binding first ----------

    fn parse_expr(&mut self) -> CheckResult<ExprId> {
        self.parse_iff()
    }

    fn parse_iff(&mut self) -> CheckResult<ExprId> {
        let mut result = self.parse_implies()?;
        while self.eat(&ModelToken::Iff) {
            let line = self.line();
            let right = self.parse_implies()?;
            result = self.arena.intern(Op::Iff, result, right, line);
        }
        Ok(result)
    }

    fn parse_implies(&mut self) -> CheckResult<ExprId> {
        let left = self.parse_or()?;
        if self.eat(&ModelToken::Implies) {
            let line = self.line();
            // implication associates to the right
            let right = self.parse_implies()?;
            return Ok(self.arena.intern(Op::Implies, left, right, line));
        }
        Ok(left)
    }

    fn parse_or(&mut self) -> CheckResult<ExprId> {
        let mut result = self.parse_and()?;
        loop {
            let line = self.line();
            if self.eat(&ModelToken::Or) {
                let right = self.parse_and()?;
                result = self.arena.intern(Op::Or, result, right, line);
            } else if self.eat_ident("xor") {
                let right = self.parse_and()?;
                result = self.arena.intern(Op::Xor, result, right, line);
            } else {
                break;
            }
        }
        Ok(result)
    }

    fn parse_and(&mut self) -> CheckResult<ExprId> {
        let mut result = self.parse_until()?;
        while self.eat(&ModelToken::And) {
            let line = self.line();
            let right = self.parse_until()?;
            result = self.arena.intern(Op::And, result, right, line);
        }
        Ok(result)
    }

    fn parse_until(&mut self) -> CheckResult<ExprId> {
        let mut result = self.parse_prefix()?;
        if self.until_suppressed {
            return Ok(result);
        }
        loop {
            let op = match self.peek_ident() {
                Some("U") => Op::LtlU,
                Some("V") => Op::LtlV,
                Some("S") => Op::LtlS,
                Some("T") => Op::LtlT,
                _ => break,
            };
            let line = self.line();
            self.pos += 1;
            let right = self.parse_prefix()?;
            result = self.arena.intern(op, result, right, line);
        }
        Ok(result)
    }

    fn parse_prefix(&mut self) -> CheckResult<ExprId> {
        let line = self.line();
        if self.eat(&ModelToken::Not) {
            let operand = self.parse_prefix()?;
            return Ok(self.arena.intern(Op::Not, operand, ExprId::NIL, line));
        }
        let unary = match self.peek_ident() {
            Some("EX") => Some(Op::Ex),
            Some("AX") => Some(Op::Ax),
            Some("EF") => Some(Op::Ef),
            Some("AF") => Some(Op::Af),
            Some("EG") => Some(Op::Eg),
            Some("AG") => Some(Op::Ag),
            Some("X") => Some(Op::LtlX),
            Some("F") => Some(Op::LtlF),
            Some("G") => Some(Op::LtlG),
            Some("Y") => Some(Op::LtlY),
            Some("Z") => Some(Op::LtlZ),
            Some("H") => Some(Op::LtlH),
            Some("O") => Some(Op::LtlO),
            _ => None,
        };
        if let Some(op) = unary {
            self.pos += 1;
            let operand = self.parse_prefix()?;
            return Ok(self.arena.intern(op, operand, ExprId::NIL, line));
        }
        let bounded = match self.peek_ident() {
            Some("EBF") => Some(Op::Ebf),
            Some("ABF") => Some(Op::Abf),
            Some("EBG") => Some(Op::Ebg),
            Some("ABG") => Some(Op::Abg),
            _ => None,
        };
        if let Some(op) = bounded {
            self.pos += 1;
            let bounds = self.parse_bounds()?;
            let operand = self.parse_prefix()?;
            return Ok(self.arena.intern(op, operand, bounds, line));
        }
        self.parse_relational()
    }

    fn parse_bounds(&mut self) -> CheckResult<ExprId> {
        let line = self.line();
        let low = self.parse_signed_number()?;
        self.expect(ModelToken::DotDot)?;
        let high = self.parse_signed_number()?;
        let low = self.arena.mk_number(low, line);
        let high = self.arena.mk_number(high, line);
        Ok(self.arena.intern(Op::Range, low, high, line))
    }

    fn parse_relational(&mut self) -> CheckResult<ExprId> {
        let left = self.parse_union()?;
        let line = self.line();
        let op = match self.peek() {
            Some(ModelToken::Eq) => Some(Op::Equal),
            Some(ModelToken::Neq) => Some(Op::NotEqual),
            Some(ModelToken::Lt) => Some(Op::Lt),
            Some(ModelToken::Le) => Some(Op::Le),
            Some(ModelToken::Gt) => Some(Op::Gt),
            Some(ModelToken::Ge) => Some(Op::Ge),
            Some(ModelToken::Ident(word)) if word == "in" => Some(Op::SetIn),
            _ => None,
        };
        if let Some(op) = op {
            self.pos += 1;
            let right = self.parse_union()?;
            return Ok(self.arena.intern(op, left, right, line));
        }
        Ok(left)
    }

    fn parse_union(&mut self) -> CheckResult<ExprId> {
        let mut result = self.parse_range_expr()?;
        while self.eat_ident("union") {
            let line = self.line();
            let right = self.parse_range_expr()?;
            result = self.arena.intern(Op::Union, result, right, line);
        }
        Ok(result)
    }

    fn parse_range_expr(&mut self) -> CheckResult<ExprId> {
        let left = self.parse_additive()?;
        if self.eat(&ModelToken::DotDot) {
            let line = self.line();
            let right = self.parse_additive()?;
            return Ok(self.arena.intern(Op::Range, left, right, line));
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> CheckResult<ExprId> {
        let mut result = self.parse_multiplicative()?;
        loop {
            let line = self.line();
            if self.eat(&ModelToken::Plus) {
                let right = self.parse_multiplicative()?;
                result = self.arena.intern(Op::Plus, result, right, line);
            } else if self.eat(&ModelToken::Minus) {
                let right = self.parse_multiplicative()?;
                result = self.arena.intern(Op::Minus, result, right, line);
            } else {
                break;
            }
        }
        Ok(result)
    }

    fn parse_multiplicative(&mut self) -> CheckResult<ExprId> {
        let mut result = self.parse_primary()?;
        loop {
            let line = self.line();
            if self.eat(&ModelToken::Times) {
                let right = self.parse_primary()?;
                result = self.arena.intern(Op::Times, result, right, line);
            } else if self.eat(&ModelToken::Divide) {
                let right = self.parse_primary()?;
                result = self.arena.intern(Op::Divide, result, right, line);
            } else if self.eat_ident("mod") {
                let right = self.parse_primary()?;
                result = self.arena.intern(Op::Mod, result, right, line);
            } else {
                break;
            }
        }
        Ok(result)
    }

    fn parse_primary(&mut self) -> CheckResult<ExprId> {
        if self.at_end() {
            return Err(self.error("unexpected end of expression"));
        }
        let line = self.line();
        match self.peek().cloned().unwrap() {
            ModelToken::LParen => {
                self.pos += 1;
                // parentheses re-enable the bare binary temporal operators
                let suppressed = std::mem::replace(&mut self.until_suppressed, false);
                let inner = self.parse_expr();
                self.until_suppressed = suppressed;
                let inner = inner?;
                self.expect(ModelToken::RParen)?;
                Ok(inner)
            }
            ModelToken::Not => {
                self.pos += 1;
                let operand = self.parse_primary()?;
                Ok(self.arena.intern(Op::Not, operand, ExprId::NIL, line))
            }
            ModelToken::Minus => {
                self.pos += 1;
                let operand = self.parse_primary()?;
                if let Some(value) = self.arena.number_value(operand) {
                    return Ok(self.arena.mk_number(-value, line));
                }
                Ok(self.arena.intern(Op::UnaryMinus, operand, ExprId::NIL, line))
            }
            ModelToken::Number(value) => {
                self.pos += 1;
                Ok(self.arena.mk_number(value, line))
            }
            ModelToken::LBrace => {
                self.pos += 1;
                let mut items = Vec::new();
                loop {
                    items.push(self.parse_expr()?);
                    if !self.eat(&ModelToken::Comma) {
                        break;
                    }
                }
                self.expect(ModelToken::RBrace)?;
                Ok(self.arena.mk_list(&items))
            }
            ModelToken::Ident(word) => self.parse_word(&word, line),
            other => Err(self.error(&format!("unexpected token {other:?}"))),
        }
    }

    fn parse_word(&mut self, word: &str, line: u32) -> CheckResult<ExprId> {
        match word {
            "TRUE" => {
                self.pos += 1;
                Ok(self.arena.mk_true())
            }
            "FALSE" => {
                self.pos += 1;
                Ok(self.arena.mk_false())
            }
            "self" => {
                self.pos += 1;
                Ok(self.arena.intern(Op::SelfExp, ExprId::NIL, ExprId::NIL, line))
            }
            "next" => {
                self.pos += 1;
                self.expect(ModelToken::LParen)?;
                let inner = self.parse_expr()?;
                self.expect(ModelToken::RParen)?;
                Ok(self.arena.intern(Op::Next, inner, ExprId::NIL, line))
            }
            "init" => {
                self.pos += 1;
                self.expect(ModelToken::LParen)?;
                let inner = self.parse_expr()?;
                self.expect(ModelToken::RParen)?;
                Ok(self.arena.intern(Op::Smallinit, inner, ExprId::NIL, line))
            }
            "case" => {
                self.pos += 1;
                self.parse_case(line)
            }
            "MIN" | "MAX" => {
                let op = if word == "MIN" { Op::MinU } else { Op::MaxU };
                self.pos += 1;
                self.expect(ModelToken::LBracket)?;
                let left = self.parse_expr()?;
                self.expect(ModelToken::Comma)?;
                let right = self.parse_expr()?;
                self.expect(ModelToken::RBracket)?;
                Ok(self.arena.intern(op, left, right, line))
            }
            "E" | "A" => {
                let existential = word == "E";
                self.pos += 1;
                self.parse_quantified_until(existential, line)
            }
            word if RESERVED.contains(&word) => {
                Err(self.error(&format!("'{word}' cannot start an expression here")))
            }
            _ => {
                // identifier, possibly a dotted path
                self.pos += 1;
                let mut result = self.arena.mk_atom(word, line);
                while self.eat(&ModelToken::Dot) {
                    let field = self.expect_ident()?;
                    let field = self.arena.mk_atom(&field, line);
                    result = self.arena.intern(Op::Dot, result, field, line);
                }
                Ok(result)
            }
        }
    }

    fn parse_case(&mut self, line: u32) -> CheckResult<ExprId> {
        let mut branches = Vec::new();
        while !self.eat_ident("esac") {
            let cond = self.parse_expr()?;
            self.expect(ModelToken::Colon)?;
            let value = self.parse_expr()?;
            self.expect(ModelToken::Semicolon)?;
            branches.push((cond, value));
        }
        let Some((last_cond, default)) = branches.pop() else {
            return Err(self.error("empty case expression"));
        };
        // the final branch must be the default one (condition TRUE or 1)
        let is_default = self.arena.is_true(last_cond)
            || self.arena.number_value(last_cond) == Some(1);
        if !is_default {
            return Err(CheckError::Parse {
                message: "case expression without a default branch".to_string(),
                line,
            });
        }
        let mut result = default;
        for (cond, value) in branches.into_iter().rev() {
            let branch = self.arena.intern(Op::Colon, cond, value, line);
            result = self.arena.intern(Op::Case, branch, result, line);
        }
        Ok(result)
    }

    fn parse_quantified_until(&mut self, existential: bool, line: u32) -> CheckResult<ExprId> {
        self.expect(ModelToken::LBracket)?;
        let suppressed = std::mem::replace(&mut self.until_suppressed, true);
        let result = self.parse_quantified_body();
        self.until_suppressed = suppressed;
        let (left, bounds, right) = result?;
        self.expect(ModelToken::RBracket)?;
        let until_op = if existential { Op::Eu } else { Op::Au };
        let until = self.arena.intern(until_op, left, right, line);
        match bounds {
            None => Ok(until),
            Some(bounds) => {
                let op = if existential { Op::Ebu } else { Op::Abu };
                Ok(self.arena.intern(op, until, bounds, line))
            }
        }
    }

    fn parse_quantified_body(&mut self) -> CheckResult<(ExprId, Option<ExprId>, ExprId)> {
        let left = self.parse_expr()?;
        let bounded = if self.eat_ident("U") {
            false
        } else if self.eat_ident("BU") {
            true
        } else {
            return Err(self.error("expected 'U' or 'BU' inside a path quantifier"));
        };
        let bounds = if bounded { Some(self.parse_bounds()?) } else { None };
        let right = self.parse_expr()?;
        Ok((left, bounds, right))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::display_expr;

    fn parsed(text: &str) -> String {
        let mut arena = ExprArena::new();
        let expr = parse_expression(text, &mut arena).unwrap();
        display_expr(&arena, expr)
    }

    #[test]
    /// Operator precedence and re-printing round trips.
    fn expression_precedence() {
        assert_eq!(parsed("a & b | c"), "a & b | c");
        assert_eq!(parsed("a & (b | c)"), "a & (b | c)");
        assert_eq!(parsed("!a = b"), "!(a = b)");
        assert_eq!(parsed("a = !b"), "a = !b");
        assert_eq!(parsed("AG (x = 0 | x = 1)"), "AG (x = 0 | x = 1)");
        assert_eq!(parsed("next(c) = (c + 1) mod 4"), "next(c) = (c + 1) mod 4");
    }

    #[test]
    /// Temporal forms: bracketed untils, bounded operators, LTL binaries.
    fn temporal_expressions() {
        assert_eq!(parsed("E [ a U b ]"), "E [ a U b ]");
        assert_eq!(parsed("A [ a BU 1..3 b ]"), "A [ a BU 1..3 b ]");
        assert_eq!(parsed("EBF 0..2 a"), "EBF 0..2 a");
        assert_eq!(parsed("G (x -> X i)"), "G (x -> X i)");
        assert_eq!(parsed("a U b"), "a U b");
        assert_eq!(parsed("MIN [ c = 0 , c = 3 ]"), "MIN [ c = 0 , c = 3 ]");
    }

    #[test]
    /// The case form requires a default branch.
    fn case_requires_default() {
        let mut arena = ExprArena::new();
        let good = parse_expression("case a : 1; TRUE : 0; esac", &mut arena);
        assert!(good.is_ok());
        let bad = parse_expression("case a : 1; b : 0; esac", &mut arena);
        assert!(bad.is_err());
    }

    #[test]
    /// A small model file populates the registry and the flat model.
    fn model_sections() {
        let mut arena = ExprArena::new();
        let mut registry = SymbolRegistry::new();
        let model = parse_model(
            "MODULE main\n\
             VAR x : boolean; c : 0..3; s : {idle, go};\n\
             IVAR i : boolean;\n\
             DEFINE running := s = go;\n\
             ASSIGN init(x) := FALSE; next(x) := !x;\n\
             INIT c = 0\n\
             TRANS next(c) = (c + 1) mod 4\n\
             JUSTICE running\n\
             CTLSPEC AG (x = 0 | x = 1)\n\
             INVARSPEC c != 4\n",
            &mut arena,
            &mut registry,
        )
        .unwrap();

        assert!(registry.is_state_var("x"));
        assert!(registry.is_state_var("s"));
        assert!(registry.is_input_var("i"));
        assert!(registry.is_define("running"));
        assert!(registry.is_constant("go"));
        assert_eq!(model.assigns.len(), 2);
        assert_eq!(model.init.len(), 1);
        assert_eq!(model.trans.len(), 1);
        assert_eq!(model.justice.len(), 1);
        assert_eq!(model.properties.len(), 2);
        assert_eq!(model.properties[0].kind, PropKind::Ctl);
        assert_eq!(model.properties[1].kind, PropKind::Invar);
    }
}
