//! The symbol registry: declarations, classification, and the snapshot
//! stack that makes temporary (tableau-introduced) symbols removable.

use crate::errors::{CheckError, CheckResult};
use crate::expr::ExprId;
use crate::symbols::encoding::BitEncoding;

use std::collections::HashMap;
use std::fmt;

/// A single value of a finite scalar range.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Ord, PartialOrd)]
pub enum ScalarValue {
    Bool(bool),
    Int(i64),
    Sym(String),
}

impl ScalarValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ScalarValue::Int(value) => Some(*value),
            ScalarValue::Bool(value) => Some(i64::from(*value)),
            ScalarValue::Sym(_) => None,
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ScalarValue::Bool(true) => write!(f, "TRUE"),
            ScalarValue::Bool(false) => write!(f, "FALSE"),
            ScalarValue::Int(value) => write!(f, "{value}"),
            ScalarValue::Sym(name) => write!(f, "{name}"),
        }
    }
}

/// The declared range of a variable - an ordered set of values.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VarRange {
    pub values: Vec<ScalarValue>,
}

impl VarRange {
    pub fn boolean() -> VarRange {
        VarRange {
            values: vec![ScalarValue::Bool(false), ScalarValue::Bool(true)],
        }
    }

    pub fn from_interval(low: i64, high: i64) -> CheckResult<VarRange> {
        if low > high {
            return Err(CheckError::InvalidSubrange { low, high });
        }
        Ok(VarRange {
            values: (low..=high).map(ScalarValue::Int).collect(),
        })
    }

    pub fn is_boolean(&self) -> bool {
        self.values == [ScalarValue::Bool(false), ScalarValue::Bool(true)]
    }

    pub fn size(&self) -> usize {
        self.values.len()
    }

    /// Position of a value inside the range.
    pub fn index_of(&self, value: &ScalarValue) -> Option<usize> {
        self.values.iter().position(|v| v == value)
    }

    /// Number of Boolean bits needed to address the range.
    pub fn bit_width(&self) -> usize {
        let size = self.size().max(1);
        (usize::BITS - (size - 1).leading_zeros()) as usize
    }
}

/// Classification of a declared symbol.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SymbolClass {
    StateVar,
    InputVar,
    Define,
    Constant,
}

#[derive(Clone, Debug, PartialEq)]
enum SymbolData {
    StateVar(VarRange),
    InputVar(VarRange),
    Define { context: ExprId, body: ExprId },
    Constant,
}

/// Registry of every declared symbol of the current model, together with the
/// bit encoding of its variables.
///
/// The registry supports nested snapshots: [SymbolRegistry::push_status]
/// records the current extent and [SymbolRegistry::pop_status] removes every
/// declaration (and every encoded bit) added since the matching push.
pub struct SymbolRegistry {
    symbols: HashMap<String, SymbolData>,
    order: Vec<String>,
    snapshots: Vec<(usize, usize)>,
    pub(crate) encoding: BitEncoding,
}

impl Default for SymbolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolRegistry {
    pub fn new() -> SymbolRegistry {
        SymbolRegistry {
            symbols: HashMap::new(),
            order: Vec::new(),
            snapshots: Vec::new(),
            encoding: BitEncoding::new(),
        }
    }

    fn declare(&mut self, name: &str, data: SymbolData, line: u32) -> CheckResult<()> {
        if let Some(existing) = self.symbols.get(name) {
            // the exact same declaration may recur, anything else is an error
            if *existing == data {
                return Ok(());
            }
            return Err(CheckError::RedefinedSymbol {
                name: name.to_string(),
                line,
            });
        }
        self.symbols.insert(name.to_string(), data);
        self.order.push(name.to_string());
        Ok(())
    }

    pub fn declare_state_var(&mut self, name: &str, range: VarRange, line: u32) -> CheckResult<()> {
        self.declare(name, SymbolData::StateVar(range), line)
    }

    pub fn declare_input_var(&mut self, name: &str, range: VarRange, line: u32) -> CheckResult<()> {
        self.declare(name, SymbolData::InputVar(range), line)
    }

    pub fn declare_define(
        &mut self,
        name: &str,
        context: ExprId,
        body: ExprId,
        line: u32,
    ) -> CheckResult<()> {
        self.declare(name, SymbolData::Define { context, body }, line)
    }

    pub fn declare_constant(&mut self, name: &str, line: u32) -> CheckResult<()> {
        self.declare(name, SymbolData::Constant, line)
    }

    pub fn is_symbol(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }

    pub fn is_symbol_var(&self, name: &str) -> bool {
        matches!(
            self.symbols.get(name),
            Some(SymbolData::StateVar(_)) | Some(SymbolData::InputVar(_))
        )
    }

    pub fn is_state_var(&self, name: &str) -> bool {
        matches!(self.symbols.get(name), Some(SymbolData::StateVar(_)))
    }

    pub fn is_input_var(&self, name: &str) -> bool {
        matches!(self.symbols.get(name), Some(SymbolData::InputVar(_)))
    }

    pub fn is_define(&self, name: &str) -> bool {
        matches!(self.symbols.get(name), Some(SymbolData::Define { .. }))
    }

    pub fn is_constant(&self, name: &str) -> bool {
        matches!(self.symbols.get(name), Some(SymbolData::Constant))
    }

    pub fn symbol_class(&self, name: &str) -> Option<SymbolClass> {
        match self.symbols.get(name)? {
            SymbolData::StateVar(_) => Some(SymbolClass::StateVar),
            SymbolData::InputVar(_) => Some(SymbolClass::InputVar),
            SymbolData::Define { .. } => Some(SymbolClass::Define),
            SymbolData::Constant => Some(SymbolClass::Constant),
        }
    }

    pub fn get_var_range(&self, name: &str) -> Option<&VarRange> {
        match self.symbols.get(name)? {
            SymbolData::StateVar(range) | SymbolData::InputVar(range) => Some(range),
            _ => None,
        }
    }

    pub fn get_define_body(&self, name: &str) -> Option<ExprId> {
        match self.symbols.get(name)? {
            SymbolData::Define { body, .. } => Some(*body),
            _ => None,
        }
    }

    pub fn get_define_context(&self, name: &str) -> Option<ExprId> {
        match self.symbols.get(name)? {
            SymbolData::Define { context, .. } => Some(*context),
            _ => None,
        }
    }

    /// Whether any of the given symbols is an input variable.
    pub fn list_contains_input_vars<'a>(
        &self,
        names: impl IntoIterator<Item = &'a String>,
    ) -> bool {
        names.into_iter().any(|name| self.is_input_var(name))
    }

    /// State variables in declaration order.
    pub fn state_vars(&self) -> Vec<String> {
        self.order
            .iter()
            .filter(|name| self.is_state_var(name))
            .cloned()
            .collect()
    }

    /// Input variables in declaration order.
    pub fn input_vars(&self) -> Vec<String> {
        self.order
            .iter()
            .filter(|name| self.is_input_var(name))
            .cloned()
            .collect()
    }

    /// All declared symbols in declaration order.
    pub fn declaration_order(&self) -> &[String] {
        &self.order
    }

    /// Lower every not-yet-encoded variable to its bit vector, assigning
    /// ordering positions. Names from `order_prefix` (either `var` or
    /// `var.bit` entries) are placed first; unknown names are skipped with a
    /// warning, the remaining variables follow in declaration order.
    pub fn encode_vars(&mut self, order_prefix: &[String]) {
        let mut declared: Vec<(String, VarRange, bool)> = Vec::new();
        for name in &self.order {
            match self.symbols.get(name) {
                Some(SymbolData::StateVar(range)) => {
                    declared.push((name.clone(), range.clone(), false));
                }
                Some(SymbolData::InputVar(range)) => {
                    declared.push((name.clone(), range.clone(), true));
                }
                _ => {}
            }
        }
        self.encoding.extend(&declared, order_prefix);
    }

    pub fn encoding(&self) -> &BitEncoding {
        &self.encoding
    }

    /// Record the current registry extent.
    pub fn push_status(&mut self) {
        self.snapshots
            .push((self.order.len(), self.encoding.bit_count()));
    }

    /// Undo every declaration (and encoded bit) since the matching push.
    pub fn pop_status(&mut self) {
        let (symbols, bits) = self
            .snapshots
            .pop()
            .expect("pop_status without a matching push_status");
        for name in self.order.drain(symbols..) {
            self.symbols.remove(&name);
        }
        self.encoding.truncate(bits);
    }
}
