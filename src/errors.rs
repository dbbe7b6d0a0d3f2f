//! Error taxonomy shared by all components of the checker.

use thiserror::Error;

/// Shorthand for results produced by the fallible checker operations.
pub type CheckResult<T> = Result<T, CheckError>;

/// All error kinds the verification core can report.
///
/// Semantic errors fail the current property or model load, solver errors are
/// reported per property (`SolverMemout` is fatal to the whole run). Warnings
/// never travel through this enum; they go to the logger.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum CheckError {
    #[error("line {line}: undefined symbol '{name}'")]
    UndefinedSymbol { name: String, line: u32 },
    #[error("line {line}: symbol '{name}' already defined")]
    RedefinedSymbol { name: String, line: u32 },
    #[error("symbol '{name}' is ambiguously classified")]
    AmbiguousSymbol { name: String },
    #[error("line {line}: '{name}' is recursively defined (resolving: {stack:?})")]
    CircularDefinition {
        name: String,
        line: u32,
        stack: Vec<String>,
    },
    #[error("multiple assignment of '{lhs}' (lines {first_line} and {second_line})")]
    MultipleAssignment {
        lhs: String,
        first_line: u32,
        second_line: u32,
    },
    #[error("line {line}: nested 'next' is not allowed")]
    NestedNext { line: u32 },
    #[error("line {line}: unexpected 'next' operator")]
    UnexpectedNext { line: u32 },
    #[error("line {line}: value {value} is out of range of '{name}'")]
    RangeError {
        name: String,
        value: String,
        line: u32,
    },
    #[error("line {line}: division by zero")]
    DivisionByZero { line: u32 },
    #[error("invalid subrange {low}..{high}")]
    InvalidSubrange { low: i64, high: i64 },
    #[error("input variable '{name}' is not allowed in {position}")]
    InputInDisallowedPosition { name: String, position: String },
    #[error("expression is not well typed: {0}")]
    TypeError(String),
    #[error("unsupported PSL feature: {0}")]
    PslUnsupported(String),

    #[error("there is no SAT solver named '{0}'")]
    NoSuchSolver(String),
    #[error("could not create an instance of SAT solver '{0}'")]
    SolverCreate(String),
    #[error("SAT solver failed internally: {0}")]
    SolverInternal(String),
    #[error("SAT solver timed out")]
    SolverTimeout,
    #[error("SAT solver ran out of memory")]
    SolverMemout,

    #[error("line {line}: {message}")]
    Parse { message: String, line: u32 },
    #[error("i/o error: {0}")]
    Io(String),
}

impl From<std::io::Error> for CheckError {
    fn from(value: std::io::Error) -> Self {
        CheckError::Io(value.to_string())
    }
}
