//! Registry of declared symbols (variables, defines, constants) and the
//! Boolean bit-vector encoding of scalar variables.

pub mod encoding;
pub mod ordering;
pub mod registry;

pub use encoding::{BitEncoding, BitInfo};
pub use registry::{ScalarValue, SymbolClass, SymbolRegistry, VarRange};
