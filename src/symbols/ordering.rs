//! Reading and writing of variable ordering files.

use crate::errors::CheckResult;
use crate::symbols::registry::SymbolRegistry;

use std::fs;
use std::path::Path;

/// How [write_order] renders the ordering.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OrderMode {
    /// One line per scalar variable, at the position of its first bit.
    Scalar,
    /// One line per bit, bit-addressed as `name.i` for multi-bit variables.
    Bits,
}

/// Read an ordering file: whitespace-separated names, one or more per line.
/// Lines starting with `#` are comments.
pub fn read_order_file(path: &Path) -> CheckResult<Vec<String>> {
    let content = fs::read_to_string(path)?;
    let mut names = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        for token in line.split_whitespace() {
            names.push(token.to_string());
        }
    }
    Ok(names)
}

/// Dump the current ordering of `registry` to `path`.
pub fn write_order(registry: &SymbolRegistry, path: &Path, mode: OrderMode) -> CheckResult<()> {
    let encoding = registry.encoding();
    let mut lines: Vec<String> = Vec::new();
    let mut seen: Vec<&str> = Vec::new();
    for position in 0..encoding.bit_count() {
        let (owner, _) = encoding.owner_of(position);
        let width = encoding.width_of(owner).unwrap_or(1);
        match mode {
            OrderMode::Scalar => {
                if !seen.contains(&owner) {
                    lines.push(owner.to_string());
                }
            }
            OrderMode::Bits => {
                lines.push(encoding.bit(position).bit_name(width));
            }
        }
        if !seen.contains(&owner) {
            seen.push(owner);
        }
    }
    fs::write(path, lines.join("\n") + "\n")?;
    Ok(())
}
