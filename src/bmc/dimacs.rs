//! DIMACS output of bounded problems.

use crate::be::Cnf;
use crate::errors::CheckResult;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Expand a dump filename template: `@k` is the bound, `@l` the loopback
/// descriptor (`X` when there is none).
pub fn expand_template(template: &str, k: u32, loopback: &str) -> String {
    template
        .replace("@k", &k.to_string())
        .replace("@l", loopback)
}

/// Write the CNF (with its output literal asserted) in DIMACS form.
pub fn write_dimacs(cnf: &Cnf, path: &Path) -> CheckResult<()> {
    let file = File::create(path)?;
    let mut out = BufWriter::new(file);
    writeln!(out, "c generated by the bounded model checker")?;
    writeln!(out, "p cnf {} {}", cnf.max_var, cnf.clauses.len() + 1)?;
    for clause in &cnf.clauses {
        for literal in clause {
            write!(out, "{literal} ")?;
        }
        writeln!(out, "0")?;
    }
    writeln!(out, "{} 0", cnf.output)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_expansion() {
        assert_eq!(expand_template("prob_@k_@l.dimacs", 7, "X"), "prob_7_X.dimacs");
        assert_eq!(expand_template("plain.cnf", 7, "2"), "plain.cnf");
    }
}
