//! Loopback bookkeeping for bounded problems.

/// The loopback regime of a bounded LTL problem.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Loopback {
    /// Finite-prefix semantics, no loop identity added.
    NoLoop,
    /// Try every possible loop point.
    AllLoops,
    /// A single loop point; negative values count back from the bound.
    Loop(i64),
}

impl Loopback {
    /// Translate a possibly relative loop value at bound `k` into an
    /// absolute one (`-(k - l)` encodes `l`).
    pub fn absolute(self, k: u32) -> Loopback {
        match self {
            Loopback::Loop(l) if l < 0 => Loopback::Loop(i64::from(k) + l),
            other => other,
        }
    }

    pub fn is_single(self) -> bool {
        matches!(self, Loopback::Loop(_))
    }

    /// Human-readable form used in progress reports.
    pub fn describe(self) -> String {
        match self {
            Loopback::NoLoop => "no loopback".to_string(),
            Loopback::AllLoops => "all possible loopbacks".to_string(),
            Loopback::Loop(l) => format!("loopback {l}"),
        }
    }
}

/// Parse a loopback option value: `X` means no loop, `*` all loops, and a
/// (possibly negative) number a single loop point.
pub fn parse_loopback(text: &str) -> Option<Loopback> {
    match text {
        "X" | "x" => Some(Loopback::NoLoop),
        "*" => Some(Loopback::AllLoops),
        _ => text.parse::<i64>().ok().map(Loopback::Loop),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_translation() {
        assert_eq!(Loopback::Loop(-1).absolute(5), Loopback::Loop(4));
        assert_eq!(Loopback::Loop(2).absolute(5), Loopback::Loop(2));
        assert_eq!(Loopback::NoLoop.absolute(5), Loopback::NoLoop);
        // beyond the bound the value stays negative and is skipped later
        assert_eq!(Loopback::Loop(-7).absolute(5), Loopback::Loop(-2));
    }

    #[test]
    fn option_parsing() {
        assert_eq!(parse_loopback("X"), Some(Loopback::NoLoop));
        assert_eq!(parse_loopback("*"), Some(Loopback::AllLoops));
        assert_eq!(parse_loopback("-1"), Some(Loopback::Loop(-1)));
        assert_eq!(parse_loopback("oops"), None);
    }
}
