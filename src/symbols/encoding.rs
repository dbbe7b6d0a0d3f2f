//! The Boolean bit-vector encoding of scalar variables: ordering positions,
//! per-variable bit lists, and the reverse bit-to-variable map.

use log::warn;

use std::collections::HashMap;

/// One encoded Boolean bit: its owning variable, the bit position inside the
/// owner (0 is the most significant), and whether the owner is an input.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BitInfo {
    pub owner: String,
    pub bit: usize,
    pub input: bool,
}

impl BitInfo {
    /// Textual name of the bit. Single-bit variables keep their own name.
    pub fn bit_name(&self, owner_width: usize) -> String {
        if owner_width <= 1 {
            self.owner.clone()
        } else {
            format!("{}.{}", self.owner, self.bit)
        }
    }
}

/// The global bit ordering. Position in `bits` is the ordering position.
#[derive(Clone, Debug, Default)]
pub struct BitEncoding {
    bits: Vec<BitInfo>,
    var_bits: HashMap<String, Vec<usize>>,
    var_width: HashMap<String, usize>,
}

impl BitEncoding {
    pub fn new() -> BitEncoding {
        BitEncoding::default()
    }

    pub fn bit_count(&self) -> usize {
        self.bits.len()
    }

    pub fn bit(&self, position: usize) -> &BitInfo {
        &self.bits[position]
    }

    pub fn bits(&self) -> &[BitInfo] {
        &self.bits
    }

    pub fn is_encoded(&self, var: &str) -> bool {
        self.var_bits.contains_key(var)
    }

    /// Ordering positions of the bits of `var`, most significant first.
    pub fn bits_of(&self, var: &str) -> Option<&[usize]> {
        self.var_bits.get(var).map(|positions| positions.as_slice())
    }

    /// Declared width of `var` in bits.
    pub fn width_of(&self, var: &str) -> Option<usize> {
        self.var_width.get(var).copied()
    }

    /// Reverse map: the owning variable and bit position of an ordering slot.
    pub fn owner_of(&self, position: usize) -> (&str, usize) {
        let info = &self.bits[position];
        (&info.owner, info.bit)
    }

    fn place_bit(&mut self, owner: &str, bit: usize, input: bool) {
        let positions = self.var_bits.entry(owner.to_string()).or_default();
        if positions.iter().any(|&p| self.bits[p].bit == bit) {
            return;
        }
        let position = self.bits.len();
        self.bits.push(BitInfo {
            owner: owner.to_string(),
            bit,
            input,
        });
        positions.push(position);
        positions.sort_by_key(|&p| self.bits[p].bit);
    }

    /// Extend the ordering with every not-yet-placed bit of `declared`
    /// variables (`(name, range, is_input)` tuples, in declaration order).
    /// The `order_prefix` names are placed first.
    pub fn extend(
        &mut self,
        declared: &[(String, crate::symbols::registry::VarRange, bool)],
        order_prefix: &[String],
    ) {
        let widths: HashMap<&str, (usize, bool)> = declared
            .iter()
            .map(|(name, range, input)| (name.as_str(), (range.bit_width(), *input)))
            .collect();

        let mut listed: Vec<&str> = Vec::new();
        for entry in order_prefix {
            // an entry is either a scalar name or a bit-addressed `name.i`
            let (name, bit) = match entry.rsplit_once('.') {
                Some((name, bit_str)) if widths.contains_key(name) => {
                    match bit_str.parse::<usize>() {
                        Ok(bit) => (name, Some(bit)),
                        Err(_) => (entry.as_str(), None),
                    }
                }
                _ => (entry.as_str(), None),
            };
            let Some(&(width, input)) = widths.get(name) else {
                warn!("variable ordering: unknown name '{entry}' skipped");
                continue;
            };
            if listed.contains(&name) && bit.is_none() {
                warn!("variable ordering: name '{entry}' repeated");
                continue;
            }
            listed.push(name);
            match bit {
                Some(bit) if bit < width => self.place_bit(name, bit, input),
                Some(bit) => {
                    warn!("variable ordering: bit '{name}.{bit}' is out of range");
                }
                None => {
                    for bit in 0..width {
                        self.place_bit(name, bit, input);
                    }
                }
            }
        }

        // unlisted variables follow in declaration order
        for (name, range, input) in declared {
            if self.var_width.contains_key(name) {
                continue;
            }
            let width = range.bit_width();
            for bit in 0..width {
                self.place_bit(name, bit, *input);
            }
            self.var_width.insert(name.clone(), width);
            // zero-width variables still need their (empty) slot recorded
            self.var_bits.entry(name.clone()).or_default();
        }
    }

    /// Drop every bit at position `keep` or later, together with the
    /// variables that no longer have any bit placed.
    pub fn truncate(&mut self, keep: usize) {
        let removed: Vec<String> = self
            .bits
            .drain(keep..)
            .map(|info| info.owner)
            .collect();
        for owner in removed {
            if let Some(positions) = self.var_bits.get_mut(&owner) {
                positions.retain(|&p| p < keep);
                if positions.is_empty() {
                    self.var_bits.remove(&owner);
                    self.var_width.remove(&owner);
                }
            }
        }
    }
}

/// Bits of a range-index value, most significant first.
pub fn value_bits(index: usize, width: usize) -> Vec<bool> {
    (0..width)
        .map(|bit| (index >> (width - 1 - bit)) & 1 == 1)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::registry::VarRange;

    fn declared() -> Vec<(String, VarRange, bool)> {
        vec![
            ("x".to_string(), VarRange::boolean(), false),
            ("c".to_string(), VarRange::from_interval(0, 3).unwrap(), false),
            ("i".to_string(), VarRange::boolean(), true),
        ]
    }

    #[test]
    /// Unlisted variables are appended in declaration order.
    fn declaration_order_layout() {
        let mut encoding = BitEncoding::new();
        encoding.extend(&declared(), &[]);
        assert_eq!(encoding.bit_count(), 4);
        assert_eq!(encoding.owner_of(0), ("x", 0));
        assert_eq!(encoding.owner_of(1), ("c", 0));
        assert_eq!(encoding.owner_of(2), ("c", 1));
        assert_eq!(encoding.owner_of(3), ("i", 0));
        assert_eq!(encoding.bits_of("c").unwrap(), &[1, 2]);
    }

    #[test]
    /// A provided prefix reorders the listed variables in front.
    fn prefix_reorders() {
        let mut encoding = BitEncoding::new();
        let prefix = vec!["c".to_string(), "unknown".to_string()];
        encoding.extend(&declared(), &prefix);
        assert_eq!(encoding.owner_of(0), ("c", 0));
        assert_eq!(encoding.owner_of(1), ("c", 1));
        assert_eq!(encoding.owner_of(2), ("x", 0));
    }

    #[test]
    /// Bit-addressed prefix entries place a single bit.
    fn bit_addressed_prefix() {
        let mut encoding = BitEncoding::new();
        let prefix = vec!["c.1".to_string()];
        encoding.extend(&declared(), &prefix);
        assert_eq!(encoding.owner_of(0), ("c", 1));
        // the remaining bit of `c` follows in declaration order
        assert_eq!(encoding.bits_of("c").map(|b| b.len()), Some(2));
    }

    #[test]
    fn value_bit_patterns() {
        assert_eq!(value_bits(0, 2), vec![false, false]);
        assert_eq!(value_bits(1, 2), vec![false, true]);
        assert_eq!(value_bits(2, 2), vec![true, false]);
        assert_eq!(value_bits(5, 3), vec![true, false, true]);
    }
}
