//! Ownership of the decision-diagram package: variable creation, the
//! current/next frame pairing, range masks, and minterm picking.

use crate::encode::SymbolicFactory;
use crate::symbols::{ScalarValue, SymbolRegistry};

use biodivine_lib_bdd::{
    Bdd, BddPartialValuation, BddValuation, BddVariable, BddVariableSet, BddVariableSetBuilder,
};
use rand::Rng;

/// Disjunction of the bit cubes of all valid range indices of one variable.
fn valid_values(
    set: &BddVariableSet,
    frame: &[BddVariable],
    positions: &[usize],
    size: usize,
) -> Bdd {
    let width = positions.len();
    let mut valid = set.mk_false();
    for index in 0..size {
        let mut cube = BddPartialValuation::empty();
        for (slot, &position) in positions.iter().enumerate() {
            let bit = width > 0 && (index >> (width - 1 - slot)) & 1 == 1;
            cube.set_value(frame[position], bit);
        }
        valid = valid.or(&set.mk_conjunctive_clause(&cube));
    }
    valid
}

/// The manager binds every encoded bit to a pair of BDD variables (current
/// and next frame; input bits only get the current frame). Current and next
/// variables of a bit are adjacent in the ordering.
///
/// The range masks rule out the unused bit patterns of variables whose range
/// size is not a power of two; they are applied by every operation that
/// enumerates or counts states.
pub struct BddManager {
    set: BddVariableSet,
    curr: Vec<BddVariable>,
    next: Vec<BddVariable>,
    state_positions: Vec<usize>,
    input_positions: Vec<usize>,
    curr_state_vars: Vec<BddVariable>,
    next_state_vars: Vec<BddVariable>,
    input_vars: Vec<BddVariable>,
    frame_bridge: Bdd,
    state_mask: Bdd,
    next_state_mask: Bdd,
    input_mask: Bdd,
}

impl BddManager {
    /// Build a manager for every bit currently encoded in the registry.
    pub fn new(registry: &SymbolRegistry) -> BddManager {
        let encoding = registry.encoding();
        let mut builder = BddVariableSetBuilder::new();
        let mut curr = Vec::with_capacity(encoding.bit_count());
        let mut next = Vec::with_capacity(encoding.bit_count());
        let mut state_positions = Vec::new();
        let mut input_positions = Vec::new();

        for position in 0..encoding.bit_count() {
            let info = encoding.bit(position);
            let width = encoding.width_of(&info.owner).unwrap_or(1);
            let name = info.bit_name(width);
            let curr_var = builder.make_variable(name.as_str());
            if info.input {
                input_positions.push(position);
                curr.push(curr_var);
                next.push(curr_var);
            } else {
                let next_var = builder.make_variable(format!("next_{name}").as_str());
                state_positions.push(position);
                curr.push(curr_var);
                next.push(next_var);
            }
        }
        let set = builder.build();

        let curr_state_vars: Vec<BddVariable> =
            state_positions.iter().map(|&p| curr[p]).collect();
        let next_state_vars: Vec<BddVariable> =
            state_positions.iter().map(|&p| next[p]).collect();
        let input_vars: Vec<BddVariable> = input_positions.iter().map(|&p| curr[p]).collect();

        let mut frame_bridge = set.mk_true();
        for &position in &state_positions {
            let curr_lit = set.mk_var(curr[position]);
            let next_lit = set.mk_var(next[position]);
            frame_bridge = frame_bridge.and(&curr_lit.iff(&next_lit));
        }

        let mut state_mask = set.mk_true();
        let mut next_state_mask = set.mk_true();
        let mut input_mask = set.mk_true();
        let mut seen: Vec<&str> = Vec::new();
        for position in 0..encoding.bit_count() {
            let (owner, _) = encoding.owner_of(position);
            if seen.contains(&owner) {
                continue;
            }
            seen.push(owner);
            let Some(range) = registry.get_var_range(owner) else {
                continue;
            };
            let positions = encoding.bits_of(owner).unwrap();
            if encoding.bit(position).input {
                let valid = valid_values(&set, &curr, positions, range.size());
                input_mask = input_mask.and(&valid);
            } else {
                state_mask = state_mask.and(&valid_values(&set, &curr, positions, range.size()));
                next_state_mask =
                    next_state_mask.and(&valid_values(&set, &next, positions, range.size()));
            }
        }

        BddManager {
            set,
            curr,
            next,
            state_positions,
            input_positions,
            curr_state_vars,
            next_state_vars,
            input_vars,
            frame_bridge,
            state_mask,
            next_state_mask,
            input_mask,
        }
    }

    pub fn vars(&self) -> &BddVariableSet {
        &self.set
    }

    pub fn mk_true(&self) -> Bdd {
        self.set.mk_true()
    }

    pub fn mk_false(&self) -> Bdd {
        self.set.mk_false()
    }

    /// The literal of an encoded bit.
    pub fn bit_literal(&self, position: usize, next_frame: bool, value: bool) -> Bdd {
        let var = if next_frame {
            self.next[position]
        } else {
            self.curr[position]
        };
        self.set.mk_literal(var, value)
    }

    pub fn curr_var(&self, position: usize) -> BddVariable {
        self.curr[position]
    }

    pub fn next_var(&self, position: usize) -> BddVariable {
        self.next[position]
    }

    pub fn curr_state_vars(&self) -> &[BddVariable] {
        &self.curr_state_vars
    }

    pub fn next_state_vars(&self) -> &[BddVariable] {
        &self.next_state_vars
    }

    pub fn input_vars(&self) -> &[BddVariable] {
        &self.input_vars
    }

    pub fn state_positions(&self) -> &[usize] {
        &self.state_positions
    }

    pub fn input_positions(&self) -> &[usize] {
        &self.input_positions
    }

    pub fn state_mask(&self) -> &Bdd {
        &self.state_mask
    }

    pub fn next_state_mask(&self) -> &Bdd {
        &self.next_state_mask
    }

    pub fn input_mask(&self) -> &Bdd {
        &self.input_mask
    }

    /// Substitute `function` for `var` inside `f` (Shannon composition).
    pub fn compose(&self, f: &Bdd, var: BddVariable, function: &Bdd) -> Bdd {
        let high = f.var_restrict(var, true);
        let low = f.var_restrict(var, false);
        function.and(&high).or(&function.not().and(&low))
    }

    /// Rename a set over next-frame variables into the current frame.
    pub fn next_to_current(&self, set: &Bdd) -> Bdd {
        set.and(&self.frame_bridge).exists(&self.next_state_vars)
    }

    /// Rename a set over current-frame variables into the next frame.
    pub fn current_to_next(&self, set: &Bdd) -> Bdd {
        set.and(&self.frame_bridge).exists(&self.curr_state_vars)
    }

    /// Number of states of a set depending only on current state bits.
    pub fn count_states(&self, set: &Bdd) -> f64 {
        let free = self.set.num_vars() as usize - self.curr_state_vars.len();
        set.cardinality() / 2f64.powi(free as i32)
    }

    /// Quantify everything but the current-frame state bits.
    pub fn to_state_set(&self, set: &Bdd) -> Bdd {
        let drop: Vec<BddVariable> = self
            .next_state_vars
            .iter()
            .chain(self.input_vars.iter())
            .copied()
            .collect();
        set.exists(&drop)
    }

    /// Deterministically pick a single state of `set` (the first minterm in
    /// the variable ordering). Returns `None` when the set is empty.
    pub fn pick_one_state(&self, set: &Bdd) -> Option<Bdd> {
        let masked = self.to_state_set(set).and(&self.state_mask);
        let witness = masked.sat_witness()?;
        Some(self.state_cube_of(&witness))
    }

    /// Pick a single state of `set` with PRNG-driven branch choices.
    pub fn pick_one_state_rand<R: Rng>(&self, set: &Bdd, rng: &mut R) -> Option<Bdd> {
        let masked = self.to_state_set(set).and(&self.state_mask);
        if masked.is_false() {
            return None;
        }
        let mut rest = masked;
        let mut cube = BddPartialValuation::empty();
        for &var in &self.curr_state_vars {
            let preferred: bool = rng.gen();
            let candidate = rest.var_restrict(var, preferred);
            let value = if candidate.is_false() { !preferred } else { preferred };
            rest = rest.var_restrict(var, value);
            cube.set_value(var, value);
        }
        Some(self.set.mk_conjunctive_clause(&cube))
    }

    /// Deterministically pick a single input assignment of `set`.
    pub fn pick_one_input(&self, set: &Bdd) -> Option<Bdd> {
        let drop: Vec<BddVariable> = self
            .curr_state_vars
            .iter()
            .chain(self.next_state_vars.iter())
            .copied()
            .collect();
        let masked = set.exists(&drop).and(&self.input_mask);
        let witness = masked.sat_witness()?;
        let mut cube = BddPartialValuation::empty();
        for &var in &self.input_vars {
            cube.set_value(var, witness.value(var));
        }
        Some(self.set.mk_conjunctive_clause(&cube))
    }

    /// The current-frame state cube of a full valuation.
    pub fn state_cube_of(&self, valuation: &BddValuation) -> Bdd {
        let mut cube = BddPartialValuation::empty();
        for &var in &self.curr_state_vars {
            cube.set_value(var, valuation.value(var));
        }
        self.set.mk_conjunctive_clause(&cube)
    }

    /// Decode a single-state cube into `(symbol, value)` pairs, in the
    /// declaration order of the registry.
    pub fn decode_state(&self, registry: &SymbolRegistry, cube: &Bdd) -> Vec<(String, ScalarValue)> {
        self.decode_vars(registry, cube, false)
    }

    /// Decode a single-input cube into `(symbol, value)` pairs.
    pub fn decode_input(&self, registry: &SymbolRegistry, cube: &Bdd) -> Vec<(String, ScalarValue)> {
        self.decode_vars(registry, cube, true)
    }

    fn decode_vars(
        &self,
        registry: &SymbolRegistry,
        cube: &Bdd,
        inputs: bool,
    ) -> Vec<(String, ScalarValue)> {
        let Some(witness) = cube.sat_witness() else {
            return Vec::new();
        };
        let encoding = registry.encoding();
        let mut values = Vec::new();
        for name in registry.declaration_order() {
            let is_input = registry.is_input_var(name);
            if (inputs && !is_input) || (!inputs && !registry.is_state_var(name)) {
                continue;
            }
            let Some(positions) = encoding.bits_of(name) else {
                continue;
            };
            let Some(range) = registry.get_var_range(name) else {
                continue;
            };
            let mut index = 0usize;
            for &position in positions {
                index = (index << 1) | usize::from(witness.value(self.curr[position]));
            }
            if index < range.size() {
                values.push((name.clone(), range.values[index].clone()));
            }
        }
        values
    }
}

impl SymbolicFactory for BddManager {
    type Term = Bdd;

    fn mk_true(&mut self) -> Bdd {
        self.set.mk_true()
    }

    fn mk_false(&mut self) -> Bdd {
        self.set.mk_false()
    }

    fn mk_not(&mut self, a: &Bdd) -> Bdd {
        a.not()
    }

    fn mk_and(&mut self, a: &Bdd, b: &Bdd) -> Bdd {
        a.and(b)
    }

    fn mk_or(&mut self, a: &Bdd, b: &Bdd) -> Bdd {
        a.or(b)
    }

    fn mk_ite(&mut self, c: &Bdd, t: &Bdd, e: &Bdd) -> Bdd {
        c.and(t).or(&c.not().and(e))
    }

    fn bit(&mut self, position: usize, next: bool) -> Bdd {
        self.bit_literal(position, next, true)
    }
}
