//! Traces (state-input-state sequences) and the manager that registers
//! produced traces under dense integer ids.

pub mod synth;

use crate::symbols::ScalarValue;

/// What a trace documents.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TraceKind {
    CounterExample,
    Simulation,
}

/// A total assignment to the state (or input) vector.
pub type TraceAssignment = Vec<(String, ScalarValue)>;

/// A finite non-empty sequence of states, with the input consumed on each
/// transition attached to the target state. `inputs[0]` is always absent;
/// `inputs[i]` labels the transition into `states[i]`. A loopback index
/// identifies the final state with an earlier one (lasso shape).
#[derive(Clone, Debug)]
pub struct Trace {
    pub name: String,
    pub kind: TraceKind,
    pub states: Vec<TraceAssignment>,
    pub inputs: Vec<Option<TraceAssignment>>,
    pub loopback: Option<usize>,
}

impl Trace {
    pub fn new(name: &str, kind: TraceKind) -> Trace {
        Trace {
            name: name.to_string(),
            kind,
            states: Vec::new(),
            inputs: Vec::new(),
            loopback: None,
        }
    }

    /// Append a state, with the input labelling the transition into it.
    pub fn push_step(&mut self, input: Option<TraceAssignment>, state: TraceAssignment) {
        self.inputs.push(input);
        self.states.push(state);
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Render the trace in the `symbol = value` block form. States repeat
    /// only changed values; the loopback point carries a marker line.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        let mut previous: Option<&TraceAssignment> = None;
        for (index, state) in self.states.iter().enumerate() {
            if self.loopback == Some(index) {
                lines.push("-- Loop starts here".to_string());
            }
            if let Some(Some(input)) = self.inputs.get(index) {
                lines.push(format!("-> Input: {}.{} <-", self.name, index));
                for (name, value) in input {
                    lines.push(format!("    {name} = {value}"));
                }
            }
            lines.push(format!("-> State: {}.{} <-", self.name, index));
            for (name, value) in state {
                let unchanged = previous
                    .map(|p| p.iter().any(|(n, v)| n == name && v == value))
                    .unwrap_or(false);
                if !unchanged {
                    lines.push(format!("    {name} = {value}"));
                }
            }
            previous = Some(state);
        }
        lines
    }
}

/// Storage for produced traces. Registration hands back the dense id the
/// owning property records.
#[derive(Debug, Default)]
pub struct TraceManager {
    traces: Vec<Trace>,
}

impl TraceManager {
    pub fn new() -> TraceManager {
        TraceManager::default()
    }

    /// Register a trace and return its id.
    pub fn register_trace(&mut self, trace: Trace) -> usize {
        self.traces.push(trace);
        self.traces.len() - 1
    }

    pub fn get(&self, id: usize) -> Option<&Trace> {
        self.traces.get(id)
    }

    pub fn len(&self) -> usize {
        self.traces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    /// Registration assigns dense ids in order.
    fn dense_ids() {
        let mut manager = TraceManager::new();
        let first = manager.register_trace(Trace::new("t1", TraceKind::CounterExample));
        let second = manager.register_trace(Trace::new("t2", TraceKind::Simulation));
        assert_eq!((first, second), (0, 1));
        assert_eq!(manager.get(0).unwrap().name, "t1");
    }

    #[test]
    /// Printing marks the loop start and suppresses unchanged values.
    fn printed_form() {
        let mut trace = Trace::new("trace", TraceKind::CounterExample);
        trace.push_step(
            None,
            vec![
                ("x".to_string(), ScalarValue::Bool(false)),
                ("c".to_string(), ScalarValue::Int(0)),
            ],
        );
        trace.push_step(
            Some(vec![("i".to_string(), ScalarValue::Bool(true))]),
            vec![
                ("x".to_string(), ScalarValue::Bool(true)),
                ("c".to_string(), ScalarValue::Int(0)),
            ],
        );
        trace.loopback = Some(1);
        let lines = trace.lines();
        assert!(lines.contains(&"-- Loop starts here".to_string()));
        assert!(lines.contains(&"    i = TRUE".to_string()));
        // `c` did not change in the second state
        assert_eq!(lines.iter().filter(|l| l.contains("c = 0")).count(), 1);
    }
}
