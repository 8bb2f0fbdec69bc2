//! Boolean circuits and the builder used to record them gate by gate.
//!
//! A [`Circuit`] is a directed acyclic graph of input wires and XOR / AND / NOT gates, stored in
//! topological order: every gate only refers to wires with a smaller index. Input wires are tagged
//! with the party that owns (and supplies) their value.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::protocol::Role;

/// Index of a wire in a circuit.
pub type WireIndex = usize;

/// A single wire of a circuit, either an input or the output of a gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Wire {
    /// An input wire whose value is supplied by the given party.
    Input(Role),
    /// The negation of a wire.
    Not(WireIndex),
    /// The XOR of two wires.
    Xor(WireIndex, WireIndex),
    /// The AND of two wires.
    And(WireIndex, WireIndex),
}

/// A boolean circuit with (possibly) multiple outputs.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Circuit {
    /// All wires, in topological order.
    pub wires: Vec<Wire>,
    /// The wires whose values are revealed at the end of the computation.
    pub outputs: Vec<WireIndex>,
}

/// A structural problem of a [`Circuit`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CircuitError {
    /// A gate refers to itself or to a wire that comes after it.
    #[error("gate {0} is not in topological order")]
    InvalidGate(WireIndex),
    /// An output refers to a wire that does not exist.
    #[error("output wire {0} does not exist")]
    InvalidOutput(WireIndex),
}

impl Circuit {
    /// Checks that all gates and outputs refer to valid wires.
    pub fn validate(&self) -> Result<(), CircuitError> {
        for (w, wire) in self.wires.iter().enumerate() {
            let valid = match *wire {
                Wire::Input(_) => true,
                Wire::Not(x) => x < w,
                Wire::Xor(x, y) | Wire::And(x, y) => x < w && y < w,
            };
            if !valid {
                return Err(CircuitError::InvalidGate(w));
            }
        }
        if let Some(&w) = self.outputs.iter().find(|&&w| w >= self.wires.len()) {
            return Err(CircuitError::InvalidOutput(w));
        }
        Ok(())
    }

    /// The number of input wires supplied by the given party.
    pub fn inputs_of(&self, role: Role) -> usize {
        self.wires
            .iter()
            .filter(|w| matches!(w, Wire::Input(r) if *r == role))
            .count()
    }

    /// The number of AND gates, which determines the size of the garbled circuit.
    pub fn and_gates(&self) -> usize {
        self.wires
            .iter()
            .filter(|w| matches!(w, Wire::And(_, _)))
            .count()
    }
}

/// A bit during circuit construction: either a public constant or a wire of the circuit.
///
/// Constants are folded away as soon as they meet a gate, so they never appear in the circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Bit {
    Const(bool),
    Wire(WireIndex),
}

/// Size metrics of a circuit, both at the level of secret values and of boolean gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CircuitStats {
    /// Equality comparisons between two secret integers.
    pub equalities: usize,
    /// Conjunctions of two (non-constant) secret booleans.
    pub ands: usize,
    /// Disjunctions of two (non-constant) secret booleans.
    pub ors: usize,
    /// Input wires of both parties.
    pub input_wires: usize,
    /// Boolean AND gates (the only gates that need to be garbled).
    pub and_gates: usize,
    /// Boolean XOR gates.
    pub xor_gates: usize,
    /// Boolean NOT gates.
    pub not_gates: usize,
}

/// Records a circuit gate by gate, folding public constants.
#[derive(Debug, Default)]
pub(crate) struct CircuitBuilder {
    wires: Vec<Wire>,
    stats: CircuitStats,
}

impl CircuitBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn stats(&self) -> CircuitStats {
        self.stats
    }

    pub(crate) fn stats_mut(&mut self) -> &mut CircuitStats {
        &mut self.stats
    }

    fn push(&mut self, wire: Wire) -> Bit {
        self.wires.push(wire);
        Bit::Wire(self.wires.len() - 1)
    }

    pub(crate) fn input(&mut self, owner: Role) -> Bit {
        self.stats.input_wires += 1;
        self.push(Wire::Input(owner))
    }

    pub(crate) fn not(&mut self, x: Bit) -> Bit {
        match x {
            Bit::Const(b) => Bit::Const(!b),
            Bit::Wire(x) => {
                self.stats.not_gates += 1;
                self.push(Wire::Not(x))
            }
        }
    }

    pub(crate) fn xor(&mut self, x: Bit, y: Bit) -> Bit {
        match (x, y) {
            (Bit::Const(a), Bit::Const(b)) => Bit::Const(a ^ b),
            (Bit::Const(false), w) | (w, Bit::Const(false)) => w,
            (Bit::Const(true), w) | (w, Bit::Const(true)) => self.not(w),
            (Bit::Wire(x), Bit::Wire(y)) => {
                self.stats.xor_gates += 1;
                self.push(Wire::Xor(x, y))
            }
        }
    }

    pub(crate) fn and(&mut self, x: Bit, y: Bit) -> Bit {
        match (x, y) {
            (Bit::Const(false), _) | (_, Bit::Const(false)) => Bit::Const(false),
            (Bit::Const(true), w) | (w, Bit::Const(true)) => w,
            (Bit::Wire(x), Bit::Wire(y)) => {
                self.stats.and_gates += 1;
                self.push(Wire::And(x, y))
            }
        }
    }

    /// `x | y` as `!(!x & !y)`, costing a single AND gate.
    pub(crate) fn or(&mut self, x: Bit, y: Bit) -> Bit {
        match (x, y) {
            (Bit::Const(true), _) | (_, Bit::Const(true)) => Bit::Const(true),
            (Bit::Const(false), w) | (w, Bit::Const(false)) => w,
            (Bit::Wire(_), Bit::Wire(_)) => {
                let not_x = self.not(x);
                let not_y = self.not(y);
                let nor = self.and(not_x, not_y);
                self.not(nor)
            }
        }
    }

    /// Finishes the circuit with the given output wires.
    pub(crate) fn build(self, outputs: Vec<WireIndex>) -> Circuit {
        Circuit {
            wires: self.wires,
            outputs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants_are_folded() {
        let mut b = CircuitBuilder::new();
        let x = b.input(Role::PatternHolder);
        assert_eq!(b.and(Bit::Const(true), x), x);
        assert_eq!(b.and(x, Bit::Const(false)), Bit::Const(false));
        assert_eq!(b.or(Bit::Const(false), x), x);
        assert_eq!(b.or(x, Bit::Const(true)), Bit::Const(true));
        assert_eq!(b.xor(Bit::Const(false), x), x);
        assert_eq!(b.xor(Bit::Const(true), Bit::Const(true)), Bit::Const(false));
        assert_eq!(b.stats().and_gates, 0);
        assert_eq!(b.stats().xor_gates, 0);

        let y = b.input(Role::TextHolder);
        b.or(x, y);
        assert_eq!(b.stats().and_gates, 1);
        assert_eq!(b.stats().input_wires, 2);
    }

    #[test]
    fn validate_rejects_forward_references() {
        let circuit = Circuit {
            wires: vec![Wire::Input(Role::PatternHolder), Wire::And(0, 2)],
            outputs: vec![1],
        };
        assert_eq!(circuit.validate(), Err(CircuitError::InvalidGate(1)));

        let circuit = Circuit {
            wires: vec![Wire::Input(Role::PatternHolder)],
            outputs: vec![1],
        };
        assert_eq!(circuit.validate(), Err(CircuitError::InvalidOutput(1)));
    }

    #[test]
    fn counts_inputs_per_party() {
        let circuit = Circuit {
            wires: vec![
                Wire::Input(Role::PatternHolder),
                Wire::Input(Role::TextHolder),
                Wire::Input(Role::TextHolder),
                Wire::And(0, 1),
                Wire::Xor(3, 2),
            ],
            outputs: vec![4],
        };
        assert_eq!(circuit.validate(), Ok(()));
        assert_eq!(circuit.inputs_of(Role::PatternHolder), 1);
        assert_eq!(circuit.inputs_of(Role::TextHolder), 2);
        assert_eq!(circuit.and_gates(), 1);
    }
}
