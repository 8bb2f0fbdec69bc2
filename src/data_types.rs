//! Data types used across the garbling engine.

use std::ops::{BitAnd, BitXor};

use serde::{Deserialize, Serialize};
use subtle::{Choice, ConstantTimeEq};

/// The global free-XOR offset, known only to the garbler.
///
/// The least significant bit is always set, so that the two labels of a wire always differ in
/// their color (point-and-permute) bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Delta(pub(crate) u128);

impl Delta {
    /// Samples a fresh random offset.
    pub(crate) fn random() -> Self {
        Delta(rand::random::<u128>() | 1)
    }
}

impl BitAnd<Delta> for bool {
    type Output = Delta;

    fn bitand(self, rhs: Delta) -> Self::Output {
        if self { rhs } else { Delta(0) }
    }
}

/// A label for a particular wire in the circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub(crate) struct Label(pub(crate) u128);

impl Label {
    /// Samples a fresh random label.
    pub(crate) fn random() -> Self {
        Label(rand::random())
    }

    /// The point-and-permute bit, visible to the evaluator.
    pub(crate) fn color(self) -> bool {
        self.0 & 1 == 1
    }
}

impl BitXor for Label {
    type Output = Self;

    fn bitxor(self, rhs: Self) -> Self::Output {
        Label(self.0 ^ rhs.0)
    }
}

impl BitXor<Delta> for Label {
    type Output = Self;

    fn bitxor(self, rhs: Delta) -> Self::Output {
        Label(self.0 ^ rhs.0)
    }
}

impl ConstantTimeEq for Label {
    fn ct_eq(&self, other: &Self) -> Choice {
        self.0.ct_eq(&other.0)
    }
}

/// The four encrypted rows of a garbled AND gate, ordered by the colors of the input labels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct GarbledGate(pub(crate) [Vec<u8>; 4]);
