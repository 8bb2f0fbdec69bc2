//! Secret values and the session that records the operations performed on them.
//!
//! Both parties create a [`Session`] for their [`Role`] and then perform exactly the same
//! sequence of operations. Every secret value is backed by wires of a circuit that the session
//! records; nothing is computed before [`Session::reveal`], which runs the garbling protocol over
//! the session's channel.

use std::fmt;

use tracing::debug;

use crate::{
    channel::Channel,
    circuit::{Bit, CircuitBuilder, CircuitStats},
    protocol::{self, Role},
};

/// The largest supported bit width of a [`SecretInt`].
pub const MAX_BIT_WIDTH: usize = 32;

/// A secret unsigned integer, supplied by its owner, with a fixed bit width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretInt {
    owner: Role,
    bits: Vec<Bit>,
}

impl SecretInt {
    /// The number of bits of the integer.
    pub fn bit_width(&self) -> usize {
        self.bits.len()
    }

    /// The party that supplied the value.
    pub fn owner(&self) -> Role {
        self.owner
    }
}

/// A secret boolean, either computed from secret values or a public constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecretBool(pub(crate) Bit);

impl SecretBool {
    /// A public constant, known to both parties.
    pub fn constant(b: bool) -> Self {
        SecretBool(Bit::Const(b))
    }

    /// Returns the value if this boolean is a public constant.
    pub fn as_constant(&self) -> Option<bool> {
        match self.0 {
            Bit::Const(b) => Some(b),
            Bit::Wire(_) => None,
        }
    }
}

/// The local view of one party on a single run of the protocol.
pub struct Session<C: Channel> {
    role: Role,
    channel: C,
    builder: CircuitBuilder,
    own_inputs: Vec<bool>,
}

impl<C: Channel> fmt::Debug for Session<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("role", &self.role)
            .field("stats", &self.builder.stats())
            .field("own_inputs", &format_args!("<{} bits>", self.own_inputs.len()))
            .finish_non_exhaustive()
    }
}

impl<C: Channel> Session<C> {
    /// Starts a session for the given role over an established channel to the other party.
    pub fn new(role: Role, channel: C) -> Self {
        Self {
            role,
            channel,
            builder: CircuitBuilder::new(),
            own_inputs: vec![],
        }
    }

    /// The role of the local party.
    pub fn role(&self) -> Role {
        self.role
    }

    /// The size of the circuit recorded so far.
    pub fn stats(&self) -> CircuitStats {
        self.builder.stats()
    }

    pub(crate) fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    /// Binds a secret integer owned by `owner`.
    ///
    /// Only the owner's `value` is used; the other party passes a placeholder, which is never
    /// looked at. Both parties must bind the same number of integers with the same widths.
    ///
    /// # Panics
    ///
    /// If `bit_width` is 0 or larger than [`MAX_BIT_WIDTH`].
    pub fn secret_int(&mut self, bit_width: usize, value: u32, owner: Role) -> SecretInt {
        assert!(
            (1..=MAX_BIT_WIDTH).contains(&bit_width),
            "unsupported bit width {bit_width}"
        );
        let bits = (0..bit_width)
            .map(|i| {
                if owner == self.role {
                    self.own_inputs.push(value >> i & 1 == 1);
                }
                self.builder.input(owner)
            })
            .collect();
        SecretInt { owner, bits }
    }

    /// Oblivious equality of two secret integers of the same width.
    ///
    /// # Panics
    ///
    /// If the widths differ, which would make the circuits of the two parties diverge.
    pub fn equals(&mut self, a: &SecretInt, b: &SecretInt) -> SecretBool {
        assert_eq!(
            a.bit_width(),
            b.bit_width(),
            "cannot compare secret integers of different widths"
        );
        self.builder.stats_mut().equalities += 1;
        let mut all_equal = Bit::Const(true);
        for (&x, &y) in a.bits.iter().zip(&b.bits) {
            let diff = self.builder.xor(x, y);
            let same = self.builder.not(diff);
            all_equal = self.builder.and(all_equal, same);
        }
        SecretBool(all_equal)
    }

    /// Oblivious conjunction.
    pub fn and(&mut self, a: SecretBool, b: SecretBool) -> SecretBool {
        if let (Bit::Wire(_), Bit::Wire(_)) = (a.0, b.0) {
            self.builder.stats_mut().ands += 1;
        }
        SecretBool(self.builder.and(a.0, b.0))
    }

    /// Oblivious disjunction.
    pub fn or(&mut self, a: SecretBool, b: SecretBool) -> SecretBool {
        if let (Bit::Wire(_), Bit::Wire(_)) = (a.0, b.0) {
            self.builder.stats_mut().ors += 1;
        }
        SecretBool(self.builder.or(a.0, b.0))
    }

    /// Reveals a secret boolean to both parties, ending the session.
    ///
    /// Public constants are returned as they are. Otherwise the recorded circuit is garbled and
    /// evaluated jointly with the other party, who must reveal at the same point.
    pub async fn reveal(self, b: SecretBool) -> Result<bool, protocol::Error> {
        let w = match b.0 {
            Bit::Const(value) => {
                debug!(role = %self.role, "revealing a public constant");
                return Ok(value);
            }
            Bit::Wire(w) => w,
        };
        let Session {
            role,
            mut channel,
            builder,
            own_inputs,
        } = self;
        let stats = builder.stats();
        debug!(
            %role,
            and_gates = stats.and_gates,
            input_wires = stats.input_wires,
            "revealing circuit output"
        );
        let circuit = builder.build(vec![w]);
        let outputs = protocol::execute(&mut channel, &circuit, &own_inputs, role).await?;
        match outputs.as_slice() {
            [value] => Ok(*value),
            _ => Err(protocol::Error::WrongInputSize {
                expected: 1,
                actual: outputs.len(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use futures::try_join;

    use super::*;
    use crate::channel::SimpleChannel;

    /// Both parties compare `a` (owned by the pattern holder) and `b` (owned by the text holder).
    async fn compare(a: u32, b: u32, width: usize) -> Result<bool, protocol::Error> {
        let (ch_a, ch_b) = SimpleChannel::channels();
        let run = |role: Role, ch: SimpleChannel, value_a: u32, value_b: u32| async move {
            let mut session = Session::new(role, ch);
            let x = session.secret_int(width, value_a, Role::PatternHolder);
            let y = session.secret_int(width, value_b, Role::TextHolder);
            let eq = session.equals(&x, &y);
            session.reveal(eq).await
        };
        let (eq_a, eq_b) = try_join!(
            run(Role::PatternHolder, ch_a, a, 0),
            run(Role::TextHolder, ch_b, 0, b)
        )?;
        assert_eq!(eq_a, eq_b);
        Ok(eq_a)
    }

    #[tokio::test]
    async fn equality_of_secret_ints() -> Result<(), protocol::Error> {
        assert!(compare(20, 20, 32).await?);
        assert!(!compare(20, 21, 32).await?);
        assert!(compare(b'H' as u32, b'H' as u32, 8).await?);
        assert!(!compare(b'H' as u32, b'h' as u32, 8).await?);
        // bits above the width are dropped
        assert!(compare(0x1ff, 0xff, 8).await?);
        Ok(())
    }

    #[tokio::test]
    async fn constants_are_revealed_locally() -> Result<(), protocol::Error> {
        let (ch, _) = SimpleChannel::channels();
        let mut session = Session::new(Role::TextHolder, ch);
        let t = SecretBool::constant(true);
        let f = SecretBool::constant(false);
        let b = session.or(f, t);
        assert_eq!(b.as_constant(), Some(true));
        assert_eq!(session.stats().ors, 0);
        assert!(session.reveal(b).await?);
        Ok(())
    }

    #[test]
    fn equality_stats() {
        let (ch, _) = SimpleChannel::channels();
        let mut session = Session::new(Role::PatternHolder, ch);
        let x = session.secret_int(8, 1, Role::PatternHolder);
        let y = session.secret_int(8, 0, Role::TextHolder);
        let eq = session.equals(&x, &y);
        assert!(eq.as_constant().is_none());
        let stats = session.stats();
        assert_eq!(stats.equalities, 1);
        assert_eq!(stats.input_wires, 16);
        assert_eq!(stats.and_gates, 7);
        assert_eq!(stats.xor_gates, 8);
        assert_eq!(
            session.own_inputs,
            vec![true, false, false, false, false, false, false, false]
        );
    }

    #[test]
    fn debug_output_hides_input_bits() {
        let (ch, _) = SimpleChannel::channels();
        let mut session = Session::new(Role::PatternHolder, ch);
        session.secret_int(8, 0xff, Role::PatternHolder);
        let debug = format!("{session:?}");
        assert!(debug.contains("<8 bits>"));
        assert!(!debug.contains("true"));
    }

    #[test]
    #[should_panic(expected = "different widths")]
    fn mismatched_widths_are_fatal() {
        let (ch, _) = SimpleChannel::channels();
        let mut session = Session::new(Role::PatternHolder, ch);
        let x = session.secret_int(8, 1, Role::PatternHolder);
        let y = session.secret_int(16, 1, Role::TextHolder);
        session.equals(&x, &y);
    }
}
