//! Semi-honest secure 2-party computation of boolean circuits using Yao's garbled circuits.
//!
//! The pattern holder acts as the garbler, the text holder as the evaluator:
//!
//! 1. Garbling: the garbler assigns a random label to the 0-value of every input and AND wire
//!    (free-XOR with a global offset, point-and-permute via the lowest label bit) and encrypts the
//!    four rows of every AND gate under the labels of its inputs.
//! 2. Input processing: the garbler sends the labels of its own inputs, the evaluator obtains the
//!    labels of its inputs through Chou-Orlandi oblivious transfer.
//! 3. Evaluation: the evaluator decrypts exactly one row of every AND gate.
//! 4. Output determination: the evaluator returns the output labels, the garbler decodes them and
//!    sends the plain output bits back, so that both parties learn the same outputs.
//!
//! Both parties call [`execute`] with the same circuit, only their inputs differ.
use std::fmt;

use futures::try_join;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use tracing::{Level, debug, instrument};

use crate::{
    channel::{self, Channel, MsgChannel, SimpleChannel},
    circuit::{Circuit, CircuitError, Wire},
    data_types::{Delta, GarbledGate, Label},
    garble::{self, GarblingKey, decrypt, encrypt},
    ot,
};

/// The role played by a particular party in the protocol execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// The first party: holds the pattern and garbles the circuit.
    PatternHolder,
    /// The second party: holds the text and evaluates the garbled circuit.
    TextHolder,
}

impl Role {
    /// The role of the party with the given number: `1` holds the pattern, `2` holds the text.
    pub fn from_party_id(party_id: u8) -> Option<Self> {
        match party_id {
            1 => Some(Role::PatternHolder),
            2 => Some(Role::TextHolder),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::PatternHolder => f.write_str("pattern holder"),
            Role::TextHolder => f.write_str("text holder"),
        }
    }
}

/// A custom error type for 2PC computation and communication.
#[derive(Debug)]
pub enum Error {
    /// A message could not be sent or received.
    ChannelError(channel::Error),
    /// The specified circuit is invalid (e.g. cyclic / contains invalid wirings).
    CircuitError(CircuitError),
    /// A table row could not be encrypted or decrypted.
    GarblingError(garble::Error),
    /// The oblivious transfer of the evaluator's input labels failed.
    OtError(ot::Error),
    /// Caused by the core 2PC protocol computation.
    MpcError(MpcError),
    /// The number of provided input bits does not match the inputs expected in the circuit.
    WrongInputSize {
        /// The number of input bits specified in the circuit.
        expected: usize,
        /// The number of input bits provided by the user.
        actual: usize,
    },
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ChannelError(e) => write!(f, "Channel error: {e}"),
            Error::CircuitError(e) => write!(f, "Circuit error: {e}"),
            Error::GarblingError(e) => write!(f, "Garbling error: {e}"),
            Error::OtError(e) => write!(f, "Oblivious transfer error: {e}"),
            Error::MpcError(e) => write!(f, "2PC error: {e:?}"),
            Error::WrongInputSize { expected, actual } => {
                write!(f, "Wrong input, expected {expected} bits, found {actual}")
            }
        }
    }
}

impl From<channel::Error> for Error {
    fn from(e: channel::Error) -> Self {
        Self::ChannelError(e)
    }
}

impl From<CircuitError> for Error {
    fn from(e: CircuitError) -> Self {
        Self::CircuitError(e)
    }
}

impl From<garble::Error> for Error {
    fn from(e: garble::Error) -> Self {
        Self::GarblingError(e)
    }
}

impl From<ot::Error> for Error {
    fn from(e: ot::Error) -> Self {
        Self::OtError(e)
    }
}

/// A violation of the protocol by the other party (or a corrupted message).
#[derive(Debug)]
pub enum MpcError {
    /// The evaluator returned a label that is neither the 0- nor the 1-label of an output wire.
    InvalidOutputLabel(usize),
    /// No label is available for the specified input wire.
    MissingInputLabel(usize),
}

impl From<MpcError> for Error {
    fn from(e: MpcError) -> Self {
        Self::MpcError(e)
    }
}

/// Runs both parties of the protocol in-process, connected by a [`SimpleChannel`].
pub async fn simulate(
    circuit: &Circuit,
    pattern_holder_inputs: &[bool],
    text_holder_inputs: &[bool],
) -> Result<Vec<bool>, Error> {
    let (mut garbler, mut evaluator) = SimpleChannel::channels();
    let (garbler_out, evaluator_out) = try_join!(
        execute(
            &mut garbler,
            circuit,
            pattern_holder_inputs,
            Role::PatternHolder
        ),
        execute(
            &mut evaluator,
            circuit,
            text_holder_inputs,
            Role::TextHolder
        ),
    )?;
    debug_assert_eq!(garbler_out, evaluator_out);
    Ok(evaluator_out)
}

/// Executes the protocol for one party and returns the outputs of the circuit.
///
/// `inputs` are the bits of the input wires owned by `role`, in wire order.
#[instrument(level = Level::DEBUG, skip_all, fields(%role), err)]
pub async fn execute<C: Channel>(
    channel: &mut C,
    circuit: &Circuit,
    inputs: &[bool],
    role: Role,
) -> Result<Vec<bool>, Error> {
    circuit.validate()?;
    let expected = circuit.inputs_of(role);
    if expected != inputs.len() {
        return Err(Error::WrongInputSize {
            expected,
            actual: inputs.len(),
        });
    }
    let mut channel = MsgChannel(channel);
    match role {
        Role::PatternHolder => garble_circuit(&mut channel, circuit, inputs).await,
        Role::TextHolder => evaluate_circuit(&mut channel, circuit, inputs).await,
    }
}

async fn garble_circuit<C: Channel>(
    channel: &mut MsgChannel<'_, C>,
    circuit: &Circuit,
    inputs: &[bool],
) -> Result<Vec<bool>, Error> {
    let delta = Delta::random();

    // garbling:

    let mut labels = Vec::with_capacity(circuit.wires.len());
    let mut garbled_gates = Vec::with_capacity(circuit.and_gates());
    for (w, wire) in circuit.wires.iter().enumerate() {
        let label = match *wire {
            Wire::Input(_) => Label::random(),
            Wire::Not(x) => labels[x] ^ delta,
            Wire::Xor(x, y) => labels[x] ^ labels[y],
            Wire::And(x, y) => {
                let (label_x_0, label_y_0): (Label, Label) = (labels[x], labels[y]);
                let label_0 = Label::random();
                let mut rows: [Vec<u8>; 4] = Default::default();
                for color_x in [false, true] {
                    for color_y in [false, true] {
                        let value_x = color_x ^ label_x_0.color();
                        let value_y = color_y ^ label_y_0.color();
                        let row = 2 * color_x as u8 + color_y as u8;
                        let key = GarblingKey::new(
                            label_x_0 ^ (value_x & delta),
                            label_y_0 ^ (value_y & delta),
                            w,
                            row,
                        );
                        rows[row as usize] = encrypt(&key, label_0 ^ ((value_x & value_y) & delta))?;
                    }
                }
                garbled_gates.push(GarbledGate(rows));
                label_0
            }
        };
        labels.push(label);
    }
    debug!(and_gates = garbled_gates.len(), "garbled circuit");
    channel.send("garbled gates", &garbled_gates).await?;

    // input processing:

    let mut own_inputs = inputs.iter();
    let mut own_labels = vec![];
    let mut evaluator_labels = vec![];
    for (w, wire) in circuit.wires.iter().enumerate() {
        match wire {
            Wire::Input(Role::PatternHolder) => {
                let Some(&input) = own_inputs.next() else {
                    return Err(MpcError::MissingInputLabel(w).into());
                };
                own_labels.push(labels[w] ^ (input & delta));
            }
            Wire::Input(Role::TextHolder) => evaluator_labels.push((labels[w], labels[w] ^ delta)),
            _ => {}
        }
    }
    channel.send("garbler input labels", &own_labels).await?;
    let mut ot = ot::Sender::init(channel).await?;
    ot.send(channel, &evaluator_labels).await?;

    // output determination:

    let output_labels: Vec<Label> = channel
        .recv_vec("output labels", circuit.outputs.len())
        .await?;
    let mut outputs = Vec::with_capacity(circuit.outputs.len());
    for (&w, label) in circuit.outputs.iter().zip(output_labels) {
        if bool::from(label.ct_eq(&labels[w])) {
            outputs.push(false);
        } else if bool::from(label.ct_eq(&(labels[w] ^ delta))) {
            outputs.push(true);
        } else {
            return Err(MpcError::InvalidOutputLabel(w).into());
        }
    }
    channel.send("outputs", &outputs).await?;
    Ok(outputs)
}

async fn evaluate_circuit<C: Channel>(
    channel: &mut MsgChannel<'_, C>,
    circuit: &Circuit,
    inputs: &[bool],
) -> Result<Vec<bool>, Error> {
    let garbled_gates: Vec<GarbledGate> = channel
        .recv_vec("garbled gates", circuit.and_gates())
        .await?;
    let garbler_labels: Vec<Label> = channel
        .recv_vec(
            "garbler input labels",
            circuit.inputs_of(Role::PatternHolder),
        )
        .await?;
    let mut ot = ot::Receiver::init(channel).await?;
    let own_labels = ot.receive(channel, inputs).await?;

    // circuit evaluation:

    let mut garbler_labels = garbler_labels.into_iter();
    let mut own_labels = own_labels.into_iter();
    let mut garbled_gates = garbled_gates.into_iter();
    let mut labels: Vec<Label> = Vec::with_capacity(circuit.wires.len());
    for (w, wire) in circuit.wires.iter().enumerate() {
        let label = match *wire {
            Wire::Input(Role::PatternHolder) => garbler_labels
                .next()
                .ok_or(MpcError::MissingInputLabel(w))?,
            Wire::Input(Role::TextHolder) => {
                own_labels.next().ok_or(MpcError::MissingInputLabel(w))?
            }
            Wire::Not(x) => labels[x],
            Wire::Xor(x, y) => labels[x] ^ labels[y],
            Wire::And(x, y) => {
                let (label_x, label_y) = (labels[x], labels[y]);
                let row = 2 * label_x.color() as u8 + label_y.color() as u8;
                let Some(GarbledGate(rows)) = garbled_gates.next() else {
                    return Err(garble::Error::DecryptionFailed.into());
                };
                let key = GarblingKey::new(label_x, label_y, w, row);
                decrypt(&key, &rows[row as usize])?
            }
        };
        labels.push(label);
    }
    debug!(wires = labels.len(), "evaluated circuit");

    // output determination:

    let output_labels: Vec<Label> = circuit.outputs.iter().map(|&w| labels[w]).collect();
    channel.send("output labels", &output_labels).await?;
    let outputs = channel.recv_vec("outputs", circuit.outputs.len()).await?;
    Ok(outputs)
}
