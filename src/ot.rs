//! Implementation of the Chou-Orlandi oblivious transfer protocol (cf.
//! <https://eprint.iacr.org/2015/267>), used by the evaluator to obtain the labels of its own
//! input wires without revealing its input bits to the garbler.
//!
//! This implementation uses the Ristretto prime order group from `curve25519-dalek` and transfers
//! 128-bit wire labels. The index of each transfer is hashed into the key derivation, otherwise
//! all transfers of a batch would share the same keys.

use curve25519_dalek::{
    constants::RISTRETTO_BASEPOINT_TABLE,
    ristretto::{CompressedRistretto, RistrettoPoint},
    scalar::Scalar,
};
use thiserror::Error;
use tracing::debug;

use crate::{
    channel::{self, Channel, MsgChannel},
    data_types::Label,
    utils::RngCompat,
};

/// Errors occurring during an oblivious transfer.
#[derive(Debug, Error)]
pub enum Error {
    /// A message could not be sent or received.
    #[error(transparent)]
    Channel(#[from] channel::Error),
    /// The other party sent bytes that are not a valid Ristretto point.
    #[error("received an invalid group element")]
    InvalidPoint,
}

fn hash_pt(tweak: u128, pt: &RistrettoPoint) -> Label {
    let mut tweak_key = [0; 32];
    tweak_key[..16].copy_from_slice(&tweak.to_le_bytes());
    let h = blake3::keyed_hash(&tweak_key, pt.compress().as_bytes());
    let mut bytes = [0; 16];
    bytes.copy_from_slice(&h.as_bytes()[..16]);
    Label(u128::from_le_bytes(bytes))
}

fn decompress(bytes: &[u8; 32]) -> Result<RistrettoPoint, Error> {
    CompressedRistretto(*bytes)
        .decompress()
        .ok_or(Error::InvalidPoint)
}

fn random_scalar() -> Scalar {
    Scalar::random(&mut RngCompat(rand::rng()))
}

/// Oblivious transfer sender.
pub(crate) struct Sender {
    y: Scalar,
    s: RistrettoPoint,
    counter: u128,
}

impl Sender {
    /// Sends the sender's public key to the receiver.
    pub(crate) async fn init<C: Channel>(channel: &mut MsgChannel<'_, C>) -> Result<Self, Error> {
        let y = random_scalar();
        let s = &y * RISTRETTO_BASEPOINT_TABLE;
        channel.send("OT public key", &s.compress().to_bytes()).await?;
        Ok(Self { y, s, counter: 0 })
    }

    /// Transfers one label of every pair, chosen by the receiver.
    pub(crate) async fn send<C: Channel>(
        &mut self,
        channel: &mut MsgChannel<'_, C>,
        inputs: &[(Label, Label)],
    ) -> Result<(), Error> {
        let ys = self.y * self.s;
        let rs: Vec<[u8; 32]> = channel.recv_vec("OT choices", inputs.len()).await?;
        let mut ciphertexts = Vec::with_capacity(inputs.len());
        for (i, (r, (m0, m1))) in rs.iter().zip(inputs).enumerate() {
            let yr = self.y * decompress(r)?;
            let tweak = self.counter + i as u128;
            let k0 = hash_pt(tweak, &yr);
            let k1 = hash_pt(tweak, &(yr - ys));
            ciphertexts.push((k0 ^ *m0, k1 ^ *m1));
        }
        self.counter += inputs.len() as u128;
        channel.send("OT ciphertexts", &ciphertexts).await?;
        debug!(transfers = inputs.len(), "OT sender done");
        Ok(())
    }
}

/// Oblivious transfer receiver.
pub(crate) struct Receiver {
    s: RistrettoPoint,
    counter: u128,
}

impl Receiver {
    /// Receives the sender's public key.
    pub(crate) async fn init<C: Channel>(channel: &mut MsgChannel<'_, C>) -> Result<Self, Error> {
        let s: [u8; 32] = channel.recv("OT public key").await?;
        let s = decompress(&s)?;
        Ok(Self { s, counter: 0 })
    }

    /// Obtains the labels selected by `choices`, learning nothing about the other labels.
    pub(crate) async fn receive<C: Channel>(
        &mut self,
        channel: &mut MsgChannel<'_, C>,
        choices: &[bool],
    ) -> Result<Vec<Label>, Error> {
        let mut keys = Vec::with_capacity(choices.len());
        let mut rs = Vec::with_capacity(choices.len());
        for (i, b) in choices.iter().enumerate() {
            let x = random_scalar();
            let xg = &x * RISTRETTO_BASEPOINT_TABLE;
            let r = if *b { self.s + xg } else { xg };
            rs.push(r.compress().to_bytes());
            keys.push(hash_pt(self.counter + i as u128, &(x * self.s)));
        }
        channel.send("OT choices", &rs).await?;
        self.counter += choices.len() as u128;

        let ciphertexts: Vec<(Label, Label)> =
            channel.recv_vec("OT ciphertexts", choices.len()).await?;
        let labels = choices
            .iter()
            .zip(keys)
            .zip(ciphertexts)
            .map(|((b, k), (c0, c1))| k ^ if *b { c1 } else { c0 })
            .collect();
        debug!(transfers = choices.len(), "OT receiver done");
        Ok(labels)
    }
}

#[cfg(test)]
mod tests {
    use futures::try_join;

    use super::*;
    use crate::channel::SimpleChannel;

    #[tokio::test]
    async fn receiver_gets_chosen_labels() -> Result<(), Error> {
        let (mut a, mut b) = SimpleChannel::channels();
        let pairs: Vec<(Label, Label)> = (0..20)
            .map(|_| (Label::random(), Label::random()))
            .collect();
        let choices: Vec<bool> = (0..20).map(|i| i % 3 == 0).collect();

        let sender = async {
            let mut ch = MsgChannel(&mut a);
            let mut sender = Sender::init(&mut ch).await?;
            sender.send(&mut ch, &pairs).await?;
            sender.send(&mut ch, &pairs[..2]).await
        };
        let receiver = async {
            let mut ch = MsgChannel(&mut b);
            let mut receiver = Receiver::init(&mut ch).await?;
            let first = receiver.receive(&mut ch, &choices).await?;
            let second = receiver.receive(&mut ch, &[true, false]).await?;
            Ok::<_, Error>((first, second))
        };
        let ((), (first, second)) = try_join!(sender, receiver)?;

        for ((label, b), (m0, m1)) in first.iter().zip(&choices).zip(&pairs) {
            assert_eq!(label, if *b { m1 } else { m0 });
        }
        assert_eq!(second, vec![pairs[0].1, pairs[1].0]);
        Ok(())
    }

    #[tokio::test]
    async fn invalid_point_is_rejected() {
        let (mut a, mut b) = SimpleChannel::channels();
        MsgChannel(&mut a)
            .send("OT public key", &[0xffu8; 32])
            .await
            .unwrap();
        let result = Receiver::init(&mut MsgChannel(&mut b)).await;
        assert!(matches!(result, Err(Error::InvalidPoint)));
    }
}
