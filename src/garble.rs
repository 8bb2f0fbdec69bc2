//! The cryptographic building blocks used to garble (= encrypt/decrypt) gate tables.

use blake3::Hasher;
use chacha20poly1305::{
    ChaCha20Poly1305, Key, Nonce,
    aead::{Aead, KeyInit},
};
use thiserror::Error;

use crate::data_types::Label;

/// Errors raised while encrypting or decrypting a row of a garbled gate.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// The row could not be (de-)serialized.
    #[error("could not (de-)serialize garbled row: {0}")]
    Serde(String),
    /// The row could not be encrypted.
    #[error("could not encrypt garbled row")]
    EncryptionFailed,
    /// The row could not be decrypted with the labels held by the evaluator.
    #[error("could not decrypt garbled row")]
    DecryptionFailed,
}

/// The key of a single row: both input labels, the gate and the row index.
#[derive(Debug)]
pub(crate) struct GarblingKey {
    label_x: Label,
    label_y: Label,
    w: usize,
    row: u8,
}

impl GarblingKey {
    pub(crate) fn new(label_x: Label, label_y: Label, w: usize, row: u8) -> Self {
        Self {
            label_x,
            label_y,
            w,
            row,
        }
    }
}

/// Derive a key from the garbling key components using BLAKE3 for key commitment.
fn derive_commitment_key(key: &Key, nonce: &Nonce) -> Key {
    let mut hasher = Hasher::new();
    hasher.update(key);
    hasher.update(nonce);
    let derived_key = hasher.finalize();
    Key::from_slice(&derived_key.as_bytes()[..32]).to_owned()
}

/// Encrypt the output label of a gate table row using ChaCha20Poly1305.
pub(crate) fn encrypt(garbling_key: &GarblingKey, label: Label) -> Result<Vec<u8>, Error> {
    let (key, nonce) = key_and_nonce(garbling_key);
    let cipher = ChaCha20Poly1305::new(&derive_commitment_key(&key, &nonce));
    let bytes = bincode::serialize(&label).map_err(|e| Error::Serde(format!("{e:?}")))?;
    cipher
        .encrypt(&nonce, bytes.as_ref())
        .map_err(|_| Error::EncryptionFailed)
}

/// Decrypt the output label of a gate table row using ChaCha20Poly1305.
pub(crate) fn decrypt(garbling_key: &GarblingKey, bytes: &[u8]) -> Result<Label, Error> {
    let (key, nonce) = key_and_nonce(garbling_key);
    let cipher = ChaCha20Poly1305::new(&derive_commitment_key(&key, &nonce));
    let plaintext = cipher
        .decrypt(&nonce, bytes)
        .map_err(|_| Error::DecryptionFailed)?;
    bincode::deserialize(&plaintext).map_err(|e| Error::Serde(format!("{e:?}")))
}

/// Extract key and nonce from a garbling key.
fn key_and_nonce(
    GarblingKey {
        label_x,
        label_y,
        w,
        row,
    }: &GarblingKey,
) -> (Key, Nonce) {
    let mut key = [0; 32];
    key[..16].copy_from_slice(&label_x.0.to_be_bytes());
    key[16..].copy_from_slice(&label_y.0.to_be_bytes());
    let mut nonce = [0; 12];
    nonce[..8].copy_from_slice(&(*w as u64).to_be_bytes());
    nonce[8] = *row;
    (key.into(), nonce.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_decrypt() {
        let key = GarblingKey::new(Label::random(), Label::random(), 17, 2);
        let label = Label::random();
        let encrypted = encrypt(&key, label).unwrap();
        assert_eq!(decrypt(&key, &encrypted).unwrap(), label);
    }

    #[test]
    fn wrong_key_is_rejected() {
        let (x, y) = (Label::random(), Label::random());
        let encrypted = encrypt(&GarblingKey::new(x, y, 3, 0), Label::random()).unwrap();
        let other_row = GarblingKey::new(x, y, 3, 1);
        let other_gate = GarblingKey::new(x, y, 4, 0);
        let other_label = GarblingKey::new(Label::random(), y, 3, 0);
        for key in [other_row, other_gate, other_label] {
            assert!(matches!(
                decrypt(&key, &encrypted),
                Err(Error::DecryptionFailed)
            ));
        }
    }
}
