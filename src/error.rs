//! Errors of a private substring search. Every error aborts the run: there is no partial result.

use thiserror::Error;

use crate::{
    channel,
    config::{ConfigError, Shape},
    protocol::{self, Role},
};

/// The error type of a private substring search.
#[derive(Debug, Error)]
pub enum Error {
    /// The local configuration is invalid.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    /// The supplied codes do not have the agreed shape.
    #[error("expected {expected} {what}, but {actual} were supplied")]
    ShapeMismatch {
        /// What was counted.
        what: &'static str,
        /// The count implied by the agreed shape.
        expected: usize,
        /// The count that was supplied.
        actual: usize,
    },
    /// A party tried to supply values that are owned by the other party.
    #[error("the {role} cannot supply the inputs of the {owner}")]
    NotOwner {
        /// The local party.
        role: Role,
        /// The owner of the inputs.
        owner: Role,
    },
    /// The other party announced a different shape, so the circuits would diverge.
    #[error("the other party expects {theirs:?}, but this party expects {ours:?}")]
    PeerShapeMismatch {
        /// The local shape.
        ours: Shape,
        /// The shape announced by the other party.
        theirs: Shape,
    },
    /// The shapes could not be exchanged.
    #[error(transparent)]
    Channel(#[from] channel::Error),
    /// The garbling protocol failed.
    #[error(transparent)]
    Protocol(#[from] protocol::Error),
}
