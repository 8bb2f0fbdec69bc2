//! The oblivious matching circuit.
//!
//! A window matches if all of its characters equal the pattern at the same position; the pattern
//! occurs in the text if any window matches. This is the naive `O(n·m)` substring search, but as a
//! straight-line circuit whose shape only depends on the public lengths:
//!
//! - `(n - m + 1) · m` equality comparisons,
//! - `(n - m + 1) · (m - 1)` conjunctions,
//! - `n - m` disjunctions.
//!
//! The identities `true` (for the conjunction) and `false` (for the disjunction) are public
//! constants and are folded away, so they cost nothing.

use crate::{
    channel::Channel,
    session::{SecretBool, SecretInt, Session},
};

/// Computes whether any window equals the pattern, without learning anything.
///
/// # Panics
///
/// If a window does not have the same length as the pattern.
pub fn find_match<C: Channel>(
    session: &mut Session<C>,
    pattern: &[SecretInt],
    windows: &[Vec<SecretInt>],
) -> SecretBool {
    let mut any_match = SecretBool::constant(false);
    for window in windows {
        assert_eq!(
            window.len(),
            pattern.len(),
            "windows must have the length of the pattern"
        );
        let mut all_match = SecretBool::constant(true);
        for (p, t) in pattern.iter().zip(window) {
            let eq = session.equals(p, t);
            all_match = session.and(all_match, eq);
        }
        any_match = session.or(any_match, all_match);
    }
    any_match
}
