//! Binding of local character codes as secret integers: the point where the plaintext of a party
//! enters the joint computation.
//!
//! Both parties bind the pattern and the windows with the same counts and widths. The owner of a
//! value supplies its codes, the other party supplies `None` and placeholders are bound instead,
//! so that both sides record identical circuits.

use crate::{
    channel::Channel,
    config::{ConfigError, Shape},
    encode::CharCode,
    error::Error,
    protocol::Role,
    session::{SecretInt, Session},
};

/// Binds the `m` codes of the pattern, owned by the pattern holder.
pub fn bind_pattern<C: Channel>(
    session: &mut Session<C>,
    codes: Option<&[CharCode]>,
    shape: &Shape,
) -> Result<Vec<SecretInt>, Error> {
    let owner = Role::PatternHolder;
    let codes = local_values(session.role(), owner, codes)?;
    if let Some(codes) = codes {
        check_len("pattern codes", shape.pattern_len, codes.len())?;
    }
    let pattern = (0..shape.pattern_len)
        .map(|j| {
            let code = codes.map_or(0, |codes| codes[j]);
            session.secret_int(shape.bit_width, code.into(), owner)
        })
        .collect();
    Ok(pattern)
}

/// Binds the `n - m + 1` windows of `m` codes each, owned by the text holder.
pub fn bind_windows<C: Channel>(
    session: &mut Session<C>,
    windows: Option<&[Vec<CharCode>]>,
    shape: &Shape,
) -> Result<Vec<Vec<SecretInt>>, Error> {
    let owner = Role::TextHolder;
    let windows = local_values(session.role(), owner, windows)?;
    if let Some(windows) = windows {
        check_len("windows", shape.windows(), windows.len())?;
        for window in windows {
            check_len("window codes", shape.pattern_len, window.len())?;
        }
    }
    let matrix = (0..shape.windows())
        .map(|i| {
            (0..shape.pattern_len)
                .map(|j| {
                    let code = windows.map_or(0, |windows| windows[i][j]);
                    session.secret_int(shape.bit_width, code.into(), owner)
                })
                .collect()
        })
        .collect();
    Ok(matrix)
}

/// Checks that exactly the owner supplies values.
fn local_values<T: ?Sized>(
    role: Role,
    owner: Role,
    values: Option<&T>,
) -> Result<Option<&T>, Error> {
    match (role == owner, values) {
        (true, Some(values)) => Ok(Some(values)),
        (true, None) => Err(ConfigError::MissingInput(role).into()),
        (false, Some(_)) => Err(Error::NotOwner { role, owner }),
        (false, None) => Ok(None),
    }
}

fn check_len(what: &'static str, expected: usize, actual: usize) -> Result<(), Error> {
    if expected == actual {
        Ok(())
    } else {
        Err(Error::ShapeMismatch {
            what,
            expected,
            actual,
        })
    }
}
