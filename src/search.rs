//! A complete private substring search for one party: encode, bind, match and reveal.
//!
//! Both parties call [`private_substring_search`] with their own [`SearchConfig`] over a channel
//! connecting them. Before any secret is bound the parties exchange their public [`Shape`] and
//! abort if they disagree, since their circuits would otherwise diverge.

use tracing::{debug, info};

use crate::{
    binder::{bind_pattern, bind_windows},
    channel::{Channel, MsgChannel, SimpleChannel},
    circuit::CircuitStats,
    config::{SearchConfig, Shape},
    encode::{encode_pattern, encode_windows},
    error::Error,
    matcher::find_match,
    protocol::Role,
    session::{SecretBool, Session},
};

/// The result of a search, as seen by one party.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchOutcome {
    /// Whether the pattern occurs in the text. Both parties learn the same value.
    pub matched: bool,
    /// The size of the circuit that was evaluated.
    pub stats: CircuitStats,
}

/// Reveals the match result to both parties, consuming the session.
pub async fn reveal_match<C: Channel>(
    session: Session<C>,
    result: SecretBool,
) -> Result<bool, Error> {
    Ok(session.reveal(result).await?)
}

/// Runs the search for the local party, returning once both parties know the result.
pub async fn private_substring_search<C: Channel>(
    config: &SearchConfig,
    channel: C,
) -> Result<MatchOutcome, Error> {
    let role = config.role();
    let shape = config.shape();
    info!(
        %role,
        pattern_len = shape.pattern_len,
        text_len = shape.text_len,
        bit_width = shape.bit_width,
        "starting private substring search"
    );
    let mut session = Session::new(role, channel);
    exchange_shape(&mut session, &shape).await?;

    let (pattern, windows) = match role {
        Role::PatternHolder => (Some(encode_pattern(config.input())), None),
        Role::TextHolder => (None, Some(encode_windows(config.input(), shape.pattern_len))),
    };
    let pattern = bind_pattern(&mut session, pattern.as_deref(), &shape)?;
    let windows = bind_windows(&mut session, windows.as_deref(), &shape)?;
    let result = find_match(&mut session, &pattern, &windows);
    let stats = session.stats();
    debug!(
        equalities = stats.equalities,
        ands = stats.ands,
        ors = stats.ors,
        and_gates = stats.and_gates,
        "built matching circuit"
    );

    let matched = reveal_match(session, result).await?;
    info!(%role, matched, "private substring search finished");
    Ok(MatchOutcome { matched, stats })
}

/// Runs the search for both parties locally, over in-memory channels.
pub async fn simulate_search(pattern: &str, text: &str) -> Result<MatchOutcome, Error> {
    let pattern_holder = SearchConfig::pattern_holder(pattern, text.len())?;
    let text_holder = SearchConfig::text_holder(text, pattern.len())?;
    let (ch_pattern, ch_text) = SimpleChannel::channels();
    let (outcome, peer_outcome) = futures::try_join!(
        private_substring_search(&pattern_holder, ch_pattern),
        private_substring_search(&text_holder, ch_text),
    )?;
    debug_assert_eq!(outcome, peer_outcome);
    Ok(outcome)
}

async fn exchange_shape<C: Channel>(session: &mut Session<C>, ours: &Shape) -> Result<(), Error> {
    let mut channel = MsgChannel(session.channel_mut());
    channel.send("shape", ours).await?;
    let theirs: Shape = channel.recv("shape").await?;
    if theirs != *ours {
        return Err(Error::PeerShapeMismatch {
            ours: *ours,
            theirs,
        });
    }
    Ok(())
}
