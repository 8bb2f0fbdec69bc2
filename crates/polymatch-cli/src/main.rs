use std::{fmt, time::Duration};

use anyhow::{Context, Error, bail};
use clap::Parser;
use polymatch::{
    Role, SearchConfig,
    channel::TcpChannel,
    config::DEFAULT_BIT_WIDTH,
    encode::{encode_pattern, encode_windows},
    private_substring_search,
};
use tokio::time::sleep;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

const CONNECT_ATTEMPTS: usize = 30;

/// Checks whether a pattern occurs in a text, where one party knows the pattern and the other
/// party knows the text, without revealing anything else.
#[derive(Parser)]
#[command(name = "polymatch")]
struct Cli {
    /// The party to run as: 1 holds the pattern and listens, 2 holds the text and connects.
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=2))]
    party_id: u8,
    /// The port that party 1 listens on and party 2 connects to.
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
    port: u16,
    /// The address of party 1 (only used by party 2).
    #[arg(long, default_value = "127.0.0.1")]
    address: String,
    /// The secret pattern (party 1).
    #[arg(long)]
    pattern: Option<String>,
    /// The secret text (party 2).
    #[arg(long)]
    text: Option<String>,
    /// The public length of the pattern (required for party 2).
    #[arg(long)]
    pattern_length: Option<usize>,
    /// The public length of the text (required for party 1).
    #[arg(long)]
    text_length: Option<usize>,
    /// The number of bits of every character code.
    #[arg(long, default_value_t = DEFAULT_BIT_WIDTH)]
    bit_width: usize,
    /// Prints the encoding of the local input before the search starts.
    #[arg(long)]
    show_encoding: bool,
}

impl fmt::Debug for Cli {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redacted = |input: &Option<String>| {
            input.as_ref().map(|input| format!("<{} bytes>", input.len()))
        };
        f.debug_struct("Cli")
            .field("party_id", &self.party_id)
            .field("port", &self.port)
            .field("address", &self.address)
            .field("pattern", &redacted(&self.pattern))
            .field("text", &redacted(&self.text))
            .field("pattern_length", &self.pattern_length)
            .field("text_length", &self.text_length)
            .field("bit_width", &self.bit_width)
            .field("show_encoding", &self.show_encoding)
            .finish()
    }
}

impl Cli {
    /// Builds the configuration of the local party, ignoring the input of the other party.
    fn config(&self) -> Result<SearchConfig, Error> {
        let Some(role) = Role::from_party_id(self.party_id) else {
            bail!("the party id must be 1 or 2, got {}", self.party_id);
        };
        let config = match role {
            Role::PatternHolder => {
                if self.text.is_some() {
                    warn!("party 1 holds the pattern, ignoring --text");
                }
                let Some(pattern) = self.pattern.clone() else {
                    bail!("party 1 must provide --pattern");
                };
                let Some(text_len) = self.text_length else {
                    bail!("party 1 must provide --text-length");
                };
                let pattern_len = self.pattern_length.unwrap_or(pattern.len());
                SearchConfig::new(role, pattern_len, text_len, Some(pattern))?
            }
            Role::TextHolder => {
                if self.pattern.is_some() {
                    warn!("party 2 holds the text, ignoring --pattern");
                }
                let Some(text) = self.text.clone() else {
                    bail!("party 2 must provide --text");
                };
                let Some(pattern_len) = self.pattern_length else {
                    bail!("party 2 must provide --pattern-length");
                };
                let text_len = self.text_length.unwrap_or(text.len());
                SearchConfig::new(role, pattern_len, text_len, Some(text))?
            }
        };
        Ok(config.with_bit_width(self.bit_width)?)
    }
}

fn print_encoding(config: &SearchConfig) {
    match config.role() {
        Role::PatternHolder => {
            println!("Pattern codes: {:?}", encode_pattern(config.input()));
        }
        Role::TextHolder => {
            let windows = encode_windows(config.input(), config.shape().pattern_len);
            if windows.is_empty() {
                println!("The text is shorter than the pattern, there are no windows");
            }
            for (i, window) in windows.iter().enumerate() {
                println!("Window {i}: {window:?}");
            }
        }
    }
}

async fn connect(address: &str, port: u16) -> Result<TcpChannel, Error> {
    for attempt in 1..CONNECT_ATTEMPTS {
        match TcpChannel::connect(address, port).await {
            Ok(channel) => return Ok(channel),
            Err(e) => {
                debug!(attempt, "could not connect to party 1: {e}");
                sleep(Duration::from_secs(1)).await;
            }
        }
    }
    TcpChannel::connect(address, port)
        .await
        .with_context(|| format!("could not connect to party 1 at {address}:{port}"))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let cli = Cli::parse();
    let config = cli.config()?;
    if cli.show_encoding {
        print_encoding(&config);
    }
    let channel = match config.role() {
        Role::PatternHolder => TcpChannel::listen(cli.port)
            .await
            .with_context(|| format!("could not listen on port {}", cli.port))?,
        Role::TextHolder => connect(&cli.address, cli.port).await?,
    };
    let outcome = private_substring_search(&config, channel).await?;
    println!("Match found? {}", outcome.matched);
    println!("AND gates: {}", outcome.stats.and_gates);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("polymatch").chain(args.iter().copied()))
    }

    #[test]
    fn pattern_holder_config() -> Result<(), Error> {
        let cli = parse(&[
            "--party-id",
            "1",
            "--port",
            "8000",
            "--pattern",
            "HEL",
            "--text-length",
            "5",
        ])?;
        let config = cli.config()?;
        assert_eq!(config.role(), Role::PatternHolder);
        assert_eq!(config.shape().pattern_len, 3);
        assert_eq!(config.shape().text_len, 5);
        assert_eq!(config.shape().bit_width, 8);
        assert_eq!(cli.address, "127.0.0.1");
        Ok(())
    }

    #[test]
    fn text_holder_ignores_the_pattern() -> Result<(), Error> {
        let cli = parse(&[
            "--party-id",
            "2",
            "--port",
            "8000",
            "--text",
            "HELLO",
            "--pattern",
            "HEL",
            "--pattern-length",
            "3",
            "--bit-width",
            "16",
        ])?;
        let config = cli.config()?;
        assert_eq!(config.role(), Role::TextHolder);
        assert_eq!(config.input(), "HELLO");
        assert_eq!(config.shape().bit_width, 16);
        Ok(())
    }

    #[test]
    fn debug_output_hides_the_inputs() -> Result<(), Error> {
        let cli = parse(&[
            "--party-id",
            "1",
            "--port",
            "8000",
            "--pattern",
            "SECRET",
            "--text",
            "CLASSIFIED",
            "--text-length",
            "12",
        ])?;
        let debug = format!("{cli:?}");
        assert!(!debug.contains("SECRET"));
        assert!(!debug.contains("CLASSIFIED"));
        assert!(debug.contains("<6 bytes>"));
        Ok(())
    }

    #[test]
    fn rejects_invalid_arguments() -> Result<(), Error> {
        assert!(parse(&["--party-id", "3", "--port", "8000"]).is_err());
        assert!(parse(&["--party-id", "1", "--port", "0"]).is_err());
        assert!(parse(&["--party-id", "1", "--port", "65536"]).is_err());

        let cli = parse(&["--party-id", "1", "--port", "8000", "--pattern", "HEL"])?;
        assert!(cli.config().is_err());
        let cli = parse(&["--party-id", "2", "--port", "8000", "--text", "HELLO"])?;
        assert!(cli.config().is_err());
        let cli = parse(&[
            "--party-id",
            "2",
            "--port",
            "8000",
            "--text",
            "HELLO",
            "--pattern-length",
            "0",
        ])?;
        assert!(cli.config().is_err());
        let cli = parse(&[
            "--party-id",
            "1",
            "--port",
            "8000",
            "--pattern",
            "HEL",
            "--text-length",
            "5",
            "--bit-width",
            "4",
        ])?;
        assert!(cli.config().is_err());
        Ok(())
    }
}
