//! Private substring search between two parties, based on semi-honest garbled circuits.
//!
//! One party (the _pattern holder_) knows a pattern, the other party (the _text holder_) knows a
//! text. Together they compute whether the pattern occurs as a contiguous substring of the text.
//! Both parties learn this single bit and nothing else, apart from the lengths of pattern and text,
//! which are public and determine the shape of the circuit.
//!
//! ## Main Components
//!
//! * [`encode`]: Local encoding of the pattern and of the windows of the text into character codes.
//! * [`binder`]: Binds the character codes as secret integers of a [`session::Session`].
//! * [`matcher`]: The oblivious matching circuit over the secret integers.
//! * [`search`]: The complete search for one party, including the reveal of the result.
//! * [`protocol`]: The two-party garbled circuit protocol that evaluates the recorded circuit.
//! * [`channel`]: Communication abstractions for exchanging data between the parties.
//!
//! ## Example
//!
//! ```no_run
//! use polymatch::{channel::TcpChannel, config::SearchConfig, search::private_substring_search};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // the text holder knows its text and the length of the pattern
//! let config = SearchConfig::text_holder("HELLO", 3)?;
//! let channel = TcpChannel::connect("127.0.0.1", 8000).await?;
//! let outcome = private_substring_search(&config, channel).await?;
//! println!("Match found? {}", outcome.matched);
//! # Ok(())
//! # }
//! ```
//!
//! For tests and benchmarks, [`search::simulate_search`] runs both parties in a single process.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod binder;
pub mod channel;
pub mod circuit;
pub mod config;
mod data_types;
pub mod encode;
pub mod error;
mod garble;
pub mod matcher;
mod ot;
pub mod protocol;
pub mod search;
pub mod session;
mod utils;

pub use config::{SearchConfig, Shape};
pub use error::Error;
pub use protocol::Role;
pub use search::{MatchOutcome, private_substring_search, simulate_search};
