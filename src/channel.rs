//! A communication channel used to send/receive messages to/from the other party.

use std::{fmt, future::Future, io, time::Duration};

use serde::{Serialize, de::DeserializeOwned};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    sync::mpsc::{Receiver, Sender, channel, error::SendError},
    time::timeout,
};
use tracing::{debug, info};

/// How long a party waits for a message of the other party before giving up.
const RECV_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// The largest message a [`TcpChannel`] sends or accepts.
pub const MAX_FRAME_LEN: usize = 256 * 1024 * 1024;

/// Errors related to sending / receiving / (de-)serializing messages.
#[derive(Debug)]
pub struct Error {
    /// The protocol phase during which the error occurred.
    pub phase: String,
    /// The specific error that was raised.
    pub reason: ErrorKind,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "channel error during '{}': {:?}", self.phase, self.reason)
    }
}

impl std::error::Error for Error {}

/// The specific error that occurred when trying to send / receive a message.
#[derive(Debug)]
pub enum ErrorKind {
    /// The (serialized) message could not be received over the channel.
    RecvError(String),
    /// The (serialized) message could not be sent over the channel.
    SendError(String),
    /// The message could not be serialized (before sending it out).
    SerdeError(String),
    /// The message is a Vec, but not of the expected length.
    InvalidLength {
        /// The length the receiving party expected.
        expected: usize,
        /// The length that was actually received.
        actual: usize,
    },
}

/// A communication channel used to send/receive messages to/from the other party.
///
/// The protocol is strictly two-party, so a channel always talks to exactly one peer.
pub trait Channel {
    /// The error that can occur sending messages over the channel.
    type SendError: fmt::Debug;
    /// The error that can occur receiving messages over the channel.
    type RecvError: fmt::Debug;

    /// Sends a message to the other party.
    fn send_bytes(
        &mut self,
        msg: Vec<u8>,
    ) -> impl Future<Output = Result<(), Self::SendError>> + Send;

    /// Awaits the next message of the other party.
    fn recv_bytes(&mut self) -> impl Future<Output = Result<Vec<u8>, Self::RecvError>> + Send;
}

/// A wrapper around [`Channel`] that takes care of (de-)serializing messages.
#[derive(Debug)]
pub(crate) struct MsgChannel<'a, C: Channel>(pub(crate) &'a mut C);

impl<C: Channel> MsgChannel<'_, C> {
    /// Serializes and sends a message to the other party.
    pub(crate) async fn send(&mut self, phase: &str, msg: &impl Serialize) -> Result<(), Error> {
        let msg = bincode::serialize(msg).map_err(|e| Error {
            phase: format!("sending {phase}"),
            reason: ErrorKind::SerdeError(format!("{e:?}")),
        })?;
        self.0.send_bytes(msg).await.map_err(|e| Error {
            phase: phase.to_string(),
            reason: ErrorKind::SendError(format!("{e:?}")),
        })
    }

    /// Receives and deserializes a message from the other party.
    pub(crate) async fn recv<T: DeserializeOwned>(&mut self, phase: &str) -> Result<T, Error> {
        let msg = self.0.recv_bytes().await.map_err(|e| Error {
            phase: phase.to_string(),
            reason: ErrorKind::RecvError(format!("{e:?}")),
        })?;
        bincode::deserialize(&msg).map_err(|e| Error {
            phase: format!("receiving {phase}"),
            reason: ErrorKind::SerdeError(format!("{e:?}")),
        })
    }

    /// Receives and deserializes a Vec from the other party (while checking the length).
    pub(crate) async fn recv_vec<T: DeserializeOwned>(
        &mut self,
        phase: &str,
        len: usize,
    ) -> Result<Vec<T>, Error> {
        let v: Vec<T> = self.recv(phase).await?;
        if v.len() == len {
            Ok(v)
        } else {
            Err(Error {
                phase: phase.to_string(),
                reason: ErrorKind::InvalidLength {
                    expected: len,
                    actual: v.len(),
                },
            })
        }
    }
}

/// An in-memory channel using tokio's [`Sender`] and [`Receiver`], for running both parties
/// inside a single process.
#[derive(Debug)]
pub struct SimpleChannel {
    s: Sender<Vec<u8>>,
    r: Receiver<Vec<u8>>,
}

impl SimpleChannel {
    /// Creates a connected pair of channels, one for each party.
    pub fn channels() -> (Self, Self) {
        let buffer_capacity = 1024;
        let (send_a_to_b, recv_a_to_b) = channel(buffer_capacity);
        let (send_b_to_a, recv_b_to_a) = channel(buffer_capacity);
        let a = SimpleChannel {
            s: send_a_to_b,
            r: recv_b_to_a,
        };
        let b = SimpleChannel {
            s: send_b_to_a,
            r: recv_a_to_b,
        };
        (a, b)
    }
}

#[derive(Debug)]
/// The error raised by `recv` calls of a [`SimpleChannel`] or a [`TcpChannel`].
pub enum AsyncRecvError {
    /// The channel has been closed.
    Closed,
    /// No message was received before the timeout.
    TimeoutElapsed,
    /// The underlying connection failed.
    Io(io::ErrorKind),
    /// The other party announced a message larger than [`MAX_FRAME_LEN`].
    FrameTooLarge(usize),
}

impl Channel for SimpleChannel {
    type SendError = SendError<Vec<u8>>;
    type RecvError = AsyncRecvError;

    async fn send_bytes(&mut self, msg: Vec<u8>) -> Result<(), SendError<Vec<u8>>> {
        let chunk_size = 100 * 1024 * 1024;
        let mut chunks: Vec<_> = msg.chunks(chunk_size).collect();
        if chunks.is_empty() {
            chunks.push(&[]);
        }
        let length = chunks.len();
        let mb = msg.len() as f64 / 1024.0 / 1024.0;
        debug!(chunks = length, "sending {mb:.2}MB to the other party");
        for (i, chunk) in chunks.into_iter().enumerate() {
            let mut msg = Vec::with_capacity(2 * 4 + chunk.len());
            msg.extend((i as u32).to_be_bytes());
            msg.extend((length as u32).to_be_bytes());
            msg.extend(chunk);
            self.s.send(msg).await?;
        }
        Ok(())
    }

    async fn recv_bytes(&mut self) -> Result<Vec<u8>, AsyncRecvError> {
        let mut msg: Vec<u8> = vec![];
        loop {
            let chunk = match timeout(RECV_TIMEOUT, self.r.recv()).await {
                Ok(Some(bytes)) => bytes,
                Ok(None) => return Err(AsyncRecvError::Closed),
                Err(_) => return Err(AsyncRecvError::TimeoutElapsed),
            };
            if chunk.len() < 8 {
                return Err(AsyncRecvError::Closed);
            }
            let i = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            let length = u32::from_be_bytes([chunk[4], chunk[5], chunk[6], chunk[7]]);
            msg.extend(&chunk[8..]);
            if i + 1 >= length {
                break Ok(msg);
            }
        }
    }
}

/// A channel over a single TCP connection, framing every message with a 4 byte length prefix.
///
/// The first party listens on a port, the second party connects to it.
#[derive(Debug)]
pub struct TcpChannel {
    stream: TcpStream,
}

impl TcpChannel {
    /// Waits for the second party to connect on the given port (on all interfaces).
    pub async fn listen(port: u16) -> io::Result<Self> {
        let listener = TcpListener::bind(("0.0.0.0", port)).await?;
        info!(port, "waiting for the other party to connect");
        let (stream, peer) = listener.accept().await?;
        info!(%peer, "other party connected");
        Self::from_stream(stream)
    }

    /// Connects to the first party, which must already be listening.
    pub async fn connect(addr: &str, port: u16) -> io::Result<Self> {
        let stream = TcpStream::connect((addr, port)).await?;
        info!(addr, port, "connected to the other party");
        Self::from_stream(stream)
    }

    /// Wraps an already established connection.
    pub fn from_stream(stream: TcpStream) -> io::Result<Self> {
        stream.set_nodelay(true)?;
        Ok(Self { stream })
    }
}

impl Channel for TcpChannel {
    type SendError = io::Error;
    type RecvError = AsyncRecvError;

    async fn send_bytes(&mut self, msg: Vec<u8>) -> Result<(), io::Error> {
        if msg.len() > MAX_FRAME_LEN {
            return Err(io::Error::other(format!(
                "message of {} bytes exceeds the frame limit",
                msg.len()
            )));
        }
        let len = msg.len() as u32;
        self.stream.write_all(&len.to_be_bytes()).await?;
        self.stream.write_all(&msg).await?;
        self.stream.flush().await
    }

    async fn recv_bytes(&mut self) -> Result<Vec<u8>, AsyncRecvError> {
        let read = async {
            let mut len = [0; 4];
            self.stream.read_exact(&mut len).await?;
            let len = u32::from_be_bytes(len) as usize;
            if len > MAX_FRAME_LEN {
                return Ok(Err(AsyncRecvError::FrameTooLarge(len)));
            }
            // the buffer only grows with the bytes that actually arrive
            let mut msg = vec![];
            (&mut self.stream).take(len as u64).read_to_end(&mut msg).await?;
            if msg.len() < len {
                return Err(io::ErrorKind::UnexpectedEof.into());
            }
            Ok::<_, io::Error>(Ok(msg))
        };
        match timeout(RECV_TIMEOUT, read).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) if e.kind() == io::ErrorKind::UnexpectedEof => Err(AsyncRecvError::Closed),
            Ok(Err(e)) => Err(AsyncRecvError::Io(e.kind())),
            Err(_) => Err(AsyncRecvError::TimeoutElapsed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn simple_channel_roundtrip() -> Result<(), Error> {
        let (mut a, mut b) = SimpleChannel::channels();
        MsgChannel(&mut a).send("greeting", &(3u32, "abc")).await?;
        let (n, s): (u32, String) = MsgChannel(&mut b).recv("greeting").await?;
        assert_eq!(n, 3);
        assert_eq!(s, "abc");

        MsgChannel(&mut b).send("empty", &Vec::<u8>::new()).await?;
        let empty: Vec<u8> = MsgChannel(&mut a).recv_vec("empty", 0).await?;
        assert!(empty.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn recv_vec_checks_length() {
        let (mut a, mut b) = SimpleChannel::channels();
        MsgChannel(&mut a).send("labels", &vec![1u8, 2, 3]).await.unwrap();
        let err = MsgChannel(&mut b)
            .recv_vec::<u8>("labels", 4)
            .await
            .unwrap_err();
        assert!(matches!(
            err.reason,
            ErrorKind::InvalidLength {
                expected: 4,
                actual: 3
            }
        ));
    }

    #[tokio::test]
    async fn closed_simple_channel() {
        let (a, mut b) = SimpleChannel::channels();
        drop(a);
        let err = b.recv_bytes().await.unwrap_err();
        assert!(matches!(err, AsyncRecvError::Closed));
    }

    #[tokio::test]
    async fn tcp_channel_roundtrip() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ch = TcpChannel::from_stream(stream).unwrap();
            let msg = ch.recv_bytes().await.unwrap();
            ch.send_bytes(msg.into_iter().rev().collect()).await.unwrap();
        });
        let mut ch = TcpChannel::connect("127.0.0.1", port).await.unwrap();
        ch.send_bytes(vec![1, 2, 3]).await.unwrap();
        assert_eq!(ch.recv_bytes().await.unwrap(), vec![3, 2, 1]);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn tcp_channel_rejects_oversized_frames() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let peer = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            stream.write_all(&u32::MAX.to_be_bytes()).await.unwrap();
            stream.flush().await.unwrap();
            stream
        });
        let mut ch = TcpChannel::connect("127.0.0.1", port).await.unwrap();
        let err = ch.recv_bytes().await.unwrap_err();
        assert!(matches!(err, AsyncRecvError::FrameTooLarge(len) if len == u32::MAX as usize));
        drop(peer.await.unwrap());

        let err = ch.send_bytes(vec![0; MAX_FRAME_LEN + 1]).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Other);
    }

    #[tokio::test]
    async fn tcp_channel_truncated_frame_is_closed() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let peer = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            stream.write_all(&8u32.to_be_bytes()).await.unwrap();
            stream.write_all(&[1, 2, 3]).await.unwrap();
        });
        let mut ch = TcpChannel::connect("127.0.0.1", port).await.unwrap();
        peer.await.unwrap();
        let err = ch.recv_bytes().await.unwrap_err();
        assert!(matches!(err, AsyncRecvError::Closed));
    }
}
