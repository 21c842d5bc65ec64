//! Native-messaging frame codec.
//!
//! Each frame is a 4-byte length prefix followed by that many bytes of UTF-8
//! JSON. The prefix is written and read in the platform's native byte order,
//! matching what the browser does on its side of the pipe. Both ends must
//! therefore share endianness: a peer with the opposite byte order would read
//! a garbage length and the stream would never resynchronize.
//!
//! Works over any blocking `Read`/`Write` (stdin/stdout, pipes, in-memory buffers).

use std::io::{self, Read, Write};

use serde::Serialize;

/// Width of the length prefix in bytes.
pub const LENGTH_PREFIX_BYTES: usize = 4;

/// Largest message the browser will send to a host (64 MiB).
pub const DEFAULT_MAX_INBOUND_BYTES: usize = 64 * 1024 * 1024;

/// Largest message a host may send to the browser (1 MiB).
///
/// The browser drops the connection when a host exceeds this.
pub const DEFAULT_MAX_OUTBOUND_BYTES: usize = 1024 * 1024;

/// Why an inbound frame could not be turned into a message.
///
/// These are recoverable: the stream stays aligned on the next frame
/// (or reaches end-of-stream on the next read).
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("truncated length prefix: received {received} of 4 bytes")]
    TruncatedLength { received: usize },

    #[error("truncated payload: expected {expected} bytes, received {received}")]
    TruncatedPayload { expected: usize, received: usize },

    #[error("declared length {length} exceeds limit of {limit} bytes")]
    TooLarge { length: usize, limit: usize },

    #[error("payload is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("payload is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),
}

/// Outcome of reading one frame.
#[derive(Debug)]
pub enum Inbound {
    /// A complete, well-formed message.
    Frame(serde_json::Value),
    /// The peer closed the stream before a new frame started.
    EndOfStream,
    /// A frame arrived but could not be decoded.
    Malformed(FrameError),
}

/// Errors producing an outbound payload.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("failed to serialize message: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("encoded message is {size} bytes, exceeds limit of {limit} bytes")]
    TooLarge { size: usize, limit: usize },
}

/// Frame codec with inbound/outbound size limits.
#[derive(Debug, Clone, Copy)]
pub struct FrameCodec {
    max_inbound: usize,
    max_outbound: usize,
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_INBOUND_BYTES, DEFAULT_MAX_OUTBOUND_BYTES)
    }
}

impl FrameCodec {
    pub fn new(max_inbound: usize, max_outbound: usize) -> Self {
        Self {
            max_inbound,
            max_outbound,
        }
    }

    /// Read one frame from `reader`, blocking until it is complete.
    ///
    /// Only I/O failures other than end-of-stream are returned as `Err`;
    /// every framing problem is reported as [`Inbound::Malformed`].
    pub fn read_frame<R: Read>(&self, reader: &mut R) -> io::Result<Inbound> {
        let (received, prefix) = read_prefix(reader)?;
        if received == 0 {
            return Ok(Inbound::EndOfStream);
        }
        if received < LENGTH_PREFIX_BYTES {
            return Ok(Inbound::Malformed(FrameError::TruncatedLength { received }));
        }

        let length = u32::from_ne_bytes(prefix) as usize;
        tracing::trace!(length, "Reading frame");

        if length > self.max_inbound {
            // Consume the oversized payload so the next read starts on a frame boundary.
            let discarded = io::copy(&mut reader.by_ref().take(length as u64), &mut io::sink())?;
            tracing::debug!(length, discarded, "Discarded oversized frame");
            return Ok(Inbound::Malformed(FrameError::TooLarge {
                length,
                limit: self.max_inbound,
            }));
        }

        let mut payload = Vec::with_capacity(length.min(64 * 1024));
        reader.by_ref().take(length as u64).read_to_end(&mut payload)?;
        if payload.len() < length {
            return Ok(Inbound::Malformed(FrameError::TruncatedPayload {
                expected: length,
                received: payload.len(),
            }));
        }

        Ok(match decode_payload(&payload) {
            Ok(message) => Inbound::Frame(message),
            Err(e) => Inbound::Malformed(e),
        })
    }

    /// Serialize `message` to its JSON payload, enforcing the outbound limit.
    pub fn encode<T: Serialize>(&self, message: &T) -> Result<Vec<u8>, EncodeError> {
        let payload = serde_json::to_vec(message)?;
        if payload.len() > self.max_outbound {
            return Err(EncodeError::TooLarge {
                size: payload.len(),
                limit: self.max_outbound,
            });
        }
        Ok(payload)
    }

    /// Write an already-encoded payload as one frame and flush.
    pub fn write_frame<W: Write>(&self, writer: &mut W, payload: &[u8]) -> io::Result<()> {
        let length = u32::try_from(payload.len()).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidInput, "payload exceeds u32 length prefix")
        })?;
        tracing::trace!(length, "Writing frame");
        writer.write_all(&length.to_ne_bytes())?;
        writer.write_all(payload)?;
        writer.flush()
    }
}

/// Fill the length prefix, tolerating short reads. Returns how many bytes arrived.
fn read_prefix<R: Read>(reader: &mut R) -> io::Result<(usize, [u8; LENGTH_PREFIX_BYTES])> {
    let mut prefix = [0u8; LENGTH_PREFIX_BYTES];
    let mut filled = 0;
    while filled < LENGTH_PREFIX_BYTES {
        match reader.read(&mut prefix[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok((filled, prefix))
}

fn decode_payload(payload: &[u8]) -> Result<serde_json::Value, FrameError> {
    let text = std::str::from_utf8(payload)?;
    serde_json::from_str(text).map_err(FrameError::InvalidJson)
}
