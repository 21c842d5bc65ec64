//! Relay loop: read a frame, dispatch it, write exactly one response frame.
//!
//! Single-threaded and blocking. Framing errors are logged and skipped
//! without a response; handler failures become error responses. Only I/O
//! failures on the streams themselves end the loop with an error.

use std::io::{self, Read, Write};

use serde_json::Value;

use crate::bridge::codec::{EncodeError, FrameCodec, Inbound};
use crate::bridge::protocol::{ForwardResult, Request, Response};
use crate::companion::CompanionClient;
use crate::config::HostConfig;
use crate::port_file::PortFile;

/// Failures that terminate the relay.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("stream I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("failed to encode response: {0}")]
    Encode(#[from] EncodeError),
}

pub struct Host<R, W> {
    reader: R,
    writer: W,
    codec: FrameCodec,
    port_file: PortFile,
    companion: CompanionClient,
}

impl<R: Read, W: Write> Host<R, W> {
    pub fn new(config: &HostConfig, reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            codec: FrameCodec::new(config.max_inbound_bytes, config.max_outbound_bytes),
            port_file: PortFile::new(config.port_file(), config.default_port),
            companion: CompanionClient::new(config),
        }
    }

    /// Run until the peer closes the input stream.
    ///
    /// Returns `Ok(())` on end-of-stream; any `Err` is fatal.
    pub fn run(&mut self) -> Result<(), HostError> {
        tracing::info!(port_file = %self.port_file.path().display(), "Native host started");

        loop {
            match self.codec.read_frame(&mut self.reader)? {
                Inbound::Frame(message) => {
                    tracing::debug!(message = %message, "Received message");
                    let response = self.dispatch(message);
                    self.send(&response)?;
                }
                Inbound::EndOfStream => {
                    tracing::debug!("Input stream closed, exiting");
                    return Ok(());
                }
                Inbound::Malformed(e) => {
                    tracing::error!(error = %e, "Invalid message received");
                }
            }
        }
    }

    /// Produce the response for one decoded message.
    pub fn dispatch(&self, message: Value) -> Response {
        match Request::classify(message) {
            Request::Ping { data } => Response::Pong { echo: data },
            Request::GetPort => Response::Port {
                port: self.port_file.port(),
            },
            Request::Forward { endpoint, data } => {
                let port = self.port_file.port();
                let outcome = self.companion.forward(port, &endpoint, &data);
                Response::ForwardResult(ForwardResult::from(outcome))
            }
            Request::CheckStatus => {
                let port = self.port_file.port();
                Response::Status {
                    vscode_running: self.companion.is_running(port),
                    port,
                }
            }
            Request::Unknown { kind } => {
                tracing::warn!(kind = %kind, "Unknown message type");
                Response::unknown_type(&kind)
            }
        }
    }

    fn send(&mut self, response: &Response) -> Result<(), HostError> {
        let payload = match self.codec.encode(response) {
            Ok(payload) => payload,
            Err(EncodeError::TooLarge { size, limit }) => {
                tracing::error!(size, limit, "Response exceeds native messaging limit");
                let fallback = Response::Error {
                    error: format!("Response too large: {size} bytes exceeds limit of {limit}"),
                };
                serde_json::to_vec(&fallback).map_err(EncodeError::from)?
            }
            Err(e) => return Err(e.into()),
        };

        self.codec.write_frame(&mut self.writer, &payload)?;
        tracing::debug!(size = payload.len(), "Sent message");
        Ok(())
    }

    pub fn into_writer(self) -> W {
        self.writer
    }
}
