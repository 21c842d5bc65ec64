//! HTTP client for the companion process (the VS Code extension's local server).
//!
//! Blocking, single-attempt requests bounded by a global timeout:
//! - `forward`: POST a JSON body to `http://<host>:<port><endpoint>`
//! - `is_running`: GET `/status` as a liveness probe
//!
//! There are no retries; the browser extension owns retry policy.

use std::io;
use std::time::Duration;

use serde_json::Value;

use crate::bridge::protocol::ForwardResult;
use crate::config::HostConfig;
use crate::version::user_agent;

/// Why a forward did not produce a successful response.
///
/// `Display` is the text reported back to the browser extension.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ForwardError {
    #[error("Cannot connect to VS Code extension. Is it running?")]
    CannotConnect,

    #[error("Request to VS Code extension timed out")]
    TimedOut,

    #[error("VS Code returned status {0}")]
    Status(u16),

    #[error("{0}")]
    Transport(String),
}

impl ForwardError {
    fn from_transport(error: ureq::Error) -> Self {
        match error {
            ureq::Error::ConnectionFailed | ureq::Error::HostNotFound => Self::CannotConnect,
            ureq::Error::Timeout(_) => Self::TimedOut,
            ureq::Error::Io(ref e) => match e.kind() {
                io::ErrorKind::ConnectionRefused
                | io::ErrorKind::ConnectionReset
                | io::ErrorKind::ConnectionAborted
                | io::ErrorKind::NotConnected
                | io::ErrorKind::AddrNotAvailable => Self::CannotConnect,
                io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => Self::TimedOut,
                _ => Self::Transport(error.to_string()),
            },
            other => Self::Transport(other.to_string()),
        }
    }
}

/// Successful forward: status code and parsed body (`Null` when empty).
#[derive(Debug, Clone, PartialEq)]
pub struct Delivered {
    pub status: u16,
    pub data: Value,
}

impl From<Result<Delivered, ForwardError>> for ForwardResult {
    fn from(outcome: Result<Delivered, ForwardError>) -> Self {
        match outcome {
            Ok(delivered) => ForwardResult::delivered(delivered.status, delivered.data),
            Err(e) => ForwardResult::failed(e.to_string()),
        }
    }
}

pub struct CompanionClient {
    host: String,
    forward_agent: ureq::Agent,
    status_agent: ureq::Agent,
    user_agent: String,
}

impl CompanionClient {
    pub fn new(config: &HostConfig) -> Self {
        Self {
            host: config.companion_host.clone(),
            forward_agent: agent(config.forward_timeout),
            status_agent: agent(config.status_timeout),
            user_agent: user_agent(),
        }
    }

    pub fn url(&self, port: u16, endpoint: &str) -> String {
        format!("http://{}:{}{}", self.host, port, endpoint)
    }

    /// POST `data` to `endpoint` on the companion listening at `port`.
    pub fn forward(&self, port: u16, endpoint: &str, data: &Value) -> Result<Delivered, ForwardError> {
        let url = self.url(port, endpoint);
        tracing::info!(url = %url, "Forwarding to VS Code");

        let result = self
            .forward_agent
            .post(&url)
            .header("Content-Type", "application/json")
            .header("User-Agent", &self.user_agent)
            .send_json(data);

        let mut response = match result {
            Ok(response) => response,
            Err(e) => {
                let error = ForwardError::from_transport(e);
                tracing::error!(url = %url, error = %error, "Error forwarding to VS Code");
                return Err(error);
            }
        };

        let status = response.status().as_u16();
        if !response.status().is_success() {
            tracing::error!(status = %status, "VS Code returned error");
            return Err(ForwardError::Status(status));
        }

        let body = response
            .body_mut()
            .read_to_string()
            .map_err(ForwardError::from_transport)?;
        let data = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&body).map_err(|e| {
                tracing::error!(status = %status, error = %e, "VS Code response is not JSON");
                ForwardError::Transport(e.to_string())
            })?
        };

        tracing::info!(status = %status, "Successfully forwarded to VS Code");
        Ok(Delivered { status, data })
    }

    /// True when GET `/status` answers with a 2xx before the status timeout.
    pub fn is_running(&self, port: u16) -> bool {
        let url = self.url(port, "/status");
        match self
            .status_agent
            .get(&url)
            .header("User-Agent", &self.user_agent)
            .call()
        {
            Ok(response) => {
                let status = response.status();
                tracing::debug!(status = %status.as_u16(), "Status probe answered");
                status.is_success()
            }
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "Status probe failed");
                false
            }
        }
    }
}

fn agent(timeout: Duration) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build()
        .new_agent()
}
