//! Companion port lookup.
//!
//! The VS Code extension writes `{"port": N}` when its HTTP server starts.
//! The file is re-read on every lookup so a restarted extension on a new
//! port is picked up without restarting the host.

use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum PortFileError {
    #[error("failed to read port file: {0}")]
    Read(#[from] io::Error),

    #[error("port file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("port file holds an invalid port: {0}")]
    InvalidPort(Value),
}

#[derive(Debug, Clone)]
pub struct PortFile {
    path: PathBuf,
    default_port: u16,
}

impl PortFile {
    pub fn new(path: impl Into<PathBuf>, default_port: u16) -> Self {
        Self {
            path: path.into(),
            default_port,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current companion port, or the default if the file is absent or unusable.
    pub fn port(&self) -> u16 {
        match self.read() {
            Ok(Some(port)) => port,
            Ok(None) => self.default_port,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    path = %self.path.display(),
                    "Error reading port file"
                );
                self.default_port
            }
        }
    }

    /// Read the port file. `Ok(None)` means there is no port to read.
    pub fn read(&self) -> Result<Option<u16>, PortFileError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No port file, using default port");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let record: Value = serde_json::from_str(&contents)?;
        match record.get("port") {
            None => Ok(None),
            Some(port) => port
                .as_u64()
                .and_then(|p| u16::try_from(p).ok())
                .filter(|p| *p != 0)
                .map(Some)
                .ok_or_else(|| PortFileError::InvalidPort(port.clone())),
        }
    }
}
