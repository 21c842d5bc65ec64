//! Host configuration.
//!
//! Everything lives under one state directory shared with the VS Code
//! extension: `port.json` (written by the extension) and `native-host.log`.

use std::path::PathBuf;
use std::time::Duration;

use crate::bridge::codec::{DEFAULT_MAX_INBOUND_BYTES, DEFAULT_MAX_OUTBOUND_BYTES};

/// Overrides the state directory (defaults to `~/.bergamot`).
pub const STATE_DIR_ENV: &str = "BERGAMOT_HOME";

/// Port assumed when the port file is missing or unusable.
pub const DEFAULT_PORT: u16 = 5000;

const STATE_DIR_NAME: &str = ".bergamot";
const PORT_FILE_NAME: &str = "port.json";
const LOG_FILE_NAME: &str = "native-host.log";

#[derive(Debug, Clone)]
pub struct HostConfig {
    pub state_dir: PathBuf,
    pub default_port: u16,
    /// Hostname of the companion HTTP server.
    pub companion_host: String,
    pub forward_timeout: Duration,
    pub status_timeout: Duration,
    pub max_inbound_bytes: usize,
    pub max_outbound_bytes: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self::with_state_dir(default_state_dir())
    }
}

impl HostConfig {
    /// Build configuration, honouring `BERGAMOT_HOME`.
    pub fn from_env() -> Self {
        match std::env::var_os(STATE_DIR_ENV).filter(|v| !v.is_empty()) {
            Some(dir) => Self::with_state_dir(PathBuf::from(dir)),
            None => Self::default(),
        }
    }

    pub fn with_state_dir(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
            default_port: DEFAULT_PORT,
            companion_host: "localhost".to_string(),
            forward_timeout: Duration::from_secs(5),
            status_timeout: Duration::from_secs(2),
            max_inbound_bytes: DEFAULT_MAX_INBOUND_BYTES,
            max_outbound_bytes: DEFAULT_MAX_OUTBOUND_BYTES,
        }
    }

    pub fn port_file(&self) -> PathBuf {
        self.state_dir.join(PORT_FILE_NAME)
    }

    pub fn log_file(&self) -> PathBuf {
        self.state_dir.join(LOG_FILE_NAME)
    }
}

fn default_state_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(STATE_DIR_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = HostConfig::with_state_dir("/tmp/bergamot-test");
        assert_eq!(config.default_port, 5000);
        assert_eq!(config.companion_host, "localhost");
        assert_eq!(config.forward_timeout, Duration::from_secs(5));
        assert_eq!(config.status_timeout, Duration::from_secs(2));
        assert_eq!(config.max_inbound_bytes, 64 * 1024 * 1024);
        assert_eq!(config.max_outbound_bytes, 1024 * 1024);
    }

    #[test]
    fn files_live_in_state_dir() {
        let config = HostConfig::with_state_dir("/tmp/bergamot-test");
        assert_eq!(
            config.port_file(),
            PathBuf::from("/tmp/bergamot-test/port.json")
        );
        assert_eq!(
            config.log_file(),
            PathBuf::from("/tmp/bergamot-test/native-host.log")
        );
    }

    #[test]
    fn default_state_dir_is_dot_bergamot() {
        assert!(default_state_dir().ends_with(".bergamot"));
    }
}
