//! Diagnostic logging to the state directory.
//!
//! stdout carries protocol frames and must never see log output, so every
//! event goes to `native-host.log`. The subscriber is returned as an explicit
//! [`Dispatch`] for the caller to scope around the relay loop; nothing is
//! installed process-wide.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;

use tracing::Dispatch;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt};

/// Log level for the host's own targets when `RUST_LOG` is not set.
pub const LOG_LEVEL_ENV: &str = "BERGAMOT_LOG";

/// Set to `json` for JSON-lines output.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Build the event filter from `RUST_LOG` or `BERGAMOT_LOG` (default `debug`).
pub fn log_filter() -> EnvFilter {
    if std::env::var("RUST_LOG").is_ok() {
        return EnvFilter::from_default_env();
    }

    let level = match std::env::var(LOG_LEVEL_ENV).as_deref() {
        Ok("trace") => "trace",
        Ok("info") => "info",
        Ok("warn") | Ok("warning") => "warn",
        Ok("error") => "error",
        _ => "debug",
    };

    EnvFilter::new(format!(
        "bergamot_host={level},bergamot_native_host={level}",
        level = level
    ))
}

/// Open the log file for appending, creating its directory if needed.
pub fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Subscriber writing to `file`, filtered by `filter`.
pub fn file_dispatch(file: File, filter: EnvFilter, json: bool) -> Dispatch {
    let writer = Mutex::new(file);
    if json {
        Dispatch::new(
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_ansi(false).with_writer(writer)),
        )
    } else {
        Dispatch::new(
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_ansi(false).with_writer(writer)),
        )
    }
}

/// Open `path` and build its subscriber using the environment's filter and format.
pub fn dispatch_for(path: &Path) -> io::Result<Dispatch> {
    let file = open_log_file(path)?;
    let json = std::env::var(LOG_FORMAT_ENV).as_deref() == Ok("json");
    Ok(file_dispatch(file, log_filter(), json))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_log_file_creates_state_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("native-host.log");
        open_log_file(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn events_land_in_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("native-host.log");
        let dispatch = file_dispatch(
            open_log_file(&path).unwrap(),
            EnvFilter::new("bergamot_host=debug"),
            false,
        );

        tracing::dispatcher::with_default(&dispatch, || {
            tracing::info!(port = 5432, "Native host started");
            tracing::trace!("filtered out");
        });

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("Native host started"));
        assert!(contents.contains("port=5432"));
        assert!(!contents.contains("filtered out"));
    }

    #[test]
    fn json_format_writes_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("native-host.log");
        let dispatch = file_dispatch(
            open_log_file(&path).unwrap(),
            EnvFilter::new("bergamot_host=info"),
            true,
        );

        tracing::dispatcher::with_default(&dispatch, || {
            tracing::warn!(kind = "bogus", "Unknown message type");
        });

        let contents = std::fs::read_to_string(&path).unwrap();
        let line: serde_json::Value = serde_json::from_str(contents.lines().next().unwrap()).unwrap();
        assert_eq!(line["level"], "WARN");
        assert_eq!(line["fields"]["message"], "Unknown message type");
        assert_eq!(line["fields"]["kind"], "bogus");
    }

    #[test]
    fn appends_across_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("native-host.log");

        for session in ["first", "second"] {
            let dispatch = file_dispatch(
                open_log_file(&path).unwrap(),
                EnvFilter::new("bergamot_host=info"),
                false,
            );
            tracing::dispatcher::with_default(&dispatch, || {
                tracing::info!(session, "session");
            });
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("first"));
        assert!(contents.contains("second"));
    }
}
