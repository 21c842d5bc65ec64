use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::process::ExitCode;

use anyhow::Context;

use bergamot_host::logging;
use bergamot_host::{HOST_VERSION, Host, HostConfig, HostError};

const NAME: &str = "bergamot-native-host";

/// How the browser (or a user) invoked the host.
#[derive(Debug, Default, PartialEq)]
struct Launch {
    /// Caller origin, e.g. `chrome-extension://<id>/`.
    origin: Option<String>,
    /// Windows only: `--parent-window=<handle>`.
    parent_window: Option<String>,
    ignored: Vec<String>,
}

#[derive(Debug, PartialEq)]
enum Command {
    Help,
    Version,
    Relay(Launch),
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let launch = match parse_args(&args) {
        Command::Help => {
            print_help();
            return ExitCode::SUCCESS;
        }
        Command::Version => {
            println!("{} {}", NAME, HOST_VERSION);
            return ExitCode::SUCCESS;
        }
        Command::Relay(launch) => launch,
    };

    let config = HostConfig::from_env();
    let dispatch = match logging::dispatch_for(&config.log_file())
        .with_context(|| format!("failed to open log file {}", config.log_file().display()))
    {
        Ok(dispatch) => dispatch,
        Err(e) => {
            // stdout belongs to the protocol; the browser captures stderr.
            eprintln!("error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    tracing::dispatcher::with_default(&dispatch, || relay(&config, &launch))
}

fn relay(config: &HostConfig, launch: &Launch) -> ExitCode {
    tracing::info!(
        version = HOST_VERSION,
        origin = launch.origin.as_deref().unwrap_or("unknown"),
        parent_window = launch.parent_window.as_deref(),
        "Launching native host"
    );
    for arg in &launch.ignored {
        tracing::warn!(arg = %arg, "Ignoring unrecognized argument");
    }

    let mut host = Host::new(config, io::stdin().lock(), io::stdout().lock());
    ExitCode::from(exit_status(|| host.run()))
}

/// Run the relay, mapping errors and panics alike to a logged exit status 1.
fn exit_status(run: impl FnOnce() -> Result<(), HostError>) -> u8 {
    match panic::catch_unwind(AssertUnwindSafe(run)) {
        Ok(Ok(())) => 0,
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Fatal error in native host");
            1
        }
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .copied()
                .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
                .unwrap_or("unknown panic payload");
            tracing::error!(panic = %message, "Native host panicked");
            1
        }
    }
}

fn parse_args(args: &[String]) -> Command {
    let mut launch = Launch::default();

    for arg in args.iter().skip(1) {
        match arg.as_str() {
            "--help" | "-h" => return Command::Help,
            "--version" | "-V" => return Command::Version,
            arg if arg.starts_with("--parent-window=") => {
                launch.parent_window = arg
                    .strip_prefix("--parent-window=")
                    .map(str::to_string);
            }
            arg if launch.origin.is_none() && arg.contains("://") => {
                launch.origin = Some(arg.to_string());
            }
            arg => launch.ignored.push(arg.to_string()),
        }
    }

    Command::Relay(launch)
}

fn print_help() {
    println!(
        r#"{name} {version}
Native messaging host bridging the Bergamot browser extension to the VS Code extension.

USAGE:
    {name} [ORIGIN] [--parent-window=<HANDLE>]

The browser launches this host and speaks length-prefixed JSON over stdin/stdout.

OPTIONS:
    -h, --help       Print help information
    -V, --version    Print version information

ENVIRONMENT:
    BERGAMOT_HOME    State directory holding port.json and native-host.log [default: ~/.bergamot]
    BERGAMOT_LOG     Log level: trace, debug, info, warn, error [default: debug]
    RUST_LOG         Full tracing filter, overrides BERGAMOT_LOG
    LOG_FORMAT       Set to "json" for JSON-lines logs
"#,
        name = NAME,
        version = HOST_VERSION
    );
}
