//! bergamot-host: native-messaging relay between the Bergamot browser
//! extension and the Bergamot VS Code extension's local HTTP server.

pub mod bridge;
pub mod companion;
pub mod config;
pub mod host;
pub mod logging;
mod port_file;
mod version;

pub use bridge::codec::{FrameCodec, FrameError, Inbound};
pub use bridge::protocol::{ForwardResult, Request, Response};
pub use companion::{CompanionClient, ForwardError};
pub use config::HostConfig;
pub use host::{Host, HostError};
pub use port_file::{PortFile, PortFileError};
pub use version::{HOST_VERSION, user_agent};
