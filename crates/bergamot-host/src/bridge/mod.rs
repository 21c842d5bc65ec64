//! Native-messaging bridge to the browser extension.
//!
//! - **codec**: length-prefixed JSON framing over blocking Read/Write
//! - **protocol**: inbound request classification and outbound response types

pub mod codec;
pub mod protocol;
