//! Signaling relay for WebRTC peers plus a static file server for the client.

pub mod assets;
pub mod config;
pub mod error;
pub mod signaling;

pub use error::{Error, Result};
