use std::net::SocketAddr;

use thiserror::Error;
use tokio_tungstenite::tungstenite;

use crate::signaling::SignalingError;

/// Errors surfaced by the relay process.
#[derive(Debug, Error)]
pub enum Error {
    /// A listener could not claim its port.
    #[error("failed to bind {service} on {addr}: {source}")]
    Bind {
        service: &'static str,
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error(transparent)]
    Signaling(#[from] SignalingError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
