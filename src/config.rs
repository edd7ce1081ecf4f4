use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use crate::assets::DEFAULT_STATIC_PORT;
use crate::signaling::DEFAULT_SIGNALING_PORT;

/// Fixed startup settings. There is no CLI or environment override.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// WebSocket relay address, loopback only.
    pub signaling_addr: SocketAddr,
    /// Static file server address, all interfaces.
    pub static_addr: SocketAddr,
    /// Directory served by the static file server.
    pub asset_root: PathBuf,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            signaling_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_SIGNALING_PORT)),
            static_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_STATIC_PORT)),
            asset_root: PathBuf::from("."),
        }
    }
}
