//! WebSocket signaling relay: every message from one peer goes to all the others

mod registry;
mod server;
mod types;

pub use registry::{Membership, PeerSender, RegistryHandle};
pub use server::{DEFAULT_SIGNALING_PORT, SignalingServer};
pub use types::{ConnId, Payload, SignalingError};
