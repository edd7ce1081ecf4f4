use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use super::registry::RegistryHandle;
use super::types::Payload;
use crate::error::Error;

pub const DEFAULT_SIGNALING_PORT: u16 = 9001;

pub struct SignalingServer {
    listener: TcpListener,
    registry: RegistryHandle,
}

impl SignalingServer {
    /// Bind the listener. Failing to bind is fatal; there is no fallback port.
    pub async fn bind(addr: SocketAddr, registry: RegistryHandle) -> Result<Self, Error> {
        let listener = TcpListener::bind(addr).await.map_err(|source| Error::Bind {
            service: "signaling server",
            addr,
            source,
        })?;
        info!("Signaling server listening on {}", listener.local_addr()?);

        Ok(Self { listener, registry })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections forever, one relay task per connection.
    pub async fn run(self) {
        loop {
            let (stream, addr) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!("Accept failed: {}", e);
                    continue;
                }
            };
            let registry = self.registry.clone();

            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, addr, registry).await {
                    error!("Connection error from {}: {}", addr, e);
                }
            });
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    registry: RegistryHandle,
) -> Result<(), Error> {
    let ws_stream = tokio_tungstenite::accept_async(stream).await?;
    let (mut ws_tx, mut ws_rx) = ws_stream.split();

    let (tx, mut rx) = mpsc::unbounded_channel::<Payload>();

    let send_task = tokio::spawn(async move {
        while let Some(payload) = rx.recv().await {
            if ws_tx.send(payload.into_message()).await.is_err() {
                break;
            }
        }
    });

    let membership = match registry.join(tx).await {
        Ok(membership) => membership,
        Err(e) => {
            send_task.abort();
            return Err(e.into());
        }
    };
    let id = membership.id();
    info!("WebSocket connection from {} as {}", addr, id);

    while let Some(msg) = ws_rx.next().await {
        let msg = match msg {
            Ok(m) => m,
            Err(e) => {
                warn!("WebSocket error from {}: {}", id, e);
                break;
            }
        };

        if let Message::Close(_) = msg {
            debug!("Close received from {}", id);
            break;
        }
        if let Some(payload) = Payload::from_message(msg) {
            registry.broadcast(id, payload).await;
        }
    }

    membership.leave().await;
    send_task.abort();
    info!("WebSocket disconnected: {} ({})", addr, id);

    Ok(())
}
