use std::collections::HashMap;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use super::types::{ConnId, Payload, SignalingError};

const COMMAND_QUEUE_CAPACITY: usize = 1024;

/// Outbound queue of one connection, drained by that connection's writer task.
pub type PeerSender = mpsc::UnboundedSender<Payload>;

/// Commands sent to the registry actor
pub(crate) enum RegistryCommand {
    Add {
        peer_tx: PeerSender,
        reply: oneshot::Sender<ConnId>,
    },
    Broadcast {
        sender: ConnId,
        payload: Payload,
    },
    Count {
        reply: oneshot::Sender<usize>,
    },
    Contains {
        id: ConnId,
        reply: oneshot::Sender<bool>,
    },
}

/// Owns the membership map. Commands are handled one at a time, so a
/// broadcast never observes a half-applied add or remove.
///
/// Removals arrive on their own unbounded channel and are always drained
/// before the next command, so a removal issued before a broadcast is applied
/// before it even when the command queue is full.
pub(crate) async fn registry_actor(
    mut rx: mpsc::Receiver<RegistryCommand>,
    mut removals: mpsc::UnboundedReceiver<ConnId>,
) {
    let mut members: HashMap<ConnId, PeerSender> = HashMap::new();

    loop {
        let cmd = tokio::select! {
            biased;
            Some(id) = removals.recv() => {
                if members.remove(&id).is_some() {
                    info!("Peer {} removed ({} connected)", id, members.len());
                }
                continue;
            }
            cmd = rx.recv() => match cmd {
                Some(cmd) => cmd,
                None => break,
            },
        };

        match cmd {
            RegistryCommand::Add { peer_tx, reply } => {
                let mut id = ConnId::generate();
                while members.contains_key(&id) {
                    id = ConnId::generate();
                }
                members.insert(id, peer_tx);

                // Caller gave up before learning its id; nobody could ever remove it.
                if reply.send(id).is_err() {
                    members.remove(&id);
                    continue;
                }
                info!("Peer {} registered ({} connected)", id, members.len());
            }

            RegistryCommand::Broadcast { sender, payload } => {
                let mut delivered = 0usize;
                for (id, peer_tx) in &members {
                    if *id == sender {
                        continue;
                    }
                    if peer_tx.send(payload.clone()).is_err() {
                        debug!("Outbound queue for {} closed, skipping", id);
                        continue;
                    }
                    delivered += 1;
                }
                debug!(
                    "Relayed {} bytes from {} to {} peers",
                    payload.len(),
                    sender,
                    delivered
                );
            }

            RegistryCommand::Count { reply } => {
                let _ = reply.send(members.len());
            }

            RegistryCommand::Contains { id, reply } => {
                let _ = reply.send(members.contains_key(&id));
            }
        }
    }
}

/// Handle to communicate with the registry actor
#[derive(Clone)]
pub struct RegistryHandle {
    pub(crate) tx: mpsc::Sender<RegistryCommand>,
    removals: mpsc::UnboundedSender<ConnId>,
}

impl RegistryHandle {
    /// Start the registry actor on the current runtime.
    pub fn spawn() -> Self {
        Self::with_capacity(COMMAND_QUEUE_CAPACITY)
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel::<RegistryCommand>(capacity);
        let (removals, removals_rx) = mpsc::unbounded_channel();
        tokio::spawn(registry_actor(rx, removals_rx));
        Self { tx, removals }
    }

    /// Register a connection. Membership is in effect once this returns.
    pub async fn add(&self, peer_tx: PeerSender) -> Result<ConnId, SignalingError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(RegistryCommand::Add {
                peer_tx,
                reply: reply_tx,
            })
            .await
            .map_err(|_| SignalingError::RegistryClosed)?;
        reply_rx.await.map_err(|_| SignalingError::RegistryClosed)
    }

    /// Register a connection and get a guard that deregisters it when released.
    pub async fn join(&self, peer_tx: PeerSender) -> Result<Membership, SignalingError> {
        let id = self.add(peer_tx).await?;
        Ok(Membership {
            id,
            registry: Some(self.clone()),
        })
    }

    /// Deregister a connection. Removing an absent id is a no-op.
    pub async fn remove(&self, id: ConnId) {
        self.remove_detached(id);
    }

    /// Queue `payload` for every member except `sender`.
    pub async fn broadcast(&self, sender: ConnId, payload: Payload) {
        let _ = self
            .tx
            .send(RegistryCommand::Broadcast { sender, payload })
            .await;
    }

    pub async fn member_count(&self) -> Result<usize, SignalingError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(RegistryCommand::Count { reply: reply_tx })
            .await
            .map_err(|_| SignalingError::RegistryClosed)?;
        reply_rx.await.map_err(|_| SignalingError::RegistryClosed)
    }

    pub async fn contains(&self, id: ConnId) -> Result<bool, SignalingError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(RegistryCommand::Contains {
                id,
                reply: reply_tx,
            })
            .await
            .map_err(|_| SignalingError::RegistryClosed)?;
        reply_rx.await.map_err(|_| SignalingError::RegistryClosed)
    }

    /// Non-async removal for drop paths. Never waits on a full command queue.
    fn remove_detached(&self, id: ConnId) {
        let _ = self.removals.send(id);
    }
}

/// Registration of one connection. Call [`Membership::leave`] on the normal
/// exit path; dropping it without leaving still deregisters the connection.
pub struct Membership {
    id: ConnId,
    registry: Option<RegistryHandle>,
}

impl Membership {
    pub fn id(&self) -> ConnId {
        self.id
    }

    pub async fn leave(mut self) {
        if let Some(registry) = self.registry.take() {
            registry.remove(self.id).await;
        }
    }
}

impl Drop for Membership {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.take() {
            registry.remove_detached(self.id);
        }
    }
}
