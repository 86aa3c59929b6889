//! Registry of connected agents.
//!
//! The only cross-task mutable state in the relay. Each connected agent is
//! represented by the sender half of its outbound queue; the connection task
//! owns the socket itself. Broadcast snapshots the peer list under the lock
//! and delivers outside it, tolerating a stale snapshot.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

use crate::domain::{Envelope, PeerStatus};
use crate::error::Result;

/// Sender half of one peer's outbound message queue.
pub type PeerSender = mpsc::UnboundedSender<String>;

/// Thread-safe map from agent id to its live connection.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    peers: Arc<Mutex<HashMap<String, PeerSender>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            peers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Register a peer after successful authentication. An id collision
    /// overwrites the previous entry without closing it explicitly (last
    /// writer wins); the displaced queue is dropped when its connection task
    /// ends.
    pub async fn insert(&self, id: &str, sender: PeerSender) {
        let mut peers = self.peers.lock().await;
        if peers.insert(id.to_string(), sender).is_some() {
            warn!(id, "Replacing existing registry entry for id");
        }
    }

    /// Remove a peer. Idempotent: removing an absent id is a no-op.
    pub async fn remove(&self, id: &str) -> bool {
        let mut peers = self.peers.lock().await;
        peers.remove(id).is_some()
    }

    /// Ids of currently registered peers, sorted. Order carries no meaning.
    pub async fn active_ids(&self) -> Vec<String> {
        let peers = self.peers.lock().await;
        let mut ids: Vec<String> = peers.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub async fn len(&self) -> usize {
        let peers = self.peers.lock().await;
        peers.len()
    }

    pub async fn is_empty(&self) -> bool {
        let peers = self.peers.lock().await;
        peers.is_empty()
    }

    /// Deliver a message to every registered peer as of a snapshot taken at
    /// call time. The message is serialized once. A failed send is logged and
    /// skipped; it does not abort the remaining deliveries and does not
    /// unregister the peer. Disconnects are detected only on the connection
    /// task's receive path. Returns the number of delivery attempts.
    pub async fn broadcast(&self, envelope: &Envelope) -> Result<usize> {
        let text = serde_json::to_string(envelope)?;

        let snapshot: Vec<(String, PeerSender)> = {
            let peers = self.peers.lock().await;
            peers
                .iter()
                .map(|(id, tx)| (id.clone(), tx.clone()))
                .collect()
        };

        let attempts = snapshot.len();
        for (id, tx) in snapshot {
            if tx.send(text.clone()).is_err() {
                warn!(id, "Failed to deliver broadcast to peer");
            }
        }

        debug!(attempts, "Broadcast delivered");
        Ok(attempts)
    }

    /// Announce a membership change to all peers, the sender included.
    pub async fn broadcast_status(&self, id: &str, status: PeerStatus) {
        if let Err(e) = self.broadcast(&Envelope::status(id, status)).await {
            warn!(id, "Failed to broadcast status event: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_and_remove_idempotence() {
        let registry = Registry::new();
        let (tx, _rx) = mpsc::unbounded_channel();

        registry.insert("605", tx).await;
        assert_eq!(registry.active_ids().await, vec!["605".to_string()]);

        assert!(registry.remove("605").await);
        // Second removal is a no-op
        assert!(!registry.remove("605").await);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_insert_same_id_overwrites() {
        let registry = Registry::new();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();

        registry.insert("605", tx1).await;
        registry.insert("605", tx2).await;
        assert_eq!(registry.len().await, 1);

        registry
            .broadcast(&Envelope::command("stop"))
            .await
            .unwrap();
        assert!(rx1.try_recv().is_err());
        assert!(rx2.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_broadcast_fans_out_to_all() {
        let registry = Registry::new();
        let mut receivers = Vec::new();
        for id in ["605", "699", "814"] {
            let (tx, rx) = mpsc::unbounded_channel();
            registry.insert(id, tx).await;
            receivers.push(rx);
        }

        let attempts = registry
            .broadcast(&Envelope::command("triangle"))
            .await
            .unwrap();
        assert_eq!(attempts, 3);

        for rx in receivers.iter_mut() {
            let text = rx.try_recv().unwrap();
            let envelope: Envelope = serde_json::from_str(&text).unwrap();
            assert_eq!(envelope, Envelope::command("triangle"));
        }
    }

    #[tokio::test]
    async fn test_broadcast_tolerates_dead_peer() {
        let registry = Registry::new();
        let (tx_dead, rx_dead) = mpsc::unbounded_channel();
        let (tx_live, mut rx_live) = mpsc::unbounded_channel();
        registry.insert("605", tx_dead).await;
        registry.insert("699", tx_live).await;
        drop(rx_dead);

        let attempts = registry
            .broadcast(&Envelope::command("stop"))
            .await
            .unwrap();

        // Both peers got an attempt; the live one received the message and
        // the dead one stayed registered
        assert_eq!(attempts, 2);
        assert!(rx_live.try_recv().is_ok());
        assert_eq!(registry.len().await, 2);
    }

    #[tokio::test]
    async fn test_active_ids_sorted() {
        let registry = Registry::new();
        for id in ["814", "605", "699"] {
            let (tx, _rx) = mpsc::unbounded_channel();
            registry.insert(id, tx).await;
        }
        assert_eq!(
            registry.active_ids().await,
            vec!["605".to_string(), "699".to_string(), "814".to_string()]
        );
    }
}
