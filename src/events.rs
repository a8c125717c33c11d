//! Typed event bus. Mirrors the teacher's `HeadChange`/`tokio::sync::broadcast` usage in
//! `msgpool::mod` (`subscribe_head_changes`, `MessagePool::new`'s `local_msgs`/`network_sender`
//! pattern): a single broadcast channel per event kind, cloneable senders, lagging receivers
//! resynchronize rather than error out.

use tokio::sync::broadcast;
use tracing::warn;

use crate::peer::PeerId;
use crate::transaction::TransactionId;

const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Events the pool and peer overlay publish for observers (metrics, tests, future RPC layers).
#[derive(Debug, Clone)]
pub enum NodeEvent {
    TransactionAdmitted { id: TransactionId, fee_nqt: i64 },
    TransactionRejected { id: TransactionId, reason: String },
    TransactionExpired { id: TransactionId },
    BlockApplied { height: i64, transaction_count: usize },
    BlockUndone { height: i64 },
    PeerConnected { id: PeerId },
    PeerBlacklisted { id: PeerId, reason: String },
    PeerWeightChanged { id: PeerId, weight: i64 },
}

/// Owns the broadcast sender; cheap to clone, all clones publish to the same subscribers.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<NodeEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NodeEvent> {
        self.sender.subscribe()
    }

    /// Publishes an event. Silently drops it if there are no subscribers, matching
    /// `broadcast::Sender::send`'s semantics — the pool must not fail admission because no one
    /// is listening.
    pub fn publish(&self, event: NodeEvent) {
        if self.sender.send(event).is_err() {
            // no subscribers; nothing lost that anyone can observe
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Drains a receiver, logging (and skipping past) any lag rather than treating it as fatal —
/// an observer that falls behind the bus should resume from the current point, not crash the
/// whole node.
pub async fn recv_lossy(receiver: &mut broadcast::Receiver<NodeEvent>) -> Option<NodeEvent> {
    loop {
        match receiver.recv().await {
            Ok(event) => return Some(event),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "event bus subscriber lagged; resynchronizing");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => return None,
        }
    }
}
