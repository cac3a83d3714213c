use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Domain events emitted after a ledger mutation commits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    ItemCreated {
        item_id: Uuid,
        sku: String,
        initial_qty: i32,
    },
    ItemUpdated(Uuid),
    ItemDeactivated(Uuid),
    StockReceived {
        item_id: Uuid,
        quantity: i32,
        new_on_hand: i32,
        reason: String,
    },
    StockIssued {
        item_id: Uuid,
        quantity: i32,
        new_on_hand: i32,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously. Events are emitted only after the
    /// owning transaction has committed, so a send failure is logged and
    /// never fails the mutation.
    pub async fn send(&self, event: Event) {
        if let Err(e) = self.sender.send(event).await {
            warn!("Failed to publish event: {}", e);
        }
    }
}

/// Drains the event channel, logging each event. Spawned once at startup.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    while let Some(event) = rx.recv().await {
        match &event {
            Event::StockReceived {
                item_id,
                quantity,
                new_on_hand,
                reason,
            } => info!(
                %item_id, quantity, new_on_hand, reason = %reason,
                "stock received"
            ),
            Event::StockIssued {
                item_id,
                quantity,
                new_on_hand,
                reason,
            } => info!(
                %item_id, quantity, new_on_hand, reason = %reason,
                "stock issued"
            ),
            other => info!(event = ?other, "ledger event"),
        }
    }
}
