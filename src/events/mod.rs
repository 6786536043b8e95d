use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{payment_proof::ProofStatus, shipment::ShipmentStatus};

pub mod feed;

pub use feed::{FeedSubscription, TrackingFeed};

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends after a commit; the write already happened, so a closed channel is only logged.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!(error = %e, "domain event dropped");
        }
    }
}

/// Domain events emitted after a successful write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    ShipmentCreated {
        shipment_id: Uuid,
        tracking_number: String,
    },
    ShipmentUpdated(Uuid),
    ShipmentDeleted {
        shipment_id: Uuid,
        events_removed: u64,
    },
    TrackingEventAppended {
        shipment_id: Uuid,
        event_id: Uuid,
        event_type: ShipmentStatus,
        occurred_at: DateTime<Utc>,
    },
    ShipmentException {
        shipment_id: Uuid,
        event_id: Uuid,
        amount: Option<Decimal>,
    },
    QuoteCreated(Uuid),
    PaymentOptionCreated(Uuid),
    PaymentOptionDeleted(Uuid),
    PaymentProofSubmitted {
        proof_id: Uuid,
        shipment_id: Uuid,
    },
    PaymentProofReviewed {
        proof_id: Uuid,
        status: ProofStatus,
    },
    ProfileUpdated(Uuid),
}

/// Drains the domain event channel, logging each event.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::ShipmentCreated {
                shipment_id,
                tracking_number,
            } => {
                info!(%shipment_id, %tracking_number, "shipment created");
            }
            Event::ShipmentDeleted {
                shipment_id,
                events_removed,
            } => {
                info!(%shipment_id, events_removed, "shipment deleted with its tracking history");
            }
            Event::TrackingEventAppended {
                shipment_id,
                event_type,
                ..
            } => {
                info!(%shipment_id, event_type = %event_type, "tracking event appended");
            }
            Event::ShipmentException {
                shipment_id,
                event_id,
                amount,
            } => {
                warn!(
                    %shipment_id,
                    %event_id,
                    amount = ?amount,
                    "shipment entered exception; awaiting payment resolution"
                );
            }
            Event::PaymentProofSubmitted {
                proof_id,
                shipment_id,
            } => {
                info!(%proof_id, %shipment_id, "payment proof awaiting review");
            }
            other => {
                info!(event = ?other, "domain event");
            }
        }
    }

    warn!("Event processing loop has ended");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_fails_once_receiver_is_gone() {
        let (tx, rx) = mpsc::channel(1);
        let sender = EventSender::new(tx);
        drop(rx);

        let result = sender.send(Event::QuoteCreated(Uuid::new_v4())).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn process_events_drains_until_closed() {
        let (tx, rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);
        sender
            .send(Event::ShipmentUpdated(Uuid::new_v4()))
            .await
            .unwrap();
        drop(sender);

        process_events(rx).await;
    }
}
