//! Per-shipment live feed of appended tracking events.
//!
//! Each shipment with at least one subscriber owns a broadcast channel.
//! Channels are created lazily on subscribe, released when the last
//! [`FeedSubscription`] drops, and closed outright when the shipment is
//! deleted so open streams end.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, trace};
use uuid::Uuid;

use crate::models::TrackingEventRecord;

#[derive(Debug)]
pub struct TrackingFeed {
    channels: DashMap<Uuid, broadcast::Sender<TrackingEventRecord>>,
    capacity: usize,
}

impl TrackingFeed {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Subscription to events appended to `shipment_id` from now on.
    pub fn subscribe(self: &Arc<Self>, shipment_id: Uuid) -> FeedSubscription {
        let capacity = self.capacity;
        let receiver = self
            .channels
            .entry(shipment_id)
            .or_insert_with(|| broadcast::channel(capacity).0)
            .subscribe();

        FeedSubscription {
            shipment_id,
            receiver: Some(receiver),
            feed: Arc::clone(self),
        }
    }

    /// Delivers `record` to current subscribers; returns how many received it.
    pub fn publish(&self, shipment_id: Uuid, record: TrackingEventRecord) -> usize {
        let delivered = match self.channels.get(&shipment_id) {
            Some(sender) => sender.send(record).unwrap_or(0),
            None => {
                trace!(%shipment_id, "no live subscribers");
                return 0;
            }
        };

        if delivered == 0 {
            self.release(shipment_id);
        }

        delivered
    }

    /// Drops the shipment's channel; subscribers see the stream end.
    pub fn close(&self, shipment_id: Uuid) -> bool {
        let closed = self.channels.remove(&shipment_id).is_some();
        if closed {
            debug!(%shipment_id, "closed tracking feed");
        }
        closed
    }

    /// Shipments that currently hold a channel
    pub fn active_channels(&self) -> usize {
        self.channels.len()
    }

    fn release(&self, shipment_id: Uuid) {
        if self
            .channels
            .remove_if(&shipment_id, |_, sender| sender.receiver_count() == 0)
            .is_some()
        {
            debug!(%shipment_id, "pruned idle tracking feed");
        }
    }
}

/// One live subscriber; releases the shipment's channel when it is the last.
#[derive(Debug)]
pub struct FeedSubscription {
    shipment_id: Uuid,
    receiver: Option<broadcast::Receiver<TrackingEventRecord>>,
    feed: Arc<TrackingFeed>,
}

impl FeedSubscription {
    pub fn shipment_id(&self) -> Uuid {
        self.shipment_id
    }

    pub async fn recv(&mut self) -> Result<TrackingEventRecord, RecvError> {
        match self.receiver.as_mut() {
            Some(receiver) => receiver.recv().await,
            None => Err(RecvError::Closed),
        }
    }
}

impl Drop for FeedSubscription {
    fn drop(&mut self) {
        // the receiver must be gone before the count is checked
        drop(self.receiver.take());
        self.feed.release(self.shipment_id);
    }
}
