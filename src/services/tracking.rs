use crate::{
    commands::shipments::AppendTrackingEventCommand,
    commands::Command,
    db::DbPool,
    errors::ServiceError,
    events::{EventSender, FeedSubscription, TrackingFeed},
    models::{
        lifecycle::{derive_status, progress_position},
        payment_option, shipment, tracking_event, tracking_event_payment, NewTrackingEvent,
        ShipmentStatus, TrackingEventRecord, TransitionPolicy,
    },
};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use slog::Logger;
use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

/// What a guest sees for a shipment in exception
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentResolution {
    /// The exception event the payment answers
    pub event_id: Uuid,
    pub amount: Option<Decimal>,
    pub payment_methods: Vec<String>,
    /// Active payment-option catalog
    pub options: Vec<payment_option::Model>,
    pub can_make_payment: bool,
}

/// Guest tracker page, assembled from the event log
#[derive(Debug, Clone)]
pub struct TrackerView {
    pub shipment: shipment::Model,
    /// Full history, oldest first
    pub events: Vec<TrackingEventRecord>,
    pub current_status: ShipmentStatus,
    pub progress: Option<usize>,
    pub payment: Option<PaymentResolution>,
}

impl TrackerView {
    pub fn latest_event(&self) -> Option<&TrackingEventRecord> {
        self.events.last()
    }
}

/// Tracking history, the guest tracker and the live feed
#[derive(Clone)]
pub struct TrackingService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    feed: Arc<TrackingFeed>,
    policy: TransitionPolicy,
    logger: Logger,
}

impl TrackingService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        feed: Arc<TrackingFeed>,
        policy: TransitionPolicy,
        logger: Logger,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            feed,
            policy,
            logger,
        }
    }

    /// Appends an event and pushes it to live subscribers once committed
    #[instrument(skip(self, event), fields(event_type = %event.event_type))]
    pub async fn append_event(
        &self,
        shipment_id: Uuid,
        event: NewTrackingEvent,
        created_by: Option<Uuid>,
    ) -> Result<TrackingEventRecord, ServiceError> {
        let command = AppendTrackingEventCommand {
            shipment_id,
            event,
            created_by,
            policy: self.policy,
        };

        let record = command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await?;

        let delivered = self.feed.publish(shipment_id, record.clone());
        slog::info!(self.logger, "Tracking event appended";
            "shipment_id" => %shipment_id,
            "event_type" => record.event_type.as_str(),
            "sequence" => record.sequence,
            "subscribers" => delivered,
        );

        Ok(record)
    }

    /// History of one shipment, oldest first, joined with payment details
    #[instrument(skip(self))]
    pub async fn history(
        &self,
        shipment_id: Uuid,
    ) -> Result<Vec<TrackingEventRecord>, ServiceError> {
        let rows = tracking_event::Entity::find()
            .filter(tracking_event::Column::ShipmentId.eq(shipment_id))
            .order_by_asc(tracking_event::Column::Sequence)
            .find_also_related(tracking_event_payment::Entity)
            .all(self.db_pool.as_ref())
            .await?;

        rows.into_iter()
            .map(|(event, payment)| {
                TrackingEventRecord::from_rows(event, payment).map_err(|e| {
                    slog::error!(self.logger, "Unreadable tracking event";
                        "shipment_id" => %shipment_id,
                        "error" => %e,
                    );
                    ServiceError::from(e)
                })
            })
            .collect()
    }

    /// History of a shipment that must exist
    #[instrument(skip(self))]
    pub async fn shipment_history(
        &self,
        shipment_id: Uuid,
    ) -> Result<Vec<TrackingEventRecord>, ServiceError> {
        shipment::Entity::find_by_id(shipment_id)
            .one(self.db_pool.as_ref())
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Shipment with ID {} not found", shipment_id))
            })?;
        self.history(shipment_id).await
    }

    /// Public tracker page for a tracking number
    #[instrument(skip(self))]
    pub async fn tracker_view(&self, tracking_number: &str) -> Result<TrackerView, ServiceError> {
        let shipment = self.shipment_by_tracking_number(tracking_number).await?;
        let events = self.history(shipment.id).await?;

        let latest = events.last();
        let current_status = derive_status(latest.map(|e| e.event_type), shipment.status);
        let progress = progress_position(events.len());

        let payment = match latest {
            Some(event) if event.event_type == ShipmentStatus::Exception => {
                let options = self.active_options().await?;
                let (amount, payment_methods) = event
                    .payment
                    .as_ref()
                    .map(|p| (p.amount, p.payment_methods.clone()))
                    .unwrap_or_default();

                Some(PaymentResolution {
                    event_id: event.id,
                    amount,
                    payment_methods,
                    can_make_payment: !options.is_empty(),
                    options,
                })
            }
            _ => None,
        };

        Ok(TrackerView {
            shipment,
            events,
            current_status,
            progress,
            payment,
        })
    }

    /// Live feed of events appended to the shipment with this tracking number
    #[instrument(skip(self))]
    pub async fn subscribe(
        &self,
        tracking_number: &str,
    ) -> Result<FeedSubscription, ServiceError> {
        let shipment = self.shipment_by_tracking_number(tracking_number).await?;
        let subscription = self.feed.subscribe(shipment.id);
        debug!(shipment_id = %shipment.id, "live tracking subscriber attached");
        Ok(subscription)
    }

    async fn shipment_by_tracking_number(
        &self,
        tracking_number: &str,
    ) -> Result<shipment::Model, ServiceError> {
        let tracking_number = tracking_number.trim();
        shipment::Entity::find()
            .filter(shipment::Column::TrackingNumber.eq(tracking_number))
            .one(self.db_pool.as_ref())
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "No shipment with tracking number {}",
                    tracking_number
                ))
            })
    }

    async fn active_options(&self) -> Result<Vec<payment_option::Model>, ServiceError> {
        let options = payment_option::Entity::find()
            .filter(payment_option::Column::IsActive.eq(true))
            .order_by_asc(payment_option::Column::CreatedAt)
            .all(self.db_pool.as_ref())
            .await?;
        Ok(options)
    }
}
