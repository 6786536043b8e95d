use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseTransaction, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, TransactionTrait,
};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    commands::{from_transaction_error, is_unique_violation, Command},
    db::DbPool,
    errors::ServiceError,
    events::{Event, EventSender},
    models::{
        lifecycle::derive_status,
        payment_option, shipment, tracking_event,
        tracking_event_payment::{self, encode_methods},
        NewTrackingEvent, ShipmentStatus, TrackingEventRecord, TransitionPolicy,
    },
};

/// Appends one event to a shipment's history and refreshes the status cache.
///
/// The event, its payment metadata and the cached status are written in one
/// transaction; history rows are never updated.
pub struct AppendTrackingEventCommand {
    pub shipment_id: Uuid,
    pub event: NewTrackingEvent,
    pub created_by: Option<Uuid>,
    pub policy: TransitionPolicy,
}

#[async_trait]
impl Command for AppendTrackingEventCommand {
    type Result = TrackingEventRecord;

    #[instrument(
        skip(self, db_pool, event_sender),
        fields(shipment_id = %self.shipment_id, event_type = %self.event.event_type)
    )]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.event.validate()?;

        let active_methods = active_payment_methods(&db_pool).await?;
        self.event.check_contents(&active_methods)?;

        let shipment_id = self.shipment_id;
        let event = self.event.clone();
        let created_by = self.created_by;
        let policy = self.policy;

        let record = db_pool
            .transaction::<_, TrackingEventRecord, ServiceError>(|txn| {
                Box::pin(async move { append(txn, shipment_id, &event, created_by, policy).await })
            })
            .await
            .map_err(from_transaction_error)?;

        info!(sequence = record.sequence, "Tracking event appended");

        event_sender
            .send_or_log(Event::TrackingEventAppended {
                shipment_id,
                event_id: record.id,
                event_type: record.event_type,
                occurred_at: record.created_at,
            })
            .await;

        if record.event_type == ShipmentStatus::Exception {
            event_sender
                .send_or_log(Event::ShipmentException {
                    shipment_id,
                    event_id: record.id,
                    amount: record.payment.as_ref().and_then(|p| p.amount),
                })
                .await;
        }

        Ok(record)
    }
}

/// `method_type` values of the active payment-option catalog
pub(crate) async fn active_payment_methods(
    db: &DbPool,
) -> Result<HashSet<String>, ServiceError> {
    let options = payment_option::Entity::find()
        .filter(payment_option::Column::IsActive.eq(true))
        .all(db)
        .await?;

    Ok(options
        .into_iter()
        .map(|option| option.method_type.as_str().to_string())
        .collect())
}

async fn append(
    txn: &DatabaseTransaction,
    shipment_id: Uuid,
    event: &NewTrackingEvent,
    created_by: Option<Uuid>,
    policy: TransitionPolicy,
) -> Result<TrackingEventRecord, ServiceError> {
    let shipment = shipment::Entity::find_by_id(shipment_id)
        .one(txn)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound(format!("Shipment with ID {} not found", shipment_id))
        })?;

    let latest = tracking_event::Entity::find()
        .filter(tracking_event::Column::ShipmentId.eq(shipment_id))
        .order_by_desc(tracking_event::Column::Sequence)
        .one(txn)
        .await?;

    let latest_status = latest.as_ref().map(|e| e.status()).transpose()?;
    let current = derive_status(latest_status, shipment.status);
    policy.check(current, event.event_type)?;

    let sequence = latest.map(|e| e.sequence + 1).unwrap_or(1);
    let now = Utc::now();

    let inserted = tracking_event::ActiveModel {
        id: Set(Uuid::new_v4()),
        shipment_id: Set(shipment_id),
        sequence: Set(sequence),
        event_type: Set(event.event_type.as_str().to_string()),
        event_description: Set(event.trimmed_description().map(str::to_string)),
        location: Set(event
            .location
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)),
        created_by: Set(created_by),
        created_at: Set(now),
    }
    .insert(txn)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            warn!(sequence, "concurrent append detected");
            ServiceError::Conflict(
                "Another tracking event was appended concurrently; retry".to_string(),
            )
        } else {
            ServiceError::DatabaseError(e)
        }
    })?;

    let payment = match event.effective_payment() {
        Some(request) => Some(
            tracking_event_payment::ActiveModel {
                id: Set(Uuid::new_v4()),
                tracking_event_id: Set(inserted.id),
                amount: Set(request.amount),
                payment_methods: Set(encode_methods(&request.payment_methods)?),
                created_at: Set(now),
            }
            .insert(txn)
            .await?,
        ),
        None => None,
    };

    let mut cache = shipment.into_active_model();
    cache.status = Set(event.event_type);
    cache.updated_at = Set(now);
    cache.update(txn).await?;

    Ok(TrackingEventRecord::from_rows(inserted, payment)?)
}
