use async_trait::async_trait;
use sea_orm::{
    ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, QuerySelect, TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    commands::{from_transaction_error, Command},
    db::DbPool,
    errors::ServiceError,
    events::{Event, EventSender},
    models::{payment_proof, shipment, tracking_event, tracking_event_payment},
};

/// Removes a shipment together with its tracking history. Irreversible.
pub struct DeleteShipmentCommand {
    pub shipment_id: Uuid,
}

#[async_trait]
impl Command for DeleteShipmentCommand {
    /// Number of tracking events removed with the shipment
    type Result = u64;

    #[instrument(skip(self, db_pool, event_sender), fields(shipment_id = %self.shipment_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let shipment_id = self.shipment_id;

        let events_removed = db_pool
            .transaction::<_, u64, ServiceError>(|txn| {
                Box::pin(async move { delete_with_history(txn, shipment_id).await })
            })
            .await
            .map_err(from_transaction_error)?;

        info!(events_removed, "Shipment deleted");
        event_sender
            .send_or_log(Event::ShipmentDeleted {
                shipment_id,
                events_removed,
            })
            .await;

        Ok(events_removed)
    }
}

/// Deletes children explicitly so the cascade does not depend on the
/// backend enforcing foreign keys.
async fn delete_with_history(
    txn: &DatabaseTransaction,
    shipment_id: Uuid,
) -> Result<u64, ServiceError> {
    shipment::Entity::find_by_id(shipment_id)
        .one(txn)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound(format!("Shipment with ID {} not found", shipment_id))
        })?;

    let event_ids: Vec<Uuid> = tracking_event::Entity::find()
        .select_only()
        .column(tracking_event::Column::Id)
        .filter(tracking_event::Column::ShipmentId.eq(shipment_id))
        .into_tuple()
        .all(txn)
        .await?;

    if !event_ids.is_empty() {
        tracking_event_payment::Entity::delete_many()
            .filter(tracking_event_payment::Column::TrackingEventId.is_in(event_ids.clone()))
            .exec(txn)
            .await?;
    }

    payment_proof::Entity::delete_many()
        .filter(payment_proof::Column::ShipmentId.eq(shipment_id))
        .exec(txn)
        .await?;

    let removed = tracking_event::Entity::delete_many()
        .filter(tracking_event::Column::ShipmentId.eq(shipment_id))
        .exec(txn)
        .await?
        .rows_affected;

    shipment::Entity::delete_by_id(shipment_id).exec(txn).await?;

    Ok(removed)
}
