use crate::{
    commands::shipments::{
        CreateShipmentCommand, DeleteShipmentCommand, NewShipment, ShipmentPatch,
        UpdateShipmentCommand,
    },
    commands::Command,
    db::DbPool,
    errors::ServiceError,
    events::{EventSender, TrackingFeed},
    models::shipment::{self, ShipmentStatus},
    pricing::{CostCalculator, TrackingIdGenerator},
    services::{like_pattern, page_index},
};
use sea_orm::{
    ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Select,
};
use slog::Logger;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Admin list filters
#[derive(Debug, Clone, Default)]
pub struct ShipmentFilter {
    pub status: Option<ShipmentStatus>,
    pub customer_id: Option<Uuid>,
    /// Matches tracking number, sender or recipient name
    pub search: Option<String>,
}

impl ShipmentFilter {
    fn apply(&self, mut query: Select<shipment::Entity>) -> Select<shipment::Entity> {
        if let Some(status) = self.status {
            query = query.filter(shipment::Column::Status.eq(status));
        }
        if let Some(customer_id) = self.customer_id {
            query = query.filter(shipment::Column::CustomerId.eq(customer_id));
        }
        if let Some(pattern) = like_pattern(self.search.as_deref()) {
            query = query.filter(
                Condition::any()
                    .add(shipment::Column::TrackingNumber.like(pattern.clone()))
                    .add(shipment::Column::RecipientName.like(pattern.clone()))
                    .add(shipment::Column::SenderName.like(pattern)),
            );
        }
        query
    }
}

/// Service for managing shipments
#[derive(Clone)]
pub struct ShipmentService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    calculator: Arc<dyn CostCalculator>,
    tracking_ids: Arc<dyn TrackingIdGenerator>,
    feed: Arc<TrackingFeed>,
    max_attempts: u32,
    logger: Logger,
}

impl ShipmentService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        calculator: Arc<dyn CostCalculator>,
        tracking_ids: Arc<dyn TrackingIdGenerator>,
        feed: Arc<TrackingFeed>,
        max_attempts: u32,
        logger: Logger,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            calculator,
            tracking_ids,
            feed,
            max_attempts,
            logger,
        }
    }

    /// Prices and stores a shipment with the shared calculator
    #[instrument(skip(self, shipment))]
    pub async fn create_shipment(
        &self,
        shipment: NewShipment,
        created_by: Option<Uuid>,
    ) -> Result<shipment::Model, ServiceError> {
        let command = CreateShipmentCommand {
            shipment,
            created_by,
            calculator: self.calculator.clone(),
            tracking_ids: self.tracking_ids.clone(),
            max_attempts: self.max_attempts,
        };

        let created = command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await?;

        slog::info!(self.logger, "Shipment created";
            "shipment_id" => %created.id,
            "tracking_number" => &created.tracking_number,
        );
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get_shipment(&self, shipment_id: Uuid) -> Result<shipment::Model, ServiceError> {
        shipment::Entity::find_by_id(shipment_id)
            .one(self.db_pool.as_ref())
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Shipment with ID {} not found", shipment_id))
            })
    }

    /// Lists shipments, newest first
    #[instrument(skip(self))]
    pub async fn list_shipments(
        &self,
        filter: ShipmentFilter,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<shipment::Model>, u64), ServiceError> {
        let query = filter
            .apply(shipment::Entity::find())
            .order_by_desc(shipment::Column::CreatedAt);

        let paginator = query.paginate(self.db_pool.as_ref(), limit);
        let total = paginator.num_items().await?;
        let shipments = paginator.fetch_page(page_index(page)).await?;

        Ok((shipments, total))
    }

    #[instrument(skip(self))]
    pub async fn update_shipment(
        &self,
        shipment_id: Uuid,
        patch: ShipmentPatch,
    ) -> Result<shipment::Model, ServiceError> {
        let command = UpdateShipmentCommand { shipment_id, patch };
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    /// Deletes a shipment and its history, ending any live streams on it;
    /// returns the number of events removed
    #[instrument(skip(self))]
    pub async fn delete_shipment(&self, shipment_id: Uuid) -> Result<u64, ServiceError> {
        let removed = DeleteShipmentCommand { shipment_id }
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await?;
        self.feed.close(shipment_id);

        slog::warn!(self.logger, "Shipment deleted";
            "shipment_id" => %shipment_id,
            "events_removed" => removed,
        );
        Ok(removed)
    }

    /// Shipments addressed to one client profile
    #[instrument(skip(self))]
    pub async fn list_customer_shipments(
        &self,
        customer_id: Uuid,
        status: Option<ShipmentStatus>,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<shipment::Model>, u64), ServiceError> {
        let filter = ShipmentFilter {
            status,
            customer_id: Some(customer_id),
            search: None,
        };
        self.list_shipments(filter, page, limit).await
    }

    /// A client's own shipment; someone else's reads as not found
    #[instrument(skip(self))]
    pub async fn get_customer_shipment(
        &self,
        customer_id: Uuid,
        shipment_id: Uuid,
    ) -> Result<shipment::Model, ServiceError> {
        let shipment = self.get_shipment(shipment_id).await?;
        if !shipment.belongs_to(customer_id) {
            return Err(ServiceError::NotFound(format!(
                "Shipment with ID {} not found",
                shipment_id
            )));
        }
        Ok(shipment)
    }
}
