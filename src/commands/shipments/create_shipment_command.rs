use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    commands::{is_unique_violation, shipments::ensure_customer_exists, Command},
    db::DbPool,
    errors::ServiceError,
    events::{Event, EventSender},
    models::{
        parcel::{cost_input, PackageDetails, ServiceOptions},
        shipment::{self, estimate_delivery, ShipmentStatus},
    },
    pricing::{CostBreakdown, CostCalculator, TrackingIdGenerator},
};

/// Sender or recipient of a parcel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
pub struct Party {
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,

    #[validate(email)]
    pub email: Option<String>,

    #[validate(length(max = 50))]
    pub phone: Option<String>,

    #[validate(length(min = 1, max = 500, message = "Address is required"))]
    pub address: String,

    #[validate(length(min = 1, max = 120, message = "City is required"))]
    pub city: String,

    pub state: Option<String>,

    pub postal_code: Option<String>,

    #[validate(length(min = 2, max = 80, message = "Country is required"))]
    pub country: String,
}

/// Admin shipment-creation form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
pub struct NewShipment {
    /// Client profile the parcel belongs to
    pub customer_id: Option<Uuid>,

    #[validate]
    pub sender: Party,

    #[validate]
    pub recipient: Party,

    #[validate]
    pub package: PackageDetails,

    #[validate]
    pub service: ServiceOptions,

    /// Status reported until the first tracking event; defaults to pending
    #[serde(default)]
    pub initial_status: Option<ShipmentStatus>,
}

/// Prices and stores a new shipment under a fresh tracking number.
pub struct CreateShipmentCommand {
    pub shipment: NewShipment,
    pub created_by: Option<Uuid>,
    pub calculator: Arc<dyn CostCalculator>,
    pub tracking_ids: Arc<dyn TrackingIdGenerator>,
    pub max_attempts: u32,
}

#[async_trait]
impl Command for CreateShipmentCommand {
    type Result = shipment::Model;

    #[instrument(skip(self, db_pool, event_sender), fields(created_by = ?self.created_by))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.shipment.validate().map_err(|e| {
            warn!("Validation failed: {}", e);
            ServiceError::from(e)
        })?;

        let initial_status = self.initial_status()?;
        if let Some(customer_id) = self.shipment.customer_id {
            ensure_customer_exists(&db_pool, customer_id).await?;
        }

        let cost = self
            .calculator
            .calculate(&cost_input(&self.shipment.package, &self.shipment.service))
            .await?;

        let saved = self
            .insert_with_fresh_tracking_number(&db_pool, initial_status, &cost)
            .await?;

        info!(
            shipment_id = %saved.id,
            tracking_number = %saved.tracking_number,
            total_cost = %saved.total_cost,
            backend = self.calculator.backend(),
            "Shipment created"
        );

        event_sender
            .send_or_log(Event::ShipmentCreated {
                shipment_id: saved.id,
                tracking_number: saved.tracking_number.clone(),
            })
            .await;

        Ok(saved)
    }
}

impl CreateShipmentCommand {
    fn initial_status(&self) -> Result<ShipmentStatus, ServiceError> {
        let status = self.shipment.initial_status.unwrap_or(ShipmentStatus::Pending);
        if status.is_terminal() || status.accepts_payment() {
            return Err(ServiceError::ValidationError(format!(
                "A shipment cannot be created in status {}",
                status
            )));
        }
        Ok(status)
    }

    /// Generates tracking numbers until one is unused, up to `max_attempts`.
    async fn insert_with_fresh_tracking_number(
        &self,
        db: &DatabaseConnection,
        status: ShipmentStatus,
        cost: &CostBreakdown,
    ) -> Result<shipment::Model, ServiceError> {
        let attempts = self.max_attempts.max(1);

        for attempt in 1..=attempts {
            let tracking_number = self.tracking_ids.generate().await?;

            let taken = shipment::Entity::find()
                .filter(shipment::Column::TrackingNumber.eq(tracking_number.as_str()))
                .count(db)
                .await?
                > 0;
            if taken {
                warn!(%tracking_number, attempt, "tracking number collision");
                continue;
            }

            match self
                .build_model(tracking_number.clone(), status, cost)
                .insert(db)
                .await
            {
                Ok(model) => return Ok(model),
                Err(e) if is_unique_violation(&e) => {
                    warn!(%tracking_number, attempt, "tracking number taken concurrently");
                }
                Err(e) => {
                    error!("Failed to create shipment: {}", e);
                    return Err(ServiceError::DatabaseError(e));
                }
            }
        }

        Err(ServiceError::Conflict(format!(
            "Could not allocate a unique tracking number after {} attempts",
            attempts
        )))
    }

    fn build_model(
        &self,
        tracking_number: String,
        status: ShipmentStatus,
        cost: &CostBreakdown,
    ) -> shipment::ActiveModel {
        let now = Utc::now();
        let NewShipment {
            customer_id,
            sender,
            recipient,
            package,
            service,
            ..
        } = self.shipment.clone();

        shipment::ActiveModel {
            id: Set(Uuid::new_v4()),
            tracking_number: Set(tracking_number),
            customer_id: Set(customer_id),
            sender_name: Set(sender.name),
            sender_email: Set(sender.email),
            sender_phone: Set(sender.phone),
            sender_address: Set(sender.address),
            sender_city: Set(sender.city),
            sender_state: Set(sender.state),
            sender_postal_code: Set(sender.postal_code),
            sender_country: Set(sender.country),
            recipient_name: Set(recipient.name),
            recipient_email: Set(recipient.email),
            recipient_phone: Set(recipient.phone),
            recipient_address: Set(recipient.address),
            recipient_city: Set(recipient.city),
            recipient_state: Set(recipient.state),
            recipient_postal_code: Set(recipient.postal_code),
            recipient_country: Set(recipient.country),
            package_type: Set(package.package_type),
            weight_kg: Set(package.weight_kg),
            length_cm: Set(package.length_cm),
            width_cm: Set(package.width_cm),
            height_cm: Set(package.height_cm),
            declared_value: Set(package.declared_value),
            package_description: Set(package.description),
            service_type: Set(service.service_type),
            delivery_instructions: Set(service.delivery_instructions),
            signature_required: Set(service.signature_required),
            insurance_required: Set(service.insurance_required),
            status: Set(status),
            base_cost: Set(cost.base_cost),
            weight_cost: Set(cost.weight_cost),
            insurance_cost: Set(cost.insurance_cost),
            signature_cost: Set(cost.signature_cost),
            tax_amount: Set(cost.tax_amount),
            total_cost: Set(cost.total_cost),
            estimated_delivery_date: Set(Some(estimate_delivery(
                now,
                cost.estimated_delivery_days,
            ))),
            actual_delivery_date: Set(None),
            created_by: Set(self.created_by),
            created_at: Set(now),
            updated_at: Set(now),
        }
    }
}
