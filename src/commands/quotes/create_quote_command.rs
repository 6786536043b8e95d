use async_trait::async_trait;
use chrono::{Duration, Utc};
use sea_orm::{ActiveModelTrait, ActiveValue::Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    commands::Command,
    db::DbPool,
    errors::ServiceError,
    events::{Event, EventSender},
    models::{
        parcel::{cost_input, PackageDetails, ServiceOptions},
        quote::{self, QuoteStatus},
    },
    pricing::CostCalculator,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
pub struct Place {
    #[validate(length(min = 1, max = 120, message = "City is required"))]
    pub city: String,

    #[validate(length(min = 2, max = 80, message = "Country is required"))]
    pub country: String,
}

/// Guest quote request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
pub struct NewQuote {
    #[validate]
    pub origin: Place,

    #[validate]
    pub destination: Place,

    #[validate]
    pub package: PackageDetails,

    #[validate]
    pub service: ServiceOptions,

    #[validate(email(message = "A valid contact email is required"))]
    pub contact_email: String,

    #[validate(length(max = 255))]
    pub contact_name: Option<String>,
}

/// Prices a quote with the shared calculator and stores it as `quoted`.
pub struct CreateQuoteCommand {
    pub quote: NewQuote,
    pub calculator: Arc<dyn CostCalculator>,
    pub validity_days: i64,
}

#[async_trait]
impl Command for CreateQuoteCommand {
    type Result = quote::Model;

    #[instrument(skip(self, db_pool, event_sender))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.quote.validate()?;

        let NewQuote {
            origin,
            destination,
            package,
            service,
            contact_email,
            contact_name,
        } = self.quote.clone();

        let cost = self
            .calculator
            .calculate(&cost_input(&package, &service))
            .await?;

        let estimated_delivery_days = i32::try_from(cost.estimated_delivery_days)
            .map_err(|_| {
                ServiceError::ExternalServiceError("Delivery estimate out of range".into())
            })?;

        let now = Utc::now();
        let saved = quote::ActiveModel {
            id: Set(Uuid::new_v4()),
            origin_city: Set(origin.city),
            origin_country: Set(origin.country),
            destination_city: Set(destination.city),
            destination_country: Set(destination.country),
            package_type: Set(package.package_type),
            weight_kg: Set(package.weight_kg),
            length_cm: Set(package.length_cm),
            width_cm: Set(package.width_cm),
            height_cm: Set(package.height_cm),
            declared_value: Set(package.declared_value),
            service_type: Set(service.service_type),
            signature_required: Set(service.signature_required),
            insurance_required: Set(service.insurance_required),
            base_cost: Set(cost.base_cost),
            estimated_cost: Set(cost.total_cost),
            estimated_delivery_days: Set(estimated_delivery_days),
            contact_email: Set(contact_email.trim().to_lowercase()),
            contact_name: Set(contact_name),
            status: Set(QuoteStatus::Quoted),
            expires_at: Set(now + Duration::days(self.validity_days)),
            created_at: Set(now),
        }
        .insert(db_pool.as_ref())
        .await?;

        info!(
            quote_id = %saved.id,
            estimated_cost = %saved.estimated_cost,
            backend = self.calculator.backend(),
            "Quote created"
        );
        event_sender.send_or_log(Event::QuoteCreated(saved.id)).await;

        Ok(saved)
    }
}
