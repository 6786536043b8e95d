use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, EntityTrait, IntoActiveModel};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    commands::{shipments::ensure_customer_exists, Command},
    db::DbPool,
    errors::ServiceError,
    events::{Event, EventSender},
    models::{parcel::validate_cost_line, shipment},
};

/// Admin edit form. Absent fields are left untouched.
///
/// Status is not editable here: it only changes by appending a tracking event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
pub struct ShipmentPatch {
    pub customer_id: Option<Uuid>,

    #[validate(length(min = 1, max = 255))]
    pub sender_name: Option<String>,
    #[validate(email)]
    pub sender_email: Option<String>,
    pub sender_phone: Option<String>,
    #[validate(length(min = 1, max = 500))]
    pub sender_address: Option<String>,
    #[validate(length(min = 1, max = 120))]
    pub sender_city: Option<String>,
    pub sender_state: Option<String>,
    pub sender_postal_code: Option<String>,
    #[validate(length(min = 2, max = 80))]
    pub sender_country: Option<String>,

    #[validate(length(min = 1, max = 255))]
    pub recipient_name: Option<String>,
    #[validate(email)]
    pub recipient_email: Option<String>,
    pub recipient_phone: Option<String>,
    #[validate(length(min = 1, max = 500))]
    pub recipient_address: Option<String>,
    #[validate(length(min = 1, max = 120))]
    pub recipient_city: Option<String>,
    pub recipient_state: Option<String>,
    pub recipient_postal_code: Option<String>,
    #[validate(length(min = 2, max = 80))]
    pub recipient_country: Option<String>,

    #[validate(length(max = 500))]
    pub package_description: Option<String>,
    #[validate(length(max = 1000))]
    pub delivery_instructions: Option<String>,

    #[validate(custom = "validate_cost_line")]
    pub base_cost: Option<Decimal>,
    #[validate(custom = "validate_cost_line")]
    pub weight_cost: Option<Decimal>,
    #[validate(custom = "validate_cost_line")]
    pub insurance_cost: Option<Decimal>,
    #[validate(custom = "validate_cost_line")]
    pub signature_cost: Option<Decimal>,
    #[validate(custom = "validate_cost_line")]
    pub tax_amount: Option<Decimal>,

    pub estimated_delivery_date: Option<DateTime<Utc>>,
    pub actual_delivery_date: Option<DateTime<Utc>>,
}

impl ShipmentPatch {
    fn touches_costs(&self) -> bool {
        self.base_cost.is_some()
            || self.weight_cost.is_some()
            || self.insurance_cost.is_some()
            || self.signature_cost.is_some()
            || self.tax_amount.is_some()
    }
}

/// Last-writer-wins edit of a shipment's descriptive fields and cost lines.
pub struct UpdateShipmentCommand {
    pub shipment_id: Uuid,
    pub patch: ShipmentPatch,
}

#[async_trait]
impl Command for UpdateShipmentCommand {
    type Result = shipment::Model;

    #[instrument(skip(self, db_pool, event_sender), fields(shipment_id = %self.shipment_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.patch.validate()?;
        if let Some(customer_id) = self.patch.customer_id {
            ensure_customer_exists(&db_pool, customer_id).await?;
        }

        let current = shipment::Entity::find_by_id(self.shipment_id)
            .one(db_pool.as_ref())
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Shipment with ID {} not found", self.shipment_id))
            })?;

        let updated = self
            .apply(current)
            .update(db_pool.as_ref())
            .await?;

        info!(total_cost = %updated.total_cost, "Shipment updated");
        event_sender
            .send_or_log(Event::ShipmentUpdated(updated.id))
            .await;

        Ok(updated)
    }
}

impl UpdateShipmentCommand {
    fn apply(&self, current: shipment::Model) -> shipment::ActiveModel {
        let patch = self.patch.clone();
        let recompute_total = patch.touches_costs();

        let base_cost = patch.base_cost.unwrap_or(current.base_cost);
        let weight_cost = patch.weight_cost.unwrap_or(current.weight_cost);
        let insurance_cost = patch.insurance_cost.unwrap_or(current.insurance_cost);
        let signature_cost = patch.signature_cost.unwrap_or(current.signature_cost);
        let tax_amount = patch.tax_amount.unwrap_or(current.tax_amount);

        let mut model = current.into_active_model();

        macro_rules! set_some {
            ($($field:ident),+ $(,)?) => {
                $(if let Some(value) = patch.$field {
                    model.$field = Set(value);
                })+
            };
        }
        macro_rules! set_optional {
            ($($field:ident),+ $(,)?) => {
                $(if let Some(value) = patch.$field {
                    model.$field = Set(Some(value));
                })+
            };
        }

        set_some!(
            sender_name,
            sender_address,
            sender_city,
            sender_country,
            recipient_name,
            recipient_address,
            recipient_city,
            recipient_country,
        );
        set_optional!(
            customer_id,
            sender_email,
            sender_phone,
            sender_state,
            sender_postal_code,
            recipient_email,
            recipient_phone,
            recipient_state,
            recipient_postal_code,
            package_description,
            delivery_instructions,
            estimated_delivery_date,
            actual_delivery_date,
        );

        if recompute_total {
            model.base_cost = Set(base_cost);
            model.weight_cost = Set(weight_cost);
            model.insurance_cost = Set(insurance_cost);
            model.signature_cost = Set(signature_cost);
            model.tax_amount = Set(tax_amount);
            model.total_cost =
                Set(base_cost + weight_cost + insurance_cost + signature_cost + tax_amount);
        }

        model.updated_at = Set(Utc::now());
        model
    }
}
