use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::lifecycle::LifecycleError;
use super::shipment::ShipmentStatus;
use super::tracking_event_payment;

/// One append-only entry of a shipment's tracking history.
///
/// `event_type` is stored as text and parsed on read so that a value outside
/// the status vocabulary surfaces as a data-quality error.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tracking_events")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub shipment_id: Uuid,

    /// 1-based position within the shipment's history
    pub sequence: i32,

    pub event_type: String,

    pub event_description: Option<String>,

    pub location: Option<String>,

    pub created_by: Option<Uuid>,

    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::shipment::Entity",
        from = "Column::ShipmentId",
        to = "super::shipment::Column::Id",
        on_delete = "Cascade"
    )]
    Shipment,

    #[sea_orm(has_one = "super::tracking_event_payment::Entity")]
    Payment,
}

impl Related<super::shipment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Shipment.def()
    }
}

impl Related<super::tracking_event_payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn status(&self) -> Result<ShipmentStatus, LifecycleError> {
        self.event_type.parse()
    }
}

/// Payment-resolution details as shown to guests and admins
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PaymentDetails {
    pub amount: Option<Decimal>,
    pub payment_methods: Vec<String>,
}

/// Tracking event joined with its payment details
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TrackingEventRecord {
    pub id: Uuid,
    pub shipment_id: Uuid,
    pub sequence: i32,
    pub event_type: ShipmentStatus,
    pub description: Option<String>,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
    pub payment: Option<PaymentDetails>,
}

impl TrackingEventRecord {
    /// Joins an event row with its optional payment row.
    pub fn from_rows(
        event: Model,
        payment: Option<tracking_event_payment::Model>,
    ) -> Result<Self, LifecycleError> {
        let event_type = event.status()?;
        let payment = payment
            .map(|p| {
                Ok::<_, LifecycleError>(PaymentDetails {
                    amount: p.amount,
                    payment_methods: p.methods()?,
                })
            })
            .transpose()?;

        Ok(Self {
            id: event.id,
            shipment_id: event.shipment_id,
            sequence: event.sequence,
            event_type,
            description: event.event_description,
            location: event.location,
            created_at: event.created_at,
            payment,
        })
    }
}
