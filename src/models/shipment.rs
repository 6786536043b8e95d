use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

use super::lifecycle::LifecycleError;

/// Shipment status, also the vocabulary of tracking events
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum ShipmentStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "confirmed")]
    Confirmed,
    #[sea_orm(string_value = "picked_up")]
    PickedUp,
    #[sea_orm(string_value = "in_transit")]
    InTransit,
    #[sea_orm(string_value = "out_for_delivery")]
    OutForDelivery,
    #[sea_orm(string_value = "delivered")]
    Delivered,
    #[sea_orm(string_value = "exception")]
    Exception,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl ShipmentStatus {
    pub const ALL: [ShipmentStatus; 8] = [
        ShipmentStatus::Pending,
        ShipmentStatus::Confirmed,
        ShipmentStatus::PickedUp,
        ShipmentStatus::InTransit,
        ShipmentStatus::OutForDelivery,
        ShipmentStatus::Delivered,
        ShipmentStatus::Exception,
        ShipmentStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ShipmentStatus::Pending => "pending",
            ShipmentStatus::Confirmed => "confirmed",
            ShipmentStatus::PickedUp => "picked_up",
            ShipmentStatus::InTransit => "in_transit",
            ShipmentStatus::OutForDelivery => "out_for_delivery",
            ShipmentStatus::Delivered => "delivered",
            ShipmentStatus::Exception => "exception",
            ShipmentStatus::Cancelled => "cancelled",
        }
    }

    /// Delivered and cancelled shipments accept no further events.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ShipmentStatus::Delivered | ShipmentStatus::Cancelled)
    }

    /// Exception and cancelled events carry a mandatory description and may
    /// carry payment-resolution metadata.
    pub fn accepts_payment(&self) -> bool {
        matches!(self, ShipmentStatus::Exception | ShipmentStatus::Cancelled)
    }

    /// Position on the forward progression; `None` for off-path states.
    pub fn progression_rank(&self) -> Option<u8> {
        match self {
            ShipmentStatus::Pending => Some(0),
            ShipmentStatus::Confirmed => Some(1),
            ShipmentStatus::PickedUp => Some(2),
            ShipmentStatus::InTransit => Some(3),
            ShipmentStatus::OutForDelivery => Some(4),
            ShipmentStatus::Delivered => Some(5),
            ShipmentStatus::Exception | ShipmentStatus::Cancelled => None,
        }
    }
}

impl fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShipmentStatus {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ShipmentStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| LifecycleError::UnknownStatus(s.to_string()))
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum PackageType {
    #[sea_orm(string_value = "envelope")]
    Envelope,
    #[sea_orm(string_value = "box")]
    #[serde(rename = "box")]
    Parcel,
    #[sea_orm(string_value = "tube")]
    Tube,
    #[sea_orm(string_value = "custom")]
    Custom,
}

impl fmt::Display for PackageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackageType::Envelope => write!(f, "envelope"),
            PackageType::Parcel => write!(f, "box"),
            PackageType::Tube => write!(f, "tube"),
            PackageType::Custom => write!(f, "custom"),
        }
    }
}

/// Service level, which selects the rate card line and transit days
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    #[sea_orm(string_value = "standard")]
    Standard,
    #[sea_orm(string_value = "express")]
    Express,
    #[sea_orm(string_value = "overnight")]
    Overnight,
    #[sea_orm(string_value = "international")]
    International,
}

impl ServiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Standard => "standard",
            ServiceType::Express => "express",
            ServiceType::Overnight => "overnight",
            ServiceType::International => "international",
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shipment entity model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "shipments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(unique)]
    pub tracking_number: String,

    /// Client profile the parcel belongs to
    pub customer_id: Option<Uuid>,

    pub sender_name: String,
    pub sender_email: Option<String>,
    pub sender_phone: Option<String>,
    pub sender_address: String,
    pub sender_city: String,
    pub sender_state: Option<String>,
    pub sender_postal_code: Option<String>,
    pub sender_country: String,

    pub recipient_name: String,
    pub recipient_email: Option<String>,
    pub recipient_phone: Option<String>,
    pub recipient_address: String,
    pub recipient_city: String,
    pub recipient_state: Option<String>,
    pub recipient_postal_code: Option<String>,
    pub recipient_country: String,

    pub package_type: PackageType,
    pub weight_kg: Decimal,
    pub length_cm: Option<Decimal>,
    pub width_cm: Option<Decimal>,
    pub height_cm: Option<Decimal>,
    pub declared_value: Decimal,
    pub package_description: Option<String>,

    pub service_type: ServiceType,
    pub delivery_instructions: Option<String>,
    pub signature_required: bool,
    pub insurance_required: bool,

    /// Cache of the latest tracking event type
    pub status: ShipmentStatus,

    pub base_cost: Decimal,
    pub weight_cost: Decimal,
    pub insurance_cost: Decimal,
    pub signature_cost: Decimal,
    pub tax_amount: Decimal,
    pub total_cost: Decimal,

    pub estimated_delivery_date: Option<DateTime<Utc>>,
    pub actual_delivery_date: Option<DateTime<Utc>>,

    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Database relations
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::profile::Entity",
        from = "Column::CustomerId",
        to = "super::profile::Column::Id",
        on_delete = "SetNull"
    )]
    Customer,

    #[sea_orm(has_many = "super::tracking_event::Entity")]
    TrackingEvents,

    #[sea_orm(has_many = "super::payment_proof::Entity")]
    PaymentProofs,
}

impl Related<super::profile::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customer.def()
    }
}

impl Related<super::tracking_event::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TrackingEvents.def()
    }
}

impl Related<super::payment_proof::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PaymentProofs.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Sum of the stored cost components
    pub fn component_total(&self) -> Decimal {
        self.base_cost
            + self.weight_cost
            + self.insurance_cost
            + self.signature_cost
            + self.tax_amount
    }

    /// Whether `customer_id` names the given profile
    pub fn belongs_to(&self, profile_id: Uuid) -> bool {
        self.customer_id == Some(profile_id)
    }
}

/// Delivery estimate: creation instant plus the promised transit days.
pub fn estimate_delivery(created_at: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    created_at + Duration::days(i64::from(days))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn status_round_trips_through_its_string_form() {
        for status in ShipmentStatus::ALL {
            assert_eq!(status.as_str().parse::<ShipmentStatus>().unwrap(), status);
        }
    }

    #[test]
    fn unknown_status_is_a_lifecycle_error() {
        let err = "lost_at_sea".parse::<ShipmentStatus>().unwrap_err();
        assert!(matches!(err, LifecycleError::UnknownStatus(value) if value == "lost_at_sea"));
    }

    #[test]
    fn only_delivered_and_cancelled_are_terminal() {
        let terminal: Vec<_> = ShipmentStatus::ALL
            .into_iter()
            .filter(ShipmentStatus::is_terminal)
            .collect();
        assert_eq!(
            terminal,
            vec![ShipmentStatus::Delivered, ShipmentStatus::Cancelled]
        );
    }

    #[test]
    fn estimated_delivery_adds_whole_days() {
        let created = Utc.with_ymd_and_hms(2024, 3, 30, 9, 15, 0).unwrap();
        let estimate = estimate_delivery(created, 5);
        assert_eq!(estimate, Utc.with_ymd_and_hms(2024, 4, 4, 9, 15, 0).unwrap());
    }
}
