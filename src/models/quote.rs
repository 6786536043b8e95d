use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::Condition;
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

use super::shipment::{PackageType, ServiceType};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "quoted")]
    Quoted,
    #[sea_orm(string_value = "accepted")]
    Accepted,
    #[sea_orm(string_value = "expired")]
    Expired,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl fmt::Display for QuoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuoteStatus::Pending => write!(f, "pending"),
            QuoteStatus::Quoted => write!(f, "quoted"),
            QuoteStatus::Accepted => write!(f, "accepted"),
            QuoteStatus::Expired => write!(f, "expired"),
            QuoteStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A guest price quote, priced by the same calculator as shipments
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "quotes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub origin_city: String,
    pub origin_country: String,
    pub destination_city: String,
    pub destination_country: String,

    pub package_type: PackageType,
    pub weight_kg: Decimal,
    pub length_cm: Option<Decimal>,
    pub width_cm: Option<Decimal>,
    pub height_cm: Option<Decimal>,
    pub declared_value: Decimal,

    pub service_type: ServiceType,
    pub signature_required: bool,
    pub insurance_required: bool,

    pub base_cost: Decimal,
    pub estimated_cost: Decimal,
    pub estimated_delivery_days: i32,

    pub contact_email: String,
    pub contact_name: Option<String>,

    pub status: QuoteStatus,

    pub expires_at: DateTime<Utc>,

    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Status as of `now`: an open quote past `expires_at` reads as expired.
    pub fn effective_status(&self, now: DateTime<Utc>) -> QuoteStatus {
        match self.status {
            QuoteStatus::Pending | QuoteStatus::Quoted if now >= self.expires_at => {
                QuoteStatus::Expired
            }
            status => status,
        }
    }
}

impl QuoteStatus {
    /// Rows whose [`Model::effective_status`] at `now` is `self`
    pub fn effective_condition(self, now: DateTime<Utc>) -> Condition {
        match self {
            QuoteStatus::Expired => Condition::any()
                .add(Column::Status.eq(QuoteStatus::Expired))
                .add(
                    Condition::all()
                        .add(Column::Status.is_in([QuoteStatus::Pending, QuoteStatus::Quoted]))
                        .add(Column::ExpiresAt.lte(now)),
                ),
            QuoteStatus::Pending | QuoteStatus::Quoted => Condition::all()
                .add(Column::Status.eq(self))
                .add(Column::ExpiresAt.gt(now)),
            other => Condition::all().add(Column::Status.eq(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn quote(status: QuoteStatus, expires_in: Duration) -> Model {
        let now = Utc::now();
        Model {
            id: Uuid::new_v4(),
            origin_city: "Lagos".into(),
            origin_country: "NG".into(),
            destination_city: "Accra".into(),
            destination_country: "GH".into(),
            package_type: PackageType::Parcel,
            weight_kg: dec!(2),
            length_cm: None,
            width_cm: None,
            height_cm: None,
            declared_value: dec!(0),
            service_type: ServiceType::Standard,
            signature_required: false,
            insurance_required: false,
            base_cost: dec!(15),
            estimated_cost: dec!(21.60),
            estimated_delivery_days: 5,
            contact_email: "guest@example.com".into(),
            contact_name: None,
            status,
            expires_at: now + expires_in,
            created_at: now,
        }
    }

    #[test]
    fn open_quote_past_expiry_reads_as_expired() {
        let q = quote(QuoteStatus::Quoted, Duration::days(-1));
        assert_eq!(q.effective_status(Utc::now()), QuoteStatus::Expired);
    }

    #[test]
    fn accepted_quote_keeps_its_status_after_expiry() {
        let q = quote(QuoteStatus::Accepted, Duration::days(-1));
        assert_eq!(q.effective_status(Utc::now()), QuoteStatus::Accepted);
    }

    #[test]
    fn expired_filter_includes_stale_open_quotes() {
        use sea_orm::{DbBackend, QueryFilter, QueryTrait};

        let sql = Entity::find()
            .filter(QuoteStatus::Expired.effective_condition(Utc::now()))
            .build(DbBackend::Sqlite)
            .to_string();
        assert!(sql.contains(r#""status" = 'expired' OR"#), "{}", sql);
        assert!(sql.contains(r#""expires_at" <="#), "{}", sql);

        let sql = Entity::find()
            .filter(QuoteStatus::Quoted.effective_condition(Utc::now()))
            .build(DbBackend::Sqlite)
            .to_string();
        assert!(sql.contains(r#""expires_at" >"#), "{}", sql);
    }

    #[test]
    fn fresh_quote_is_quoted() {
        let q = quote(QuoteStatus::Quoted, Duration::days(7));
        assert_eq!(q.effective_status(Utc::now()), QuoteStatus::Quoted);
    }
}
