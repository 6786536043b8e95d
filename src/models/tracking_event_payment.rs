use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::lifecycle::LifecycleError;

/// Payment metadata of an exception or cancelled tracking event.
///
/// `payment_methods` holds a JSON array of catalog `method_type` values.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tracking_event_payments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(unique)]
    pub tracking_event_id: Uuid,

    pub amount: Option<Decimal>,

    pub payment_methods: String,

    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::tracking_event::Entity",
        from = "Column::TrackingEventId",
        to = "super::tracking_event::Column::Id",
        on_delete = "Cascade"
    )]
    TrackingEvent,
}

impl Related<super::tracking_event::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TrackingEvent.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Decoded method list
    pub fn methods(&self) -> Result<Vec<String>, LifecycleError> {
        serde_json::from_str(&self.payment_methods).map_err(|e| {
            LifecycleError::MalformedPaymentMethods {
                event_id: self.tracking_event_id,
                reason: e.to_string(),
            }
        })
    }
}

pub fn encode_methods(methods: &[String]) -> Result<String, serde_json::Error> {
    serde_json::to_string(methods)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn methods_decode_from_json_text() {
        let model = Model {
            id: Uuid::new_v4(),
            tracking_event_id: Uuid::new_v4(),
            amount: None,
            payment_methods: encode_methods(&["paypal".into(), "zelle".into()]).unwrap(),
            created_at: Utc::now(),
        };
        assert_eq!(model.methods().unwrap(), vec!["paypal", "zelle"]);
    }

    #[test]
    fn malformed_methods_are_an_error() {
        let model = Model {
            id: Uuid::new_v4(),
            tracking_event_id: Uuid::new_v4(),
            amount: None,
            payment_methods: "paypal,zelle".into(),
            created_at: Utc::now(),
        };
        assert!(matches!(
            model.methods(),
            Err(LifecycleError::MalformedPaymentMethods { event_id, .. }) if event_id == model.tracking_event_id
        ));
    }
}
