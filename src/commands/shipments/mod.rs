pub mod append_tracking_event_command;
pub mod create_shipment_command;
pub mod delete_shipment_command;
pub mod update_shipment_command;

pub use append_tracking_event_command::AppendTrackingEventCommand;
pub use create_shipment_command::{CreateShipmentCommand, NewShipment, Party};
pub use delete_shipment_command::DeleteShipmentCommand;
pub use update_shipment_command::{ShipmentPatch, UpdateShipmentCommand};

use sea_orm::{DatabaseConnection, EntityTrait};
use uuid::Uuid;

use crate::{errors::ServiceError, models::profile};

pub(crate) async fn ensure_customer_exists(
    db: &DatabaseConnection,
    customer_id: Uuid,
) -> Result<(), ServiceError> {
    profile::Entity::find_by_id(customer_id)
        .one(db)
        .await?
        .map(|_| ())
        .ok_or_else(|| ServiceError::ValidationError(format!("Unknown customer {}", customer_id)))
}
