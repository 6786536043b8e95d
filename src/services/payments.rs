//! Exception payment resolution: the admin payment-option catalog, guest
//! proofs of payment, and their manual review.

use crate::{
    commands::shipments::append_tracking_event_command::active_payment_methods,
    db::DbPool,
    errors::ServiceError,
    events::{Event, EventSender},
    models::{
        parcel::validate_non_negative,
        payment_option::{self, PaymentMethodType},
        payment_proof::{self, ProofStatus},
        shipment, tracking_event, ShipmentStatus,
    },
    services::page_index,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder,
};
use serde::{Deserialize, Serialize};
use slog::Logger;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
pub struct NewPaymentOption {
    pub method_type: PaymentMethodType,

    #[validate(length(min = 1, max = 120, message = "Display name is required"))]
    pub display_name: String,

    #[validate(length(min = 1, max = 2000, message = "Payment details are required"))]
    pub details: String,

    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// Guest proof-of-payment form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
pub struct NewPaymentProof {
    #[validate(email(message = "A valid email is required"))]
    pub payer_email: String,

    /// `method_type` of an active payment option
    #[validate(length(min = 1, max = 40))]
    pub payment_method: String,

    #[validate(custom = "validate_non_negative")]
    pub amount: Option<Decimal>,

    /// Transaction id or file reference
    #[validate(length(min = 1, max = 500, message = "A payment reference is required"))]
    pub reference: String,

    #[validate(length(max = 1000))]
    pub note: Option<String>,
}

/// Review outcome; only `verified` or `rejected`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProofReview {
    pub status: ProofStatus,
}

#[derive(Clone)]
pub struct PaymentService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    logger: Logger,
}

impl PaymentService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, logger: Logger) -> Self {
        Self {
            db_pool,
            event_sender,
            logger,
        }
    }

    /// Catalog entries guests may pay with, oldest first
    #[instrument(skip(self))]
    pub async fn active_options(&self) -> Result<Vec<payment_option::Model>, ServiceError> {
        let options = payment_option::Entity::find()
            .filter(payment_option::Column::IsActive.eq(true))
            .order_by_asc(payment_option::Column::CreatedAt)
            .all(self.db_pool.as_ref())
            .await?;
        Ok(options)
    }

    /// Full catalog, including inactive entries
    #[instrument(skip(self))]
    pub async fn list_options(&self) -> Result<Vec<payment_option::Model>, ServiceError> {
        let options = payment_option::Entity::find()
            .order_by_asc(payment_option::Column::CreatedAt)
            .all(self.db_pool.as_ref())
            .await?;
        Ok(options)
    }

    #[instrument(skip(self))]
    pub async fn create_option(
        &self,
        option: NewPaymentOption,
    ) -> Result<payment_option::Model, ServiceError> {
        option.validate()?;

        let saved = payment_option::ActiveModel {
            id: Set(Uuid::new_v4()),
            method_type: Set(option.method_type),
            display_name: Set(option.display_name.trim().to_string()),
            details: Set(option.details.trim().to_string()),
            is_active: Set(option.is_active),
            created_at: Set(Utc::now()),
        }
        .insert(self.db_pool.as_ref())
        .await?;

        slog::info!(self.logger, "Payment option created";
            "option_id" => %saved.id,
            "method_type" => saved.method_type.as_str(),
        );
        self.event_sender
            .send_or_log(Event::PaymentOptionCreated(saved.id))
            .await;

        Ok(saved)
    }

    /// Removes a catalog entry. Events that already reference its method keep
    /// the identifier they stored.
    #[instrument(skip(self))]
    pub async fn delete_option(&self, option_id: Uuid) -> Result<(), ServiceError> {
        let result = payment_option::Entity::delete_by_id(option_id)
            .exec(self.db_pool.as_ref())
            .await?;

        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Payment option with ID {} not found",
                option_id
            )));
        }

        slog::info!(self.logger, "Payment option deleted"; "option_id" => %option_id);
        self.event_sender
            .send_or_log(Event::PaymentOptionDeleted(option_id))
            .await;
        Ok(())
    }

    /// Records a guest's proof of payment for a shipment currently in exception.
    #[instrument(skip(self, proof))]
    pub async fn submit_proof(
        &self,
        tracking_number: &str,
        proof: NewPaymentProof,
    ) -> Result<payment_proof::Model, ServiceError> {
        proof.validate()?;

        let db = self.db_pool.as_ref();
        let shipment = shipment::Entity::find()
            .filter(shipment::Column::TrackingNumber.eq(tracking_number.trim()))
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "No shipment with tracking number {}",
                    tracking_number.trim()
                ))
            })?;

        let latest = tracking_event::Entity::find()
            .filter(tracking_event::Column::ShipmentId.eq(shipment.id))
            .order_by_desc(tracking_event::Column::Sequence)
            .one(db)
            .await?;

        let exception_event = match latest {
            Some(event) if event.status()? == ShipmentStatus::Exception => event,
            _ => {
                return Err(ServiceError::InvalidOperation(
                    "Payment proofs are only accepted while the shipment is in exception"
                        .to_string(),
                ))
            }
        };

        let method = proof.payment_method.trim();
        if !active_payment_methods(db).await?.contains(method) {
            return Err(ServiceError::ValidationError(format!(
                "Unknown payment method: {}",
                method
            )));
        }

        let saved = payment_proof::ActiveModel {
            id: Set(Uuid::new_v4()),
            shipment_id: Set(shipment.id),
            tracking_event_id: Set(exception_event.id),
            payer_email: Set(proof.payer_email.trim().to_lowercase()),
            payment_method: Set(method.to_string()),
            amount: Set(proof.amount),
            reference: Set(proof.reference.trim().to_string()),
            note: Set(proof.note),
            status: Set(ProofStatus::PendingReview),
            created_at: Set(Utc::now()),
            reviewed_at: Set(None),
            reviewed_by: Set(None),
        }
        .insert(db)
        .await?;

        info!(proof_id = %saved.id, shipment_id = %shipment.id, "payment proof submitted");
        self.event_sender
            .send_or_log(Event::PaymentProofSubmitted {
                proof_id: saved.id,
                shipment_id: shipment.id,
            })
            .await;

        Ok(saved)
    }

    /// Proofs, newest first
    #[instrument(skip(self))]
    pub async fn list_proofs(
        &self,
        status: Option<ProofStatus>,
        shipment_id: Option<Uuid>,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<payment_proof::Model>, u64), ServiceError> {
        let mut query =
            payment_proof::Entity::find().order_by_desc(payment_proof::Column::CreatedAt);
        if let Some(status) = status {
            query = query.filter(payment_proof::Column::Status.eq(status));
        }
        if let Some(shipment_id) = shipment_id {
            query = query.filter(payment_proof::Column::ShipmentId.eq(shipment_id));
        }

        let paginator = query.paginate(self.db_pool.as_ref(), limit);
        let total = paginator.num_items().await?;
        let proofs = paginator.fetch_page(page_index(page)).await?;

        Ok((proofs, total))
    }

    /// Marks a pending proof verified or rejected. The shipment itself is not
    /// touched; resuming it takes a new tracking event.
    #[instrument(skip(self))]
    pub async fn review_proof(
        &self,
        proof_id: Uuid,
        review: ProofReview,
        reviewed_by: Option<Uuid>,
    ) -> Result<payment_proof::Model, ServiceError> {
        if review.status == ProofStatus::PendingReview {
            return Err(ServiceError::ValidationError(
                "A review must verify or reject the proof".to_string(),
            ));
        }

        let proof = payment_proof::Entity::find_by_id(proof_id)
            .one(self.db_pool.as_ref())
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Payment proof with ID {} not found", proof_id))
            })?;

        if proof.status != ProofStatus::PendingReview {
            return Err(ServiceError::Conflict(format!(
                "Payment proof was already {}",
                proof.status
            )));
        }

        let mut active = proof.into_active_model();
        active.status = Set(review.status);
        active.reviewed_at = Set(Some(Utc::now()));
        active.reviewed_by = Set(reviewed_by);
        let updated = active.update(self.db_pool.as_ref()).await?;

        slog::info!(self.logger, "Payment proof reviewed";
            "proof_id" => %proof_id,
            "status" => %updated.status,
        );
        self.event_sender
            .send_or_log(Event::PaymentProofReviewed {
                proof_id,
                status: updated.status,
            })
            .await;

        Ok(updated)
    }
}
