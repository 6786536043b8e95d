//! Shipment lifecycle rules.
//!
//! The tracking-event log is the source of truth for a shipment's status. The
//! rules here decide which event may follow the current status, what an event
//! must carry, and where the guest tracker's progress bar sits.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::shipment::ShipmentStatus;
use crate::config::LifecycleConfig;

/// Labels of the guest tracker's fixed progress bar
pub const PROGRESS_STEPS: [&str; 5] = [
    "created",
    "picked_up",
    "in_transit",
    "out_for_delivery",
    "delivered",
];

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("Illegal transition: {from} -> {to}")]
    IllegalTransition {
        from: ShipmentStatus,
        to: ShipmentStatus,
    },

    #[error("A description is required for {0} events")]
    MissingDescription(ShipmentStatus),

    #[error("Payment details are only accepted on exception or cancelled events, not {0}")]
    PaymentNotAllowed(ShipmentStatus),

    #[error("Payment amount cannot be negative")]
    NegativeAmount,

    #[error("Unknown payment method: {0}")]
    UnknownPaymentMethod(String),

    #[error("Unknown shipment status '{0}'")]
    UnknownStatus(String),

    #[error("Stored payment methods for event {event_id} are unreadable: {reason}")]
    MalformedPaymentMethods { event_id: Uuid, reason: String },
}

/// Whether appends are checked against the canonical progression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionPolicy {
    /// Terminal states are final and the progression only moves forward,
    /// except through `exception`
    Enforced,
    /// Any event may follow any other; ordering is left to the operator
    Permissive,
}

impl TransitionPolicy {
    pub fn from_config(config: &LifecycleConfig) -> Self {
        if config.enforce_transitions {
            TransitionPolicy::Enforced
        } else {
            TransitionPolicy::Permissive
        }
    }

    pub fn check(&self, from: ShipmentStatus, to: ShipmentStatus) -> Result<(), LifecycleError> {
        match self {
            TransitionPolicy::Permissive => Ok(()),
            TransitionPolicy::Enforced if is_forward_transition(from, to) => Ok(()),
            TransitionPolicy::Enforced => Err(LifecycleError::IllegalTransition { from, to }),
        }
    }
}

/// The enforced transition relation.
///
/// Repeating a step (several `in_transit` scans) is allowed. From `exception`
/// the shipment may resume at any step except `pending`.
pub fn is_forward_transition(from: ShipmentStatus, to: ShipmentStatus) -> bool {
    if from.is_terminal() {
        return false;
    }

    match (from, to) {
        (_, ShipmentStatus::Exception) | (_, ShipmentStatus::Cancelled) => true,
        (ShipmentStatus::Exception, ShipmentStatus::Pending) => false,
        (ShipmentStatus::Exception, _) => true,
        (from, to) => match (from.progression_rank(), to.progression_rank()) {
            (Some(current), Some(next)) => next >= current,
            _ => false,
        },
    }
}

/// Payment-resolution metadata attached to an exception or cancelled event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PaymentRequest {
    /// Amount the customer must settle
    pub amount: Option<Decimal>,
    /// Identifiers (`method_type` values) from the active payment-option catalog
    #[serde(default)]
    pub payment_methods: Vec<String>,
}

impl PaymentRequest {
    pub fn is_empty(&self) -> bool {
        self.amount.is_none() && self.payment_methods.is_empty()
    }
}

/// Input for appending one tracking event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
pub struct NewTrackingEvent {
    pub event_type: ShipmentStatus,

    #[validate(length(max = 1000, message = "Description cannot exceed 1000 characters"))]
    pub description: Option<String>,

    #[validate(length(max = 255, message = "Location cannot exceed 255 characters"))]
    pub location: Option<String>,

    #[serde(default)]
    pub payment: Option<PaymentRequest>,
}

impl NewTrackingEvent {
    pub fn new(event_type: ShipmentStatus) -> Self {
        Self {
            event_type,
            description: None,
            location: None,
            payment: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_payment(mut self, payment: PaymentRequest) -> Self {
        self.payment = Some(payment);
        self
    }

    /// Description with surrounding whitespace removed; blank counts as absent.
    pub fn trimmed_description(&self) -> Option<&str> {
        self.description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
    }

    /// Payment metadata, dropping an all-empty block
    pub fn effective_payment(&self) -> Option<&PaymentRequest> {
        self.payment.as_ref().filter(|p| !p.is_empty())
    }

    /// Checks everything that can be decided before any write.
    ///
    /// `active_methods` holds the `method_type` values of active catalog entries.
    pub fn check_contents(&self, active_methods: &HashSet<String>) -> Result<(), LifecycleError> {
        if self.event_type.accepts_payment() && self.trimmed_description().is_none() {
            return Err(LifecycleError::MissingDescription(self.event_type));
        }

        let Some(payment) = self.effective_payment() else {
            return Ok(());
        };

        if !self.event_type.accepts_payment() {
            return Err(LifecycleError::PaymentNotAllowed(self.event_type));
        }

        if payment.amount.is_some_and(|amount| amount.is_sign_negative()) {
            return Err(LifecycleError::NegativeAmount);
        }

        if let Some(unknown) = payment
            .payment_methods
            .iter()
            .find(|method| !active_methods.contains(method.as_str()))
        {
            return Err(LifecycleError::UnknownPaymentMethod(unknown.clone()));
        }

        Ok(())
    }
}

/// Index into [`PROGRESS_STEPS`] for a history of `event_count` events.
///
/// Counts events rather than inspecting their types, so a history with an
/// exception still advances the bar.
pub fn progress_position(event_count: usize) -> Option<usize> {
    event_count
        .checked_sub(1)
        .map(|position| position.min(PROGRESS_STEPS.len() - 1))
}

/// Current status: the latest event's type, or the creation status when the
/// log is empty.
pub fn derive_status(
    latest_event: Option<ShipmentStatus>,
    creation_status: ShipmentStatus,
) -> ShipmentStatus {
    latest_event.unwrap_or(creation_status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    fn catalog(methods: &[&str]) -> HashSet<String> {
        methods.iter().map(|m| m.to_string()).collect()
    }

    #[test]
    fn terminal_states_reject_every_follow_up() {
        for next in ShipmentStatus::ALL {
            assert!(!is_forward_transition(ShipmentStatus::Delivered, next));
            assert!(!is_forward_transition(ShipmentStatus::Cancelled, next));
        }
    }

    #[test]
    fn backward_moves_are_rejected_but_repeats_are_allowed() {
        assert!(!is_forward_transition(
            ShipmentStatus::OutForDelivery,
            ShipmentStatus::PickedUp
        ));
        assert!(is_forward_transition(
            ShipmentStatus::InTransit,
            ShipmentStatus::InTransit
        ));
        assert!(is_forward_transition(
            ShipmentStatus::Pending,
            ShipmentStatus::Delivered
        ));
    }

    #[test]
    fn exception_can_resume_anywhere_but_pending() {
        assert!(is_forward_transition(
            ShipmentStatus::Exception,
            ShipmentStatus::PickedUp
        ));
        assert!(is_forward_transition(
            ShipmentStatus::Exception,
            ShipmentStatus::Delivered
        ));
        assert!(!is_forward_transition(
            ShipmentStatus::Exception,
            ShipmentStatus::Pending
        ));
    }

    #[test]
    fn permissive_policy_accepts_leaving_terminal_state() {
        assert!(TransitionPolicy::Permissive
            .check(ShipmentStatus::Delivered, ShipmentStatus::InTransit)
            .is_ok());
        assert_matches!(
            TransitionPolicy::Enforced.check(ShipmentStatus::Delivered, ShipmentStatus::InTransit),
            Err(LifecycleError::IllegalTransition { .. })
        );
    }

    #[test]
    fn exception_without_description_is_rejected() {
        let event = NewTrackingEvent::new(ShipmentStatus::Exception).with_description("   ");
        assert_eq!(
            event.check_contents(&catalog(&[])),
            Err(LifecycleError::MissingDescription(ShipmentStatus::Exception))
        );
    }

    #[test]
    fn payment_on_regular_event_is_rejected() {
        let event = NewTrackingEvent::new(ShipmentStatus::InTransit).with_payment(PaymentRequest {
            amount: Some(dec!(10)),
            payment_methods: vec![],
        });
        assert_eq!(
            event.check_contents(&catalog(&["paypal"])),
            Err(LifecycleError::PaymentNotAllowed(ShipmentStatus::InTransit))
        );
    }

    #[test]
    fn payment_checks_amount_and_methods() {
        let base = NewTrackingEvent::new(ShipmentStatus::Exception).with_description("Customs hold");

        let negative = base.clone().with_payment(PaymentRequest {
            amount: Some(dec!(-1)),
            payment_methods: vec!["paypal".into()],
        });
        assert_eq!(
            negative.check_contents(&catalog(&["paypal"])),
            Err(LifecycleError::NegativeAmount)
        );

        let unknown = base.clone().with_payment(PaymentRequest {
            amount: Some(dec!(25.50)),
            payment_methods: vec!["paypal".into(), "venmo".into()],
        });
        assert_eq!(
            unknown.check_contents(&catalog(&["paypal"])),
            Err(LifecycleError::UnknownPaymentMethod("venmo".into()))
        );

        let ok = base.with_payment(PaymentRequest {
            amount: Some(dec!(25.50)),
            payment_methods: vec!["paypal".into()],
        });
        assert!(ok.check_contents(&catalog(&["paypal", "zelle"])).is_ok());
    }

    #[test]
    fn progress_is_clamped_to_last_step() {
        assert_eq!(progress_position(0), None);
        assert_eq!(progress_position(1), Some(0));
        assert_eq!(progress_position(3), Some(2));
        assert_eq!(progress_position(5), Some(4));
        assert_eq!(progress_position(9), Some(4));
    }

    #[test]
    fn status_falls_back_to_creation_status() {
        assert_eq!(
            derive_status(None, ShipmentStatus::Confirmed),
            ShipmentStatus::Confirmed
        );
        assert_eq!(
            derive_status(Some(ShipmentStatus::Exception), ShipmentStatus::Pending),
            ShipmentStatus::Exception
        );
    }
}
