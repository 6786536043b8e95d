//! Shipping cost calculation and tracking-number generation.
//!
//! Both collaborators sit behind traits so the quote endpoint and admin
//! shipment creation share one instance, whichever backend is configured.

use async_trait::async_trait;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use utoipa::ToSchema;

use crate::config::AppConfig;
use crate::models::ServiceType;

pub mod rate_table;
pub mod remote;
pub mod tracking_id;

pub use rate_table::RateTableCalculator;
pub use remote::{RemoteCostCalculator, RemoteProcedureClient, RemoteProcedureError};
pub use tracking_id::{PrefixedTrackingIdGenerator, RemoteTrackingIdGenerator, TrackingIdGenerator};

#[derive(Debug, Error)]
pub enum CostError {
    #[error("Invalid cost input: {0}")]
    InvalidInput(String),

    #[error("Cost service call failed: {0}")]
    Remote(String),

    #[error("Cost service returned an unusable response: {0}")]
    MalformedResponse(String),
}

impl From<RemoteProcedureError> for CostError {
    fn from(err: RemoteProcedureError) -> Self {
        match err {
            RemoteProcedureError::Decode { .. } => CostError::MalformedResponse(err.to_string()),
            other => CostError::Remote(other.to_string()),
        }
    }
}

/// Package dimensions in centimetres
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Dimensions {
    pub length_cm: Decimal,
    pub width_cm: Decimal,
    pub height_cm: Decimal,
}

impl Dimensions {
    /// All three sides, or nothing when any is missing
    pub fn from_parts(
        length_cm: Option<Decimal>,
        width_cm: Option<Decimal>,
        height_cm: Option<Decimal>,
    ) -> Option<Self> {
        Some(Self {
            length_cm: length_cm?,
            width_cm: width_cm?,
            height_cm: height_cm?,
        })
    }

    /// `None` when the product does not fit a `Decimal`
    pub fn volume_cm3(&self) -> Option<Decimal> {
        self.length_cm
            .checked_mul(self.width_cm)?
            .checked_mul(self.height_cm)
    }
}

/// Heaviest parcel either backend will price
pub const MAX_WEIGHT_KG: Decimal = Decimal::from_parts(10_000, 0, 0, false, 0);
/// Longest side accepted, in centimetres
pub const MAX_SIDE_CM: Decimal = Decimal::from_parts(1_000, 0, 0, false, 0);
pub const MAX_DECLARED_VALUE: Decimal = Decimal::from_parts(100_000_000, 0, 0, false, 0);

/// Everything the calculator needs to price one parcel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CostInput {
    pub service_type: ServiceType,
    pub weight_kg: Decimal,
    #[serde(default)]
    pub dimensions: Option<Dimensions>,
    #[serde(default)]
    pub declared_value: Decimal,
    #[serde(default)]
    pub signature_required: bool,
    #[serde(default)]
    pub insurance_required: bool,
}

impl CostInput {
    pub fn check(&self) -> Result<(), CostError> {
        if self.weight_kg <= Decimal::ZERO {
            return Err(CostError::InvalidInput(
                "weight_kg must be greater than zero".into(),
            ));
        }
        if self.weight_kg > MAX_WEIGHT_KG {
            return Err(CostError::InvalidInput(format!(
                "weight_kg cannot exceed {}",
                MAX_WEIGHT_KG
            )));
        }
        if self.declared_value.is_sign_negative() {
            return Err(CostError::InvalidInput(
                "declared_value cannot be negative".into(),
            ));
        }
        if self.declared_value > MAX_DECLARED_VALUE {
            return Err(CostError::InvalidInput(format!(
                "declared_value cannot exceed {}",
                MAX_DECLARED_VALUE
            )));
        }
        if let Some(dims) = &self.dimensions {
            if [dims.length_cm, dims.width_cm, dims.height_cm]
                .iter()
                .any(|side| *side <= Decimal::ZERO)
            {
                return Err(CostError::InvalidInput(
                    "package dimensions must be greater than zero".into(),
                ));
            }
            if [dims.length_cm, dims.width_cm, dims.height_cm]
                .iter()
                .any(|side| *side > MAX_SIDE_CM)
            {
                return Err(CostError::InvalidInput(format!(
                    "package sides cannot exceed {} cm",
                    MAX_SIDE_CM
                )));
            }
        }
        Ok(())
    }
}

/// Itemised price of one parcel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CostBreakdown {
    pub base_cost: Decimal,
    pub weight_cost: Decimal,
    pub billable_weight_kg: Decimal,
    pub insurance_cost: Decimal,
    pub signature_cost: Decimal,
    pub tax_amount: Decimal,
    pub total_cost: Decimal,
    pub estimated_delivery_days: u32,
}

impl CostBreakdown {
    /// Every component before tax
    pub fn subtotal(&self) -> Decimal {
        self.base_cost + self.weight_cost + self.insurance_cost + self.signature_cost
    }

    /// `total_cost` agrees with its components to the cent
    pub fn is_consistent(&self) -> bool {
        round_money(self.subtotal() + self.tax_amount) == round_money(self.total_cost)
    }
}

#[async_trait]
pub trait CostCalculator: Send + Sync {
    async fn calculate(&self, input: &CostInput) -> Result<CostBreakdown, CostError>;

    /// Short backend name for logs
    fn backend(&self) -> &'static str;
}

pub(crate) fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Builds the configured cost calculator.
pub fn cost_calculator_from_config(config: &AppConfig) -> Result<Arc<dyn CostCalculator>, CostError> {
    if config.pricing.backend.eq_ignore_ascii_case("remote") {
        let client = RemoteProcedureClient::from_config(&config.remote)?;
        Ok(Arc::new(RemoteCostCalculator::new(client)))
    } else {
        Ok(Arc::new(RateTableCalculator::from_config(&config.pricing)?))
    }
}

/// Builds the configured tracking-number generator.
pub fn tracking_generator_from_config(
    config: &AppConfig,
) -> Result<Arc<dyn TrackingIdGenerator>, RemoteProcedureError> {
    if config.tracking.generator.eq_ignore_ascii_case("remote") {
        let client = RemoteProcedureClient::from_config(&config.remote)?;
        Ok(Arc::new(RemoteTrackingIdGenerator::new(client)))
    } else {
        Ok(Arc::new(PrefixedTrackingIdGenerator::new(
            config.tracking.prefix.clone(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    fn input(weight: Decimal) -> CostInput {
        CostInput {
            service_type: ServiceType::Standard,
            weight_kg: weight,
            dimensions: None,
            declared_value: Decimal::ZERO,
            signature_required: false,
            insurance_required: false,
        }
    }

    #[test]
    fn zero_weight_is_rejected() {
        assert_matches!(input(dec!(0)).check(), Err(CostError::InvalidInput(_)));
    }

    #[test]
    fn negative_declared_value_is_rejected() {
        let mut i = input(dec!(1));
        i.declared_value = dec!(-5);
        assert_matches!(i.check(), Err(CostError::InvalidInput(_)));
    }

    #[test]
    fn partial_dimensions_are_ignored() {
        assert!(Dimensions::from_parts(Some(dec!(10)), None, Some(dec!(3))).is_none());
        let dims = Dimensions::from_parts(Some(dec!(10)), Some(dec!(20)), Some(dec!(30))).unwrap();
        assert_eq!(dims.volume_cm3(), Some(dec!(6000)));
    }

    #[test]
    fn oversized_parcels_are_rejected() {
        let mut heavy = input(MAX_WEIGHT_KG + dec!(0.01));
        assert_matches!(heavy.check(), Err(CostError::InvalidInput(_)));

        heavy.weight_kg = dec!(2);
        heavy.dimensions = Some(Dimensions {
            length_cm: dec!(100000000000000),
            width_cm: dec!(100000000000000),
            height_cm: dec!(100000000000000),
        });
        assert_matches!(heavy.check(), Err(CostError::InvalidInput(_)));

        let mut valuable = input(dec!(1));
        valuable.declared_value = MAX_DECLARED_VALUE * dec!(10);
        assert_matches!(valuable.check(), Err(CostError::InvalidInput(_)));
    }

    #[test]
    fn overflowing_volume_is_none() {
        let huge = Dimensions {
            length_cm: Decimal::MAX,
            width_cm: dec!(2),
            height_cm: dec!(1),
        };
        assert!(huge.volume_cm3().is_none());
    }

    #[test]
    fn money_rounds_half_away_from_zero() {
        assert_eq!(round_money(dec!(1.005)), dec!(1.01));
        assert_eq!(round_money(dec!(1.004)), dec!(1.00));
    }

    #[test]
    fn decode_failures_become_malformed_responses() {
        let err: CostError = RemoteProcedureError::Decode {
            procedure: "calculate_shipping_cost".into(),
            message: "missing field".into(),
        }
        .into();
        assert_matches!(err, CostError::MalformedResponse(_));
    }
}
