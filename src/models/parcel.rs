//! Package and service parameters shared by quotes and shipments.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use super::shipment::{PackageType, ServiceType};
use crate::pricing::{CostInput, Dimensions, MAX_DECLARED_VALUE, MAX_SIDE_CM, MAX_WEIGHT_KG};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
pub struct PackageDetails {
    pub package_type: PackageType,

    #[validate(custom = "validate_weight")]
    pub weight_kg: Decimal,

    #[validate(custom = "validate_side")]
    pub length_cm: Option<Decimal>,

    #[validate(custom = "validate_side")]
    pub width_cm: Option<Decimal>,

    #[validate(custom = "validate_side")]
    pub height_cm: Option<Decimal>,

    #[serde(default)]
    #[validate(custom = "validate_declared_value")]
    pub declared_value: Decimal,

    #[validate(length(max = 500))]
    pub description: Option<String>,
}

impl PackageDetails {
    pub fn dimensions(&self) -> Option<Dimensions> {
        Dimensions::from_parts(self.length_cm, self.width_cm, self.height_cm)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
pub struct ServiceOptions {
    pub service_type: ServiceType,

    #[validate(length(max = 1000))]
    pub delivery_instructions: Option<String>,

    #[serde(default)]
    pub signature_required: bool,

    #[serde(default)]
    pub insurance_required: bool,
}

/// Calculator input for a package shipped with the given service
pub fn cost_input(package: &PackageDetails, service: &ServiceOptions) -> CostInput {
    CostInput {
        service_type: service.service_type,
        weight_kg: package.weight_kg,
        dimensions: package.dimensions(),
        declared_value: package.declared_value,
        signature_required: service.signature_required,
        insurance_required: service.insurance_required,
    }
}

pub(crate) fn validate_positive(value: &Decimal) -> Result<(), ValidationError> {
    if *value <= Decimal::ZERO {
        let mut err = ValidationError::new("positive");
        err.message = Some("must be greater than zero".into());
        return Err(err);
    }
    Ok(())
}

pub(crate) fn validate_non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() {
        let mut err = ValidationError::new("non_negative");
        err.message = Some("cannot be negative".into());
        return Err(err);
    }
    Ok(())
}

fn validate_at_most(value: &Decimal, max: Decimal) -> Result<(), ValidationError> {
    if *value > max {
        let mut err = ValidationError::new("too_large");
        err.message = Some(format!("cannot exceed {}", max).into());
        return Err(err);
    }
    Ok(())
}

/// Upper bound for a single stored cost line
pub const MAX_COST_LINE: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

/// Non-negative amount no larger than [`MAX_COST_LINE`]
pub(crate) fn validate_cost_line(value: &Decimal) -> Result<(), ValidationError> {
    validate_non_negative(value)?;
    validate_at_most(value, MAX_COST_LINE)
}

fn validate_weight(value: &Decimal) -> Result<(), ValidationError> {
    validate_positive(value)?;
    validate_at_most(value, MAX_WEIGHT_KG)
}

fn validate_side(value: &Decimal) -> Result<(), ValidationError> {
    validate_positive(value)?;
    validate_at_most(value, MAX_SIDE_CM)
}

fn validate_declared_value(value: &Decimal) -> Result<(), ValidationError> {
    validate_non_negative(value)?;
    validate_at_most(value, MAX_DECLARED_VALUE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn package() -> PackageDetails {
        PackageDetails {
            package_type: PackageType::Parcel,
            weight_kg: dec!(3),
            length_cm: Some(dec!(30)),
            width_cm: Some(dec!(20)),
            height_cm: Some(dec!(10)),
            declared_value: dec!(0),
            description: None,
        }
    }

    #[test]
    fn zero_weight_fails_validation() {
        let mut p = package();
        p.weight_kg = dec!(0);
        assert!(p.validate().is_err());
        assert!(package().validate().is_ok());
    }

    #[test]
    fn oversized_sides_fail_validation() {
        let mut p = package();
        p.length_cm = Some(dec!(100000000000000));
        assert!(p.validate().is_err());
    }

    #[test]
    fn cost_input_carries_dimensions_and_flags() {
        let service = ServiceOptions {
            service_type: ServiceType::Express,
            delivery_instructions: None,
            signature_required: true,
            insurance_required: false,
        };
        let input = cost_input(&package(), &service);
        assert_eq!(input.service_type, ServiceType::Express);
        assert_eq!(input.dimensions.and_then(|d| d.volume_cm3()), Some(dec!(6000)));
        assert!(input.signature_required);
    }
}
