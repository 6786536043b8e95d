use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::debug;

use super::{round_money, CostBreakdown, CostCalculator, CostError, CostInput};
use crate::config::{PricingConfig, ServiceRateConfig};
use crate::models::ServiceType;

#[derive(Debug, Clone, Copy, PartialEq)]
struct ServiceRate {
    base: Decimal,
    per_kg: Decimal,
    days: u32,
}

impl ServiceRate {
    fn from_config(line: &ServiceRateConfig) -> Result<Self, CostError> {
        Ok(Self {
            base: to_decimal("base", line.base)?,
            per_kg: to_decimal("per_kg", line.per_kg)?,
            days: line.days,
        })
    }
}

/// In-process calculator driven by the configured rate card
#[derive(Debug, Clone)]
pub struct RateTableCalculator {
    standard: ServiceRate,
    express: ServiceRate,
    overnight: ServiceRate,
    international: ServiceRate,
    tax_rate: Decimal,
    insurance_rate: Decimal,
    insurance_minimum: Decimal,
    signature_surcharge: Decimal,
    volumetric_divisor: Decimal,
}

impl RateTableCalculator {
    pub fn from_config(config: &PricingConfig) -> Result<Self, CostError> {
        let volumetric_divisor = to_decimal("volumetric_divisor", config.volumetric_divisor)?;
        if volumetric_divisor <= Decimal::ZERO {
            return Err(CostError::InvalidInput(
                "volumetric_divisor must be positive".into(),
            ));
        }

        Ok(Self {
            standard: ServiceRate::from_config(&config.standard)?,
            express: ServiceRate::from_config(&config.express)?,
            overnight: ServiceRate::from_config(&config.overnight)?,
            international: ServiceRate::from_config(&config.international)?,
            tax_rate: to_decimal("tax_rate", config.tax_rate)?,
            insurance_rate: to_decimal("insurance_rate", config.insurance_rate)?,
            insurance_minimum: to_decimal("insurance_minimum", config.insurance_minimum)?,
            signature_surcharge: to_decimal("signature_surcharge", config.signature_surcharge)?,
            volumetric_divisor,
        })
    }

    fn rate(&self, service_type: ServiceType) -> &ServiceRate {
        match service_type {
            ServiceType::Standard => &self.standard,
            ServiceType::Express => &self.express,
            ServiceType::Overnight => &self.overnight,
            ServiceType::International => &self.international,
        }
    }

    /// Greater of actual and volumetric weight
    pub fn billable_weight(&self, input: &CostInput) -> Result<Decimal, CostError> {
        let volumetric = match input.dimensions {
            Some(dims) => dims
                .volume_cm3()
                .and_then(|volume| volume.checked_div(self.volumetric_divisor))
                .ok_or_else(|| out_of_range("package volume"))?,
            None => Decimal::ZERO,
        };
        Ok(input.weight_kg.max(volumetric))
    }

    pub fn price(&self, input: &CostInput) -> Result<CostBreakdown, CostError> {
        input.check()?;

        let rate = self.rate(input.service_type);
        let billable_weight_kg = round_money(self.billable_weight(input)?);

        let base_cost = round_money(rate.base);
        let weight_cost = round_money(
            billable_weight_kg
                .checked_mul(rate.per_kg)
                .ok_or_else(|| out_of_range("weight cost"))?,
        );
        let insurance_cost = if input.insurance_required {
            let insured = input
                .declared_value
                .checked_mul(self.insurance_rate)
                .ok_or_else(|| out_of_range("insurance cost"))?;
            round_money(insured.max(self.insurance_minimum))
        } else {
            Decimal::ZERO
        };
        let signature_cost = if input.signature_required {
            round_money(self.signature_surcharge)
        } else {
            Decimal::ZERO
        };

        let subtotal = base_cost + weight_cost + insurance_cost + signature_cost;
        let tax_amount = round_money(
            subtotal
                .checked_mul(self.tax_rate)
                .ok_or_else(|| out_of_range("tax"))?,
        );

        Ok(CostBreakdown {
            base_cost,
            weight_cost,
            billable_weight_kg,
            insurance_cost,
            signature_cost,
            tax_amount,
            total_cost: subtotal + tax_amount,
            estimated_delivery_days: rate.days,
        })
    }
}

#[async_trait]
impl CostCalculator for RateTableCalculator {
    async fn calculate(&self, input: &CostInput) -> Result<CostBreakdown, CostError> {
        let breakdown = self.price(input)?;
        debug!(
            service_type = %input.service_type,
            total_cost = %breakdown.total_cost,
            "priced parcel from rate card"
        );
        Ok(breakdown)
    }

    fn backend(&self) -> &'static str {
        "rates"
    }
}

fn out_of_range(what: &str) -> CostError {
    CostError::InvalidInput(format!("{what} is out of range"))
}

fn to_decimal(field: &str, value: f64) -> Result<Decimal, CostError> {
    Decimal::try_from(value)
        .map(|d| d.normalize())
        .map_err(|_| CostError::InvalidInput(format!("pricing.{field} is not a finite number")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::Dimensions;
    use rust_decimal_macros::dec;

    fn calculator() -> RateTableCalculator {
        RateTableCalculator::from_config(&PricingConfig::default()).unwrap()
    }

    fn standard(weight: Decimal) -> CostInput {
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
    fn three_kilo_standard_parcel() {
        let cost = calculator().price(&standard(dec!(3))).unwrap();
        assert_eq!(cost.base_cost, dec!(15.00));
        assert_eq!(cost.weight_cost, dec!(7.50));
        assert_eq!(cost.insurance_cost, Decimal::ZERO);
        assert_eq!(cost.signature_cost, Decimal::ZERO);
        assert_eq!(cost.tax_amount, dec!(1.80));
        assert_eq!(cost.total_cost, dec!(24.30));
        assert_eq!(cost.estimated_delivery_days, 5);
        assert!(cost.is_consistent());
    }

    #[test]
    fn bulky_parcel_is_billed_by_volume() {
        let mut input = standard(dec!(1));
        input.dimensions = Some(Dimensions {
            length_cm: dec!(50),
            width_cm: dec!(40),
            height_cm: dec!(30),
        });
        let cost = calculator().price(&input).unwrap();
        assert_eq!(cost.billable_weight_kg, dec!(12));
        assert_eq!(cost.weight_cost, dec!(30.00));
    }

    #[test]
    fn insurance_has_a_floor() {
        let mut input = standard(dec!(1));
        input.insurance_required = true;
        input.declared_value = dec!(100);
        assert_eq!(calculator().price(&input).unwrap().insurance_cost, dec!(5.00));

        input.declared_value = dec!(1000);
        assert_eq!(calculator().price(&input).unwrap().insurance_cost, dec!(15.00));
    }

    #[test]
    fn declared_value_is_ignored_without_insurance() {
        let mut input = standard(dec!(1));
        input.declared_value = dec!(5000);
        assert_eq!(calculator().price(&input).unwrap().insurance_cost, Decimal::ZERO);
    }

    #[test]
    fn signature_adds_the_surcharge_before_tax() {
        let mut input = standard(dec!(3));
        input.signature_required = true;
        let cost = calculator().price(&input).unwrap();
        assert_eq!(cost.signature_cost, dec!(3.50));
        assert_eq!(cost.tax_amount, dec!(2.08));
        assert_eq!(cost.total_cost, dec!(28.08));
    }

    #[test]
    fn service_level_selects_transit_days() {
        let mut input = standard(dec!(2));
        input.service_type = ServiceType::Overnight;
        assert_eq!(calculator().price(&input).unwrap().estimated_delivery_days, 1);
    }

    #[test]
    fn overflowing_rate_card_is_an_input_error() {
        let mut config = PricingConfig::default();
        config.standard.per_kg = 1e28;
        let calc = RateTableCalculator::from_config(&config).unwrap();
        assert!(matches!(
            calc.price(&standard(dec!(100))),
            Err(CostError::InvalidInput(_))
        ));
    }
}
