//! Subsidized price computation applied when an order is placed.
//!
//! A percentage is read as the exact decimal it was configured with (up to six
//! fractional digits) and the discount is applied in integer arithmetic, so the
//! only rounding is the final half-up step to cents.

use serde::{Deserialize, Serialize};

use super::domain::Money;

/// Most fractional digits a configured percentage may carry.
pub const MAX_PERCENTAGE_DECIMALS: usize = 6;

/// Employer subsidy rule attached to a company or overridden per employee.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SubsidyConfig {
    /// Discount of `percentage_value` percent, 0 to 100 inclusive.
    Percentage { percentage_value: f64 },
    /// Flat amount deducted from the list price.
    Fixed { fixed_value: Money },
}

impl SubsidyConfig {
    pub fn validate(&self) -> Result<(), PricingError> {
        match *self {
            SubsidyConfig::Percentage { percentage_value } => {
                percentage_ratio(percentage_value).map(|_| ())
            }
            SubsidyConfig::Fixed { fixed_value } => {
                if fixed_value.is_negative() {
                    Err(PricingError::NegativeFixedValue { value: fixed_value })
                } else {
                    Ok(())
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PricingError {
    #[error("invalid subsidy configuration: percentage {value} is outside 0-100")]
    PercentageOutOfRange { value: f64 },
    #[error("invalid subsidy configuration: fixed subsidy {value} is negative")]
    NegativeFixedValue { value: Money },
    #[error(
        "invalid subsidy configuration: percentage {value} has more than {max} decimal places",
        max = MAX_PERCENTAGE_DECIMALS
    )]
    PercentageTooPrecise { value: f64 },
    #[error("list price {price} is negative")]
    NegativeListPrice { price: Money },
}

/// Employee override fully replaces the company rule; there is no blending.
pub fn resolve_subsidy<'a>(
    company: Option<&'a SubsidyConfig>,
    employee: Option<&'a SubsidyConfig>,
) -> Option<&'a SubsidyConfig> {
    employee.or(company)
}

/// Price the employee pays for `list_price` under `config`.
///
/// The result is never negative and is rounded half-up to cents. Invalid
/// configuration is reported, never clamped.
pub fn compute_subsidized_price(
    list_price: Money,
    config: Option<&SubsidyConfig>,
) -> Result<Money, PricingError> {
    if list_price.is_negative() {
        return Err(PricingError::NegativeListPrice { price: list_price });
    }

    let Some(config) = config else {
        return Ok(list_price);
    };
    config.validate()?;

    let cents = match *config {
        SubsidyConfig::Fixed { fixed_value } => {
            (list_price.cents() - fixed_value.cents()).max(0)
        }
        SubsidyConfig::Percentage { percentage_value } => {
            let (numerator, denominator) = percentage_ratio(percentage_value)?;
            let paid = i128::from(list_price.cents()) * (denominator - numerator);
            let rounded = (paid * 2 + denominator) / (denominator * 2);
            i64::try_from(rounded.max(0)).unwrap_or(i64::MAX)
        }
    };

    Ok(Money::from_cents(cents))
}

/// The share `value` percent represents, as an exact `numerator / denominator`.
///
/// `value` is taken at its shortest round-trip decimal spelling, so `0.005`
/// means five thousandths of a percent and not the nearest binary fraction.
fn percentage_ratio(value: f64) -> Result<(i128, i128), PricingError> {
    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return Err(PricingError::PercentageOutOfRange { value });
    }

    let text = value.abs().to_string();
    let (whole, fraction) = text.split_once('.').unwrap_or((text.as_str(), ""));
    if fraction.len() > MAX_PERCENTAGE_DECIMALS {
        return Err(PricingError::PercentageTooPrecise { value });
    }

    let scale = 10i128.pow(fraction.len() as u32);
    let digits = format!("{whole}{fraction}");
    let numerator = digits
        .parse::<i128>()
        .map_err(|_| PricingError::PercentageOutOfRange { value })?;
    Ok((numerator, 100 * scale))
}
