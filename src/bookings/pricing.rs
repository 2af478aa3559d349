//! Booking price computation.
//!
//! Amounts are integer cents and the tax rate is held in basis points, so
//! `total == subtotal + tax` holds exactly. Tax is rounded half-up to the cent.

use serde::Serialize;

use crate::error::AppError;

const BPS_PER_UNIT: i128 = 10_000;

/// Tax rate in basis points (1% = 100 bps).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TaxRate(u32);

impl TaxRate {
    pub fn from_bps(bps: u32) -> Self {
        Self(bps)
    }

    /// `8.0` → 800 bps. Rejects negative, non-finite and > 100% rates.
    pub fn from_percent(percent: f64) -> Result<Self, AppError> {
        if !percent.is_finite() || !(0.0..=100.0).contains(&percent) {
            return Err(AppError::validation(format!(
                "tax rate must be between 0 and 100 percent, got {percent}"
            )));
        }
        Ok(Self((percent * 100.0).round() as u32))
    }

    pub fn bps(self) -> u32 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pricing {
    pub hourly_rate_cents: i64,
    pub hours: i32,
    pub tax_rate_bps: u32,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
}

/// `subtotal = rate * hours`, `tax = subtotal * rate`, `total = subtotal + tax`.
pub fn calculate_pricing(
    hourly_rate_cents: i64,
    hours: i32,
    tax_rate: TaxRate,
) -> Result<Pricing, AppError> {
    if hourly_rate_cents < 0 {
        return Err(AppError::validation("hourly rate must not be negative"));
    }
    if hours < 1 {
        return Err(AppError::validation("hours must be at least 1"));
    }

    let subtotal = i128::from(hourly_rate_cents) * i128::from(hours);
    let tax = (subtotal * i128::from(tax_rate.bps()) + BPS_PER_UNIT / 2) / BPS_PER_UNIT;
    let total = subtotal + tax;

    let overflow = || AppError::validation("booking amount out of range");
    Ok(Pricing {
        hourly_rate_cents,
        hours,
        tax_rate_bps: tax_rate.bps(),
        subtotal_cents: i64::try_from(subtotal).map_err(|_| overflow())?,
        tax_cents: i64::try_from(tax).map_err(|_| overflow())?,
        total_cents: i64::try_from(total).map_err(|_| overflow())?,
    })
}
