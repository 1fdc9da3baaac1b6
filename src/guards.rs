#![forbid(unsafe_code)]

use tracing::warn;

use crate::error::FootprintError;
use crate::types::{RateParameters, UsageParameters};

/// InputGuard: rejects values outside their declared domain before any arithmetic runs.
pub struct InputGuard;

impl InputGuard {
    /// A rate must be finite and non-negative.
    pub fn validate_rate(name: &str, value: f64) -> Result<(), FootprintError> {
        if !value.is_finite() {
            return Err(reject(format!("{name} must be finite, got {value}")));
        }
        if value < 0.0 {
            return Err(reject(format!("{name} must be non-negative, got {value}")));
        }
        Ok(())
    }

    /// Finite value inside the closed range `[min, max]`.
    pub fn validate_range(
        name: &str,
        value: f64,
        min: f64,
        max: f64,
    ) -> Result<(), FootprintError> {
        if !value.is_finite() {
            return Err(reject(format!("{name} must be finite, got {value}")));
        }
        if !(min..=max).contains(&value) {
            return Err(reject(format!(
                "{name} must be between {min} and {max}, got {value}"
            )));
        }
        Ok(())
    }

    pub fn validate_rates(rates: &RateParameters) -> Result<(), FootprintError> {
        Self::validate_rate("phone_carbon_kg", rates.phone_carbon_kg)?;
        Self::validate_rate("video_intensity_kg_per_hour", rates.video_intensity_kg_per_hour)?;
        Self::validate_rate(
            "meeting_intensity_kg_per_hour",
            rates.meeting_intensity_kg_per_hour,
        )?;
        Self::validate_rate("travel_factor_kg_per_km", rates.travel_factor_kg_per_km)?;
        Self::validate_rate(
            "electricity_carbon_kg_per_kwh",
            rates.electricity_carbon_kg_per_kwh,
        )?;
        Ok(())
    }

    pub fn validate_usage(usage: &UsageParameters) -> Result<(), FootprintError> {
        Self::validate_range(
            "daily_video_hours",
            usage.daily_video_hours,
            0.0,
            UsageParameters::VIDEO_HOURS_MAX,
        )?;
        Self::validate_range(
            "weekly_meeting_hours",
            usage.weekly_meeting_hours,
            0.0,
            UsageParameters::MEETING_HOURS_MAX,
        )?;
        Self::validate_phone_years(usage.phone_replacement_years)?;
        Self::validate_range(
            "substituted_travel_km",
            usage.substituted_travel_km,
            UsageParameters::TRAVEL_KM_MIN,
            UsageParameters::TRAVEL_KM_MAX,
        )?;
        Ok(())
    }

    pub fn validate_phone_years(years: u32) -> Result<(), FootprintError> {
        if years < UsageParameters::PHONE_YEARS_MIN || years > UsageParameters::PHONE_YEARS_MAX {
            return Err(reject(format!(
                "phone_replacement_years must be in {}..={}, got {years}",
                UsageParameters::PHONE_YEARS_MIN,
                UsageParameters::PHONE_YEARS_MAX
            )));
        }
        Ok(())
    }

    /// Denominator of a percentage: zero is an undefined ratio, negative or
    /// non-finite values are invalid input.
    pub fn validate_denominator(
        name: &str,
        value: f64,
        undefined: &'static str,
    ) -> Result<(), FootprintError> {
        Self::validate_rate(name, value)?;
        if value == 0.0 {
            warn!(denominator = name, "{undefined}");
            return Err(FootprintError::UndefinedRatio(undefined));
        }
        Ok(())
    }
}

fn reject(message: String) -> FootprintError {
    warn!(%message, "input rejected");
    FootprintError::InvalidInput(message)
}
