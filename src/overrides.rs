use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::FootprintError;
use crate::guards::InputGuard;
use crate::types::RateParameters;

/// Expert override of individual resolved rates. Unset fields keep the table value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ManualOverride {
    pub video_intensity_kg_per_hour: Option<f64>,
    pub meeting_intensity_kg_per_hour: Option<f64>,
    pub phone_carbon_kg: Option<f64>,
    pub travel_factor_kg_per_km: Option<f64>,
}

/// Inclusive ranges an interactive front end offers for each override.
///
/// These are narrower than what the tables can produce in places (travel
/// factors of rail and transit sit below 0.15), so clamping is opt-in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverrideBounds {
    pub video_intensity_kg_per_hour: (f64, f64),
    pub meeting_intensity_kg_per_hour: (f64, f64),
    pub phone_carbon_kg: (f64, f64),
    pub travel_factor_kg_per_km: (f64, f64),
}

impl Default for OverrideBounds {
    fn default() -> Self {
        OverrideBounds {
            video_intensity_kg_per_hour: (0.05, 0.3),
            meeting_intensity_kg_per_hour: (0.02, 0.1),
            phone_carbon_kg: (20.0, 100.0),
            travel_factor_kg_per_km: (0.15, 0.35),
        }
    }
}

impl ManualOverride {
    pub fn is_empty(&self) -> bool {
        *self == ManualOverride::default()
    }

    /// Replace the overridden rates verbatim.
    pub fn apply(&self, rates: &RateParameters) -> RateParameters {
        RateParameters {
            phone_carbon_kg: self.phone_carbon_kg.unwrap_or(rates.phone_carbon_kg),
            video_intensity_kg_per_hour: self
                .video_intensity_kg_per_hour
                .unwrap_or(rates.video_intensity_kg_per_hour),
            meeting_intensity_kg_per_hour: self
                .meeting_intensity_kg_per_hour
                .unwrap_or(rates.meeting_intensity_kg_per_hour),
            travel_factor_kg_per_km: self
                .travel_factor_kg_per_km
                .unwrap_or(rates.travel_factor_kg_per_km),
            electricity_carbon_kg_per_kwh: rates.electricity_carbon_kg_per_kwh,
        }
    }

    /// Same as [`ManualOverride::apply`], with each override clamped into `bounds`.
    /// Non-overridden rates pass through untouched. Negative or non-finite
    /// overrides are rejected rather than clamped.
    pub fn apply_clamped(
        &self,
        rates: &RateParameters,
        bounds: &OverrideBounds,
    ) -> Result<RateParameters, FootprintError> {
        let clamped = ManualOverride {
            video_intensity_kg_per_hour: clamp_override(
                "video_intensity_kg_per_hour",
                self.video_intensity_kg_per_hour,
                bounds.video_intensity_kg_per_hour,
            )?,
            meeting_intensity_kg_per_hour: clamp_override(
                "meeting_intensity_kg_per_hour",
                self.meeting_intensity_kg_per_hour,
                bounds.meeting_intensity_kg_per_hour,
            )?,
            phone_carbon_kg: clamp_override(
                "phone_carbon_kg",
                self.phone_carbon_kg,
                bounds.phone_carbon_kg,
            )?,
            travel_factor_kg_per_km: clamp_override(
                "travel_factor_kg_per_km",
                self.travel_factor_kg_per_km,
                bounds.travel_factor_kg_per_km,
            )?,
        };
        if clamped != *self {
            debug!(requested = ?self, applied = ?clamped, "override clamped to bounds");
        }
        Ok(clamped.apply(rates))
    }
}

fn clamp_override(
    name: &str,
    value: Option<f64>,
    (min, max): (f64, f64),
) -> Result<Option<f64>, FootprintError> {
    match value {
        Some(v) => {
            InputGuard::validate_rate(name, v)?;
            Ok(Some(v.max(min).min(max)))
        }
        None => Ok(None),
    }
}
