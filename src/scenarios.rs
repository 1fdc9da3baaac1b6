//! What-if scenarios layered on top of a computed footprint or savings balance.
//!
//! Every helper is pure and validates its own inputs; percentages are
//! expressed on a 0-100 scale.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::calculator::{compute_footprint, compute_savings};
use crate::error::FootprintError;
use crate::guards::InputGuard;
use crate::types::{FootprintResult, RateParameters, UsageParameters};

/// Share of device emissions that utilisation gains can actually remove.
pub const SHARING_EFFECTIVENESS: f64 = 0.5;
pub const MAX_COMPRESSION_PERCENT: f64 = 50.0;
pub const MAX_ADJUSTMENT_PERCENT: f64 = 50.0;
pub const MAX_TARGET_PHONE_YEARS: u32 = 6;

/// Emissions removed by a scenario, absolute and relative to its baseline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reduction {
    pub reduction_kg: f64,
    pub percent_of_baseline: f64,
}

fn reduction(reduction_kg: f64, baseline_kg: f64) -> Reduction {
    Reduction {
        reduction_kg,
        percent_of_baseline: reduction_kg / baseline_kg * 100.0,
    }
}

/// Data centers running on a share of renewable power cut video and meeting
/// emissions in proportion to that share.
pub fn green_power(
    footprint: &FootprintResult,
    green_ratio_percent: f64,
) -> Result<Reduction, FootprintError> {
    InputGuard::validate_range("green_ratio_percent", green_ratio_percent, 0.0, 100.0)?;
    InputGuard::validate_denominator(
        "total_kg",
        footprint.total_kg,
        "green power share is undefined, requires total_kg > 0",
    )?;
    let data_center_kg = footprint.video_emissions_kg + footprint.meeting_emissions_kg;
    let r = reduction(data_center_kg * (green_ratio_percent / 100.0), footprint.total_kg);
    debug!(green_ratio_percent, reduction_kg = r.reduction_kg, "green power scenario");
    Ok(r)
}

/// Better codecs shrink streamed data, and with it video emissions.
pub fn video_compression(
    footprint: &FootprintResult,
    improvement_percent: f64,
) -> Result<Reduction, FootprintError> {
    InputGuard::validate_range(
        "improvement_percent",
        improvement_percent,
        0.0,
        MAX_COMPRESSION_PERCENT,
    )?;
    InputGuard::validate_denominator(
        "total_kg",
        footprint.total_kg,
        "compression share is undefined, requires total_kg > 0",
    )?;
    let r = reduction(
        footprint.video_emissions_kg * (improvement_percent / 100.0),
        footprint.total_kg,
    );
    debug!(improvement_percent, reduction_kg = r.reduction_kg, "compression scenario");
    Ok(r)
}

/// Annual saving from keeping a phone `target_years` instead of `current_years`.
pub fn lifetime_extension(
    phone_carbon_kg: f64,
    current_years: u32,
    target_years: u32,
) -> Result<Reduction, FootprintError> {
    InputGuard::validate_phone_years(current_years)?;
    if target_years <= current_years || target_years > MAX_TARGET_PHONE_YEARS {
        return Err(FootprintError::InvalidInput(format!(
            "target_years must be in {}..={MAX_TARGET_PHONE_YEARS}, got {target_years}",
            current_years + 1
        )));
    }
    InputGuard::validate_denominator(
        "phone_carbon_kg",
        phone_carbon_kg,
        "lifetime share is undefined, requires phone_carbon_kg > 0",
    )?;
    let current_annual = phone_carbon_kg / f64::from(current_years);
    let target_annual = phone_carbon_kg / f64::from(target_years);
    Ok(reduction(current_annual - target_annual, current_annual))
}

/// Device sharing and cloud offload; only half of the utilisation gain turns
/// into avoided production emissions.
pub fn device_sharing(
    device_emissions_kg: f64,
    utilisation_gain_percent: f64,
) -> Result<Reduction, FootprintError> {
    InputGuard::validate_range(
        "utilisation_gain_percent",
        utilisation_gain_percent,
        0.0,
        100.0,
    )?;
    InputGuard::validate_denominator(
        "device_emissions_kg",
        device_emissions_kg,
        "sharing share is undefined, requires device_emissions_kg > 0",
    )?;
    Ok(reduction(
        device_emissions_kg * (utilisation_gain_percent / 100.0) * SHARING_EFFECTIVENESS,
        device_emissions_kg,
    ))
}

/// Rates a user may scale by hand to explore the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustedParameter {
    VideoIntensity,
    PhoneCarbon,
    TravelFactor,
}

/// Effect of scaling one rate by a percentage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterAdjustment {
    pub parameter: AdjustedParameter,
    pub change_kg: f64,
    /// Relative to the total footprint, or to baseline travel emissions for
    /// [`AdjustedParameter::TravelFactor`].
    pub change_percent: f64,
}

/// Scale one rate by `adjustment_percent` (in [-50, 50]) and report the shift.
///
/// Video intensity and phone carbon move the footprint and need a positive
/// total; the travel factor moves the savings balance and reports 0% when the
/// baseline travel emissions are 0.
pub fn adjust_parameter(
    rates: &RateParameters,
    usage: &UsageParameters,
    parameter: AdjustedParameter,
    adjustment_percent: f64,
) -> Result<ParameterAdjustment, FootprintError> {
    InputGuard::validate_range(
        "adjustment_percent",
        adjustment_percent,
        -MAX_ADJUSTMENT_PERCENT,
        MAX_ADJUSTMENT_PERCENT,
    )?;
    let factor = 1.0 + adjustment_percent / 100.0;

    let (change_kg, change_percent) = match parameter {
        AdjustedParameter::VideoIntensity | AdjustedParameter::PhoneCarbon => {
            let baseline = compute_footprint(rates, usage)?;
            InputGuard::validate_denominator(
                "total_kg",
                baseline.total_kg,
                "adjustment share is undefined, requires total_kg > 0",
            )?;
            let adjusted_rates = if parameter == AdjustedParameter::VideoIntensity {
                RateParameters {
                    video_intensity_kg_per_hour: rates.video_intensity_kg_per_hour * factor,
                    ..*rates
                }
            } else {
                RateParameters {
                    phone_carbon_kg: rates.phone_carbon_kg * factor,
                    ..*rates
                }
            };
            let adjusted = compute_footprint(&adjusted_rates, usage)?;
            let change = adjusted.total_kg - baseline.total_kg;
            (change, change / baseline.total_kg * 100.0)
        }
        AdjustedParameter::TravelFactor => {
            let baseline = compute_savings(rates, usage)?;
            let adjusted_rates = RateParameters {
                travel_factor_kg_per_km: rates.travel_factor_kg_per_km * factor,
                ..*rates
            };
            let adjusted = compute_savings(&adjusted_rates, usage)?;
            let change = adjusted.travel_emissions_kg - baseline.travel_emissions_kg;
            let percent = if baseline.travel_emissions_kg > 0.0 {
                change / baseline.travel_emissions_kg * 100.0
            } else {
                0.0
            };
            (change, percent)
        }
    };

    debug!(?parameter, adjustment_percent, change_kg, "parameter adjusted");
    Ok(ParameterAdjustment {
        parameter,
        change_kg,
        change_percent,
    })
}

/// How the savings bar is rescaled next to the footprint bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonScale {
    Unscaled,
    SavingsDividedByTen,
    SavingsTimesTen,
}

/// Footprint versus reduction potential, scaled so both bars stay readable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DualRoleComparison {
    pub footprint_kg: f64,
    pub savings_bar_kg: f64,
    pub scale: ComparisonScale,
}

impl DualRoleComparison {
    /// `None` when neither figure is positive, i.e. there is nothing to compare yet.
    pub fn new(total_kg: f64, net_savings_kg: f64) -> Option<Self> {
        if !(total_kg > 0.0 || net_savings_kg > 0.0) {
            return None;
        }
        let (savings_bar_kg, scale) = if net_savings_kg > 10.0 * total_kg {
            (net_savings_kg / 10.0, ComparisonScale::SavingsDividedByTen)
        } else if total_kg > 10.0 * net_savings_kg {
            (net_savings_kg * 10.0, ComparisonScale::SavingsTimesTen)
        } else {
            (net_savings_kg, ComparisonScale::Unscaled)
        };
        Some(DualRoleComparison {
            footprint_kg: total_kg,
            savings_bar_kg,
            scale,
        })
    }

    pub fn savings_label(&self) -> &'static str {
        match self.scale {
            ComparisonScale::Unscaled => "Reduction Potential",
            ComparisonScale::SavingsDividedByTen => "Reduction Potential (/10)",
            ComparisonScale::SavingsTimesTen => "Reduction Potential (x10)",
        }
    }
}
