use serde::{Deserialize, Serialize};

/// Emission rates for one evaluation, usually resolved from the lookup tables.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateParameters {
    /// Embodied production emissions of one phone.
    pub phone_carbon_kg: f64,
    pub video_intensity_kg_per_hour: f64,
    pub meeting_intensity_kg_per_hour: f64,
    /// Per passenger-km factor of the travel a meeting replaces.
    pub travel_factor_kg_per_km: f64,
    /// Grid intensity of the selected region; reported, not used by the formulas.
    pub electricity_carbon_kg_per_kwh: f64,
}

/// Digital habits of one user.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UsageParameters {
    pub daily_video_hours: f64,
    pub weekly_meeting_hours: f64,
    pub phone_replacement_years: u32,
    pub substituted_travel_km: f64,
}

impl UsageParameters {
    pub const VIDEO_HOURS_MAX: f64 = 12.0;
    pub const MEETING_HOURS_MAX: f64 = 10.0;
    pub const PHONE_YEARS_MIN: u32 = 1;
    pub const PHONE_YEARS_MAX: u32 = 5;
    pub const TRAVEL_KM_MIN: f64 = 100.0;
    pub const TRAVEL_KM_MAX: f64 = 5000.0;
}

/// Annual footprint, split by contributor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FootprintResult {
    pub video_emissions_kg: f64,
    pub meeting_emissions_kg: f64,
    pub device_emissions_kg: f64,
    /// Always `video + meeting + device`, summed in that order.
    pub total_kg: f64,
}

impl FootprintResult {
    pub fn contribution(&self, contributor: Contributor) -> f64 {
        match contributor {
            Contributor::Video => self.video_emissions_kg,
            Contributor::Meeting => self.meeting_emissions_kg,
            Contributor::Device => self.device_emissions_kg,
        }
    }
}

/// Emissions avoided by replacing a trip with video meetings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SavingsResult {
    pub travel_emissions_kg: f64,
    pub meeting_emissions_kg: f64,
    /// `travel - meeting`; negative when the meetings cost more than the trip.
    pub net_savings_kg: f64,
}

/// The three footprint contributors, in enumeration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Contributor {
    Video,
    Meeting,
    Device,
}

impl Contributor {
    pub const ALL: [Contributor; 3] = [
        Contributor::Video,
        Contributor::Meeting,
        Contributor::Device,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Contributor::Video => "Video Streaming",
            Contributor::Meeting => "Video Conferencing",
            Contributor::Device => "Phone Production",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensitivityEntry {
    pub parameter: Contributor,
    /// Percent change of the total for a 10% increase of this parameter.
    pub percent_impact_on_total: f64,
    pub contribution_share_percent: f64,
}
