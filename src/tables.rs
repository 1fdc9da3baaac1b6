use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::TableError;
use crate::types::RateParameters;

/// A closed set of selectable categories with stable string keys.
///
/// Keys match the serde representation, so the same strings work on the
/// command line and in JSON datasets.
pub trait Category: Sized + Copy + 'static {
    const TABLE: &'static str;
    const ALL: &'static [Self];

    fn key(&self) -> &'static str;

    fn from_key(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.key() == key)
    }

    fn keys() -> Vec<&'static str> {
        Self::ALL.iter().map(|c| c.key()).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhoneBrand {
    AppleIphone,
    SamsungGalaxy,
    Huawei,
    Xiaomi,
    OppoVivo,
    Other,
}

impl Category for PhoneBrand {
    const TABLE: &'static str = "phone_carbon_kg";
    const ALL: &'static [Self] = &[
        PhoneBrand::AppleIphone,
        PhoneBrand::SamsungGalaxy,
        PhoneBrand::Huawei,
        PhoneBrand::Xiaomi,
        PhoneBrand::OppoVivo,
        PhoneBrand::Other,
    ];

    fn key(&self) -> &'static str {
        match self {
            PhoneBrand::AppleIphone => "apple_iphone",
            PhoneBrand::SamsungGalaxy => "samsung_galaxy",
            PhoneBrand::Huawei => "huawei",
            PhoneBrand::Xiaomi => "xiaomi",
            PhoneBrand::OppoVivo => "oppo_vivo",
            PhoneBrand::Other => "other",
        }
    }
}

/// Streaming platform; the factor reflects server efficiency and grid mix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoPlatform {
    GlobalStreaming,
    DomesticStreaming,
    ShortVideo,
    VideoConferencing,
}

impl Category for VideoPlatform {
    const TABLE: &'static str = "platform_factor";
    const ALL: &'static [Self] = &[
        VideoPlatform::GlobalStreaming,
        VideoPlatform::DomesticStreaming,
        VideoPlatform::ShortVideo,
        VideoPlatform::VideoConferencing,
    ];

    fn key(&self) -> &'static str {
        match self {
            VideoPlatform::GlobalStreaming => "global_streaming",
            VideoPlatform::DomesticStreaming => "domestic_streaming",
            VideoPlatform::ShortVideo => "short_video",
            VideoPlatform::VideoConferencing => "video_conferencing",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum VideoQuality {
    #[serde(rename = "480p")]
    Sd480p,
    #[serde(rename = "720p")]
    Hd720p,
    #[serde(rename = "1080p")]
    FullHd1080p,
    #[serde(rename = "4k")]
    Uhd4k,
}

impl Category for VideoQuality {
    const TABLE: &'static str = "quality_factor";
    const ALL: &'static [Self] = &[
        VideoQuality::Sd480p,
        VideoQuality::Hd720p,
        VideoQuality::FullHd1080p,
        VideoQuality::Uhd4k,
    ];

    fn key(&self) -> &'static str {
        match self {
            VideoQuality::Sd480p => "480p",
            VideoQuality::Hd720p => "720p",
            VideoQuality::FullHd1080p => "1080p",
            VideoQuality::Uhd4k => "4k",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeetingQuality {
    AudioFirst,
    Balanced,
    HdVideo,
}

impl Category for MeetingQuality {
    const TABLE: &'static str = "meeting_quality_factor";
    const ALL: &'static [Self] = &[
        MeetingQuality::AudioFirst,
        MeetingQuality::Balanced,
        MeetingQuality::HdVideo,
    ];

    fn key(&self) -> &'static str {
        match self {
            MeetingQuality::AudioFirst => "audio_first",
            MeetingQuality::Balanced => "balanced",
            MeetingQuality::HdVideo => "hd_video",
        }
    }
}

/// Mode of the trip a video meeting replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TravelMode {
    DomesticFlight,
    InternationalFlight,
    HighSpeedRail,
    Car,
    PublicTransit,
}

impl Category for TravelMode {
    const TABLE: &'static str = "travel_factor_kg_per_km";
    const ALL: &'static [Self] = &[
        TravelMode::DomesticFlight,
        TravelMode::InternationalFlight,
        TravelMode::HighSpeedRail,
        TravelMode::Car,
        TravelMode::PublicTransit,
    ];

    fn key(&self) -> &'static str {
        match self {
            TravelMode::DomesticFlight => "domestic_flight",
            TravelMode::InternationalFlight => "international_flight",
            TravelMode::HighSpeedRail => "high_speed_rail",
            TravelMode::Car => "car",
            TravelMode::PublicTransit => "public_transit",
        }
    }
}

/// Short < 500 km, medium 500-1000 km, long 1000-3000 km, international > 3000 km.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceBand {
    Short,
    Medium,
    Long,
    International,
}

impl Category for DistanceBand {
    const TABLE: &'static str = "typical_distance_km";
    const ALL: &'static [Self] = &[
        DistanceBand::Short,
        DistanceBand::Medium,
        DistanceBand::Long,
        DistanceBand::International,
    ];

    fn key(&self) -> &'static str {
        match self {
            DistanceBand::Short => "short",
            DistanceBand::Medium => "medium",
            DistanceBand::Long => "long",
            DistanceBand::International => "international",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Region {
    Europe,
    UnitedStates,
    China,
    India,
    Other,
}

impl Category for Region {
    const TABLE: &'static str = "electricity_kg_per_kwh";
    const ALL: &'static [Self] = &[
        Region::Europe,
        Region::UnitedStates,
        Region::China,
        Region::India,
        Region::Other,
    ];

    fn key(&self) -> &'static str {
        match self {
            Region::Europe => "europe",
            Region::UnitedStates => "united_states",
            Region::China => "china",
            Region::India => "india",
            Region::Other => "other",
        }
    }
}

/// Category choices that resolve to one set of [`RateParameters`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateSelection {
    pub brand: PhoneBrand,
    pub platform: VideoPlatform,
    pub quality: VideoQuality,
    pub meeting_quality: MeetingQuality,
    pub travel_mode: TravelMode,
    pub distance_band: DistanceBand,
    pub region: Region,
    /// Scale the grid factor by the green data-center multiplier.
    pub green_data_center: bool,
}

impl Default for RateSelection {
    fn default() -> Self {
        RateSelection {
            brand: PhoneBrand::AppleIphone,
            platform: VideoPlatform::GlobalStreaming,
            quality: VideoQuality::Hd720p,
            meeting_quality: MeetingQuality::Balanced,
            travel_mode: TravelMode::DomesticFlight,
            distance_band: DistanceBand::Medium,
            region: Region::China,
            green_data_center: false,
        }
    }
}

/// Rates plus the typical trip length of the selected distance band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolvedRates {
    pub rates: RateParameters,
    pub typical_distance_km: f64,
}

/// Immutable emission-factor dataset.
///
/// Sources behind the built-in values: carbon-trust and vendor environmental
/// reports (phones), IEA and streaming-provider reports with PUE 1.5 (video),
/// IPCC/DEFRA passenger-km factors (travel), IEA 2023 grid intensities (regions).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupTables {
    pub phone_carbon_kg: BTreeMap<PhoneBrand, f64>,
    /// Reference intensity at 1080p on an average grid.
    pub video_base_kg_per_hour: f64,
    pub platform_factor: BTreeMap<VideoPlatform, f64>,
    pub quality_factor: BTreeMap<VideoQuality, f64>,
    pub meeting_base_kg_per_hour: f64,
    pub meeting_quality_factor: BTreeMap<MeetingQuality, f64>,
    pub travel_factor_kg_per_km: BTreeMap<TravelMode, BTreeMap<DistanceBand, f64>>,
    pub typical_distance_km: BTreeMap<DistanceBand, f64>,
    pub electricity_kg_per_kwh: BTreeMap<Region, f64>,
    /// Applied to the grid factor when a renewable-powered data center is selected.
    pub green_data_center_multiplier: f64,
}

impl LookupTables {
    pub fn builtin() -> Self {
        use DistanceBand::*;

        let phone_carbon_kg = BTreeMap::from([
            (PhoneBrand::AppleIphone, 75.0),
            (PhoneBrand::SamsungGalaxy, 68.0),
            (PhoneBrand::Huawei, 65.0),
            (PhoneBrand::Xiaomi, 55.0),
            (PhoneBrand::OppoVivo, 52.0),
            (PhoneBrand::Other, 58.0),
        ]);
        let platform_factor = BTreeMap::from([
            (VideoPlatform::GlobalStreaming, 1.0),
            (VideoPlatform::DomesticStreaming, 1.1),
            (VideoPlatform::ShortVideo, 0.6),
            (VideoPlatform::VideoConferencing, 0.4),
        ]);
        // Bandwidth, and with it energy, grows non-linearly with resolution.
        let quality_factor = BTreeMap::from([
            (VideoQuality::Sd480p, 0.15),
            (VideoQuality::Hd720p, 0.4),
            (VideoQuality::FullHd1080p, 1.0),
            (VideoQuality::Uhd4k, 2.5),
        ]);
        let meeting_quality_factor = BTreeMap::from([
            (MeetingQuality::AudioFirst, 0.2),
            (MeetingQuality::Balanced, 0.5),
            (MeetingQuality::HdVideo, 0.8),
        ]);
        let band = |short: f64, medium: f64, long: f64, international: f64| {
            BTreeMap::from([
                (Short, short),
                (Medium, medium),
                (Long, long),
                (International, international),
            ])
        };
        let travel_factor_kg_per_km = BTreeMap::from([
            (TravelMode::DomesticFlight, band(0.275, 0.195, 0.170, 0.155)),
            (TravelMode::InternationalFlight, band(0.25, 0.18, 0.155, 0.142)),
            (TravelMode::HighSpeedRail, band(0.027, 0.025, 0.024, 0.024)),
            (TravelMode::Car, band(0.185, 0.175, 0.165, 0.165)),
            (TravelMode::PublicTransit, band(0.032, 0.030, 0.028, 0.026)),
        ]);
        let typical_distance_km = band(300.0, 750.0, 2000.0, 5000.0);
        let electricity_kg_per_kwh = BTreeMap::from([
            (Region::Europe, 0.23),
            (Region::UnitedStates, 0.37),
            (Region::China, 0.52),
            (Region::India, 0.72),
            (Region::Other, 0.45),
        ]);

        LookupTables {
            phone_carbon_kg,
            video_base_kg_per_hour: 0.055,
            platform_factor,
            quality_factor,
            meeting_base_kg_per_hour: 0.022,
            meeting_quality_factor,
            travel_factor_kg_per_km,
            typical_distance_km,
            electricity_kg_per_kwh,
            green_data_center_multiplier: 0.35,
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, TableError> {
        let tables: LookupTables = serde_json::from_str(json)?;
        tables.validate()?;
        Ok(tables)
    }

    pub fn from_path(path: &Path) -> Result<Self, TableError> {
        let raw = fs::read_to_string(path)?;
        let tables = Self::from_json_str(&raw)?;
        info!(path = %path.display(), "lookup tables loaded");
        Ok(tables)
    }

    /// Every factor must be finite and non-negative; the green multiplier must lie in [0, 1].
    pub fn validate(&self) -> Result<(), TableError> {
        check_scalar("video_base_kg_per_hour", self.video_base_kg_per_hour)?;
        check_scalar("meeting_base_kg_per_hour", self.meeting_base_kg_per_hour)?;
        check_map(&self.phone_carbon_kg)?;
        check_map(&self.platform_factor)?;
        check_map(&self.quality_factor)?;
        check_map(&self.meeting_quality_factor)?;
        check_map(&self.typical_distance_km)?;
        check_map(&self.electricity_kg_per_kwh)?;
        for (mode, bands) in &self.travel_factor_kg_per_km {
            for (band, &value) in bands {
                if !is_factor(value) {
                    return Err(TableError::InvalidFactor {
                        table: TravelMode::TABLE,
                        key: format!("{}/{}", mode.key(), band.key()),
                        value,
                    });
                }
            }
        }
        let m = self.green_data_center_multiplier;
        if !m.is_finite() || !(0.0..=1.0).contains(&m) {
            return Err(TableError::InvalidFactor {
                table: "green_data_center_multiplier",
                key: "multiplier".into(),
                value: m,
            });
        }
        Ok(())
    }

    pub fn resolve(&self, selection: &RateSelection) -> Result<ResolvedRates, TableError> {
        let phone_carbon_kg = lookup(&self.phone_carbon_kg, selection.brand)?;
        let video_intensity = self.video_base_kg_per_hour
            * lookup(&self.platform_factor, selection.platform)?
            * lookup(&self.quality_factor, selection.quality)?;
        let meeting_intensity = self.meeting_base_kg_per_hour
            * lookup(&self.meeting_quality_factor, selection.meeting_quality)?;

        let bands = self
            .travel_factor_kg_per_km
            .get(&selection.travel_mode)
            .ok_or_else(|| missing::<TravelMode>(selection.travel_mode.key().to_string()))?;
        let travel_factor = bands.get(&selection.distance_band).copied().ok_or_else(|| {
            missing::<TravelMode>(format!(
                "{}/{}",
                selection.travel_mode.key(),
                selection.distance_band.key()
            ))
        })?;
        let typical_distance_km = lookup(&self.typical_distance_km, selection.distance_band)?;

        let mut electricity = lookup(&self.electricity_kg_per_kwh, selection.region)?;
        if selection.green_data_center {
            electricity *= self.green_data_center_multiplier;
        }

        let rates = RateParameters {
            phone_carbon_kg,
            video_intensity_kg_per_hour: video_intensity,
            meeting_intensity_kg_per_hour: meeting_intensity,
            travel_factor_kg_per_km: travel_factor,
            electricity_carbon_kg_per_kwh: electricity,
        };
        debug!(?selection, ?rates, "rates resolved");

        Ok(ResolvedRates {
            rates,
            typical_distance_km,
        })
    }
}

impl Default for LookupTables {
    fn default() -> Self {
        Self::builtin()
    }
}

fn is_factor(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

fn check_scalar(table: &'static str, value: f64) -> Result<(), TableError> {
    if is_factor(value) {
        Ok(())
    } else {
        Err(TableError::InvalidFactor {
            table,
            key: table.into(),
            value,
        })
    }
}

fn check_map<C: Category>(map: &BTreeMap<C, f64>) -> Result<(), TableError> {
    match map.iter().find(|(_, v)| !is_factor(**v)) {
        Some((key, &value)) => Err(TableError::InvalidFactor {
            table: C::TABLE,
            key: key.key().into(),
            value,
        }),
        None => Ok(()),
    }
}

fn lookup<C: Category + Ord>(map: &BTreeMap<C, f64>, key: C) -> Result<f64, TableError> {
    map.get(&key)
        .copied()
        .ok_or_else(|| missing::<C>(key.key().to_string()))
}

fn missing<C: Category>(key: String) -> TableError {
    TableError::MissingEntry {
        table: C::TABLE,
        key,
    }
}
