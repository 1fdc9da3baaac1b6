#![forbid(unsafe_code)]

//! Annual carbon footprint of digital habits (video streaming, video meetings,
//! phone replacement) and the emissions avoided by meeting online instead of
//! travelling.
//!
//! The three entry points [`compute_footprint`], [`compute_savings`] and
//! [`compute_sensitivity`] are pure functions over [`RateParameters`] and
//! [`UsageParameters`]. Rates normally come from [`LookupTables::resolve`].

pub mod calculator;
pub mod error;
pub mod guards;
pub mod overrides;
pub mod scenarios;
pub mod tables;
pub mod types;

pub use calculator::{compute_footprint, compute_savings, compute_sensitivity};
pub use error::{FootprintError, TableError};
pub use guards::InputGuard;
pub use overrides::{ManualOverride, OverrideBounds};
pub use scenarios::{
    adjust_parameter, device_sharing, green_power, lifetime_extension, video_compression,
    AdjustedParameter, ComparisonScale, DualRoleComparison, ParameterAdjustment, Reduction,
};
pub use tables::{
    Category, DistanceBand, LookupTables, MeetingQuality, PhoneBrand, RateSelection, Region,
    ResolvedRates, TravelMode, VideoPlatform, VideoQuality,
};
pub use types::{
    Contributor, FootprintResult, RateParameters, SavingsResult, SensitivityEntry, UsageParameters,
};
