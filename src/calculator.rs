use tracing::debug;

use crate::error::FootprintError;
use crate::guards::InputGuard;
use crate::types::{
    Contributor, FootprintResult, RateParameters, SavingsResult, SensitivityEntry, UsageParameters,
};

pub const DAYS_PER_YEAR: f64 = 365.0;
pub const WEEKS_PER_YEAR: f64 = 52.0;
/// Relative parameter increase applied by the sensitivity analysis.
pub const SENSITIVITY_STEP: f64 = 0.10;

/// Annual meeting emissions, shared by the footprint and the savings balance.
fn annual_meeting_kg(rates: &RateParameters, usage: &UsageParameters) -> f64 {
    usage.weekly_meeting_hours * rates.meeting_intensity_kg_per_hour * WEEKS_PER_YEAR
}

/// Annual footprint of a usage pattern: video + meetings + amortised phone production.
pub fn compute_footprint(
    rates: &RateParameters,
    usage: &UsageParameters,
) -> Result<FootprintResult, FootprintError> {
    InputGuard::validate_rates(rates)?;
    InputGuard::validate_usage(usage)?;

    let video = usage.daily_video_hours * rates.video_intensity_kg_per_hour * DAYS_PER_YEAR;
    let meeting = annual_meeting_kg(rates, usage);
    let device = rates.phone_carbon_kg / f64::from(usage.phone_replacement_years);
    let total = video + meeting + device;

    debug!(video, meeting, device, total, "footprint computed");

    Ok(FootprintResult {
        video_emissions_kg: video,
        meeting_emissions_kg: meeting,
        device_emissions_kg: device,
        total_kg: total,
    })
}

/// Travel emissions avoided by meeting online instead. The net figure is not
/// clamped: a negative balance means the meetings cost more than the trip.
pub fn compute_savings(
    rates: &RateParameters,
    usage: &UsageParameters,
) -> Result<SavingsResult, FootprintError> {
    InputGuard::validate_rates(rates)?;
    InputGuard::validate_usage(usage)?;

    let travel = usage.substituted_travel_km * rates.travel_factor_kg_per_km;
    let meeting = annual_meeting_kg(rates, usage);
    let net = travel - meeting;

    debug!(travel, meeting, net, "savings computed");

    Ok(SavingsResult {
        travel_emissions_kg: travel,
        meeting_emissions_kg: meeting,
        net_savings_kg: net,
    })
}

/// Effect of a 10% increase in each contributor on `total_kg`, most sensitive first.
///
/// Ties keep enumeration order (video, meeting, device).
pub fn compute_sensitivity(
    rates: &RateParameters,
    usage: &UsageParameters,
    total_kg: f64,
) -> Result<Vec<SensitivityEntry>, FootprintError> {
    InputGuard::validate_denominator(
        "total_kg",
        total_kg,
        "sensitivity is undefined, requires total_kg > 0",
    )?;
    let footprint = compute_footprint(rates, usage)?;

    let mut entries: Vec<SensitivityEntry> = Contributor::ALL
        .iter()
        .map(|&parameter| {
            let contribution = footprint.contribution(parameter);
            SensitivityEntry {
                parameter,
                percent_impact_on_total: (contribution * SENSITIVITY_STEP / total_kg) * 100.0,
                contribution_share_percent: (contribution / total_kg) * 100.0,
            }
        })
        .collect();

    // Stable sort keeps enumeration order on ties.
    entries.sort_by(|a, b| b.percent_impact_on_total.total_cmp(&a.percent_impact_on_total));

    debug!(
        most_sensitive = ?entries.first().map(|e| e.parameter),
        "sensitivity ranked"
    );
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const EPS: f64 = 1e-9;

    fn reference_rates() -> RateParameters {
        RateParameters {
            phone_carbon_kg: 75.0,
            video_intensity_kg_per_hour: 0.055,
            meeting_intensity_kg_per_hour: 0.011,
            travel_factor_kg_per_km: 0.195,
            electricity_carbon_kg_per_kwh: 0.52,
        }
    }

    fn reference_usage() -> UsageParameters {
        UsageParameters {
            daily_video_hours: 2.0,
            weekly_meeting_hours: 3.0,
            phone_replacement_years: 2,
            substituted_travel_km: 1000.0,
        }
    }

    #[test]
    fn test_reference_footprint() {
        let fp = compute_footprint(&reference_rates(), &reference_usage()).unwrap();
        assert!((fp.video_emissions_kg - 40.15).abs() < EPS);
        assert!((fp.meeting_emissions_kg - 1.716).abs() < EPS);
        assert!((fp.device_emissions_kg - 37.5).abs() < EPS);
        assert!((fp.total_kg - 79.366).abs() < EPS);
    }

    #[test]
    fn test_zero_replacement_years_is_invalid() {
        let usage = UsageParameters {
            phone_replacement_years: 0,
            ..reference_usage()
        };
        assert!(matches!(
            compute_footprint(&reference_rates(), &usage),
            Err(FootprintError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_negative_or_non_finite_rates_are_invalid() {
        let negative = RateParameters {
            video_intensity_kg_per_hour: -0.01,
            ..reference_rates()
        };
        assert!(compute_footprint(&negative, &reference_usage()).is_err());

        let nan = RateParameters {
            travel_factor_kg_per_km: f64::NAN,
            ..reference_rates()
        };
        assert!(compute_savings(&nan, &reference_usage()).is_err());
    }

    #[test]
    fn test_reference_savings() {
        let s = compute_savings(&reference_rates(), &reference_usage()).unwrap();
        assert!((s.travel_emissions_kg - 195.0).abs() < EPS);
        assert!((s.meeting_emissions_kg - 1.716).abs() < EPS);
        assert!((s.net_savings_kg - 193.284).abs() < EPS);
    }

    #[test]
    fn test_savings_may_be_negative() {
        let rates = RateParameters {
            travel_factor_kg_per_km: 0.0,
            ..reference_rates()
        };
        let s = compute_savings(&rates, &reference_usage()).unwrap();
        assert!(s.net_savings_kg < 0.0);
        assert_eq!(s.net_savings_kg, -s.meeting_emissions_kg);
    }

    #[test]
    fn test_sensitivity_ranking() {
        let rates = reference_rates();
        let usage = reference_usage();
        let total = compute_footprint(&rates, &usage).unwrap().total_kg;
        let entries = compute_sensitivity(&rates, &usage, total).unwrap();

        let order: Vec<Contributor> = entries.iter().map(|e| e.parameter).collect();
        assert_eq!(
            order,
            vec![Contributor::Video, Contributor::Device, Contributor::Meeting]
        );

        let video = &entries[0];
        assert!((video.contribution_share_percent - 40.15 / 79.366 * 100.0).abs() < 1e-9);
        let expected_impact = video.contribution_share_percent * 0.1;
        assert!((video.percent_impact_on_total - expected_impact).abs() < 1e-9);
    }

    #[test]
    fn test_sensitivity_ties_keep_enumeration_order() {
        let rates = RateParameters {
            phone_carbon_kg: 0.0,
            video_intensity_kg_per_hour: 0.0,
            meeting_intensity_kg_per_hour: 0.0,
            ..reference_rates()
        };
        let entries = compute_sensitivity(&rates, &reference_usage(), 10.0).unwrap();
        let order: Vec<Contributor> = entries.iter().map(|e| e.parameter).collect();
        assert_eq!(order, Contributor::ALL.to_vec());
        assert!(entries.iter().all(|e| e.percent_impact_on_total == 0.0));
    }

    #[test]
    fn test_sensitivity_zero_total_is_undefined() {
        assert!(matches!(
            compute_sensitivity(&reference_rates(), &reference_usage(), 0.0),
            Err(FootprintError::UndefinedRatio(_))
        ));
    }

    #[test]
    fn test_repeated_calls_are_bit_identical() {
        let a = compute_footprint(&reference_rates(), &reference_usage()).unwrap();
        let b = compute_footprint(&reference_rates(), &reference_usage()).unwrap();
        assert_eq!(a.total_kg.to_bits(), b.total_kg.to_bits());
        assert_eq!(a, b);
    }

    fn rates_strategy() -> impl Strategy<Value = RateParameters> {
        (0.0..150.0f64, 0.0..0.5f64, 0.0..0.2f64, 0.0..0.4f64, 0.0..1.0f64).prop_map(
            |(phone, video, meeting, travel, grid)| RateParameters {
                phone_carbon_kg: phone,
                video_intensity_kg_per_hour: video,
                meeting_intensity_kg_per_hour: meeting,
                travel_factor_kg_per_km: travel,
                electricity_carbon_kg_per_kwh: grid,
            },
        )
    }

    fn usage_strategy() -> impl Strategy<Value = UsageParameters> {
        (0.0..=12.0f64, 0.0..=10.0f64, 1u32..=5, 100.0..=5000.0f64).prop_map(
            |(video, meeting, years, km)| UsageParameters {
                daily_video_hours: video,
                weekly_meeting_hours: meeting,
                phone_replacement_years: years,
                substituted_travel_km: km,
            },
        )
    }

    proptest! {
        #[test]
        fn total_is_exact_sum(rates in rates_strategy(), usage in usage_strategy()) {
            let fp = compute_footprint(&rates, &usage).unwrap();
            prop_assert_eq!(
                fp.total_kg,
                fp.video_emissions_kg + fp.meeting_emissions_kg + fp.device_emissions_kg
            );
            prop_assert!(fp.video_emissions_kg >= 0.0);
            prop_assert!(fp.meeting_emissions_kg >= 0.0);
            prop_assert!(fp.device_emissions_kg >= 0.0);
        }

        #[test]
        fn footprint_is_monotone_in_usage(
            rates in rates_strategy(),
            usage in usage_strategy(),
            extra_video in 0.0..=12.0f64,
            extra_meeting in 0.0..=10.0f64,
        ) {
            let base = compute_footprint(&rates, &usage).unwrap().total_kg;

            let more_video = UsageParameters {
                daily_video_hours: (usage.daily_video_hours + extra_video).min(12.0),
                ..usage
            };
            prop_assert!(compute_footprint(&rates, &more_video).unwrap().total_kg >= base);

            let more_meetings = UsageParameters {
                weekly_meeting_hours: (usage.weekly_meeting_hours + extra_meeting).min(10.0),
                ..usage
            };
            prop_assert!(compute_footprint(&rates, &more_meetings).unwrap().total_kg >= base);

            // A longer replacement cycle lowers the device share, never the other two.
            let fewer_years = UsageParameters {
                phone_replacement_years: 1,
                ..usage
            };
            prop_assert!(compute_footprint(&rates, &fewer_years).unwrap().total_kg >= base);
        }

        #[test]
        fn net_savings_linear_in_travel_km(
            rates in rates_strategy(),
            usage in usage_strategy(),
            km in 100.0..=5000.0f64,
        ) {
            let a = compute_savings(&rates, &usage).unwrap().net_savings_kg;
            let moved = UsageParameters { substituted_travel_km: km, ..usage };
            let b = compute_savings(&rates, &moved).unwrap().net_savings_kg;
            let expected = (km - usage.substituted_travel_km) * rates.travel_factor_kg_per_km;
            prop_assert!((b - a - expected).abs() < 1e-9 * (1.0 + a.abs() + b.abs()));
        }

        #[test]
        fn sensitivity_shares_never_exceed_total(
            rates in rates_strategy(),
            usage in usage_strategy(),
        ) {
            let total = compute_footprint(&rates, &usage).unwrap().total_kg;
            prop_assume!(total > 0.0);
            let entries = compute_sensitivity(&rates, &usage, total).unwrap();
            prop_assert_eq!(entries.len(), 3);
            let shares: f64 = entries.iter().map(|e| e.contribution_share_percent).sum();
            prop_assert!(shares <= 100.0 + 1e-9);
            for pair in entries.windows(2) {
                prop_assert!(pair[0].percent_impact_on_total >= pair[1].percent_impact_on_total);
            }
        }
    }
}
