use std::path::Path;

use anyhow::{Context, Result};
use clap::builder::PossibleValuesParser;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use serde::Serialize;
use tracing::{info, Level};

use ict_carbon_footprint::{
    adjust_parameter, compute_footprint, compute_savings, compute_sensitivity, device_sharing,
    green_power, lifetime_extension, video_compression, AdjustedParameter, Category, DistanceBand,
    DualRoleComparison, FootprintError, FootprintResult, LookupTables, ManualOverride,
    MeetingQuality, OverrideBounds, ParameterAdjustment, PhoneBrand, RateParameters,
    RateSelection, Reduction, Region, SavingsResult, SensitivityEntry, TravelMode,
    UsageParameters, VideoPlatform, VideoQuality,
};
use ict_carbon_footprint::scenarios::MAX_TARGET_PHONE_YEARS;

/// Everything one invocation computed, in render order.
#[derive(Debug, Serialize)]
struct Report {
    selection: RateSelection,
    rates: RateParameters,
    usage: UsageParameters,
    footprint: FootprintResult,
    savings: SavingsResult,
    comparison: Option<DualRoleComparison>,
    sensitivity: Option<Vec<SensitivityEntry>>,
    scenarios: ScenarioReport,
}

#[derive(Debug, Serialize)]
struct ScenarioReport {
    green_power: Option<Reduction>,
    video_compression: Option<Reduction>,
    lifetime_extension: Option<Reduction>,
    device_sharing: Option<Reduction>,
    adjustments: Vec<ParameterAdjustment>,
}

fn category_arg<C: Category>(id: &'static str, default: C, help: &'static str) -> Arg {
    Arg::new(id)
        .long(id)
        .value_name("KEY")
        .value_parser(PossibleValuesParser::new(C::keys()))
        .default_value(default.key())
        .help(help)
}

fn number_arg(id: &'static str, default: Option<&'static str>, help: &'static str) -> Arg {
    let arg = Arg::new(id)
        .long(id)
        .value_name("NUM")
        .value_parser(value_parser!(f64))
        .allow_negative_numbers(true)
        .help(help);
    match default {
        Some(d) => arg.default_value(d),
        None => arg,
    }
}

fn command() -> Command {
    let defaults = RateSelection::default();
    Command::new("ict-footprint")
        .about("Annual ICT carbon footprint and travel-substitution savings estimator")
        .arg(category_arg("brand", defaults.brand, "Phone brand"))
        .arg(category_arg("platform", defaults.platform, "Most used video platform"))
        .arg(category_arg("quality", defaults.quality, "Usual streaming quality"))
        .arg(category_arg(
            "meeting-quality",
            defaults.meeting_quality,
            "Video meeting quality",
        ))
        .arg(category_arg(
            "travel-mode",
            defaults.travel_mode,
            "Travel mode replaced by meetings",
        ))
        .arg(category_arg("distance", defaults.distance_band, "Typical trip distance band"))
        .arg(category_arg("region", defaults.region, "Electricity grid region"))
        .arg(
            Arg::new("green-dc")
                .long("green-dc")
                .action(ArgAction::SetTrue)
                .help("Use renewable-powered data centers"),
        )
        .arg(number_arg("video-hours", Some("2"), "Daily video streaming hours (0-12)"))
        .arg(number_arg("meeting-hours", Some("3"), "Weekly video meeting hours (0-10)"))
        .arg(
            Arg::new("phone-years")
                .long("phone-years")
                .value_name("YEARS")
                .value_parser(value_parser!(u32))
                .default_value("2")
                .help("Phone replacement cycle in years (1-5)"),
        )
        .arg(number_arg(
            "travel-km",
            None,
            "Substituted travel per year in km (100-5000); defaults to the band's typical distance",
        ))
        .arg(number_arg("override-video", None, "Override video intensity (kg/h)"))
        .arg(number_arg("override-meeting", None, "Override meeting intensity (kg/h)"))
        .arg(number_arg("override-phone", None, "Override phone production carbon (kg)"))
        .arg(number_arg("override-travel", None, "Override travel factor (kg/km)"))
        .arg(
            Arg::new("unclamped")
                .long("unclamped")
                .action(ArgAction::SetTrue)
                .help("Apply overrides without clamping them to the slider ranges"),
        )
        .arg(number_arg(
            "green-ratio",
            Some("50"),
            "Scenario: data-center green power share (%)",
        ))
        .arg(number_arg("compression", Some("20"), "Scenario: video compression gain (%)"))
        .arg(
            Arg::new("current-years")
                .long("current-years")
                .value_name("YEARS")
                .value_parser(value_parser!(u32))
                .help("Scenario: current phone lifetime (1-5); defaults to --phone-years"),
        )
        .arg(
            Arg::new("target-years")
                .long("target-years")
                .value_name("YEARS")
                .value_parser(value_parser!(u32))
                .help("Scenario: target phone lifetime (2-6); defaults to one more year"),
        )
        .arg(number_arg("sharing", Some("50"), "Scenario: device utilisation gain (%)"))
        .arg(number_arg(
            "adjust-video",
            Some("0"),
            "Scenario: scale video intensity (-50..50 %)",
        ))
        .arg(number_arg(
            "adjust-phone",
            Some("0"),
            "Scenario: scale phone carbon (-50..50 %)",
        ))
        .arg(number_arg(
            "adjust-travel",
            Some("0"),
            "Scenario: scale travel factor (-50..50 %)",
        ))
        .arg(
            Arg::new("tables")
                .long("tables")
                .value_name("PATH")
                .help("JSON lookup-table dataset replacing the built-in factors"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .action(ArgAction::SetTrue)
                .help("Emit the report as JSON"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .action(ArgAction::SetTrue)
                .help("Write logs as JSON lines"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .help("Increase log verbosity (-v info, -vv debug, -vvv trace)"),
        )
}

fn init_tracing(verbosity: u8, json: bool) {
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let builder = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn category<C: Category>(matches: &ArgMatches, id: &str) -> Result<C> {
    let key = matches
        .get_one::<String>(id)
        .with_context(|| format!("missing --{id}"))?;
    C::from_key(key).with_context(|| format!("unknown {id} `{key}`"))
}

fn number(matches: &ArgMatches, id: &str) -> Result<f64> {
    matches
        .get_one::<f64>(id)
        .copied()
        .with_context(|| format!("missing --{id}"))
}

/// Ratio errors mean "nothing to show"; anything else is a caller mistake.
fn available<T>(result: Result<T, FootprintError>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(FootprintError::UndefinedRatio(reason)) => {
            info!(reason, "figure skipped");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Scenario slider value; a zero setting hides the scenario.
fn scenario_percent(matches: &ArgMatches, id: &str) -> Result<Option<f64>> {
    let percent = number(matches, id)?;
    Ok((percent != 0.0).then_some(percent))
}

fn load_tables(matches: &ArgMatches) -> Result<LookupTables> {
    match matches.get_one::<String>("tables") {
        Some(path) => LookupTables::from_path(Path::new(path))
            .with_context(|| format!("loading lookup tables from {path}")),
        None => Ok(LookupTables::builtin()),
    }
}

fn selection(matches: &ArgMatches) -> Result<RateSelection> {
    Ok(RateSelection {
        brand: category::<PhoneBrand>(matches, "brand")?,
        platform: category::<VideoPlatform>(matches, "platform")?,
        quality: category::<VideoQuality>(matches, "quality")?,
        meeting_quality: category::<MeetingQuality>(matches, "meeting-quality")?,
        travel_mode: category::<TravelMode>(matches, "travel-mode")?,
        distance_band: category::<DistanceBand>(matches, "distance")?,
        region: category::<Region>(matches, "region")?,
        green_data_center: matches.get_flag("green-dc"),
    })
}

fn build_report(matches: &ArgMatches, tables: &LookupTables) -> Result<Report> {
    let selection = selection(matches)?;
    let resolved = tables.resolve(&selection)?;

    let manual = ManualOverride {
        video_intensity_kg_per_hour: matches.get_one::<f64>("override-video").copied(),
        meeting_intensity_kg_per_hour: matches.get_one::<f64>("override-meeting").copied(),
        phone_carbon_kg: matches.get_one::<f64>("override-phone").copied(),
        travel_factor_kg_per_km: matches.get_one::<f64>("override-travel").copied(),
    };
    let rates = if matches.get_flag("unclamped") {
        manual.apply(&resolved.rates)
    } else {
        manual.apply_clamped(&resolved.rates, &OverrideBounds::default())?
    };

    let phone_years = matches.get_one::<u32>("phone-years").copied().unwrap_or(2);
    let usage = UsageParameters {
        daily_video_hours: number(matches, "video-hours")?,
        weekly_meeting_hours: number(matches, "meeting-hours")?,
        phone_replacement_years: phone_years,
        substituted_travel_km: matches
            .get_one::<f64>("travel-km")
            .copied()
            .unwrap_or(resolved.typical_distance_km),
    };

    let footprint = compute_footprint(&rates, &usage)?;
    let savings = compute_savings(&rates, &usage)?;
    let sensitivity = available(compute_sensitivity(&rates, &usage, footprint.total_kg))?;
    let comparison = DualRoleComparison::new(footprint.total_kg, savings.net_savings_kg);

    let current_years = matches
        .get_one::<u32>("current-years")
        .copied()
        .unwrap_or(phone_years);
    let target_years = matches
        .get_one::<u32>("target-years")
        .copied()
        .unwrap_or((current_years + 1).min(MAX_TARGET_PHONE_YEARS));
    let lifetime = if target_years > current_years {
        available(lifetime_extension(
            rates.phone_carbon_kg,
            current_years,
            target_years,
        ))?
    } else {
        None
    };

    let mut adjustments = Vec::new();
    for (id, parameter) in [
        ("adjust-video", AdjustedParameter::VideoIntensity),
        ("adjust-phone", AdjustedParameter::PhoneCarbon),
        ("adjust-travel", AdjustedParameter::TravelFactor),
    ] {
        if let Some(percent) = scenario_percent(matches, id)? {
            if let Some(a) = available(adjust_parameter(&rates, &usage, parameter, percent))? {
                adjustments.push(a);
            }
        }
    }

    let green = match scenario_percent(matches, "green-ratio")? {
        Some(ratio) => available(green_power(&footprint, ratio))?,
        None => None,
    };
    let compression = match scenario_percent(matches, "compression")? {
        Some(gain) => available(video_compression(&footprint, gain))?,
        None => None,
    };
    let sharing = match scenario_percent(matches, "sharing")? {
        Some(gain) => available(device_sharing(footprint.device_emissions_kg, gain))?,
        None => None,
    };

    let scenarios = ScenarioReport {
        green_power: green,
        video_compression: compression,
        lifetime_extension: lifetime,
        device_sharing: sharing,
        adjustments,
    };

    Ok(Report {
        selection,
        rates,
        usage,
        footprint,
        savings,
        comparison,
        sensitivity,
        scenarios,
    })
}

/// Share of the total not covered by the three contributors, if any.
fn other_share_percent(entries: &[SensitivityEntry]) -> Option<f64> {
    let covered: f64 = entries.iter().map(|e| e.contribution_share_percent).sum();
    (covered < 100.0 - 1e-9).then(|| 100.0 - covered)
}

fn report_json(report: &Report) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

fn print_reduction(label: &str, reduction: &Option<Reduction>) {
    if let Some(r) = reduction {
        println!(
            "  {label:<24} -{:.1} kg (-{:.1}%)",
            r.reduction_kg, r.percent_of_baseline
        );
    }
}

fn render_text(report: &Report) {
    let r = &report.rates;
    println!("Parameters");
    println!("  phone production        {:.0} kg", r.phone_carbon_kg);
    println!("  video streaming         {:.3} kg/h", r.video_intensity_kg_per_hour);
    println!("  video meetings          {:.3} kg/h", r.meeting_intensity_kg_per_hour);
    println!("  travel factor           {:.3} kg/km", r.travel_factor_kg_per_km);
    println!("  grid intensity          {:.2} kg/kWh", r.electricity_carbon_kg_per_kwh);

    let f = &report.footprint;
    println!();
    println!("Annual digital footprint: {:.1} kg CO2", f.total_kg);
    println!("  video streaming         {:.1} kg", f.video_emissions_kg);
    println!("  video meetings          {:.1} kg", f.meeting_emissions_kg);
    println!("  device production       {:.1} kg", f.device_emissions_kg);

    let s = &report.savings;
    println!();
    println!("Reduction potential: {:.1} kg CO2", s.net_savings_kg);
    println!(
        "  travel                  {:.1} kg ({} kg/km x {} km)",
        s.travel_emissions_kg, r.travel_factor_kg_per_km, report.usage.substituted_travel_km
    );
    println!("  video meetings          {:.1} kg", s.meeting_emissions_kg);

    if let Some(c) = &report.comparison {
        println!();
        println!("Emissions vs. reduction");
        println!("  Digital Footprint       {:.1} kg", c.footprint_kg);
        println!("  {:<24}{:.1} kg", c.savings_label(), c.savings_bar_kg);
    }

    if let Some(entries) = &report.sensitivity {
        println!();
        println!("Sensitivity (+10% per parameter)");
        for e in entries {
            println!(
                "  {:<22} {:>5.1}% of total, {:>5.1}% share",
                e.parameter.label(),
                e.percent_impact_on_total,
                e.contribution_share_percent
            );
        }
        if let Some(other) = other_share_percent(entries) {
            println!("  {:<22} {:>5.1}% share", "Other", other);
        }
        if let Some(top) = entries.first() {
            println!("  most sensitive: {}", top.parameter.label());
        }
    }

    let sc = &report.scenarios;
    println!();
    println!("Scenarios");
    print_reduction("green data centers", &sc.green_power);
    print_reduction("video compression", &sc.video_compression);
    print_reduction("longer phone lifetime", &sc.lifetime_extension);
    print_reduction("device sharing", &sc.device_sharing);
    for a in &sc.adjustments {
        println!(
            "  {:<24} {:+.1} kg ({:+.1}%)",
            format!("{:?}", a.parameter),
            a.change_kg,
            a.change_percent
        );
    }
}

fn main() -> Result<()> {
    let matches = command().get_matches();
    init_tracing(matches.get_count("verbose"), matches.get_flag("log-json"));

    let tables = load_tables(&matches)?;
    let report = build_report(&matches, &tables)?;
    if matches.get_flag("json") {
        println!("{}", report_json(&report)?);
    } else {
        render_text(&report);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches_for(args: &[&str]) -> Result<ArgMatches> {
        let mut argv = vec!["ict-footprint"];
        argv.extend_from_slice(args);
        Ok(command().try_get_matches_from(argv)?)
    }

    fn report_for(args: &[&str]) -> Result<Report> {
        let matches = matches_for(args)?;
        build_report(&matches, &load_tables(&matches)?)
    }

    #[test]
    fn test_command_definition_is_consistent() {
        command().debug_assert();
    }

    #[test]
    fn test_default_invocation() {
        let report = report_for(&[]).unwrap();
        assert_eq!(report.selection, RateSelection::default());
        assert_eq!(report.usage.substituted_travel_km, 750.0);
        assert!(report.footprint.total_kg > 0.0);
        assert_eq!(report.sensitivity.as_ref().map(Vec::len), Some(3));
        assert!(report.scenarios.lifetime_extension.is_some());
        assert!(report.scenarios.adjustments.is_empty());
    }

    #[test]
    fn test_overrides_are_clamped_unless_requested() {
        let clamped = report_for(&["--override-phone", "150"]).unwrap();
        assert_eq!(clamped.rates.phone_carbon_kg, 100.0);

        let raw = report_for(&["--override-phone", "150", "--unclamped"]).unwrap();
        assert_eq!(raw.rates.phone_carbon_kg, 150.0);
    }

    #[test]
    fn test_invalid_usage_is_an_error() {
        assert!(report_for(&["--video-hours", "13"]).is_err());
        assert!(report_for(&["--phone-years", "0"]).is_err());
        assert!(report_for(&["--region", "atlantis"]).is_err());
    }

    #[test]
    fn test_zero_footprint_skips_ratio_figures() {
        let report = report_for(&[
            "--video-hours",
            "0",
            "--meeting-hours",
            "0",
            "--override-phone",
            "0",
            "--unclamped",
        ])
        .unwrap();
        assert_eq!(report.footprint.total_kg, 0.0);
        assert!(report.sensitivity.is_none());
        assert!(report.scenarios.green_power.is_none());
        assert!(report.scenarios.device_sharing.is_none());
        assert!(report.scenarios.lifetime_extension.is_none());
    }

    #[test]
    fn test_adjustments_are_reported() {
        let report = report_for(&["--adjust-video", "10", "--adjust-travel", "-20"]).unwrap();
        let params: Vec<AdjustedParameter> =
            report.scenarios.adjustments.iter().map(|a| a.parameter).collect();
        assert_eq!(
            params,
            vec![AdjustedParameter::VideoIntensity, AdjustedParameter::TravelFactor]
        );
    }

    #[test]
    fn test_negative_override_is_rejected() {
        assert!(report_for(&["--override-video", "-1"]).is_err());
        assert!(report_for(&["--override-video", "-1", "--unclamped"]).is_err());
    }

    #[test]
    fn test_current_years_drives_lifetime_scenario() {
        let report = report_for(&["--current-years", "3"]).unwrap();
        let expected = lifetime_extension(report.rates.phone_carbon_kg, 3, 4).unwrap();
        assert_eq!(report.scenarios.lifetime_extension, Some(expected));
        assert_eq!(report.usage.phone_replacement_years, 2);

        let explicit = report_for(&["--current-years", "2", "--target-years", "5"]).unwrap();
        assert_eq!(
            explicit.scenarios.lifetime_extension,
            Some(lifetime_extension(explicit.rates.phone_carbon_kg, 2, 5).unwrap())
        );

        let at_limit = report_for(&["--current-years", "5", "--target-years", "5"]).unwrap();
        assert!(at_limit.scenarios.lifetime_extension.is_none());
    }

    #[test]
    fn test_zero_percent_scenarios_are_skipped() {
        let report = report_for(&[
            "--green-ratio",
            "0",
            "--compression",
            "0",
            "--sharing",
            "0",
        ])
        .unwrap();
        assert!(report.footprint.total_kg > 0.0);
        assert!(report.scenarios.green_power.is_none());
        assert!(report.scenarios.video_compression.is_none());
        assert!(report.scenarios.device_sharing.is_none());
        assert!(report.scenarios.lifetime_extension.is_some());
    }

    #[test]
    fn test_tables_flag_loads_dataset_from_file() {
        let name = format!("ict_cli_tables_{}.json", std::process::id());
        let path = std::env::temp_dir().join(name);
        let json = serde_json::to_string(&LookupTables::builtin()).unwrap();
        std::fs::write(&path, json).unwrap();
        let path_arg = path.to_string_lossy().into_owned();

        let from_file = report_for(&["--tables", &path_arg]);
        std::fs::remove_file(&path).unwrap();
        let from_file = from_file.unwrap();
        let builtin = report_for(&[]).unwrap();
        assert_eq!(from_file.rates, builtin.rates);
        assert_eq!(from_file.footprint, builtin.footprint);
    }

    #[test]
    fn test_missing_tables_file_is_an_error() {
        let path = std::env::temp_dir().join("ict_cli_tables_does_not_exist.json");
        let matches = matches_for(&["--tables", &path.to_string_lossy()]).unwrap();
        let err = load_tables(&matches).unwrap_err();
        assert!(err.to_string().contains("loading lookup tables"));
    }

    #[test]
    fn test_json_report_has_all_sections() {
        let report = report_for(&["--adjust-phone", "10"]).unwrap();
        let json = report_json(&report).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        for key in [
            "selection",
            "rates",
            "usage",
            "footprint",
            "savings",
            "comparison",
            "sensitivity",
            "scenarios",
        ] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        assert_eq!(value["footprint"]["total_kg"], report.footprint.total_kg);
        assert_eq!(value["scenarios"]["adjustments"].as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn test_other_share_covers_unattributed_total() {
        let report = report_for(&[]).unwrap();
        let entries = report.sensitivity.unwrap();
        assert_eq!(other_share_percent(&entries), None);

        let doubled =
            compute_sensitivity(&report.rates, &report.usage, 2.0 * report.footprint.total_kg)
                .unwrap();
        let other = other_share_percent(&doubled).unwrap();
        assert!((other - 50.0).abs() < 1e-9);
    }
}
