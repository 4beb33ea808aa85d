use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use skylark::config::{load_mission_configs, load_vehicle_configs};
use skylark::export::summary::MissionSummary;
use skylark::export::{nodes, summary, writer_for_path};
use skylark::mission::catalog::atmosphere_from_config;
use skylark::mission::{
    MissionError, MissionResult, TakeoffEstimate, airport_from_config, estimate_takeoff_field_length,
    evaluate_mission, mission_from_config, select_mission,
};
use skylark::units::{j_to_kwh, m_to_km};
use skylark::vehicle;
use skylark_cli::{format_duration, init_logging};
use tracing::warn;

#[derive(Parser)]
#[command(author, version, about = "Fly a catalog mission and report its performance")]
struct Cli {
    /// Vehicle catalog (YAML list, TOML file, or directory of TOML files)
    #[arg(long, default_value = "configs/vehicles")]
    vehicles: PathBuf,

    /// Mission catalog (YAML list, TOML file, or directory of TOML files)
    #[arg(long, default_value = "configs/missions")]
    missions: PathBuf,

    /// Vehicle name (defaults to the mission's vehicle, then the first catalog entry)
    #[arg(long)]
    vehicle: Option<String>,

    /// Mission name (defaults to the first catalog entry)
    #[arg(long)]
    mission: Option<String>,

    /// Write per-node results as CSV (`-` for stdout)
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Write a JSON mission summary (`-` for stdout)
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    let vehicle_catalog = load_vehicle_configs(&cli.vehicles)
        .with_context(|| format!("loading vehicles from {}", cli.vehicles.display()))?;
    let mission_catalog = load_mission_configs(&cli.missions)
        .with_context(|| format!("loading missions from {}", cli.missions.display()))?;

    let record = select_mission(&mission_catalog, cli.mission.as_deref())?;
    let requested_vehicle = cli.vehicle.as_deref().or(record.vehicle.as_deref());
    let vehicle = vehicle::select(&vehicle_catalog, requested_vehicle)?;
    let mission = mission_from_config(record)?;

    let takeoff = match &record.airport {
        Some(airport) => {
            let atmosphere = atmosphere_from_config(&record.atmosphere)?;
            match estimate_takeoff_field_length(
                &vehicle,
                &airport.configuration,
                atmosphere.as_ref(),
                &airport_from_config(airport),
            ) {
                Ok(estimate) => Some(estimate),
                Err(err) => {
                    warn!("take-off field length unavailable: {err}");
                    None
                }
            }
        }
        None => None,
    };

    match evaluate_mission(&vehicle, &mission) {
        Ok(result) => {
            print_report(&result, takeoff.as_ref());
            write_outputs(&cli, &result, MissionSummary::from_result(&result), takeoff.as_ref())?;
            Ok(())
        }
        Err(MissionError::Segment {
            index,
            tag,
            source,
            partial,
        }) => {
            print_report(&partial, takeoff.as_ref());
            let reason = format!("segment {index} ('{tag}'): {source}");
            write_outputs(&cli, &partial, MissionSummary::partial(&partial, &reason), takeoff.as_ref())?;
            Err(anyhow::anyhow!("mission '{}' stopped in {reason}", mission.tag))
        }
        Err(err) => Err(err.into()),
    }
}

fn write_outputs(
    cli: &Cli,
    result: &MissionResult,
    report: MissionSummary,
    takeoff: Option<&TakeoffEstimate>,
) -> anyhow::Result<()> {
    if let Some(path) = &cli.csv {
        nodes::write_csv(writer_for_path(path)?, result)
            .with_context(|| format!("writing {}", path.display()))?;
    }
    if let Some(path) = &cli.summary {
        let report = match takeoff {
            Some(estimate) => report.with_takeoff(estimate),
            None => report,
        };
        summary::write_json(writer_for_path(path)?, &report)
            .with_context(|| format!("writing {}", path.display()))?;
    }
    Ok(())
}

fn print_report(result: &MissionResult, takeoff: Option<&TakeoffEstimate>) {
    println!("=== Mission '{}' / vehicle '{}' ===", result.mission, result.vehicle);
    println!(
        "{:<14} {:>5} {:>11} {:>11} {:>10} {:>10} {:>9} {:>12}",
        "segment", "nodes", "t_end", "alt_end_m", "dist_km", "mass_kg", "max_thr", "energy_kWh"
    );
    for segment in &result.segments {
        let last = segment.len().saturating_sub(1);
        let max_throttle = segment.throttle.iter().copied().fold(0.0, f64::max);
        println!(
            "{:<14} {:>5} {:>11} {:>11.1} {:>10.2} {:>10.2} {:>9.3} {:>12.3}",
            segment.tag,
            segment.len(),
            format_duration(segment.time_s.get(last).copied().unwrap_or_default()),
            segment.altitude_m.get(last).copied().unwrap_or_default(),
            m_to_km(segment.distance_m.get(last).copied().unwrap_or_default()),
            segment.mass_kg.get(last).copied().unwrap_or_default(),
            max_throttle,
            j_to_kwh(segment.energy_remaining_j.get(last).copied().unwrap_or_default()),
        );
    }
    println!("Duration       : {}", format_duration(result.duration_s()));
    println!("Ground distance: {:.2} km", m_to_km(result.ground_distance_m()));
    println!("Fuel burned    : {:.3} kg", result.fuel_burned_kg());
    for (tag, consumed) in result.energy_consumed_j() {
        println!("Energy used    : {tag} {:.3} kWh", j_to_kwh(consumed));
    }
    let diagnostics = result.diagnostics().count();
    if diagnostics > 0 {
        println!("Diagnostics    : {diagnostics} node warnings");
    }
    if let Some(estimate) = takeoff {
        println!(
            "Take-off field : {:.0} m (V2 = {:.1} m/s)",
            estimate.field_length_m, estimate.v2_m_s
        );
    }
}
