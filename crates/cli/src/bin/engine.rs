use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::Parser;
use skylark::atmosphere::{AtmosphereModel, UsStandard1976};
use skylark::config::load_vehicle_configs;
use skylark::propulsion::{Freestream, Propulsor, WorkingFluid};
use skylark::vehicle;
use skylark_cli::init_logging;

#[derive(Parser)]
#[command(author, version, about = "Evaluate a sized turbofan off-design")]
struct Cli {
    /// Vehicle catalog (YAML list, TOML file, or directory of TOML files)
    #[arg(long, default_value = "configs/vehicles")]
    vehicles: PathBuf,

    /// Vehicle name (defaults to the first catalog entry)
    #[arg(long)]
    vehicle: Option<String>,

    /// Turbofan tag (defaults to the vehicle's first turbofan)
    #[arg(long)]
    engine: Option<String>,

    /// Flight Mach number
    #[arg(long, default_value_t = 0.8)]
    mach: f64,

    /// Geometric altitude in metres (standard day)
    #[arg(long, default_value_t = 10_668.0)]
    altitude: f64,

    /// Throttle setting in [0, 1]
    #[arg(long, default_value_t = 1.0)]
    throttle: f64,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    let catalog = load_vehicle_configs(&cli.vehicles)
        .with_context(|| format!("loading vehicles from {}", cli.vehicles.display()))?;
    let vehicle = vehicle::select(&catalog, cli.vehicle.as_deref())?;

    let engine = vehicle
        .propulsors
        .iter()
        .filter_map(|p| match p {
            Propulsor::Turbofan(t) => Some(t),
            Propulsor::Electric(_) => None,
        })
        .find(|t| cli.engine.as_deref().is_none_or(|tag| t.tag == tag));
    let Some(engine) = engine else {
        bail!("vehicle '{}' has no matching turbofan", vehicle.name);
    };

    let air = UsStandard1976::new().properties(cli.altitude)?;
    let freestream = Freestream::new(cli.mach, air.pressure_pa, air.temperature_k, WorkingFluid::air())?;
    let output = engine.evaluate(&freestream, cli.throttle)?;

    println!("=== Turbofan '{}' on '{}' ===", engine.tag, vehicle.name);
    println!("Engines        : {}", engine.number_of_engines);
    println!(
        "Condition      : M {:.3}, {:.0} m, throttle {:.2}",
        cli.mach, cli.altitude, cli.throttle
    );
    println!("Thrust         : {:.1} N", output.thrust_n);
    println!("Fuel flow      : {:.5} kg/s", output.fuel_mass_rate_kg_s);
    println!("TSFC           : {:.4} kg/(N·h)", output.tsfc() * 3_600.0);
    if let Some(sizing) = engine.sizing() {
        println!(
            "Design core    : {:.3} kg/s (corrected {:.3} kg/s)",
            sizing.design_core_mass_flow_kg_s, sizing.corrected_core_mass_flow_kg_s
        );
    }
    Ok(())
}
