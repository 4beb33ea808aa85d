//! Take-off field length from the V2²/(T/W) correlation.

use skylark_atmosphere::{AtmosphereError, AtmosphereModel, AtmosphericState};
use skylark_core::units::ft_to_m;
use skylark_propulsion::{Freestream, PropulsionError, WorkingFluid};
use thiserror::Error;
use tracing::{debug, warn};

use crate::vehicle::Vehicle;

/// Speed at which available thrust is sampled, as a fraction of V2.
pub const THRUST_SPEED_FRACTION: f64 = 0.70;

#[derive(Debug, Error)]
pub enum PerformanceError {
    #[error("vehicle '{0}' has no engines")]
    NoEngines(String),
    #[error("vehicle has no configuration named '{0}'")]
    UnknownConfiguration(String),
    #[error("configuration '{0}' has no maximum lift coefficient")]
    MissingMaxLift(String),
    #[error("take-off thrust is {0} N")]
    NoThrust(f64),
    #[error(transparent)]
    Atmosphere(#[from] AtmosphereError),
    #[error(transparent)]
    Propulsion(#[from] PropulsionError),
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Airport {
    pub altitude_m: f64,
    /// Temperature offset from the standard day (K).
    pub delta_isa_k: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TakeoffEstimate {
    pub field_length_m: f64,
    pub stall_speed_m_s: f64,
    pub v2_m_s: f64,
    pub thrust_n: f64,
    pub takeoff_index: f64,
}

/// Correlation constants, lowest order first. Fields in feet.
fn correlation(engines: u32) -> [f64; 3] {
    match engines {
        3 => [667.9, 2.343, 0.000093],
        n if n >= 4 => [486.7, 2.282, 0.0000705],
        _ => [857.4, 2.476, 0.00014],
    }
}

/// Estimate the take-off field length of `vehicle` flying `configuration` at `airport`.
pub fn estimate_takeoff_field_length(
    vehicle: &Vehicle,
    configuration: &str,
    atmosphere: &dyn AtmosphereModel,
    airport: &Airport,
) -> Result<TakeoffEstimate, PerformanceError> {
    let config = vehicle
        .configuration(configuration)
        .ok_or_else(|| PerformanceError::UnknownConfiguration(configuration.to_string()))?;
    let cl_max = config
        .max_lift_coefficient
        .ok_or_else(|| PerformanceError::MissingMaxLift(configuration.to_string()))?;
    let engines = vehicle.engine_count();
    if engines == 0 {
        return Err(PerformanceError::NoEngines(vehicle.name.clone()));
    }
    if engines == 1 || engines > 4 {
        warn!(engines, "no correlation for this engine count; using the nearest one");
    }

    let sea_level = atmosphere.properties(0.0)?;
    let field = atmosphere.properties(airport.altitude_m)?;
    let temperature = field.temperature_k + airport.delta_isa_k;
    let sigma = (field.pressure_pa / sea_level.pressure_pa) / (temperature / sea_level.temperature_k);
    let density = sea_level.density_kg_m3 * sigma;
    let (gas_constant, gamma) = atmosphere.gas();

    let mass = vehicle.mass.takeoff_kg;
    let area = vehicle.aerodynamics.reference_area();
    let stall_speed = (2.0 * mass * sea_level.gravity_m_s2 / (density * area * cl_max)).sqrt();
    let v2 = config.v2_vs_ratio * stall_speed;

    let fluid = WorkingFluid {
        gamma,
        gas_constant,
    };
    let runway = AtmosphericState {
        temperature_k: temperature,
        density_kg_m3: density,
        ..field
    };
    let freestream = Freestream::from_atmosphere(&runway, THRUST_SPEED_FRACTION * v2, fluid)?;
    let mut thrust = 0.0;
    for propulsor in &vehicle.propulsors {
        thrust += propulsor.evaluate(&freestream, 1.0)?.thrust_n;
    }
    if !(thrust > 0.0) {
        return Err(PerformanceError::NoThrust(thrust));
    }

    let index = v2 * v2 / (thrust / mass);
    let feet: f64 = correlation(engines)
        .iter()
        .enumerate()
        .map(|(power, c)| c * index.powi(power as i32))
        .sum();
    debug!(stall_speed, v2, thrust, index, field_length_ft = feet, "take-off field length");
    Ok(TakeoffEstimate {
        field_length_m: ft_to_m(feet),
        stall_speed_m_s: stall_speed,
        v2_m_s: v2,
        thrust_n: thrust,
        takeoff_index: index,
    })
}
