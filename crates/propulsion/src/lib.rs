//! Propulsion models: thermodynamic converters, turbofan networks, and electric propulsors.

pub mod converters;
pub mod electric;
pub mod gas;
pub mod turbofan;

use thiserror::Error;

pub use converters::{
    Combustor, CompressionNozzle, Compressor, Converter, ExpansionNozzle, LoadedTurbine, NozzleExit, Ram,
    Turbine,
};
pub use electric::ElectricPropulsor;
pub use gas::{Freestream, Station, WorkingFluid};
pub use turbofan::{CycleState, Turbofan, TurbofanComponents, TurbofanSizing};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PropulsionError {
    #[error("{component}: non-physical state ({detail})")]
    PhysicalModel { component: String, detail: String },
    #[error("sizing did not converge: residual {residual:e} above tolerance {tolerance:e}")]
    SizingConvergence { residual: f64, tolerance: f64 },
    #[error("{propulsor} cannot operate here: {detail}")]
    OffDesign { propulsor: String, detail: String },
    #[error("{0} has not been sized")]
    NotSized(String),
    #[error("{0} is already sized")]
    AlreadySized(String),
    #[error("{component}: invalid parameter ({detail})")]
    InvalidParameter { component: String, detail: String },
}

/// Aggregate output of a propulsor at one flight condition.
#[derive(Debug, Clone, PartialEq)]
pub struct PropulsionOutput {
    pub thrust_n: f64,
    /// Thrust in body axes; the thrust line is aligned with the x axis.
    pub thrust_vector_n: [f64; 3],
    pub fuel_mass_rate_kg_s: f64,
    /// Electrical power drawn from `storage` (W).
    pub electric_power_w: f64,
    pub storage: Option<String>,
}

impl PropulsionOutput {
    pub fn thrust_along_body(
        thrust_n: f64,
        fuel_mass_rate_kg_s: f64,
        electric_power_w: f64,
        storage: Option<String>,
    ) -> Self {
        Self {
            thrust_n,
            thrust_vector_n: [thrust_n, 0.0, 0.0],
            fuel_mass_rate_kg_s,
            electric_power_w,
            storage,
        }
    }

    /// Thrust-specific fuel consumption (kg/(N·s)); zero when no thrust is produced.
    pub fn tsfc(&self) -> f64 {
        if self.thrust_n > 0.0 {
            self.fuel_mass_rate_kg_s / self.thrust_n
        } else {
            0.0
        }
    }
}

/// Any propulsor the mission solver can throttle.
#[derive(Debug, Clone, PartialEq)]
pub enum Propulsor {
    Turbofan(Turbofan),
    Electric(ElectricPropulsor),
}

impl Propulsor {
    pub fn tag(&self) -> &str {
        match self {
            Propulsor::Turbofan(t) => &t.tag,
            Propulsor::Electric(e) => &e.tag,
        }
    }

    pub fn number_of_engines(&self) -> u32 {
        match self {
            Propulsor::Turbofan(t) => t.number_of_engines,
            Propulsor::Electric(e) => e.number_of_engines,
        }
    }

    pub fn is_sized(&self) -> bool {
        match self {
            Propulsor::Turbofan(t) => t.is_sized(),
            Propulsor::Electric(e) => e.is_sized(),
        }
    }

    pub fn evaluate(&self, freestream: &Freestream, throttle: f64) -> Result<PropulsionOutput, PropulsionError> {
        match self {
            Propulsor::Turbofan(t) => t.evaluate(freestream, throttle),
            Propulsor::Electric(e) => e.evaluate(freestream, throttle),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tsfc_is_zero_without_thrust() {
        let out = PropulsionOutput::thrust_along_body(0.0, 0.1, 0.0, None);
        assert_eq!(out.tsfc(), 0.0);
        assert_eq!(out.thrust_vector_n, [0.0; 3]);
    }

    #[test]
    fn enum_dispatch_reports_unsized_turbofan() {
        let p = Propulsor::Turbofan(turbofan::tests::regression_turbofan());
        assert_eq!(p.tag(), "turbofan");
        assert_eq!(p.number_of_engines(), 2);
        assert!(!p.is_sized());
    }
}
