//! Two-spool, separate-exhaust turbofan assembled from converters.
//!
//! Components are evaluated in a fixed order: ram, inlet, fan, low-pressure
//! compressor, high-pressure compressor, combustor, high-pressure turbine,
//! low-pressure turbine, then the core and fan nozzles. The fan runs before the
//! low-pressure turbine because its work loads that spool.

use tracing::{debug, info};

use crate::converters::{
    Combustor, CompressionNozzle, Compressor, Converter, ExpansionNozzle, NozzleExit, Ram, Turbine,
};
use crate::gas::{Freestream, Station};
use crate::{PropulsionError, PropulsionOutput};

/// Relative thrust mismatch accepted when verifying a sizing result.
pub const SIZING_TOLERANCE: f64 = 1e-6;

/// Component set of a turbofan.
#[derive(Debug, Clone, PartialEq)]
pub struct TurbofanComponents {
    pub ram: Ram,
    pub inlet_nozzle: CompressionNozzle,
    pub fan: Compressor,
    pub low_pressure_compressor: Compressor,
    pub high_pressure_compressor: Compressor,
    pub combustor: Combustor,
    pub high_pressure_turbine: Turbine,
    pub low_pressure_turbine: Turbine,
    pub core_nozzle: ExpansionNozzle,
    pub fan_nozzle: ExpansionNozzle,
}

/// Values fixed by sizing and reused for every off-design evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TurbofanSizing {
    /// Core mass flow per engine at the design point (kg/s).
    pub design_core_mass_flow_kg_s: f64,
    /// Core mass flow corrected to the reference state (kg/s).
    pub corrected_core_mass_flow_kg_s: f64,
    /// Thrust per unit total airflow at the design point (N·s/kg).
    pub design_specific_thrust: f64,
    pub design_fuel_to_air_ratio: f64,
}

/// Station-by-station result of one pass through the cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleState {
    pub freestream_stagnation: Station,
    pub inlet: Station,
    pub fan: Station,
    pub low_pressure_compressor: Station,
    pub high_pressure_compressor: Station,
    pub combustor: Station,
    pub high_pressure_turbine: Station,
    pub low_pressure_turbine: Station,
    pub core_exit: NozzleExit,
    pub fan_exit: NozzleExit,
    /// Thrust per unit total airflow (N·s/kg).
    pub specific_thrust: f64,
    pub fuel_to_air_ratio: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Turbofan {
    pub tag: String,
    pub number_of_engines: u32,
    pub bypass_ratio: f64,
    /// Total thrust of all engines at the design point (N).
    pub design_thrust_n: f64,
    pub components: TurbofanComponents,
    pub reference_temperature_k: f64,
    pub reference_pressure_pa: f64,
    sizing: Option<TurbofanSizing>,
}

impl Turbofan {
    pub fn new(
        tag: impl Into<String>,
        number_of_engines: u32,
        bypass_ratio: f64,
        design_thrust_n: f64,
        components: TurbofanComponents,
    ) -> Self {
        Self {
            tag: tag.into(),
            number_of_engines,
            bypass_ratio,
            design_thrust_n,
            components,
            reference_temperature_k: skylark_core::constants::T_SEA_LEVEL,
            reference_pressure_pa: skylark_core::constants::P_SEA_LEVEL,
            sizing: None,
        }
    }

    pub fn sizing(&self) -> Option<&TurbofanSizing> {
        self.sizing.as_ref()
    }

    pub fn is_sized(&self) -> bool {
        self.sizing.is_some()
    }

    /// Run the thermodynamic chain for one freestream condition.
    pub fn cycle(&self, freestream: &Freestream) -> Result<CycleState, PropulsionError> {
        let c = &self.components;
        let fluid = &freestream.fluid;

        let freestream_stagnation = c.ram.capture(freestream)?;
        let inlet = c.inlet_nozzle.convert(&freestream_stagnation, freestream)?;
        let fan = c.fan.convert(&inlet, freestream)?;
        let lpc = c.low_pressure_compressor.convert(&inlet, freestream)?;
        let hpc = c.high_pressure_compressor.convert(&lpc, freestream)?;
        let burner = c.combustor.convert(&hpc, freestream)?;

        let hpc_work = c.high_pressure_compressor.work(&lpc, &hpc, fluid);
        let hpt = c.high_pressure_turbine.loaded(hpc_work).convert(&burner, freestream)?;

        let lpc_work = c.low_pressure_compressor.work(&inlet, &lpc, fluid);
        let fan_work = c.fan.work(&inlet, &fan, fluid);
        let lpt = c
            .low_pressure_turbine
            .loaded(lpc_work + self.bypass_ratio * fan_work)
            .convert(&hpt, freestream)?;

        let core_exit = c.core_nozzle.exhaust(&lpt, freestream)?;
        let fan_exit = c.fan_nozzle.exhaust(&fan, freestream)?;

        let specific_thrust = self.specific_thrust(freestream, &freestream_stagnation, &core_exit, &fan_exit);
        if !specific_thrust.is_finite() {
            return Err(PropulsionError::OffDesign {
                propulsor: self.tag.clone(),
                detail: "specific thrust is not finite".into(),
            });
        }

        Ok(CycleState {
            freestream_stagnation,
            inlet,
            fan,
            low_pressure_compressor: lpc,
            high_pressure_compressor: hpc,
            combustor: burner,
            high_pressure_turbine: hpt,
            low_pressure_turbine: lpt,
            core_exit,
            fan_exit,
            specific_thrust,
            fuel_to_air_ratio: burner.fuel_to_air_ratio,
        })
    }

    /// Momentum plus pressure thrust of both streams per unit total airflow.
    ///
    /// The pressure term is written through mass-flow functions so it stays finite
    /// when the freestream is at rest.
    fn specific_thrust(
        &self,
        freestream: &Freestream,
        stagnation: &Station,
        core: &NozzleExit,
        fan: &NozzleExit,
    ) -> f64 {
        let fluid = &freestream.fluid;
        let gamma = fluid.gamma;
        let a0 = freestream.speed_of_sound();
        let u0 = freestream.velocity();
        let flow_exponent = (gamma + 1.0) / (2.0 * (gamma - 1.0));
        let k = ((gamma + 1.0) / 2.0).powf(flow_exponent);
        let area_function = |mach: f64| k / fluid.stagnation_ratio(mach).powf(flow_exponent);
        let free_area = area_function(freestream.mach);

        let pressure_term = |exit: &NozzleExit| {
            if exit.mach == 0.0 {
                return 0.0;
            }
            let exit_area = exit.mach * area_function(exit.mach);
            a0 / gamma * free_area / exit_area
                * (stagnation.total_pressure_pa / exit.stagnation.total_pressure_pa)
                * (exit.stagnation.total_temperature_k / stagnation.total_temperature_k).sqrt()
                * (exit.static_pressure_pa / freestream.pressure_pa - 1.0)
        };

        let core_term = core.velocity_m_s - u0 + pressure_term(core);
        let fan_term = fan.velocity_m_s - u0 + pressure_term(fan);
        (core_term + self.bypass_ratio * fan_term) / (1.0 + self.bypass_ratio)
    }

    fn flow_scaling(&self, inlet: &Station) -> f64 {
        (self.reference_temperature_k / inlet.total_temperature_k).sqrt()
            * (inlet.total_pressure_pa / self.reference_pressure_pa)
    }

    /// Fix the core mass flow so the network meets its design thrust at `design`.
    pub fn size(&mut self, design: &Freestream) -> Result<TurbofanSizing, PropulsionError> {
        if self.sizing.is_some() {
            return Err(PropulsionError::AlreadySized(self.tag.clone()));
        }
        if !(self.design_thrust_n > 0.0) || self.number_of_engines == 0 {
            return Err(PropulsionError::InvalidParameter {
                component: self.tag.clone(),
                detail: format!(
                    "design thrust {} N across {} engines",
                    self.design_thrust_n, self.number_of_engines
                ),
            });
        }

        let cycle = self.cycle(design)?;
        if !(cycle.specific_thrust > 0.0) {
            return Err(PropulsionError::SizingConvergence {
                residual: 1.0,
                tolerance: SIZING_TOLERANCE,
            });
        }
        let engines = f64::from(self.number_of_engines);
        let core_flow =
            self.design_thrust_n / (cycle.specific_thrust * (1.0 + self.bypass_ratio) * engines);
        let sizing = TurbofanSizing {
            design_core_mass_flow_kg_s: core_flow,
            corrected_core_mass_flow_kg_s: core_flow / self.flow_scaling(&cycle.inlet),
            design_specific_thrust: cycle.specific_thrust,
            design_fuel_to_air_ratio: cycle.fuel_to_air_ratio,
        };

        // Re-evaluate through the off-design path to confirm the fixed flow reproduces the target.
        self.sizing = Some(sizing);
        let check = self.evaluate(design, 1.0)?;
        let residual = (check.thrust_n - self.design_thrust_n).abs() / self.design_thrust_n;
        if residual > SIZING_TOLERANCE {
            self.sizing = None;
            return Err(PropulsionError::SizingConvergence {
                residual,
                tolerance: SIZING_TOLERANCE,
            });
        }

        info!(
            propulsor = %self.tag,
            core_mass_flow = core_flow,
            corrected_mass_flow = sizing.corrected_core_mass_flow_kg_s,
            specific_thrust = cycle.specific_thrust,
            "sized turbofan"
        );
        Ok(sizing)
    }

    /// Thrust and fuel flow of all engines at `freestream` and `throttle`.
    pub fn evaluate(&self, freestream: &Freestream, throttle: f64) -> Result<PropulsionOutput, PropulsionError> {
        let sizing = self
            .sizing
            .ok_or_else(|| PropulsionError::NotSized(self.tag.clone()))?;
        if !throttle.is_finite() || !(0.0..=1.0).contains(&throttle) {
            return Err(PropulsionError::OffDesign {
                propulsor: self.tag.clone(),
                detail: format!("throttle {throttle} outside [0, 1]"),
            });
        }

        let cycle = self.cycle(freestream)?;
        let core_flow = sizing.corrected_core_mass_flow_kg_s * self.flow_scaling(&cycle.inlet);
        let engines = f64::from(self.number_of_engines);
        let thrust = cycle.specific_thrust * (1.0 + self.bypass_ratio) * core_flow * engines * throttle;
        let fuel = cycle.fuel_to_air_ratio * core_flow * engines * throttle;
        if !(thrust.is_finite() && fuel.is_finite()) {
            return Err(PropulsionError::OffDesign {
                propulsor: self.tag.clone(),
                detail: "non-finite thrust or fuel flow".into(),
            });
        }

        debug!(propulsor = %self.tag, mach = freestream.mach, throttle, thrust, fuel, "turbofan evaluated");
        Ok(PropulsionOutput::thrust_along_body(thrust, fuel, 0.0, None))
    }
}
