//! Energy converters: each maps an inlet stagnation state to an outlet state.

use crate::PropulsionError;
use crate::gas::{Freestream, Station, WorkingFluid};

/// A component that transforms the flow between two stations.
pub trait Converter {
    fn tag(&self) -> &str;

    fn convert(&self, inlet: &Station, freestream: &Freestream) -> Result<Station, PropulsionError>;
}

fn require(component: &str, ok: bool, detail: impl FnOnce() -> String) -> Result<(), PropulsionError> {
    if ok {
        Ok(())
    } else {
        Err(PropulsionError::PhysicalModel {
            component: component.to_string(),
            detail: detail(),
        })
    }
}

fn require_efficiency(component: &str, name: &str, value: f64) -> Result<(), PropulsionError> {
    require(component, value > 0.0 && value <= 1.0, || {
        format!("{name} {value} outside (0, 1]")
    })
}

/// Brings the freestream to rest, producing the first station of the network.
#[derive(Debug, Clone, PartialEq)]
pub struct Ram {
    pub tag: String,
}

impl Ram {
    pub fn new(tag: impl Into<String>) -> Self {
        Self { tag: tag.into() }
    }

    pub fn capture(&self, freestream: &Freestream) -> Result<Station, PropulsionError> {
        Station::new(
            freestream.stagnation_temperature(),
            freestream.stagnation_pressure(),
        )
        .checked(&self.tag)
    }
}

/// Inlet diffuser: adiabatic, with a stagnation pressure loss.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressionNozzle {
    pub tag: String,
    pub pressure_ratio: f64,
    pub polytropic_efficiency: f64,
}

impl Converter for CompressionNozzle {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn convert(&self, inlet: &Station, _freestream: &Freestream) -> Result<Station, PropulsionError> {
        require(&self.tag, self.pressure_ratio > 0.0, || {
            format!("pressure ratio {} must be positive", self.pressure_ratio)
        })?;
        Station {
            total_pressure_pa: inlet.total_pressure_pa * self.pressure_ratio,
            ..*inlet
        }
        .checked(&self.tag)
    }
}

/// Fan or compressor stage defined by pressure ratio and polytropic efficiency.
#[derive(Debug, Clone, PartialEq)]
pub struct Compressor {
    pub tag: String,
    pub pressure_ratio: f64,
    pub polytropic_efficiency: f64,
}

impl Compressor {
    /// Specific shaft work absorbed between `inlet` and `outlet` (J/kg).
    pub fn work(&self, inlet: &Station, outlet: &Station, fluid: &WorkingFluid) -> f64 {
        outlet.enthalpy(fluid) - inlet.enthalpy(fluid)
    }
}

impl Converter for Compressor {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn convert(&self, inlet: &Station, freestream: &Freestream) -> Result<Station, PropulsionError> {
        require(&self.tag, self.pressure_ratio >= 1.0, || {
            format!("pressure ratio {} below unity", self.pressure_ratio)
        })?;
        require_efficiency(&self.tag, "polytropic efficiency", self.polytropic_efficiency)?;
        let gamma = freestream.fluid.gamma;
        let exponent = (gamma - 1.0) / (gamma * self.polytropic_efficiency);
        Station {
            total_temperature_k: inlet.total_temperature_k * self.pressure_ratio.powf(exponent),
            total_pressure_pa: inlet.total_pressure_pa * self.pressure_ratio,
            ..*inlet
        }
        .checked(&self.tag)
    }
}

/// Burner raising the flow to a fixed turbine inlet temperature.
#[derive(Debug, Clone, PartialEq)]
pub struct Combustor {
    pub tag: String,
    pub efficiency: f64,
    pub turbine_inlet_temperature_k: f64,
    pub pressure_ratio: f64,
    /// Lower heating value of the fuel (J/kg).
    pub fuel_lower_heating_value: f64,
}

impl Converter for Combustor {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn convert(&self, inlet: &Station, freestream: &Freestream) -> Result<Station, PropulsionError> {
        require_efficiency(&self.tag, "combustion efficiency", self.efficiency)?;
        require(&self.tag, self.fuel_lower_heating_value > 0.0, || {
            "fuel heating value must be positive".into()
        })?;
        let cp = freestream.fluid.cp();
        let h_out = cp * self.turbine_inlet_temperature_k;
        let h_in = inlet.enthalpy(&freestream.fluid);
        let denominator = self.efficiency * self.fuel_lower_heating_value - h_out;
        require(&self.tag, denominator > 0.0, || {
            format!(
                "fuel heating value cannot reach {} K",
                self.turbine_inlet_temperature_k
            )
        })?;
        let fuel_to_air = (h_out - h_in) / denominator;
        require(&self.tag, fuel_to_air >= 0.0, || {
            format!(
                "inlet Tt {} K already exceeds turbine inlet temperature {} K",
                inlet.total_temperature_k, self.turbine_inlet_temperature_k
            )
        })?;
        Station {
            total_temperature_k: self.turbine_inlet_temperature_k,
            total_pressure_pa: inlet.total_pressure_pa * self.pressure_ratio,
            fuel_to_air_ratio: fuel_to_air,
        }
        .checked(&self.tag)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Turbine {
    pub tag: String,
    pub mechanical_efficiency: f64,
    pub polytropic_efficiency: f64,
}

impl Turbine {
    /// Bind the turbine to the shaft work it must deliver per unit core air flow.
    pub fn loaded(&self, shaft_work: f64) -> LoadedTurbine<'_> {
        LoadedTurbine {
            turbine: self,
            shaft_work,
        }
    }
}

/// A turbine together with the compressor work it drives.
#[derive(Debug, Clone, Copy)]
pub struct LoadedTurbine<'a> {
    pub turbine: &'a Turbine,
    pub shaft_work: f64,
}

impl Converter for LoadedTurbine<'_> {
    fn tag(&self) -> &str {
        &self.turbine.tag
    }

    fn convert(&self, inlet: &Station, freestream: &Freestream) -> Result<Station, PropulsionError> {
        let turbine = self.turbine;
        require_efficiency(&turbine.tag, "mechanical efficiency", turbine.mechanical_efficiency)?;
        require_efficiency(&turbine.tag, "polytropic efficiency", turbine.polytropic_efficiency)?;
        let fluid = &freestream.fluid;
        let delta_h =
            -self.shaft_work / ((1.0 + inlet.fuel_to_air_ratio) * turbine.mechanical_efficiency);
        let total_temperature = inlet.total_temperature_k + delta_h / fluid.cp();
        require(&turbine.tag, total_temperature > 0.0, || {
            format!(
                "shaft work {:.1} J/kg exceeds available enthalpy",
                self.shaft_work
            )
        })?;
        let exponent = fluid.gamma / ((fluid.gamma - 1.0) * turbine.polytropic_efficiency);
        let temperature_ratio = total_temperature / inlet.total_temperature_k;
        Station {
            total_temperature_k: total_temperature,
            total_pressure_pa: inlet.total_pressure_pa * temperature_ratio.powf(exponent),
            ..*inlet
        }
        .checked(&turbine.tag)
    }
}

/// Static exit state of an expansion nozzle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NozzleExit {
    pub stagnation: Station,
    pub mach: f64,
    pub static_pressure_pa: f64,
    pub static_temperature_k: f64,
    pub velocity_m_s: f64,
}

/// Convergent nozzle expanding to ambient or to the sonic limit.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpansionNozzle {
    pub tag: String,
    pub pressure_ratio: f64,
    pub polytropic_efficiency: f64,
}

impl ExpansionNozzle {
    pub fn exhaust(&self, inlet: &Station, freestream: &Freestream) -> Result<NozzleExit, PropulsionError> {
        let stagnation = self.convert(inlet, freestream)?;
        let fluid = &freestream.fluid;
        let p0 = freestream.pressure_pa;
        let expansion = (stagnation.total_pressure_pa / p0).powf(1.0 / fluid.pressure_exponent());
        let ideal_mach = ((expansion - 1.0) * 2.0 / (fluid.gamma - 1.0)).max(0.0).sqrt();

        let (mach, static_pressure) = if ideal_mach < 1.0 {
            (ideal_mach, p0)
        } else {
            let choked = stagnation.total_pressure_pa
                / fluid.stagnation_ratio(1.0).powf(fluid.pressure_exponent());
            (1.0, choked)
        };
        let static_temperature = stagnation.total_temperature_k / fluid.stagnation_ratio(mach);
        let velocity =
            (2.0 * fluid.cp() * (stagnation.total_temperature_k - static_temperature)).max(0.0).sqrt();

        Ok(NozzleExit {
            stagnation,
            mach,
            static_pressure_pa: static_pressure,
            static_temperature_k: static_temperature,
            velocity_m_s: velocity,
        })
    }
}

impl Converter for ExpansionNozzle {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn convert(&self, inlet: &Station, freestream: &Freestream) -> Result<Station, PropulsionError> {
        require(&self.tag, self.pressure_ratio > 0.0, || {
            format!("pressure ratio {} must be positive", self.pressure_ratio)
        })?;
        require_efficiency(&self.tag, "polytropic efficiency", self.polytropic_efficiency)?;
        let fluid = &freestream.fluid;
        // The nozzle cannot expand below ambient.
        let total_pressure = (inlet.total_pressure_pa * self.pressure_ratio).max(freestream.pressure_pa);
        let exponent = (fluid.gamma - 1.0) / fluid.gamma * self.polytropic_efficiency;
        Station {
            total_temperature_k: inlet.total_temperature_k * self.pressure_ratio.powf(exponent),
            total_pressure_pa: total_pressure,
            ..*inlet
        }
        .checked(&self.tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn cruise() -> Freestream {
        Freestream::new(0.8, 20_000.0, 215.0, WorkingFluid::air()).unwrap()
    }

    #[test]
    fn compressor_raises_temperature_with_pressure() {
        let fs = cruise();
        let hpc = Compressor {
            tag: "hpc".into(),
            pressure_ratio: 13.415,
            polytropic_efficiency: 0.91,
        };
        let inlet = Station::new(250.0, 30_000.0);
        let out = hpc.convert(&inlet, &fs).unwrap();
        assert_relative_eq!(out.total_pressure_pa, 30_000.0 * 13.415, epsilon = 1e-6);
        let expected = 250.0 * 13.415_f64.powf(0.4 / (1.4 * 0.91));
        assert_relative_eq!(out.total_temperature_k, expected, epsilon = 1e-9);
        assert!(hpc.work(&inlet, &out, &fs.fluid) > 0.0);
    }

    #[test]
    fn combustor_sets_turbine_inlet_temperature_and_fuel_ratio() {
        let fs = cruise();
        let burner = Combustor {
            tag: "combustor".into(),
            efficiency: 0.99,
            turbine_inlet_temperature_k: 1450.0,
            pressure_ratio: 0.95,
            fuel_lower_heating_value: 43.0e6,
        };
        let out = burner.convert(&Station::new(700.0, 5.0e5), &fs).unwrap();
        assert_eq!(out.total_temperature_k, 1450.0);
        assert!(out.fuel_to_air_ratio > 0.015 && out.fuel_to_air_ratio < 0.03);
    }

    #[test]
    fn combustor_rejects_hot_inlet() {
        let fs = cruise();
        let burner = Combustor {
            tag: "combustor".into(),
            efficiency: 0.99,
            turbine_inlet_temperature_k: 600.0,
            pressure_ratio: 0.95,
            fuel_lower_heating_value: 43.0e6,
        };
        let err = burner.convert(&Station::new(700.0, 5.0e5), &fs).unwrap_err();
        assert!(matches!(err, PropulsionError::PhysicalModel { .. }));
    }

    #[test]
    fn overloaded_turbine_is_a_physical_model_error() {
        let fs = cruise();
        let turbine = Turbine {
            tag: "hpt".into(),
            mechanical_efficiency: 0.99,
            polytropic_efficiency: 0.93,
        };
        let err = turbine
            .loaded(5.0e6)
            .convert(&Station::new(1450.0, 1.0e6), &fs)
            .unwrap_err();
        assert!(matches!(err, PropulsionError::PhysicalModel { ref component, .. } if component == "hpt"));
    }

    #[test]
    fn nozzle_chokes_at_high_pressure_ratio() {
        let fs = cruise();
        let nozzle = ExpansionNozzle {
            tag: "core_nozzle".into(),
            pressure_ratio: 0.99,
            polytropic_efficiency: 0.95,
        };
        let exit = nozzle.exhaust(&Station::new(800.0, 80_000.0), &fs).unwrap();
        assert_eq!(exit.mach, 1.0);
        assert!(exit.static_pressure_pa > fs.pressure_pa);

        let subsonic = nozzle.exhaust(&Station::new(300.0, 22_000.0), &fs).unwrap();
        assert!(subsonic.mach < 1.0);
        assert_eq!(subsonic.static_pressure_pa, fs.pressure_pa);
    }
}
