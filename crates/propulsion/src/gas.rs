//! Working fluid, freestream, and stagnation station types shared by the converters.

use skylark_atmosphere::AtmosphericState;
use skylark_core::constants::{GAMMA_AIR, R_AIR};

use crate::PropulsionError;

/// Calorically perfect gas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkingFluid {
    pub gamma: f64,
    pub gas_constant: f64,
}

impl WorkingFluid {
    pub fn air() -> Self {
        Self {
            gamma: GAMMA_AIR,
            gas_constant: R_AIR,
        }
    }

    /// Specific heat at constant pressure (J/(kg·K)).
    pub fn cp(&self) -> f64 {
        self.gamma * self.gas_constant / (self.gamma - 1.0)
    }

    /// γ/(γ−1), the exponent linking stagnation pressure and temperature ratios.
    pub fn pressure_exponent(&self) -> f64 {
        self.gamma / (self.gamma - 1.0)
    }

    /// 1 + (γ−1)/2 · M²
    pub fn stagnation_ratio(&self, mach: f64) -> f64 {
        1.0 + 0.5 * (self.gamma - 1.0) * mach * mach
    }
}

impl Default for WorkingFluid {
    fn default() -> Self {
        Self::air()
    }
}

/// Static freestream condition seen by a propulsor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Freestream {
    pub mach: f64,
    pub pressure_pa: f64,
    pub temperature_k: f64,
    pub fluid: WorkingFluid,
}

impl Freestream {
    pub fn new(
        mach: f64,
        pressure_pa: f64,
        temperature_k: f64,
        fluid: WorkingFluid,
    ) -> Result<Self, PropulsionError> {
        if !mach.is_finite() || mach < 0.0 {
            return Err(PropulsionError::OffDesign {
                propulsor: "freestream".into(),
                detail: format!("mach number {mach} is not a valid flight condition"),
            });
        }
        if !(pressure_pa > 0.0 && temperature_k > 0.0) {
            return Err(PropulsionError::PhysicalModel {
                component: "freestream".into(),
                detail: format!("static state p={pressure_pa} Pa, T={temperature_k} K"),
            });
        }
        Ok(Self {
            mach,
            pressure_pa,
            temperature_k,
            fluid,
        })
    }

    /// Freestream at a true airspeed inside an atmospheric state.
    pub fn from_atmosphere(
        state: &AtmosphericState,
        velocity_m_s: f64,
        fluid: WorkingFluid,
    ) -> Result<Self, PropulsionError> {
        let a = (fluid.gamma * fluid.gas_constant * state.temperature_k).sqrt();
        Self::new(velocity_m_s / a, state.pressure_pa, state.temperature_k, fluid)
    }

    pub fn speed_of_sound(&self) -> f64 {
        (self.fluid.gamma * self.fluid.gas_constant * self.temperature_k).sqrt()
    }

    pub fn velocity(&self) -> f64 {
        self.mach * self.speed_of_sound()
    }

    pub fn density(&self) -> f64 {
        self.pressure_pa / (self.fluid.gas_constant * self.temperature_k)
    }

    pub fn dynamic_pressure(&self) -> f64 {
        0.5 * self.density() * self.velocity().powi(2)
    }

    pub fn stagnation_temperature(&self) -> f64 {
        self.temperature_k * self.fluid.stagnation_ratio(self.mach)
    }

    pub fn stagnation_pressure(&self) -> f64 {
        self.pressure_pa
            * self
                .fluid
                .stagnation_ratio(self.mach)
                .powf(self.fluid.pressure_exponent())
    }
}

/// Stagnation state passed from one converter to the next.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Station {
    pub total_temperature_k: f64,
    pub total_pressure_pa: f64,
    /// Fuel added upstream per unit core air mass flow.
    pub fuel_to_air_ratio: f64,
}

impl Station {
    pub fn new(total_temperature_k: f64, total_pressure_pa: f64) -> Self {
        Self {
            total_temperature_k,
            total_pressure_pa,
            fuel_to_air_ratio: 0.0,
        }
    }

    /// Stagnation enthalpy per unit mass (J/kg).
    pub fn enthalpy(&self, fluid: &WorkingFluid) -> f64 {
        fluid.cp() * self.total_temperature_k
    }

    /// Reject stations that cannot exist physically.
    pub fn checked(self, component: &str) -> Result<Self, PropulsionError> {
        let valid_t = self.total_temperature_k.is_finite() && self.total_temperature_k > 0.0;
        let valid_p = self.total_pressure_pa.is_finite() && self.total_pressure_pa > 0.0;
        if valid_t && valid_p && self.fuel_to_air_ratio.is_finite() {
            Ok(self)
        } else {
            Err(PropulsionError::PhysicalModel {
                component: component.to_string(),
                detail: format!(
                    "outlet Tt={} K, Pt={} Pa, f={}",
                    self.total_temperature_k, self.total_pressure_pa, self.fuel_to_air_ratio
                ),
            })
        }
    }
}
