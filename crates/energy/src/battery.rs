//! Battery pack sized from specific energy and specific power.

use tracing::debug;

use crate::{Discharge, EnergyError, EnergyStorage, EnergyWarning, check_draw};

/// How discharge losses are derived from the requested power.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum BatteryLossModel {
    #[default]
    Lossless,
    /// I²R heating with current taken at a fixed pack voltage.
    InternalResistance {
        resistance_ohm: f64,
        nominal_voltage_v: f64,
    },
    /// Loss fraction that grows linearly with P / Pmax, reaching `loss_fraction_at_max` at the rating.
    SpecificPower { loss_fraction_at_max: f64 },
}

impl BatteryLossModel {
    pub fn loss(&self, power_w: f64, max_power_w: f64) -> f64 {
        match *self {
            BatteryLossModel::Lossless => 0.0,
            BatteryLossModel::InternalResistance {
                resistance_ohm,
                nominal_voltage_v,
            } => {
                let current = power_w / nominal_voltage_v;
                current * current * resistance_ohm
            }
            BatteryLossModel::SpecificPower {
                loss_fraction_at_max,
            } => {
                if max_power_w > 0.0 {
                    power_w * loss_fraction_at_max * power_w / max_power_w
                } else {
                    0.0
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Battery {
    pub tag: String,
    /// J/kg
    pub specific_energy: f64,
    /// W/kg
    pub specific_power: f64,
    pub loss_model: BatteryLossModel,
    mass_kg: f64,
    max_power_w: f64,
    total_energy_j: f64,
    current_energy_j: f64,
}

impl Battery {
    pub fn new(
        tag: impl Into<String>,
        specific_energy: f64,
        specific_power: f64,
        loss_model: BatteryLossModel,
    ) -> Result<Self, EnergyError> {
        let tag = tag.into();
        if !(specific_energy > 0.0 && specific_power > 0.0) {
            return Err(EnergyError::InvalidParameter {
                storage: tag,
                detail: format!(
                    "specific energy {specific_energy} J/kg and specific power {specific_power} W/kg must be positive"
                ),
            });
        }
        if let BatteryLossModel::InternalResistance {
            nominal_voltage_v, ..
        } = loss_model
        {
            if !(nominal_voltage_v > 0.0) {
                return Err(EnergyError::InvalidParameter {
                    storage: tag,
                    detail: format!("nominal voltage {nominal_voltage_v} V"),
                });
            }
        }
        Ok(Self {
            tag,
            specific_energy,
            specific_power,
            loss_model,
            mass_kg: 0.0,
            max_power_w: 0.0,
            total_energy_j: 0.0,
            current_energy_j: 0.0,
        })
    }

    /// Pack of a known mass, full.
    pub fn with_mass(mut self, mass_kg: f64) -> Result<Self, EnergyError> {
        self.set_mass(mass_kg)?;
        Ok(self)
    }

    fn set_mass(&mut self, mass_kg: f64) -> Result<(), EnergyError> {
        if !(mass_kg > 0.0 && mass_kg.is_finite()) {
            return Err(EnergyError::InvalidParameter {
                storage: self.tag.clone(),
                detail: format!("mass {mass_kg} kg"),
            });
        }
        self.mass_kg = mass_kg;
        self.max_power_w = mass_kg * self.specific_power;
        self.total_energy_j = mass_kg * self.specific_energy;
        self.current_energy_j = self.total_energy_j;
        Ok(())
    }

    /// Size the pack to cover both requirements and return its mass.
    ///
    /// The mass is the larger of the energy-limited and power-limited masses.
    pub fn size_from_energy_and_power(&mut self, energy_j: f64, power_w: f64) -> Result<f64, EnergyError> {
        if !(energy_j >= 0.0 && power_w >= 0.0) || (energy_j == 0.0 && power_w == 0.0) {
            return Err(EnergyError::InvalidParameter {
                storage: self.tag.clone(),
                detail: format!("sizing requirement E={energy_j} J, P={power_w} W"),
            });
        }
        let energy_mass = energy_j / self.specific_energy;
        let power_mass = power_w / self.specific_power;
        let mass = energy_mass.max(power_mass);
        self.set_mass(mass)?;
        debug!(
            storage = %self.tag,
            energy_mass,
            power_mass,
            mass,
            "battery sized"
        );
        Ok(mass)
    }
}

impl EnergyStorage for Battery {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn mass_kg(&self) -> f64 {
        self.mass_kg
    }

    fn max_power_w(&self) -> f64 {
        self.max_power_w
    }

    fn total_energy_j(&self) -> Option<f64> {
        Some(self.total_energy_j)
    }

    fn current_energy_j(&self) -> Option<f64> {
        Some(self.current_energy_j)
    }

    fn reset(&mut self) {
        self.current_energy_j = self.total_energy_j;
    }

    fn discharge(&mut self, power_w: f64, dt_s: f64) -> Result<Discharge, EnergyError> {
        check_draw(&self.tag, power_w, dt_s)?;
        if self.mass_kg <= 0.0 {
            return Err(EnergyError::NotSized(self.tag.clone()));
        }

        let mut warnings = Vec::new();
        if power_w > self.max_power_w {
            warnings.push(EnergyWarning::PowerAboveRating {
                storage: self.tag.clone(),
                requested_w: power_w,
                max_w: self.max_power_w,
            });
        }

        let loss_w = self.loss_model.loss(power_w, self.max_power_w);
        let required = (power_w + loss_w) * dt_s;
        let drawn = required.min(self.current_energy_j);
        if required > self.current_energy_j {
            warnings.push(EnergyWarning::EnergyExhausted {
                storage: self.tag.clone(),
                shortfall_j: required - self.current_energy_j,
            });
        }
        self.current_energy_j = (self.current_energy_j - drawn).max(0.0);

        Ok(Discharge {
            delivered_power_w: power_w,
            loss_w,
            energy_drawn_j: drawn,
            mass_rate_kg_s: 0.0,
            warnings,
        })
    }
}
