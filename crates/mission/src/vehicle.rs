//! Vehicle aggregate and its construction from catalog records.

use std::collections::BTreeMap;
use std::sync::Arc;

use skylark_aero::{AeroError, Aerodynamics, FiniteWing};
use skylark_atmosphere::{AtmosphereError, AtmosphereModel, UsStandard1976};
use skylark_config::{
    AerodynamicsConfig, BatteryConfig, BatteryLossConfig, ConfigurationConfig, ElectricConfig,
    EnergyStorageConfig, FuelCellConfig, PropulsorConfig, TurbofanConfig, VehicleConfig,
};
use skylark_core::units::{kw_per_kg_to_w_per_kg, wh_per_kg_to_j_per_kg};
use skylark_energy::{
    Battery, BatteryLossModel, EnergyError, EnergyStorage, EnergyStore, FuelCell, PolarizationCurve,
};
use skylark_propulsion::{
    Combustor, CompressionNozzle, Compressor, ElectricPropulsor, ExpansionNozzle, Freestream,
    PropulsionError, Propulsor, Ram, Turbine, Turbofan, TurbofanComponents, WorkingFluid,
};
use thiserror::Error;
use tracing::info;

/// Errors surfaced when assembling, sizing, or selecting vehicles.
#[derive(Debug, Error)]
pub enum VehicleError {
    #[error("vehicle '{0}' not found in catalog")]
    NotFound(String),
    #[error("vehicle catalog is empty")]
    EmptyCatalog,
    #[error("no energy storage tagged '{0}'")]
    UnknownStorage(String),
    #[error("'{0}' is not a battery")]
    NotABattery(String),
    #[error("no propulsor tagged '{0}'")]
    UnknownPropulsor(String),
    #[error("energy storage '{0}' has neither a mass nor a sizing requirement")]
    UnsizedStorage(String),
    #[error("aerodynamic model: {0}")]
    Aerodynamics(#[from] AeroError),
    #[error("design point atmosphere: {0}")]
    Atmosphere(#[from] AtmosphereError),
    #[error(transparent)]
    Propulsion(#[from] PropulsionError),
    #[error(transparent)]
    Energy(#[from] EnergyError),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MassProperties {
    pub full_kg: f64,
    pub empty_kg: f64,
    pub takeoff_kg: f64,
    pub min_flight_kg: f64,
}

impl MassProperties {
    pub fn new(full_kg: f64, empty_kg: f64) -> Self {
        Self {
            full_kg,
            empty_kg,
            takeoff_kg: full_kg,
            min_flight_kg: empty_kg,
        }
    }

    /// Add component mass to every mass that includes the airframe.
    pub fn add_component(&mut self, mass_kg: f64) {
        self.full_kg += mass_kg;
        self.empty_kg += mass_kg;
        self.takeoff_kg += mass_kg;
        self.min_flight_kg += mass_kg;
    }
}

/// Named aerodynamic variant of the vehicle.
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    pub name: String,
    pub delta_cl: f64,
    pub delta_cd: f64,
    pub max_lift_coefficient: Option<f64>,
    /// Take-off safety speed over stall speed.
    pub v2_vs_ratio: f64,
}

impl Configuration {
    pub fn clean(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            delta_cl: 0.0,
            delta_cd: 0.0,
            max_lift_coefficient: None,
            v2_vs_ratio: 1.2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Vehicle {
    pub name: String,
    pub mass: MassProperties,
    pub propulsors: Vec<Propulsor>,
    pub energy_storages: Vec<EnergyStore>,
    pub aerodynamics: Arc<dyn Aerodynamics>,
    pub configurations: BTreeMap<String, Configuration>,
}

impl Vehicle {
    pub fn new(name: impl Into<String>, mass: MassProperties, aerodynamics: Arc<dyn Aerodynamics>) -> Self {
        Self {
            name: name.into(),
            mass,
            propulsors: Vec::new(),
            energy_storages: Vec::new(),
            aerodynamics,
            configurations: BTreeMap::new(),
        }
    }

    pub fn add_configuration(&mut self, configuration: Configuration) {
        self.configurations
            .insert(configuration.name.clone(), configuration);
    }

    pub fn configuration(&self, name: &str) -> Option<&Configuration> {
        self.configurations.get(name)
    }

    pub fn add_propulsor(&mut self, propulsor: Propulsor) {
        self.propulsors.push(propulsor);
    }

    /// Add a storage and carry its mass.
    pub fn add_energy_storage(&mut self, storage: EnergyStore) {
        self.mass.add_component(storage.mass_kg());
        self.energy_storages.push(storage);
    }

    pub fn energy_storage(&self, tag: &str) -> Option<&EnergyStore> {
        self.energy_storages.iter().find(|s| s.tag() == tag)
    }

    pub fn propulsor_mut(&mut self, tag: &str) -> Option<&mut Propulsor> {
        self.propulsors.iter_mut().find(|p| p.tag() == tag)
    }

    /// Size the battery `tag` for an energy and power requirement.
    ///
    /// The change in battery mass is added to the full, empty, and take-off masses.
    pub fn size_battery(&mut self, tag: &str, energy_j: f64, power_w: f64) -> Result<f64, VehicleError> {
        let store = self
            .energy_storages
            .iter_mut()
            .find(|s| s.tag() == tag)
            .ok_or_else(|| VehicleError::UnknownStorage(tag.to_string()))?;
        let previous = store.mass_kg();
        let battery = store
            .as_battery_mut()
            .ok_or_else(|| VehicleError::NotABattery(tag.to_string()))?;
        let mass = battery.size_from_energy_and_power(energy_j, power_w)?;
        self.mass.add_component(mass - previous);
        info!(vehicle = %self.name, battery = tag, mass_kg = mass, "battery sized");
        Ok(mass)
    }

    /// Size the turbofan `tag` at a design freestream.
    pub fn size_turbofan(&mut self, tag: &str, design: &Freestream) -> Result<(), VehicleError> {
        match self.propulsor_mut(tag) {
            Some(Propulsor::Turbofan(engine)) => {
                engine.size(design)?;
                Ok(())
            }
            _ => Err(VehicleError::UnknownPropulsor(tag.to_string())),
        }
    }

    pub fn engine_count(&self) -> u32 {
        self.propulsors.iter().map(Propulsor::number_of_engines).sum()
    }
}

/// Convert a `VehicleConfig` into a sized runtime `Vehicle`.
///
/// Storages are built (and batteries sized) before propulsors so that electric
/// propulsors without an explicit rating can inherit their storage's maximum power.
pub fn from_config(config: &VehicleConfig) -> Result<Vehicle, VehicleError> {
    let aerodynamics: Arc<dyn Aerodynamics> = match &config.aerodynamics {
        AerodynamicsConfig::FiniteWing {
            reference_area_m2,
            aspect_ratio,
            oswald_efficiency,
            zero_lift_drag,
            lift_at_zero_alpha,
            lift_slope_per_rad,
            max_lift_coefficient,
            alpha_limits_deg,
        } => {
            let mut wing = FiniteWing::new(
                *reference_area_m2,
                *aspect_ratio,
                *oswald_efficiency,
                *zero_lift_drag,
                *lift_at_zero_alpha,
            )?;
            wing.lift_slope_per_rad = *lift_slope_per_rad;
            wing.max_lift_coefficient = *max_lift_coefficient;
            if let Some([lower, upper]) = alpha_limits_deg {
                wing = wing.with_alpha_limits_deg(*lower, *upper);
            }
            Arc::new(wing)
        }
    };

    let mut mass = MassProperties::new(config.mass.full_kg, config.mass.empty_kg);
    if let Some(takeoff) = config.mass.takeoff_kg {
        mass.takeoff_kg = takeoff;
    }
    if let Some(min_flight) = config.mass.min_flight_kg {
        mass.min_flight_kg = min_flight;
    }
    let mut vehicle = Vehicle::new(&config.name, mass, aerodynamics);
    for c in &config.configurations {
        vehicle.add_configuration(configuration_from_config(c));
    }

    for storage in &config.energy_storages {
        match storage {
            EnergyStorageConfig::Battery(b) => {
                let battery = battery_from_config(b)?;
                match (b.mass_kg, b.sizing) {
                    (Some(m), _) => vehicle.add_energy_storage(EnergyStore::Battery(battery.with_mass(m)?)),
                    (None, Some(req)) => {
                        vehicle.add_energy_storage(EnergyStore::Battery(battery));
                        vehicle.size_battery(&b.tag, req.energy_j, req.power_w)?;
                    }
                    (None, None) => return Err(VehicleError::UnsizedStorage(b.tag.clone())),
                }
            }
            EnergyStorageConfig::FuelCell(f) => {
                vehicle.add_energy_storage(EnergyStore::FuelCell(fuel_cell_from_config(f)?));
            }
        }
    }

    for propulsor in &config.propulsors {
        match propulsor {
            PropulsorConfig::Turbofan(t) => {
                let engine = turbofan_from_config(t);
                let design = design_freestream(t)?;
                vehicle.add_propulsor(Propulsor::Turbofan(engine));
                vehicle.size_turbofan(&t.tag, &design)?;
            }
            PropulsorConfig::Electric(e) => {
                let motor = electric_from_config(e, &vehicle)?;
                vehicle.add_propulsor(Propulsor::Electric(motor));
            }
        }
    }

    Ok(vehicle)
}

/// Select a vehicle from the catalog by optional name, defaulting to the first entry.
pub fn select(configs: &[VehicleConfig], requested: Option<&str>) -> Result<Vehicle, VehicleError> {
    if configs.is_empty() {
        return Err(VehicleError::EmptyCatalog);
    }
    let chosen = match requested {
        Some(name) => configs
            .iter()
            .find(|cfg| cfg.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| VehicleError::NotFound(name.to_string()))?,
        None => &configs[0],
    };
    from_config(chosen)
}

fn configuration_from_config(c: &ConfigurationConfig) -> Configuration {
    Configuration {
        name: c.name.clone(),
        delta_cl: c.delta_cl,
        delta_cd: c.delta_cd,
        max_lift_coefficient: c.max_lift_coefficient,
        v2_vs_ratio: c.v2_vs_ratio.unwrap_or(1.2),
    }
}

fn battery_from_config(b: &BatteryConfig) -> Result<Battery, VehicleError> {
    let loss = match b.loss {
        BatteryLossConfig::Lossless => BatteryLossModel::Lossless,
        BatteryLossConfig::InternalResistance {
            resistance_ohm,
            nominal_voltage_v,
        } => BatteryLossModel::InternalResistance {
            resistance_ohm,
            nominal_voltage_v,
        },
        BatteryLossConfig::SpecificPower {
            loss_fraction_at_max,
        } => BatteryLossModel::SpecificPower {
            loss_fraction_at_max,
        },
    };
    Ok(Battery::new(
        &b.tag,
        wh_per_kg_to_j_per_kg(b.specific_energy_wh_kg),
        kw_per_kg_to_w_per_kg(b.specific_power_kw_kg),
        loss,
    )?)
}

fn fuel_cell_from_config(f: &FuelCellConfig) -> Result<FuelCell, VehicleError> {
    let mut curve = PolarizationCurve::default();
    if let Some(area) = f.interface_area_cm2 {
        curve.interface_area_cm2 = area;
    }
    if let Some(max) = f.max_current_density {
        curve.max_current_density = max;
    }
    Ok(FuelCell::new(&f.tag, curve, f.number_of_cells, f.mass_kg)?)
}

fn turbofan_from_config(t: &TurbofanConfig) -> Turbofan {
    let stage = |tag: &str, s: skylark_config::StageConfig| Compressor {
        tag: tag.to_string(),
        pressure_ratio: s.pressure_ratio,
        polytropic_efficiency: s.polytropic_efficiency,
    };
    let nozzle = |tag: &str, s: skylark_config::StageConfig| ExpansionNozzle {
        tag: tag.to_string(),
        pressure_ratio: s.pressure_ratio,
        polytropic_efficiency: s.polytropic_efficiency,
    };
    let turbine = |tag: &str, c: skylark_config::TurbineConfig| Turbine {
        tag: tag.to_string(),
        mechanical_efficiency: c.mechanical_efficiency,
        polytropic_efficiency: c.polytropic_efficiency,
    };
    let components = TurbofanComponents {
        ram: Ram::new("ram"),
        inlet_nozzle: CompressionNozzle {
            tag: "inlet_nozzle".into(),
            pressure_ratio: t.inlet_pressure_ratio,
            polytropic_efficiency: 1.0,
        },
        fan: stage("fan", t.fan),
        low_pressure_compressor: stage("low_pressure_compressor", t.low_pressure_compressor),
        high_pressure_compressor: stage("high_pressure_compressor", t.high_pressure_compressor),
        combustor: Combustor {
            tag: "combustor".into(),
            efficiency: t.combustor.efficiency,
            turbine_inlet_temperature_k: t.combustor.turbine_inlet_temperature_k,
            pressure_ratio: t.combustor.pressure_ratio,
            fuel_lower_heating_value: t.combustor.fuel_lower_heating_value,
        },
        high_pressure_turbine: turbine("high_pressure_turbine", t.high_pressure_turbine),
        low_pressure_turbine: turbine("low_pressure_turbine", t.low_pressure_turbine),
        core_nozzle: nozzle("core_nozzle", t.core_nozzle),
        fan_nozzle: nozzle("fan_nozzle", t.fan_nozzle),
    };
    Turbofan::new(&t.tag, t.number_of_engines, t.bypass_ratio, t.design_thrust_n, components)
}

/// Design freestream of a turbofan record: explicit static state, or the standard day at altitude.
pub fn design_freestream(t: &TurbofanConfig) -> Result<Freestream, VehicleError> {
    let point = &t.design_point;
    let fluid = WorkingFluid::air();
    let freestream = match (point.pressure_pa, point.temperature_k) {
        (Some(p), Some(temp)) => Freestream::new(point.mach, p, temp, fluid)?,
        _ => {
            let state = UsStandard1976::new().properties(point.altitude_m)?;
            Freestream::new(point.mach, state.pressure_pa, state.temperature_k, fluid)?
        }
    };
    Ok(freestream)
}

fn electric_from_config(e: &ElectricConfig, vehicle: &Vehicle) -> Result<ElectricPropulsor, VehicleError> {
    let storage = vehicle
        .energy_storage(&e.storage)
        .ok_or_else(|| VehicleError::UnknownStorage(e.storage.clone()))?;
    let mut motor = ElectricPropulsor {
        tag: e.tag.clone(),
        number_of_engines: e.number_of_engines,
        motor_efficiency: e.motor_efficiency,
        propeller_efficiency: e.propeller_efficiency,
        max_power_w: 0.0,
        max_static_thrust_n: e.max_static_thrust_n,
        storage: e.storage.clone(),
    };
    motor.size_to_power(e.max_power_w.unwrap_or_else(|| storage.max_power_w()))?;
    Ok(motor)
}
