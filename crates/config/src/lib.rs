//! Configuration models and loaders for vehicles and missions.
//!
//! A catalog path may be a YAML file holding a list of records, a single TOML
//! file holding one record, or a directory of TOML files read in name order.

use std::collections::BTreeSet;
use std::fs::File;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Aircraft definition parsed from a vehicle catalog.
#[derive(Debug, Deserialize, Clone)]
pub struct VehicleConfig {
    pub name: String,
    pub mass: MassConfig,
    pub aerodynamics: AerodynamicsConfig,
    #[serde(default)]
    pub configurations: Vec<ConfigurationConfig>,
    #[serde(default)]
    pub propulsors: Vec<PropulsorConfig>,
    #[serde(default)]
    pub energy_storages: Vec<EnergyStorageConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MassConfig {
    pub full_kg: f64,
    pub empty_kg: f64,
    #[serde(default)]
    pub takeoff_kg: Option<f64>,
    #[serde(default)]
    pub min_flight_kg: Option<f64>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "type")]
pub enum AerodynamicsConfig {
    #[serde(rename = "finite_wing")]
    FiniteWing {
        reference_area_m2: f64,
        aspect_ratio: f64,
        oswald_efficiency: f64,
        zero_lift_drag: f64,
        #[serde(default)]
        lift_at_zero_alpha: f64,
        #[serde(default)]
        lift_slope_per_rad: Option<f64>,
        #[serde(default)]
        max_lift_coefficient: Option<f64>,
        #[serde(default)]
        alpha_limits_deg: Option<[f64; 2]>,
    },
}

/// Named aerodynamic variant (flaps, gear) applied on top of the clean model.
#[derive(Debug, Deserialize, Clone)]
pub struct ConfigurationConfig {
    pub name: String,
    #[serde(default)]
    pub delta_cl: f64,
    #[serde(default)]
    pub delta_cd: f64,
    #[serde(default)]
    pub max_lift_coefficient: Option<f64>,
    #[serde(default)]
    pub v2_vs_ratio: Option<f64>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "type")]
pub enum PropulsorConfig {
    #[serde(rename = "turbofan")]
    Turbofan(TurbofanConfig),
    #[serde(rename = "electric")]
    Electric(ElectricConfig),
}

impl PropulsorConfig {
    pub fn tag(&self) -> &str {
        match self {
            PropulsorConfig::Turbofan(t) => &t.tag,
            PropulsorConfig::Electric(e) => &e.tag,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct StageConfig {
    pub pressure_ratio: f64,
    pub polytropic_efficiency: f64,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct TurbineConfig {
    pub mechanical_efficiency: f64,
    pub polytropic_efficiency: f64,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct CombustorConfig {
    pub efficiency: f64,
    pub turbine_inlet_temperature_k: f64,
    pub pressure_ratio: f64,
    #[serde(default = "default_fuel_lhv")]
    pub fuel_lower_heating_value: f64,
}

/// Flight condition the turbofan is sized at.
///
/// Static pressure and temperature override the atmosphere at `altitude_m` when both are set.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct DesignPointConfig {
    pub mach: f64,
    #[serde(default)]
    pub altitude_m: f64,
    #[serde(default)]
    pub pressure_pa: Option<f64>,
    #[serde(default)]
    pub temperature_k: Option<f64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TurbofanConfig {
    pub tag: String,
    pub number_of_engines: u32,
    pub bypass_ratio: f64,
    pub design_thrust_n: f64,
    pub design_point: DesignPointConfig,
    #[serde(default = "default_inlet_pressure_ratio")]
    pub inlet_pressure_ratio: f64,
    #[serde(default = "default_fan")]
    pub fan: StageConfig,
    #[serde(default = "default_low_pressure_compressor")]
    pub low_pressure_compressor: StageConfig,
    #[serde(default = "default_high_pressure_compressor")]
    pub high_pressure_compressor: StageConfig,
    #[serde(default = "default_combustor")]
    pub combustor: CombustorConfig,
    #[serde(default = "default_turbine")]
    pub high_pressure_turbine: TurbineConfig,
    #[serde(default = "default_turbine")]
    pub low_pressure_turbine: TurbineConfig,
    #[serde(default = "default_nozzle")]
    pub core_nozzle: StageConfig,
    #[serde(default = "default_nozzle")]
    pub fan_nozzle: StageConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ElectricConfig {
    pub tag: String,
    #[serde(default = "default_engine_count")]
    pub number_of_engines: u32,
    pub motor_efficiency: f64,
    pub propeller_efficiency: f64,
    /// Taken from the feeding storage's rating when absent.
    #[serde(default)]
    pub max_power_w: Option<f64>,
    #[serde(default)]
    pub max_static_thrust_n: Option<f64>,
    pub storage: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "type")]
pub enum EnergyStorageConfig {
    #[serde(rename = "battery")]
    Battery(BatteryConfig),
    #[serde(rename = "fuel_cell")]
    FuelCell(FuelCellConfig),
}

impl EnergyStorageConfig {
    pub fn tag(&self) -> &str {
        match self {
            EnergyStorageConfig::Battery(b) => &b.tag,
            EnergyStorageConfig::FuelCell(f) => &f.tag,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct BatteryConfig {
    pub tag: String,
    pub specific_energy_wh_kg: f64,
    pub specific_power_kw_kg: f64,
    /// Fixed pack mass; when absent the pack is sized from `sizing`.
    #[serde(default)]
    pub mass_kg: Option<f64>,
    #[serde(default)]
    pub sizing: Option<BatterySizingConfig>,
    #[serde(default)]
    pub loss: BatteryLossConfig,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct BatterySizingConfig {
    pub energy_j: f64,
    pub power_w: f64,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum BatteryLossConfig {
    #[default]
    Lossless,
    InternalResistance {
        resistance_ohm: f64,
        nominal_voltage_v: f64,
    },
    SpecificPower {
        loss_fraction_at_max: f64,
    },
}

#[derive(Debug, Deserialize, Clone)]
pub struct FuelCellConfig {
    pub tag: String,
    pub number_of_cells: u32,
    pub mass_kg: f64,
    #[serde(default)]
    pub interface_area_cm2: Option<f64>,
    #[serde(default)]
    pub max_current_density: Option<f64>,
}

/// Mission definition parsed from a mission catalog.
#[derive(Debug, Deserialize, Clone)]
pub struct MissionConfig {
    pub name: String,
    /// Vehicle the mission is flown with, when the catalog pairs them.
    #[serde(default)]
    pub vehicle: Option<String>,
    #[serde(default)]
    pub settings: MissionSettingsConfig,
    #[serde(default)]
    pub atmosphere: AtmosphereConfig,
    #[serde(default)]
    pub airport: Option<AirportConfig>,
    pub segments: Vec<SegmentConfig>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExhaustionPolicyConfig {
    #[default]
    Continue,
    Abort,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SpacingConfig {
    #[default]
    Linear,
    Cosine,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct MissionSettingsConfig {
    #[serde(default)]
    pub exhaustion_policy: ExhaustionPolicyConfig,
    #[serde(default)]
    pub initial_mass_kg: Option<f64>,
    #[serde(default)]
    pub spacing: SpacingConfig,
    #[serde(default = "default_nodes")]
    pub nodes: usize,
}

impl Default for MissionSettingsConfig {
    fn default() -> Self {
        Self {
            exhaustion_policy: ExhaustionPolicyConfig::default(),
            initial_mass_kg: None,
            spacing: SpacingConfig::default(),
            nodes: default_nodes(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum AtmosphereConfig {
    #[serde(rename = "us_standard_1976")]
    UsStandard1976 {
        #[serde(default)]
        delta_isa_k: f64,
    },
    Exponential {
        surface_density_kg_m3: f64,
        scale_height_m: f64,
        temperature_k: f64,
    },
}

impl Default for AtmosphereConfig {
    fn default() -> Self {
        AtmosphereConfig::UsStandard1976 { delta_isa_k: 0.0 }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct AirportConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub altitude_m: f64,
    #[serde(default)]
    pub delta_isa_k: f64,
    #[serde(default = "default_takeoff_configuration")]
    pub configuration: String,
}

/// One mission segment. Node count and spacing fall back to the mission settings.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct SegmentConfig {
    pub tag: String,
    #[serde(default)]
    pub configuration: Option<String>,
    #[serde(default)]
    pub nodes: Option<usize>,
    #[serde(default)]
    pub spacing: Option<SpacingConfig>,
    #[serde(flatten)]
    pub kind: SegmentKindConfig,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SegmentKindConfig {
    ClimbConstantMach {
        #[serde(default)]
        altitude_start_m: Option<f64>,
        altitude_end_m: f64,
        mach: f64,
        climb_angle_deg: f64,
    },
    ClimbConstantSpeedConstantRate {
        #[serde(default)]
        altitude_start_m: Option<f64>,
        altitude_end_m: f64,
        airspeed_m_s: f64,
        climb_rate_m_s: f64,
    },
    CruiseConstantSpeedConstantAltitude {
        #[serde(default)]
        altitude_m: Option<f64>,
        airspeed_m_s: f64,
        distance_m: f64,
    },
    CruiseConstantMachConstantAltitude {
        #[serde(default)]
        altitude_m: Option<f64>,
        mach: f64,
        distance_m: f64,
    },
    DescentConstantSpeedConstantRate {
        #[serde(default)]
        altitude_start_m: Option<f64>,
        altitude_end_m: f64,
        airspeed_m_s: f64,
        descent_rate_m_s: f64,
    },
}

fn default_fuel_lhv() -> f64 {
    43.02e6
}

fn default_inlet_pressure_ratio() -> f64 {
    0.98
}

fn default_fan() -> StageConfig {
    StageConfig {
        pressure_ratio: 1.7,
        polytropic_efficiency: 0.93,
    }
}

fn default_low_pressure_compressor() -> StageConfig {
    StageConfig {
        pressure_ratio: 1.14,
        polytropic_efficiency: 0.91,
    }
}

fn default_high_pressure_compressor() -> StageConfig {
    StageConfig {
        pressure_ratio: 13.415,
        polytropic_efficiency: 0.91,
    }
}

fn default_combustor() -> CombustorConfig {
    CombustorConfig {
        efficiency: 0.99,
        turbine_inlet_temperature_k: 1450.0,
        pressure_ratio: 0.95,
        fuel_lower_heating_value: default_fuel_lhv(),
    }
}

fn default_turbine() -> TurbineConfig {
    TurbineConfig {
        mechanical_efficiency: 0.99,
        polytropic_efficiency: 0.93,
    }
}

fn default_nozzle() -> StageConfig {
    StageConfig {
        pressure_ratio: 0.99,
        polytropic_efficiency: 0.95,
    }
}

fn default_engine_count() -> u32 {
    1
}

fn default_nodes() -> usize {
    16
}

fn default_takeoff_configuration() -> String {
    "takeoff".to_string()
}

/// Errors that can occur while loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse YAML: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("{record}: {detail}")]
    Invalid { record: String, detail: String },
}

impl VehicleConfig {
    /// Check tag uniqueness and cross references between propulsors and storages.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |detail: String| ConfigError::Invalid {
            record: self.name.clone(),
            detail,
        };
        if self.mass.full_kg <= 0.0 || self.mass.empty_kg <= 0.0 || self.mass.empty_kg > self.mass.full_kg {
            return Err(invalid(format!(
                "inconsistent masses: full {} kg, empty {} kg",
                self.mass.full_kg, self.mass.empty_kg
            )));
        }

        let mut tags = BTreeSet::new();
        for tag in self
            .propulsors
            .iter()
            .map(PropulsorConfig::tag)
            .chain(self.energy_storages.iter().map(EnergyStorageConfig::tag))
        {
            if !tags.insert(tag) {
                return Err(invalid(format!("duplicate component tag '{tag}'")));
            }
        }

        for propulsor in &self.propulsors {
            if let PropulsorConfig::Electric(e) = propulsor {
                if !self.energy_storages.iter().any(|s| s.tag() == e.storage) {
                    return Err(invalid(format!(
                        "propulsor '{}' draws on unknown storage '{}'",
                        e.tag, e.storage
                    )));
                }
            }
        }

        let mut names = BTreeSet::new();
        for config in &self.configurations {
            if !names.insert(config.name.as_str()) {
                return Err(invalid(format!("duplicate configuration '{}'", config.name)));
            }
        }
        Ok(())
    }
}

impl MissionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.segments.is_empty() {
            return Err(ConfigError::Invalid {
                record: self.name.clone(),
                detail: "mission has no segments".into(),
            });
        }
        let mut tags = BTreeSet::new();
        for segment in &self.segments {
            if !tags.insert(segment.tag.as_str()) {
                return Err(ConfigError::Invalid {
                    record: self.name.clone(),
                    detail: format!("duplicate segment tag '{}'", segment.tag),
                });
            }
            if segment.nodes.is_some_and(|n| n < 2) {
                return Err(ConfigError::Invalid {
                    record: self.name.clone(),
                    detail: format!("segment '{}' needs at least two nodes", segment.tag),
                });
            }
        }
        if self.settings.nodes < 2 {
            return Err(ConfigError::Invalid {
                record: self.name.clone(),
                detail: "missions need at least two nodes per segment".into(),
            });
        }
        Ok(())
    }
}

/// Load and validate vehicle configurations.
pub fn load_vehicle_configs<P: AsRef<Path>>(path: P) -> Result<Vec<VehicleConfig>, ConfigError> {
    let vehicles: Vec<VehicleConfig> = load_records(path)?;
    for vehicle in &vehicles {
        vehicle.validate()?;
    }
    Ok(vehicles)
}

/// Load and validate mission configurations.
pub fn load_mission_configs<P: AsRef<Path>>(path: P) -> Result<Vec<MissionConfig>, ConfigError> {
    let missions: Vec<MissionConfig> = load_records(path)?;
    for mission in &missions {
        mission.validate()?;
    }
    Ok(missions)
}

fn load_records<T, P>(path: P) -> Result<Vec<T>, ConfigError>
where
    T: for<'de> Deserialize<'de>,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    if path.is_dir() {
        read_dir_records(path)
    } else if path.extension().map(|ext| ext == "toml").unwrap_or(false) {
        let contents = std::fs::read_to_string(path)?;
        let record: T = toml::from_str(&contents)?;
        Ok(vec![record])
    } else {
        let reader = File::open(path)?;
        Ok(serde_yaml::from_reader(reader)?)
    }
}

fn read_dir_records<T>(dir: &Path) -> Result<Vec<T>, ConfigError>
where
    T: for<'de> Deserialize<'de>,
{
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().map(|ext| ext == "toml").unwrap_or(false))
        .collect();
    entries.sort();
    entries
        .iter()
        .map(|path| {
            let contents = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&contents)?)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const VEHICLES: &str = r#"
- name: e-trainer
  mass:
    full_kg: 743.0
    empty_kg: 500.0
  aerodynamics:
    type: finite_wing
    reference_area_m2: 48.0
    aspect_ratio: 7.32
    oswald_efficiency: 0.8
    zero_lift_drag: 0.0341
    lift_at_zero_alpha: 0.3
  configurations:
    - name: takeoff
      delta_cl: 0.4
      delta_cd: 0.01
      max_lift_coefficient: 1.9
  propulsors:
    - type: electric
      tag: motor
      motor_efficiency: 0.9
      propeller_efficiency: 0.89
      storage: battery
  energy_storages:
    - type: battery
      tag: battery
      specific_energy_wh_kg: 1000.0
      specific_power_kw_kg: 0.64
      sizing:
        energy_j: 100000.0
        power_w: 1.4e6
"#;

    #[test]
    fn yaml_vehicle_catalog_parses_with_defaults() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(VEHICLES.as_bytes()).unwrap();
        let vehicles = load_vehicle_configs(file.path()).unwrap();
        assert_eq!(vehicles.len(), 1);
        let v = &vehicles[0];
        assert_eq!(v.configurations[0].delta_cl, 0.4);
        match &v.propulsors[0] {
            PropulsorConfig::Electric(e) => {
                assert_eq!(e.number_of_engines, 1);
                assert!(e.max_power_w.is_none());
            }
            other => panic!("unexpected propulsor {other:?}"),
        }
        match &v.energy_storages[0] {
            EnergyStorageConfig::Battery(b) => assert_eq!(b.loss, BatteryLossConfig::Lossless),
            other => panic!("unexpected storage {other:?}"),
        }
    }

    #[test]
    fn dangling_storage_reference_is_invalid() {
        let broken = VEHICLES.replace("storage: battery", "storage: tank");
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(broken.as_bytes()).unwrap();
        let err = load_vehicle_configs(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn toml_directory_loads_missions_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        let body = |name: &str| {
            format!(
                r#"
name = "{name}"

[settings]
exhaustion_policy = "abort"
spacing = "cosine"

[[segments]]
tag = "climb"
type = "climb_constant_mach"
altitude_start_m = 0.0
altitude_end_m = 10000.0
mach = 0.15
climb_angle_deg = 15.0

[[segments]]
tag = "cruise"
type = "cruise_constant_speed_constant_altitude"
airspeed_m_s = 62.0
distance_m = 1.0e6
"#
            )
        };
        std::fs::write(dir.path().join("b_second.toml"), body("second")).unwrap();
        std::fs::write(dir.path().join("a_first.toml"), body("first")).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let missions = load_mission_configs(dir.path()).unwrap();
        let names: Vec<_> = missions.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["first", "second"]);

        let m = &missions[0];
        assert_eq!(m.settings.exhaustion_policy, ExhaustionPolicyConfig::Abort);
        assert_eq!(m.settings.nodes, 16);
        assert_eq!(m.atmosphere, AtmosphereConfig::UsStandard1976 { delta_isa_k: 0.0 });
        assert!(matches!(
            m.segments[1].kind,
            SegmentKindConfig::CruiseConstantSpeedConstantAltitude { altitude_m: None, .. }
        ));
    }

    #[test]
    fn mission_without_segments_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.toml");
        std::fs::write(&path, "name = \"empty\"\nsegments = []\n").unwrap();
        assert!(matches!(
            load_mission_configs(&path),
            Err(ConfigError::Invalid { .. })
        ));
    }
}
