//! Atmosphere and planet models queried by altitude.
//!
//! Models are read-only once constructed and are shared between mission segments.

use skylark_core::constants::{EARTH_RADIUS_M, G0, GAMMA_AIR, P_SEA_LEVEL, R_AIR, T_SEA_LEVEL};
use thiserror::Error;

/// Radius used for the geometric → geopotential altitude conversion (m).
const GEOPOTENTIAL_RADIUS_M: f64 = 6_356_766.0;
/// Sutherland's law reference viscosity coefficient (kg/(m·s·K^0.5)).
const SUTHERLAND_BETA: f64 = 1.458e-6;
/// Sutherland's constant for air (K).
const SUTHERLAND_S: f64 = 110.4;

/// Thermodynamic state of the free atmosphere at one altitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AtmosphericState {
    pub altitude_m: f64,
    pub pressure_pa: f64,
    pub temperature_k: f64,
    pub density_kg_m3: f64,
    pub speed_of_sound_m_s: f64,
    pub dynamic_viscosity_pa_s: f64,
    pub gravity_m_s2: f64,
}

#[derive(Debug, Error, PartialEq)]
pub enum AtmosphereError {
    #[error("altitude {altitude_m} m outside model range [{min_m}, {max_m}] m")]
    OutOfRange {
        altitude_m: f64,
        min_m: f64,
        max_m: f64,
    },
    #[error("atmosphere scale height must be positive")]
    InvalidScaleHeight,
    #[error("surface density must be positive")]
    InvalidSurfaceDensity,
    #[error("temperature offset leaves a non-physical temperature ({temperature_k} K)")]
    NonPhysicalTemperature { temperature_k: f64 },
}

/// Altitude-indexed source of atmospheric properties.
pub trait AtmosphereModel: std::fmt::Debug + Send + Sync {
    fn properties(&self, altitude_m: f64) -> Result<AtmosphericState, AtmosphereError>;

    /// Gas constant and ratio of specific heats used by the model.
    fn gas(&self) -> (f64, f64) {
        (R_AIR, GAMMA_AIR)
    }
}

/// Gravity source for a spherical planet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Planet {
    pub sea_level_gravity_m_s2: f64,
    pub mean_radius_m: f64,
}

impl Planet {
    pub fn earth() -> Self {
        Self {
            sea_level_gravity_m_s2: G0,
            mean_radius_m: EARTH_RADIUS_M,
        }
    }

    /// Inverse-square gravity at a geometric altitude.
    pub fn gravity(&self, altitude_m: f64) -> f64 {
        let ratio = self.mean_radius_m / (self.mean_radius_m + altitude_m);
        self.sea_level_gravity_m_s2 * ratio * ratio
    }
}

impl Default for Planet {
    fn default() -> Self {
        Self::earth()
    }
}

/// Sutherland's law for the dynamic viscosity of air.
pub fn sutherland_viscosity(temperature_k: f64) -> f64 {
    SUTHERLAND_BETA * temperature_k.powf(1.5) / (temperature_k + SUTHERLAND_S)
}

/// Speed of sound of an ideal gas.
pub fn speed_of_sound(gamma: f64, gas_constant: f64, temperature_k: f64) -> f64 {
    (gamma * gas_constant * temperature_k).sqrt()
}

#[derive(Debug, Clone, Copy)]
struct Layer {
    base_geopotential_m: f64,
    lapse_k_per_m: f64,
    base_temperature_k: f64,
    base_pressure_pa: f64,
}

const US1976_LAYERS: [Layer; 7] = [
    Layer { base_geopotential_m: 0.0, lapse_k_per_m: -6.5e-3, base_temperature_k: 288.15, base_pressure_pa: 101_325.0 },
    Layer { base_geopotential_m: 11_000.0, lapse_k_per_m: 0.0, base_temperature_k: 216.65, base_pressure_pa: 22_632.06 },
    Layer { base_geopotential_m: 20_000.0, lapse_k_per_m: 1.0e-3, base_temperature_k: 216.65, base_pressure_pa: 5_474.889 },
    Layer { base_geopotential_m: 32_000.0, lapse_k_per_m: 2.8e-3, base_temperature_k: 228.65, base_pressure_pa: 868.0187 },
    Layer { base_geopotential_m: 47_000.0, lapse_k_per_m: 0.0, base_temperature_k: 270.65, base_pressure_pa: 110.9063 },
    Layer { base_geopotential_m: 51_000.0, lapse_k_per_m: -2.8e-3, base_temperature_k: 270.65, base_pressure_pa: 66.938_87 },
    Layer { base_geopotential_m: 71_000.0, lapse_k_per_m: -2.0e-3, base_temperature_k: 214.65, base_pressure_pa: 3.956_420 },
];

/// U.S. Standard Atmosphere 1976, -1 to 86 km geometric altitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UsStandard1976 {
    pub planet: Planet,
    /// Temperature offset from the standard day (K). Pressure is unchanged.
    pub delta_isa_k: f64,
}

impl UsStandard1976 {
    pub const MIN_ALTITUDE_M: f64 = -1_000.0;
    pub const MAX_ALTITUDE_M: f64 = 86_000.0;

    pub fn new() -> Self {
        Self {
            planet: Planet::earth(),
            delta_isa_k: 0.0,
        }
    }

    pub fn with_delta_isa(mut self, delta_isa_k: f64) -> Self {
        self.delta_isa_k = delta_isa_k;
        self
    }

    fn layer_for(geopotential_m: f64) -> &'static Layer {
        US1976_LAYERS
            .iter()
            .rev()
            .find(|layer| geopotential_m >= layer.base_geopotential_m)
            .unwrap_or(&US1976_LAYERS[0])
    }
}

impl Default for UsStandard1976 {
    fn default() -> Self {
        Self::new()
    }
}

impl AtmosphereModel for UsStandard1976 {
    fn properties(&self, altitude_m: f64) -> Result<AtmosphericState, AtmosphereError> {
        if !(Self::MIN_ALTITUDE_M..=Self::MAX_ALTITUDE_M).contains(&altitude_m) {
            return Err(AtmosphereError::OutOfRange {
                altitude_m,
                min_m: Self::MIN_ALTITUDE_M,
                max_m: Self::MAX_ALTITUDE_M,
            });
        }

        let h = GEOPOTENTIAL_RADIUS_M * altitude_m / (GEOPOTENTIAL_RADIUS_M + altitude_m);
        let layer = Self::layer_for(h);
        let dh = h - layer.base_geopotential_m;
        let standard_temperature = layer.base_temperature_k + layer.lapse_k_per_m * dh;
        let pressure = if layer.lapse_k_per_m == 0.0 {
            layer.base_pressure_pa * (-G0 * dh / (R_AIR * layer.base_temperature_k)).exp()
        } else {
            layer.base_pressure_pa
                * (standard_temperature / layer.base_temperature_k)
                    .powf(-G0 / (R_AIR * layer.lapse_k_per_m))
        };

        let temperature = standard_temperature + self.delta_isa_k;
        if temperature <= 0.0 {
            return Err(AtmosphereError::NonPhysicalTemperature {
                temperature_k: temperature,
            });
        }

        Ok(AtmosphericState {
            altitude_m,
            pressure_pa: pressure,
            temperature_k: temperature,
            density_kg_m3: pressure / (R_AIR * temperature),
            speed_of_sound_m_s: speed_of_sound(GAMMA_AIR, R_AIR, temperature),
            dynamic_viscosity_pa_s: sutherland_viscosity(temperature),
            gravity_m_s2: self.planet.gravity(altitude_m),
        })
    }
}

/// Isothermal atmosphere with exponentially decaying density.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialAtmosphere {
    pub planet: Planet,
    pub surface_density_kg_m3: f64,
    pub scale_height_m: f64,
    pub temperature_k: f64,
}

impl ExponentialAtmosphere {
    pub fn new(
        planet: Planet,
        surface_density_kg_m3: f64,
        scale_height_m: f64,
        temperature_k: f64,
    ) -> Result<Self, AtmosphereError> {
        if scale_height_m <= 0.0 {
            return Err(AtmosphereError::InvalidScaleHeight);
        }
        if surface_density_kg_m3 <= 0.0 {
            return Err(AtmosphereError::InvalidSurfaceDensity);
        }
        if temperature_k <= 0.0 {
            return Err(AtmosphereError::NonPhysicalTemperature { temperature_k });
        }
        Ok(Self {
            planet,
            surface_density_kg_m3,
            scale_height_m,
            temperature_k,
        })
    }

    /// Sea-level standard day squeezed into a single scale height.
    pub fn earth() -> Self {
        Self {
            planet: Planet::earth(),
            surface_density_kg_m3: P_SEA_LEVEL / (R_AIR * T_SEA_LEVEL),
            scale_height_m: 8_500.0,
            temperature_k: T_SEA_LEVEL,
        }
    }
}

impl AtmosphereModel for ExponentialAtmosphere {
    fn properties(&self, altitude_m: f64) -> Result<AtmosphericState, AtmosphereError> {
        if altitude_m < 0.0 {
            return Err(AtmosphereError::OutOfRange {
                altitude_m,
                min_m: 0.0,
                max_m: f64::INFINITY,
            });
        }
        let density = self.surface_density_kg_m3 * (-altitude_m / self.scale_height_m).exp();
        Ok(AtmosphericState {
            altitude_m,
            pressure_pa: density * R_AIR * self.temperature_k,
            temperature_k: self.temperature_k,
            density_kg_m3: density,
            speed_of_sound_m_s: speed_of_sound(GAMMA_AIR, R_AIR, self.temperature_k),
            dynamic_viscosity_pa_s: sutherland_viscosity(self.temperature_k),
            gravity_m_s2: self.planet.gravity(altitude_m),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn sea_level_matches_standard_day() {
        let state = UsStandard1976::new().properties(0.0).unwrap();
        assert_relative_eq!(state.temperature_k, 288.15, epsilon = 1e-9);
        assert_relative_eq!(state.pressure_pa, 101_325.0, epsilon = 1e-6);
        assert_relative_eq!(state.density_kg_m3, 1.225, epsilon = 1e-3);
        assert_relative_eq!(state.speed_of_sound_m_s, 340.29, epsilon = 1e-2);
        assert_relative_eq!(state.gravity_m_s2, G0, epsilon = 1e-12);
    }

    #[test]
    fn tropopause_is_isothermal() {
        let atmo = UsStandard1976::new();
        let low = atmo.properties(11_100.0).unwrap();
        let high = atmo.properties(19_000.0).unwrap();
        assert_relative_eq!(low.temperature_k, 216.65, epsilon = 1e-9);
        assert_relative_eq!(high.temperature_k, 216.65, epsilon = 1e-9);
        assert!(high.pressure_pa < low.pressure_pa);
    }

    #[test]
    fn ten_kilometres_matches_tables() {
        let state = UsStandard1976::new().properties(10_000.0).unwrap();
        assert_relative_eq!(state.temperature_k, 223.25, epsilon = 0.05);
        assert_relative_eq!(state.pressure_pa, 26_499.9, max_relative = 1e-4);
        assert_relative_eq!(state.density_kg_m3, 0.4135, max_relative = 1e-3);
    }

    #[test]
    fn delta_isa_keeps_pressure_and_thins_air() {
        let standard = UsStandard1976::new().properties(500.0).unwrap();
        let hot = UsStandard1976::new().with_delta_isa(15.0).properties(500.0).unwrap();
        assert_relative_eq!(hot.pressure_pa, standard.pressure_pa, epsilon = 1e-9);
        assert!(hot.density_kg_m3 < standard.density_kg_m3);
    }

    #[test]
    fn rejects_altitude_above_table() {
        let err = UsStandard1976::new().properties(90_000.0).unwrap_err();
        assert!(matches!(err, AtmosphereError::OutOfRange { .. }));
    }

    #[test]
    fn exponential_density_decays_by_e_per_scale_height() {
        let atmo = ExponentialAtmosphere::earth();
        let surface = atmo.properties(0.0).unwrap();
        let one_h = atmo.properties(atmo.scale_height_m).unwrap();
        assert_relative_eq!(
            one_h.density_kg_m3 * std::f64::consts::E,
            surface.density_kg_m3,
            max_relative = 1e-12
        );
    }

    #[test]
    fn exponential_rejects_bad_scale_height() {
        let err = ExponentialAtmosphere::new(Planet::earth(), 1.2, 0.0, 250.0).unwrap_err();
        assert_eq!(err, AtmosphereError::InvalidScaleHeight);
    }
}
