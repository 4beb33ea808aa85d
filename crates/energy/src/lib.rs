//! Energy storage models: batteries that hold a state of charge and fuel cells
//! that convert hydrogen on demand.

pub mod battery;
pub mod fuel_cell;

use skylark_core::NumericsError;
use thiserror::Error;

pub use battery::{Battery, BatteryLossModel};
pub use fuel_cell::{FuelCell, HYDROGEN_LHV, OperatingPoint, PolarizationCurve};

#[derive(Debug, Error)]
pub enum EnergyError {
    #[error("{storage}: invalid parameter ({detail})")]
    InvalidParameter { storage: String, detail: String },
    #[error("{0} has not been sized")]
    NotSized(String),
    #[error("{storage}: operating point search failed")]
    Numerics {
        storage: String,
        #[source]
        source: NumericsError,
    },
}

/// Non-fatal conditions recorded against the node where they occur.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EnergyWarning {
    #[error("{storage}: requested {requested_w:.1} W, deliverable {deliverable_w:.1} W")]
    PowerOutOfRange {
        storage: String,
        requested_w: f64,
        deliverable_w: f64,
    },
    #[error("{storage}: draw of {requested_w:.1} W exceeds rating {max_w:.1} W")]
    PowerAboveRating {
        storage: String,
        requested_w: f64,
        max_w: f64,
    },
    #[error("{storage}: stored energy exhausted, {shortfall_j:.1} J short")]
    EnergyExhausted { storage: String, shortfall_j: f64 },
}

/// Outcome of a single draw on a storage.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Discharge {
    pub delivered_power_w: f64,
    pub loss_w: f64,
    /// Energy removed from storage (or converted from propellant) over the step.
    pub energy_drawn_j: f64,
    /// Propellant consumed, for storages that burn a consumable.
    pub mass_rate_kg_s: f64,
    pub warnings: Vec<EnergyWarning>,
}

impl Discharge {
    pub fn idle() -> Self {
        Self::default()
    }
}

/// Capability shared by every energy storage the mission solver can draw on.
pub trait EnergyStorage {
    fn tag(&self) -> &str;

    fn mass_kg(&self) -> f64;

    fn max_power_w(&self) -> f64;

    /// Stored energy when full; `None` for storages without a charge state.
    fn total_energy_j(&self) -> Option<f64>;

    fn current_energy_j(&self) -> Option<f64>;

    /// Return to the full state.
    fn reset(&mut self);

    /// Serve `power_w` for `dt_s` seconds and update the stored state.
    fn discharge(&mut self, power_w: f64, dt_s: f64) -> Result<Discharge, EnergyError>;
}

pub(crate) fn check_draw(storage: &str, power_w: f64, dt_s: f64) -> Result<(), EnergyError> {
    if !(power_w.is_finite() && power_w >= 0.0) {
        return Err(EnergyError::InvalidParameter {
            storage: storage.to_string(),
            detail: format!("power draw {power_w} W"),
        });
    }
    if !(dt_s.is_finite() && dt_s >= 0.0) {
        return Err(EnergyError::InvalidParameter {
            storage: storage.to_string(),
            detail: format!("time step {dt_s} s"),
        });
    }
    Ok(())
}

/// Closed set of storages a vehicle can carry.
#[derive(Debug, Clone, PartialEq)]
pub enum EnergyStore {
    Battery(Battery),
    FuelCell(FuelCell),
}

impl EnergyStore {
    fn inner(&self) -> &dyn EnergyStorage {
        match self {
            EnergyStore::Battery(b) => b,
            EnergyStore::FuelCell(f) => f,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn EnergyStorage {
        match self {
            EnergyStore::Battery(b) => b,
            EnergyStore::FuelCell(f) => f,
        }
    }

    pub fn as_battery_mut(&mut self) -> Option<&mut Battery> {
        match self {
            EnergyStore::Battery(b) => Some(b),
            EnergyStore::FuelCell(_) => None,
        }
    }
}

impl EnergyStorage for EnergyStore {
    fn tag(&self) -> &str {
        self.inner().tag()
    }

    fn mass_kg(&self) -> f64 {
        self.inner().mass_kg()
    }

    fn max_power_w(&self) -> f64 {
        self.inner().max_power_w()
    }

    fn total_energy_j(&self) -> Option<f64> {
        self.inner().total_energy_j()
    }

    fn current_energy_j(&self) -> Option<f64> {
        self.inner().current_energy_j()
    }

    fn reset(&mut self) {
        self.inner_mut().reset()
    }

    fn discharge(&mut self, power_w: f64, dt_s: f64) -> Result<Discharge, EnergyError> {
        self.inner_mut().discharge(power_w, dt_s)
    }
}
