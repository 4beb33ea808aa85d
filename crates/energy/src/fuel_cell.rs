//! Hydrogen fuel-cell stack following the Larminie–Dicks polarisation curve.

use skylark_core::{SearchSettings, minimize_bounded};
use tracing::debug;

use crate::{Discharge, EnergyError, EnergyStorage, EnergyWarning, check_draw};

/// Lower heating value of hydrogen (J/kg).
pub const HYDROGEN_LHV: f64 = 141.86e6;

/// Relative mismatch above which a matched operating point is reported as out of range.
pub const POWER_MATCH_TOLERANCE: f64 = 1e-4;

/// Cell voltage as a function of current density i (mA/cm²):
/// V = E_oc − r·i − A₁·ln(i) − m·exp(n·i).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolarizationCurve {
    pub open_circuit_voltage: f64,
    /// kΩ·cm²
    pub ohmic_resistance: f64,
    pub activation_constant: f64,
    pub mass_transport_m: f64,
    /// cm²/mA
    pub mass_transport_n: f64,
    /// Voltage corresponding to the hydrogen heating value.
    pub ideal_voltage: f64,
    pub interface_area_cm2: f64,
    pub min_current_density: f64,
    pub max_current_density: f64,
}

impl Default for PolarizationCurve {
    fn default() -> Self {
        Self {
            open_circuit_voltage: 0.931,
            ohmic_resistance: 2.45e-4,
            activation_constant: 0.03,
            mass_transport_m: 1.05e-4,
            mass_transport_n: 8e-3,
            ideal_voltage: 1.48,
            interface_area_cm2: 875.0,
            min_current_density: 0.1,
            max_current_density: 1200.0,
        }
    }
}

impl PolarizationCurve {
    pub fn voltage(&self, current_density: f64) -> f64 {
        let i = current_density;
        self.open_circuit_voltage
            - self.ohmic_resistance * i
            - self.activation_constant * i.ln()
            - self.mass_transport_m * (self.mass_transport_n * i).exp()
    }

    /// Electrical power of one cell (W).
    pub fn cell_power(&self, current_density: f64) -> f64 {
        self.voltage(current_density) * current_density / 1000.0 * self.interface_area_cm2
    }
}

/// A solved point on the stack's power curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OperatingPoint {
    pub current_density: f64,
    pub cell_voltage: f64,
    pub power_w: f64,
    pub efficiency: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuelCell {
    pub tag: String,
    pub mass_kg: f64,
    pub hydrogen_lhv: f64,
    pub search: SearchSettings,
    curve: PolarizationCurve,
    number_of_cells: u32,
    peak: OperatingPoint,
}

impl FuelCell {
    /// Build a stack and locate its maximum power point.
    pub fn new(
        tag: impl Into<String>,
        curve: PolarizationCurve,
        number_of_cells: u32,
        mass_kg: f64,
    ) -> Result<Self, EnergyError> {
        let tag = tag.into();
        if number_of_cells == 0 || !(curve.min_current_density > 0.0)
            || curve.max_current_density <= curve.min_current_density
        {
            return Err(EnergyError::InvalidParameter {
                storage: tag,
                detail: format!(
                    "{number_of_cells} cells over current density [{}, {}] mA/cm²",
                    curve.min_current_density, curve.max_current_density
                ),
            });
        }
        let mut cell = Self {
            tag,
            mass_kg,
            hydrogen_lhv: HYDROGEN_LHV,
            search: SearchSettings::default(),
            curve,
            number_of_cells,
            peak: OperatingPoint {
                current_density: 0.0,
                cell_voltage: 0.0,
                power_w: 0.0,
                efficiency: 0.0,
            },
        };
        cell.peak = cell.locate_peak()?;
        debug!(storage = %cell.tag, peak_w = cell.peak.power_w, "fuel cell peak located");
        Ok(cell)
    }

    pub fn curve(&self) -> &PolarizationCurve {
        &self.curve
    }

    pub fn number_of_cells(&self) -> u32 {
        self.number_of_cells
    }

    /// Maximum power point of the stack.
    pub fn peak(&self) -> OperatingPoint {
        self.peak
    }

    fn stack_power(&self, current_density: f64) -> f64 {
        f64::from(self.number_of_cells) * self.curve.cell_power(current_density)
    }

    fn point(&self, current_density: f64) -> OperatingPoint {
        let cell_voltage = self.curve.voltage(current_density);
        OperatingPoint {
            current_density,
            cell_voltage,
            power_w: self.stack_power(current_density),
            efficiency: cell_voltage / self.curve.ideal_voltage,
        }
    }

    fn locate_peak(&self) -> Result<OperatingPoint, EnergyError> {
        let best = minimize_bounded(
            |i| -self.stack_power(i),
            self.curve.min_current_density,
            self.curve.max_current_density,
            self.search,
        )
        .map_err(|source| EnergyError::Numerics {
            storage: self.tag.clone(),
            source,
        })?;
        Ok(self.point(best.x))
    }

    /// Current density that delivers `power_w`.
    ///
    /// Requests past the peak return the peak with a warning; requests the rising
    /// branch cannot match return the nearest bound with a warning.
    pub fn operating_point(&self, power_w: f64) -> Result<(OperatingPoint, Option<EnergyWarning>), EnergyError> {
        if power_w >= self.peak.power_w {
            let warning = (power_w > self.peak.power_w).then(|| EnergyWarning::PowerOutOfRange {
                storage: self.tag.clone(),
                requested_w: power_w,
                deliverable_w: self.peak.power_w,
            });
            return Ok((self.peak, warning));
        }

        let best = minimize_bounded(
            |i| (self.stack_power(i) - power_w).powi(2),
            self.curve.min_current_density,
            self.peak.current_density,
            self.search,
        )
        .map_err(|source| EnergyError::Numerics {
            storage: self.tag.clone(),
            source,
        })?;
        let point = self.point(best.x);
        let mismatch = (point.power_w - power_w).abs() / power_w.abs().max(f64::MIN_POSITIVE);
        let warning = (mismatch > POWER_MATCH_TOLERANCE).then(|| EnergyWarning::PowerOutOfRange {
            storage: self.tag.clone(),
            requested_w: power_w,
            deliverable_w: point.power_w,
        });
        Ok((point, warning))
    }
}

impl EnergyStorage for FuelCell {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn mass_kg(&self) -> f64 {
        self.mass_kg
    }

    fn max_power_w(&self) -> f64 {
        self.peak.power_w
    }

    /// Hydrogen is accounted as mass flow, not as stored electrical energy.
    fn total_energy_j(&self) -> Option<f64> {
        None
    }

    fn current_energy_j(&self) -> Option<f64> {
        None
    }

    fn reset(&mut self) {}

    fn discharge(&mut self, power_w: f64, dt_s: f64) -> Result<Discharge, EnergyError> {
        check_draw(&self.tag, power_w, dt_s)?;
        if power_w == 0.0 {
            return Ok(Discharge::idle());
        }

        let (point, warning) = self.operating_point(power_w)?;
        let delivered = point.power_w;
        let chemical = delivered / point.efficiency;
        let mass_rate = chemical / self.hydrogen_lhv;
        Ok(Discharge {
            delivered_power_w: delivered,
            loss_w: chemical - delivered,
            energy_drawn_j: chemical * dt_s,
            mass_rate_kg_s: mass_rate,
            warnings: warning.into_iter().collect(),
        })
    }
}
