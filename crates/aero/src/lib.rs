//! Aerodynamic coefficient models.
//!
//! The mission solver treats aerodynamics as a black box: it supplies a flight
//! condition and receives lift and drag coefficients referenced to
//! [`Aerodynamics::reference_area`].

use thiserror::Error;

/// Flight condition handed to an aerodynamic model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AeroQuery {
    pub angle_of_attack_rad: f64,
    pub mach: f64,
    pub dynamic_pressure_pa: f64,
    pub reynolds_per_m: f64,
}

/// Coefficients returned by a model, referenced to the model's reference area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AeroCoefficients {
    pub lift: f64,
    pub drag: f64,
}

#[derive(Debug, Error, PartialEq)]
pub enum AeroError {
    #[error("non-finite flight condition: {0}")]
    NonFiniteQuery(&'static str),
    #[error("invalid geometry: {0}")]
    InvalidGeometry(&'static str),
}

/// Black-box aerodynamic model.
pub trait Aerodynamics: std::fmt::Debug + Send + Sync {
    fn evaluate(&self, query: &AeroQuery) -> Result<AeroCoefficients, AeroError>;

    /// Reference area the coefficients are normalised by (m²).
    fn reference_area(&self) -> f64;

    /// Angle-of-attack interval the model is valid over (rad).
    fn angle_of_attack_limits(&self) -> (f64, f64) {
        ((-15.0_f64).to_radians(), 30.0_f64.to_radians())
    }
}

/// Linear lift curve with a parabolic drag polar.
#[derive(Debug, Clone, PartialEq)]
pub struct FiniteWing {
    pub reference_area_m2: f64,
    pub aspect_ratio: f64,
    pub oswald_efficiency: f64,
    pub zero_lift_drag: f64,
    pub lift_at_zero_alpha: f64,
    /// Lift-curve slope per radian. Derived from the aspect ratio when absent.
    pub lift_slope_per_rad: Option<f64>,
    /// Lift is held at this value past stall.
    pub max_lift_coefficient: Option<f64>,
    pub alpha_limits_rad: (f64, f64),
}

impl FiniteWing {
    pub fn new(
        reference_area_m2: f64,
        aspect_ratio: f64,
        oswald_efficiency: f64,
        zero_lift_drag: f64,
        lift_at_zero_alpha: f64,
    ) -> Result<Self, AeroError> {
        if reference_area_m2 <= 0.0 {
            return Err(AeroError::InvalidGeometry("reference area must be positive"));
        }
        if aspect_ratio <= 0.0 {
            return Err(AeroError::InvalidGeometry("aspect ratio must be positive"));
        }
        if !(0.0..=1.0).contains(&oswald_efficiency) || oswald_efficiency == 0.0 {
            return Err(AeroError::InvalidGeometry(
                "oswald efficiency must lie in (0, 1]",
            ));
        }
        Ok(Self {
            reference_area_m2,
            aspect_ratio,
            oswald_efficiency,
            zero_lift_drag,
            lift_at_zero_alpha,
            lift_slope_per_rad: None,
            max_lift_coefficient: None,
            alpha_limits_rad: ((-15.0_f64).to_radians(), 30.0_f64.to_radians()),
        })
    }

    pub fn with_max_lift(mut self, cl_max: f64) -> Self {
        self.max_lift_coefficient = Some(cl_max);
        self
    }

    pub fn with_alpha_limits_deg(mut self, lower: f64, upper: f64) -> Self {
        self.alpha_limits_rad = (lower.to_radians(), upper.to_radians());
        self
    }

    /// Finite-wing lift slope, 2πAR / (2 + √(AR² + 4)).
    pub fn lift_slope(&self) -> f64 {
        self.lift_slope_per_rad.unwrap_or_else(|| {
            let ar = self.aspect_ratio;
            2.0 * std::f64::consts::PI * ar / (2.0 + (ar * ar + 4.0).sqrt())
        })
    }

    /// Induced drag factor 1 / (π·AR·e).
    pub fn induced_drag_factor(&self) -> f64 {
        1.0 / (std::f64::consts::PI * self.aspect_ratio * self.oswald_efficiency)
    }
}

impl Aerodynamics for FiniteWing {
    fn evaluate(&self, query: &AeroQuery) -> Result<AeroCoefficients, AeroError> {
        if !query.angle_of_attack_rad.is_finite() {
            return Err(AeroError::NonFiniteQuery("angle of attack"));
        }
        if !query.mach.is_finite() {
            return Err(AeroError::NonFiniteQuery("mach"));
        }

        let mut lift = self.lift_at_zero_alpha + self.lift_slope() * query.angle_of_attack_rad;
        if let Some(cl_max) = self.max_lift_coefficient {
            lift = lift.min(cl_max);
        }
        let drag = self.zero_lift_drag + self.induced_drag_factor() * lift * lift;
        Ok(AeroCoefficients { lift, drag })
    }

    fn reference_area(&self) -> f64 {
        self.reference_area_m2
    }

    fn angle_of_attack_limits(&self) -> (f64, f64) {
        self.alpha_limits_rad
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn cessna_like() -> FiniteWing {
        FiniteWing::new(16.2, 7.32, 0.80, 0.0341, 0.30).unwrap()
    }

    fn query(alpha_deg: f64) -> AeroQuery {
        AeroQuery {
            angle_of_attack_rad: alpha_deg.to_radians(),
            mach: 0.15,
            dynamic_pressure_pa: 1_500.0,
            reynolds_per_m: 3.4e6,
        }
    }

    #[test]
    fn zero_alpha_returns_cl0_and_polar_drag() {
        let wing = cessna_like();
        let c = wing.evaluate(&query(0.0)).unwrap();
        assert_relative_eq!(c.lift, 0.30, epsilon = 1e-12);
        assert_relative_eq!(c.drag, 0.0341 + 0.09 / (std::f64::consts::PI * 7.32 * 0.8), epsilon = 1e-12);
    }

    #[test]
    fn lift_slope_is_below_thin_airfoil_value() {
        let slope = cessna_like().lift_slope();
        assert!(slope > 4.0 && slope < 2.0 * std::f64::consts::PI);
    }

    #[test]
    fn lift_saturates_at_cl_max() {
        let wing = cessna_like().with_max_lift(1.6);
        let c = wing.evaluate(&query(25.0)).unwrap();
        assert_relative_eq!(c.lift, 1.6, epsilon = 1e-12);
    }

    #[test]
    fn rejects_degenerate_geometry() {
        assert_eq!(
            FiniteWing::new(0.0, 7.0, 0.8, 0.03, 0.2).unwrap_err(),
            AeroError::InvalidGeometry("reference area must be positive")
        );
    }
}
