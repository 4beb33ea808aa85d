use tracing::debug;

use crate::gas::Freestream;
use crate::{PropulsionError, PropulsionOutput};

/// Airspeed below which propeller thrust falls back to the static rating (m/s).
pub const STATIC_AIRSPEED_M_S: f64 = 1.0;

/// Motor-driven propeller drawing from a named energy storage.
#[derive(Debug, Clone, PartialEq)]
pub struct ElectricPropulsor {
    pub tag: String,
    pub number_of_engines: u32,
    pub motor_efficiency: f64,
    pub propeller_efficiency: f64,
    /// Electrical input power of all motors at full throttle (W).
    pub max_power_w: f64,
    /// Thrust ceiling of all propellers at rest (N).
    pub max_static_thrust_n: Option<f64>,
    /// Tag of the energy storage feeding the motors.
    pub storage: String,
}

impl ElectricPropulsor {
    pub fn is_sized(&self) -> bool {
        self.max_power_w > 0.0
    }

    pub fn size_to_power(&mut self, max_power_w: f64) -> Result<(), PropulsionError> {
        if !(max_power_w > 0.0 && max_power_w.is_finite()) {
            return Err(PropulsionError::InvalidParameter {
                component: self.tag.clone(),
                detail: format!("max power {max_power_w} W"),
            });
        }
        self.max_power_w = max_power_w;
        Ok(())
    }

    fn validate(&self) -> Result<(), PropulsionError> {
        for (name, value) in [
            ("motor efficiency", self.motor_efficiency),
            ("propeller efficiency", self.propeller_efficiency),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(PropulsionError::PhysicalModel {
                    component: self.tag.clone(),
                    detail: format!("{name} {value} outside (0, 1]"),
                });
            }
        }
        Ok(())
    }

    pub fn evaluate(&self, freestream: &Freestream, throttle: f64) -> Result<PropulsionOutput, PropulsionError> {
        if !self.is_sized() {
            return Err(PropulsionError::NotSized(self.tag.clone()));
        }
        self.validate()?;
        if !throttle.is_finite() || !(0.0..=1.0).contains(&throttle) {
            return Err(PropulsionError::OffDesign {
                propulsor: self.tag.clone(),
                detail: format!("throttle {throttle} outside [0, 1]"),
            });
        }

        let electric_power = throttle * self.max_power_w;
        let shaft_power = electric_power * self.motor_efficiency;
        let velocity = freestream.velocity();
        let thrust = if velocity < STATIC_AIRSPEED_M_S {
            match self.max_static_thrust_n {
                Some(cap) => throttle * cap,
                None => {
                    return Err(PropulsionError::OffDesign {
                        propulsor: self.tag.clone(),
                        detail: "no static thrust rating for near-zero airspeed".into(),
                    });
                }
            }
        } else {
            let propeller = self.propeller_efficiency * shaft_power / velocity;
            match self.max_static_thrust_n {
                Some(cap) => propeller.min(throttle * cap),
                None => propeller,
            }
        };

        debug!(propulsor = %self.tag, velocity, throttle, thrust, electric_power, "electric propulsor evaluated");
        Ok(PropulsionOutput::thrust_along_body(
            thrust,
            0.0,
            electric_power,
            Some(self.storage.clone()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gas::WorkingFluid;
    use approx::assert_relative_eq;

    fn propulsor() -> ElectricPropulsor {
        ElectricPropulsor {
            tag: "motor".into(),
            number_of_engines: 1,
            motor_efficiency: 0.95,
            propeller_efficiency: 0.85,
            max_power_w: 150_000.0,
            max_static_thrust_n: None,
            storage: "battery".into(),
        }
    }

    #[test]
    fn thrust_follows_power_over_airspeed() {
        let fs = Freestream::new(0.2, 101_325.0, 288.15, WorkingFluid::air()).unwrap();
        let out = propulsor().evaluate(&fs, 0.5).unwrap();
        let expected = 0.85 * 0.95 * 75_000.0 / fs.velocity();
        assert_relative_eq!(out.thrust_n, expected, epsilon = 1e-9);
        assert_eq!(out.electric_power_w, 75_000.0);
        assert_eq!(out.fuel_mass_rate_kg_s, 0.0);
        assert_eq!(out.storage.as_deref(), Some("battery"));
    }

    #[test]
    fn static_operation_needs_a_rating() {
        let fs = Freestream::new(0.0, 101_325.0, 288.15, WorkingFluid::air()).unwrap();
        assert!(matches!(
            propulsor().evaluate(&fs, 1.0),
            Err(PropulsionError::OffDesign { .. })
        ));

        let rated = ElectricPropulsor {
            max_static_thrust_n: Some(4_000.0),
            ..propulsor()
        };
        assert_relative_eq!(rated.evaluate(&fs, 0.25).unwrap().thrust_n, 1_000.0);
    }

    #[test]
    fn unsized_motor_is_rejected() {
        let fs = Freestream::new(0.2, 101_325.0, 288.15, WorkingFluid::air()).unwrap();
        let idle = ElectricPropulsor {
            max_power_w: 0.0,
            ..propulsor()
        };
        assert!(matches!(idle.evaluate(&fs, 1.0), Err(PropulsionError::NotSized(_))));
    }
}
