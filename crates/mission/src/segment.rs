//! Segment definitions and the kinematic profile each flight-path constraint implies.

use std::sync::Arc;

use skylark_atmosphere::AtmosphereModel;
use skylark_core::spacing::{self, NodeSpacing};

use crate::solver::SegmentError;

/// Flight-path constraint of a segment. Omitted start altitudes are carried from
/// the previous segment's terminal node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SegmentKind {
    ClimbConstantMach {
        altitude_start_m: Option<f64>,
        altitude_end_m: f64,
        mach: f64,
        climb_angle_rad: f64,
    },
    ClimbConstantSpeedConstantRate {
        altitude_start_m: Option<f64>,
        altitude_end_m: f64,
        airspeed_m_s: f64,
        climb_rate_m_s: f64,
    },
    CruiseConstantSpeedConstantAltitude {
        altitude_m: Option<f64>,
        airspeed_m_s: f64,
        distance_m: f64,
    },
    CruiseConstantMachConstantAltitude {
        altitude_m: Option<f64>,
        mach: f64,
        distance_m: f64,
    },
    DescentConstantSpeedConstantRate {
        altitude_start_m: Option<f64>,
        altitude_end_m: f64,
        airspeed_m_s: f64,
        descent_rate_m_s: f64,
    },
}

impl SegmentKind {
    pub fn name(&self) -> &'static str {
        match self {
            SegmentKind::ClimbConstantMach { .. } => "climb_constant_mach",
            SegmentKind::ClimbConstantSpeedConstantRate { .. } => "climb_constant_speed_constant_rate",
            SegmentKind::CruiseConstantSpeedConstantAltitude { .. } => {
                "cruise_constant_speed_constant_altitude"
            }
            SegmentKind::CruiseConstantMachConstantAltitude { .. } => {
                "cruise_constant_mach_constant_altitude"
            }
            SegmentKind::DescentConstantSpeedConstantRate { .. } => {
                "descent_constant_speed_constant_rate"
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Segment {
    pub tag: String,
    pub kind: SegmentKind,
    /// Vehicle configuration flown in this segment; the clean vehicle when absent.
    pub configuration: Option<String>,
    pub nodes: usize,
    pub spacing: NodeSpacing,
    pub atmosphere: Arc<dyn AtmosphereModel>,
}

impl Segment {
    pub fn new(tag: impl Into<String>, kind: SegmentKind, atmosphere: Arc<dyn AtmosphereModel>) -> Self {
        Self {
            tag: tag.into(),
            kind,
            configuration: None,
            nodes: 16,
            spacing: NodeSpacing::Linear,
            atmosphere,
        }
    }

    pub fn with_nodes(mut self, nodes: usize) -> Self {
        self.nodes = nodes;
        self
    }

    pub fn with_spacing(mut self, spacing: NodeSpacing) -> Self {
        self.spacing = spacing;
        self
    }

    pub fn with_configuration(mut self, name: impl Into<String>) -> Self {
        self.configuration = Some(name.into());
        self
    }

    fn invalid(&self, reason: impl Into<String>) -> SegmentError {
        SegmentError::InvalidDefinition {
            segment: self.tag.clone(),
            reason: reason.into(),
        }
    }

    fn speed_of_sound(&self, node: usize, altitude_m: f64) -> Result<f64, SegmentError> {
        self.atmosphere
            .properties(altitude_m)
            .map(|s| s.speed_of_sound_m_s)
            .map_err(|source| SegmentError::Atmosphere { node, source })
    }

    /// Kinematics at every node, starting from `start_altitude_m` when the kind leaves it open.
    pub fn profile(&self, start_altitude_m: f64) -> Result<Profile, SegmentError> {
        if self.nodes < 2 {
            return Err(self.invalid(format!("{} nodes; at least two are required", self.nodes)));
        }
        let n = self.nodes;

        match self.kind {
            SegmentKind::ClimbConstantMach {
                altitude_start_m,
                altitude_end_m,
                mach,
                climb_angle_rad,
            } => {
                let h0 = altitude_start_m.unwrap_or(start_altitude_m);
                if !(altitude_end_m > h0) || !(climb_angle_rad > 0.0) || !(mach > 0.0) {
                    return Err(self.invalid("climb needs a rising altitude, positive mach and climb angle"));
                }
                let altitude = spacing::between(h0, altitude_end_m, n, self.spacing);
                let velocity = altitude
                    .iter()
                    .enumerate()
                    .map(|(k, &h)| self.speed_of_sound(k, h).map(|a| mach * a))
                    .collect::<Result<Vec<_>, _>>()?;
                let sin_gamma = climb_angle_rad.sin();
                let inverse_rate: Vec<f64> = velocity.iter().map(|v| 1.0 / (v * sin_gamma)).collect();
                let time = spacing::cumulative_trapezoid(&altitude, &inverse_rate);
                let distance = altitude
                    .iter()
                    .map(|h| (h - h0) / climb_angle_rad.tan())
                    .collect();
                Ok(Profile::assemble(time, altitude, velocity, vec![climb_angle_rad; n], distance))
            }
            SegmentKind::ClimbConstantSpeedConstantRate {
                altitude_start_m,
                altitude_end_m,
                airspeed_m_s,
                climb_rate_m_s,
            } => {
                let h0 = altitude_start_m.unwrap_or(start_altitude_m);
                if !(altitude_end_m > h0) || !(climb_rate_m_s > 0.0) || !(airspeed_m_s > climb_rate_m_s) {
                    return Err(self.invalid("climb rate must be positive and below the airspeed"));
                }
                let gamma = (climb_rate_m_s / airspeed_m_s).asin();
                Ok(Profile::steady_path(
                    spacing::between(h0, altitude_end_m, n, self.spacing),
                    h0,
                    airspeed_m_s,
                    gamma,
                    climb_rate_m_s,
                ))
            }
            SegmentKind::DescentConstantSpeedConstantRate {
                altitude_start_m,
                altitude_end_m,
                airspeed_m_s,
                descent_rate_m_s,
            } => {
                let h0 = altitude_start_m.unwrap_or(start_altitude_m);
                if !(altitude_end_m < h0) || !(descent_rate_m_s > 0.0) || !(airspeed_m_s > descent_rate_m_s) {
                    return Err(self.invalid("descent rate must be positive and below the airspeed"));
                }
                let gamma = -(descent_rate_m_s / airspeed_m_s).asin();
                Ok(Profile::steady_path(
                    spacing::between(h0, altitude_end_m, n, self.spacing),
                    h0,
                    airspeed_m_s,
                    gamma,
                    descent_rate_m_s,
                ))
            }
            SegmentKind::CruiseConstantSpeedConstantAltitude {
                altitude_m,
                airspeed_m_s,
                distance_m,
            } => {
                if !(airspeed_m_s > 0.0 && distance_m > 0.0) {
                    return Err(self.invalid("cruise needs positive airspeed and distance"));
                }
                let h = altitude_m.unwrap_or(start_altitude_m);
                Ok(Profile::level(h, vec![airspeed_m_s; n], distance_m, self.spacing))
            }
            SegmentKind::CruiseConstantMachConstantAltitude {
                altitude_m,
                mach,
                distance_m,
            } => {
                if !(mach > 0.0 && distance_m > 0.0) {
                    return Err(self.invalid("cruise needs positive mach and distance"));
                }
                let h = altitude_m.unwrap_or(start_altitude_m);
                let v = mach * self.speed_of_sound(0, h)?;
                Ok(Profile::level(h, vec![v; n], distance_m, self.spacing))
            }
        }
    }
}

/// Segment-relative kinematics: time and distance start at zero.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub time_s: Vec<f64>,
    pub altitude_m: Vec<f64>,
    pub velocity_m_s: Vec<f64>,
    pub flight_path_angle_rad: Vec<f64>,
    pub distance_m: Vec<f64>,
    /// Along-path acceleration dV/dt.
    pub acceleration_m_s2: Vec<f64>,
}

impl Profile {
    fn assemble(
        time_s: Vec<f64>,
        altitude_m: Vec<f64>,
        velocity_m_s: Vec<f64>,
        flight_path_angle_rad: Vec<f64>,
        distance_m: Vec<f64>,
    ) -> Self {
        let acceleration_m_s2 = spacing::gradient(&time_s, &velocity_m_s);
        Self {
            time_s,
            altitude_m,
            velocity_m_s,
            flight_path_angle_rad,
            distance_m,
            acceleration_m_s2,
        }
    }

    /// Constant airspeed along a constant flight-path angle.
    fn steady_path(altitude_m: Vec<f64>, h0: f64, airspeed: f64, gamma: f64, vertical_rate: f64) -> Self {
        let n = altitude_m.len();
        let time: Vec<f64> = altitude_m.iter().map(|h| (h - h0).abs() / vertical_rate).collect();
        let distance = time.iter().map(|t| airspeed * gamma.cos() * t).collect();
        Self::assemble(time, altitude_m, vec![airspeed; n], vec![gamma; n], distance)
    }

    fn level(altitude_m: f64, velocity: Vec<f64>, distance_m: f64, mode: NodeSpacing) -> Self {
        let n = velocity.len();
        let distance = spacing::between(0.0, distance_m, n, mode);
        let time = distance.iter().zip(&velocity).map(|(x, v)| x / v).collect();
        Self::assemble(time, vec![altitude_m; n], velocity, vec![0.0; n], distance)
    }

    pub fn len(&self) -> usize {
        self.time_s.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time_s.is_empty()
    }
}
