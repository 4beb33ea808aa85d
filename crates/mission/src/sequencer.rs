//! Runs a mission's segments in order, carrying vehicle state across boundaries.

use skylark_energy::EnergyStorage;
use thiserror::Error;
use tracing::{error, info};

use crate::results::MissionResult;
use crate::segment::Segment;
use crate::solver::{
    EnergyLedger, ExhaustionPolicy, FlightState, SegmentError, SolverSettings, solve_segment,
};
use crate::vehicle::{Configuration, Vehicle};

#[derive(Debug, Error)]
pub enum MissionError {
    #[error("mission '{0}' has no segments")]
    NoSegments(String),
    #[error("vehicle '{0}' has no propulsors")]
    NoPropulsors(String),
    #[error("propulsor '{0}' has not been sized")]
    PropulsorNotSized(String),
    #[error("propulsor '{propulsor}' draws on unknown storage '{storage}'")]
    UnknownStorage { propulsor: String, storage: String },
    #[error("segment '{segment}' flies unknown configuration '{configuration}'")]
    UnknownConfiguration {
        segment: String,
        configuration: String,
    },
    #[error("initial mass {0} kg must be positive")]
    InvalidInitialMass(f64),
    /// A segment failed; `partial` holds every node solved up to the failure.
    #[error("segment {index} ('{tag}') failed: {source}")]
    Segment {
        index: usize,
        tag: String,
        #[source]
        source: SegmentError,
        partial: Box<MissionResult>,
    },
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MissionSettings {
    pub exhaustion_policy: ExhaustionPolicy,
    /// Overrides the vehicle's full mass at mission start.
    pub initial_mass_kg: Option<f64>,
    pub solver: SolverSettings,
}

#[derive(Debug, Clone)]
pub struct Mission {
    pub tag: String,
    pub segments: Vec<Segment>,
    pub settings: MissionSettings,
}

impl Mission {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            segments: Vec::new(),
            settings: MissionSettings::default(),
        }
    }

    pub fn with_segment(mut self, segment: Segment) -> Self {
        self.segments.push(segment);
        self
    }

    pub fn with_settings(mut self, settings: MissionSettings) -> Self {
        self.settings = settings;
        self
    }
}

fn check_vehicle(vehicle: &Vehicle) -> Result<(), MissionError> {
    if vehicle.propulsors.is_empty() {
        return Err(MissionError::NoPropulsors(vehicle.name.clone()));
    }
    for propulsor in &vehicle.propulsors {
        if !propulsor.is_sized() {
            return Err(MissionError::PropulsorNotSized(propulsor.tag().to_string()));
        }
        if let skylark_propulsion::Propulsor::Electric(motor) = propulsor {
            if vehicle.energy_storage(&motor.storage).is_none() {
                return Err(MissionError::UnknownStorage {
                    propulsor: motor.tag.clone(),
                    storage: motor.storage.clone(),
                });
            }
        }
    }
    Ok(())
}

fn resolve_configurations(vehicle: &Vehicle, mission: &Mission) -> Result<Vec<Configuration>, MissionError> {
    mission
        .segments
        .iter()
        .map(|segment| match &segment.configuration {
            None => Ok(Configuration::clean("clean")),
            Some(name) => vehicle.configuration(name).cloned().ok_or_else(|| {
                MissionError::UnknownConfiguration {
                    segment: segment.tag.clone(),
                    configuration: name.clone(),
                }
            }),
        })
        .collect()
}

/// Fly `mission` with `vehicle`, starting on the ground with full storages.
///
/// The vehicle itself is not modified; storages are copied into a mission-local
/// ledger. Evaluating the same inputs twice gives identical results.
pub fn evaluate_mission(vehicle: &Vehicle, mission: &Mission) -> Result<MissionResult, MissionError> {
    if mission.segments.is_empty() {
        return Err(MissionError::NoSegments(mission.tag.clone()));
    }
    check_vehicle(vehicle)?;
    let configurations = resolve_configurations(vehicle, mission)?;

    let initial_mass_kg = mission.settings.initial_mass_kg.unwrap_or(vehicle.mass.full_kg);
    if !(initial_mass_kg > 0.0 && initial_mass_kg.is_finite()) {
        return Err(MissionError::InvalidInitialMass(initial_mass_kg));
    }

    let mut ledger = EnergyLedger::charged(&vehicle.energy_storages);
    let mut result = MissionResult {
        vehicle: vehicle.name.clone(),
        mission: mission.tag.clone(),
        initial_energy_j: ledger.current_energy_j(),
        initial_mass_kg,
        segments: Vec::with_capacity(mission.segments.len()),
    };
    info!(
        vehicle = %vehicle.name,
        mission = %mission.tag,
        segments = mission.segments.len(),
        initial_mass_kg,
        storages = ledger.stores().len(),
        "evaluating mission"
    );

    let mut state = FlightState {
        time_s: 0.0,
        mass_kg: initial_mass_kg,
        altitude_m: 0.0,
        distance_m: 0.0,
    };
    for (index, (segment, configuration)) in mission.segments.iter().zip(&configurations).enumerate() {
        match solve_segment(
            vehicle,
            segment,
            configuration,
            state,
            &mut ledger,
            mission.settings.exhaustion_policy,
            &mission.settings.solver,
        ) {
            Ok((table, terminal)) => {
                result.segments.push(table);
                state = terminal;
            }
            Err(failure) => {
                error!(mission = %mission.tag, segment = %segment.tag, "{}", failure.error);
                if !failure.partial.is_empty() {
                    result.segments.push(failure.partial);
                }
                return Err(MissionError::Segment {
                    index,
                    tag: segment.tag.clone(),
                    source: failure.error,
                    partial: Box::new(result),
                });
            }
        }
    }

    let remaining: f64 = ledger
        .stores()
        .iter()
        .filter_map(|s| s.current_energy_j())
        .sum();
    info!(
        mission = %mission.tag,
        duration_s = state.time_s,
        final_mass_kg = state.mass_kg,
        energy_remaining_j = remaining,
        "mission complete"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::SegmentKind;
    use crate::vehicle::MassProperties;
    use skylark_aero::FiniteWing;
    use skylark_atmosphere::UsStandard1976;
    use skylark_energy::{Battery, BatteryLossModel, EnergyStore};
    use skylark_propulsion::{ElectricPropulsor, Propulsor};
    use std::sync::Arc;

    fn vehicle() -> Vehicle {
        let wing = FiniteWing::new(48.0, 7.32, 0.8, 0.0341, 0.30).unwrap();
        let mut vehicle = Vehicle::new("e-trainer", MassProperties::new(743.0, 500.0), Arc::new(wing));
        let battery = Battery::new("battery", 3.6e6, 640.0, BatteryLossModel::Lossless)
            .and_then(|b| b.with_mass(500.0))
            .unwrap();
        vehicle.add_energy_storage(EnergyStore::Battery(battery));
        vehicle.add_propulsor(Propulsor::Electric(ElectricPropulsor {
            tag: "motor".into(),
            number_of_engines: 1,
            motor_efficiency: 0.9,
            propeller_efficiency: 0.89,
            max_power_w: 320_000.0,
            max_static_thrust_n: None,
            storage: "battery".into(),
        }));
        vehicle
    }

    fn mission() -> Mission {
        let atmosphere = Arc::new(UsStandard1976::new());
        Mission::new("hop")
            .with_segment(Segment::new(
                "climb",
                SegmentKind::ClimbConstantSpeedConstantRate {
                    altitude_start_m: None,
                    altitude_end_m: 1_500.0,
                    airspeed_m_s: 50.0,
                    climb_rate_m_s: 4.0,
                },
                atmosphere.clone(),
            ))
            .with_segment(Segment::new(
                "cruise",
                SegmentKind::CruiseConstantSpeedConstantAltitude {
                    altitude_m: None,
                    airspeed_m_s: 60.0,
                    distance_m: 50_000.0,
                },
                atmosphere,
            ))
    }

    #[test]
    fn segments_share_boundary_nodes() {
        let result = evaluate_mission(&vehicle(), &mission()).unwrap();
        assert_eq!(result.segments.len(), 2);
        let (climb, cruise) = (&result.segments[0], &result.segments[1]);
        assert_eq!(climb.time_s[15], cruise.time_s[0]);
        assert_eq!(climb.altitude_m[15], cruise.altitude_m[0]);
        assert_eq!(climb.distance_m[15], cruise.distance_m[0]);
        assert_eq!(climb.mass_kg[15], cruise.mass_kg[0]);
        assert_eq!(climb.energy_remaining_j[15], cruise.energy_remaining_j[0]);
        assert_eq!(result.initial_energy_j["battery"], 1.8e9);
    }

    #[test]
    fn evaluation_does_not_touch_the_vehicle() {
        let vehicle = vehicle();
        let first = evaluate_mission(&vehicle, &mission()).unwrap();
        let second = evaluate_mission(&vehicle, &mission()).unwrap();
        assert_eq!(first, second);
        assert_eq!(vehicle.energy_storages[0].current_energy_j(), Some(1.8e9));
    }

    #[test]
    fn unknown_configuration_is_rejected_up_front() {
        let mut mission = mission();
        mission.segments[1].configuration = Some("landing".into());
        assert!(matches!(
            evaluate_mission(&vehicle(), &mission),
            Err(MissionError::UnknownConfiguration { .. })
        ));
    }

    #[test]
    fn failure_keeps_completed_segments() {
        let mut mission = mission();
        mission.segments.push(Segment::new(
            "zoom",
            SegmentKind::ClimbConstantSpeedConstantRate {
                altitude_start_m: None,
                altitude_end_m: 3_000.0,
                airspeed_m_s: 60.0,
                climb_rate_m_s: 40.0,
            },
            Arc::new(UsStandard1976::new()),
        ));
        match evaluate_mission(&vehicle(), &mission) {
            Err(MissionError::Segment { index, partial, .. }) => {
                assert_eq!(index, 2);
                assert_eq!(partial.segments.len(), 2);
            }
            other => panic!("expected a segment failure, got {other:?}"),
        }
    }

    #[test]
    fn empty_missions_are_rejected() {
        assert!(matches!(
            evaluate_mission(&vehicle(), &Mission::new("nothing")),
            Err(MissionError::NoSegments(_))
        ));
    }
}
