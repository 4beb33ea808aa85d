use std::sync::Arc;

use approx::assert_relative_eq;
use skylark::atmosphere::UsStandard1976;
use skylark::config::{PropulsorConfig, load_mission_configs, load_vehicle_configs};
use skylark::mission::{
    Airport, DiagnosticKind, ExhaustionPolicy, Mission, MissionError, Segment, SegmentError, SegmentKind,
    estimate_takeoff_field_length, evaluate_mission, mission_from_config, select_mission,
};
use skylark::propulsion::{PropulsionError, Propulsor};
use skylark::vehicle;

fn twin_jet() -> skylark::mission::Vehicle {
    let catalog = load_vehicle_configs("configs/vehicles").expect("vehicle catalog");
    vehicle::select(&catalog, Some("twin-jet")).expect("twin-jet")
}

fn sector() -> Mission {
    let missions = load_mission_configs("configs/missions").expect("mission catalog");
    let record = select_mission(&missions, Some("twin-jet-sector")).expect("sector");
    mission_from_config(record).expect("mission")
}

/// The sector with its cruise leg stretched far beyond the fuel load.
fn ferry_sector(distance: f64) -> Mission {
    let mut mission = sector();
    let cruise = mission
        .segments
        .iter_mut()
        .find(|s| s.tag == "cruise")
        .expect("cruise leg");
    match &mut cruise.kind {
        SegmentKind::CruiseConstantMachConstantAltitude { distance_m, .. } => *distance_m = distance,
        other => panic!("unexpected cruise kind {other:?}"),
    }
    mission
}

#[test]
fn catalog_turbofan_meets_design_thrust_at_design_point() {
    let catalog = load_vehicle_configs("configs/vehicles").expect("vehicle catalog");
    let record = catalog.iter().find(|v| v.name == "twin-jet").expect("twin-jet record");
    let PropulsorConfig::Turbofan(config) = &record.propulsors[0] else {
        panic!("twin-jet should fly turbofans");
    };
    let design = vehicle::design_freestream(config).expect("design freestream");

    let jet = twin_jet();
    let Propulsor::Turbofan(engine) = &jet.propulsors[0] else {
        panic!("turbofan expected");
    };
    assert!(engine.is_sized());
    let full = engine.evaluate(&design, 1.0).expect("full throttle");
    assert_relative_eq!(full.thrust_n, config.design_thrust_n, max_relative = 1e-5);

    let half = engine.evaluate(&design, 0.5).expect("half throttle");
    assert_relative_eq!(half.thrust_n, 0.5 * full.thrust_n, max_relative = 1e-12);
    assert_relative_eq!(half.fuel_mass_rate_kg_s, 0.5 * full.fuel_mass_rate_kg_s, max_relative = 1e-12);
}

#[test]
fn sector_burns_fuel_and_lightens_the_aircraft() {
    let jet = twin_jet();
    let result = evaluate_mission(&jet, &sector()).expect("sector flies");
    assert_eq!(result.segments.len(), 4);
    assert_eq!(result.segment("cruise").expect("cruise").len(), 24);
    assert!(result.initial_energy_j.is_empty());

    let mass: Vec<f64> = result.segments.iter().flat_map(|s| s.mass_kg.iter().copied()).collect();
    assert!(mass.windows(2).all(|w| w[1] <= w[0]));
    let burned = result.fuel_burned_kg();
    assert!(burned > 1_000.0 && burned < 15_000.0, "fuel burned {burned} kg");
    assert!(result.final_mass_kg() > jet.mass.min_flight_kg);
    assert!(!result.is_energy_exhausted());

    // Each node's fuel flow is held until the next node.
    for segment in &result.segments {
        for k in 1..segment.len() {
            let dt = segment.time_s[k] - segment.time_s[k - 1];
            assert_relative_eq!(
                segment.mass_kg[k],
                segment.mass_kg[k - 1] - segment.fuel_mass_rate_kg_s[k - 1] * dt,
                max_relative = 1e-12
            );
        }
    }

    let cruise = result.segment("cruise").expect("cruise");
    assert!(cruise.throttle.iter().all(|t| *t > 0.0 && *t < 1.0));
    assert!(cruise.altitude_m.iter().all(|h| *h == 9_500.0));
    assert_relative_eq!(cruise.distance_m[23] - cruise.distance_m[0], 2.0e6, max_relative = 1e-12);
}

#[test]
fn hot_day_takeoff_needs_more_runway() {
    let jet = twin_jet();
    let atmosphere = UsStandard1976::new();
    let standard = estimate_takeoff_field_length(&jet, "takeoff", &atmosphere, &Airport::default())
        .expect("standard day");
    let hot = estimate_takeoff_field_length(
        &jet,
        "takeoff",
        &atmosphere,
        &Airport {
            altitude_m: 0.0,
            delta_isa_k: 25.0,
        },
    )
    .expect("hot day");
    assert!(standard.field_length_m > 800.0 && standard.field_length_m < 4_000.0);
    assert!(hot.field_length_m > standard.field_length_m);
}

#[test]
fn fuel_runs_out_at_minimum_flight_mass() {
    let jet = twin_jet();
    let result = evaluate_mission(&jet, &ferry_sector(3.0e7)).expect("ferry continues past exhaustion");

    assert!(result.is_energy_exhausted());
    assert_eq!(result.final_mass_kg(), jet.mass.min_flight_kg);
    assert_relative_eq!(
        result.fuel_burned_kg(),
        jet.mass.full_kg - jet.mass.min_flight_kg,
        max_relative = 1e-12
    );
    let mass: Vec<f64> = result.segments.iter().flat_map(|s| s.mass_kg.iter().copied()).collect();
    assert!(mass.iter().all(|m| *m >= jet.mass.min_flight_kg));

    let (tag, first) = result
        .diagnostics()
        .find(|(_, d)| matches!(d.kind, DiagnosticKind::PropellantExhausted { .. }))
        .expect("exhaustion recorded");
    assert_eq!(tag, "cruise");
    assert!(first.node > 0);
}

#[test]
fn abort_policy_stops_when_the_tanks_are_dry() {
    let jet = twin_jet();
    let mut mission = ferry_sector(3.0e7);
    mission.settings.exhaustion_policy = ExhaustionPolicy::Abort;

    let Err(MissionError::Segment {
        index,
        tag,
        source,
        partial,
    }) = evaluate_mission(&jet, &mission)
    else {
        panic!("ferry should abort");
    };
    assert_eq!((index, tag.as_str()), (2, "cruise"));
    let SegmentError::PropellantExhausted { node, shortfall_kg } = source else {
        panic!("unexpected failure {source}");
    };
    assert!(shortfall_kg > 0.0);

    assert_eq!(partial.segments.len(), 3);
    let cruise = partial.segment("cruise").expect("partial cruise");
    assert_eq!(cruise.len(), node + 1);
    assert!(partial.is_energy_exhausted());
    assert!(cruise.mass_kg.iter().all(|m| *m >= jet.mass.min_flight_kg));
}

#[test]
fn combustor_failure_aborts_with_the_completed_legs() {
    let jet = twin_jet();
    let mut mission = sector();
    let atmosphere = Arc::clone(&mission.segments[2].atmosphere);
    // Ram heating at Mach 3.2 takes the compressor exit past the turbine inlet temperature.
    mission.segments.insert(
        3,
        Segment::new(
            "dash",
            SegmentKind::CruiseConstantMachConstantAltitude {
                altitude_m: None,
                mach: 3.2,
                distance_m: 1.0e5,
            },
            atmosphere,
        ),
    );

    let Err(MissionError::Segment {
        index,
        tag,
        source,
        partial,
    }) = evaluate_mission(&jet, &mission)
    else {
        panic!("dash should fail");
    };
    assert_eq!((index, tag.as_str()), (3, "dash"));
    assert!(matches!(
        source,
        SegmentError::Propulsion {
            node: 0,
            source: PropulsionError::PhysicalModel { ref component, .. },
        } if component == "combustor"
    ));
    let flown: Vec<&str> = partial.segments.iter().map(|s| s.tag.as_str()).collect();
    assert_eq!(flown, ["initial-climb", "climb", "cruise"]);
    assert!(partial.segments.iter().all(|s| s.len() > 1));
}
