use skylark::config::{load_mission_configs, load_vehicle_configs};
use skylark::mission::{SegmentKind, mission_from_config};
use skylark::vehicle;

#[test]
fn every_catalog_vehicle_builds_and_sizes() {
    let catalog = load_vehicle_configs("configs/vehicles").expect("vehicle catalog");
    let names: Vec<&str> = catalog.iter().map(|v| v.name.as_str()).collect();
    assert_eq!(names, ["e-trainer", "twin-jet", "h2-glider"]);
    for record in &catalog {
        let built = vehicle::from_config(record).expect("vehicle builds");
        assert!(built.propulsors.iter().all(|p| p.is_sized()), "{}", built.name);
        assert!(built.mass.full_kg >= record.mass.full_kg);
    }
}

#[test]
fn default_vehicle_is_the_first_entry() {
    let catalog = load_vehicle_configs("configs/vehicles").expect("vehicle catalog");
    let first = vehicle::select(&catalog, None).expect("default vehicle");
    assert_eq!(first.name, "e-trainer");
    assert!(first.configuration("takeoff").is_some());
}

#[test]
fn catalog_missions_convert_to_runtime_segments() {
    let missions = load_mission_configs("configs/missions").expect("mission catalog");
    assert_eq!(missions.len(), 3);
    for record in &missions {
        let mission = mission_from_config(record).expect("mission converts");
        assert_eq!(mission.segments.len(), record.segments.len());
        assert!(record.vehicle.is_some());
    }

    let survey = mission_from_config(&missions[0]).expect("survey");
    match survey.segments[0].kind {
        SegmentKind::ClimbConstantMach { climb_angle_rad, mach, .. } => {
            assert!((climb_angle_rad - 15.0_f64.to_radians()).abs() < 1e-15);
            assert_eq!(mach, 0.15);
        }
        other => panic!("unexpected first segment {other:?}"),
    }
    assert!(survey.segments.iter().all(|s| s.nodes == 16));
}
