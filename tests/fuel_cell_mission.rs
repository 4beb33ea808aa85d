use approx::assert_relative_eq;
use skylark::config::{load_mission_configs, load_vehicle_configs};
use skylark::energy::{
    EnergyStorage, EnergyStore, EnergyWarning, FuelCell, HYDROGEN_LHV, PolarizationCurve,
};
use skylark::mission::{
    DiagnosticKind, Mission, Vehicle, evaluate_mission, mission_from_config, select_mission,
};
use skylark::vehicle;

fn glider_and_hop() -> (Vehicle, Mission) {
    let vehicles = load_vehicle_configs("configs/vehicles").expect("vehicle catalog");
    let missions = load_mission_configs("configs/missions").expect("mission catalog");
    let glider = vehicle::select(&vehicles, Some("h2-glider")).expect("glider");
    let record = select_mission(&missions, Some("h2-hop")).expect("hop");
    (glider, mission_from_config(record).expect("mission"))
}

#[test]
fn hydrogen_hop_consumes_propellant_mass() {
    let (glider, mission) = glider_and_hop();

    let stack = match glider.energy_storage("stack") {
        Some(EnergyStore::FuelCell(cell)) => cell.clone(),
        other => panic!("expected a fuel cell, got {other:?}"),
    };
    assert_relative_eq!(stack.max_power_w(), 33_244.45, max_relative = 1e-3);
    assert_eq!(glider.mass.full_kg, 490.0);

    let result = evaluate_mission(&glider, &mission).expect("hop flies");
    assert_eq!(result.segments.len(), 3);
    assert!(result.segments.iter().all(|s| s.len() == 12));
    // A fuel cell has no charge state to report.
    assert!(result.initial_energy_j.is_empty());
    assert!(result.segments.iter().all(|s| s.storage_energy_j.is_empty()));

    let climb = result.segment("climb").expect("climb");
    for k in 0..climb.len() {
        let power = climb.electric_power_w[k];
        assert!(power > 0.0 && power < stack.max_power_w());
        // Hydrogen flow exceeds the ideal P / LHV because the stack is lossy.
        assert!(climb.fuel_mass_rate_kg_s[k] > power / HYDROGEN_LHV);
    }

    let burned = result.fuel_burned_kg();
    assert!(burned > 0.0 && burned < 5.0, "hydrogen burned {burned} kg");
    let mass: Vec<f64> = result.segments.iter().flat_map(|s| s.mass_kg.iter().copied()).collect();
    assert!(mass.windows(2).all(|w| w[1] <= w[0]));
}

#[test]
fn undersized_stack_is_clamped_node_by_node() {
    let (mut glider, mission) = glider_and_hop();
    let small = FuelCell::new("stack", PolarizationCurve::default(), 10, 4.0).expect("small stack");
    let peak_w = small.max_power_w();
    let slot = glider
        .energy_storages
        .iter_mut()
        .find(|s| s.tag() == "stack")
        .expect("stack slot");
    *slot = EnergyStore::FuelCell(small);

    // The motor keeps its original rating, so every climb node asks for more than the stack has.
    let result = evaluate_mission(&glider, &mission).expect("hop keeps flying");
    assert_eq!(result.segments.len(), 3);
    let climb = result.segment("climb").expect("climb");
    assert_eq!(climb.len(), 12);

    let clamped: Vec<(usize, f64, f64)> = climb
        .diagnostics
        .iter()
        .filter_map(|d| match &d.kind {
            DiagnosticKind::Energy(EnergyWarning::PowerOutOfRange {
                requested_w,
                deliverable_w,
                ..
            }) => Some((d.node, *requested_w, *deliverable_w)),
            _ => None,
        })
        .collect();
    let nodes: Vec<usize> = clamped.iter().map(|(node, _, _)| *node).collect();
    assert_eq!(nodes, (0..climb.len()).collect::<Vec<_>>());
    for (node, requested, deliverable) in clamped {
        assert!(requested > deliverable);
        assert_eq!(deliverable, peak_w);
        assert_eq!(climb.electric_power_w[node], peak_w);
    }
}
