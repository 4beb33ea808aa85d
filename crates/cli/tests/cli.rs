use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

const VEHICLES: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../configs/vehicles");
const MISSIONS: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../configs/missions");

#[test]
fn mission_writes_csv_and_summary() {
    let dir = tempfile::tempdir().expect("tempdir");
    let csv_path = dir.path().join("survey.csv");
    let json_path = dir.path().join("out/survey.json");

    Command::cargo_bin("mission")
        .expect("mission bin")
        .args([
            "--vehicles",
            VEHICLES,
            "--missions",
            MISSIONS,
            "--mission",
            "battery-survey",
            "--csv",
            csv_path.to_str().unwrap(),
            "--summary",
            json_path.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Mission 'battery-survey' / vehicle 'e-trainer'"))
        .stdout(predicate::str::contains("Take-off field"));

    let table = fs::read_to_string(&csv_path).expect("csv output");
    assert_eq!(table.lines().count(), 49);
    assert!(table.starts_with("segment,kind,node,"));

    let summary: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&json_path).expect("json output")).expect("json");
    assert_eq!(summary["completed"], true);
    assert!(summary["takeoff"]["field_length_m"].as_f64().unwrap() > 0.0);
}

#[test]
fn mission_rejects_unknown_names() {
    Command::cargo_bin("mission")
        .expect("mission bin")
        .args(["--vehicles", VEHICLES, "--missions", MISSIONS, "--mission", "ferry-flight"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ferry-flight"));
}

#[test]
fn engine_reports_design_point_thrust() {
    Command::cargo_bin("engine")
        .expect("engine bin")
        .args(["--vehicles", VEHICLES, "--vehicle", "twin-jet", "--throttle", "0.5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Turbofan 'turbofan' on 'twin-jet'"))
        .stdout(predicate::str::contains("TSFC"));
}

#[test]
fn engine_needs_a_turbofan() {
    Command::cargo_bin("engine")
        .expect("engine bin")
        .args(["--vehicles", VEHICLES, "--vehicle", "e-trainer"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("has no matching turbofan"));
}
