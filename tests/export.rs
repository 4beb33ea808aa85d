use skylark::config::{load_mission_configs, load_vehicle_configs};
use skylark::export::summary::{MissionSummary, write_json};
use skylark::export::{nodes, writer_for_path};
use skylark::mission::{MissionResult, evaluate_mission, mission_from_config, select_mission};
use skylark::vehicle;

fn survey() -> MissionResult {
    let vehicles = load_vehicle_configs("configs/vehicles").expect("vehicle catalog");
    let missions = load_mission_configs("configs/missions").expect("mission catalog");
    let record = select_mission(&missions, Some("battery-survey")).expect("survey");
    let trainer = vehicle::select(&vehicles, record.vehicle.as_deref()).expect("trainer");
    let mission = mission_from_config(record).expect("mission");
    evaluate_mission(&trainer, &mission).expect("survey flies")
}

#[test]
fn node_table_round_trips_through_csv() {
    let result = survey();
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("survey.csv");
    nodes::write_csv(writer_for_path(&path).expect("writer"), &result).expect("csv written");

    let mut reader = csv::Reader::from_path(&path).expect("csv reader");
    let headers = reader.headers().expect("headers").clone();
    assert_eq!(&headers[0], "segment");
    assert!(headers.iter().any(|h| h == "energy_j:battery"));
    let time_column = headers.iter().position(|h| h == "time_s").expect("time column");

    let rows: Vec<csv::StringRecord> = reader.records().collect::<Result<_, _>>().expect("rows");
    assert_eq!(rows.len(), 48);
    assert_eq!(&rows[16][0], "cruise");
    assert_eq!(&rows[16][2], "0");
    let last_time: f64 = rows[47][time_column].parse().expect("time value");
    assert_eq!(last_time, result.duration_s());
}

#[test]
fn summary_json_reports_mission_totals() {
    let result = survey();
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("nested/summary.json");
    write_json(writer_for_path(&path).expect("writer"), &MissionSummary::from_result(&result))
        .expect("json written");

    let text = std::fs::read_to_string(&path).expect("summary file");
    let json: serde_json::Value = serde_json::from_str(&text).expect("valid json");
    assert_eq!(json["vehicle"], "e-trainer");
    assert_eq!(json["completed"], true);
    assert_eq!(json["segments"].as_array().map(Vec::len), Some(3));
    let consumed = json["energy_consumed_j"]["battery"].as_f64().expect("consumed");
    let initial = json["initial_energy_j"]["battery"].as_f64().expect("initial");
    assert!(consumed > 0.0 && consumed <= initial);
    assert_eq!(json["segments"][2]["diagnostics"].as_array().map(Vec::len), Some(16));
}
