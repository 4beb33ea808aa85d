//! Export helpers for mission node tables (CSV) and summaries (JSON).

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Create a writer for the target path, handling stdout (`-`) by convention.
pub fn writer_for_path(path: &Path) -> io::Result<Box<dyn Write>> {
    if path == Path::new("-") {
        return Ok(Box::new(BufWriter::new(io::stdout())));
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file = File::create(path)?;
    Ok(Box::new(BufWriter::new(file)))
}

pub mod nodes {
    use std::io::Write;

    use skylark_mission::MissionResult;

    use crate::ExportError;

    const PREFIX: [&str; 3] = ["segment", "kind", "node"];

    /// Header row: segment identity, the named node columns, then one charge column per storage.
    pub fn header(result: &MissionResult) -> Vec<String> {
        let mut header: Vec<String> = PREFIX.iter().map(|s| s.to_string()).collect();
        if let Some(first) = result.segments.first() {
            header.extend(first.columns().into_iter().map(|(name, _)| name.to_string()));
        }
        header.extend(result.initial_energy_j.keys().map(|tag| format!("energy_j:{tag}")));
        header
    }

    /// Write one CSV row per node, segments in flight order.
    pub fn write_csv<W: Write>(writer: W, result: &MissionResult) -> Result<(), ExportError> {
        let mut out = csv::Writer::from_writer(writer);
        out.write_record(header(result))?;
        for segment in &result.segments {
            let columns = segment.columns();
            for k in 0..segment.len() {
                let mut row = vec![segment.tag.clone(), segment.kind.clone(), k.to_string()];
                row.extend(columns.iter().map(|(_, values)| values[k].to_string()));
                for tag in result.initial_energy_j.keys() {
                    let value = segment
                        .storage_energy_j
                        .get(tag)
                        .and_then(|column| column.get(k))
                        .map(f64::to_string)
                        .unwrap_or_default();
                    row.push(value);
                }
                out.write_record(&row)?;
            }
        }
        out.flush()?;
        Ok(())
    }
}

pub mod summary {
    use std::collections::BTreeMap;
    use std::io::Write;

    use serde::Serialize;
    use serde_json::to_writer_pretty;
    use skylark_mission::{MissionResult, SegmentResult, TakeoffEstimate};

    use crate::ExportError;

    #[derive(Debug, Clone, Serialize)]
    pub struct SegmentSummary {
        pub tag: String,
        pub kind: String,
        pub nodes: usize,
        pub start_time_s: f64,
        pub end_time_s: f64,
        pub start_altitude_m: f64,
        pub end_altitude_m: f64,
        pub distance_m: f64,
        pub fuel_burned_kg: f64,
        pub max_throttle: f64,
        pub diagnostics: Vec<String>,
    }

    impl SegmentSummary {
        fn from_segment(segment: &SegmentResult) -> Self {
            let first = |column: &[f64]| column.first().copied().unwrap_or_default();
            let last = |column: &[f64]| column.last().copied().unwrap_or_default();
            Self {
                tag: segment.tag.clone(),
                kind: segment.kind.clone(),
                nodes: segment.len(),
                start_time_s: first(&segment.time_s),
                end_time_s: last(&segment.time_s),
                start_altitude_m: first(&segment.altitude_m),
                end_altitude_m: last(&segment.altitude_m),
                distance_m: last(&segment.distance_m) - first(&segment.distance_m),
                fuel_burned_kg: first(&segment.mass_kg) - last(&segment.mass_kg),
                max_throttle: segment.throttle.iter().copied().fold(0.0, f64::max),
                diagnostics: segment.diagnostics.iter().map(ToString::to_string).collect(),
            }
        }
    }

    #[derive(Debug, Clone, Copy, Serialize)]
    pub struct TakeoffSummary {
        pub field_length_m: f64,
        pub stall_speed_m_s: f64,
        pub v2_m_s: f64,
        pub thrust_n: f64,
    }

    impl From<&TakeoffEstimate> for TakeoffSummary {
        fn from(estimate: &TakeoffEstimate) -> Self {
            Self {
                field_length_m: estimate.field_length_m,
                stall_speed_m_s: estimate.stall_speed_m_s,
                v2_m_s: estimate.v2_m_s,
                thrust_n: estimate.thrust_n,
            }
        }
    }

    /// Mission-level totals plus per-segment endpoints.
    #[derive(Debug, Clone, Serialize)]
    pub struct MissionSummary {
        pub vehicle: String,
        pub mission: String,
        pub completed: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub failure: Option<String>,
        pub duration_s: f64,
        pub ground_distance_m: f64,
        pub initial_mass_kg: f64,
        pub final_mass_kg: f64,
        pub fuel_burned_kg: f64,
        pub initial_energy_j: BTreeMap<String, f64>,
        pub final_energy_j: BTreeMap<String, f64>,
        pub energy_consumed_j: BTreeMap<String, f64>,
        pub energy_exhausted: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub takeoff: Option<TakeoffSummary>,
        pub segments: Vec<SegmentSummary>,
    }

    impl MissionSummary {
        pub fn from_result(result: &MissionResult) -> Self {
            Self {
                vehicle: result.vehicle.clone(),
                mission: result.mission.clone(),
                completed: true,
                failure: None,
                duration_s: result.duration_s(),
                ground_distance_m: result.ground_distance_m(),
                initial_mass_kg: result.initial_mass_kg,
                final_mass_kg: result.final_mass_kg(),
                fuel_burned_kg: result.fuel_burned_kg(),
                initial_energy_j: result.initial_energy_j.clone(),
                final_energy_j: result.final_energy_j(),
                energy_consumed_j: result.energy_consumed_j(),
                energy_exhausted: result.is_energy_exhausted(),
                takeoff: None,
                segments: result.segments.iter().map(SegmentSummary::from_segment).collect(),
            }
        }

        /// Summary of the nodes solved before `reason` stopped the mission.
        pub fn partial(result: &MissionResult, reason: impl Into<String>) -> Self {
            Self {
                completed: false,
                failure: Some(reason.into()),
                ..Self::from_result(result)
            }
        }

        pub fn with_takeoff(mut self, estimate: &TakeoffEstimate) -> Self {
            self.takeoff = Some(estimate.into());
            self
        }
    }

    pub fn write_json<W: Write>(mut writer: W, summary: &MissionSummary) -> Result<(), ExportError> {
        to_writer_pretty(&mut writer, summary)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}
