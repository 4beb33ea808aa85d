//! Per-node segment tables and the mission-level aggregate.

use std::collections::BTreeMap;
use std::fmt;

use skylark_energy::EnergyWarning;

/// Condition recorded against a node without stopping the segment.
#[derive(Debug, Clone, PartialEq)]
pub enum DiagnosticKind {
    Energy(EnergyWarning),
    /// Required thrust was negative; throttle was held at zero.
    ThrustClamped { required_thrust_n: f64 },
    /// Fuel flow would have taken the vehicle below its minimum flight mass.
    PropellantExhausted { shortfall_kg: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeDiagnostic {
    pub node: usize,
    pub kind: DiagnosticKind,
}

impl fmt::Display for NodeDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            DiagnosticKind::Energy(w) => write!(f, "node {}: {}", self.node, w),
            DiagnosticKind::ThrustClamped { required_thrust_n } => write!(
                f,
                "node {}: required thrust {:.1} N below zero, throttle held at 0",
                self.node, required_thrust_n
            ),
            DiagnosticKind::PropellantExhausted { shortfall_kg } => write!(
                f,
                "node {}: propellant exhausted, {:.2} kg short",
                self.node, shortfall_kg
            ),
        }
    }
}

/// Time-ordered table of node states for one segment.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SegmentResult {
    pub tag: String,
    pub kind: String,
    pub time_s: Vec<f64>,
    pub altitude_m: Vec<f64>,
    pub distance_m: Vec<f64>,
    pub velocity_m_s: Vec<f64>,
    pub mach: Vec<f64>,
    pub flight_path_angle_rad: Vec<f64>,
    pub angle_of_attack_rad: Vec<f64>,
    pub lift_coefficient: Vec<f64>,
    pub drag_coefficient: Vec<f64>,
    pub thrust_n: Vec<f64>,
    pub throttle: Vec<f64>,
    pub mass_kg: Vec<f64>,
    pub fuel_mass_rate_kg_s: Vec<f64>,
    pub electric_power_w: Vec<f64>,
    /// Sum over storages that hold a charge.
    pub energy_remaining_j: Vec<f64>,
    pub storage_energy_j: BTreeMap<String, Vec<f64>>,
    pub diagnostics: Vec<NodeDiagnostic>,
}

impl SegmentResult {
    pub fn new(tag: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            kind: kind.into(),
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.time_s.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time_s.is_empty()
    }

    /// Named scalar columns in a stable order, suitable for tabular export.
    pub fn columns(&self) -> Vec<(&'static str, &[f64])> {
        vec![
            ("time_s", self.time_s.as_slice()),
            ("altitude_m", self.altitude_m.as_slice()),
            ("distance_m", self.distance_m.as_slice()),
            ("velocity_m_s", self.velocity_m_s.as_slice()),
            ("mach", self.mach.as_slice()),
            ("flight_path_angle_rad", self.flight_path_angle_rad.as_slice()),
            ("angle_of_attack_rad", self.angle_of_attack_rad.as_slice()),
            ("lift_coefficient", self.lift_coefficient.as_slice()),
            ("drag_coefficient", self.drag_coefficient.as_slice()),
            ("thrust_n", self.thrust_n.as_slice()),
            ("throttle", self.throttle.as_slice()),
            ("mass_kg", self.mass_kg.as_slice()),
            ("fuel_mass_rate_kg_s", self.fuel_mass_rate_kg_s.as_slice()),
            ("electric_power_w", self.electric_power_w.as_slice()),
            ("energy_remaining_j", self.energy_remaining_j.as_slice()),
        ]
    }

    pub fn first_time(&self) -> Option<f64> {
        self.time_s.first().copied()
    }

    pub fn last_time(&self) -> Option<f64> {
        self.time_s.last().copied()
    }

    pub fn duration_s(&self) -> f64 {
        match (self.first_time(), self.last_time()) {
            (Some(a), Some(b)) => b - a,
            _ => 0.0,
        }
    }
}

/// Ordered segment tables of one mission evaluation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MissionResult {
    pub vehicle: String,
    pub mission: String,
    /// Charge of each storage at mission start.
    pub initial_energy_j: BTreeMap<String, f64>,
    pub initial_mass_kg: f64,
    pub segments: Vec<SegmentResult>,
}

impl MissionResult {
    pub fn segment(&self, tag: &str) -> Option<&SegmentResult> {
        self.segments.iter().find(|s| s.tag == tag)
    }

    pub fn node_count(&self) -> usize {
        self.segments.iter().map(SegmentResult::len).sum()
    }

    pub fn duration_s(&self) -> f64 {
        self.segments
            .last()
            .and_then(SegmentResult::last_time)
            .unwrap_or(0.0)
    }

    pub fn ground_distance_m(&self) -> f64 {
        self.segments
            .last()
            .and_then(|s| s.distance_m.last().copied())
            .unwrap_or(0.0)
    }

    pub fn final_mass_kg(&self) -> f64 {
        self.segments
            .last()
            .and_then(|s| s.mass_kg.last().copied())
            .unwrap_or(self.initial_mass_kg)
    }

    /// Propellant mass burned (kerosene and hydrogen).
    pub fn fuel_burned_kg(&self) -> f64 {
        self.initial_mass_kg - self.final_mass_kg()
    }

    pub fn final_energy_j(&self) -> BTreeMap<String, f64> {
        let mut energy = self.initial_energy_j.clone();
        for segment in &self.segments {
            for (tag, column) in &segment.storage_energy_j {
                if let Some(last) = column.last() {
                    energy.insert(tag.clone(), *last);
                }
            }
        }
        energy
    }

    pub fn energy_consumed_j(&self) -> BTreeMap<String, f64> {
        let finals = self.final_energy_j();
        self.initial_energy_j
            .iter()
            .map(|(tag, initial)| (tag.clone(), initial - finals.get(tag).copied().unwrap_or(*initial)))
            .collect()
    }

    pub fn total_energy_consumed_j(&self) -> f64 {
        self.energy_consumed_j().values().sum()
    }

    pub fn diagnostics(&self) -> impl Iterator<Item = (&str, &NodeDiagnostic)> {
        self.segments
            .iter()
            .flat_map(|s| s.diagnostics.iter().map(move |d| (s.tag.as_str(), d)))
    }

    pub fn is_energy_exhausted(&self) -> bool {
        self.diagnostics().any(|(_, d)| {
            matches!(
                d.kind,
                DiagnosticKind::Energy(EnergyWarning::EnergyExhausted { .. })
                    | DiagnosticKind::PropellantExhausted { .. }
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(tag: &str, times: &[f64], energy: &[f64], mass: &[f64]) -> SegmentResult {
        let mut s = SegmentResult::new(tag, "cruise_constant_speed_constant_altitude");
        s.time_s = times.to_vec();
        s.mass_kg = mass.to_vec();
        s.distance_m = times.iter().map(|t| t * 10.0).collect();
        s.energy_remaining_j = energy.to_vec();
        s.storage_energy_j.insert("battery".into(), energy.to_vec());
        s
    }

    #[test]
    fn totals_come_from_terminal_nodes() {
        let result = MissionResult {
            vehicle: "v".into(),
            mission: "m".into(),
            initial_energy_j: BTreeMap::from([("battery".to_string(), 100.0)]),
            initial_mass_kg: 50.0,
            segments: vec![
                segment("a", &[0.0, 5.0], &[100.0, 80.0], &[50.0, 49.0]),
                segment("b", &[5.0, 9.0], &[80.0, 55.0], &[49.0, 48.5]),
            ],
        };
        assert_eq!(result.duration_s(), 9.0);
        assert_eq!(result.ground_distance_m(), 90.0);
        assert_eq!(result.fuel_burned_kg(), 1.5);
        assert_eq!(result.total_energy_consumed_j(), 45.0);
        assert_eq!(result.node_count(), 4);
        assert!(!result.is_energy_exhausted());
    }

    #[test]
    fn exhaustion_is_detected_from_diagnostics() {
        let mut s = segment("a", &[0.0, 1.0], &[1.0, 0.0], &[1.0, 1.0]);
        s.diagnostics.push(NodeDiagnostic {
            node: 1,
            kind: DiagnosticKind::Energy(EnergyWarning::EnergyExhausted {
                storage: "battery".into(),
                shortfall_j: 3.0,
            }),
        });
        let result = MissionResult {
            segments: vec![s],
            ..MissionResult::default()
        };
        assert!(result.is_energy_exhausted());
        assert!(result.diagnostics().next().unwrap().1.to_string().starts_with("node 1"));
    }

    #[test]
    fn running_out_of_propellant_counts_as_exhaustion() {
        let mut s = segment("a", &[0.0, 1.0], &[], &[10.0, 8.0]);
        s.diagnostics.push(NodeDiagnostic {
            node: 0,
            kind: DiagnosticKind::PropellantExhausted { shortfall_kg: 0.25 },
        });
        let result = MissionResult {
            segments: vec![s],
            ..MissionResult::default()
        };
        assert!(result.is_energy_exhausted());
        assert_eq!(
            result.diagnostics().next().unwrap().1.to_string(),
            "node 0: propellant exhausted, 0.25 kg short"
        );
    }
}
