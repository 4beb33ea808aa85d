//! Vehicle assembly, segment solving, and mission sequencing.
//!
//! A [`Mission`] is an ordered list of [`Segment`]s. [`evaluate_mission`] flies
//! them in order with a [`Vehicle`], solving a quasi-steady force balance at
//! every node and drawing on a mission-local copy of the vehicle's storages.

pub mod catalog;
pub mod performance;
pub mod results;
pub mod segment;
pub mod sequencer;
pub mod solver;
pub mod vehicle;

pub use catalog::{CatalogError, airport_from_config, mission_from_config, select_mission};
pub use performance::{Airport, PerformanceError, TakeoffEstimate, estimate_takeoff_field_length};
pub use results::{DiagnosticKind, MissionResult, NodeDiagnostic, SegmentResult};
pub use segment::{Profile, Segment, SegmentKind};
pub use sequencer::{Mission, MissionError, MissionSettings, evaluate_mission};
pub use solver::{ExhaustionPolicy, FlightState, SegmentError, SolverSettings};
pub use vehicle::{Configuration, MassProperties, Vehicle, VehicleError};
