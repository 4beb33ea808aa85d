//! Conceptual-design mission performance for fixed-wing aircraft.
//!
//! The member crates carry the physics; this crate stitches them together so
//! front-ends (the CLI, notebooks, tests) can depend on a single package.

pub use skylark_aero as aero;
pub use skylark_atmosphere as atmosphere;
pub use skylark_config as config;
pub use skylark_core::{constants, solve, spacing, units};
pub use skylark_energy as energy;
pub use skylark_export as export;
pub use skylark_mission as mission;
pub use skylark_propulsion as propulsion;

pub use skylark_mission::vehicle;

/// Returns the version of the library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
