//! Per-node force balance for one segment.
//!
//! At each node the solver trims the angle of attack so lift balances the weight
//! component normal to the path, sets throttle so thrust balances drag, the weight
//! component along the path and the along-path acceleration, then draws the
//! resulting electrical power from the energy ledger.

use std::collections::BTreeMap;

use skylark_aero::{AeroError, AeroQuery};
use skylark_atmosphere::{AtmosphereError, AtmosphereModel};
use skylark_core::{NumericsError, SearchSettings, minimize_bounded};
use skylark_energy::{EnergyError, EnergyStorage, EnergyStore, EnergyWarning};
use skylark_propulsion::{Freestream, PropulsionError, WorkingFluid};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::results::{DiagnosticKind, NodeDiagnostic, SegmentResult};
use crate::segment::Segment;
use crate::vehicle::{Configuration, Vehicle};

#[derive(Debug, Error)]
pub enum SegmentError {
    #[error("segment '{segment}' is ill-defined: {reason}")]
    InvalidDefinition { segment: String, reason: String },
    #[error("node {node}: {reason}")]
    Infeasible { node: usize, reason: String },
    #[error("node {node}: storage '{storage}' exhausted ({shortfall_j:.1} J short)")]
    EnergyExhausted {
        node: usize,
        storage: String,
        shortfall_j: f64,
    },
    #[error("node {node}: propellant exhausted ({shortfall_kg:.2} kg short)")]
    PropellantExhausted { node: usize, shortfall_kg: f64 },
    #[error("node {node}: atmosphere: {source}")]
    Atmosphere {
        node: usize,
        #[source]
        source: AtmosphereError,
    },
    #[error("node {node}: aerodynamics: {source}")]
    Aerodynamics {
        node: usize,
        #[source]
        source: AeroError,
    },
    #[error("node {node}: propulsion: {source}")]
    Propulsion {
        node: usize,
        #[source]
        source: PropulsionError,
    },
    #[error("node {node}: energy storage: {source}")]
    Energy {
        node: usize,
        #[source]
        source: EnergyError,
    },
    #[error("node {node}: trim search: {source}")]
    Trim {
        node: usize,
        #[source]
        source: NumericsError,
    },
}

/// A failed segment together with the nodes solved before the failure.
#[derive(Debug)]
pub struct SegmentFailure {
    pub error: SegmentError,
    pub partial: SegmentResult,
}

/// What happens when a storage runs dry mid-mission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExhaustionPolicy {
    /// Record the exhaustion against the node, clamp the charge at zero and carry on.
    #[default]
    Continue,
    Abort,
}

#[derive(Debug, Clone, Copy)]
pub struct SolverSettings {
    pub trim: SearchSettings,
    /// Largest accepted mismatch between required and trimmed lift coefficient.
    pub lift_tolerance: f64,
    /// Throttle overshoot tolerated before a node is declared infeasible.
    pub throttle_tolerance: f64,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            trim: SearchSettings::default(),
            lift_tolerance: 1e-4,
            throttle_tolerance: 1e-9,
        }
    }
}

/// Vehicle state carried across a segment boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlightState {
    pub time_s: f64,
    pub mass_kg: f64,
    pub altitude_m: f64,
    pub distance_m: f64,
}

/// Mission-local copy of the vehicle's storages. The sequencer is its only writer.
#[derive(Debug, Clone)]
pub struct EnergyLedger {
    stores: Vec<EnergyStore>,
}

impl EnergyLedger {
    /// Fully charged copies of `stores`.
    pub fn charged(stores: &[EnergyStore]) -> Self {
        let mut stores = stores.to_vec();
        for store in &mut stores {
            store.reset();
        }
        Self { stores }
    }

    pub fn stores(&self) -> &[EnergyStore] {
        &self.stores
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.stores.iter().any(|s| s.tag() == tag)
    }

    /// Charge of every storage that holds one.
    pub fn current_energy_j(&self) -> BTreeMap<String, f64> {
        self.stores
            .iter()
            .filter_map(|s| s.current_energy_j().map(|e| (s.tag().to_string(), e)))
            .collect()
    }
}

struct NodeSolution {
    mach: f64,
    angle_of_attack_rad: f64,
    lift_coefficient: f64,
    drag_coefficient: f64,
    thrust_n: f64,
    throttle: f64,
    fuel_mass_rate_kg_s: f64,
    power_by_storage: BTreeMap<String, f64>,
    clamped_thrust_n: Option<f64>,
}

struct NodeInput {
    node: usize,
    altitude_m: f64,
    velocity_m_s: f64,
    flight_path_angle_rad: f64,
    acceleration_m_s2: f64,
    mass_kg: f64,
}

fn solve_node(
    vehicle: &Vehicle,
    configuration: &Configuration,
    atmosphere: &dyn AtmosphereModel,
    settings: &SolverSettings,
    input: &NodeInput,
) -> Result<NodeSolution, SegmentError> {
    let node = input.node;
    let infeasible = |reason: String| SegmentError::Infeasible { node, reason };

    let air = atmosphere
        .properties(input.altitude_m)
        .map_err(|source| SegmentError::Atmosphere { node, source })?;
    let v = input.velocity_m_s;
    let q = 0.5 * air.density_kg_m3 * v * v;
    if !(q > 0.0) {
        return Err(infeasible("no dynamic pressure to generate lift".into()));
    }
    let aero = vehicle.aerodynamics.as_ref();
    let area = aero.reference_area();
    let (gas_constant, ratio_of_heats) = atmosphere.gas();
    let fluid = WorkingFluid {
        gamma: ratio_of_heats,
        gas_constant,
    };
    let freestream = Freestream::from_atmosphere(&air, v, fluid)
        .map_err(|source| SegmentError::Propulsion { node, source })?;
    let mach = freestream.mach;
    let reynolds_per_m = air.density_kg_m3 * v / air.dynamic_viscosity_pa_s;
    let query = |alpha: f64| AeroQuery {
        angle_of_attack_rad: alpha,
        mach,
        dynamic_pressure_pa: q,
        reynolds_per_m,
    };

    let weight = input.mass_kg * air.gravity_m_s2;
    let gamma = input.flight_path_angle_rad;
    let cl_total = weight * gamma.cos() / (q * area);
    if let Some(cl_max) = configuration.max_lift_coefficient {
        if cl_total > cl_max {
            return Err(infeasible(format!(
                "required lift coefficient {cl_total:.3} exceeds configuration maximum {cl_max:.3}"
            )));
        }
    }
    let cl_required = cl_total - configuration.delta_cl;

    let (alpha_lo, alpha_hi) = aero.angle_of_attack_limits();
    let trim = minimize_bounded(
        |alpha| match aero.evaluate(&query(alpha)) {
            Ok(c) => (c.lift - cl_required).powi(2),
            Err(_) => f64::NAN,
        },
        alpha_lo,
        alpha_hi,
        settings.trim,
    )
    .map_err(|source| SegmentError::Trim { node, source })?;
    let coefficients = aero
        .evaluate(&query(trim.x))
        .map_err(|source| SegmentError::Aerodynamics { node, source })?;
    if (coefficients.lift - cl_required).abs() > settings.lift_tolerance {
        return Err(infeasible(format!(
            "required lift coefficient {cl_total:.3} is outside the trim range"
        )));
    }

    let cd = coefficients.drag + configuration.delta_cd;
    let drag = q * area * cd;
    let thrust_required = drag + weight * gamma.sin() + input.mass_kg * input.acceleration_m_s2;

    let mut available = 0.0;
    for propulsor in &vehicle.propulsors {
        available += propulsor
            .evaluate(&freestream, 1.0)
            .map_err(|source| SegmentError::Propulsion { node, source })?
            .thrust_n;
    }
    if !(available > 0.0) {
        return Err(infeasible("propulsors deliver no thrust".into()));
    }

    let mut throttle = thrust_required / available;
    let mut clamped_thrust_n = None;
    if throttle > 1.0 + settings.throttle_tolerance {
        return Err(infeasible(format!(
            "requires {thrust_required:.1} N of thrust, {available:.1} N available"
        )));
    }
    if throttle < 0.0 {
        clamped_thrust_n = Some(thrust_required);
        throttle = 0.0;
    }
    let throttle = throttle.min(1.0);

    let mut thrust = 0.0;
    let mut fuel = 0.0;
    let mut power_by_storage = BTreeMap::new();
    for propulsor in &vehicle.propulsors {
        let out = propulsor
            .evaluate(&freestream, throttle)
            .map_err(|source| SegmentError::Propulsion { node, source })?;
        thrust += out.thrust_n;
        fuel += out.fuel_mass_rate_kg_s;
        if let Some(storage) = out.storage {
            *power_by_storage.entry(storage).or_insert(0.0) += out.electric_power_w;
        }
    }

    debug!(
        node,
        altitude = input.altitude_m,
        velocity = v,
        alpha_deg = trim.x.to_degrees(),
        throttle,
        thrust,
        "node trimmed"
    );

    Ok(NodeSolution {
        mach,
        angle_of_attack_rad: trim.x,
        lift_coefficient: coefficients.lift + configuration.delta_cl,
        drag_coefficient: cd,
        thrust_n: thrust,
        throttle,
        fuel_mass_rate_kg_s: fuel,
        power_by_storage,
        clamped_thrust_n,
    })
}

/// Solve every node of `segment`, starting from `initial` and drawing on `ledger`.
///
/// Node 0 repeats the previous terminal state. Propellant flow and storage draws
/// are both integrated as left rectangles: the rates solved at node k are held
/// over the interval to node k+1, and the mass and charge recorded at a node are
/// the values before its own draw. The last node of a segment holds for no time.
/// Propellant is burned down to `min_flight_kg` and no further.
pub fn solve_segment(
    vehicle: &Vehicle,
    segment: &Segment,
    configuration: &Configuration,
    initial: FlightState,
    ledger: &mut EnergyLedger,
    policy: ExhaustionPolicy,
    settings: &SolverSettings,
) -> Result<(SegmentResult, FlightState), SegmentFailure> {
    let mut result = SegmentResult::new(&segment.tag, segment.kind.name());
    let profile = match segment.profile(initial.altitude_m) {
        Ok(p) => p,
        Err(error) => return Err(SegmentFailure { error, partial: result }),
    };
    info!(segment = %segment.tag, kind = segment.kind.name(), nodes = profile.len(), "solving segment");

    let mut mass = initial.mass_kg;
    for k in 0..profile.len() {
        let dt = if k + 1 < profile.len() {
            profile.time_s[k + 1] - profile.time_s[k]
        } else {
            0.0
        };

        let input = NodeInput {
            node: k,
            altitude_m: profile.altitude_m[k],
            velocity_m_s: profile.velocity_m_s[k],
            flight_path_angle_rad: profile.flight_path_angle_rad[k],
            acceleration_m_s2: profile.acceleration_m_s2[k],
            mass_kg: mass,
        };
        let solution = match solve_node(vehicle, configuration, segment.atmosphere.as_ref(), settings, &input) {
            Ok(s) => s,
            Err(error) => return Err(SegmentFailure { error, partial: result }),
        };

        let energy = ledger.current_energy_j();
        let mut mass_rate = solution.fuel_mass_rate_kg_s;
        let mut delivered_power = 0.0;
        let mut exhausted = None;
        for store in &mut ledger.stores {
            let power = solution
                .power_by_storage
                .get(store.tag())
                .copied()
                .unwrap_or(0.0);
            if power <= 0.0 {
                continue;
            }
            let draw = match store.discharge(power, dt) {
                Ok(d) => d,
                Err(source) => {
                    return Err(SegmentFailure {
                        error: SegmentError::Energy { node: k, source },
                        partial: result,
                    });
                }
            };
            mass_rate += draw.mass_rate_kg_s;
            delivered_power += draw.delivered_power_w;
            for warning in draw.warnings {
                warn!(segment = %segment.tag, node = k, "{warning}");
                if let EnergyWarning::EnergyExhausted { storage, shortfall_j } = &warning {
                    if exhausted.is_none() {
                        exhausted = Some(SegmentError::EnergyExhausted {
                            node: k,
                            storage: storage.clone(),
                            shortfall_j: *shortfall_j,
                        });
                    }
                }
                result.diagnostics.push(NodeDiagnostic {
                    node: k,
                    kind: DiagnosticKind::Energy(warning),
                });
            }
        }
        if let Some(required) = solution.clamped_thrust_n {
            let diagnostic = NodeDiagnostic {
                node: k,
                kind: DiagnosticKind::ThrustClamped {
                    required_thrust_n: required,
                },
            };
            warn!(segment = %segment.tag, "{diagnostic}");
            result.diagnostics.push(diagnostic);
        }

        let burned = mass_rate * dt;
        let on_board = (mass - vehicle.mass.min_flight_kg).max(0.0);
        let next_mass = if burned > on_board {
            let shortfall_kg = burned - on_board;
            let diagnostic = NodeDiagnostic {
                node: k,
                kind: DiagnosticKind::PropellantExhausted { shortfall_kg },
            };
            warn!(segment = %segment.tag, "{diagnostic}");
            result.diagnostics.push(diagnostic);
            if exhausted.is_none() {
                exhausted = Some(SegmentError::PropellantExhausted { node: k, shortfall_kg });
            }
            vehicle.mass.min_flight_kg.min(mass)
        } else {
            mass - burned
        };

        result.time_s.push(initial.time_s + profile.time_s[k]);
        result.altitude_m.push(profile.altitude_m[k]);
        result.distance_m.push(initial.distance_m + profile.distance_m[k]);
        result.velocity_m_s.push(profile.velocity_m_s[k]);
        result.mach.push(solution.mach);
        result.flight_path_angle_rad.push(profile.flight_path_angle_rad[k]);
        result.angle_of_attack_rad.push(solution.angle_of_attack_rad);
        result.lift_coefficient.push(solution.lift_coefficient);
        result.drag_coefficient.push(solution.drag_coefficient);
        result.thrust_n.push(solution.thrust_n);
        result.throttle.push(solution.throttle);
        result.mass_kg.push(mass);
        result.fuel_mass_rate_kg_s.push(mass_rate);
        result.electric_power_w.push(delivered_power);
        result.energy_remaining_j.push(energy.values().sum());
        for (tag, value) in energy {
            result.storage_energy_j.entry(tag).or_default().push(value);
        }

        if let (ExhaustionPolicy::Abort, Some(error)) = (policy, exhausted) {
            return Err(SegmentFailure { error, partial: result });
        }
        mass = next_mass;
    }

    let last = profile.len() - 1;
    let terminal = FlightState {
        time_s: initial.time_s + profile.time_s[last],
        mass_kg: mass,
        altitude_m: profile.altitude_m[last],
        distance_m: initial.distance_m + profile.distance_m[last],
    };
    info!(
        segment = %segment.tag,
        end_time_s = terminal.time_s,
        end_mass_kg = terminal.mass_kg,
        diagnostics = result.diagnostics.len(),
        "segment complete"
    );
    Ok((result, terminal))
}
