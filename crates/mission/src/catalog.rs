//! Conversion of mission records into runtime missions.

use std::sync::Arc;

use skylark_atmosphere::{AtmosphereError, AtmosphereModel, ExponentialAtmosphere, Planet, UsStandard1976};
use skylark_config::{
    AirportConfig, AtmosphereConfig, ExhaustionPolicyConfig, MissionConfig, SegmentConfig,
    SegmentKindConfig, SpacingConfig,
};
use skylark_core::spacing::NodeSpacing;
use skylark_core::units::deg_to_rad;
use thiserror::Error;

use crate::performance::Airport;
use crate::segment::{Segment, SegmentKind};
use crate::sequencer::{Mission, MissionSettings};
use crate::solver::ExhaustionPolicy;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("mission '{0}' not found in catalog")]
    NotFound(String),
    #[error("mission catalog is empty")]
    EmptyCatalog,
    #[error("mission atmosphere: {0}")]
    Atmosphere(#[from] AtmosphereError),
}

pub fn atmosphere_from_config(config: &AtmosphereConfig) -> Result<Arc<dyn AtmosphereModel>, CatalogError> {
    let model: Arc<dyn AtmosphereModel> = match *config {
        AtmosphereConfig::UsStandard1976 { delta_isa_k } => {
            Arc::new(UsStandard1976::new().with_delta_isa(delta_isa_k))
        }
        AtmosphereConfig::Exponential {
            surface_density_kg_m3,
            scale_height_m,
            temperature_k,
        } => Arc::new(ExponentialAtmosphere::new(
            Planet::earth(),
            surface_density_kg_m3,
            scale_height_m,
            temperature_k,
        )?),
    };
    Ok(model)
}

fn spacing(config: SpacingConfig) -> NodeSpacing {
    match config {
        SpacingConfig::Linear => NodeSpacing::Linear,
        SpacingConfig::Cosine => NodeSpacing::Cosine,
    }
}

fn segment_kind(config: SegmentKindConfig) -> SegmentKind {
    match config {
        SegmentKindConfig::ClimbConstantMach {
            altitude_start_m,
            altitude_end_m,
            mach,
            climb_angle_deg,
        } => SegmentKind::ClimbConstantMach {
            altitude_start_m,
            altitude_end_m,
            mach,
            climb_angle_rad: deg_to_rad(climb_angle_deg),
        },
        SegmentKindConfig::ClimbConstantSpeedConstantRate {
            altitude_start_m,
            altitude_end_m,
            airspeed_m_s,
            climb_rate_m_s,
        } => SegmentKind::ClimbConstantSpeedConstantRate {
            altitude_start_m,
            altitude_end_m,
            airspeed_m_s,
            climb_rate_m_s,
        },
        SegmentKindConfig::CruiseConstantSpeedConstantAltitude {
            altitude_m,
            airspeed_m_s,
            distance_m,
        } => SegmentKind::CruiseConstantSpeedConstantAltitude {
            altitude_m,
            airspeed_m_s,
            distance_m,
        },
        SegmentKindConfig::CruiseConstantMachConstantAltitude {
            altitude_m,
            mach,
            distance_m,
        } => SegmentKind::CruiseConstantMachConstantAltitude {
            altitude_m,
            mach,
            distance_m,
        },
        SegmentKindConfig::DescentConstantSpeedConstantRate {
            altitude_start_m,
            altitude_end_m,
            airspeed_m_s,
            descent_rate_m_s,
        } => SegmentKind::DescentConstantSpeedConstantRate {
            altitude_start_m,
            altitude_end_m,
            airspeed_m_s,
            descent_rate_m_s,
        },
    }
}

fn segment_from_config(
    config: &SegmentConfig,
    defaults: &MissionConfig,
    atmosphere: &Arc<dyn AtmosphereModel>,
) -> Segment {
    let mut segment = Segment::new(&config.tag, segment_kind(config.kind), Arc::clone(atmosphere))
        .with_nodes(config.nodes.unwrap_or(defaults.settings.nodes))
        .with_spacing(spacing(config.spacing.unwrap_or(defaults.settings.spacing)));
    if let Some(name) = &config.configuration {
        segment = segment.with_configuration(name);
    }
    segment
}

/// Convert a `MissionConfig` into a runnable `Mission`. All segments share one atmosphere.
pub fn mission_from_config(config: &MissionConfig) -> Result<Mission, CatalogError> {
    let atmosphere = atmosphere_from_config(&config.atmosphere)?;
    let settings = MissionSettings {
        exhaustion_policy: match config.settings.exhaustion_policy {
            ExhaustionPolicyConfig::Continue => ExhaustionPolicy::Continue,
            ExhaustionPolicyConfig::Abort => ExhaustionPolicy::Abort,
        },
        initial_mass_kg: config.settings.initial_mass_kg,
        ..MissionSettings::default()
    };
    let segments = config
        .segments
        .iter()
        .map(|s| segment_from_config(s, config, &atmosphere))
        .collect();
    Ok(Mission {
        tag: config.name.clone(),
        segments,
        settings,
    })
}

/// Pick a mission record by optional name, defaulting to the first entry.
pub fn select_mission<'a>(
    configs: &'a [MissionConfig],
    requested: Option<&str>,
) -> Result<&'a MissionConfig, CatalogError> {
    let first = configs.first().ok_or(CatalogError::EmptyCatalog)?;
    match requested {
        Some(name) => configs
            .iter()
            .find(|cfg| cfg.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| CatalogError::NotFound(name.to_string())),
        None => Ok(first),
    }
}

pub fn airport_from_config(config: &AirportConfig) -> Airport {
    Airport {
        altitude_m: config.altitude_m,
        delta_isa_k: config.delta_isa_k,
    }
}
