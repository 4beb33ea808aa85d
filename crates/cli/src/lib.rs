//! Shared plumbing for the Skylark binaries.

use tracing_subscriber::{EnvFilter, fmt};

/// Install a compact console subscriber. `RUST_LOG` takes precedence over `level`.
pub fn init_logging(level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .try_init()
        .map_err(|err| anyhow::anyhow!("failed to install log subscriber: {err}"))
}

/// Render seconds as `Hh MMm SSs`.
pub fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;
    let hours = total / 3_600;
    let minutes = (total % 3_600) / 60;
    let secs = total % 60;
    format!("{hours}h {minutes:02}m {secs:02}s")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_are_split_into_hours_minutes_seconds() {
        assert_eq!(format_duration(3_725.4), "1h 02m 05s");
        assert_eq!(format_duration(-5.0), "0h 00m 00s");
    }
}
