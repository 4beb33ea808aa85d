//! Core units, constants, and shared primitives for the Skylark workspace.

pub mod solve;

pub use solve::{NumericsError, ScalarMinimum, SearchSettings, minimize_bounded};

/// Physical constants expressed in SI units (unless stated otherwise).
pub mod constants {
    /// Standard gravity at Earth's surface (m/s²).
    pub const G0: f64 = 9.80665;
    /// Ratio of specific heats for dry air.
    pub const GAMMA_AIR: f64 = 1.4;
    /// Specific gas constant of dry air (J/(kg·K)).
    pub const R_AIR: f64 = 287.052_87;
    /// Sea-level standard pressure (Pa).
    pub const P_SEA_LEVEL: f64 = 101_325.0;
    /// Sea-level standard temperature (K).
    pub const T_SEA_LEVEL: f64 = 288.15;
    /// Mean radius of the Earth (m).
    pub const EARTH_RADIUS_M: f64 = 6_371_000.0;
}

/// Basic unit conversion helpers.
pub mod units {
    /// Convert metres to kilometres.
    #[inline]
    pub fn m_to_km(v: f64) -> f64 {
        v / 1_000.0
    }

    /// Convert feet to metres.
    #[inline]
    pub fn ft_to_m(v: f64) -> f64 {
        v * 0.3048
    }

    /// Convert degrees to radians.
    #[inline]
    pub fn deg_to_rad(v: f64) -> f64 {
        v.to_radians()
    }

    /// Convert watt-hours per kilogram to joules per kilogram.
    #[inline]
    pub fn wh_per_kg_to_j_per_kg(v: f64) -> f64 {
        v * 3_600.0
    }

    /// Convert kilowatts per kilogram to watts per kilogram.
    #[inline]
    pub fn kw_per_kg_to_w_per_kg(v: f64) -> f64 {
        v * 1_000.0
    }

    /// Convert joules to kilowatt-hours.
    #[inline]
    pub fn j_to_kwh(v: f64) -> f64 {
        v / 3.6e6
    }
}

/// Node placement along a segment's independent variable.
pub mod spacing {
    /// Distribution of nodes between two bounds.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub enum NodeSpacing {
        /// Evenly spaced nodes.
        #[default]
        Linear,
        /// Chebyshev–Lobatto nodes, clustered toward both ends.
        Cosine,
    }

    /// Unit fractions in `[0, 1]` for `count` nodes. Always starts at 0 and ends at 1.
    pub fn fractions(count: usize, spacing: NodeSpacing) -> Vec<f64> {
        match count {
            0 => Vec::new(),
            1 => vec![0.0],
            _ => {
                let last = (count - 1) as f64;
                (0..count)
                    .map(|k| {
                        let s = k as f64 / last;
                        match spacing {
                            NodeSpacing::Linear => s,
                            NodeSpacing::Cosine => 0.5 * (1.0 - (std::f64::consts::PI * s).cos()),
                        }
                    })
                    .collect()
            }
        }
    }

    /// Map the unit fractions onto `[start, end]`, pinning both endpoints exactly.
    pub fn between(start: f64, end: f64, count: usize, spacing: NodeSpacing) -> Vec<f64> {
        let mut values: Vec<f64> = fractions(count, spacing)
            .into_iter()
            .map(|s| start + (end - start) * s)
            .collect();
        if let Some(last) = values.last_mut() {
            if count > 1 {
                *last = end;
            }
        }
        values
    }

    /// Cumulative trapezoidal integral of `y` over `x`, starting from zero.
    pub fn cumulative_trapezoid(x: &[f64], y: &[f64]) -> Vec<f64> {
        let mut out = Vec::with_capacity(x.len());
        let mut acc = 0.0;
        for k in 0..x.len() {
            if k > 0 {
                acc += 0.5 * (y[k] + y[k - 1]) * (x[k] - x[k - 1]);
            }
            out.push(acc);
        }
        out
    }

    /// Finite-difference derivative dy/dx: central in the interior, one-sided at the ends.
    pub fn gradient(x: &[f64], y: &[f64]) -> Vec<f64> {
        let n = x.len();
        if n < 2 {
            return vec![0.0; n];
        }
        (0..n)
            .map(|k| {
                let (lo, hi) = match k {
                    0 => (0, 1),
                    k if k == n - 1 => (n - 2, n - 1),
                    k => (k - 1, k + 1),
                };
                let dx = x[hi] - x[lo];
                if dx.abs() < f64::EPSILON {
                    0.0
                } else {
                    (y[hi] - y[lo]) / dx
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::spacing::{self, NodeSpacing};
    use approx::assert_relative_eq;

    #[test]
    fn spacing_pins_endpoints() {
        for mode in [NodeSpacing::Linear, NodeSpacing::Cosine] {
            let nodes = spacing::between(0.0, 10_000.0, 16, mode);
            assert_eq!(nodes.len(), 16);
            assert_eq!(nodes[0], 0.0);
            assert_eq!(nodes[15], 10_000.0);
            assert!(nodes.windows(2).all(|w| w[1] > w[0]));
        }
    }

    #[test]
    fn cosine_spacing_clusters_at_the_ends() {
        let nodes = spacing::fractions(9, NodeSpacing::Cosine);
        let first_gap = nodes[1] - nodes[0];
        let middle_gap = nodes[5] - nodes[4];
        assert!(first_gap < middle_gap);
    }

    #[test]
    fn trapezoid_integrates_linear_function_exactly() {
        let x = spacing::between(0.0, 2.0, 5, NodeSpacing::Linear);
        let y: Vec<f64> = x.iter().map(|v| 3.0 * v).collect();
        let integral = spacing::cumulative_trapezoid(&x, &y);
        assert_relative_eq!(integral[4], 6.0, epsilon = 1e-12);
    }

    #[test]
    fn gradient_of_quadratic_is_exact_in_the_interior() {
        let x = spacing::between(0.0, 4.0, 5, NodeSpacing::Linear);
        let y: Vec<f64> = x.iter().map(|v| v * v).collect();
        let dy = spacing::gradient(&x, &y);
        assert_relative_eq!(dy[2], 4.0, epsilon = 1e-12);
    }
}
