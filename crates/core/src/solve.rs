//! Bounded scalar minimisation backed by argmin's Brent solver.
//!
//! Every numerical search in the workspace (fuel-cell operating point, trim angle
//! of attack) goes through [`minimize_bounded`], which caps the iteration count and
//! reports a search that ran out of iterations as an error.

use argmin::core::{CostFunction, Error, Executor, State, TerminationReason};
use argmin::solver::brent::BrentOpt;
use thiserror::Error as ThisError;

/// Iteration cap and tolerances for a bounded search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchSettings {
    pub max_iterations: u64,
    /// Relative tolerance on the abscissa.
    pub relative_tolerance: f64,
    /// Absolute tolerance on the abscissa.
    pub absolute_tolerance: f64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            relative_tolerance: f64::EPSILON.sqrt(),
            absolute_tolerance: 1e-10,
        }
    }
}

/// Location and value of the minimum found inside the bracket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalarMinimum {
    pub x: f64,
    pub value: f64,
    pub iterations: u64,
}

#[derive(Debug, ThisError)]
pub enum NumericsError {
    #[error("invalid search bracket [{lower}, {upper}]")]
    InvalidBracket { lower: f64, upper: f64 },
    #[error("bounded search did not converge within {iterations} iterations")]
    NotConverged { iterations: u64 },
    #[error("solver backend failed: {0}")]
    Backend(String),
}

struct Objective<F> {
    f: F,
}

impl<F> CostFunction for Objective<F>
where
    F: Fn(f64) -> f64,
{
    type Param = f64;
    type Output = f64;

    fn cost(&self, x: &Self::Param) -> Result<Self::Output, Error> {
        Ok((self.f)(*x))
    }
}

/// Minimise `f` over `[lower, upper]` with Brent's method.
///
/// Non-finite objective values are mapped to `f64::MAX` so the solver steers away from them.
pub fn minimize_bounded<F>(
    f: F,
    lower: f64,
    upper: f64,
    settings: SearchSettings,
) -> Result<ScalarMinimum, NumericsError>
where
    F: Fn(f64) -> f64,
{
    if !(lower.is_finite() && upper.is_finite()) || lower >= upper {
        return Err(NumericsError::InvalidBracket { lower, upper });
    }

    let objective = Objective {
        f: |x: f64| {
            let v = f(x);
            if v.is_finite() { v } else { f64::MAX }
        },
    };
    let solver = BrentOpt::new(lower, upper)
        .set_tolerance(settings.relative_tolerance, settings.absolute_tolerance);

    let result = Executor::new(objective, solver)
        .configure(|state| state.max_iters(settings.max_iterations))
        .run()
        .map_err(|err| NumericsError::Backend(err.to_string()))?;

    let state = result.state();
    let iterations = state.get_iter();
    if !matches!(
        state.get_termination_reason(),
        Some(TerminationReason::SolverConverged)
    ) {
        return Err(NumericsError::NotConverged { iterations });
    }

    let x = state
        .get_best_param()
        .copied()
        .ok_or(NumericsError::NotConverged { iterations })?;
    Ok(ScalarMinimum {
        x,
        value: f(x),
        iterations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn finds_interior_minimum_of_parabola() {
        let min = minimize_bounded(|x| (x - 1.25).powi(2) + 3.0, -4.0, 6.0, SearchSettings::default())
            .expect("parabola converges");
        assert_relative_eq!(min.x, 1.25, epsilon = 1e-6);
        assert_relative_eq!(min.value, 3.0, epsilon = 1e-10);
    }

    #[test]
    fn monotone_objective_settles_on_the_bound() {
        let min = minimize_bounded(|x| x, 2.0, 5.0, SearchSettings::default()).expect("converges");
        assert_relative_eq!(min.x, 2.0, epsilon = 1e-6);
    }

    #[test]
    fn rejects_inverted_bracket() {
        let err = minimize_bounded(|x| x * x, 1.0, -1.0, SearchSettings::default()).unwrap_err();
        assert!(matches!(err, NumericsError::InvalidBracket { .. }));
    }

    #[test]
    fn iteration_cap_is_reported() {
        let settings = SearchSettings {
            max_iterations: 2,
            ..SearchSettings::default()
        };
        let err = minimize_bounded(|x| (x - 0.3).powi(2), -10.0, 10.0, settings).unwrap_err();
        assert!(matches!(err, NumericsError::NotConverged { .. }));
    }
}
