//! Solver configuration.
//!
//! The tolerance and iteration cap are explicit fields of [`SinkhornConfig`], so
//! two solves in one process never share hidden settings.

use crate::{Error, Result};
use std::fmt;

/// Default convergence tolerance on the per-iteration residual.
pub const DEFAULT_TOLERANCE: f64 = 1e-9;

/// Default iteration cap.
pub const DEFAULT_MAX_ITERATIONS: usize = 1_000_000;

/// Numeric domain the IPFP iteration runs in.
///
/// All three reach the same fixed point when they stay finite. They differ
/// in speed and in how small σ can go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum Method {
    /// Multiplicative scalings `a = exp(-u/σ)`, `b = exp(-v/σ)` over the
    /// kernel `K = exp(Φ/σ)`.
    ///
    /// Overflows once `max Φ / σ` exceeds the `f64` exponent range.
    Linear,
    /// Potentials `u`, `v` with a direct `σ·ln Σ exp(·/σ)`.
    ///
    /// Overflows for the same inputs as [`Method::Linear`].
    Log,
    /// Potentials `u`, `v` with the max subtracted before every exponential.
    #[default]
    Stabilized,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Method::Linear => "linear",
            Method::Log => "log",
            Method::Stabilized => "stabilized",
        };
        f.write_str(name)
    }
}

fn default_tolerance() -> f64 {
    DEFAULT_TOLERANCE
}

fn default_max_iterations() -> usize {
    DEFAULT_MAX_ITERATIONS
}

/// Configuration for one IPFP solve.
///
/// With the `serde` feature, only `sigma` is required when deserializing:
///
/// ```json
/// { "sigma": 0.01, "method": "stabilized", "tolerance": 1e-9 }
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SinkhornConfig {
    /// Entropic regularization σ > 0. Smaller is closer to the exact assignment.
    pub sigma: f64,
    /// Convergence threshold on the engine's residual.
    ///
    /// For [`Method::Linear`] the residual is the max relative column-marginal
    /// violation. For the log methods it is the max change in the potentials.
    #[cfg_attr(feature = "serde", serde(default = "default_tolerance"))]
    pub tolerance: f64,
    /// Iteration cap; reaching it yields [`crate::Status::MaxIterationsExceeded`].
    #[cfg_attr(feature = "serde", serde(default = "default_max_iterations"))]
    pub max_iterations: usize,
    /// Numeric domain.
    #[cfg_attr(feature = "serde", serde(default))]
    pub method: Method,
}

impl SinkhornConfig {
    /// Default tolerance, iteration cap and [`Method::Stabilized`] at the given σ.
    pub fn new(sigma: f64) -> Self {
        Self {
            sigma,
            tolerance: default_tolerance(),
            max_iterations: default_max_iterations(),
            method: Method::default(),
        }
    }

    pub fn with_sigma(mut self, sigma: f64) -> Self {
        self.sigma = sigma;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Check σ, tolerance and the iteration cap.
    pub fn validate(&self) -> Result<()> {
        if !(self.sigma > 0.0) || !self.sigma.is_finite() {
            return Err(Error::InvalidRegularization(self.sigma));
        }
        if !(self.tolerance > 0.0) || !self.tolerance.is_finite() {
            return Err(Error::InvalidTolerance(self.tolerance));
        }
        if self.max_iterations == 0 {
            return Err(Error::InvalidMaxIterations);
        }
        Ok(())
    }
}
