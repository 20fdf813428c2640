//! # ipfp
//!
//! Entropic optimal transport between two finite populations, solved by the
//! Iterative Proportional Fitting Procedure (IPFP, a.k.a. Sinkhorn scaling).
//!
//! ## The Problem
//!
//! Given a surplus matrix Φ (n × m) between a population of "rows" with mass
//! `p` and a population of "columns" with mass `q`, find the coupling π that
//! maximizes the regularized surplus
//!
//! max_π Σ π_ij Φ_ij − σ Σ π_ij log π_ij
//! s.t. π1 = p, πᵀ1 = q, π ≥ 0
//!
//! The optimum has the Gibbs form π_ij = exp((Φ_ij − u_i − v_j) / σ), where
//! `u`, `v` are the dual potentials (row and column "prices"). IPFP finds them
//! by alternately fitting the row marginals and then the column marginals.
//!
//! ## Methods
//!
//! | [`Method`] | State | Valid σ | Notes |
//! |------------|-------|---------|-------|
//! | [`Method::Linear`] | scalings `a`, `b` | moderate | fastest; builds K = exp(Φ/σ) |
//! | [`Method::Log`] | potentials `u`, `v` | moderate | same fixed point, no kernel |
//! | [`Method::Stabilized`] | potentials `u`, `v` | any σ > 0 | log-sum-exp; the default |
//!
//! ## Quick Start
//!
//! ```rust
//! use ipfp::{solve, SinkhornConfig, Status};
//! use ndarray::array;
//!
//! let phi = array![[1.0, 0.0], [0.0, 1.0]];
//! let p = array![0.5, 0.5];
//! let q = array![0.5, 0.5];
//!
//! let sol = solve(&phi, &p, &q, &SinkhornConfig::new(0.1)).unwrap();
//! assert_eq!(sol.status, Status::Converged);
//! assert!(sol.plan[[0, 0]] > sol.plan[[0, 1]]);
//! ```
//!
//! ## What Can Go Wrong
//!
//! 1. **Overflow in the plain methods**: [`Method::Linear`] and [`Method::Log`]
//!    exponentiate `Φ/σ` directly. Once `max Φ / σ` exceeds ~709 the result is
//!    NaN. This is not caught: check [`Solution::is_finite`], or use
//!    [`Method::Stabilized`].
//! 2. **A "converged" NaN**: at small σ the plain log method can drive the
//!    potentials to ±∞. Successive iterates are then identical and the solve
//!    reports [`Status::Converged`] with a NaN plan.
//! 3. **Slow convergence as σ → 0**: the iteration count grows as σ shrinks.
//!    [`anneal::solve_annealed`] walks σ down geometrically with warm starts.
//! 4. **Marginal mismatch**: `p` and `q` must each sum to 1 (within
//!    [`MASS_TOLERANCE`]). Inputs are not renormalized.
//!
//! ## References
//!
//! - Deming & Stephan (1940). "On a Least Squares Adjustment of a Sampled Frequency Table"
//! - Cuturi (2013). "Sinkhorn Distances: Lightspeed Computation of Optimal Transport"
//! - Galichon (2016). "Optimal Transport Methods in Economics"
//! - Peyré & Cuturi (2019). "Computational Optimal Transport", §4.4

use ndarray::{Array1, Array2};
use thiserror::Error;

pub mod anneal;
pub mod config;
mod driver;
mod linear;
mod log_domain;
pub mod observer;
mod problem;
pub mod solution;
mod stabilized;

pub use anneal::{solve_annealed, AnnealSchedule, AnnealedSolution};
pub use config::{Method, SinkhornConfig, DEFAULT_MAX_ITERATIONS, DEFAULT_TOLERANCE};
pub use observer::{History, IterationRecord, Observer};
pub use problem::MASS_TOLERANCE;
pub use solution::{
    plan_from_potentials, regularized_objective, transport_surplus, DualPotentials, Solution,
    Status,
};

#[cfg(feature = "obs_slog")]
pub use observer::SlogObserver;

/// IPFP error variants.
///
/// Every variant except [`Error::NotConverged`] is raised by input validation,
/// before the first iteration.
#[derive(Debug, Error)]
pub enum Error {
    /// A marginal's length does not match the surplus matrix.
    #[error("{which} has length {got}, expected {expected}")]
    ShapeMismatch {
        which: &'static str,
        expected: usize,
        got: usize,
    },

    /// The surplus matrix has no rows or no columns.
    #[error("surplus matrix must be non-empty, got ({0}, {1})")]
    Empty(usize, usize),

    /// A marginal entry is negative or not finite.
    #[error("{which}[{index}] must be finite and non-negative, got {value}")]
    InvalidMass {
        which: &'static str,
        index: usize,
        value: f64,
    },

    /// A marginal does not sum to 1.0.
    #[error("{which} does not sum to 1.0 (sum = {sum})")]
    NotNormalized { which: &'static str, sum: f64 },

    /// A surplus entry is NaN or infinite.
    #[error("surplus entry ({0}, {1}) is not finite: {2}")]
    NonFiniteSurplus(usize, usize, f64),

    /// Invalid regularization parameter.
    #[error("regularization parameter must be positive and finite, got {0}")]
    InvalidRegularization(f64),

    /// Invalid convergence tolerance.
    #[error("tolerance must be positive and finite, got {0}")]
    InvalidTolerance(f64),

    /// The iteration cap must allow at least one iteration.
    #[error("max_iterations must be at least 1")]
    InvalidMaxIterations,

    /// Warm-start potentials do not match the problem shape.
    #[error("warm start has shape ({0}, {1}), expected ({2}, {3})")]
    WarmStartShape(usize, usize, usize, usize),

    /// A warm-start potential is NaN, `−∞`, or `+∞` on a row or column with mass.
    #[error("warm start {which}[{index}] must be finite (or +inf on zero mass), got {value}")]
    WarmStartNotFinite {
        which: &'static str,
        index: usize,
        value: f64,
    },

    /// Invalid annealing schedule parameter.
    #[error("annealing {field} is invalid: {value}")]
    InvalidSchedule { field: &'static str, value: f64 },

    /// The solve hit its iteration cap (see [`Solution::into_converged`]).
    #[error("{method} IPFP did not converge in {iterations} iterations (residual = {residual})")]
    NotConverged {
        method: Method,
        iterations: usize,
        residual: f64,
    },

    /// Domain error (invalid inputs for the mathematical definition).
    #[error("{0}")]
    Domain(&'static str),
}

/// Result type for IPFP operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Solve the entropic transport problem with the method named in `config`.
///
/// Cold-starts from zero potentials and reports nothing while iterating. Use
/// [`solve_with`] for warm starts or iteration observers.
///
/// # Arguments
///
/// * `phi` - Surplus matrix Φ (n × m)
/// * `p` - Row marginal (length n, sums to 1)
/// * `q` - Column marginal (length m, sums to 1)
/// * `config` - σ, tolerance, iteration cap and method
///
/// # Returns
///
/// A [`Solution`]. Hitting the iteration cap is reported through
/// [`Solution::status`] and is not an error.
///
/// # Example
///
/// ```rust
/// use ipfp::{solve, Method, SinkhornConfig};
/// use ndarray::array;
///
/// let phi = array![[0.9, 0.1, 0.4], [0.2, 0.8, 0.3]];
/// let p = array![0.5, 0.5];
/// let q = array![0.3, 0.3, 0.4];
///
/// let config = SinkhornConfig::new(0.05).with_method(Method::Stabilized);
/// let sol = solve(&phi, &p, &q, &config).unwrap();
/// assert!(sol.marginal_error(&p, &q) < 1e-6);
/// ```
pub fn solve(
    phi: &Array2<f64>,
    p: &Array1<f64>,
    q: &Array1<f64>,
    config: &SinkhornConfig,
) -> Result<Solution> {
    solve_with(phi, p, q, config, None, &mut ())
}

/// [`solve`] with an optional warm start and an iteration observer.
///
/// `warm` seeds the engine with existing potentials. Starting from a converged
/// pair returns after at most one iteration. Shifting the pair by a constant
/// (`u + c`, `v − c`) does not change this.
pub fn solve_with(
    phi: &Array2<f64>,
    p: &Array1<f64>,
    q: &Array1<f64>,
    config: &SinkhornConfig,
    warm: Option<&DualPotentials>,
    observer: &mut dyn Observer,
) -> Result<Solution> {
    config.validate()?;
    problem::validate(phi, p, q)?;
    if let Some(warm) = warm {
        problem::validate_warm_start(phi, p, q, warm)?;
    }

    let (tol, cap) = (config.tolerance, config.max_iterations);
    let solution = match config.method {
        Method::Linear => {
            let engine = linear::LinearScaling::new(phi, p, q, config.sigma);
            driver::iterate(&engine, tol, cap, warm, observer)
        }
        Method::Log => {
            let engine = log_domain::LogScaling::<log_domain::Naive>::new(phi, p, q, config.sigma);
            driver::iterate(&engine, tol, cap, warm, observer)
        }
        Method::Stabilized => {
            let engine =
                log_domain::LogScaling::<stabilized::LogSumExp>::new(phi, p, q, config.sigma);
            driver::iterate(&engine, tol, cap, warm, observer)
        }
    };
    Ok(solution)
}
