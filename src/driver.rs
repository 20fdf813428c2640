//! The convergence loop shared by every engine.
//!
//! Each engine implements [`Scaling`]. The loop itself knows nothing about
//! kernels or potentials: it calls `step`, checks the residual against the
//! tolerance, and stops at the cap.

use crate::config::Method;
use crate::observer::{IterationRecord, Observer};
use crate::solution::{DualPotentials, Solution, Status};
use ndarray::{Array1, Array2};

/// One numeric domain of the IPFP fixed-point iteration.
pub(crate) trait Scaling {
    /// Per-iteration state. Never mutated in place: `step` returns a new one.
    type State;

    const METHOD: Method;

    fn phi(&self) -> &Array2<f64>;

    fn sigma(&self) -> f64;

    /// Cold start, or the state equivalent to `warm`.
    fn init(&self, warm: Option<&DualPotentials>) -> Self::State;

    /// One row fit followed by one column fit, and the residual.
    fn step(&self, state: &Self::State) -> (Self::State, f64);

    fn potentials(&self, state: &Self::State) -> DualPotentials;

    fn plan(&self, state: &Self::State) -> Array2<f64>;
}

/// Run `engine` until `residual <= tolerance` or `max_iterations` is reached.
///
/// A NaN residual never satisfies the tolerance, so a NaN run always ends at
/// the cap.
pub(crate) fn iterate<S: Scaling>(
    engine: &S,
    tolerance: f64,
    max_iterations: usize,
    warm: Option<&DualPotentials>,
    observer: &mut dyn Observer,
) -> Solution {
    let mut state = engine.init(warm);
    let mut record = IterationRecord {
        method: S::METHOD,
        iteration: 0,
        residual: f64::INFINITY,
    };
    let mut status = Status::MaxIterationsExceeded;

    for iter in 0..max_iterations {
        let (next, residual) = engine.step(&state);
        state = next;
        record.iteration = iter + 1;
        record.residual = residual;
        observer.observe_iter(&record);

        if residual <= tolerance {
            status = Status::Converged;
            break;
        }
    }
    observer.observe_final(status, &record);

    Solution::assemble(
        status,
        S::METHOD,
        record.iteration,
        record.residual,
        engine.potentials(&state),
        engine.plan(&state),
        engine.phi(),
        engine.sigma(),
    )
}

/// `f64::max` that keeps NaN instead of discarding it.
#[inline]
pub(crate) fn nan_max(acc: f64, x: f64) -> f64 {
    if acc.is_nan() || x.is_nan() {
        f64::NAN
    } else {
        acc.max(x)
    }
}

/// Max |next − prev| over two iterates.
///
/// Identical entries count as zero change even when infinite. Zero-mass rows
/// and columns sit at `+∞`, and `∞ − ∞` must not poison the residual.
pub(crate) fn max_abs_change(prev: &Array1<f64>, next: &Array1<f64>) -> f64 {
    prev.iter().zip(next.iter()).fold(0.0, |acc, (&a, &b)| {
        let delta = if a == b { 0.0 } else { (b - a).abs() };
        nan_max(acc, delta)
    })
}
