//! σ-annealing: solve at a decreasing sequence of σ with warm starts.
//!
//! Small σ needs many iterations from a cold start. A geometric schedule
//! σ_k = start · factor^k, ending exactly at the target σ, hands each stage
//! the previous stage's potentials. Every stage runs [`Method::Stabilized`]
//! with the configured tolerance and iteration cap.

use crate::config::{Method, SinkhornConfig};
use crate::observer::Observer;
use crate::solution::{DualPotentials, Solution, Status};
use crate::{problem, solve_with, Error, Result};
use ndarray::{Array1, Array2};

/// Geometric σ schedule.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AnnealSchedule {
    /// First σ. If it is not above the target, the schedule is the target alone.
    pub start_sigma: f64,
    /// Ratio between consecutive stages, in `(0, 1)`.
    pub factor: f64,
}

impl Default for AnnealSchedule {
    fn default() -> Self {
        Self {
            start_sigma: 1.0,
            factor: 0.5,
        }
    }
}

impl AnnealSchedule {
    pub fn new(start_sigma: f64, factor: f64) -> Self {
        Self {
            start_sigma,
            factor,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.start_sigma > 0.0) || !self.start_sigma.is_finite() {
            return Err(Error::InvalidSchedule {
                field: "start_sigma",
                value: self.start_sigma,
            });
        }
        if !(self.factor > 0.0 && self.factor < 1.0) {
            return Err(Error::InvalidSchedule {
                field: "factor",
                value: self.factor,
            });
        }
        Ok(())
    }

    /// Stage σ values ending at `target`: every `start · factor^k > target`, then `target`.
    pub fn sigmas(&self, target: f64) -> Vec<f64> {
        let mut out = Vec::new();
        let mut sigma = self.start_sigma;
        while sigma > target {
            out.push(sigma);
            sigma *= self.factor;
        }
        out.push(target);
        out
    }
}

/// Outcome of one annealing stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageReport {
    pub sigma: f64,
    pub iterations: usize,
    pub status: Status,
}

/// Final solution plus the per-stage trace.
#[derive(Debug, Clone)]
pub struct AnnealedSolution {
    /// Solution at the target σ (`config.sigma`).
    pub solution: Solution,
    pub stages: Vec<StageReport>,
}

impl AnnealedSolution {
    pub fn total_iterations(&self) -> usize {
        self.stages.iter().map(|s| s.iterations).sum()
    }
}

/// Solve at `config.sigma` by annealing from `schedule.start_sigma`.
///
/// `config.method` is ignored: every stage uses [`Method::Stabilized`]. A stage
/// that hits the cap does not abort the schedule. Its potentials still seed
/// the next stage, and its status is recorded in [`AnnealedSolution::stages`].
///
/// # Example
///
/// ```rust
/// use ipfp::{solve_annealed, AnnealSchedule, SinkhornConfig};
/// use ndarray::array;
///
/// let phi = array![[0.9, 0.1], [0.3, 0.8]];
/// let p = array![0.45, 0.55];
/// let q = array![0.5, 0.5];
///
/// let config = SinkhornConfig::new(1e-3);
/// let out = solve_annealed(&phi, &p, &q, &config, &AnnealSchedule::default()).unwrap();
/// assert_eq!(out.stages.last().unwrap().sigma, 1e-3);
/// assert!(out.solution.converged());
/// ```
pub fn solve_annealed(
    phi: &Array2<f64>,
    p: &Array1<f64>,
    q: &Array1<f64>,
    config: &SinkhornConfig,
    schedule: &AnnealSchedule,
) -> Result<AnnealedSolution> {
    solve_annealed_with(phi, p, q, config, schedule, &mut ())
}

/// [`solve_annealed`] with an observer that sees every stage's iterations.
pub fn solve_annealed_with(
    phi: &Array2<f64>,
    p: &Array1<f64>,
    q: &Array1<f64>,
    config: &SinkhornConfig,
    schedule: &AnnealSchedule,
    observer: &mut dyn Observer,
) -> Result<AnnealedSolution> {
    config.validate()?;
    schedule.validate()?;
    problem::validate(phi, p, q)?;

    let base = config.with_method(Method::Stabilized);
    let mut warm: Option<DualPotentials> = None;
    let mut stages = Vec::new();
    let mut last = None;

    for sigma in schedule.sigmas(config.sigma) {
        let stage = solve_with(phi, p, q, &base.with_sigma(sigma), warm.as_ref(), observer)?;
        stages.push(StageReport {
            sigma,
            iterations: stage.iterations,
            status: stage.status,
        });
        warm = Some(stage.potentials.clone());
        last = Some(stage);
    }

    let solution = last.ok_or(Error::Domain("annealing schedule produced no stages"))?;
    Ok(AnnealedSolution { solution, stages })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solve;
    use ndarray::array;

    #[test]
    fn schedule_ends_exactly_at_target() {
        let s = AnnealSchedule::new(1.0, 0.5);
        assert_eq!(s.sigmas(0.1), vec![1.0, 0.5, 0.25, 0.125, 0.1]);
    }

    #[test]
    fn start_at_or_below_target_is_a_single_stage() {
        let s = AnnealSchedule::new(0.05, 0.5);
        assert_eq!(s.sigmas(0.1), vec![0.1]);
        assert_eq!(AnnealSchedule::new(0.1, 0.5).sigmas(0.1), vec![0.1]);
    }

    #[test]
    fn rejects_bad_factor_and_start() {
        for factor in [0.0, 1.0, 1.5, -0.5, f64::NAN] {
            let err = AnnealSchedule::new(1.0, factor).validate().unwrap_err();
            assert!(matches!(err, Error::InvalidSchedule { field: "factor", .. }));
        }
        let err = AnnealSchedule::new(0.0, 0.5).validate().unwrap_err();
        assert!(matches!(err, Error::InvalidSchedule { field: "start_sigma", .. }));
    }

    #[test]
    fn annealed_matches_direct_solve() {
        let phi = array![[0.6, 0.2, 0.9], [1.0, 0.4, 0.3], [0.3, 0.8, 0.5]];
        let p = array![0.27, 0.31, 0.42];
        let q = array![0.233, 0.351, 0.416];
        let config = SinkhornConfig::new(0.02);

        let direct = solve(&phi, &p, &q, &config).unwrap();
        let annealed = solve_annealed(&phi, &p, &q, &config, &AnnealSchedule::new(1.0, 0.3)).unwrap();

        assert!(annealed.solution.converged());
        assert_eq!(annealed.solution.method, Method::Stabilized);
        assert_eq!(annealed.stages.len(), 5);
        assert!(annealed.total_iterations() >= annealed.solution.iterations);
        for (a, b) in direct.plan.iter().zip(annealed.solution.plan.iter()) {
            assert!((a - b).abs() < 1e-6, "direct={a} annealed={b}");
        }
    }

    #[test]
    fn method_in_config_is_overridden() {
        let phi = array![[1.0, 0.0], [0.0, 1.0]];
        let p = array![0.5, 0.5];
        let config = SinkhornConfig::new(1e-3).with_method(Method::Linear);
        let out = solve_annealed(&phi, &p, &p, &config, &AnnealSchedule::default()).unwrap();
        assert!(out.solution.is_finite());
        assert_eq!(out.solution.method, Method::Stabilized);
    }
}
