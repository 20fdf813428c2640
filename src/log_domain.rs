//! IPFP on the dual potentials (u, v).
//!
//! ```text
//! u_i ← μ_i + σ·ln Σ_j exp((Φ_ij − v_j)/σ),   μ_i = −σ ln p_i
//! v_j ← ζ_j + σ·ln Σ_i exp((Φ_ij − u_i)/σ),   ζ_j = −σ ln q_j
//! ```
//!
//! The engine is generic over how `σ·ln Σ exp(·/σ)` is evaluated. [`Naive`]
//! exponentiates directly ([`Method::Log`]). [`crate::stabilized::LogSumExp`]
//! subtracts the max first ([`Method::Stabilized`]).
//!
//! With [`Naive`] and small σ, the potentials saturate at ±∞ within a couple of
//! iterations. Equal infinities do not register as a change, so the run reports
//! convergence while the plan is `exp(∞ − ∞) = NaN`.

use crate::config::Method;
use crate::driver::{max_abs_change, nan_max, Scaling};
use crate::solution::{plan_from_potentials, DualPotentials};
use ndarray::{Array1, Array2};
use std::marker::PhantomData;

/// Evaluation of the smoothed max `σ·ln Σ_k exp(x_k/σ)`.
pub(crate) trait SoftMax {
    const METHOD: Method;

    /// `σ·ln Σ_{k < len} exp(x(k)/σ)`.
    fn soft_max(sigma: f64, len: usize, x: impl FnMut(usize) -> f64) -> f64;
}

/// Direct summation of raw exponentials.
pub(crate) struct Naive;

impl SoftMax for Naive {
    const METHOD: Method = Method::Log;

    #[inline]
    fn soft_max(sigma: f64, len: usize, mut x: impl FnMut(usize) -> f64) -> f64 {
        let sum: f64 = (0..len).map(|k| (x(k) / sigma).exp()).sum();
        sigma * sum.ln()
    }
}

pub(crate) struct LogScaling<'a, R> {
    phi: &'a Array2<f64>,
    sigma: f64,
    mu: Array1<f64>,
    zeta: Array1<f64>,
    _soft_max: PhantomData<R>,
}

impl<'a, R: SoftMax> LogScaling<'a, R> {
    pub(crate) fn new(
        phi: &'a Array2<f64>,
        p: &Array1<f64>,
        q: &Array1<f64>,
        sigma: f64,
    ) -> Self {
        // Zero mass gives +∞, which pins that potential and zeroes its row/column.
        let mu = p.mapv(|x| -sigma * x.ln());
        let zeta = q.mapv(|x| -sigma * x.ln());
        Self {
            phi,
            sigma,
            mu,
            zeta,
            _soft_max: PhantomData,
        }
    }

    fn fit_rows(&self, v: &Array1<f64>) -> Array1<f64> {
        let phi = self.phi;
        let m = phi.ncols();
        Array1::from_shape_fn(phi.nrows(), |i| {
            self.mu[i] + R::soft_max(self.sigma, m, |j| phi[[i, j]] - v[j])
        })
    }

    fn fit_cols(&self, u: &Array1<f64>) -> Array1<f64> {
        let phi = self.phi;
        let n = phi.nrows();
        Array1::from_shape_fn(phi.ncols(), |j| {
            self.zeta[j] + R::soft_max(self.sigma, n, |i| phi[[i, j]] - u[i])
        })
    }
}

impl<R: SoftMax> Scaling for LogScaling<'_, R> {
    type State = DualPotentials;
    const METHOD: Method = R::METHOD;

    fn phi(&self) -> &Array2<f64> {
        self.phi
    }

    fn sigma(&self) -> f64 {
        self.sigma
    }

    fn init(&self, warm: Option<&DualPotentials>) -> DualPotentials {
        match warm {
            Some(w) => w.clone(),
            None => DualPotentials::zeros(self.phi.nrows(), self.phi.ncols()),
        }
    }

    fn step(&self, state: &DualPotentials) -> (DualPotentials, f64) {
        let u = self.fit_rows(&state.v);
        let v = self.fit_cols(&u);
        let residual = nan_max(max_abs_change(&state.u, &u), max_abs_change(&state.v, &v));
        (DualPotentials::new(u, v), residual)
    }

    fn potentials(&self, state: &DualPotentials) -> DualPotentials {
        state.clone()
    }

    fn plan(&self, state: &DualPotentials) -> Array2<f64> {
        plan_from_potentials(self.phi, state, self.sigma)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::iterate;
    use crate::solution::Status;
    use ndarray::array;

    #[test]
    fn naive_soft_max_matches_definition() {
        let xs = [0.3, -0.2, 0.9];
        let sigma = 0.5;
        let expected = sigma * xs.iter().map(|x: &f64| (x / sigma).exp()).sum::<f64>().ln();
        assert!((Naive::soft_max(sigma, 3, |k| xs[k]) - expected).abs() < 1e-12);
    }

    #[test]
    fn step_fits_row_marginals() {
        let phi = array![[0.4, 0.1, 0.7], [0.3, 0.9, 0.2]];
        let p = array![0.35, 0.65];
        let q = array![0.2, 0.3, 0.5];
        let engine = LogScaling::<Naive>::new(&phi, &p, &q, 0.5);
        let start = engine.init(None);
        let u = engine.fit_rows(&start.v);
        // Row sums of π under (u, v_old) equal p.
        let plan = plan_from_potentials(&phi, &DualPotentials::new(u, start.v.clone()), 0.5);
        for i in 0..2 {
            assert!((plan.row(i).sum() - p[i]).abs() < 1e-12);
        }
    }

    #[test]
    fn tiny_sigma_reports_converged_with_nan_plan() {
        let phi = array![[1.0, 0.0], [0.0, 1.0]];
        let p = array![0.5, 0.5];
        let engine = LogScaling::<Naive>::new(&phi, &p, &p, 1e-3);
        let sol = iterate(&engine, 1e-9, 1_000, None, &mut ());

        assert_eq!(sol.status, Status::Converged);
        assert!(sol.potentials.u.iter().all(|u| *u == f64::INFINITY));
        assert!(sol.potentials.v.iter().all(|v| *v == f64::NEG_INFINITY));
        assert!(sol.objective.is_nan());
    }
}
