//! IPFP in the linear (multiplicative) domain.
//!
//! State is the pair of scalings `a = exp(-u/σ)`, `b = exp(-v/σ)` over the
//! kernel `K = exp(Φ/σ)`, with π = diag(a) K diag(b). Each iteration:
//!
//! 1. `a ← p / (K b)`
//! 2. residual = max_j |(Kᵀa)_j b_j / q_j − 1|
//! 3. `b ← q / (Kᵀ a)`
//!
//! This is the cheapest iteration, and the kernel is only valid while
//! `max Φ / σ` fits in an `f64` exponent. Past that K holds `+∞`, `0 · ∞`
//! shows up in the products, and NaN flows into the result unchecked.

use crate::config::Method;
use crate::driver::{nan_max, Scaling};
use crate::solution::DualPotentials;
use ndarray::{Array1, Array2, Zip};

/// Scaling vectors of the linear domain.
#[derive(Debug, Clone)]
pub(crate) struct ScalingFactors {
    a: Array1<f64>,
    b: Array1<f64>,
}

pub(crate) struct LinearScaling<'a> {
    phi: &'a Array2<f64>,
    p: &'a Array1<f64>,
    q: &'a Array1<f64>,
    sigma: f64,
    kernel: Array2<f64>,
}

impl<'a> LinearScaling<'a> {
    pub(crate) fn new(
        phi: &'a Array2<f64>,
        p: &'a Array1<f64>,
        q: &'a Array1<f64>,
        sigma: f64,
    ) -> Self {
        // K = exp(Φ / σ); overflows to +∞ for small σ.
        let kernel = phi.mapv(|f| (f / sigma).exp());
        Self {
            phi,
            p,
            q,
            sigma,
            kernel,
        }
    }
}

impl Scaling for LinearScaling<'_> {
    type State = ScalingFactors;
    const METHOD: Method = Method::Linear;

    fn phi(&self) -> &Array2<f64> {
        self.phi
    }

    fn sigma(&self) -> f64 {
        self.sigma
    }

    fn init(&self, warm: Option<&DualPotentials>) -> ScalingFactors {
        let sigma = self.sigma;
        match warm {
            Some(w) => ScalingFactors {
                a: w.u.mapv(|u| (-u / sigma).exp()),
                b: w.v.mapv(|v| (-v / sigma).exp()),
            },
            None => ScalingFactors {
                a: Array1::ones(self.p.len()),
                b: Array1::ones(self.q.len()),
            },
        }
    }

    fn step(&self, state: &ScalingFactors) -> (ScalingFactors, f64) {
        // a = p / (K b)
        let kb = self.kernel.dot(&state.b);
        let a = Zip::from(self.p).and(&kb).map_collect(|&p, &s| p / s);

        // Column masses under the new a and the old b.
        let kta = self.kernel.t().dot(&a);
        let mut residual = 0.0;
        for j in 0..self.q.len() {
            let mass = kta[j] * state.b[j];
            let q = self.q[j];
            let deviation = if q > 0.0 {
                (mass / q - 1.0).abs()
            } else {
                mass.abs()
            };
            residual = nan_max(residual, deviation);
        }

        // b = q / (Kᵀ a)
        let b = Zip::from(self.q).and(&kta).map_collect(|&q, &s| q / s);

        (ScalingFactors { a, b }, residual)
    }

    fn potentials(&self, state: &ScalingFactors) -> DualPotentials {
        let sigma = self.sigma;
        DualPotentials::new(
            state.a.mapv(|a| -sigma * a.ln()),
            state.b.mapv(|b| -sigma * b.ln()),
        )
    }

    fn plan(&self, state: &ScalingFactors) -> Array2<f64> {
        let (n, m) = self.kernel.dim();
        let mut plan = Array2::zeros((n, m));
        for i in 0..n {
            for j in 0..m {
                plan[[i, j]] = state.a[i] * self.kernel[[i, j]] * state.b[j];
            }
        }
        plan
    }
}
