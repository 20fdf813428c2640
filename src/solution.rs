//! Solve results: status, dual potentials, coupling and objective.

use crate::config::Method;
use crate::driver::nan_max;
use crate::{Error, Result};
use ndarray::{Array1, Array2, Axis};

/// How an IPFP solve terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum Status {
    /// The residual dropped to the tolerance.
    Converged,
    /// The iteration cap was reached first. The result is the last iterate.
    MaxIterationsExceeded,
}

/// Row and column potentials (u, v).
///
/// They are only defined up to a constant: `(u + c, v − c)` gives the same
/// coupling and objective as `(u, v)`. Compare differences, or the plans.
#[derive(Debug, Clone, PartialEq)]
pub struct DualPotentials {
    /// Row potentials, length n.
    pub u: Array1<f64>,
    /// Column potentials, length m.
    pub v: Array1<f64>,
}

impl DualPotentials {
    pub fn new(u: Array1<f64>, v: Array1<f64>) -> Self {
        Self { u, v }
    }

    /// Zero potentials for an n × m problem.
    pub fn zeros(n: usize, m: usize) -> Self {
        Self::new(Array1::zeros(n), Array1::zeros(m))
    }

    /// The gauge-equivalent pair `(u + c, v − c)`.
    pub fn shifted(&self, c: f64) -> Self {
        Self::new(&self.u + c, &self.v - c)
    }
}

/// Output of [`crate::solve`].
#[derive(Debug, Clone)]
pub struct Solution {
    pub status: Status,
    /// Method that produced this result.
    pub method: Method,
    /// Iterations performed (one iteration = one row fit plus one column fit).
    pub iterations: usize,
    /// Residual after the last iteration.
    pub residual: f64,
    pub potentials: DualPotentials,
    /// Coupling π (n × m).
    pub plan: Array2<f64>,
    /// Regularized objective `Σ π Φ − σ Σ π ln π`.
    pub objective: f64,
    /// Unregularized surplus `Σ π Φ`.
    pub surplus: f64,
}

impl Solution {
    pub(crate) fn assemble(
        status: Status,
        method: Method,
        iterations: usize,
        residual: f64,
        potentials: DualPotentials,
        plan: Array2<f64>,
        phi: &Array2<f64>,
        sigma: f64,
    ) -> Self {
        let surplus = transport_surplus(phi, &plan);
        let objective = surplus - sigma * neg_entropy(&plan);
        Self {
            status,
            method,
            iterations,
            residual,
            potentials,
            plan,
            objective,
            surplus,
        }
    }

    pub fn converged(&self) -> bool {
        self.status == Status::Converged
    }

    /// Return `self` if converged, [`Error::NotConverged`] otherwise.
    pub fn into_converged(self) -> Result<Self> {
        match self.status {
            Status::Converged => Ok(self),
            Status::MaxIterationsExceeded => Err(Error::NotConverged {
                method: self.method,
                iterations: self.iterations,
                residual: self.residual,
            }),
        }
    }

    /// Row sums of π (compare with `p`).
    pub fn row_sums(&self) -> Array1<f64> {
        self.plan.sum_axis(Axis(1))
    }

    /// Column sums of π (compare with `q`).
    pub fn col_sums(&self) -> Array1<f64> {
        self.plan.sum_axis(Axis(0))
    }

    /// Max absolute deviation of π's marginals from `(p, q)`. NaN if π has NaN.
    pub fn marginal_error(&self, p: &Array1<f64>, q: &Array1<f64>) -> f64 {
        let rows = self.row_sums();
        let cols = self.col_sums();
        rows.iter()
            .zip(p.iter())
            .chain(cols.iter().zip(q.iter()))
            .fold(0.0, |acc, (&got, &want)| nan_max(acc, (got - want).abs()))
    }

    /// Whether the plan and objective are free of NaN and ±∞.
    ///
    /// Potentials are not checked: zero-mass rows legitimately carry `+∞`.
    pub fn is_finite(&self) -> bool {
        self.objective.is_finite() && self.plan.iter().all(|x| x.is_finite())
    }
}

/// π_ij = exp((Φ_ij − u_i − v_j) / σ).
pub fn plan_from_potentials(
    phi: &Array2<f64>,
    potentials: &DualPotentials,
    sigma: f64,
) -> Array2<f64> {
    let (n, m) = phi.dim();
    let (u, v) = (&potentials.u, &potentials.v);
    let mut plan = Array2::zeros((n, m));
    for i in 0..n {
        for j in 0..m {
            plan[[i, j]] = ((phi[[i, j]] - u[i] - v[j]) / sigma).exp();
        }
    }
    plan
}

/// Σ π_ij Φ_ij.
pub fn transport_surplus(phi: &Array2<f64>, plan: &Array2<f64>) -> f64 {
    phi.iter().zip(plan.iter()).map(|(&f, &x)| f * x).sum()
}

/// Σ π_ij Φ_ij − σ Σ π_ij ln π_ij, with 0 ln 0 = 0.
///
/// NaN entries in `plan` make the result NaN.
pub fn regularized_objective(phi: &Array2<f64>, plan: &Array2<f64>, sigma: f64) -> f64 {
    transport_surplus(phi, plan) - sigma * neg_entropy(plan)
}

// Σ π ln π
fn neg_entropy(plan: &Array2<f64>) -> f64 {
    plan.iter()
        .map(|&x| if x == 0.0 { 0.0 } else { x * x.ln() })
        .sum()
}
