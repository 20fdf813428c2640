//! Input validation, run before any iteration.

use crate::solution::DualPotentials;
use crate::{Error, Result};
use ndarray::{Array1, Array2};

/// Allowed absolute deviation of `Σp` and `Σq` from 1.
pub const MASS_TOLERANCE: f64 = 1e-6;

/// Validate `(Φ, p, q)`: non-empty, matching lengths, finite surplus,
/// non-negative marginals that each sum to 1.
pub(crate) fn validate(phi: &Array2<f64>, p: &Array1<f64>, q: &Array1<f64>) -> Result<()> {
    let (n, m) = phi.dim();
    if n == 0 || m == 0 {
        return Err(Error::Empty(n, m));
    }
    if p.len() != n {
        return Err(Error::ShapeMismatch {
            which: "p",
            expected: n,
            got: p.len(),
        });
    }
    if q.len() != m {
        return Err(Error::ShapeMismatch {
            which: "q",
            expected: m,
            got: q.len(),
        });
    }
    if let Some(((i, j), &x)) = phi.indexed_iter().find(|(_, x)| !x.is_finite()) {
        return Err(Error::NonFiniteSurplus(i, j, x));
    }
    check_marginal("p", p)?;
    check_marginal("q", q)
}

fn check_marginal(which: &'static str, w: &Array1<f64>) -> Result<()> {
    for (index, &value) in w.iter().enumerate() {
        // Also catches NaN.
        if !(value >= 0.0) || !value.is_finite() {
            return Err(Error::InvalidMass {
                which,
                index,
                value,
            });
        }
    }
    let sum = w.sum();
    if (sum - 1.0).abs() > MASS_TOLERANCE {
        return Err(Error::NotNormalized { which, sum });
    }
    Ok(())
}

/// Warm-start potentials must match `Φ`'s shape and be finite.
///
/// The one exception is `+∞` on a zero-mass row or column: that is how such a
/// row or column shows up in converged potentials, so a solution can be fed
/// back in. Any other infinity would pin the opposite potentials at `∓∞` and
/// leave a NaN plan behind.
pub(crate) fn validate_warm_start(
    phi: &Array2<f64>,
    p: &Array1<f64>,
    q: &Array1<f64>,
    warm: &DualPotentials,
) -> Result<()> {
    let (n, m) = phi.dim();
    if warm.u.len() != n || warm.v.len() != m {
        return Err(Error::WarmStartShape(warm.u.len(), warm.v.len(), n, m));
    }
    check_potential("u", &warm.u, p)?;
    check_potential("v", &warm.v, q)
}

fn check_potential(which: &'static str, potential: &Array1<f64>, mass: &Array1<f64>) -> Result<()> {
    for (index, (&value, &w)) in potential.iter().zip(mass.iter()).enumerate() {
        let pinned = value == f64::INFINITY && w == 0.0;
        if !value.is_finite() && !pinned {
            return Err(Error::WarmStartNotFinite {
                which,
                index,
                value,
            });
        }
    }
    Ok(())
}
