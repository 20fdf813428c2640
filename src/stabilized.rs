//! Log-sum-exp stabilization of the log-domain iteration.
//!
//! Each reduction first finds the best net surplus
//!
//! ```text
//! ṽ_i = max_j (Φ_ij − v_j)
//! u_i ← μ_i + ṽ_i + σ·ln Σ_j exp((Φ_ij − v_j − ṽ_i)/σ)
//! ```
//!
//! and likewise `û_j = max_i (Φ_ij − u_i)` for the column update. Every exponent
//! is ≤ 0 and the largest term is exactly 1, so the sum lies in `[1, len]`. It
//! can neither overflow nor underflow to zero, whatever σ is. The fixed point is
//! the same as [`crate::log_domain::Naive`]'s whenever the latter is finite.

use crate::config::Method;
use crate::log_domain::SoftMax;

/// Max-shifted evaluation of `σ·ln Σ exp(x/σ)`.
pub(crate) struct LogSumExp;

impl SoftMax for LogSumExp {
    const METHOD: Method = Method::Stabilized;

    #[inline]
    fn soft_max(sigma: f64, len: usize, x: impl FnMut(usize) -> f64) -> f64 {
        shifted_soft_max(sigma, len, x)
    }
}

/// Numerically stable `σ·ln Σ_k exp(x_k/σ)` for an indexable family.
///
/// This is the classic "log-sum-exp trick":
/// \[
/// \sigma \log \sum_k e^{x_k/\sigma} = m + \sigma \log \sum_k e^{(x_k - m)/\sigma},
/// \quad m = \max_k x_k
/// \]
///
/// Returns `-∞` if `len == 0`. If the max is not finite it is returned as-is:
/// `-∞` when every term is excluded, `+∞` or NaN propagated otherwise.
#[inline]
pub(crate) fn shifted_soft_max(sigma: f64, len: usize, mut x: impl FnMut(usize) -> f64) -> f64 {
    if len == 0 {
        return f64::NEG_INFINITY;
    }

    let mut max_val = f64::NEG_INFINITY;
    for k in 0..len {
        let xk = x(k);
        if xk.is_nan() {
            return f64::NAN;
        }
        max_val = max_val.max(xk);
    }
    if !max_val.is_finite() {
        return max_val;
    }

    let mut sum_exp = 0.0;
    for k in 0..len {
        sum_exp += ((x(k) - max_val) / sigma).exp();
    }
    max_val + sigma * sum_exp.ln()
}
