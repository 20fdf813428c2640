//! Behaviour at the two ends of the σ range.
//!
//! σ → 0: the entropic plan approaches an optimal assignment. For a coupling
//! the entropy lies in `[0, ln(nm)]`, so the surplus gap to the exact optimum
//! is at most `σ ln(nm)`.
//!
//! σ → ∞: the surplus stops mattering and the plan tends to `p qᵀ`.

mod common;

use common::{affinity_example, exact_transport_value};
use ipfp::{solve, SinkhornConfig};
use ndarray::Array2;

#[test]
fn small_sigma_approaches_the_exact_optimum() {
    let (phi, p, q) = affinity_example();
    let exact = exact_transport_value(&phi, &p, &q);
    let ln_nm = ((phi.nrows() * phi.ncols()) as f64).ln();

    let mut gaps = Vec::new();
    for sigma in [0.1, 0.03, 0.01, 0.003] {
        let sol = solve(&phi, &p, &q, &SinkhornConfig::new(sigma))
            .unwrap()
            .into_converged()
            .unwrap();
        let gap = exact - sol.surplus;
        assert!(gap >= -1e-5, "σ={sigma}: surplus {} above exact {exact}", sol.surplus);
        assert!(gap <= sigma * ln_nm + 1e-5, "σ={sigma}: gap {gap}");
        assert!(sol.objective >= exact - 1e-5, "σ={sigma}: objective {}", sol.objective);
        assert!(sol.objective <= exact + sigma * ln_nm + 1e-5);
        gaps.push(gap);
    }
    assert!(gaps[gaps.len() - 1] < 0.01, "gaps={gaps:?}");
    assert!(gaps[gaps.len() - 1] < gaps[0], "gaps={gaps:?}");
}

#[test]
fn large_sigma_tends_to_independent_coupling() {
    let (phi, p, q) = affinity_example();
    let independent = Array2::from_shape_fn(phi.dim(), |(i, j)| p[i] * q[j]);

    let mut devs = Vec::new();
    for sigma in [1.0, 10.0, 100.0, 1000.0] {
        let sol = solve(&phi, &p, &q, &SinkhornConfig::new(sigma)).unwrap();
        assert!(sol.converged());
        devs.push(common::max_abs_diff(&sol.plan, &independent));
    }
    for w in devs.windows(2) {
        assert!(w[1] < w[0], "devs={devs:?}");
    }
    assert!(devs[3] < 1e-3, "devs={devs:?}");
}
