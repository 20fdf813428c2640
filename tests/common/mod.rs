//! Shared fixtures for the e2e tests.
#![allow(dead_code)]

use ndarray::{array, Array1, Array2};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

/// 5×3 affinity matrix, normalized so its largest entry is 1.
///
/// The marginals are chosen so no proper subset of `p` has the same mass as a
/// proper subset of `q`. The exact assignment is then a non-degenerate vertex
/// with a unique optimum.
pub fn affinity_example() -> (Array2<f64>, Array1<f64>, Array1<f64>) {
    let phi = array![
        [0.62, 0.18, 0.91],
        [1.00, 0.44, 0.27],
        [0.35, 0.83, 0.56],
        [0.09, 0.71, 0.48],
        [0.77, 0.52, 0.13],
    ];
    let p = array![0.11, 0.17, 0.23, 0.19, 0.30];
    let q = array![0.347, 0.281, 0.372];
    (phi, p, q)
}

/// Gaussian surplus with marginals drawn from `[0.1, 1)` and normalized.
pub fn random_problem(
    rng: &mut ChaCha8Rng,
    n: usize,
    m: usize,
) -> (Array2<f64>, Array1<f64>, Array1<f64>) {
    let normal = Normal::new(0.0, 1.0).unwrap();
    let phi = Array2::from_shape_fn((n, m), |_| normal.sample(&mut *rng));
    let mut p = Array1::from_shape_fn(n, |_| rng.gen_range(0.1..1.0));
    let mut q = Array1::from_shape_fn(m, |_| rng.gen_range(0.1..1.0));
    p /= p.sum();
    q /= q.sum();
    (phi, p, q)
}

pub fn max_abs_diff(a: &Array2<f64>, b: &Array2<f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f64::max)
}

/// Exact value of `max Σ π Φ` over couplings of `(p, q)`.
///
/// Brute force over bases of the transportation polytope. Every candidate is
/// a set of `n + m − 1` cells, solved by peeling off leaves. Small problems only.
pub fn exact_transport_value(phi: &Array2<f64>, p: &Array1<f64>, q: &Array1<f64>) -> f64 {
    let (n, m) = phi.dim();
    let cells: Vec<(usize, usize)> = (0..n).flat_map(|i| (0..m).map(move |j| (i, j))).collect();
    let k = n + m - 1;
    let mut idx: Vec<usize> = (0..k).collect();
    let mut best = f64::NEG_INFINITY;

    loop {
        let basis: Vec<(usize, usize)> = idx.iter().map(|&c| cells[c]).collect();
        if let Some(flow) = basic_solution(&basis, p, q) {
            let value: f64 = basis
                .iter()
                .zip(flow.iter())
                .map(|(&(i, j), &x)| x * phi[[i, j]])
                .sum();
            best = best.max(value);
        }
        if !next_combination(&mut idx, cells.len()) {
            return best;
        }
    }
}

fn next_combination(idx: &mut [usize], total: usize) -> bool {
    let k = idx.len();
    let mut i = k;
    while i > 0 {
        i -= 1;
        if idx[i] < total - k + i {
            idx[i] += 1;
            for j in i + 1..k {
                idx[j] = idx[j - 1] + 1;
            }
            return true;
        }
    }
    false
}

/// Flows on `basis` meeting `(p, q)`, or `None` if the cells contain a cycle or
/// the solution is infeasible.
fn basic_solution(basis: &[(usize, usize)], p: &Array1<f64>, q: &Array1<f64>) -> Option<Vec<f64>> {
    let mut row_left = p.to_vec();
    let mut col_left = q.to_vec();
    let mut flow: Vec<Option<f64>> = vec![None; basis.len()];
    let mut remaining = basis.len();

    while remaining > 0 {
        let mut progressed = false;
        for i in 0..row_left.len() {
            let open: Vec<usize> = (0..basis.len())
                .filter(|&e| flow[e].is_none() && basis[e].0 == i)
                .collect();
            if open.len() == 1 {
                let e = open[0];
                let x = row_left[i];
                flow[e] = Some(x);
                row_left[i] = 0.0;
                col_left[basis[e].1] -= x;
                remaining -= 1;
                progressed = true;
            }
        }
        for j in 0..col_left.len() {
            let open: Vec<usize> = (0..basis.len())
                .filter(|&e| flow[e].is_none() && basis[e].1 == j)
                .collect();
            if open.len() == 1 {
                let e = open[0];
                let x = col_left[j];
                flow[e] = Some(x);
                col_left[j] = 0.0;
                row_left[basis[e].0] -= x;
                remaining -= 1;
                progressed = true;
            }
        }
        if !progressed {
            return None;
        }
    }

    let flow: Vec<f64> = flow.into_iter().map(|x| x.unwrap_or(0.0)).collect();
    let feasible = flow.iter().all(|&x| x >= -1e-12)
        && row_left.iter().chain(col_left.iter()).all(|x| x.abs() < 1e-9);
    feasible.then_some(flow)
}
