//! Worker/firm matching with an entropic surplus.
//!
//! Six worker types (skill, experience) meet four firm types (tech intensity,
//! size). The joint surplus is a bilinear affinity. The demo solves the same
//! market with all three engines at decreasing σ and shows where the linear
//! and plain log engines stop returning usable plans.
//!
//! Run: cargo run --example affinity_matching

use ipfp::{solve_with, History, Method, SinkhornConfig};
use ndarray::{array, Array2};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // (skill, experience)
    let workers = [
        [0.9, 0.2],
        [0.7, 0.8],
        [0.4, 0.5],
        [0.2, 0.9],
        [0.6, 0.1],
        [0.1, 0.3],
    ];
    // (tech intensity, size)
    let firms = [[0.95, 0.3], [0.5, 0.9], [0.2, 0.4], [0.7, 0.6]];

    let phi = Array2::from_shape_fn((workers.len(), firms.len()), |(i, j)| {
        workers[i][0] * firms[j][0] + 0.5 * workers[i][1] * firms[j][1]
    });
    let p = array![0.21, 0.14, 0.19, 0.11, 0.23, 0.12];
    let q = array![0.18, 0.31, 0.26, 0.25];

    println!("Surplus Φ:");
    for row in phi.rows() {
        let cells: Vec<String> = row.iter().map(|x| format!("{x:6.3}")).collect();
        println!("  {}", cells.join(" "));
    }
    println!();

    println!(
        "{:>8} {:>11} {:>10} {:>7} {:>12} {:>12}",
        "sigma", "method", "status", "iters", "objective", "marg. err"
    );
    for sigma in [0.5, 0.05, 0.005, 0.0005] {
        for method in [Method::Linear, Method::Log, Method::Stabilized] {
            let config = SinkhornConfig::new(sigma)
                .with_method(method)
                .with_max_iterations(20_000);
            let mut history = History::new();
            let sol = solve_with(&phi, &p, &q, &config, None, &mut history)?;
            println!(
                "{:>8} {:>11} {:>10} {:>7} {:>12.6} {:>12.2e}",
                sigma,
                method.to_string(),
                if sol.converged() { "converged" } else { "capped" },
                history.len(),
                sol.objective,
                sol.marginal_error(&p, &q),
            );
        }
    }
    println!();

    let sol = ipfp::solve(&phi, &p, &q, &SinkhornConfig::new(0.005))?.into_converged()?;
    println!("Stabilized plan at σ = 0.005:");
    for row in sol.plan.rows() {
        let cells: Vec<String> = row.iter().map(|x| format!("{x:7.4}")).collect();
        println!("  {}", cells.join(" "));
    }
    println!("surplus = {:.6}", sol.surplus);

    Ok(())
}
