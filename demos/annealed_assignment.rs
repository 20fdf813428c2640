//! Near-exact assignment by σ-annealing.
//!
//! A cold start at σ = 1e-4 takes many sweeps. Annealing from σ = 1 halves σ
//! per stage and warm-starts each stage from the last. With the `obs_slog`
//! feature the iterations are also logged to the terminal.
//!
//! Run: cargo run --example annealed_assignment
//!      cargo run --example annealed_assignment --features obs_slog

use ipfp::anneal::solve_annealed_with;
use ipfp::{solve_with, AnnealSchedule, History, Observer, SinkhornConfig};
use ndarray::{Array1, Array2};

fn observer() -> Box<dyn Observer> {
    #[cfg(feature = "obs_slog")]
    {
        Box::new(ipfp::SlogObserver::term_noblock().every(100))
    }
    #[cfg(not(feature = "obs_slog"))]
    {
        Box::new(History::new())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let n = 8;
    // Points on a circle matched to the same points rotated by a quarter step.
    let angle = |k: usize, offset: f64| 2.0 * std::f64::consts::PI * (k as f64 + offset) / n as f64;
    let phi = Array2::from_shape_fn((n, n), |(i, j)| (angle(i, 0.0) - angle(j, 0.25)).cos());
    let weights = Array1::from_shape_fn(n, |k| 1.0 + 0.1 * k as f64);
    let p = &weights / weights.sum();
    let q = Array1::from_elem(n, 1.0 / n as f64);

    let config = SinkhornConfig::new(1e-4);

    let mut cold_trace = History::new();
    let cold = solve_with(&phi, &p, &q, &config, None, &mut cold_trace)?;
    println!(
        "cold start:  {:>6} iterations, status {:?}, surplus {:.6}",
        cold.iterations, cold.status, cold.surplus
    );

    let mut obs = observer();
    let annealed = solve_annealed_with(
        &phi,
        &p,
        &q,
        &config,
        &AnnealSchedule::new(1.0, 0.5),
        obs.as_mut(),
    )?;
    println!(
        "annealed:    {:>6} iterations over {} stages, surplus {:.6}",
        annealed.total_iterations(),
        annealed.stages.len(),
        annealed.solution.surplus
    );
    println!();
    for stage in &annealed.stages {
        println!(
            "  σ = {:<10.3e} {:>6} iterations  {:?}",
            stage.sigma, stage.iterations, stage.status
        );
    }
    println!();

    println!("Assignment (largest entry per row):");
    for (i, row) in annealed.solution.plan.rows().into_iter().enumerate() {
        let (j, mass) = row
            .iter()
            .copied()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |best, (j, x)| if x > best.1 { (j, x) } else { best });
        println!("  {i} -> {j}  ({mass:.4} of {:.4})", p[i]);
    }

    Ok(())
}
