//! Iteration observers.
//!
//! The driver calls an [`Observer`] after every iteration and once when the
//! loop ends. `()` observes nothing. [`History`] keeps the residual trace.
//! With the `obs_slog` feature, `SlogObserver` writes structured log records.

use crate::config::Method;
use crate::solution::Status;

/// Snapshot passed to observers after each iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationRecord {
    pub method: Method,
    /// 1-based iteration count.
    pub iteration: usize,
    pub residual: f64,
}

/// Hook into the IPFP loop.
pub trait Observer {
    fn observe_iter(&mut self, record: &IterationRecord);

    /// Called once with the final status and last record.
    fn observe_final(&mut self, _status: Status, _last: &IterationRecord) {}
}

impl Observer for () {
    #[inline]
    fn observe_iter(&mut self, _: &IterationRecord) {}
}

/// Records every residual and the final status.
#[derive(Debug, Clone, Default)]
pub struct History {
    pub residuals: Vec<f64>,
    pub outcome: Option<Status>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.residuals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.residuals.is_empty()
    }

    pub fn last_residual(&self) -> Option<f64> {
        self.residuals.last().copied()
    }
}

impl Observer for History {
    fn observe_iter(&mut self, record: &IterationRecord) {
        self.residuals.push(record.residual);
    }

    fn observe_final(&mut self, status: Status, _last: &IterationRecord) {
        self.outcome = Some(status);
    }
}

#[cfg(feature = "obs_slog")]
pub use self::slog_observer::SlogObserver;

#[cfg(feature = "obs_slog")]
mod slog_observer {
    use super::{IterationRecord, Observer};
    use crate::solution::Status;
    use slog::{debug, info, o, warn, Drain, Logger};

    /// Logs the residual every `every` iterations at debug level, and the outcome
    /// at info level (warn when the cap is hit).
    pub struct SlogObserver {
        logger: Logger,
        every: usize,
    }

    impl SlogObserver {
        pub fn new(logger: Logger) -> Self {
            Self { logger, every: 1 }
        }

        /// Terminal logger with a non-blocking drain; drops records under load.
        pub fn term_noblock() -> Self {
            let decorator = slog_term::TermDecorator::new().build();
            let drain = slog_term::FullFormat::new(decorator).build().fuse();
            let drain = slog_async::Async::new(drain)
                .overflow_strategy(slog_async::OverflowStrategy::Drop)
                .build()
                .fuse();
            Self::new(Logger::root(drain, o!("component" => "ipfp")))
        }

        /// Log only every k-th iteration. `0` is treated as `1`.
        pub fn every(mut self, k: usize) -> Self {
            self.every = k.max(1);
            self
        }
    }

    impl Observer for SlogObserver {
        fn observe_iter(&mut self, record: &IterationRecord) {
            if record.iteration % self.every == 0 {
                debug!(self.logger, "ipfp iteration";
                    "method" => %record.method,
                    "iter" => record.iteration,
                    "residual" => record.residual);
            }
        }

        fn observe_final(&mut self, status: Status, last: &IterationRecord) {
            match status {
                Status::Converged => info!(self.logger, "ipfp converged";
                    "method" => %last.method,
                    "iterations" => last.iteration,
                    "residual" => last.residual),
                Status::MaxIterationsExceeded => warn!(self.logger, "ipfp hit iteration cap";
                    "method" => %last.method,
                    "iterations" => last.iteration,
                    "residual" => last.residual),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{solve_with, SinkhornConfig};
    use ndarray::array;

    #[test]
    fn history_tracks_every_iteration() {
        let phi = array![[0.9, 0.1], [0.2, 0.7], [0.5, 0.5]];
        let p = array![0.3, 0.3, 0.4];
        let q = array![0.55, 0.45];
        let mut history = History::new();
        let sol = solve_with(&phi, &p, &q, &SinkhornConfig::new(0.2), None, &mut history).unwrap();

        assert_eq!(history.len(), sol.iterations);
        assert_eq!(history.outcome, Some(sol.status));
        assert_eq!(history.last_residual(), Some(sol.residual));
        assert!(sol.residual <= 1e-9);
    }

    #[test]
    fn history_starts_empty() {
        let h = History::new();
        assert!(h.is_empty());
        assert_eq!(h.last_residual(), None);
        assert_eq!(h.outcome, None);
    }

    #[cfg(feature = "obs_slog")]
    #[test]
    fn slog_observer_runs_with_discard_drain() {
        let logger = slog::Logger::root(slog::Discard, slog::o!());
        let mut observer = SlogObserver::new(logger).every(5);
        let phi = array![[0.9, 0.1], [0.2, 0.7]];
        let p = array![0.45, 0.55];
        let q = array![0.5, 0.5];
        let sol = solve_with(&phi, &p, &q, &SinkhornConfig::new(0.1), None, &mut observer).unwrap();
        assert!(sol.converged());
    }
}
