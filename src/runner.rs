// src/runner.rs
// Bounded per-ticker fan-out onto the blocking pool.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Implemented by every per-ticker result so the runner can print its status line.
pub trait TickerOutcome {
    fn succeeded(&self) -> bool;
}

/// Twice the available parallelism, or 4 when it cannot be determined.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get() * 2)
        .unwrap_or(4)
}

#[derive(Debug)]
pub struct TickerRun<T> {
    pub ticker: String,
    /// `Err` only when the job itself panicked.
    pub outcome: Result<T, String>,
}

impl<T: TickerOutcome> TickerRun<T> {
    pub fn succeeded(&self) -> bool {
        matches!(&self.outcome, Ok(outcome) if outcome.succeeded())
    }
}

fn panic_message(cause: &(dyn Any + Send)) -> String {
    if let Some(s) = cause.downcast_ref::<&str>() {
        format!("worker panicked: {}", s)
    } else if let Some(s) = cause.downcast_ref::<String>() {
        format!("worker panicked: {}", s)
    } else {
        "worker panicked".to_string()
    }
}

/// Runs `job` once per ticker with at most `workers` jobs in flight.
/// Status lines are logged in completion order; results come back sorted by ticker.
pub async fn run_per_ticker<T, F>(tickers: Vec<String>, workers: usize, job: F) -> Vec<TickerRun<T>>
where
    T: TickerOutcome + Send + 'static,
    F: Fn(&str) -> T + Send + Sync + 'static,
{
    let total = tickers.len();
    let job = Arc::new(job);
    let permits = Arc::new(Semaphore::new(workers.max(1)));
    let mut set = JoinSet::new();

    tracing::debug!("Dispatching {} tickers to {} workers", total, workers.max(1));
    for ticker in tickers {
        let permit = match Arc::clone(&permits).acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                tracing::error!("Worker pool closed before {} was scheduled: {}", ticker, e);
                break;
            }
        };
        let job = Arc::clone(&job);
        set.spawn_blocking(move || {
            let _permit = permit;
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| (*job)(&ticker)))
                .map_err(|cause| panic_message(cause.as_ref()));
            let run = TickerRun { ticker, outcome };
            if run.succeeded() {
                tracing::info!("{}: Done", run.ticker);
            } else {
                tracing::info!("{}: Fail", run.ticker);
            }
            run
        });
    }

    let mut runs = Vec::with_capacity(total);
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(run) => runs.push(run),
            Err(e) => tracing::error!("Worker task failed to join: {}", e),
        }
    }
    runs.sort_by(|a, b| a.ticker.cmp(&b.ticker));
    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, PartialEq)]
    struct Len(usize);

    impl TickerOutcome for Len {
        fn succeeded(&self) -> bool {
            self.0 > 1
        }
    }

    fn tickers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_default_workers_is_positive() {
        assert!(default_workers() >= 2);
    }

    #[test]
    fn test_results_sorted_by_ticker() {
        let runs = tokio_test::block_on(run_per_ticker(
            tickers(&["TLKM", "A", "BBCA"]),
            2,
            |t: &str| Len(t.len()),
        ));
        let names: Vec<&str> = runs.iter().map(|r| r.ticker.as_str()).collect();
        assert_eq!(names, vec!["A", "BBCA", "TLKM"]);
        assert_eq!(runs[1].outcome, Ok(Len(4)));
        assert!(!runs[0].succeeded(), "single-letter ticker counts as a failure");
        assert!(runs[2].succeeded());
    }

    #[test]
    fn test_panicking_job_is_isolated() {
        let runs = tokio_test::block_on(run_per_ticker(
            tickers(&["BAD", "GOOD"]),
            4,
            |t: &str| {
                if t == "BAD" {
                    panic!("corrupt input");
                }
                Len(t.len())
            },
        ));
        assert_eq!(runs.len(), 2);
        let err = runs[0].outcome.as_ref().unwrap_err();
        assert!(err.contains("corrupt input"), "got {}", err);
        assert_eq!(runs[1].outcome, Ok(Len(4)));
    }

    #[test]
    fn test_worker_bound_is_respected() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (in_flight_job, peak_job) = (Arc::clone(&in_flight), Arc::clone(&peak));

        let runs = tokio_test::block_on(run_per_ticker(
            tickers(&["A1", "A2", "A3", "A4", "A5", "A6"]),
            2,
            move |t: &str| {
                let now = in_flight_job.fetch_add(1, Ordering::SeqCst) + 1;
                peak_job.fetch_max(now, Ordering::SeqCst);
                std::thread::sleep(std::time::Duration::from_millis(20));
                in_flight_job.fetch_sub(1, Ordering::SeqCst);
                Len(t.len())
            },
        ));
        assert_eq!(runs.len(), 6);
        assert!(peak.load(Ordering::SeqCst) <= 2, "peak was {}", peak.load(Ordering::SeqCst));
    }
}
