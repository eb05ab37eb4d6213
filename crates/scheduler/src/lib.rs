//! The pipeline scheduler: deterministic periodic execution of a fixed job
//! set with at-most-one-concurrent-instance-per-job-id, timeout-bound
//! cancellation, and per-job health for the dashboard's health endpoint.
//!
//! A job failing (or timing out) is logged and never blocks subsequent
//! runs of itself or any other job — errors are always local to the job
//! that raised them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

#[async_trait]
pub trait Job: Send + Sync {
    /// Stable job id, used as the mutual-exclusion and health-map key.
    fn id(&self) -> &'static str;

    /// Idempotent: a run may be cancelled by the outer timeout at any
    /// point, and the next cadence's run must be safe to start regardless
    /// of how far the previous one got.
    async fn run(&self) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy)]
pub struct JobSpec {
    pub cadence: Duration,
    pub timeout: Duration,
    /// Delay before the first tick. Zero means "run immediately, then every
    /// `cadence`" (the default `tokio::time::interval` behavior); a job
    /// pinned to a wall-clock trigger (e.g. daily at 02:00 UTC) computes
    /// this at registration time from the current moment.
    pub initial_delay: Duration,
}

impl JobSpec {
    /// Timeout defaults to 2x cadence, first tick fires immediately.
    pub fn new(cadence: Duration) -> Self {
        Self {
            cadence,
            timeout: cadence * 2,
            initial_delay: Duration::ZERO,
        }
    }

    pub fn with_timeout(cadence: Duration, timeout: Duration) -> Self {
        Self {
            cadence,
            timeout,
            initial_delay: Duration::ZERO,
        }
    }

    /// Pins the first tick to fire after `delay` instead of immediately;
    /// every tick after that still runs on `cadence`.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct JobHealth {
    pub last_success: Option<DateTime<Utc>>,
    pub last_failure: Option<(DateTime<Utc>, String)>,
    pub consecutive_failures: u32,
    pub running: bool,
}

struct RegisteredJob {
    spec: JobSpec,
    job: Arc<dyn Job>,
}

/// Owns the job registry and per-job health. A single `Scheduler` is
/// expected per process; its `in_flight` and `health` maps are the only
/// shared state the job loops touch.
pub struct Scheduler {
    jobs: Vec<RegisteredJob>,
    health: Arc<DashMap<String, JobHealth>>,
    in_flight: Arc<DashMap<String, ()>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            jobs: Vec::new(),
            health: Arc::new(DashMap::new()),
            in_flight: Arc::new(DashMap::new()),
        }
    }

    pub fn register(&mut self, spec: JobSpec, job: Arc<dyn Job>) {
        self.health.insert(job.id().to_string(), JobHealth::default());
        self.jobs.push(RegisteredJob { spec, job });
    }

    pub fn health_snapshot(&self) -> Vec<(String, JobHealth)> {
        self.health
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }

    /// Spawns one periodic task per registered job and returns their join
    /// handles. Each job's own ticker is independent — jobs overlap freely
    /// in time with each other, only self-overlap is forbidden. Shutdown is
    /// cooperative: flipping `shutdown` to `true` causes every loop to exit
    /// after its current tick.
    pub fn spawn_all(&self, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        self.jobs
            .iter()
            .map(|registered| {
                let job = registered.job.clone();
                let spec = registered.spec;
                let health = self.health.clone();
                let in_flight = self.in_flight.clone();
                let mut shutdown = shutdown.clone();
                tokio::spawn(async move {
                    let start = tokio::time::Instant::now() + spec.initial_delay;
                    let mut ticker = tokio::time::interval_at(start, spec.cadence);
                    loop {
                        tokio::select! {
                            _ = ticker.tick() => {
                                run_once(job.clone(), spec, health.clone(), in_flight.clone()).await;
                            }
                            _ = shutdown.changed() => {
                                if *shutdown.borrow() {
                                    info!(job = job.id(), "scheduler shutting down job loop");
                                    break;
                                }
                            }
                        }
                    }
                })
            })
            .collect()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs one job instance under `spec.timeout`, enforcing at-most-one
/// concurrent instance of this job id via `in_flight`. Exposed at crate
/// level (not just inside `spawn_all`) so tests can exercise mutual
/// exclusion directly without waiting on a real ticker.
pub async fn run_once(
    job: Arc<dyn Job>,
    spec: JobSpec,
    health: Arc<DashMap<String, JobHealth>>,
    in_flight: Arc<DashMap<String, ()>>,
) {
    let id = job.id();
    if in_flight.contains_key(id) {
        warn!(job = id, "skipping run: previous instance still in flight");
        return;
    }
    in_flight.insert(id.to_string(), ());

    let result = tokio::time::timeout(spec.timeout, job.run()).await;

    in_flight.remove(id);
    let mut entry = health.entry(id.to_string()).or_default();
    entry.running = false;
    match result {
        Ok(Ok(())) => {
            entry.last_success = Some(Utc::now());
            entry.consecutive_failures = 0;
        }
        Ok(Err(err)) => {
            error!(job = id, error = %err, "job failed");
            entry.last_failure = Some((Utc::now(), err.to_string()));
            entry.consecutive_failures += 1;
        }
        Err(_) => {
            error!(job = id, timeout = ?spec.timeout, "job timed out");
            entry.last_failure = Some((Utc::now(), "timed out".to_string()));
            entry.consecutive_failures += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingJob {
        id: &'static str,
        runs: AtomicU32,
        fail: bool,
    }

    #[async_trait]
    impl Job for CountingJob {
        fn id(&self) -> &'static str {
            self.id
        }

        async fn run(&self) -> anyhow::Result<()> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("boom");
            }
            Ok(())
        }
    }

    struct SlowJob {
        started: Arc<tokio::sync::Notify>,
        finish: Arc<tokio::sync::Notify>,
    }

    #[async_trait]
    impl Job for SlowJob {
        fn id(&self) -> &'static str {
            "slow"
        }

        async fn run(&self) -> anyhow::Result<()> {
            self.started.notify_one();
            self.finish.notified().await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn successful_run_records_health() {
        let job = Arc::new(CountingJob {
            id: "test_job",
            runs: AtomicU32::new(0),
            fail: false,
        });
        let health = Arc::new(DashMap::new());
        let in_flight = Arc::new(DashMap::new());
        run_once(
            job.clone(),
            JobSpec::new(Duration::from_secs(1)),
            health.clone(),
            in_flight,
        )
        .await;
        let recorded = health.get("test_job").unwrap();
        assert!(recorded.last_success.is_some());
        assert_eq!(recorded.consecutive_failures, 0);
        assert_eq!(job.runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_run_increments_consecutive_failures_without_panicking() {
        let job = Arc::new(CountingJob {
            id: "failing_job",
            runs: AtomicU32::new(0),
            fail: true,
        });
        let health = Arc::new(DashMap::new());
        let in_flight = Arc::new(DashMap::new());
        run_once(
            job.clone(),
            JobSpec::new(Duration::from_secs(1)),
            health.clone(),
            in_flight.clone(),
        )
        .await;
        run_once(job, JobSpec::new(Duration::from_secs(1)), health.clone(), in_flight).await;
        let recorded = health.get("failing_job").unwrap();
        assert_eq!(recorded.consecutive_failures, 2);
        assert!(recorded.last_failure.is_some());
    }

    #[tokio::test]
    async fn slow_run_times_out_and_is_recorded_as_failure() {
        let job = Arc::new(SlowJob {
            started: Arc::new(tokio::sync::Notify::new()),
            finish: Arc::new(tokio::sync::Notify::new()),
        });
        let health = Arc::new(DashMap::new());
        let in_flight = Arc::new(DashMap::new());
        run_once(
            job,
            JobSpec::with_timeout(Duration::from_secs(10), Duration::from_millis(10)),
            health.clone(),
            in_flight,
        )
        .await;
        let recorded = health.get("slow").unwrap();
        assert_eq!(recorded.consecutive_failures, 1);
    }

    #[test]
    fn with_initial_delay_leaves_cadence_and_timeout_untouched() {
        let spec = JobSpec::new(Duration::from_secs(60)).with_initial_delay(Duration::from_secs(3600));
        assert_eq!(spec.cadence, Duration::from_secs(60));
        assert_eq!(spec.timeout, Duration::from_secs(120));
        assert_eq!(spec.initial_delay, Duration::from_secs(3600));
    }

    #[tokio::test]
    async fn second_concurrent_instance_of_same_job_is_skipped() {
        let started = Arc::new(tokio::sync::Notify::new());
        let finish = Arc::new(tokio::sync::Notify::new());
        let job = Arc::new(SlowJob {
            started: started.clone(),
            finish: finish.clone(),
        });
        let health = Arc::new(DashMap::new());
        let in_flight = Arc::new(DashMap::new());

        let spec = JobSpec::new(Duration::from_secs(60));
        let first = tokio::spawn(run_once(job.clone(), spec, health.clone(), in_flight.clone()));
        started.notified().await;

        // The first instance is still in flight (blocked on `finish`); a
        // second instance for the same job id must be skipped, not queued.
        run_once(job.clone(), spec, health.clone(), in_flight.clone()).await;
        assert!(in_flight.contains_key("slow"));

        finish.notify_one();
        first.await.unwrap();
        assert!(!in_flight.contains_key("slow"));
    }
}
