//! Trigger scheduler: a one-second tick that fires registered jobs when
//! one of their cron specs matches the current instant.
//!
//! Firings are spawned, never awaited in the tick loop, so a slow job can
//! not delay the others. Each job carries an in-flight flag: if its
//! previous run has not finished when the spec matches again, the firing
//! is skipped and logged instead of piling up.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use ponicwatch_domain::cron::CronSpec;
use ponicwatch_domain::time;
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;

pub type JobFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// A job body. Called once per firing; errors are the body's own problem,
/// it must log and swallow them.
pub type JobFn = Arc<dyn Fn() -> JobFuture + Send + Sync>;

struct Job {
    name: String,
    specs: Vec<CronSpec>,
    run: JobFn,
    in_flight: AtomicBool,
}

#[derive(Default)]
struct FlightCounter {
    count: AtomicUsize,
    drained: Notify,
}

/// Clears the job's in-flight flag even when the body panics.
struct FlightGuard {
    job: Arc<Job>,
    counter: Arc<FlightCounter>,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.job.in_flight.store(false, Ordering::SeqCst);
        if self.counter.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.counter.drained.notify_waiters();
        }
    }
}

#[derive(Default)]
pub struct TriggerScheduler {
    jobs: Vec<Arc<Job>>,
    counter: Arc<FlightCounter>,
    running: Option<(watch::Sender<bool>, JoinHandle<()>)>,
}

impl TriggerScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job under a single cron spec.
    pub fn add_job(&mut self, name: impl Into<String>, spec: CronSpec, run: JobFn) {
        self.add_jobs(name, vec![spec], run);
    }

    /// Register a job that fires when any of its specs matches.
    pub fn add_jobs(&mut self, name: impl Into<String>, specs: Vec<CronSpec>, run: JobFn) {
        self.jobs.push(Arc::new(Job {
            name: name.into(),
            specs,
            run,
            in_flight: AtomicBool::new(false),
        }));
    }

    #[must_use]
    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    /// Spawn the tick loop. Idempotent while running.
    pub fn start(&mut self) {
        if self.running.is_some() {
            return;
        }
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let jobs = self.jobs.clone();
        let counter = Arc::clone(&self.counter);

        let handle = tokio::spawn(async move {
            let mut tick = tokio::time::interval(Duration::from_secs(1));
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = stop_rx.changed() => break,
                    _ = tick.tick() => {}
                }
                let now = time::now();
                for job in &jobs {
                    if !job.specs.iter().any(|spec| spec.matches(now)) {
                        continue;
                    }
                    if job.in_flight.swap(true, Ordering::SeqCst) {
                        tracing::warn!(job = %job.name, "previous run still in flight, skipping firing");
                        continue;
                    }
                    counter.count.fetch_add(1, Ordering::SeqCst);
                    let guard = FlightGuard {
                        job: Arc::clone(job),
                        counter: Arc::clone(&counter),
                    };
                    tokio::spawn(async move {
                        tracing::debug!(job = %guard.job.name, "job fired");
                        (guard.job.run)().await;
                        drop(guard);
                    });
                }
            }
        });
        self.running = Some((stop_tx, handle));
    }

    /// Stop the tick loop and wait up to `grace` for in-flight jobs to
    /// finish. Returns whether the drain completed.
    pub async fn stop(&mut self, grace: Duration) -> bool {
        let Some((stop_tx, handle)) = self.running.take() else {
            return self.counter.count.load(Ordering::SeqCst) == 0;
        };
        let _ = stop_tx.send(true);
        let _ = handle.await;

        let deadline = tokio::time::Instant::now() + grace;
        while self.counter.count.load(Ordering::SeqCst) > 0 {
            let drained = self.counter.drained.notified();
            tokio::select! {
                () = drained => {}
                () = tokio::time::sleep_until(deadline) => {
                    return self.counter.count.load(Ordering::SeqCst) == 0;
                }
            }
        }
        true
    }
}
