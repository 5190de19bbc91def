#![deny(clippy::unwrap_used)]
use async_trait::async_trait;
use derive_builder::Builder;
use frontier_config::WorkerSettings;
use serde::Serialize;
use std::{sync::Arc, time::Duration};
use tokio::{
    signal,
    sync::broadcast::{self, error::TryRecvError},
    time::Instant,
};
use tracing::{Instrument, error, info, instrument, warn};

use crate::{FrontierError, Request, Scheduler};

/// The fetch-and-extract side of a crawl: fetch the page behind `request`,
/// hand its record to storage under the scheduler's correlation key, and
/// return the links found on it. The frontier never looks inside a page.
#[async_trait]
pub trait PageHandler: Send + Sync {
    async fn handle(&self, request: &Request) -> anyhow::Result<Vec<Request>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkerId(usize);

impl WorkerId {
    pub fn new(id: usize) -> Self {
        Self(id)
    }

    pub fn get(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for WorkerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Builder, Clone, Debug)]
#[builder(public, setter(into))]
pub struct WorkerOptions {
    #[builder(default = "Duration::from_secs(1)")]
    pub idle_delay: Duration,
    #[builder(default = "None")]
    pub max_idle_polls: Option<u32>,
    #[builder(default = "None")]
    pub request_limit: Option<usize>,
    #[builder(default = "None")]
    pub close_timeout: Option<Duration>,
    #[builder(default = "Duration::from_secs(30)")]
    pub handler_timeout: Duration,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self::from_settings(&WorkerSettings::default())
    }
}

impl WorkerOptions {
    pub fn from_settings(settings: &WorkerSettings) -> Self {
        Self {
            idle_delay: Duration::from_millis(settings.idle_delay_ms),
            max_idle_polls: settings.max_idle_polls,
            request_limit: settings.request_limit,
            close_timeout: settings.close_timeout_secs.map(Duration::from_secs),
            handler_timeout: Duration::from_secs(settings.handler_timeout_secs),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct WorkerStats {
    pub total_execution_time: Duration,
    pub requests_processed: usize,
    pub requests_succeeded: usize,
    pub requests_failed: usize,
    /// Links this worker got admitted into the frontier.
    pub links_discovered: usize,
}

impl WorkerStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_execution_time(&mut self, duration: Duration) {
        self.total_execution_time += duration;
        self.requests_processed += 1;
    }

    pub fn record_success(&mut self, discovered: usize) {
        self.requests_succeeded += 1;
        self.links_discovered += discovered;
    }

    pub fn record_failure(&mut self) {
        self.requests_failed += 1;
    }

    pub fn average_execution_time(&self) -> Duration {
        if self.requests_processed == 0 {
            return Duration::ZERO;
        }
        match u32::try_from(self.requests_processed) {
            Ok(processed) => self.total_execution_time / processed,
            Err(_) => self
                .total_execution_time
                .div_f64(self.requests_processed as f64),
        }
    }
}

pub struct Worker<H> {
    worker_id: WorkerId,
    scheduler: Arc<Scheduler>,
    handler: Arc<H>,
    idle_polls: u32,
    pub stats: WorkerStats,
    pub options: WorkerOptions,
}

/// Pops a request, runs the page handler over it and reports what the page
/// linked to. A request whose handler fails or times out is dropped: nothing
/// in the frontier can requeue it, since its fingerprint is already recorded.
impl<H> Worker<H>
where
    H: PageHandler + 'static,
{
    pub fn new(
        worker_id: WorkerId,
        scheduler: Arc<Scheduler>,
        handler: Arc<H>,
        options: WorkerOptions,
    ) -> Self {
        Self {
            worker_id,
            scheduler,
            handler,
            idle_polls: 0,
            stats: WorkerStats::new(),
            options,
        }
    }

    pub fn id(&self) -> WorkerId {
        self.worker_id
    }

    pub fn get_stats(&self) -> &WorkerStats {
        &self.stats
    }

    /// One step of the worker life-cycle.
    ///
    /// Returns `Ok(false)` once the worker should stop (request limit or idle
    /// limit reached). Store failures that outlast the retry budget come back
    /// as `Err` and halt the worker.
    pub async fn run_once(&mut self) -> Result<bool, FrontierError> {
        if let Some(limit) = self.options.request_limit {
            if self.stats.requests_processed >= limit {
                warn!("request_limit reached: {}", limit);
                return Ok(false);
            }
        }

        let Some(request) = self.scheduler.next_request().await? else {
            self.idle_polls += 1;
            if let Some(max) = self.options.max_idle_polls {
                if self.idle_polls >= max {
                    info!("Frontier empty after {} polls, stopping", self.idle_polls);
                    return Ok(false);
                }
            }
            warn!("No requests found, waiting...");
            tokio::time::sleep(self.options.idle_delay).await;
            return Ok(true);
        };
        self.idle_polls = 0;

        let start_time = std::time::Instant::now();
        let outcome =
            tokio::time::timeout(self.options.handler_timeout, self.handler.handle(&request))
                .await;

        match outcome {
            Err(_elapsed) => {
                error!(
                    "Handler timed out after {:?} on {}, dropping",
                    self.options.handler_timeout,
                    request.url()
                );
                self.stats.record_failure();
            }
            Ok(Err(err)) => {
                error!("Handler failed on {}, dropping: {err:#}", request.url());
                self.stats.record_failure();
            }
            Ok(Ok(links)) => {
                let report = self.scheduler.report_discovered(links).await?;
                info!(
                    "Processed {} (depth {}), {} new links",
                    request.url(),
                    request.depth(),
                    report.admitted
                );
                self.stats.record_success(report.admitted);
            }
        }
        self.stats.record_execution_time(start_time.elapsed());

        Ok(true)
    }

    /// Step until told to stop. A shutdown signal is checked between steps,
    /// so the request in hand is always finished first.
    #[instrument(name = "worker", fields(worker_id = %self.worker_id), skip_all)]
    pub async fn run(
        mut self,
        mut terminate: broadcast::Receiver<()>,
    ) -> Result<WorkerStats, FrontierError> {
        let deadline = self.options.close_timeout.map(|t| Instant::now() + t);

        loop {
            match terminate.try_recv() {
                Ok(()) | Err(TryRecvError::Lagged(_)) => {
                    info!("Shutdown received");
                    break;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => {}
            }
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                info!("close_timeout reached");
                break;
            }
            if !self.run_once().await? {
                break;
            }
        }

        info!(
            processed = self.stats.requests_processed,
            succeeded = self.stats.requests_succeeded,
            failed = self.stats.requests_failed,
            discovered = self.stats.links_discovered,
            "completed"
        );
        Ok(self.stats)
    }
}

impl<H> std::fmt::Debug for Worker<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("worker_id", &self.worker_id)
            .field("options", &self.options)
            .field("stats", &self.stats)
            .finish()
    }
}

/// Run `concurrency` workers against one scheduler until each stops. Any
/// send on `shutdown` asks all of them to finish their current request and
/// exit. The first worker error is returned after every worker has ended.
pub async fn run_workers<H>(
    scheduler: Arc<Scheduler>,
    handler: Arc<H>,
    options: WorkerOptions,
    concurrency: usize,
    shutdown: &broadcast::Sender<()>,
) -> Result<Vec<WorkerStats>, FrontierError>
where
    H: PageHandler + 'static,
{
    let mut handles = Vec::with_capacity(concurrency);
    for i in 1..=concurrency {
        let worker = Worker::new(
            WorkerId::new(i),
            scheduler.clone(),
            handler.clone(),
            options.clone(),
        );
        let span = tracing::info_span!("workers", namespace = %scheduler.namespace());
        handles.push(tokio::spawn(worker.run(shutdown.subscribe()).instrument(span)));
    }

    let mut stats = Vec::with_capacity(concurrency);
    let mut first_error = None;
    for (i, handle) in handles.into_iter().enumerate() {
        match handle.await {
            Ok(Ok(worker_stats)) => stats.push(worker_stats),
            Ok(Err(err)) => {
                error!("[{}] Worker halted: {err}", i + 1);
                if first_error.is_none() {
                    first_error = Some(err);
                }
            }
            Err(err) => error!("[{}] Fatal error in one of the workers: {:?}", i + 1, err),
        }
    }

    scheduler.log_summary();
    match first_error {
        Some(err) => Err(err),
        None => Ok(stats),
    }
}

/// Forward ctrl+c to `shutdown` so running workers stop gracefully.
pub fn shutdown_on_ctrl_c(shutdown: broadcast::Sender<()>) {
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                warn!("Ctrl+C received, stopping workers after their current request...");
                let _ = shutdown.send(());
            }
            Err(err) => error!("Failed to listen for ctrl+c event: {err}"),
        }
    });
}
