//! Scheduler: the one surface workers talk to.
//!
//! `next_request` pops the backlog; `report_discovered` runs freshly found
//! links through the duplicate filter and pushes only the admitted ones.
//! Filter check and push are two separate store calls. Two workers can
//! therefore both see "admitted" for equivalent candidates in the gap before
//! either push lands, which costs at most a few duplicate queue entries and
//! is accepted; no lock is taken to close it.
//!
//! Store calls are retried. A push whose reply times out after it landed is
//! pushed again, so that request shows up twice in the backlog. A filter add
//! in the same situation reads back as rejected and the link is lost.
//!
//! There is no retry queue here. A request that failed to fetch and is
//! resubmitted unchanged is rejected by the filter like any other duplicate.
use frontier_config::{FrontierSettings, KeyTemplates};
use frontier_store::AbstractStore;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

use crate::{
    Admission, DupeFilter, FrontierError, FrontierQueue, Request, RetryPolicy,
    fingerprint::{Fingerprint, canonicalize_url, fingerprint},
};

/// Outcome of admitting a batch of candidates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AdmissionReport {
    pub admitted: usize,
    pub rejected: usize,
    pub invalid: usize,
}

impl AdmissionReport {
    pub fn total(&self) -> usize {
        self.admitted + self.rejected + self.invalid
    }
}

/// What `report_discovered` did with one page's links.
pub type DiscoveryReport = AdmissionReport;

impl std::ops::AddAssign for AdmissionReport {
    fn add_assign(&mut self, other: Self) {
        self.admitted += other.admitted;
        self.rejected += other.rejected;
        self.invalid += other.invalid;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerStats {
    pub admitted: u64,
    pub rejected: u64,
    pub invalid: u64,
    pub popped: u64,
}

#[derive(Debug, Default)]
struct Counters {
    admitted: AtomicU64,
    rejected: AtomicU64,
    invalid: AtomicU64,
    popped: AtomicU64,
}

impl Counters {
    fn record(&self, report: &AdmissionReport) {
        self.admitted
            .fetch_add(report.admitted as u64, Ordering::Relaxed);
        self.rejected
            .fetch_add(report.rejected as u64, Ordering::Relaxed);
        self.invalid.fetch_add(report.invalid as u64, Ordering::Relaxed);
    }

    fn snapshot(&self) -> SchedulerStats {
        SchedulerStats {
            admitted: self.admitted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            invalid: self.invalid.load(Ordering::Relaxed),
            popped: self.popped.load(Ordering::Relaxed),
        }
    }
}

pub struct Scheduler {
    namespace: String,
    keys: KeyTemplates,
    dupefilter: DupeFilter,
    queue: FrontierQueue,
    retry: RetryPolicy,
    counters: Counters,
}

impl Scheduler {
    pub fn new(
        namespace: impl Into<String>,
        keys: KeyTemplates,
        dupefilter: DupeFilter,
        queue: FrontierQueue,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            keys,
            dupefilter,
            queue,
            retry,
            counters: Counters::default(),
        }
    }

    /// Wire filter, queue and retry policy for the job in `settings`.
    pub fn from_settings(store: AbstractStore, settings: &FrontierSettings) -> Self {
        Self::new(
            settings.namespace.clone(),
            settings.keys.clone(),
            DupeFilter::for_namespace(store.clone(), settings),
            FrontierQueue::for_namespace(store, settings),
            RetryPolicy::from_settings(&settings.retry),
        )
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn dupefilter(&self) -> &DupeFilter {
        &self.dupefilter
    }

    pub fn queue(&self) -> &FrontierQueue {
        &self.queue
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Pop the next request for this worker. `None` means the backlog is
    /// empty right now, not that the crawl is over.
    pub async fn next_request(&self) -> Result<Option<Request>, FrontierError> {
        let request = self.retry.run("pop", || self.queue.pop()).await?;
        if request.is_some() {
            self.counters.popped.fetch_add(1, Ordering::Relaxed);
        }
        Ok(request)
    }

    /// Admit a single request. Malformed urls fail with `InvalidRequest`.
    pub async fn enqueue(&self, request: Request) -> Result<Admission, FrontierError> {
        let fingerprint = fingerprint(&request)?;
        let admission = self
            .retry
            .run("test_and_set", || self.dupefilter.test_and_set(&fingerprint))
            .await?;
        if admission.is_admitted() {
            self.retry.run("push", || self.queue.push(&request)).await?;
        }

        let report = match admission {
            Admission::Admitted => AdmissionReport {
                admitted: 1,
                ..Default::default()
            },
            Admission::Rejected => AdmissionReport {
                rejected: 1,
                ..Default::default()
            },
        };
        self.counters.record(&report);
        Ok(admission)
    }

    /// Run links found on a page through the filter and push the unseen ones.
    /// Malformed candidates are logged and dropped; they never fail the call.
    pub async fn report_discovered(
        &self,
        candidates: Vec<Request>,
    ) -> Result<DiscoveryReport, FrontierError> {
        let report = self.admit(candidates).await?;
        debug!(
            admitted = report.admitted,
            rejected = report.rejected,
            invalid = report.invalid,
            "report_discovered"
        );
        Ok(report)
    }

    pub(crate) async fn admit(
        &self,
        candidates: Vec<Request>,
    ) -> Result<AdmissionReport, FrontierError> {
        let mut report = AdmissionReport::default();
        let mut fingerprinted: Vec<(Fingerprint, Request)> =
            Vec::with_capacity(candidates.len());

        for candidate in candidates {
            match fingerprint(&candidate) {
                Ok(fp) => fingerprinted.push((fp, candidate)),
                Err(e) => {
                    warn!("Dropping candidate: {e}");
                    report.invalid += 1;
                }
            }
        }

        if !fingerprinted.is_empty() {
            let fingerprints: Vec<Fingerprint> =
                fingerprinted.iter().map(|(fp, _)| fp.clone()).collect();
            let admissions = self
                .retry
                .run("test_and_set_many", || {
                    self.dupefilter.test_and_set_many(&fingerprints)
                })
                .await?;

            let mut admitted = Vec::new();
            for ((_, request), admission) in fingerprinted.into_iter().zip(admissions) {
                match admission {
                    Admission::Admitted => admitted.push(request),
                    Admission::Rejected => report.rejected += 1,
                }
            }

            if !admitted.is_empty() {
                self.retry
                    .run("push_many", || self.queue.push_many(&admitted))
                    .await?;
                report.admitted = admitted.len();
            }
        }

        self.counters.record(&report);
        Ok(report)
    }

    /// Current backlog length, for monitoring and seeding backpressure.
    pub async fn backlog(&self) -> Result<u64, FrontierError> {
        self.retry.run("len", || self.queue.len()).await
    }

    /// Number of fingerprints admitted over the job's lifetime.
    pub async fn seen(&self) -> Result<u64, FrontierError> {
        self.retry.run("cardinality", || self.dupefilter.len()).await
    }

    pub fn stats(&self) -> SchedulerStats {
        self.counters.snapshot()
    }

    /// Key under which the storage collaborator writes the record extracted
    /// from `url`. Uses the same canonical form as the duplicate filter.
    pub fn correlation_key(&self, url: &str) -> Result<String, FrontierError> {
        let canonical = canonicalize_url(url)?;
        Ok(self.keys.pipeline_key(&self.namespace, canonical.as_str()))
    }

    pub fn log_summary(&self) {
        let stats = self.stats();
        info!(
            namespace = %self.namespace,
            admitted = stats.admitted,
            rejected = stats.rejected,
            invalid = stats.invalid,
            popped = stats.popped,
            "scheduler summary"
        );
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("namespace", &self.namespace)
            .field("dupefilter", &self.dupefilter)
            .field("queue", &self.queue)
            .field("stats", &self.stats())
            .finish()
    }
}
