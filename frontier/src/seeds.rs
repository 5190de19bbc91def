//! Seed loading.
//!
//! Start urls go through the same duplicate filter as discovered links, so
//! running the loader again after a restart re-admits nothing that was
//! already seeded. Besides the configured list, an external process can drop
//! start urls into the seed key (`club_urls` by default, a set unless
//! `start_urls_as_set` is off); `drain_seed_set` pops and loads them.
use frontier_config::FrontierSettings;
use frontier_store::AbstractStore;
use std::{sync::Arc, time::Duration};
use tracing::{debug, info};

use crate::{AdmissionReport, FrontierError, Request, Scheduler};

const SEED_BATCH: usize = 100;

/// Admission counts for one seeding run.
pub type SeedReport = AdmissionReport;

pub struct SeedLoader {
    scheduler: Arc<Scheduler>,
    store: AbstractStore,
    seed_key: String,
    as_set: bool,
    max_backlog: Option<u64>,
    backlog_poll: Duration,
}

impl SeedLoader {
    pub fn new(
        scheduler: Arc<Scheduler>,
        store: AbstractStore,
        seed_key: impl Into<String>,
        as_set: bool,
    ) -> Self {
        Self {
            scheduler,
            store,
            seed_key: seed_key.into(),
            as_set,
            max_backlog: None,
            backlog_poll: Duration::from_secs(1),
        }
    }

    pub fn from_settings(
        scheduler: Arc<Scheduler>,
        store: AbstractStore,
        settings: &FrontierSettings,
    ) -> Self {
        Self::new(
            scheduler,
            store,
            settings.start_urls_key(),
            settings.keys.start_urls_as_set,
        )
        .with_max_backlog(settings.seeds.max_backlog)
    }

    /// Hold off pushing while the backlog is longer than `max_backlog`.
    pub fn with_max_backlog(mut self, max_backlog: Option<u64>) -> Self {
        self.max_backlog = max_backlog;
        self
    }

    pub fn with_backlog_poll(mut self, poll: Duration) -> Self {
        self.backlog_poll = poll;
        self
    }

    pub fn seed_key(&self) -> &str {
        &self.seed_key
    }

    /// Admit `urls` as depth-0 GET requests.
    pub async fn load(&self, urls: &[String]) -> Result<SeedReport, FrontierError> {
        let mut report = SeedReport::default();
        for chunk in urls.chunks(SEED_BATCH) {
            self.wait_for_capacity().await?;
            let requests = chunk.iter().map(Request::get).collect();
            report += self.scheduler.admit(requests).await?;
        }
        info!(
            namespace = %self.scheduler.namespace(),
            admitted = report.admitted,
            rejected = report.rejected,
            invalid = report.invalid,
            "Seeded start urls"
        );
        Ok(report)
    }

    /// Configured start urls (inline and from file) plus the seed set.
    pub async fn seed_from_settings(
        &self,
        settings: &FrontierSettings,
    ) -> Result<AdmissionReport, FrontierError> {
        let mut report = self.load(&settings.start_urls()?).await?;
        report += self.drain_seed_set().await?;
        Ok(report)
    }

    /// Add urls to the seed key for some worker to pick up later. Returns how
    /// many were new to the seed set (list mode counts every url).
    pub async fn publish(&self, urls: &[String]) -> Result<usize, FrontierError> {
        let retry = self.scheduler.retry_policy();
        if self.as_set {
            let added = retry
                .run("seed add", || async {
                    Ok(self.store.add_many(&self.seed_key, urls).await?)
                })
                .await?;
            Ok(added.into_iter().filter(|added| *added).count())
        } else {
            retry
                .run("seed push", || async {
                    Ok(self.store.push_many(&self.seed_key, urls).await?)
                })
                .await?;
            Ok(urls.len())
        }
    }

    /// Pop everything in the seed key and load it, a batch at a time so a
    /// crash loses at most one batch of popped seeds.
    pub async fn drain_seed_set(&self) -> Result<AdmissionReport, FrontierError> {
        let mut report = AdmissionReport::default();
        loop {
            let mut batch = Vec::with_capacity(SEED_BATCH);
            while batch.len() < SEED_BATCH {
                match self.pop_seed().await? {
                    Some(url) => batch.push(url),
                    None => break,
                }
            }
            if batch.is_empty() {
                break;
            }
            let exhausted = batch.len() < SEED_BATCH;
            report += self.load(&batch).await?;
            if exhausted {
                break;
            }
        }
        Ok(report)
    }

    async fn pop_seed(&self) -> Result<Option<String>, FrontierError> {
        self.scheduler
            .retry_policy()
            .run("seed pop", || async {
                if self.as_set {
                    Ok(self.store.pop_member(&self.seed_key).await?)
                } else {
                    Ok(self.store.pop(&self.seed_key).await?)
                }
            })
            .await
    }

    async fn wait_for_capacity(&self) -> Result<(), FrontierError> {
        let Some(max_backlog) = self.max_backlog else {
            return Ok(());
        };
        loop {
            let backlog = self.scheduler.backlog().await?;
            if backlog <= max_backlog {
                return Ok(());
            }
            debug!("Backlog {backlog} over {max_backlog}, waiting");
            tokio::time::sleep(self.backlog_poll).await;
        }
    }
}

impl std::fmt::Debug for SeedLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeedLoader")
            .field("seed_key", &self.seed_key)
            .field("as_set", &self.as_set)
            .field("max_backlog", &self.max_backlog)
            .finish()
    }
}
