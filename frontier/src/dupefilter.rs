//! Duplicate filter: a grow-only set of fingerprints per crawl job.
//!
//! Membership test and insert happen in one atomic store call, so two
//! workers racing on the same fingerprint cannot both be admitted. There is
//! no eviction; the set lives as long as the job and is what makes pause and
//! resume possible. Rotate the namespace (or purge it) between jobs.
use frontier_config::FrontierSettings;
use frontier_store::AbstractStore;
use tracing::debug;

use crate::{FrontierError, fingerprint::Fingerprint};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Not seen before; now recorded.
    Admitted,
    /// Already recorded. Expected, not an error.
    Rejected,
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted)
    }
}

impl From<bool> for Admission {
    fn from(inserted: bool) -> Self {
        if inserted {
            Admission::Admitted
        } else {
            Admission::Rejected
        }
    }
}

#[derive(Clone)]
pub struct DupeFilter {
    store: AbstractStore,
    key: String,
}

impl DupeFilter {
    pub fn new(store: AbstractStore, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// Filter scoped to the job namespace, `<namespace>:dupefilter` by default.
    pub fn for_namespace(store: AbstractStore, settings: &FrontierSettings) -> Self {
        Self::new(store, settings.dupefilter_key())
    }

    /// Filter for a run without a job, keyed by its start timestamp.
    pub fn standalone(
        store: AbstractStore,
        settings: &FrontierSettings,
        timestamp: i64,
    ) -> Self {
        Self::new(store, settings.keys.standalone_dupefilter_key(timestamp))
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub async fn test_and_set(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Admission, FrontierError> {
        let inserted = self.store.add(&self.key, fingerprint.as_str()).await?;
        let admission = Admission::from(inserted);
        debug!(key = %self.key, %fingerprint, ?admission, "test_and_set");
        Ok(admission)
    }

    /// Bulk variant; outcomes line up with `fingerprints`. A fingerprint that
    /// appears twice in the batch is admitted at most once.
    pub async fn test_and_set_many(
        &self,
        fingerprints: &[Fingerprint],
    ) -> Result<Vec<Admission>, FrontierError> {
        if fingerprints.is_empty() {
            return Ok(Vec::new());
        }
        let members: Vec<String> =
            fingerprints.iter().map(|f| f.as_str().to_string()).collect();
        let inserted = self.store.add_many(&self.key, &members).await?;
        Ok(inserted.into_iter().map(Admission::from).collect())
    }

    pub async fn contains(&self, fingerprint: &Fingerprint) -> Result<bool, FrontierError> {
        Ok(self.store.contains(&self.key, fingerprint.as_str()).await?)
    }

    pub async fn len(&self) -> Result<u64, FrontierError> {
        Ok(self.store.cardinality(&self.key).await?)
    }

    /// Drop every recorded fingerprint. Operator action between jobs only;
    /// clearing mid-job breaks the visit-once guarantee.
    pub async fn clear(&self) -> Result<(), FrontierError> {
        Ok(self.store.delete(&self.key).await?)
    }
}

impl std::fmt::Debug for DupeFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DupeFilter").field("key", &self.key).finish()
    }
}
