//! Typed job settings.
//!
//! One YAML document describes a crawl job. Every section has defaults, so a
//! minimal file only needs the `namespace`:
//!
//! ```yaml
//! namespace: club_pages
//! store:
//!   uri: redis://127.0.0.1:6379
//! seeds:
//!   start_urls:
//!     - https://sofifa.com/teams/club/
//! ```
use chrono::NaiveDate;
use frontier_store::StoreParams;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use crate::{ConfigError, Configurable, KeyTemplates};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub uri: String,
    pub socket_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub retry_on_timeout: bool,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            uri: "redis://127.0.0.1:6379".to_string(),
            socket_timeout_secs: 30,
            connect_timeout_secs: 30,
            retry_on_timeout: true,
        }
    }
}

impl StoreSettings {
    pub fn params(&self) -> StoreParams {
        StoreParams {
            uri: self.uri.clone(),
            socket_timeout: Duration::from_secs(self.socket_timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            retry_on_timeout: self.retry_on_timeout,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedSettings {
    pub start_urls: Vec<String>,
    /// Extra start urls, one per line.
    pub start_urls_file: Option<PathBuf>,
    /// Seeding pauses while the backlog is longer than this.
    pub max_backlog: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub initial_interval_ms: u64,
    pub max_interval_secs: u64,
    /// Total time spent retrying one store call before the job halts.
    pub max_elapsed_secs: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            initial_interval_ms: 500,
            max_interval_secs: 10,
            max_elapsed_secs: 120,
        }
    }
}

impl RetrySettings {
    pub fn initial_interval(&self) -> Duration {
        Duration::from_millis(self.initial_interval_ms)
    }

    pub fn max_interval(&self) -> Duration {
        Duration::from_secs(self.max_interval_secs)
    }

    pub fn max_elapsed(&self) -> Duration {
        Duration::from_secs(self.max_elapsed_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerSettings {
    pub idle_delay_ms: u64,
    /// Stop after this many consecutive empty polls.
    pub max_idle_polls: Option<u32>,
    pub request_limit: Option<usize>,
    /// Wall-clock cap for one worker run.
    pub close_timeout_secs: Option<u64>,
    pub handler_timeout_secs: u64,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            idle_delay_ms: 1000,
            max_idle_polls: None,
            request_limit: None,
            close_timeout_secs: None,
            handler_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub to_file: bool,
    pub file: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            to_file: false,
            file: None,
        }
    }
}

impl LoggingSettings {
    /// Log file for this job, `<namespace>_log_<date>.txt` unless a path is
    /// configured. `None` when file logging is off.
    pub fn file_path(&self, namespace: &str, today: NaiveDate) -> Option<PathBuf> {
        if !self.to_file {
            return None;
        }
        Some(
            self.file.clone().unwrap_or_else(|| {
                PathBuf::from(format!("{namespace}_log_{today}.txt"))
            }),
        )
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontierSettings {
    pub namespace: String,
    pub store: StoreSettings,
    pub keys: KeyTemplates,
    pub seeds: SeedSettings,
    pub retry: RetrySettings,
    pub worker: WorkerSettings,
    pub logging: LoggingSettings,
    #[serde(skip)]
    raw: serde_yaml::Value,
}

impl Configurable for FrontierSettings {
    fn config(&self) -> &serde_yaml::Value {
        &self.raw
    }
}

impl FrontierSettings {
    /// Settings with defaults everywhere except the namespace.
    pub fn for_namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..Default::default()
        }
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = Self::load_config(path)?;
        Self::from_value(raw)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let raw: serde_yaml::Value = serde_yaml::from_str(content)?;
        Self::from_value(raw)
    }

    fn from_value(raw: serde_yaml::Value) -> Result<Self, ConfigError> {
        let mut settings: FrontierSettings = serde_yaml::from_value(raw.clone())?;
        settings.raw = raw;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let namespace = self.namespace.trim();
        if namespace.is_empty() {
            return Err(ConfigError::Invalid("namespace is empty".to_string()));
        }
        if namespace.chars().any(char::is_whitespace) {
            return Err(ConfigError::Invalid(format!(
                "namespace {namespace:?} contains whitespace"
            )));
        }
        self.keys.validate()?;
        if !self.keys.queue_is_namespaced() {
            warn!(
                "queue_key {:?} has no %(spider)s placeholder; jobs on this store share one backlog",
                self.keys.queue_key
            );
        }
        if self.store.socket_timeout_secs == 0 || self.store.connect_timeout_secs == 0
        {
            return Err(ConfigError::Invalid(
                "store timeouts must be positive".to_string(),
            ));
        }
        if self.retry.initial_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "retry.initial_interval_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Configured start urls followed by those in `seeds.start_urls_file`.
    pub fn start_urls(&self) -> Result<Vec<String>, ConfigError> {
        let mut urls = self.seeds.start_urls.clone();
        if let Some(path) = &self.seeds.start_urls_file {
            let lines = Self::load_text_file_lines(path)?;
            debug!("Loaded {} start urls from {}", lines.len(), path.display());
            urls.extend(lines);
        }
        Ok(urls)
    }

    pub fn queue_key(&self) -> String {
        self.keys.queue_key(&self.namespace)
    }

    pub fn dupefilter_key(&self) -> String {
        self.keys.dupefilter_key(&self.namespace)
    }

    pub fn start_urls_key(&self) -> String {
        self.keys.start_urls_key(&self.namespace)
    }

    pub fn pipeline_key(&self, url: &str) -> String {
        self.keys.pipeline_key(&self.namespace, url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    const JOB_YAML: &str = r#"
    namespace: club_pages
    store:
      uri: redis://redis:6379/1
      socket_timeout_secs: 10
    seeds:
      start_urls:
        - https://sofifa.com/teams/club/
      max_backlog: 5000
    worker:
      max_idle_polls: 3
      close_timeout_secs: 3600
    logging:
      level: debug
    pipeline:
      collection: club_urls
    "#;

    #[test]
    fn test_parse_job_settings() {
        let settings = FrontierSettings::from_yaml_str(JOB_YAML).unwrap();

        assert_eq!(settings.namespace, "club_pages");
        assert_eq!(settings.store.uri, "redis://redis:6379/1");
        assert_eq!(settings.store.socket_timeout_secs, 10);
        assert_eq!(settings.store.connect_timeout_secs, 30);
        assert!(settings.store.retry_on_timeout);
        assert_eq!(settings.seeds.max_backlog, Some(5000));
        assert_eq!(settings.worker.max_idle_polls, Some(3));
        assert_eq!(settings.worker.handler_timeout_secs, 30);
        assert_eq!(settings.logging.level, "debug");
        assert_eq!(settings.keys, KeyTemplates::default());
    }

    #[test]
    fn test_unknown_sections_reachable_by_dot_path() {
        let settings = FrontierSettings::from_yaml_str(JOB_YAML).unwrap();
        assert_eq!(
            settings
                .get_config_value("pipeline.collection")
                .and_then(|v| v.as_str()),
            Some("club_urls")
        );
    }

    #[test]
    fn test_rendered_keys() {
        let settings = FrontierSettings::for_namespace("player_details");

        assert_eq!(settings.queue_key(), "club_queue");
        assert_eq!(settings.dupefilter_key(), "player_details:dupefilter");
        assert_eq!(settings.start_urls_key(), "club_urls");
        assert_eq!(
            settings.pipeline_key("https://sofifa.com/player/1"),
            "player_details:https://sofifa.com/player/1:items"
        );
    }

    #[test]
    fn test_store_params() {
        let settings = FrontierSettings::from_yaml_str(JOB_YAML).unwrap();
        let params = settings.store.params();

        assert_eq!(params.uri, "redis://redis:6379/1");
        assert_eq!(params.socket_timeout, Duration::from_secs(10));
        assert_eq!(params.connect_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_missing_namespace_rejected() {
        let result = FrontierSettings::from_yaml_str("store:\n  uri: redis://x\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_namespace_with_whitespace_rejected() {
        let result = FrontierSettings::from_yaml_str("namespace: club pages\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_shared_queue_key_only_warns() {
        let shared = FrontierSettings::from_yaml_str("namespace: club_pages\n").unwrap();
        assert!(!shared.keys.queue_is_namespaced());

        let yaml = "namespace: club_pages\nkeys:\n  queue_key: \"%(spider)s:requests\"\n";
        let isolated = FrontierSettings::from_yaml_str(yaml).unwrap();
        assert_eq!(isolated.queue_key(), "club_pages:requests");
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let yaml = "namespace: a\nstore:\n  socket_timeout_secs: 0\n";
        assert!(FrontierSettings::from_yaml_str(yaml).is_err());
    }

    #[test]
    fn test_start_urls_merges_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("start_urls.txt");
        let mut file = File::create(&file_path).unwrap();
        writeln!(file, "https://sofifa.com/players\n# skip me").unwrap();

        let mut settings = FrontierSettings::for_namespace("club_pages");
        settings.seeds.start_urls = vec!["https://sofifa.com/teams/club/".into()];
        settings.seeds.start_urls_file = Some(file_path);

        assert_eq!(
            settings.start_urls().unwrap(),
            vec!["https://sofifa.com/teams/club/", "https://sofifa.com/players"]
        );
    }

    #[test]
    fn test_from_yaml_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("job.yml");
        std::fs::write(&path, JOB_YAML).unwrap();

        let settings = FrontierSettings::from_yaml_file(&path).unwrap();
        assert_eq!(settings.namespace, "club_pages");
    }

    #[test]
    fn test_log_file_path() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let mut logging = LoggingSettings::default();
        assert_eq!(logging.file_path("club_pages", today), None);

        logging.to_file = true;
        assert_eq!(
            logging.file_path("club_pages", today),
            Some(PathBuf::from("club_pages_log_2024-03-01.txt"))
        );

        logging.file = Some(PathBuf::from("/var/log/crawl.txt"));
        assert_eq!(
            logging.file_path("club_pages", today),
            Some(PathBuf::from("/var/log/crawl.txt"))
        );
    }
}
