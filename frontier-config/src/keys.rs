//! Shared-store key templates.
//!
//! Templates use `%(name)s` placeholders, e.g. `%(spider)s:dupefilter`, so a
//! job's keys can be rendered from its namespace without any other state.
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::ConfigError;

static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"%\((\w+)\)s").expect("Failed to compile placeholder regex")
});

pub const SPIDER: &str = "spider";
pub const URL: &str = "url";
pub const TIMESTAMP: &str = "timestamp";

/// Substitute every `%(name)s` in `template` with the matching value from
/// `vars`. Unknown placeholders are left as they are.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    PLACEHOLDER_RE
        .replace_all(template, |caps: &regex::Captures<'_>| {
            vars.iter()
                .find(|(name, _)| *name == &caps[1])
                .map(|(_, value)| value.to_string())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn placeholders(template: &str) -> Vec<String> {
    PLACEHOLDER_RE
        .captures_iter(template)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Store key templates for one job.
///
/// The default `queue_key` (`club_queue`) has no `%(spider)s` placeholder, so
/// every namespace on the same store shares one backlog. Jobs that must not
/// see each other's requests need a queue template such as
/// `%(spider)s:requests`; the duplicate filter is per namespace either way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyTemplates {
    pub queue_key: String,
    pub dupefilter_key: String,
    /// Filter key for runs that are not tied to a job namespace.
    pub standalone_dupefilter_key: String,
    pub start_urls_key: String,
    pub start_urls_as_set: bool,
    /// Where the storage collaborator writes an extracted record.
    pub pipeline_key: String,
}

impl Default for KeyTemplates {
    fn default() -> Self {
        Self {
            queue_key: "club_queue".to_string(),
            dupefilter_key: "%(spider)s:dupefilter".to_string(),
            standalone_dupefilter_key: "dupefilter:%(timestamp)s".to_string(),
            start_urls_key: "club_urls".to_string(),
            start_urls_as_set: true,
            pipeline_key: "%(spider)s:%(url)s:items".to_string(),
        }
    }
}

impl KeyTemplates {
    /// True when the queue key differs per namespace.
    pub fn queue_is_namespaced(&self) -> bool {
        placeholders(&self.queue_key).iter().any(|name| name == SPIDER)
    }

    pub fn queue_key(&self, namespace: &str) -> String {
        render(&self.queue_key, &[(SPIDER, namespace)])
    }

    pub fn dupefilter_key(&self, namespace: &str) -> String {
        render(&self.dupefilter_key, &[(SPIDER, namespace)])
    }

    pub fn standalone_dupefilter_key(&self, timestamp: i64) -> String {
        render(
            &self.standalone_dupefilter_key,
            &[(TIMESTAMP, &timestamp.to_string())],
        )
    }

    pub fn start_urls_key(&self, namespace: &str) -> String {
        render(&self.start_urls_key, &[(SPIDER, namespace)])
    }

    pub fn pipeline_key(&self, namespace: &str, url: &str) -> String {
        render(&self.pipeline_key, &[(SPIDER, namespace), (URL, url)])
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check("queue_key", &self.queue_key, &[SPIDER], &[])?;
        check("dupefilter_key", &self.dupefilter_key, &[SPIDER], &[SPIDER])?;
        check(
            "standalone_dupefilter_key",
            &self.standalone_dupefilter_key,
            &[TIMESTAMP],
            &[TIMESTAMP],
        )?;
        check("start_urls_key", &self.start_urls_key, &[SPIDER], &[])?;
        check(
            "pipeline_key",
            &self.pipeline_key,
            &[SPIDER, URL],
            &[SPIDER, URL],
        )?;
        Ok(())
    }
}

fn check(
    field: &str,
    template: &str,
    allowed: &[&str],
    required: &[&str],
) -> Result<(), ConfigError> {
    if template.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("keys.{field} is empty")));
    }
    let found = placeholders(template);
    if let Some(unknown) = found.iter().find(|p| !allowed.contains(&p.as_str())) {
        return Err(ConfigError::Invalid(format!(
            "keys.{field}: unknown placeholder %({unknown})s"
        )));
    }
    if let Some(missing) = required.iter().find(|r| !found.iter().any(|p| p == *r)) {
        return Err(ConfigError::Invalid(format!(
            "keys.{field}: missing placeholder %({missing})s"
        )));
    }
    Ok(())
}
