use derive_builder::Builder;
use std::time::Duration;

/// Connection parameters for a networked store.
///
/// Defaults follow the crawler's sane connection settings: 30 seconds for
/// both socket and connect timeout, with transport-level retry on timeout.
#[derive(Builder, Clone, Debug, PartialEq)]
#[builder(public, setter(into))]
pub struct StoreParams {
    #[builder(default = "\"redis://127.0.0.1:6379\".to_string()")]
    pub uri: String,
    #[builder(default = "Duration::from_secs(30)")]
    pub socket_timeout: Duration,
    #[builder(default = "Duration::from_secs(30)")]
    pub connect_timeout: Duration,
    #[builder(default = "true")]
    pub retry_on_timeout: bool,
}

impl Default for StoreParams {
    fn default() -> Self {
        Self {
            uri: "redis://127.0.0.1:6379".to_string(),
            socket_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(30),
            retry_on_timeout: true,
        }
    }
}
