use chrono::Local;
use frontier_config::LoggingSettings;
use std::{fs::OpenOptions, sync::Mutex};
use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber for a job.
///
/// `RUST_LOG` wins over the configured level. With `to_file` on, output goes
/// to the configured file (or `<namespace>_log_<date>.txt`) without colors.
pub fn init_logging(settings: &LoggingSettings, namespace: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))?;

    match settings.file_path(namespace, Local::now().date_naive()) {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(&path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
                .map_err(|e| anyhow::anyhow!("{e}"))?;
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .try_init()
                .map_err(|e| anyhow::anyhow!("{e}"))?;
        }
    }
    Ok(())
}
