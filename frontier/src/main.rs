//! `frontier` command line: operator tooling for one crawl job.
use anyhow::Context;
use clap::{Parser, Subcommand};
use frontier::{
    Scheduler, SeedLoader, init_logging,
    config::FrontierSettings,
    store::{AbstractStore, AtomicQueue, AtomicSet, RedisStore},
};
use serde::Serialize;
use std::{path::PathBuf, sync::Arc};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "frontier")]
#[command(version)]
#[command(about = "Shared crawl frontier maintenance", long_about = None)]
struct Cli {
    /// Path to the job's YAML settings
    #[arg(short, long, value_name = "CONFIG")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load configured start urls and drain the seed set into the frontier
    Seed,
    /// Add urls to the seed set for a later `seed`
    Publish {
        #[arg(required = true, value_name = "URL")]
        urls: Vec<String>,
    },
    /// Print backlog, filter and seed set sizes as JSON
    Stats,
    /// Delete the job's queue and duplicate filter
    Purge {
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Debug, Serialize)]
struct FrontierStats<'a> {
    namespace: &'a str,
    queue_key: &'a str,
    backlog: u64,
    dupefilter_key: &'a str,
    seen: u64,
    seed_key: String,
    seeds_pending: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = FrontierSettings::from_yaml_file(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    init_logging(&settings.logging, &settings.namespace)?;

    let store: AbstractStore = Arc::new(
        RedisStore::connect(settings.store.params())
            .await
            .with_context(|| format!("Failed to connect to {}", settings.store.uri))?,
    );
    let scheduler = Arc::new(Scheduler::from_settings(store.clone(), &settings));
    let seeds = SeedLoader::from_settings(scheduler.clone(), store.clone(), &settings);

    match cli.command {
        Command::Seed => {
            let report = seeds.seed_from_settings(&settings).await?;
            info!(
                "Seeding done: {} admitted, {} already seen, {} invalid",
                report.admitted, report.rejected, report.invalid
            );
        }
        Command::Publish { urls } => {
            let added = seeds.publish(&urls).await?;
            info!("Published {} of {} urls to {}", added, urls.len(), seeds.seed_key());
        }
        Command::Stats => {
            let seed_key = settings.start_urls_key();
            let seeds_pending = if settings.keys.start_urls_as_set {
                store.cardinality(&seed_key).await?
            } else {
                store.len(&seed_key).await?
            };
            let stats = FrontierStats {
                namespace: scheduler.namespace(),
                queue_key: scheduler.queue().key(),
                backlog: scheduler.backlog().await?,
                dupefilter_key: scheduler.dupefilter().key(),
                seen: scheduler.seen().await?,
                seed_key,
                seeds_pending,
            };
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Command::Purge { yes } => {
            if !yes {
                anyhow::bail!(
                    "purge deletes {} and {}; rerun with --yes",
                    scheduler.queue().key(),
                    scheduler.dupefilter().key()
                );
            }
            scheduler.queue().clear().await?;
            scheduler.dupefilter().clear().await?;
            warn!(
                "Purged {} and {}",
                scheduler.queue().key(),
                scheduler.dupefilter().key()
            );
        }
    }

    Ok(())
}
