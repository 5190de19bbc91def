//! Crawl a synthetic club listing with a pool of workers.
//!
//! Runs against the in-memory store, so no Redis is needed:
//!
//! ```sh
//! cargo run -p frontier --example club_crawl
//! ```
//!
//! Ctrl+C stops the workers after the page each one is on.
use frontier::{
    PageHandler, Request, Scheduler, SeedLoader, WorkerOptionsBuilder,
    async_trait::async_trait,
    config::FrontierSettings,
    init_logging, run_workers, shutdown_on_ctrl_c,
    store::{AbstractStore, InMemoryStore},
};
use std::{sync::Arc, time::Duration};
use tokio::sync::broadcast;
use tracing::info;

const LISTING_PAGES: u32 = 5;
const TEAMS_PER_PAGE: u32 = 10;

/// Pretends to fetch: listing pages link to the next listing page and to
/// their teams, team pages link back to the first listing page.
struct ClubListing;

#[async_trait]
impl PageHandler for ClubListing {
    async fn handle(&self, request: &Request) -> anyhow::Result<Vec<Request>> {
        tokio::time::sleep(Duration::from_millis(50)).await;
        let url = url::Url::parse(request.url())?;

        if url.path().starts_with("/team/") {
            return Ok(vec![request.child("https://sofifa.com/teams/club/?offset=0")]);
        }

        let offset: u32 = url
            .query_pairs()
            .find(|(k, _)| k == "offset")
            .and_then(|(_, v)| v.parse().ok())
            .unwrap_or(0);
        let mut links: Vec<Request> = (0..TEAMS_PER_PAGE)
            .map(|i| request.child(format!("https://sofifa.com/team/{}/", offset + i)))
            .collect();
        if offset / TEAMS_PER_PAGE + 1 < LISTING_PAGES {
            links.push(request.child(format!(
                "https://sofifa.com/teams/club/?offset={}",
                offset + TEAMS_PER_PAGE
            )));
        }
        Ok(links)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut settings = FrontierSettings::for_namespace("club_pages");
    settings.seeds.start_urls = vec!["https://sofifa.com/teams/club/?offset=0".to_string()];
    init_logging(&settings.logging, &settings.namespace)?;

    let store: AbstractStore = Arc::new(InMemoryStore::new());
    let scheduler = Arc::new(Scheduler::from_settings(store.clone(), &settings));
    SeedLoader::from_settings(scheduler.clone(), store, &settings)
        .seed_from_settings(&settings)
        .await?;

    let (shutdown, _) = broadcast::channel(1);
    shutdown_on_ctrl_c(shutdown.clone());

    let options = WorkerOptionsBuilder::default()
        .idle_delay(Duration::from_millis(200))
        .max_idle_polls(3u32)
        .build()?;
    let stats = run_workers(scheduler.clone(), Arc::new(ClubListing), options, 4, &shutdown)
        .await?;

    let processed: usize = stats.iter().map(|s| s.requests_processed).sum();
    info!(
        "Crawled {} pages, {} fingerprints recorded",
        processed,
        scheduler.seen().await?
    );
    Ok(())
}
