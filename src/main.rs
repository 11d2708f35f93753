use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio::sync::watch;
use tracing::info;

mod bot;
mod cache;
mod config;
mod crawler;
mod error;
mod extract;
mod fetch;
mod models;
mod store;

use bot::{CommandRouter, TelegramBot};
use cache::DocumentCache;
use config::Config;
use crawler::{Crawler, CrawlerConfig};
use extract::{Extractor, HltvExtractor};
use fetch::browser::BrowserOptions;
use fetch::{BrowserClient, PageFetcher};
use store::SnapshotStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    info!(
        "Tracking {} (team {} '{}') on {}",
        config.team_name, config.team_code, config.team_slug, config.hltv_base_url
    );

    let browser = Arc::new(BrowserClient::new(BrowserOptions {
        chrome_binary: config.chrome_binary.clone(),
        readiness_timeout: Duration::from_secs(config.readiness_timeout_secs),
    }));
    let cache = DocumentCache::new(
        Duration::from_secs(config.team_info_ttl_secs),
        Duration::from_secs(config.matches_ttl_secs),
    );
    let store = SnapshotStore::new();
    let extractor: Arc<dyn Extractor> = Arc::new(HltvExtractor::new(
        config.team_code.clone(),
        config.hltv_base_url.clone(),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Proactive daily browser restart, independent of session health
    browser.spawn_daily_restart(shutdown_rx.clone());

    // The crawl loop is the only writer to the snapshot store
    let crawl = Crawler::new(
        CrawlerConfig {
            base_url: config.hltv_base_url.clone(),
            team_code: config.team_code.clone(),
            team_slug: config.team_slug.clone(),
            idle_interval: Duration::from_secs(config.idle_interval_secs),
            match_day_interval: Duration::from_secs(config.match_day_interval_secs),
            live_interval: Duration::from_secs(config.live_interval_secs),
        },
        Arc::clone(&browser) as Arc<dyn PageFetcher>,
        cache,
        extractor,
        store.clone(),
    );
    let crawl_handle = tokio::spawn(crawl.run(shutdown_rx.clone()));

    // Chat commands are read-only consumers of the store
    if let Some(token) = config.telegram_bot_token.clone() {
        let telegram = TelegramBot::new(token, None)?;
        let router = CommandRouter::new(store.clone(), config.team_name.clone());
        tokio::spawn(telegram.run(router, shutdown_rx.clone()));
    } else {
        info!("No TELEGRAM_BOT_TOKEN set, running the crawler without chat commands");
    }

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    // Stop the scheduling loop first, then release the browser session
    let _ = shutdown_tx.send(true);
    let _ = crawl_handle.await;
    browser.close().await;

    info!("Bye");
    Ok(())
}
