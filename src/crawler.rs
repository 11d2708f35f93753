//! Adaptive crawl orchestrator.
//!
//! One self-rescheduling loop drives every fetch: a cycle runs to
//! completion, the next delay is derived from the state the cycle ended in,
//! and only then is the next cycle scheduled. Cadence shifts between idle
//! (base interval), match-day alert (short) and live coverage (very short,
//! where each cycle costs two browser fetches: the live index plus the
//! match detail page). Fetch failures are logged and treated as "no change";
//! the last published snapshot stays available to readers.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::cache::{DocumentCache, PageCategory};
use crate::extract::Extractor;
use crate::fetch::PageFetcher;
use crate::store::SnapshotStore;

// Readiness markers per page kind.
const ROSTER_READY: &str = "div.bodyshot-team.g-grid";
const MATCHES_READY: &str = ".table-container.match-table";
const LIVE_INDEX_READY: &str = ".live-matches-wrapper";
const MATCH_DETAIL_READY: &str = ".standard-box.veto-box";

/// Scheduling state, recomputed at the end of every cycle and never
/// persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    /// No match today, no live match.
    Idle,
    /// A match is scheduled for today (or has no usable date) but is not
    /// confirmed live yet.
    MatchToday,
    /// The tracked team is playing right now.
    Live,
}

pub struct CrawlerConfig {
    pub base_url: String,
    pub team_code: String,
    pub team_slug: String,
    pub idle_interval: Duration,
    pub match_day_interval: Duration,
    pub live_interval: Duration,
}

pub struct Crawler {
    cfg: CrawlerConfig,
    fetcher: Arc<dyn PageFetcher>,
    cache: DocumentCache,
    extractor: Arc<dyn Extractor>,
    store: SnapshotStore,
}

impl Crawler {
    pub fn new(
        cfg: CrawlerConfig,
        fetcher: Arc<dyn PageFetcher>,
        cache: DocumentCache,
        extractor: Arc<dyn Extractor>,
        store: SnapshotStore,
    ) -> Self {
        Crawler {
            cfg,
            fetcher,
            cache,
            extractor,
            store,
        }
    }

    /// Scheduling loop. The first cycle runs immediately so snapshots are
    /// populated right after boot.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Crawler started for team {} '{}' via {} (idle interval {:?})",
            self.cfg.team_code,
            self.cfg.team_slug,
            self.fetcher.name(),
            self.cfg.idle_interval
        );
        loop {
            let state = self.run_cycle().await;
            let delay = jittered(self.base_cadence(state));
            debug!("Cycle done in state {:?}, next poll in {:?}", state, delay);
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.changed() => {
                    info!("Crawler stopping");
                    return;
                }
            }
        }
    }

    /// One complete, serialized unit of work. Returns the state the next
    /// delay is computed from.
    pub async fn run_cycle(&self) -> PollState {
        self.refresh_team_pages().await;

        // Only spend live-index fetches when they can tell us something:
        // while a live match is published (to refresh or clear it), or on a
        // match day (to catch the match going live).
        if self.store.live().await.is_some() || self.has_match_today().await {
            self.poll_live_index().await;
        }

        self.cache.sweep().await;
        self.current_state().await
    }

    async fn current_state(&self) -> PollState {
        if self.store.live().await.is_some() {
            PollState::Live
        } else if self.has_match_today().await {
            PollState::MatchToday
        } else {
            PollState::Idle
        }
    }

    pub fn base_cadence(&self, state: PollState) -> Duration {
        match state {
            PollState::Idle => self.cfg.idle_interval,
            PollState::MatchToday => self.cfg.match_day_interval,
            PollState::Live => self.cfg.live_interval,
        }
    }

    async fn has_match_today(&self) -> bool {
        self.store
            .upcoming()
            .await
            .iter()
            .any(|m| m.date.is_today_candidate())
    }

    /// Refresh roster, upcoming matches and results through the cache.
    /// Failures keep the previous snapshot ("serve last known good").
    async fn refresh_team_pages(&self) {
        let info_url = format!(
            "{}/team/{}/{}#tab-infoBox",
            self.cfg.base_url, self.cfg.team_code, self.cfg.team_slug
        );
        let fetched = self
            .cache
            .get_or_fetch(&info_url, PageCategory::TeamInfo, || {
                self.fetcher.fetch(&info_url, ROSTER_READY)
            })
            .await;
        match fetched {
            Ok(doc) => self.store.publish_roster(self.extractor.roster(&doc)).await,
            Err(e) => warn!("Roster refresh failed, keeping last snapshot: {}", e),
        }

        let matches_url = format!(
            "{}/team/{}/{}#tab-matchesBox",
            self.cfg.base_url, self.cfg.team_code, self.cfg.team_slug
        );
        let fetched = self
            .cache
            .get_or_fetch(&matches_url, PageCategory::Matches, || {
                self.fetcher.fetch(&matches_url, MATCHES_READY)
            })
            .await;
        match fetched {
            Ok(doc) => {
                self.store
                    .publish_upcoming(self.extractor.upcoming(&doc))
                    .await;
                self.store
                    .publish_results(self.extractor.results(&doc))
                    .await;
            }
            Err(e) => warn!("Match list refresh failed, keeping last snapshot: {}", e),
        }
    }

    /// Check the live-matches index for the tracked team and republish or
    /// clear the live snapshot. The index is always fetched fresh; a cached
    /// copy could hide a match that just went live.
    async fn poll_live_index(&self) {
        let index_url = format!("{}/matches", self.cfg.base_url);
        let index = match self.fetcher.fetch(&index_url, LIVE_INDEX_READY).await {
            Ok(doc) => doc,
            Err(e) => {
                warn!("Live index fetch failed, treating as no change: {}", e);
                return;
            }
        };

        match self.extractor.live_ref(&index) {
            Some(live) => {
                match self.fetcher.fetch(&live.match_link, MATCH_DETAIL_READY).await {
                    Ok(detail) => {
                        let state = self.extractor.live_detail(&detail, &live);
                        info!(
                            "Live: vs {} {} (maps {})",
                            state.opponent, state.current_map_score, state.maps_won
                        );
                        self.store.publish_live(state).await;
                    }
                    Err(e) => {
                        warn!("Match detail fetch failed, keeping previous live state: {}", e)
                    }
                }
            }
            None => {
                if self.store.live().await.is_some() {
                    info!("Tracked team no longer listed live, clearing live state");
                    self.store.clear_live().await;
                }
            }
        }
    }
}

fn jittered(base: Duration) -> Duration {
    // +-10% so polls do not land on exact upstream-visible beats
    base.mul_f64(rand::thread_rng().gen_range(0.9..=1.1))
}
