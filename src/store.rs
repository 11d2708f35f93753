//! Last-published snapshots of the tracked team's data.
//!
//! The crawler is the only writer; command handlers read concurrently.
//! Each slot is replaced wholesale in one publish, so readers always get a
//! fully formed value from some past cycle, never a partial write. Reads
//! clone the value out and hold no lock afterwards. The sequence caps
//! (5 upcoming, 3 results) are enforced here, at publish time.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::models::{
    LiveMatch, MatchResult, Player, UpcomingMatch, MAX_RESULTS, MAX_STREAMS, MAX_UPCOMING,
};

#[derive(Default)]
struct Slots {
    roster: RwLock<Vec<Player>>,
    upcoming: RwLock<Vec<UpcomingMatch>>,
    results: RwLock<Vec<MatchResult>>,
    live: RwLock<Option<LiveMatch>>,
}

#[derive(Clone, Default)]
pub struct SnapshotStore {
    slots: Arc<Slots>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn roster(&self) -> Vec<Player> {
        self.slots.roster.read().await.clone()
    }

    pub async fn upcoming(&self) -> Vec<UpcomingMatch> {
        self.slots.upcoming.read().await.clone()
    }

    pub async fn results(&self) -> Vec<MatchResult> {
        self.slots.results.read().await.clone()
    }

    pub async fn live(&self) -> Option<LiveMatch> {
        self.slots.live.read().await.clone()
    }

    pub async fn publish_roster(&self, roster: Vec<Player>) {
        *self.slots.roster.write().await = roster;
    }

    pub async fn publish_upcoming(&self, mut matches: Vec<UpcomingMatch>) {
        matches.truncate(MAX_UPCOMING);
        *self.slots.upcoming.write().await = matches;
    }

    pub async fn publish_results(&self, mut results: Vec<MatchResult>) {
        results.truncate(MAX_RESULTS);
        *self.slots.results.write().await = results;
    }

    pub async fn publish_live(&self, mut live: LiveMatch) {
        live.stream_links.truncate(MAX_STREAMS);
        *self.slots.live.write().await = Some(live);
    }

    pub async fn clear_live(&self) {
        *self.slots.live.write().await = None;
    }
}
