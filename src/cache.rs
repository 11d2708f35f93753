//! TTL-based cache of rendered pages.
//!
//! Browser fetches cost seconds; most crawl cycles can reuse the page
//! fetched a few minutes ago. Entries carry the category they were fetched
//! for, so team-info pages live ~1 hour while match listings go stale after
//! ~10 minutes. An expired entry is never served: the caller either gets a
//! fresh document or the fetch failure, and decides itself whether to fall
//! back to the last published snapshot.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::debug;

use crate::error::FetchError;
use crate::fetch::Document;

/// Which TTL a cached page is held under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageCategory {
    /// Roster / team info pages (long-lived).
    TeamInfo,
    /// Upcoming-match and result listings (short-lived).
    Matches,
}

struct CacheEntry {
    doc: Document,
    category: PageCategory,
    fetched_at: tokio::time::Instant,
}

/// Thread-safe page cache keyed by URL.
#[derive(Clone)]
pub struct DocumentCache {
    inner: Arc<RwLock<HashMap<String, CacheEntry>>>,
    team_info_ttl: Duration,
    matches_ttl: Duration,
}

impl DocumentCache {
    pub fn new(team_info_ttl: Duration, matches_ttl: Duration) -> Self {
        DocumentCache {
            inner: Arc::new(RwLock::new(HashMap::new())),
            team_info_ttl,
            matches_ttl,
        }
    }

    fn ttl(&self, category: PageCategory) -> Duration {
        match category {
            PageCategory::TeamInfo => self.team_info_ttl,
            PageCategory::Matches => self.matches_ttl,
        }
    }

    /// Serve the cached document while fresh, otherwise run `fetch` and
    /// store its result. A failed fetch is returned as-is; the expired entry
    /// is neither served nor replaced.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        url: &str,
        category: PageCategory,
        fetch: F,
    ) -> Result<Document, FetchError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Document, FetchError>>,
    {
        {
            let cache = self.inner.read().await;
            if let Some(entry) = cache.get(url) {
                if entry.fetched_at.elapsed() < self.ttl(entry.category) {
                    debug!("Cache hit for {}", url);
                    return Ok(entry.doc.clone());
                }
            }
        }

        let doc = fetch().await?;
        let mut cache = self.inner.write().await;
        cache.insert(
            url.to_string(),
            CacheEntry {
                doc: doc.clone(),
                category,
                fetched_at: tokio::time::Instant::now(),
            },
        );
        Ok(doc)
    }

    /// Drop every entry past its own TTL to bound memory.
    pub async fn sweep(&self) {
        let mut cache = self.inner.write().await;
        let before = cache.len();
        let (team_info_ttl, matches_ttl) = (self.team_info_ttl, self.matches_ttl);
        cache.retain(|_, entry| {
            let ttl = match entry.category {
                PageCategory::TeamInfo => team_info_ttl,
                PageCategory::Matches => matches_ttl,
            };
            entry.fetched_at.elapsed() < ttl
        });
        if cache.len() < before {
            debug!("Cache sweep: {} -> {} entries", before, cache.len());
        }
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }
}
