//! Headless-Chrome page fetcher.
//!
//! Owns the single browser session. The session mutex doubles as the fetch
//! serializer: at most one navigation is in flight, and never two live
//! Chrome processes from this client. Launching a session takes seconds, so
//! it is reused across fetches and proactively restarted once a day to bound
//! resource leakage from a long-lived Chrome process.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDateTime, NaiveTime};
use headless_chrome::{Browser, LaunchOptions};
use tokio::sync::{watch, Mutex};
use tokio::task;
use tracing::{error, info, warn};

use super::{Document, PageFetcher};
use crate::error::FetchError;

/// First try plus one retry after a session re-init.
const MAX_ATTEMPTS: u32 = 2;
/// Consecutive failed launches before the client degrades to a no-op
/// (revived only by the scheduled restart).
const MAX_INIT_FAILURES: u32 = 5;
/// Local wall-clock time of the proactive daily restart.
const DAILY_RESTART_HOUR: u32 = 4;

pub struct BrowserOptions {
    /// Explicit Chrome/Chromium binary; autodetected when `None`.
    pub chrome_binary: Option<PathBuf>,
    /// Bounded wait for the readiness marker before a fetch is abandoned.
    pub readiness_timeout: Duration,
}

/// A launched browser process. Dropping the last handle kills it.
trait BrowserSession: Send + Sync {
    /// Blocking: navigate, wait for the readiness marker, read the DOM.
    fn render(&self, url: &str, ready_selector: &str, timeout: Duration)
        -> Result<String, FetchError>;
}

/// Launches sessions. The production engine spawns Chrome; tests inject a
/// scripted one to drive the retry and degradation paths.
trait BrowserEngine: Send + Sync {
    /// Blocking: start a browser process.
    fn launch(&self, binary: Option<PathBuf>) -> anyhow::Result<Arc<dyn BrowserSession>>;
}

#[derive(Default)]
struct Session {
    handle: Option<Arc<dyn BrowserSession>>,
    init_failures: u32,
    degraded: bool,
}

pub struct BrowserClient {
    opts: BrowserOptions,
    engine: Arc<dyn BrowserEngine>,
    session: Mutex<Session>,
}

impl BrowserClient {
    pub fn new(opts: BrowserOptions) -> Self {
        BrowserClient {
            opts,
            engine: Arc::new(ChromeEngine),
            session: Mutex::new(Session::default()),
        }
    }

    #[cfg(test)]
    fn with_engine(opts: BrowserOptions, engine: Arc<dyn BrowserEngine>) -> Self {
        BrowserClient {
            opts,
            engine,
            session: Mutex::new(Session::default()),
        }
    }

    /// Reuse the live session or launch a new one. Counts consecutive launch
    /// failures and flips the client into degraded mode once the limit is hit.
    async fn ensure_session(
        &self,
        session: &mut Session,
    ) -> Result<Arc<dyn BrowserSession>, FetchError> {
        if let Some(handle) = &session.handle {
            return Ok(Arc::clone(handle));
        }
        if session.degraded {
            return Err(FetchError::SessionUnavailable);
        }

        let engine = Arc::clone(&self.engine);
        let binary = self.opts.chrome_binary.clone();
        match task::spawn_blocking(move || engine.launch(binary)).await {
            Ok(Ok(handle)) => {
                session.init_failures = 0;
                session.handle = Some(Arc::clone(&handle));
                info!("Browser session initialized");
                Ok(handle)
            }
            Ok(Err(e)) => {
                session.init_failures += 1;
                if session.init_failures >= MAX_INIT_FAILURES {
                    session.degraded = true;
                    error!(
                        "Browser launch failed {} times, degrading to no-op until next restart: {:#}",
                        session.init_failures, e
                    );
                } else {
                    error!(
                        "Failed to launch browser (consecutive failure {}): {:#}",
                        session.init_failures, e
                    );
                }
                Err(FetchError::SessionUnavailable)
            }
            Err(e) => Err(FetchError::SessionCrashed(e.to_string())),
        }
    }

    /// Tear down and relaunch the session. Clears the degraded flag so the
    /// scheduled restart can revive a client that gave up during startup.
    pub async fn restart(&self) {
        let mut session = self.session.lock().await;
        session.handle = None; // dropping the handle kills the Chrome process
        session.degraded = false;
        session.init_failures = 0;
        if self.ensure_session(&mut session).await.is_err() {
            warn!("Browser restart failed; will retry on next fetch");
        }
    }

    /// Release the browser session on shutdown.
    pub async fn close(&self) {
        let mut session = self.session.lock().await;
        if session.handle.take().is_some() {
            info!("Browser session released");
        }
    }

    /// Background task restarting the session at 04:00 local every day,
    /// regardless of session health.
    pub fn spawn_daily_restart(
        self: &Arc<Self>,
        mut shutdown: watch::Receiver<bool>,
    ) -> task::JoinHandle<()> {
        let client = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                let wait = duration_until_restart(chrono::Local::now().naive_local());
                tokio::select! {
                    _ = tokio::time::sleep(wait) => {
                        info!("Daily scheduled browser restart");
                        client.restart().await;
                        // step past the restart instant before recomputing
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                    _ = shutdown.changed() => return,
                }
            }
        })
    }
}

#[async_trait]
impl PageFetcher for BrowserClient {
    async fn fetch(&self, url: &str, ready_selector: &str) -> Result<Document, FetchError> {
        let mut session = self.session.lock().await;
        let mut last_err = FetchError::SessionUnavailable;

        for attempt in 1..=MAX_ATTEMPTS {
            let handle = self.ensure_session(&mut session).await?;
            let (u, s) = (url.to_string(), ready_selector.to_string());
            let timeout = self.opts.readiness_timeout;

            let outcome = task::spawn_blocking(move || handle.render(&u, &s, timeout))
                .await
                .map_err(|e| FetchError::SessionCrashed(e.to_string()))?;

            match outcome {
                Ok(html) => return Ok(Document::new(html)),
                Err(e) => {
                    warn!(
                        "Fetch of {} failed (attempt {}/{}): {}",
                        url, attempt, MAX_ATTEMPTS, e
                    );
                    last_err = e;
                    // force a fresh session before the retry
                    session.handle = None;
                }
            }
        }
        Err(last_err)
    }

    fn name(&self) -> &str {
        "headless-chrome"
    }
}

struct ChromeEngine;

struct ChromeSession {
    browser: Browser,
}

impl BrowserEngine for ChromeEngine {
    fn launch(&self, binary: Option<PathBuf>) -> anyhow::Result<Arc<dyn BrowserSession>> {
        let browser = launch_chrome(binary)?;
        Ok(Arc::new(ChromeSession { browser }))
    }
}

impl BrowserSession for ChromeSession {
    fn render(
        &self,
        url: &str,
        ready_selector: &str,
        timeout: Duration,
    ) -> Result<String, FetchError> {
        let tab = self
            .browser
            .new_tab()
            .map_err(|e| FetchError::SessionCrashed(format!("new tab: {e:#}")))?;

        if let Err(e) = tab.navigate_to(url) {
            let _ = tab.close(true);
            return Err(FetchError::Unreachable(format!("{url}: {e:#}")));
        }

        if tab
            .wait_for_element_with_custom_timeout(ready_selector, timeout)
            .is_err()
        {
            let _ = tab.close(true);
            return Err(FetchError::Timeout {
                url: url.to_string(),
                selector: ready_selector.to_string(),
            });
        }

        let html = tab
            .get_content()
            .map_err(|e| FetchError::SessionCrashed(format!("read content: {e:#}")));
        let _ = tab.close(true);
        html
    }
}

/// Blocking: launch a headless Chrome process.
fn launch_chrome(binary: Option<PathBuf>) -> anyhow::Result<Browser> {
    use anyhow::Context;

    let options = LaunchOptions::default_builder()
        .headless(true)
        .sandbox(false)
        .path(binary)
        .window_size(Some((1280, 720)))
        // the session must survive tens of minutes between polls; the
        // default idle timeout would reap it after seconds
        .idle_browser_timeout(Duration::from_secs(24 * 60 * 60))
        .build()
        .context("building Chrome launch options")?;
    Browser::new(options).context("launching Chrome")
}

/// Delay until the next 04:00 local restart.
fn duration_until_restart(now: NaiveDateTime) -> Duration {
    let restart_at = NaiveTime::from_hms_opt(DAILY_RESTART_HOUR, 0, 0).unwrap();
    let mut target = now.date().and_time(restart_at);
    if target <= now {
        target += chrono::Duration::days(1);
    }
    (target - now).to_std().unwrap_or(Duration::from_secs(60))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use chrono::NaiveDate;

    struct Counters {
        launches: AtomicUsize,
        renders: AtomicUsize,
        launch_ok: AtomicBool,
        render_ok: AtomicBool,
    }

    impl Counters {
        fn new() -> Arc<Self> {
            Arc::new(Counters {
                launches: AtomicUsize::new(0),
                renders: AtomicUsize::new(0),
                launch_ok: AtomicBool::new(true),
                render_ok: AtomicBool::new(true),
            })
        }
    }

    struct FakeEngine {
        c: Arc<Counters>,
    }

    struct FakeSession {
        c: Arc<Counters>,
    }

    impl BrowserEngine for FakeEngine {
        fn launch(&self, _binary: Option<PathBuf>) -> anyhow::Result<Arc<dyn BrowserSession>> {
            self.c.launches.fetch_add(1, Ordering::SeqCst);
            if self.c.launch_ok.load(Ordering::SeqCst) {
                Ok(Arc::new(FakeSession {
                    c: Arc::clone(&self.c),
                }))
            } else {
                anyhow::bail!("no chrome binary found")
            }
        }
    }

    impl BrowserSession for FakeSession {
        fn render(
            &self,
            url: &str,
            ready_selector: &str,
            _timeout: Duration,
        ) -> Result<String, FetchError> {
            self.c.renders.fetch_add(1, Ordering::SeqCst);
            if self.c.render_ok.load(Ordering::SeqCst) {
                Ok("<html></html>".to_string())
            } else {
                Err(FetchError::Timeout {
                    url: url.to_string(),
                    selector: ready_selector.to_string(),
                })
            }
        }
    }

    fn client(c: &Arc<Counters>) -> BrowserClient {
        BrowserClient::with_engine(
            BrowserOptions {
                chrome_binary: None,
                readiness_timeout: Duration::from_secs(1),
            },
            Arc::new(FakeEngine { c: Arc::clone(c) }),
        )
    }

    #[tokio::test]
    async fn test_session_reused_across_fetches() {
        let c = Counters::new();
        let client = client(&c);

        client.fetch("https://x/a", "body").await.unwrap();
        client.fetch("https://x/b", "body").await.unwrap();

        assert_eq!(c.launches.load(Ordering::SeqCst), 1, "one launch serves both");
        assert_eq!(c.renders.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_render_retries_once_on_a_fresh_session() {
        let c = Counters::new();
        c.render_ok.store(false, Ordering::SeqCst);
        let client = client(&c);

        let err = client.fetch("https://x/a", "body").await.unwrap_err();

        assert!(matches!(err, FetchError::Timeout { .. }));
        assert_eq!(c.renders.load(Ordering::SeqCst), 2, "first try plus one retry");
        assert_eq!(
            c.launches.load(Ordering::SeqCst),
            2,
            "the retry relaunches instead of reusing the failed session"
        );
    }

    #[tokio::test]
    async fn test_degrades_after_repeated_launch_failures() {
        let c = Counters::new();
        c.launch_ok.store(false, Ordering::SeqCst);
        let client = client(&c);

        for _ in 0..5 {
            let err = client.fetch("https://x/a", "body").await.unwrap_err();
            assert!(matches!(err, FetchError::SessionUnavailable));
        }
        assert_eq!(c.launches.load(Ordering::SeqCst), 5);

        // degraded: further fetches fail without touching the engine
        let err = client.fetch("https://x/a", "body").await.unwrap_err();
        assert!(matches!(err, FetchError::SessionUnavailable));
        assert_eq!(c.launches.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_restart_revives_a_degraded_client() {
        let c = Counters::new();
        c.launch_ok.store(false, Ordering::SeqCst);
        let client = client(&c);

        for _ in 0..5 {
            let _ = client.fetch("https://x/a", "body").await;
        }
        assert_eq!(c.launches.load(Ordering::SeqCst), 5);

        c.launch_ok.store(true, Ordering::SeqCst);
        client.restart().await;
        assert_eq!(c.launches.load(Ordering::SeqCst), 6, "restart launches eagerly");

        client.fetch("https://x/a", "body").await.unwrap();
        assert_eq!(
            c.launches.load(Ordering::SeqCst),
            6,
            "the fetch reuses the restarted session"
        );
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 8, 28)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_restart_later_today() {
        // 01:30 -> 2.5 hours until 04:00
        let wait = duration_until_restart(at(1, 30));
        assert_eq!(wait, Duration::from_secs(2 * 3600 + 1800));
    }

    #[test]
    fn test_restart_rolls_to_tomorrow() {
        // 04:00 sharp already passed -> full day
        let wait = duration_until_restart(at(4, 0));
        assert_eq!(wait, Duration::from_secs(24 * 3600));

        let wait = duration_until_restart(at(16, 0));
        assert_eq!(wait, Duration::from_secs(12 * 3600));
    }
}
