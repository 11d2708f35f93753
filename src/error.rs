use thiserror::Error;

/// Everything that can go wrong while acquiring a rendered page.
///
/// All variants are recoverable: the crawler logs them and keeps the last
/// published snapshot. A missing field during extraction is *not* an error;
/// extractors substitute defaults instead.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The readiness marker never appeared within the bounded wait.
    #[error("timed out waiting for '{selector}' on {url}")]
    Timeout { url: String, selector: String },

    /// The browser/driver process died or refused a command.
    #[error("browser session crashed: {0}")]
    SessionCrashed(String),

    /// The session could not be (re)initialized; the client is degraded
    /// until the next scheduled restart.
    #[error("browser session unavailable")]
    SessionUnavailable,

    /// Navigation failed before the page started rendering (network/DNS).
    #[error("upstream unreachable: {0}")]
    Unreachable(String),
}
