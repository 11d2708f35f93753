pub mod browser;

pub use browser::BrowserClient;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::FetchError;

/// A fully rendered page. Cheap to clone; the cache and extractors share
/// the same backing buffer.
#[derive(Debug, Clone)]
pub struct Document {
    html: Arc<str>,
}

impl Document {
    pub fn new(html: impl Into<String>) -> Self {
        Document {
            html: html.into().into(),
        }
    }

    pub fn html(&self) -> &str {
        &self.html
    }
}

/// Trait every page source must implement.
///
/// `ready_selector` names the element whose presence means the page has
/// rendered enough to extract data from.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str, ready_selector: &str) -> Result<Document, FetchError>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}
