//! The tracker site scraper port: resolving a torrent's tracker id and the
//! site's own announce-time prediction, when the site exposes one.

use async_trait::async_trait;
use thiserror::Error;

use speedgov_core::PtSite;

/// Failure modes surfaced by a [`SiteScraper`] or [`SiteHelper`] implementation.
#[derive(Debug, Error)]
pub enum ScraperError {
    /// The site rejected the request, or its page layout no longer matches
    /// what the helper expects.
    #[error("site scrape failed for site {site_id}: {message}")]
    ScrapeFailed {
        /// The site that failed.
        site_id: i64,
        /// Human-readable failure description.
        message: String,
    },
    /// The underlying HTTP transport failed.
    #[error("site scraper transport error: {source}")]
    Transport {
        /// Underlying transport error.
        #[source]
        source: anyhow::Error,
    },
}

/// Per-site scraping logic, resolved from a tracker announce URL by
/// [`SiteScraper::get_helper_by_tracker`].
#[async_trait]
pub trait SiteHelper: Send + Sync {
    /// Whether this site's helper is configured and able to scrape.
    fn enabled(&self) -> bool;

    /// Resolve `hash`'s tracker-side torrent id, if the site exposes a
    /// hash-to-id lookup.
    async fn search_tid_by_hash(&self, hash: &str) -> Result<Option<i64>, ScraperError>;

    /// The site's own prediction of seconds remaining until the next
    /// announce for torrent `tid`, if the site's torrent page exposes one.
    async fn get_reannounce_time(&self, tid: i64) -> Result<Option<f64>, ScraperError>;
}

/// Registry of [`SiteHelper`]s, refreshed from the configured site list and
/// looked up by tracker announce URL.
#[async_trait]
pub trait SiteScraper: Send + Sync {
    /// Rebuild the helper registry from the current site configuration and
    /// global outbound proxy setting.
    async fn refresh(&self, sites: &[PtSite], proxy: &str) -> Result<(), ScraperError>;

    /// Resolve the helper responsible for `tracker`, if any configured site
    /// matches it.
    fn get_helper_by_tracker(&self, tracker: &str) -> Option<std::sync::Arc<dyn SiteHelper>>;
}
