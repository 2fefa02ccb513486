use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::scraper::{ScraperError, SiteHelper, SiteScraper};
use speedgov_core::PtSite;

/// In-memory [`SiteHelper`] whose answers are seeded up front.
#[derive(Default)]
pub struct FakeSiteHelper {
    enabled: bool,
    tids: HashMap<String, i64>,
    reannounce_times: HashMap<i64, f64>,
}

impl FakeSiteHelper {
    /// Construct an enabled helper with no seeded answers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }

    /// Seed the tracker-id lookup for `hash`.
    #[must_use]
    pub fn with_tid(mut self, hash: impl Into<String>, tid: i64) -> Self {
        self.tids.insert(hash.into(), tid);
        self
    }

    /// Seed the reannounce-time prediction for `tid`.
    #[must_use]
    pub fn with_reannounce_time(mut self, tid: i64, seconds: f64) -> Self {
        self.reannounce_times.insert(tid, seconds);
        self
    }
}

#[async_trait]
impl SiteHelper for FakeSiteHelper {
    fn enabled(&self) -> bool {
        self.enabled
    }

    async fn search_tid_by_hash(&self, hash: &str) -> Result<Option<i64>, ScraperError> {
        Ok(self.tids.get(hash).copied())
    }

    async fn get_reannounce_time(&self, tid: i64) -> Result<Option<f64>, ScraperError> {
        Ok(self.reannounce_times.get(&tid).copied())
    }
}

/// In-memory [`SiteScraper`] that maps tracker substrings to a seeded
/// [`FakeSiteHelper`].
#[derive(Default)]
pub struct FakeSiteScraper {
    helpers: Mutex<Vec<(String, Arc<dyn SiteHelper>)>>,
}

impl FakeSiteScraper {
    /// Construct a scraper with no registered helpers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `helper` to answer for trackers containing `keyword`.
    pub async fn register(&self, keyword: impl Into<String>, helper: Arc<dyn SiteHelper>) {
        self.helpers.lock().await.push((keyword.into(), helper));
    }
}

#[async_trait]
impl SiteScraper for FakeSiteScraper {
    async fn refresh(&self, _sites: &[PtSite], _proxy: &str) -> Result<(), ScraperError> {
        Ok(())
    }

    fn get_helper_by_tracker(&self, tracker: &str) -> Option<Arc<dyn SiteHelper>> {
        let tracker_lower = tracker.to_ascii_lowercase();
        self.helpers
            .try_lock()
            .ok()?
            .iter()
            .find(|(keyword, _)| tracker_lower.contains(&keyword.to_ascii_lowercase()))
            .map(|(_, helper)| Arc::clone(helper))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_helper_by_keyword() {
        let scraper = FakeSiteScraper::new();
        let helper: Arc<dyn SiteHelper> =
            Arc::new(FakeSiteHelper::new().with_tid("abc", 42).with_reannounce_time(42, 900.0));
        scraper.register("examplept", Arc::clone(&helper)).await;

        let found = scraper
            .get_helper_by_tracker("https://tracker.examplept.net/announce")
            .expect("helper registered");
        let tid = found.search_tid_by_hash("abc").await.unwrap();
        assert_eq!(tid, Some(42));
        let seconds = found.get_reannounce_time(42).await.unwrap();
        assert_eq!(seconds, Some(900.0));
    }

    #[test]
    fn unmatched_tracker_returns_none() {
        let scraper = FakeSiteScraper::new();
        assert!(
            scraper
                .get_helper_by_tracker("https://unrelated.example/announce")
                .is_none()
        );
    }
}
