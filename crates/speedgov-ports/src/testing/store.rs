use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::client::QbInstance;
use crate::store::{LogLevel, Store, StoreError};
use speedgov_core::{PtSite, SiteRule, TorrentLimitState};
use speedgov_remove::RemoveRule;

/// In-memory [`Store`], seeded by its builder-style `with_*` methods and
/// otherwise empty.
#[derive(Default)]
pub struct FakeStore {
    config: Mutex<HashMap<String, String>>,
    logs: Mutex<Vec<(LogLevel, String)>>,
    speed_rules: Mutex<Vec<SiteRule>>,
    pt_sites: Mutex<Vec<PtSite>>,
    qb_instances: Mutex<Vec<QbInstance>>,
    remove_rules: Mutex<Vec<RemoveRule>>,
    limit_states: Mutex<HashMap<String, TorrentLimitState>>,
}

impl FakeStore {
    /// Construct an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a configuration value up front.
    #[must_use]
    pub fn with_config(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config
            .try_lock()
            .expect("uncontended during construction")
            .insert(key.into(), value.into());
        self
    }

    /// Seed the speed rule list.
    #[must_use]
    pub fn with_speed_rules(self, rules: Vec<SiteRule>) -> Self {
        *self
            .speed_rules
            .try_lock()
            .expect("uncontended during construction") = rules;
        self
    }

    /// Seed the PT site list.
    #[must_use]
    pub fn with_pt_sites(self, sites: Vec<PtSite>) -> Self {
        *self
            .pt_sites
            .try_lock()
            .expect("uncontended during construction") = sites;
        self
    }

    /// Seed the client instance list.
    #[must_use]
    pub fn with_qb_instances(self, instances: Vec<QbInstance>) -> Self {
        *self
            .qb_instances
            .try_lock()
            .expect("uncontended during construction") = instances;
        self
    }

    /// Seed the enabled auto-remove rule list.
    #[must_use]
    pub fn with_remove_rules(self, rules: Vec<RemoveRule>) -> Self {
        *self
            .remove_rules
            .try_lock()
            .expect("uncontended during construction") = rules;
        self
    }

    /// Logged lines so far, in append order.
    pub async fn logged(&self) -> Vec<(LogLevel, String)> {
        self.logs.lock().await.clone()
    }
}

#[async_trait]
impl Store for FakeStore {
    async fn get_config(&self, key: &str, default: &str) -> Result<String, StoreError> {
        Ok(self
            .config
            .lock()
            .await
            .get(key)
            .cloned()
            .unwrap_or_else(|| default.to_string()))
    }

    async fn set_config(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.config
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn add_log(&self, level: LogLevel, message: &str) -> Result<(), StoreError> {
        self.logs.lock().await.push((level, message.to_string()));
        Ok(())
    }

    async fn get_speed_rules(&self) -> Result<Vec<SiteRule>, StoreError> {
        Ok(self.speed_rules.lock().await.clone())
    }

    async fn get_pt_sites(&self) -> Result<Vec<PtSite>, StoreError> {
        Ok(self.pt_sites.lock().await.clone())
    }

    async fn get_qb_instances(&self) -> Result<Vec<QbInstance>, StoreError> {
        Ok(self.qb_instances.lock().await.clone())
    }

    async fn get_enabled_remove_rules(&self) -> Result<Vec<RemoveRule>, StoreError> {
        Ok(self.remove_rules.lock().await.clone())
    }

    async fn get_all_torrent_limit_states(&self) -> Result<Vec<TorrentLimitState>, StoreError> {
        Ok(self.limit_states.lock().await.values().cloned().collect())
    }

    async fn save_torrent_limit_state(&self, state: &TorrentLimitState) -> Result<(), StoreError> {
        self.limit_states
            .lock()
            .await
            .insert(state.hash.clone(), state.clone());
        Ok(())
    }

    async fn delete_torrent_limit_state(&self, hash: &str) -> Result<(), StoreError> {
        self.limit_states.lock().await.remove(hash);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn config_falls_back_to_default_when_unset() {
        let store = FakeStore::new();
        let value = store.get_config("missing", "fallback").await.unwrap();
        assert_eq!(value, "fallback");
    }

    #[tokio::test]
    async fn seeded_config_overrides_default() {
        let store = FakeStore::new().with_config("tick_interval", "5");
        let value = store.get_config("tick_interval", "10").await.unwrap();
        assert_eq!(value, "5");
    }

    #[tokio::test]
    async fn save_and_delete_limit_state_round_trips() {
        let store = FakeStore::new();
        let state = TorrentLimitState::new("h", "n", "t", 1, 0.0, 0, 1024);
        store.save_torrent_limit_state(&state).await.unwrap();
        assert_eq!(store.get_all_torrent_limit_states().await.unwrap().len(), 1);
        store.delete_torrent_limit_state("h").await.unwrap();
        assert!(store.get_all_torrent_limit_states().await.unwrap().is_empty());
    }
}
