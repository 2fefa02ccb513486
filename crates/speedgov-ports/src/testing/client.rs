use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::client::{ClientDriver, ClientError, DeleteOutcome, TorrentInfo};

/// In-memory test double for [`ClientDriver`]. Instances are "connected" by
/// default; call [`FakeClientDriver::disconnect`] to simulate an outage.
#[derive(Default)]
pub struct FakeClientDriver {
    torrents: Mutex<HashMap<i64, Vec<TorrentInfo>>>,
    free_space: Mutex<HashMap<i64, i64>>,
    disconnected: Mutex<Vec<i64>>,
    limits_applied: Mutex<Vec<(i64, String, i64)>>,
    reannounces: Mutex<Vec<(i64, String)>>,
    deleted: Mutex<Vec<(i64, String, bool)>>,
}

impl FakeClientDriver {
    /// Construct a fake with no torrents and unlimited free space recorded.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed `instance_id`'s torrent list.
    pub async fn set_torrents(&self, instance_id: i64, torrents: Vec<TorrentInfo>) {
        self.torrents.lock().await.insert(instance_id, torrents);
    }

    /// Seed `instance_id`'s reported free space.
    pub async fn set_free_space(&self, instance_id: i64, bytes: i64) {
        self.free_space.lock().await.insert(instance_id, bytes);
    }

    /// Mark `instance_id` unreachable for subsequent calls.
    pub async fn disconnect(&self, instance_id: i64) {
        self.disconnected.lock().await.push(instance_id);
    }

    /// Upload limits applied so far, in call order.
    pub async fn applied_limits(&self) -> Vec<(i64, String, i64)> {
        self.limits_applied.lock().await.clone()
    }

    /// Reannounce calls made so far, in call order.
    pub async fn reannounce_calls(&self) -> Vec<(i64, String)> {
        self.reannounces.lock().await.clone()
    }

    /// Delete calls made so far, in call order.
    pub async fn delete_calls(&self) -> Vec<(i64, String, bool)> {
        self.deleted.lock().await.clone()
    }

    async fn check_connected(&self, instance_id: i64) -> Result<(), ClientError> {
        if self.disconnected.lock().await.contains(&instance_id) {
            return Err(ClientError::Unreachable {
                instance_id,
                source: anyhow::anyhow!("fake instance marked disconnected"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ClientDriver for FakeClientDriver {
    async fn is_connected(&self, instance_id: i64) -> bool {
        !self.disconnected.lock().await.contains(&instance_id)
    }

    async fn get_torrents(&self, instance_id: i64) -> Result<Vec<TorrentInfo>, ClientError> {
        self.check_connected(instance_id).await?;
        Ok(self
            .torrents
            .lock()
            .await
            .get(&instance_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_free_space(&self, instance_id: i64) -> Result<i64, ClientError> {
        self.check_connected(instance_id).await?;
        Ok(self
            .free_space
            .lock()
            .await
            .get(&instance_id)
            .copied()
            .unwrap_or(i64::MAX))
    }

    async fn set_upload_limit(
        &self,
        instance_id: i64,
        hash: &str,
        bytes_per_sec: i64,
    ) -> Result<(), ClientError> {
        self.check_connected(instance_id).await?;
        self.limits_applied
            .lock()
            .await
            .push((instance_id, hash.to_string(), bytes_per_sec));
        Ok(())
    }

    async fn reannounce(&self, instance_id: i64, hash: &str) -> Result<(), ClientError> {
        self.check_connected(instance_id).await?;
        self.reannounces
            .lock()
            .await
            .push((instance_id, hash.to_string()));
        Ok(())
    }

    async fn delete_torrent(
        &self,
        instance_id: i64,
        hash: &str,
        delete_files: bool,
    ) -> Result<DeleteOutcome, ClientError> {
        self.check_connected(instance_id).await?;
        self.deleted
            .lock()
            .await
            .push((instance_id, hash.to_string(), delete_files));
        if let Some(torrents) = self.torrents.lock().await.get_mut(&instance_id) {
            torrents.retain(|t| t.hash != hash);
        }
        Ok(DeleteOutcome {
            success: true,
            message: "removed".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn torrent(hash: &str) -> TorrentInfo {
        TorrentInfo {
            hash: hash.to_string(),
            name: hash.to_string(),
            state: "uploading".to_string(),
            tracker: "https://tracker.example/announce".to_string(),
            size: 1_000_000,
            uploaded: 0,
            upload_speed: 0.0,
            progress: 1.0,
            ratio: 1.0,
            seeding_time: 0.0,
            last_activity: 0.0,
            reannounce_time: None,
        }
    }

    #[tokio::test]
    async fn disconnected_instance_rejects_all_calls() {
        let driver = FakeClientDriver::new();
        driver.disconnect(1).await;
        assert!(!driver.is_connected(1).await);
        assert!(driver.get_torrents(1).await.is_err());
        assert!(driver.set_upload_limit(1, "h", 4096).await.is_err());
    }

    #[tokio::test]
    async fn delete_removes_from_subsequent_listings() {
        let driver = FakeClientDriver::new();
        driver.set_torrents(1, vec![torrent("abc")]).await;
        let outcome = driver.delete_torrent(1, "abc", true).await.unwrap();
        assert!(outcome.success);
        assert!(driver.get_torrents(1).await.unwrap().is_empty());
        assert_eq!(driver.delete_calls().await, vec![(1, "abc".to_string(), true)]);
    }
}
