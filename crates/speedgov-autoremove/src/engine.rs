//! The auto-remove engine: owns the tick loop task and exposes the control
//! surface (`start`/`stop`/`get_status`/`get_records`/`manual_check`).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use speedgov_ports::{ClientDriver, Notifier, Store};
use speedgov_remove::{RemoveRecord, RemoveRecordRing, TorrentSnapshot, match_rules};
use speedgov_telemetry::Metrics;

use crate::config::{AutoRemoveConfig, REANNOUNCE_SETTLE};
use crate::error::{AutoRemoveError, AutoRemoveResult};
use crate::signal::StopSignal;
use crate::status::{AutoRemoveStatus, ManualCheckOutcome};

/// Wall-clock budget allotted to a graceful `stop()` before it reports a
/// timeout, matching `speedgov-governor`'s shutdown contract.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Ties together the remove-rule evaluator, port implementations, and
/// metrics into the running auto-remove loop.
pub struct AutoRemoveEngine {
    store: Arc<dyn Store>,
    client: Arc<dyn ClientDriver>,
    notifier: Arc<dyn Notifier>,
    metrics: Metrics,
    records: Arc<Mutex<RemoveRecordRing>>,
    total_removed: Arc<AtomicU64>,
    total_freed: Arc<AtomicU64>,
    running: Arc<AtomicBool>,
    enabled: Arc<AtomicBool>,
    signal: Mutex<Option<StopSignal>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl AutoRemoveEngine {
    /// Construct an engine wired to the given ports and metrics registry.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, client: Arc<dyn ClientDriver>, notifier: Arc<dyn Notifier>, metrics: Metrics) -> Self {
        Self {
            store,
            client,
            notifier,
            metrics,
            records: Arc::new(Mutex::new(RemoveRecordRing::new())),
            total_removed: Arc::new(AtomicU64::new(0)),
            total_freed: Arc::new(AtomicU64::new(0)),
            running: Arc::new(AtomicBool::new(false)),
            enabled: Arc::new(AtomicBool::new(false)),
            signal: Mutex::new(None),
            handle: Mutex::new(None),
        }
    }

    /// Start the tick loop on a background task.
    ///
    /// # Errors
    ///
    /// Returns [`AutoRemoveError::AlreadyRunning`] if the engine is already
    /// started.
    pub async fn start(&self) -> AutoRemoveResult<()> {
        let mut handle_guard = self.handle.lock().await;
        if handle_guard.is_some() {
            return Err(AutoRemoveError::AlreadyRunning);
        }

        let signal = StopSignal::new();
        *self.signal.lock().await = Some(signal.clone());
        self.running.store(true, Ordering::SeqCst);

        let store = Arc::clone(&self.store);
        let client = Arc::clone(&self.client);
        let notifier = Arc::clone(&self.notifier);
        let metrics = self.metrics.clone();
        let records = Arc::clone(&self.records);
        let total_removed = Arc::clone(&self.total_removed);
        let total_freed = Arc::clone(&self.total_freed);
        let running = Arc::clone(&self.running);
        let enabled = Arc::clone(&self.enabled);

        let join = tokio::spawn(async move {
            run_loop(signal, store, client, notifier, metrics, records, total_removed, total_freed, enabled).await;
            running.store(false, Ordering::SeqCst);
        });
        *handle_guard = Some(join);

        info!("auto-remove engine started");
        Ok(())
    }

    /// Signal the tick loop to stop and wait for it to finish, up to a
    /// fixed timeout.
    ///
    /// # Errors
    ///
    /// Returns [`AutoRemoveError::ShutdownTimedOut`] if the loop does not
    /// finish within the timeout; it is left to finish on its own.
    pub async fn stop(&self) -> AutoRemoveResult<()> {
        let signal = self.signal.lock().await.take();
        if let Some(signal) = signal {
            signal.stop();
        }

        let handle = self.handle.lock().await.take();
        let Some(handle) = handle else {
            return Ok(());
        };

        match tokio::time::timeout(SHUTDOWN_TIMEOUT, handle).await {
            Ok(Ok(())) => {
                info!("auto-remove engine stopped");
                Ok(())
            }
            Ok(Err(err)) => {
                error!(error = %err, "auto-remove tick loop task panicked");
                Ok(())
            }
            Err(_) => Err(AutoRemoveError::ShutdownTimedOut { seconds: SHUTDOWN_TIMEOUT.as_secs() }),
        }
    }

    /// Aggregate status and running totals.
    #[must_use]
    pub fn get_status(&self) -> AutoRemoveStatus {
        AutoRemoveStatus {
            running: self.running.load(Ordering::SeqCst),
            enabled: self.enabled.load(Ordering::SeqCst),
            total_removed: self.total_removed.load(Ordering::Relaxed),
            total_freed: self.total_freed.load(Ordering::Relaxed),
        }
    }

    /// The most recent `limit` removal records, newest first.
    pub async fn get_records(&self, limit: usize) -> Vec<RemoveRecord> {
        self.records.lock().await.recent(limit)
    }

    /// Run one pass synchronously (from the caller's point of view) and
    /// report the outcome, regardless of whether the background loop is
    /// also running. The spec's manual trigger entry point.
    pub async fn manual_check(&self) -> ManualCheckOutcome {
        let config = match AutoRemoveConfig::load(self.store.as_ref()).await {
            Ok(config) => config,
            Err(err) => {
                return ManualCheckOutcome {
                    success: false,
                    message: format!("failed to load configuration: {err}"),
                };
            }
        };

        let removed = run_iteration(
            self.store.as_ref(),
            self.client.as_ref(),
            self.notifier.as_ref(),
            &self.metrics,
            &self.records,
            &self.total_removed,
            &self.total_freed,
            &config,
            &StopSignal::new(),
        )
        .await;

        match removed {
            Ok(count) => ManualCheckOutcome { success: true, message: format!("removed {count} torrent(s)") },
            Err(message) => ManualCheckOutcome { success: false, message },
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_loop(
    signal: StopSignal,
    store: Arc<dyn Store>,
    client: Arc<dyn ClientDriver>,
    notifier: Arc<dyn Notifier>,
    metrics: Metrics,
    records: Arc<Mutex<RemoveRecordRing>>,
    total_removed: Arc<AtomicU64>,
    total_freed: Arc<AtomicU64>,
    enabled: Arc<AtomicBool>,
) {
    while signal.is_running() {
        let config = match AutoRemoveConfig::load(store.as_ref()).await {
            Ok(config) => config,
            Err(err) => {
                warn!(error = %err, "failed to load auto-remove configuration, skipping iteration");
                metrics.inc_remove_error();
                if !signal.wait(Duration::from_secs(crate::config::DEFAULT_INTERVAL)).await {
                    break;
                }
                continue;
            }
        };
        enabled.store(config.enabled, Ordering::SeqCst);

        if config.enabled {
            if let Err(message) = run_iteration(
                store.as_ref(), client.as_ref(), notifier.as_ref(), &metrics, &records,
                &total_removed, &total_freed, &config, &signal,
            )
            .await
            {
                warn!(error = %message, "auto-remove iteration failed");
                metrics.inc_remove_error();
            }
        }

        if !signal.wait(Duration::from_secs(config.interval_secs)).await {
            break;
        }
    }
}

/// Run one evaluation pass over every enabled client instance's torrents.
/// Returns the number of torrents removed, or an error message on a
/// non-continuable failure (rule loading, instance enumeration).
#[allow(clippy::too_many_arguments)]
async fn run_iteration(
    store: &dyn Store,
    client: &dyn ClientDriver,
    notifier: &dyn Notifier,
    metrics: &Metrics,
    records: &Mutex<RemoveRecordRing>,
    total_removed: &AtomicU64,
    total_freed: &AtomicU64,
    config: &AutoRemoveConfig,
    signal: &StopSignal,
) -> Result<u64, String> {
    let rules = store.get_enabled_remove_rules().await.map_err(|err| err.to_string())?;
    if rules.is_empty() {
        return Ok(0);
    }

    let instances = store.get_qb_instances().await.map_err(|err| err.to_string())?;
    #[allow(clippy::cast_precision_loss)]
    let now = Utc::now().timestamp() as f64;
    let mut removed_count = 0u64;

    for instance in instances.iter().filter(|instance| instance.enabled) {
        if !client.is_connected(instance.id).await {
            continue;
        }

        let free_space = match client.get_free_space(instance.id).await {
            Ok(space) => space,
            Err(err) => {
                warn!(instance = instance.id, error = %err, "failed to read free space");
                continue;
            }
        };
        let torrents = match client.get_torrents(instance.id).await {
            Ok(torrents) => torrents,
            Err(err) => {
                warn!(instance = instance.id, error = %err, "failed to enumerate torrents");
                continue;
            }
        };

        for torrent in &torrents {
            let snapshot = TorrentSnapshot {
                upload_speed: torrent.upload_speed,
                progress: torrent.progress,
                seeding_time: torrent.seeding_time,
                ratio: torrent.ratio,
                size: torrent.size,
                last_activity: torrent.last_activity,
            };
            let Some(rule) = match_rules(&snapshot, free_space, now, &rules) else {
                continue;
            };

            if config.reannounce_first {
                if let Err(err) = client.reannounce(instance.id, &torrent.hash).await {
                    warn!(instance = instance.id, hash = %torrent.hash, error = %err, "pre-delete reannounce failed");
                }
                tokio::time::sleep(Duration::from_secs(REANNOUNCE_SETTLE)).await;
            }

            match client.delete_torrent(instance.id, &torrent.hash, config.delete_files).await {
                Ok(outcome) if outcome.success => {
                    let freed = non_negative(torrent.size);
                    removed_count += 1;
                    total_removed.fetch_add(1, Ordering::Relaxed);
                    total_freed.fetch_add(freed, Ordering::Relaxed);
                    metrics.inc_removed();
                    metrics.add_freed_bytes(freed);

                    records.lock().await.push(RemoveRecord {
                        timestamp: Utc::now(),
                        instance_id: instance.id,
                        instance_name: instance.name.clone(),
                        torrent_hash: torrent.hash.clone(),
                        torrent_name: torrent.name.clone(),
                        rule_name: rule.name.clone(),
                        reason: rule.description.clone(),
                        size: torrent.size,
                        uploaded: torrent.uploaded,
                        ratio: torrent.ratio,
                    });

                    info!(hash = %torrent.hash, rule = %rule.name, "torrent removed");
                    notifier.notify("torrent removed", &format!("{} ({})", torrent.name, rule.description));
                }
                Ok(outcome) => {
                    warn!(hash = %torrent.hash, message = %outcome.message, "client declined to delete torrent");
                    metrics.inc_remove_error();
                }
                Err(err) => {
                    warn!(instance = instance.id, hash = %torrent.hash, error = %err, "delete request failed");
                    metrics.inc_remove_error();
                }
            }

            if !signal.wait(Duration::from_secs(config.sleep_secs)).await {
                return Ok(removed_count);
            }
        }
    }

    Ok(removed_count)
}

#[allow(clippy::cast_sign_loss)]
fn non_negative(value: i64) -> u64 {
    value.max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use speedgov_ports::testing::{FakeClientDriver, FakeNotifier, FakeStore};
    use speedgov_telemetry::Metrics;

    fn engine() -> AutoRemoveEngine {
        AutoRemoveEngine::new(
            Arc::new(FakeStore::new()),
            Arc::new(FakeClientDriver::new()),
            Arc::new(FakeNotifier::new()),
            Metrics::new().expect("metrics construct"),
        )
    }

    #[tokio::test]
    async fn start_then_start_again_errors() {
        let engine = engine();
        engine.start().await.expect("first start succeeds");
        let second = engine.start().await;
        assert!(matches!(second, Err(AutoRemoveError::AlreadyRunning)));
        engine.stop().await.expect("stop succeeds");
    }

    #[tokio::test]
    async fn stop_without_start_is_a_no_op() {
        let engine = engine();
        engine.stop().await.expect("stop without start succeeds");
    }

    #[tokio::test]
    async fn manual_check_with_no_rules_reports_zero_removed() {
        let engine = engine();
        let outcome = engine.manual_check().await;
        assert!(outcome.success);
        assert_eq!(outcome.message, "removed 0 torrent(s)");
    }

    #[tokio::test]
    async fn status_reports_not_running_before_start() {
        let engine = engine();
        let status = engine.get_status();
        assert!(!status.running);
        assert_eq!(status.total_removed, 0);
    }

    #[tokio::test]
    async fn records_start_empty() {
        let engine = engine();
        assert!(engine.get_records(10).await.is_empty());
    }
}
