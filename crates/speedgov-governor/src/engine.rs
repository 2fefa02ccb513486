//! The governor engine: owns the tick loop task and exposes the control
//! surface (`start`/`stop`/`get_status`/`get_state`/`get_all_states`).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use speedgov_ports::{ClientDriver, Notifier, SiteScraper, Store};
use speedgov_telemetry::Metrics;

use crate::error::{GovernorError, GovernorResult};
use crate::signal::StopSignal;
use crate::state_table::StateTable;
use crate::status::{GovernorStatus, TorrentStateSnapshot};
use crate::tick::{OracleCounters, run_tick};

/// Seconds between governor ticks (spec §4.4).
const TICK_INTERVAL: Duration = Duration::from_secs(5);
/// Seconds between periodic snapshots of all tracked states to the store.
const SNAPSHOT_INTERVAL: Duration = Duration::from_secs(180);
/// Wall-clock budget allotted to a graceful `stop()` before it reports a
/// timeout (spec §5). The background task is still left to finish in place;
/// this is purely an upper bound on how long the caller waits.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Monotonic wall-clock source for the control loop, seconds since an
/// arbitrary epoch fixed at process start. A trait so tests can supply a
/// deterministic clock; production uses [`SystemClock`].
pub trait Clock: Send + Sync {
    /// Current time, seconds.
    fn now(&self) -> f64;
}

/// Wall-clock backed by [`std::time::Instant`], monotonic across the
/// process lifetime.
pub struct SystemClock {
    start: std::time::Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self { start: std::time::Instant::now() }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

/// Ties together the per-torrent state table, port implementations, and
/// metrics into the running upload-rate governor.
pub struct GovernorEngine {
    store: Arc<dyn Store>,
    client: Arc<dyn ClientDriver>,
    scraper: Arc<dyn SiteScraper>,
    notifier: Arc<dyn Notifier>,
    metrics: Metrics,
    clock: Arc<dyn Clock>,
    states: Arc<StateTable>,
    counters: Arc<OracleCounters>,
    running: Arc<AtomicBool>,
    signal: Mutex<Option<StopSignal>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl GovernorEngine {
    /// Construct an engine wired to the given ports and metrics registry,
    /// using [`SystemClock`] for wall-clock time.
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        client: Arc<dyn ClientDriver>,
        scraper: Arc<dyn SiteScraper>,
        notifier: Arc<dyn Notifier>,
        metrics: Metrics,
    ) -> Self {
        Self::with_clock(store, client, scraper, notifier, metrics, Arc::new(SystemClock::default()))
    }

    /// Construct an engine with an injected [`Clock`], for deterministic tests.
    #[must_use]
    pub fn with_clock(
        store: Arc<dyn Store>,
        client: Arc<dyn ClientDriver>,
        scraper: Arc<dyn SiteScraper>,
        notifier: Arc<dyn Notifier>,
        metrics: Metrics,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            client,
            scraper,
            notifier,
            metrics,
            clock,
            states: Arc::new(StateTable::new()),
            counters: Arc::new(OracleCounters::default()),
            running: Arc::new(AtomicBool::new(false)),
            signal: Mutex::new(None),
            handle: Mutex::new(None),
        }
    }

    /// Start the tick loop on a background task, restoring previously
    /// persisted torrent states first.
    ///
    /// # Errors
    ///
    /// Returns [`GovernorError::AlreadyRunning`] if the engine is already
    /// started.
    pub async fn start(&self) -> GovernorResult<()> {
        let mut handle_guard = self.handle.lock().await;
        if handle_guard.is_some() {
            return Err(GovernorError::AlreadyRunning);
        }

        match self.store.get_all_torrent_limit_states().await {
            Ok(states) => self.states.restore(states),
            Err(err) => warn!(error = %err, "failed to restore persisted torrent states, starting empty"),
        }

        let signal = StopSignal::new();
        *self.signal.lock().await = Some(signal.clone());
        self.running.store(true, Ordering::SeqCst);

        let store = Arc::clone(&self.store);
        let client = Arc::clone(&self.client);
        let scraper = Arc::clone(&self.scraper);
        let notifier = Arc::clone(&self.notifier);
        let metrics = self.metrics.clone();
        let clock = Arc::clone(&self.clock);
        let states = Arc::clone(&self.states);
        let counters = Arc::clone(&self.counters);
        let running = Arc::clone(&self.running);

        let join = tokio::spawn(async move {
            run_loop(signal, store, client, scraper, notifier, metrics, clock, states, counters).await;
            running.store(false, Ordering::SeqCst);
        });
        *handle_guard = Some(join);

        info!("governor engine started");
        Ok(())
    }

    /// Signal the tick loop to stop and wait for it to finish, up to a
    /// fixed timeout.
    ///
    /// # Errors
    ///
    /// Returns [`GovernorError::ShutdownTimedOut`] if the loop does not
    /// finish its current tick within the timeout; the loop is left to
    /// finish on its own in this case.
    pub async fn stop(&self) -> GovernorResult<()> {
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
                info!("governor engine stopped");
                Ok(())
            }
            Ok(Err(err)) => {
                error!(error = %err, "governor tick loop task panicked");
                Ok(())
            }
            Err(_) => Err(GovernorError::ShutdownTimedOut { seconds: SHUTDOWN_TIMEOUT.as_secs() }),
        }
    }

    /// Aggregate status and observability counters.
    #[must_use]
    pub fn get_status(&self) -> GovernorStatus {
        let (site_success, qb_api_success, fallback_count) = self.counters.snapshot();
        GovernorStatus {
            running: self.running.load(Ordering::SeqCst),
            torrents_controlled: self.states.len(),
            site_success,
            qb_api_success,
            fallback_count,
        }
    }

    /// A rich snapshot of one tracked torrent's control state, if known.
    #[must_use]
    pub fn get_state(&self, hash: &str, current_uploaded: i64) -> Option<TorrentStateSnapshot> {
        let state = self.states.get(hash)?;
        Some(TorrentStateSnapshot::from_state(&state, current_uploaded, self.clock.now()))
    }

    /// Rich snapshots of every currently tracked torrent. `current_uploaded`
    /// is approximated from each state's own cycle-start marker, since no
    /// fresh client reading is available outside the tick loop.
    #[must_use]
    pub fn get_all_states(&self) -> Vec<TorrentStateSnapshot> {
        let now = self.clock.now();
        self.states
            .snapshot()
            .iter()
            .map(|state| TorrentStateSnapshot::from_state(state, state.cycle_uploaded_start, now))
            .collect()
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_loop(
    signal: StopSignal,
    store: Arc<dyn Store>,
    client: Arc<dyn ClientDriver>,
    scraper: Arc<dyn SiteScraper>,
    notifier: Arc<dyn Notifier>,
    metrics: Metrics,
    clock: Arc<dyn Clock>,
    states: Arc<StateTable>,
    counters: Arc<OracleCounters>,
) {
    let mut since_snapshot = Duration::ZERO;

    while signal.is_running() {
        let now = clock.now();

        let sites = match store.get_pt_sites().await {
            Ok(sites) => sites,
            Err(err) => {
                warn!(error = %err, "failed to load pt sites, skipping tick");
                metrics.inc_control_cycle_error();
                if !signal.wait(TICK_INTERVAL).await {
                    break;
                }
                continue;
            }
        };
        let rules = match store.get_speed_rules().await {
            Ok(rules) => rules,
            Err(err) => {
                warn!(error = %err, "failed to load speed rules, skipping tick");
                metrics.inc_control_cycle_error();
                if !signal.wait(TICK_INTERVAL).await {
                    break;
                }
                continue;
            }
        };
        let proxy = store.get_config("global_proxy", "").await.unwrap_or_default();
        if let Err(err) = scraper.refresh(&sites, &proxy).await {
            warn!(error = %err, "failed to refresh site scraper configuration");
        }
        let instances = match store.get_qb_instances().await {
            Ok(instances) => instances,
            Err(err) => {
                warn!(error = %err, "failed to load client instances, skipping tick");
                metrics.inc_control_cycle_error();
                if !signal.wait(TICK_INTERVAL).await {
                    break;
                }
                continue;
            }
        };

        run_tick(
            &states, client.as_ref(), scraper.as_ref(), notifier.as_ref(), &metrics, &counters,
            &instances, &sites, &rules, now,
        )
        .await;

        since_snapshot += TICK_INTERVAL;
        if since_snapshot >= SNAPSHOT_INTERVAL {
            since_snapshot = Duration::ZERO;
            for state in states.snapshot() {
                if let Err(err) = store.save_torrent_limit_state(&state).await {
                    warn!(hash = %state.hash, error = %err, "failed to snapshot torrent state");
                }
            }
        }

        if !signal.wait(TICK_INTERVAL).await {
            break;
        }
    }

    for state in states.snapshot() {
        if let Err(err) = store.save_torrent_limit_state(&state).await {
            warn!(hash = %state.hash, error = %err, "failed to persist torrent state at shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use speedgov_ports::testing::{FakeClientDriver, FakeNotifier, FakeSiteScraper, FakeStore};
    use speedgov_telemetry::Metrics;

    fn engine() -> GovernorEngine {
        GovernorEngine::new(
            Arc::new(FakeStore::new()),
            Arc::new(FakeClientDriver::new()),
            Arc::new(FakeSiteScraper::new()),
            Arc::new(FakeNotifier::new()),
            Metrics::new().expect("metrics construct"),
        )
    }

    #[tokio::test]
    async fn start_then_start_again_errors() {
        let engine = engine();
        engine.start().await.expect("first start succeeds");
        let second = engine.start().await;
        assert!(matches!(second, Err(GovernorError::AlreadyRunning)));
        engine.stop().await.expect("stop succeeds");
    }

    #[tokio::test]
    async fn stop_without_start_is_a_no_op() {
        let engine = engine();
        engine.stop().await.expect("stop without start succeeds");
    }

    #[tokio::test]
    async fn status_reports_not_running_before_start() {
        let engine = engine();
        assert!(!engine.get_status().running);
    }

    #[tokio::test]
    async fn start_and_stop_round_trips_cleanly() {
        let engine = engine();
        engine.start().await.expect("start succeeds");
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(engine.get_status().running);
        engine.stop().await.expect("stop succeeds");
        assert!(!engine.get_status().running);
    }

    #[tokio::test]
    async fn get_state_is_none_for_unknown_hash() {
        let engine = engine();
        assert!(engine.get_state("nope", 0).is_none());
    }
}
