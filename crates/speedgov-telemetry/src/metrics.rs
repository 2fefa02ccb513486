//! Prometheus-backed metrics registry for the governor and auto-remove
//! loops.

use std::sync::Arc;

use prometheus::{Counter, Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::TelemetryError;

/// Prometheus-backed metrics registry shared across both worker loops.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    reannounce_source_total: IntCounterVec,
    torrents_controlled: IntGauge,
    control_cycle_errors_total: IntCounter,
    removed_total: IntCounter,
    freed_bytes_total: Counter,
    remove_errors_total: IntCounter,
}

/// Snapshot of selected gauges and counters for status reporting.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Torrents currently tracked by the governor loop.
    pub torrents_controlled: i64,
    /// Control cycles that failed to apply a limit.
    pub control_cycle_errors_total: u64,
    /// Torrents deleted by the auto-remove loop.
    pub removed_total: u64,
    /// Disk space freed by auto-remove deletions, in bytes.
    pub freed_bytes_total: f64,
    /// Auto-remove cycles that failed to evaluate or delete.
    pub remove_errors_total: u64,
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be built
    /// or registered.
    pub fn new() -> Result<Self, TelemetryError> {
        let registry = Registry::new();

        let reannounce_source_total = IntCounterVec::new(
            Opts::new(
                "reannounce_source_total",
                "Reannounce time lookups resolved by source",
            ),
            &["source"],
        )
        .map_err(|source| metrics_register_error("reannounce_source_total", source))?;
        let torrents_controlled = IntGauge::with_opts(Opts::new(
            "torrents_controlled",
            "Torrents currently tracked by the governor loop",
        ))
        .map_err(|source| metrics_register_error("torrents_controlled", source))?;
        let control_cycle_errors_total = IntCounter::with_opts(Opts::new(
            "control_cycle_errors_total",
            "Control cycles that failed to apply an upload limit",
        ))
        .map_err(|source| metrics_register_error("control_cycle_errors_total", source))?;
        let removed_total = IntCounter::with_opts(Opts::new(
            "removed_total",
            "Torrents deleted by the auto-remove loop",
        ))
        .map_err(|source| metrics_register_error("removed_total", source))?;
        let freed_bytes_total = Counter::with_opts(Opts::new(
            "freed_bytes_total",
            "Disk space freed by auto-remove deletions, in bytes",
        ))
        .map_err(|source| metrics_register_error("freed_bytes_total", source))?;
        let remove_errors_total = IntCounter::with_opts(Opts::new(
            "remove_errors_total",
            "Auto-remove cycles that failed to evaluate rules or delete a torrent",
        ))
        .map_err(|source| metrics_register_error("remove_errors_total", source))?;

        registry
            .register(Box::new(reannounce_source_total.clone()))
            .map_err(|source| metrics_register_error("reannounce_source_total", source))?;
        registry
            .register(Box::new(torrents_controlled.clone()))
            .map_err(|source| metrics_register_error("torrents_controlled", source))?;
        registry
            .register(Box::new(control_cycle_errors_total.clone()))
            .map_err(|source| metrics_register_error("control_cycle_errors_total", source))?;
        registry
            .register(Box::new(removed_total.clone()))
            .map_err(|source| metrics_register_error("removed_total", source))?;
        registry
            .register(Box::new(freed_bytes_total.clone()))
            .map_err(|source| metrics_register_error("freed_bytes_total", source))?;
        registry
            .register(Box::new(remove_errors_total.clone()))
            .map_err(|source| metrics_register_error("remove_errors_total", source))?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                reannounce_source_total,
                torrents_controlled,
                control_cycle_errors_total,
                removed_total,
                freed_bytes_total,
                remove_errors_total,
            }),
        })
    }

    /// Record a reannounce-time lookup resolved by `source` (e.g. `site`,
    /// `qb_api`, `estimated`, `cached`).
    pub fn inc_reannounce_source(&self, source: &str) {
        self.inner
            .reannounce_source_total
            .with_label_values(&[source])
            .inc();
    }

    /// Set the number of torrents currently tracked by the governor loop.
    pub fn set_torrents_controlled(&self, count: i64) {
        self.inner.torrents_controlled.set(count);
    }

    /// Increment the control cycle error counter.
    pub fn inc_control_cycle_error(&self) {
        self.inner.control_cycle_errors_total.inc();
    }

    /// Increment the removed-torrent counter.
    pub fn inc_removed(&self) {
        self.inner.removed_total.inc();
    }

    /// Add freed bytes to the running total.
    #[allow(clippy::cast_precision_loss)]
    pub fn add_freed_bytes(&self, bytes: u64) {
        self.inner.freed_bytes_total.inc_by(bytes as f64);
    }

    /// Increment the auto-remove error counter.
    pub fn inc_remove_error(&self) {
        self.inner.remove_errors_total.inc();
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String, TelemetryError> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(TelemetryError::MetricsEncode)?;
        String::from_utf8(buffer).map_err(TelemetryError::MetricsUtf8)
    }

    /// Take a point-in-time snapshot of the most relevant gauges and counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            torrents_controlled: self.inner.torrents_controlled.get(),
            control_cycle_errors_total: self.inner.control_cycle_errors_total.get(),
            removed_total: self.inner.removed_total.get(),
            freed_bytes_total: self.inner.freed_bytes_total.get(),
            remove_errors_total: self.inner.remove_errors_total.get(),
        }
    }
}

fn metrics_register_error(name: &'static str, source: prometheus::Error) -> TelemetryError {
    TelemetryError::MetricsRegister { name, source }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_snapshot_reflects_updates() -> Result<(), TelemetryError> {
        let metrics = Metrics::new()?;
        metrics.inc_reannounce_source("site");
        metrics.inc_reannounce_source("cached");
        metrics.inc_reannounce_source("cached");
        metrics.set_torrents_controlled(12);
        metrics.inc_control_cycle_error();
        metrics.inc_removed();
        metrics.add_freed_bytes(1_048_576);
        metrics.inc_remove_error();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.torrents_controlled, 12);
        assert_eq!(snapshot.control_cycle_errors_total, 1);
        assert_eq!(snapshot.removed_total, 1);
        assert!((snapshot.freed_bytes_total - 1_048_576.0).abs() < f64::EPSILON);
        assert_eq!(snapshot.remove_errors_total, 1);

        let rendered = metrics.render()?;
        assert!(rendered.contains("reannounce_source_total"));
        assert!(rendered.contains("torrents_controlled"));
        assert!(rendered.contains("freed_bytes_total"));
        Ok(())
    }
}
