//! Auto-remove runtime configuration, read fresh from the store on every
//! iteration so toggles take effect without restart.

use speedgov_ports::{Store, StoreError};

/// Default cadence between auto-remove iterations, seconds.
pub const DEFAULT_INTERVAL: u64 = 60;
/// Lower bound enforced on the configured interval, seconds.
pub const MIN_INTERVAL: u64 = 30;
/// Upper bound enforced on the configured interval, seconds.
pub const MAX_INTERVAL: u64 = 3600;

/// Default sleep between successive deletions within one iteration, seconds.
pub const DEFAULT_SLEEP: u64 = 5;
/// Lower bound enforced on the configured inter-deletion sleep, seconds.
pub const MIN_SLEEP: u64 = 1;
/// Upper bound enforced on the configured inter-deletion sleep, seconds.
pub const MAX_SLEEP: u64 = 60;

/// Fixed pause after an optional pre-delete reannounce, seconds (spec §4.6).
pub const REANNOUNCE_SETTLE: u64 = 2;

/// One iteration's worth of auto-remove configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutoRemoveConfig {
    /// Whether the loop evaluates rules this iteration at all.
    pub enabled: bool,
    /// Cadence between iterations, seconds, clamped to `[MIN_INTERVAL, MAX_INTERVAL]`.
    pub interval_secs: u64,
    /// Sleep between successive deletions, seconds, clamped to `[MIN_SLEEP, MAX_SLEEP]`.
    pub sleep_secs: u64,
    /// Whether to reannounce a torrent before deleting it.
    pub reannounce_first: bool,
    /// Whether deletions also remove downloaded data.
    pub delete_files: bool,
}

impl Default for AutoRemoveConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: DEFAULT_INTERVAL,
            sleep_secs: DEFAULT_SLEEP,
            reannounce_first: true,
            delete_files: true,
        }
    }
}

fn parse_bool(value: &str, default: bool) -> bool {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => true,
        "false" => false,
        _ => default,
    }
}

fn parse_clamped_u64(value: &str, default: u64, min: u64, max: u64) -> u64 {
    value.trim().parse::<u64>().map_or(default, |parsed| parsed.clamp(min, max))
}

impl AutoRemoveConfig {
    /// Load configuration from the store, applying defaults and bounds to
    /// any malformed or out-of-range value rather than failing the tick.
    pub async fn load(store: &dyn Store) -> Result<Self, StoreError> {
        let enabled = store.get_config("auto_remove_enabled", "false").await?;
        let interval = store.get_config("auto_remove_interval", &DEFAULT_INTERVAL.to_string()).await?;
        let sleep = store.get_config("auto_remove_sleep", &DEFAULT_SLEEP.to_string()).await?;
        let reannounce = store.get_config("auto_remove_reannounce", "true").await?;
        let delete_files = store.get_config("auto_remove_delete_files", "true").await?;

        Ok(Self {
            enabled: parse_bool(&enabled, false),
            interval_secs: parse_clamped_u64(&interval, DEFAULT_INTERVAL, MIN_INTERVAL, MAX_INTERVAL),
            sleep_secs: parse_clamped_u64(&sleep, DEFAULT_SLEEP, MIN_SLEEP, MAX_SLEEP),
            reannounce_first: parse_bool(&reannounce, true),
            delete_files: parse_bool(&delete_files, true),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_parsing_falls_back_to_default_on_garbage() {
        assert!(parse_bool("true", false));
        assert!(!parse_bool("false", true));
        assert!(parse_bool("garbage", true));
        assert!(!parse_bool("garbage", false));
    }

    #[test]
    fn interval_clamps_out_of_range_values() {
        assert_eq!(parse_clamped_u64("5", DEFAULT_INTERVAL, MIN_INTERVAL, MAX_INTERVAL), MIN_INTERVAL);
        assert_eq!(parse_clamped_u64("999999", DEFAULT_INTERVAL, MIN_INTERVAL, MAX_INTERVAL), MAX_INTERVAL);
        assert_eq!(parse_clamped_u64("90", DEFAULT_INTERVAL, MIN_INTERVAL, MAX_INTERVAL), 90);
    }

    #[test]
    fn malformed_integer_falls_back_to_default() {
        assert_eq!(parse_clamped_u64("not-a-number", DEFAULT_INTERVAL, MIN_INTERVAL, MAX_INTERVAL), DEFAULT_INTERVAL);
    }
}
