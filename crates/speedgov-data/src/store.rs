//! [`PgStore`]: the Postgres implementation of [`speedgov_ports::Store`].

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Row};

use speedgov_core::{KalmanFilter, PidController, PtSite, ReannounceSource, SiteRule, TorrentLimitState};
use speedgov_ports::client::QbInstance;
use speedgov_ports::store::{LogLevel, Store, StoreError};
use speedgov_remove::{RemoveCondition, RemoveRule};

use crate::error::DataError;

/// Restored states older than this are discarded on load (spec §3).
const RESTORE_STALENESS_SECS: i32 = 86_400;

/// Database-backed repository for configuration, rules, sites, and
/// per-torrent control state.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Open a store against `pool`, applying any pending migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if migrations fail to apply.
    pub async fn new(pool: PgPool) -> crate::error::Result<Self> {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(DataError::Migration)?;
        Ok(Self { pool })
    }

    /// Access the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn backend(operation: &'static str, source: sqlx::Error) -> StoreError {
    StoreError::Backend {
        source: anyhow::Error::new(source).context(operation),
    }
}

const fn reannounce_source_tag(source: ReannounceSource) -> &'static str {
    match source {
        ReannounceSource::Site => "site",
        ReannounceSource::QbApi => "qb_api",
        ReannounceSource::Estimated => "estimated",
        ReannounceSource::Cached => "cached",
    }
}

fn reannounce_source_from_tag(tag: &str) -> ReannounceSource {
    match tag {
        "site" => ReannounceSource::Site,
        "qb_api" => ReannounceSource::QbApi,
        "estimated" => ReannounceSource::Estimated,
        _ => ReannounceSource::Cached,
    }
}

const fn log_level_tag(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Debug => "debug",
        LogLevel::Info => "info",
        LogLevel::Warning => "warning",
        LogLevel::Error => "error",
    }
}

#[derive(FromRow)]
struct SiteRuleRow {
    site_id: Option<i64>,
    target_speed_kib: i64,
    safety_margin: f64,
    enabled: bool,
}

impl From<SiteRuleRow> for SiteRule {
    fn from(row: SiteRuleRow) -> Self {
        Self {
            site_id: row.site_id,
            target_speed_kib: row.target_speed_kib,
            safety_margin: row.safety_margin,
            enabled: row.enabled,
        }
    }
}

#[derive(FromRow)]
struct PtSiteRow {
    id: i64,
    name: String,
    url: String,
    tracker_keyword: String,
}

impl From<PtSiteRow> for PtSite {
    fn from(row: PtSiteRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            url: row.url,
            tracker_keyword: row.tracker_keyword,
        }
    }
}

#[derive(FromRow)]
struct QbInstanceRow {
    id: i64,
    name: String,
    enabled: bool,
}

impl From<QbInstanceRow> for QbInstance {
    fn from(row: QbInstanceRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            enabled: row.enabled,
        }
    }
}

#[derive(FromRow)]
struct RemoveRuleRow {
    name: String,
    description: String,
    enabled: bool,
    condition: Json<RemoveCondition>,
}

impl From<RemoveRuleRow> for RemoveRule {
    fn from(row: RemoveRuleRow) -> Self {
        Self {
            name: row.name,
            description: row.description,
            enabled: row.enabled,
            condition: row.condition.0,
        }
    }
}

#[derive(FromRow)]
struct TorrentLimitStateRow {
    hash: String,
    name: String,
    tracker: String,
    instance_id: i64,
    site_id: Option<i64>,
    tid: Option<i64>,
    cycle_index: i64,
    cycle_start: f64,
    cycle_uploaded_start: i64,
    cycle_synced: bool,
    reannounce_time: f64,
    cached_time_left: f64,
    reannounce_source: String,
    target_speed: i64,
    last_limit: i64,
    last_limit_reason: String,
    pid_state: Json<PidController>,
    kalman_state: Json<KalmanFilter>,
    last_log_time: f64,
}

impl From<TorrentLimitStateRow> for TorrentLimitState {
    #[allow(clippy::cast_sign_loss)]
    fn from(row: TorrentLimitStateRow) -> Self {
        Self {
            hash: row.hash,
            name: row.name,
            tracker: row.tracker,
            instance_id: row.instance_id,
            site_id: row.site_id,
            tid: row.tid,
            cycle_index: row.cycle_index as u64,
            cycle_start: row.cycle_start,
            cycle_uploaded_start: row.cycle_uploaded_start,
            cycle_synced: row.cycle_synced,
            reannounce_time: row.reannounce_time,
            cached_time_left: row.cached_time_left,
            reannounce_source: reannounce_source_from_tag(&row.reannounce_source),
            target_speed: row.target_speed,
            last_limit: row.last_limit,
            last_limit_reason: row.last_limit_reason,
            pid: row.pid_state.0,
            kalman: row.kalman_state.0,
            last_log_time: row.last_log_time,
        }
    }
}

const UPSERT_TORRENT_LIMIT_STATE: &str = r"
    INSERT INTO torrent_limit_state (
        hash, name, tracker, instance_id, site_id, tid,
        cycle_index, cycle_start, cycle_uploaded_start, cycle_synced,
        reannounce_time, cached_time_left, reannounce_source,
        target_speed, last_limit, last_limit_reason,
        pid_state, kalman_state, last_log_time, updated_at
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, now())
    ON CONFLICT (hash) DO UPDATE SET
        name = EXCLUDED.name,
        tracker = EXCLUDED.tracker,
        instance_id = EXCLUDED.instance_id,
        site_id = EXCLUDED.site_id,
        tid = EXCLUDED.tid,
        cycle_index = EXCLUDED.cycle_index,
        cycle_start = EXCLUDED.cycle_start,
        cycle_uploaded_start = EXCLUDED.cycle_uploaded_start,
        cycle_synced = EXCLUDED.cycle_synced,
        reannounce_time = EXCLUDED.reannounce_time,
        cached_time_left = EXCLUDED.cached_time_left,
        reannounce_source = EXCLUDED.reannounce_source,
        target_speed = EXCLUDED.target_speed,
        last_limit = EXCLUDED.last_limit,
        last_limit_reason = EXCLUDED.last_limit_reason,
        pid_state = EXCLUDED.pid_state,
        kalman_state = EXCLUDED.kalman_state,
        last_log_time = EXCLUDED.last_log_time,
        updated_at = now()
";

#[async_trait]
impl Store for PgStore {
    async fn get_config(&self, key: &str, default: &str) -> Result<String, StoreError> {
        let row = sqlx::query("SELECT value FROM app_config WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|source| backend("get_config", source))?;
        Ok(match row {
            Some(row) => row.try_get("value").map_err(|source| backend("get_config", source))?,
            None => default.to_string(),
        })
    }

    async fn set_config(&self, key: &str, value: &str) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO app_config (key, value) VALUES ($1, $2)
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(|source| backend("set_config", source))?;
        Ok(())
    }

    async fn add_log(&self, level: LogLevel, message: &str) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO operational_log (level, message) VALUES ($1, $2)")
            .bind(log_level_tag(level))
            .bind(message)
            .execute(&self.pool)
            .await
            .map_err(|source| backend("add_log", source))?;
        Ok(())
    }

    async fn get_speed_rules(&self) -> Result<Vec<SiteRule>, StoreError> {
        let rows = sqlx::query_as::<_, SiteRuleRow>(
            "SELECT site_id, target_speed_kib, safety_margin, enabled FROM speed_rule",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|source| backend("get_speed_rules", source))?;
        Ok(rows.into_iter().map(SiteRule::from).collect())
    }

    async fn get_pt_sites(&self) -> Result<Vec<PtSite>, StoreError> {
        let rows = sqlx::query_as::<_, PtSiteRow>(
            "SELECT id, name, url, tracker_keyword FROM pt_site",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|source| backend("get_pt_sites", source))?;
        Ok(rows.into_iter().map(PtSite::from).collect())
    }

    async fn get_qb_instances(&self) -> Result<Vec<QbInstance>, StoreError> {
        let rows = sqlx::query_as::<_, QbInstanceRow>("SELECT id, name, enabled FROM qb_instance")
            .fetch_all(&self.pool)
            .await
            .map_err(|source| backend("get_qb_instances", source))?;
        Ok(rows.into_iter().map(QbInstance::from).collect())
    }

    async fn get_enabled_remove_rules(&self) -> Result<Vec<RemoveRule>, StoreError> {
        let rows = sqlx::query_as::<_, RemoveRuleRow>(
            "SELECT name, description, enabled, condition FROM remove_rule
             WHERE enabled = TRUE ORDER BY position ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|source| backend("get_enabled_remove_rules", source))?;
        Ok(rows.into_iter().map(RemoveRule::from).collect())
    }

    async fn get_all_torrent_limit_states(&self) -> Result<Vec<TorrentLimitState>, StoreError> {
        let rows = sqlx::query_as::<_, TorrentLimitStateRow>(
            "SELECT hash, name, tracker, instance_id, site_id, tid,
                    cycle_index, cycle_start, cycle_uploaded_start, cycle_synced,
                    reannounce_time, cached_time_left, reannounce_source,
                    target_speed, last_limit, last_limit_reason,
                    pid_state, kalman_state, last_log_time
             FROM torrent_limit_state
             WHERE updated_at > now() - make_interval(secs => $1)",
        )
        .bind(f64::from(RESTORE_STALENESS_SECS))
        .fetch_all(&self.pool)
        .await
        .map_err(|source| backend("get_all_torrent_limit_states", source))?;
        Ok(rows.into_iter().map(TorrentLimitState::from).collect())
    }

    #[allow(clippy::cast_possible_wrap)]
    async fn save_torrent_limit_state(&self, state: &TorrentLimitState) -> Result<(), StoreError> {
        sqlx::query(UPSERT_TORRENT_LIMIT_STATE)
            .bind(&state.hash)
            .bind(&state.name)
            .bind(&state.tracker)
            .bind(state.instance_id)
            .bind(state.site_id)
            .bind(state.tid)
            .bind(state.cycle_index as i64)
            .bind(state.cycle_start)
            .bind(state.cycle_uploaded_start)
            .bind(state.cycle_synced)
            .bind(state.reannounce_time)
            .bind(state.cached_time_left)
            .bind(reannounce_source_tag(state.reannounce_source))
            .bind(state.target_speed)
            .bind(state.last_limit)
            .bind(&state.last_limit_reason)
            .bind(Json(state.pid))
            .bind(Json(state.kalman))
            .bind(state.last_log_time)
            .execute(&self.pool)
            .await
            .map_err(|source| backend("save_torrent_limit_state", source))?;
        Ok(())
    }

    async fn delete_torrent_limit_state(&self, hash: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM torrent_limit_state WHERE hash = $1")
            .bind(hash)
            .execute(&self.pool)
            .await
            .map_err(|source| backend("delete_torrent_limit_state", source))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reannounce_source_tags_round_trip() {
        for source in [
            ReannounceSource::Site,
            ReannounceSource::QbApi,
            ReannounceSource::Estimated,
            ReannounceSource::Cached,
        ] {
            let tag = reannounce_source_tag(source);
            assert_eq!(reannounce_source_from_tag(tag), source);
        }
    }

    #[test]
    fn unknown_reannounce_tag_falls_back_to_cached() {
        assert_eq!(reannounce_source_from_tag("garbage"), ReannounceSource::Cached);
    }

    #[test]
    fn log_level_tags_are_lowercase() {
        assert_eq!(log_level_tag(LogLevel::Debug), "debug");
        assert_eq!(log_level_tag(LogLevel::Warning), "warning");
    }
}
