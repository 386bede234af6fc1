//! SQLite persistence for discovery results.
//!
//! One table, `discovery_result`, unique on `(profile, email)`. Writes never
//! overwrite: a second save of the same pair reports
//! [`SaveOutcome::Duplicate`]. Demo rows are only written when the store was
//! opened with [`SqliteStore::allow_synthetic`], and keep `synthetic = 1`.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use prospect_common::{DiscoveryResult, InferenceMethod, ProspectError};
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("row decode failed: {0}")]
    Decode(String),
}

impl From<StoreError> for ProspectError {
    fn from(e: StoreError) -> Self {
        ProspectError::Store(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveOutcome {
    Inserted,
    /// `(profile, email)` already stored; the existing row is untouched.
    Duplicate,
    /// Synthetic row refused because the store was not opened for them.
    Skipped,
}

/// Count grouped by one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub key: String,
    pub count: i64,
}

#[async_trait]
pub trait ResultStore: Send + Sync {
    async fn save(&self, result: &DiscoveryResult) -> Result<SaveOutcome>;

    /// Newest first.
    async fn find_by_profile(&self, profile: &str, limit: i64) -> Result<Vec<DiscoveryResult>>;

    async fn count(&self) -> Result<i64>;

    async fn count_by_profile(&self) -> Result<Vec<Tally>>;

    async fn count_by_search_engine(&self) -> Result<Vec<Tally>>;
}

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS discovery_result (
    id                      INTEGER PRIMARY KEY AUTOINCREMENT,
    profile                 TEXT    NOT NULL,
    name                    TEXT    NOT NULL,
    email                   TEXT    NOT NULL,
    platform                TEXT    NOT NULL,
    search_engine           TEXT    NOT NULL,
    confidence              REAL    NOT NULL,
    ai_enhanced             INTEGER NOT NULL DEFAULT 0,
    method                  TEXT    NOT NULL,
    source_url              TEXT    NOT NULL,
    targeted_email_provider TEXT,
    synthetic               INTEGER NOT NULL DEFAULT 0,
    discovered_at           TEXT    NOT NULL
)"#;

const CREATE_UNIQUE_INDEX: &str = r#"
CREATE UNIQUE INDEX IF NOT EXISTS ux_discovery_result_profile_email
    ON discovery_result (profile, email)"#;

const CREATE_ENGINE_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS ix_discovery_result_engine
    ON discovery_result (search_engine)"#;

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    allow_synthetic: bool,
}

impl SqliteStore {
    /// Open (creating if missing) and migrate. In-memory URLs are pinned to
    /// one connection so every query sees the same database.
    pub async fn connect(url: &str) -> Result<Self> {
        let opts = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let in_memory = url.contains(":memory:") || url.contains("mode=memory");
        let mut pool_opts = SqlitePoolOptions::new().max_connections(4);
        if in_memory {
            pool_opts = pool_opts
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }
        let pool = pool_opts.connect_with(opts).await?;
        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        for ddl in [CREATE_TABLE, CREATE_UNIQUE_INDEX, CREATE_ENGINE_INDEX] {
            sqlx::query(ddl).execute(&pool).await?;
        }
        debug!(target: "store", "store.schema_ready");
        Ok(Self {
            pool,
            allow_synthetic: false,
        })
    }

    pub fn allow_synthetic(mut self, allow: bool) -> Self {
        self.allow_synthetic = allow;
        self
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn tally(&self, column: &'static str) -> Result<Vec<Tally>> {
        let sql = format!(
            "SELECT {column} AS key, COUNT(*) AS n FROM discovery_result \
             GROUP BY {column} ORDER BY n DESC, key ASC"
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter()
            .map(|r| -> Result<Tally> {
                Ok(Tally {
                    key: r.try_get("key")?,
                    count: r.try_get("n")?,
                })
            })
            .collect()
    }
}

fn row_to_result(r: &SqliteRow) -> Result<DiscoveryResult> {
    let method: String = r.try_get("method")?;
    let method = InferenceMethod::from_str(&method).map_err(StoreError::Decode)?;
    let discovered_at: DateTime<Utc> = r.try_get("discovered_at")?;
    Ok(DiscoveryResult {
        profile: r.try_get("profile")?,
        name: r.try_get("name")?,
        email: r.try_get("email")?,
        platform: r.try_get("platform")?,
        search_engine: r.try_get("search_engine")?,
        confidence: r.try_get("confidence")?,
        ai_enhanced: r.try_get::<i64, _>("ai_enhanced")? != 0,
        method,
        source_url: r.try_get("source_url")?,
        targeted_email_provider: r.try_get("targeted_email_provider")?,
        synthetic: r.try_get::<i64, _>("synthetic")? != 0,
        discovered_at,
    })
}

#[async_trait]
impl ResultStore for SqliteStore {
    async fn save(&self, result: &DiscoveryResult) -> Result<SaveOutcome> {
        if result.synthetic && !self.allow_synthetic {
            debug!(target: "store", email = %result.email, "store.save.synthetic_skipped");
            return Ok(SaveOutcome::Skipped);
        }
        let res = sqlx::query(
            r#"INSERT INTO discovery_result
               (profile, name, email, platform, search_engine, confidence, ai_enhanced,
                method, source_url, targeted_email_provider, synthetic, discovered_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
               ON CONFLICT(profile, email) DO NOTHING"#,
        )
        .bind(&result.profile)
        .bind(&result.name)
        .bind(&result.email)
        .bind(&result.platform)
        .bind(&result.search_engine)
        .bind(result.confidence)
        .bind(result.ai_enhanced)
        .bind(result.method.as_str())
        .bind(&result.source_url)
        .bind(result.targeted_email_provider.as_deref())
        .bind(result.synthetic)
        .bind(result.discovered_at)
        .execute(&self.pool)
        .await?;

        let outcome = if res.rows_affected() == 0 {
            SaveOutcome::Duplicate
        } else {
            SaveOutcome::Inserted
        };
        info!(
            target: "store",
            profile = %result.profile,
            email = %result.email,
            outcome = ?outcome,
            "store.save"
        );
        Ok(outcome)
    }

    async fn find_by_profile(&self, profile: &str, limit: i64) -> Result<Vec<DiscoveryResult>> {
        let rows = sqlx::query(
            r#"SELECT profile, name, email, platform, search_engine, confidence, ai_enhanced,
                      method, source_url, targeted_email_provider, synthetic, discovered_at
               FROM discovery_result
               WHERE profile = ?1
               ORDER BY discovered_at DESC, id DESC
               LIMIT ?2"#,
        )
        .bind(profile)
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_result).collect()
    }

    async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM discovery_result")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("n")?)
    }

    async fn count_by_profile(&self) -> Result<Vec<Tally>> {
        self.tally("profile").await
    }

    async fn count_by_search_engine(&self) -> Result<Vec<Tally>> {
        self.tally("search_engine").await
    }
}
