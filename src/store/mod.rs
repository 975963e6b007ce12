//! Settings and counter persistence.
//!
//! Settings are admin-managed key/value strings read fresh on every pipeline
//! run. Counters are usage statistics incremented by concurrent pipelines.
//!
//! - [`SettingsStore`] / [`CounterStore`] - traits injected into the pipeline
//! - [`SqliteStore`] - `SQLite`-backed implementation of both
//!
//! # Example
//!
//! ```ignore
//! use relay_core::store::{CounterKey, CounterStore, SettingKey, SettingsStore, SqliteStore};
//!
//! let store = SqliteStore::new(db);
//! store.set(SettingKey::DumbChannel, "@archive").await?;
//! let total = store.increment(CounterKey::ResolvedLinks, 1).await?;
//! ```

mod error;

pub use error::{StoreDbErrorKind, StoreError};

use std::fmt;

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::db::Database;

/// Admin-managed setting keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    /// Resolver URL template containing `{link}`.
    ApiTemplate,
    /// Archive destination chat (`@username` or numeric id).
    DumbChannel,
    /// Channel users must be members of before the bot serves them.
    ForceSub,
}

impl SettingKey {
    /// Returns the persisted key name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ApiTemplate => "api_template",
            Self::DumbChannel => "dumb_channel",
            Self::ForceSub => "force_sub",
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Usage counter keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CounterKey {
    /// Share links that produced a direct URL.
    ResolvedLinks,
    /// Files delivered to a requester.
    UploadedFiles,
}

impl CounterKey {
    /// Returns the persisted key name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ResolvedLinks => "resolved_links",
            Self::UploadedFiles => "uploaded_files",
        }
    }
}

impl fmt::Display for CounterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key/value settings contract.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Reads a setting; `None` when unset.
    async fn get(&self, key: SettingKey) -> Result<Option<String>, StoreError>;

    /// Creates or replaces a setting.
    async fn set(&self, key: SettingKey, value: &str) -> Result<(), StoreError>;

    /// Removes a setting. Removing an unset key is not an error.
    async fn delete(&self, key: SettingKey) -> Result<(), StoreError>;
}

/// Usage counter contract.
///
/// Implementations must make `increment` safe under concurrent callers.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Adds `by` to the counter and returns the new value.
    async fn increment(&self, key: CounterKey, by: i64) -> Result<i64, StoreError>;

    /// Reads a counter; unset counters read as zero.
    async fn get(&self, key: CounterKey) -> Result<i64, StoreError>;
}

/// `SQLite` implementation of [`SettingsStore`] and [`CounterStore`].
#[derive(Debug, Clone)]
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    /// Creates a store over an open database.
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Stores `value` under `key` only if the key is unset.
    ///
    /// Returns `true` when the value was written.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the insert fails.
    #[instrument(skip(self, value), fields(key = %key))]
    pub async fn set_if_absent(&self, key: SettingKey, value: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("INSERT INTO settings (key, value) VALUES (?, ?) ON CONFLICT(key) DO NOTHING")
            .bind(key.as_str())
            .bind(value)
            .execute(self.db.pool())
            .await
            .map_err(|e| StoreError::database(key.as_str(), &e))?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl SettingsStore for SqliteStore {
    #[instrument(skip(self), fields(key = %key))]
    async fn get(&self, key: SettingKey) -> Result<Option<String>, StoreError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
            .bind(key.as_str())
            .fetch_optional(self.db.pool())
            .await
            .map_err(|e| StoreError::database(key.as_str(), &e))?;
        Ok(row.map(|(value,)| value))
    }

    #[instrument(skip(self, value), fields(key = %key))]
    async fn set(&self, key: SettingKey, value: &str) -> Result<(), StoreError> {
        sqlx::query(
            r"INSERT INTO settings (key, value) VALUES (?, ?)
              ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key.as_str())
        .bind(value)
        .execute(self.db.pool())
        .await
        .map_err(|e| StoreError::database(key.as_str(), &e))?;
        debug!("setting stored");
        Ok(())
    }

    #[instrument(skip(self), fields(key = %key))]
    async fn delete(&self, key: SettingKey) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM settings WHERE key = ?")
            .bind(key.as_str())
            .execute(self.db.pool())
            .await
            .map_err(|e| StoreError::database(key.as_str(), &e))?;
        Ok(())
    }
}

#[async_trait]
impl CounterStore for SqliteStore {
    #[instrument(skip(self), fields(key = %key))]
    async fn increment(&self, key: CounterKey, by: i64) -> Result<i64, StoreError> {
        // Single-statement upsert: concurrent increments never lose an update.
        let (value,): (i64,) = sqlx::query_as(
            r"INSERT INTO stats (key, value) VALUES (?, ?)
              ON CONFLICT(key) DO UPDATE SET value = stats.value + excluded.value
              RETURNING value",
        )
        .bind(key.as_str())
        .bind(by)
        .fetch_one(self.db.pool())
        .await
        .map_err(|e| StoreError::database(key.as_str(), &e))?;
        Ok(value)
    }

    #[instrument(skip(self), fields(key = %key))]
    async fn get(&self, key: CounterKey) -> Result<i64, StoreError> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT value FROM stats WHERE key = ?")
            .bind(key.as_str())
            .fetch_optional(self.db.pool())
            .await
            .map_err(|e| StoreError::database(key.as_str(), &e))?;
        Ok(row.map_or(0, |(value,)| value))
    }
}
