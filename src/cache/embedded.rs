//! Embedded cache backed by a sled database.
//!
//! sled has no native per-entry expiration, so the expiry is part of the
//! stored record itself: every value is written as an 8-byte big-endian
//! "expires at" timestamp in unix milliseconds (0 meaning never) followed by
//! the encoded envelope. Changing a TTL therefore rewrites the record.
//! Expired records read as absent and are removed lazily on point reads and
//! in bulk by [`EmbeddedCache::purge_expired`].

use std::time::Duration;

use async_trait::async_trait;
use sled::transaction::{
    ConflictableTransactionError, ConflictableTransactionResult, TransactionError,
};
use sled::{Batch, Db, IVec};

use crate::cache::envelope::{self, Envelope};
use crate::cache::namespace::{namespace, namespace_prefix};
use crate::cache::{Cache, CacheError, CacheValue};
use crate::config::settings::EmbeddedCacheConfig;

const EXPIRY_HEADER_LEN: usize = 8;

fn now_millis() -> u64 {
    jiff::Timestamp::now().as_millisecond().max(0) as u64
}

fn expires_at_after(ttl: Duration) -> u64 {
    let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
    // 0 is reserved for "never", so even a zero TTL lands in the past but not on 0.
    now_millis().saturating_add(ttl_ms).max(1)
}

fn encode_record(expires_at: Option<u64>, payload: &[u8]) -> Vec<u8> {
    let mut record = Vec::with_capacity(EXPIRY_HEADER_LEN + payload.len());
    record.extend_from_slice(&expires_at.unwrap_or(0).to_be_bytes());
    record.extend_from_slice(payload);
    record
}

/// Split a raw record into its expiry and envelope payload.
fn parse_record(raw: &[u8]) -> Result<(Option<u64>, &[u8]), CacheError> {
    if raw.len() < EXPIRY_HEADER_LEN {
        return Err(CacheError::Codec(format!(
            "record too short: {} bytes",
            raw.len()
        )));
    }
    let (header, payload) = raw.split_at(EXPIRY_HEADER_LEN);
    let mut stamp = [0u8; EXPIRY_HEADER_LEN];
    stamp.copy_from_slice(header);
    let expires_at = match u64::from_be_bytes(stamp) {
        0 => None,
        at => Some(at),
    };
    Ok((expires_at, payload))
}

fn is_expired(expires_at: Option<u64>, now: u64) -> bool {
    matches!(expires_at, Some(at) if at <= now)
}

/// A record counts as present unless its header says it has expired.
/// Unparseable records still exist; reading them reports the codec error.
fn record_is_live(raw: &[u8], now: u64) -> bool {
    match parse_record(raw) {
        Ok((expires_at, _)) => !is_expired(expires_at, now),
        Err(_) => true,
    }
}

fn map_tx_error(operation: &str, err: TransactionError<CacheError>) -> CacheError {
    match err {
        TransactionError::Abort(e) => e,
        TransactionError::Storage(e) => CacheError::storage(operation, e),
    }
}

/// Cache over a local sled database.
#[derive(Clone)]
pub struct EmbeddedCache {
    db: Db,
    prefix: String,
    batch_size: usize,
}

impl EmbeddedCache {
    /// Wrap an already opened database.
    ///
    /// Several instances with different prefixes may share one database.
    pub fn new(db: Db, prefix: impl Into<String>, batch_size: usize) -> Self {
        Self {
            db,
            prefix: prefix.into(),
            batch_size: batch_size.max(1),
        }
    }

    /// Open (or create) the database described by `config`.
    ///
    /// A temporary database ignores `directory` and lives under a fresh
    /// path of its own, so several may be open at once.
    pub fn open(config: &EmbeddedCacheConfig, prefix: &str) -> Result<Self, CacheError> {
        let db_config = if config.temporary {
            sled::Config::new().temporary(true)
        } else {
            sled::Config::new().path(&config.directory)
        };
        let db = db_config
            .open()
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        tracing::debug!(
            directory = %config.directory,
            temporary = config.temporary,
            prefix,
            "Opened embedded cache"
        );

        Ok(Self::new(db, prefix, config.batch_size))
    }

    /// Underlying database handle.
    pub fn db(&self) -> &Db {
        &self.db
    }

    fn namespaced(&self, key: &str) -> String {
        namespace(&self.prefix, key)
    }

    /// Point read that hides expired records and removes them opportunistically.
    fn read_live(&self, physical: &str) -> Result<Option<IVec>, CacheError> {
        let Some(raw) = self
            .db
            .get(physical.as_bytes())
            .map_err(|e| CacheError::storage("read", e))?
        else {
            return Ok(None);
        };

        if record_is_live(&raw, now_millis()) {
            return Ok(Some(raw));
        }

        // Only remove the exact record we saw; a concurrent writer may have replaced it.
        if let Err(e) = self
            .db
            .compare_and_swap(physical.as_bytes(), Some(&raw), None::<IVec>)
        {
            tracing::warn!(key = physical, error = %e, "Failed to remove expired record");
        }
        Ok(None)
    }

    fn write(&self, physical: &str, record: &[u8]) -> Result<(), CacheError> {
        self.db
            .transaction(|tx| -> ConflictableTransactionResult<(), CacheError> {
                tx.insert(physical.as_bytes(), record)?;
                Ok(())
            })
            .map_err(|e| map_tx_error("write", e))
    }

    fn scan_live(&self, prefix: &str) -> Result<Vec<String>, CacheError> {
        let now = now_millis();
        let mut keys = Vec::new();
        for item in self.db.scan_prefix(prefix.as_bytes()) {
            let (key, raw) = item.map_err(|e| CacheError::storage("scan", e))?;
            if !record_is_live(&raw, now) {
                continue;
            }
            match std::str::from_utf8(&key) {
                Ok(key) => keys.push(key.to_string()),
                Err(_) => tracing::warn!(?key, "Skipping key that is not valid UTF-8"),
            }
        }
        Ok(keys)
    }

    /// Delete matching records in passes of at most `batch_size` keys until a
    /// pass finds nothing. Each pass is applied as one atomic batch.
    fn delete_matching(db: &Db, prefix: &str, batch_size: usize) -> Result<usize, CacheError> {
        let mut total = 0;
        loop {
            let mut batch = Batch::default();
            let mut deleted = 0;

            for item in db.scan_prefix(prefix.as_bytes()) {
                let (key, _) = item.map_err(|e| CacheError::storage("scan", e))?;
                batch.remove(key);
                deleted += 1;
                if deleted >= batch_size {
                    break;
                }
            }

            if deleted == 0 {
                return Ok(total);
            }

            db.apply_batch(batch)
                .map_err(|e| CacheError::storage("batch delete", e))?;
            total += deleted;
            tracing::debug!(prefix, deleted, total, "Deleted batch");
        }
    }

    /// Up to `limit` expired records under `prefix`, with the bytes seen.
    fn collect_expired(
        db: &Db,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<(IVec, IVec)>, CacheError> {
        let now = now_millis();
        let mut expired = Vec::new();
        for item in db.scan_prefix(prefix.as_bytes()) {
            let (key, raw) = item.map_err(|e| CacheError::storage("scan", e))?;
            if record_is_live(&raw, now) {
                continue;
            }
            expired.push((key, raw));
            if expired.len() >= limit {
                break;
            }
        }
        Ok(expired)
    }

    /// Remove each record only if it still holds the bytes that were seen
    /// expired; a record rewritten in the meantime is left alone.
    fn remove_unchanged(db: &Db, records: Vec<(IVec, IVec)>) -> Result<usize, CacheError> {
        let mut removed = 0;
        for (key, raw) in records {
            let swapped = db
                .compare_and_swap(&key, Some(&raw), None::<IVec>)
                .map_err(|e| CacheError::storage("purge", e))?;
            if swapped.is_ok() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn purge_matching(db: &Db, prefix: &str, batch_size: usize) -> Result<usize, CacheError> {
        let mut total = 0;
        loop {
            let expired = Self::collect_expired(db, prefix, batch_size)?;
            if expired.is_empty() {
                return Ok(total);
            }
            let removed = Self::remove_unchanged(db, expired)?;
            total += removed;
            tracing::debug!(prefix, removed, total, "Purged batch");
        }
    }

    async fn delete_matching_blocking(
        &self,
        prefix: String,
        only_expired: bool,
    ) -> Result<usize, CacheError> {
        let db = self.db.clone();
        let batch_size = self.batch_size;
        tokio::task::spawn_blocking(move || {
            if only_expired {
                Self::purge_matching(&db, &prefix, batch_size)
            } else {
                Self::delete_matching(&db, &prefix, batch_size)
            }
        })
        .await
        .map_err(|e| CacheError::storage("batch delete", e))?
    }

    /// Remove every expired record owned by this instance.
    pub async fn purge_expired(&self) -> Result<usize, CacheError> {
        let purged = self
            .delete_matching_blocking(namespace_prefix(&self.prefix), true)
            .await?;
        tracing::info!(prefix = %self.prefix, purged, "Purged expired records");
        Ok(purged)
    }

    /// Flush pending writes to disk.
    pub async fn flush(&self) -> Result<(), CacheError> {
        self.db
            .flush_async()
            .await
            .map_err(|e| CacheError::storage("flush", e))?;
        Ok(())
    }
}

#[async_trait]
impl Cache for EmbeddedCache {
    fn prefix(&self) -> &str {
        &self.prefix
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        let physical = self.namespaced(key);
        Ok(self.read_live(&physical)?.is_some())
    }

    async fn get(&self, key: &str) -> Result<CacheValue, CacheError> {
        let physical = self.namespaced(key);
        let raw = self
            .read_live(&physical)?
            .ok_or_else(|| CacheError::not_found(&physical))?;

        let (_, payload) = parse_record(&raw)?;
        envelope::decode(payload)?.into_value_for(&physical)
    }

    async fn set(
        &self,
        key: &str,
        value: CacheValue,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        let physical = self.namespaced(key);
        let payload = envelope::encode(&Envelope::new(physical.clone(), value))?;
        let record = encode_record(ttl.map(expires_at_after), &payload);

        tracing::debug!(key = %physical, ttl_ms = ttl.map(|t| t.as_millis() as u64), "set");
        self.write(&physical, &record)
    }

    async fn update(&self, key: &str, value: CacheValue) -> Result<(), CacheError> {
        let physical = self.namespaced(key);
        let payload = envelope::encode(&Envelope::new(physical.clone(), value))?;
        let record = encode_record(None, &payload);

        self.db
            .transaction(|tx| -> ConflictableTransactionResult<(), CacheError> {
                let live = tx
                    .get(physical.as_bytes())?
                    .is_some_and(|raw| record_is_live(&raw, now_millis()));
                if !live {
                    return Err(ConflictableTransactionError::Abort(CacheError::not_found(
                        &physical,
                    )));
                }
                tx.insert(physical.as_bytes(), record.as_slice())?;
                Ok(())
            })
            .map_err(|e| map_tx_error("update", e))
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let physical = self.namespaced(key);
        self.db
            .transaction(|tx| -> ConflictableTransactionResult<(), CacheError> {
                tx.remove(physical.as_bytes())?;
                Ok(())
            })
            .map_err(|e| map_tx_error("delete", e))
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), CacheError> {
        let physical = self.namespaced(key);
        let expires_at = expires_at_after(ttl);

        self.db
            .transaction(|tx| -> ConflictableTransactionResult<(), CacheError> {
                let raw = match tx.get(physical.as_bytes())? {
                    Some(raw) if record_is_live(&raw, now_millis()) => raw,
                    _ => {
                        return Err(ConflictableTransactionError::Abort(CacheError::not_found(
                            &physical,
                        )));
                    }
                };
                let (_, payload) = parse_record(&raw).map_err(ConflictableTransactionError::Abort)?;
                tx.insert(physical.as_bytes(), encode_record(Some(expires_at), payload))?;
                Ok(())
            })
            .map_err(|e| map_tx_error("expire", e))
    }

    async fn ttl(&self, key: &str) -> Result<Duration, CacheError> {
        let physical = self.namespaced(key);
        let raw = self
            .read_live(&physical)?
            .ok_or_else(|| CacheError::not_found(&physical))?;

        match parse_record(&raw)?.0 {
            None => Ok(Duration::ZERO),
            Some(at) => Ok(Duration::from_millis(at.saturating_sub(now_millis()))),
        }
    }

    async fn keys(&self, patterns: &[&str]) -> Result<Vec<String>, CacheError> {
        match patterns {
            [] => self.scan_live(&namespace_prefix(&self.prefix)),
            [pattern] => self.scan_live(&self.namespaced(pattern)),
            many => {
                let mut keys = Vec::with_capacity(many.len());
                for key in many {
                    let physical = self.namespaced(key);
                    if self.read_live(&physical)?.is_some() {
                        keys.push(physical);
                    }
                }
                Ok(keys)
            }
        }
    }

    async fn empty_by_match(&self, pattern: &str) -> Result<(), CacheError> {
        let deleted = self
            .delete_matching_blocking(self.namespaced(pattern), false)
            .await?;
        tracing::info!(prefix = %self.prefix, pattern, deleted, "Emptied matching keys");
        Ok(())
    }

    async fn empty(&self) -> Result<(), CacheError> {
        let deleted = self
            .delete_matching_blocking(namespace_prefix(&self.prefix), false)
            .await?;
        tracing::info!(prefix = %self.prefix, deleted, "Emptied cache");
        Ok(())
    }
}
