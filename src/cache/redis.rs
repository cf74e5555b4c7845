//! Redis cache implementation using bb8 connection pool.

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use bb8::{Pool, PooledConnection};
use redis::aio::MultiplexedConnection;
use redis::{Client, RedisError};

use crate::cache::envelope::{self, Envelope};
use crate::cache::namespace::{namespace, namespace_prefix};
use crate::cache::{Cache, CacheError, CacheValue};
use crate::config::settings::RedisCacheConfig;

pub type RedisPool = Pool<Client>;

/// Escape glob metacharacters so `SCAN MATCH` treats `literal` byte for byte.
pub(crate) fn escape_glob(literal: &str) -> String {
    let mut escaped = String::with_capacity(literal.len());
    for c in literal.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Interpret a `PTTL` reply.
fn ttl_from_reply(physical: &str, millis: i64) -> Result<Duration, CacheError> {
    match millis {
        -2 => Err(CacheError::not_found(physical)),
        -1 => Ok(Duration::ZERO),
        ms if ms >= 0 => Ok(Duration::from_millis(ms as u64)),
        other => Err(CacheError::storage(
            "ttl",
            format!("unexpected PTTL reply {other}"),
        )),
    }
}

fn op_error(operation: &'static str) -> impl Fn(RedisError) -> CacheError {
    move |e| CacheError::storage(operation, e)
}

/// Redis-based cache with bb8 connection pool.
///
/// Expiration is native Redis key state, so `expire` never rewrites the value.
pub struct RedisCache {
    pool: RedisPool,
    prefix: String,
    scan_count: usize,
    batch_size: usize,
}

impl RedisCache {
    pub async fn new(config: &RedisCacheConfig, prefix: &str) -> Result<Self, CacheError> {
        let client =
            Client::open(config.url.as_str()).map_err(|e| CacheError::Connection(e.to_string()))?;

        let pool = Pool::builder()
            .max_size(config.pool_size)
            .connection_timeout(Duration::from_secs(config.connection_timeout))
            .build(client)
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        tracing::debug!(url = %config.url, pool_size = config.pool_size, prefix, "Connected redis cache");

        Ok(Self::from_pool(pool, prefix, config.scan_count, config.batch_size))
    }

    /// Build on top of a pool owned elsewhere, e.g. shared with a session store.
    pub fn from_pool(
        pool: RedisPool,
        prefix: impl Into<String>,
        scan_count: usize,
        batch_size: usize,
    ) -> Self {
        Self {
            pool,
            prefix: prefix.into(),
            scan_count: scan_count.max(1),
            batch_size: batch_size.max(1),
        }
    }

    pub fn pool(&self) -> &RedisPool {
        &self.pool
    }

    fn namespaced(&self, key: &str) -> String {
        namespace(&self.prefix, key)
    }

    async fn get_conn(&self) -> Result<PooledConnection<'_, Client>, CacheError> {
        self.pool
            .get()
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))
    }

    async fn exists_on(
        conn: &mut MultiplexedConnection,
        physical: &str,
    ) -> Result<bool, CacheError> {
        redis::cmd("EXISTS")
            .arg(physical)
            .query_async(conn)
            .await
            .map_err(op_error("exists"))
    }

    /// Every key matching `glob`, sorted and de-duplicated (SCAN may repeat keys).
    async fn scan(
        &self,
        conn: &mut MultiplexedConnection,
        glob: &str,
    ) -> Result<Vec<String>, CacheError> {
        let mut found = BTreeSet::new();
        let mut cursor: u64 = 0;
        loop {
            let (next, page): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(glob)
                .arg("COUNT")
                .arg(self.scan_count)
                .query_async(&mut *conn)
                .await
                .map_err(op_error("scan"))?;
            found.extend(page);
            if next == 0 {
                break;
            }
            cursor = next;
        }
        Ok(found.into_iter().collect())
    }

    /// Scan-and-delete until a pass matches nothing. Deletes are chunked so no
    /// single DEL carries more than `batch_size` keys.
    async fn delete_matching(&self, literal_prefix: &str) -> Result<usize, CacheError> {
        let mut conn = self.get_conn().await?;
        let conn_ref: &mut MultiplexedConnection = &mut conn;
        let glob = format!("{}*", escape_glob(literal_prefix));

        let mut total = 0;
        loop {
            let keys = self.scan(conn_ref, &glob).await?;
            if keys.is_empty() {
                return Ok(total);
            }

            for chunk in keys.chunks(self.batch_size) {
                let removed: usize = redis::cmd("DEL")
                    .arg(chunk)
                    .query_async(&mut *conn_ref)
                    .await
                    .map_err(op_error("batch delete"))?;
                total += removed;
                tracing::debug!(prefix = literal_prefix, removed, total, "Deleted batch");
            }
        }
    }
}

#[async_trait]
impl Cache for RedisCache {
    fn prefix(&self) -> &str {
        &self.prefix
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        let mut conn = self.get_conn().await?;
        Self::exists_on(&mut conn, &self.namespaced(key)).await
    }

    async fn get(&self, key: &str) -> Result<CacheValue, CacheError> {
        let mut conn = self.get_conn().await?;
        let physical = self.namespaced(key);

        let conn_ref: &mut MultiplexedConnection = &mut conn;
        let raw: Option<Vec<u8>> = redis::cmd("GET")
            .arg(&physical)
            .query_async(conn_ref)
            .await
            .map_err(op_error("get"))?;

        let raw = raw.ok_or_else(|| CacheError::not_found(&physical))?;
        envelope::decode(&raw)?.into_value_for(&physical)
    }

    async fn set(
        &self,
        key: &str,
        value: CacheValue,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        let mut conn = self.get_conn().await?;
        let physical = self.namespaced(key);
        let payload = envelope::encode(&Envelope::new(physical.clone(), value))?;

        let mut cmd = redis::cmd("SET");
        cmd.arg(&physical).arg(payload);
        if let Some(ttl) = ttl {
            // PX 0 is rejected by the server; round up to the smallest expiry.
            cmd.arg("PX").arg(ttl.as_millis().max(1) as u64);
        }

        let conn_ref: &mut MultiplexedConnection = &mut conn;
        cmd.query_async::<()>(conn_ref)
            .await
            .map_err(op_error("set"))
    }

    async fn update(&self, key: &str, value: CacheValue) -> Result<(), CacheError> {
        let mut conn = self.get_conn().await?;
        let physical = self.namespaced(key);

        if !Self::exists_on(&mut conn, &physical).await? {
            return Err(CacheError::not_found(physical));
        }

        let payload = envelope::encode(&Envelope::new(physical.clone(), value))?;
        let conn_ref: &mut MultiplexedConnection = &mut conn;
        redis::cmd("SET")
            .arg(&physical)
            .arg(payload)
            .query_async::<()>(conn_ref)
            .await
            .map_err(op_error("update"))
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.get_conn().await?;
        let conn_ref: &mut MultiplexedConnection = &mut conn;
        redis::cmd("DEL")
            .arg(self.namespaced(key))
            .query_async::<()>(conn_ref)
            .await
            .map_err(op_error("delete"))
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.get_conn().await?;
        let physical = self.namespaced(key);

        let conn_ref: &mut MultiplexedConnection = &mut conn;
        let applied: bool = redis::cmd("PEXPIRE")
            .arg(&physical)
            .arg(ttl.as_millis() as u64)
            .query_async(conn_ref)
            .await
            .map_err(op_error("expire"))?;

        if applied {
            Ok(())
        } else {
            Err(CacheError::not_found(physical))
        }
    }

    async fn ttl(&self, key: &str) -> Result<Duration, CacheError> {
        let mut conn = self.get_conn().await?;
        let physical = self.namespaced(key);

        let conn_ref: &mut MultiplexedConnection = &mut conn;
        let millis: i64 = redis::cmd("PTTL")
            .arg(&physical)
            .query_async(conn_ref)
            .await
            .map_err(op_error("ttl"))?;

        ttl_from_reply(&physical, millis)
    }

    async fn keys(&self, patterns: &[&str]) -> Result<Vec<String>, CacheError> {
        let mut conn = self.get_conn().await?;
        let conn_ref: &mut MultiplexedConnection = &mut conn;

        match patterns {
            [] => {
                let glob = format!("{}*", escape_glob(&namespace_prefix(&self.prefix)));
                self.scan(conn_ref, &glob).await
            }
            [pattern] => {
                let glob = format!("{}*", escape_glob(&self.namespaced(pattern)));
                self.scan(conn_ref, &glob).await
            }
            many => {
                let mut keys = Vec::with_capacity(many.len());
                for key in many {
                    let physical = self.namespaced(key);
                    if Self::exists_on(conn_ref, &physical).await? {
                        keys.push(physical);
                    }
                }
                Ok(keys)
            }
        }
    }

    async fn empty_by_match(&self, pattern: &str) -> Result<(), CacheError> {
        let deleted = self.delete_matching(&self.namespaced(pattern)).await?;
        tracing::info!(prefix = %self.prefix, pattern, deleted, "Emptied matching keys");
        Ok(())
    }

    async fn empty(&self) -> Result<(), CacheError> {
        let deleted = self
            .delete_matching(&namespace_prefix(&self.prefix))
            .await?;
        tracing::info!(prefix = %self.prefix, deleted, "Emptied cache");
        Ok(())
    }
}
