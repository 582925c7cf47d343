use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use redis::aio::MultiplexedConnection;

use crate::services::csrf::CsrfTokenStore;
use crate::services::rate_limit::{RateLimitEntry, RateLimitStore};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Corrupt store entry: {0}")]
    Corrupt(String),
}

const RATE_LIMIT_PREFIX: &str = "ratelimit:";
const CSRF_PREFIX: &str = "csrf:";

/// Shared cache for deployments running more than one instance. Expiry is
/// left to Redis key TTLs, so the sweeps are no-ops.
#[derive(Clone)]
pub struct RedisService {
    conn: MultiplexedConnection,
}

impl RedisService {
    pub async fn connect(redis_url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

fn millis(duration: Duration) -> i64 {
    duration.num_milliseconds().max(1)
}

#[async_trait]
impl RateLimitStore for RedisService {
    async fn hit(
        &self,
        key: &str,
        window: Duration,
        now: DateTime<Utc>,
    ) -> Result<RateLimitEntry, StoreError> {
        let key = format!("{RATE_LIMIT_PREFIX}{key}");
        let mut conn = self.conn.clone();

        let (count, mut ttl_ms): (i64, i64) = redis::pipe()
            .atomic()
            .cmd("INCR")
            .arg(&key)
            .cmd("PTTL")
            .arg(&key)
            .query_async(&mut conn)
            .await?;

        // first hit of a window, or a key that lost its TTL
        if count == 1 || ttl_ms < 0 {
            ttl_ms = millis(window);
            let _: () = redis::cmd("PEXPIRE")
                .arg(&key)
                .arg(ttl_ms)
                .query_async(&mut conn)
                .await?;
        }

        Ok(RateLimitEntry {
            count: u32::try_from(count).unwrap_or(u32::MAX),
            reset_time: now + Duration::milliseconds(ttl_ms),
        })
    }

    async fn get(&self, key: &str) -> Result<Option<RateLimitEntry>, StoreError> {
        let key = format!("{RATE_LIMIT_PREFIX}{key}");
        let mut conn = self.conn.clone();

        let (count, ttl_ms): (Option<i64>, i64) = redis::pipe()
            .cmd("GET")
            .arg(&key)
            .cmd("PTTL")
            .arg(&key)
            .query_async(&mut conn)
            .await?;

        Ok(match count {
            Some(count) if ttl_ms > 0 => Some(RateLimitEntry {
                count: u32::try_from(count).unwrap_or(u32::MAX),
                reset_time: Utc::now() + Duration::milliseconds(ttl_ms),
            }),
            _ => None,
        })
    }

    async fn purge_expired(&self, _now: DateTime<Utc>) -> Result<usize, StoreError> {
        Ok(0)
    }
}

#[async_trait]
impl CsrfTokenStore for RedisService {
    async fn insert(&self, token: &str, expires: DateTime<Utc>) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: () = redis::cmd("SET")
            .arg(format!("{CSRF_PREFIX}{token}"))
            .arg(expires.timestamp_millis())
            .arg("PX")
            .arg(millis(expires - Utc::now()))
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn take(&self, token: &str) -> Result<Option<DateTime<Utc>>, StoreError> {
        let mut conn = self.conn.clone();
        let stored: Option<i64> = redis::cmd("GETDEL")
            .arg(format!("{CSRF_PREFIX}{token}"))
            .query_async(&mut conn)
            .await?;

        stored
            .map(|ms| {
                Utc.timestamp_millis_opt(ms)
                    .single()
                    .ok_or_else(|| StoreError::Corrupt(format!("csrf expiry {ms}")))
            })
            .transpose()
    }

    async fn purge_expired(&self, _now: DateTime<Utc>) -> Result<usize, StoreError> {
        Ok(0)
    }
}
