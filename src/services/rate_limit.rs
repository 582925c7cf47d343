use async_trait::async_trait;
use axum::{
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::{collections::HashMap, sync::Arc};

use crate::services::redis_cache::StoreError;

/// Named limits applied by the gatekeeper, one independent counter space each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateLimitPolicy {
    Login,
    Register,
    PasswordReset,
    EmailVerification,
    General,
    CreateVideo,
}

impl RateLimitPolicy {
    pub const ALL: [RateLimitPolicy; 6] = [
        Self::Login,
        Self::Register,
        Self::PasswordReset,
        Self::EmailVerification,
        Self::General,
        Self::CreateVideo,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Register => "register",
            Self::PasswordReset => "password-reset",
            Self::EmailVerification => "email-verification",
            Self::General => "general",
            Self::CreateVideo => "create-video",
        }
    }

    pub fn max_attempts(&self) -> u32 {
        match self {
            Self::Login => 5,
            Self::Register => 3,
            Self::PasswordReset => 3,
            Self::EmailVerification => 5,
            Self::General => 60,
            Self::CreateVideo => 5,
        }
    }

    pub fn window(&self) -> Duration {
        match self {
            Self::Login => Duration::minutes(15),
            Self::Register => Duration::hours(1),
            Self::PasswordReset => Duration::hours(1),
            Self::EmailVerification => Duration::hours(1),
            Self::General => Duration::minutes(1),
            Self::CreateVideo => Duration::minutes(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitEntry {
    pub count: u32,
    pub reset_time: DateTime<Utc>,
}

impl RateLimitEntry {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        now <= self.reset_time
    }
}

#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Counts one request for `key`. When there is no live window the count
    /// restarts at 1 with `reset_time = now + window`.
    async fn hit(
        &self,
        key: &str,
        window: Duration,
        now: DateTime<Utc>,
    ) -> Result<RateLimitEntry, StoreError>;

    async fn get(&self, key: &str) -> Result<Option<RateLimitEntry>, StoreError>;

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, StoreError>;
}

#[derive(Default)]
pub struct MemoryRateLimitStore {
    entries: DashMap<String, RateLimitEntry>,
}

impl MemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RateLimitStore for MemoryRateLimitStore {
    async fn hit(
        &self,
        key: &str,
        window: Duration,
        now: DateTime<Utc>,
    ) -> Result<RateLimitEntry, StoreError> {
        // entry() holds the shard lock for the whole read-modify-write
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert(RateLimitEntry {
                count: 0,
                reset_time: now + window,
            });

        if entry.count == 0 || !entry.is_live(now) {
            entry.count = 1;
            entry.reset_time = now + window;
        } else {
            entry.count = entry.count.saturating_add(1);
        }

        Ok(*entry)
    }

    async fn get(&self, key: &str) -> Result<Option<RateLimitEntry>, StoreError> {
        Ok(self.entries.get(key).map(|e| *e))
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_live(now));
        Ok(before.saturating_sub(self.entries.len()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub policy: RateLimitPolicy,
    pub limited: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_time: DateTime<Utc>,
}

/// Fixed-window counter. The window restarts wholesale once `reset_time`
/// passes, so a client can land up to `2 * max_attempts` requests around a
/// window boundary.
#[derive(Clone)]
pub struct RateLimiter {
    policy: RateLimitPolicy,
    max_attempts: u32,
    window: Duration,
    store: Arc<dyn RateLimitStore>,
}

impl RateLimiter {
    pub fn new(policy: RateLimitPolicy, store: Arc<dyn RateLimitStore>) -> Self {
        Self::with_limits(policy, policy.max_attempts(), policy.window(), store)
    }

    pub fn with_limits(
        policy: RateLimitPolicy,
        max_attempts: u32,
        window: Duration,
        store: Arc<dyn RateLimitStore>,
    ) -> Self {
        Self {
            policy,
            max_attempts,
            window,
            store,
        }
    }

    pub fn policy(&self) -> RateLimitPolicy {
        self.policy
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Counts the request and reports whether it is over the limit.
    /// A failing store lets the request through.
    pub async fn check(&self, identifier: &str) -> RateLimitDecision {
        self.check_at(identifier, Utc::now()).await
    }

    async fn check_at(&self, identifier: &str, now: DateTime<Utc>) -> RateLimitDecision {
        match self.store.hit(identifier, self.window, now).await {
            Ok(entry) => RateLimitDecision {
                policy: self.policy,
                limited: entry.count > self.max_attempts,
                limit: self.max_attempts,
                remaining: self.max_attempts.saturating_sub(entry.count),
                reset_time: entry.reset_time,
            },
            Err(e) => {
                tracing::warn!(error = %e, policy = self.policy.name(), "rate limit store failed; allowing request");
                RateLimitDecision {
                    policy: self.policy,
                    limited: false,
                    limit: self.max_attempts,
                    remaining: self.max_attempts,
                    reset_time: now + self.window,
                }
            }
        }
    }

    pub async fn is_limited(&self, identifier: &str) -> bool {
        self.check(identifier).await.limited
    }

    pub async fn remaining(&self, identifier: &str) -> u32 {
        self.remaining_at(identifier, Utc::now()).await
    }

    async fn remaining_at(&self, identifier: &str, now: DateTime<Utc>) -> u32 {
        match self.live_entry(identifier, now).await {
            Some(entry) => self.max_attempts.saturating_sub(entry.count),
            None => self.max_attempts,
        }
    }

    pub async fn reset_time(&self, identifier: &str) -> DateTime<Utc> {
        self.reset_time_at(identifier, Utc::now()).await
    }

    async fn reset_time_at(&self, identifier: &str, now: DateTime<Utc>) -> DateTime<Utc> {
        match self.live_entry(identifier, now).await {
            Some(entry) => entry.reset_time,
            None => now + self.window,
        }
    }

    async fn live_entry(&self, identifier: &str, now: DateTime<Utc>) -> Option<RateLimitEntry> {
        match self.store.get(identifier).await {
            Ok(entry) => entry.filter(|e| e.is_live(now)),
            Err(e) => {
                tracing::warn!(error = %e, "rate limit store lookup failed");
                None
            }
        }
    }
}

/// One limiter per policy over a shared store.
#[derive(Clone)]
pub struct RateLimiters {
    limiters: HashMap<RateLimitPolicy, RateLimiter>,
    store: Arc<dyn RateLimitStore>,
}

impl RateLimiters {
    pub fn new(store: Arc<dyn RateLimitStore>) -> Self {
        let limiters = RateLimitPolicy::ALL
            .iter()
            .map(|policy| (*policy, RateLimiter::new(*policy, store.clone())))
            .collect();
        Self { limiters, store }
    }

    /// Swap in a limiter with custom thresholds for one policy.
    pub fn with_override(mut self, policy: RateLimitPolicy, max_attempts: u32, window: Duration) -> Self {
        self.limiters.insert(
            policy,
            RateLimiter::with_limits(policy, max_attempts, window, self.store.clone()),
        );
        self
    }

    pub fn get(&self, policy: RateLimitPolicy) -> RateLimiter {
        self.limiters
            .get(&policy)
            .cloned()
            .unwrap_or_else(|| RateLimiter::new(policy, self.store.clone()))
    }

    pub async fn sweep(&self) -> usize {
        match self.store.purge_expired(Utc::now()).await {
            Ok(purged) => purged,
            Err(e) => {
                tracing::warn!(error = %e, "rate limit sweep failed");
                0
            }
        }
    }
}

const IP_HEADERS: [&str; 4] = ["x-forwarded-for", "x-real-ip", "cf-connecting-ip", "x-client-ip"];

pub fn client_ip(headers: &HeaderMap) -> String {
    IP_HEADERS
        .iter()
        .filter_map(|name| headers.get(*name).and_then(|v| v.to_str().ok()))
        .filter_map(|value| value.split(',').next().map(str::trim))
        .find(|ip| !ip.is_empty())
        .unwrap_or("unknown")
        .to_string()
}

/// `<policy>:<ip>:<user-agent>:<path>`: a per-route, per-client counter.
pub fn client_identifier(policy: RateLimitPolicy, headers: &HeaderMap, path: &str) -> String {
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");
    format!("{}:{}:{}:{}", policy.name(), client_ip(headers), user_agent, path)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RateLimitedBody {
    success: bool,
    message: String,
    remaining_attempts: u32,
    reset_time: DateTime<Utc>,
}

impl RateLimitDecision {
    pub fn retry_after_secs(&self) -> i64 {
        (self.reset_time - Utc::now()).num_seconds().max(1)
    }

    pub fn apply_headers(&self, headers: &mut HeaderMap) {
        let pairs = [
            ("x-ratelimit-limit", self.limit.to_string()),
            ("x-ratelimit-remaining", self.remaining.to_string()),
            ("x-ratelimit-reset", self.reset_time.timestamp().to_string()),
        ];
        for (name, value) in pairs {
            if let Ok(value) = HeaderValue::from_str(&value) {
                headers.insert(HeaderName::from_static(name), value);
            }
        }
    }
}

impl IntoResponse for RateLimitDecision {
    fn into_response(self) -> Response {
        let body = RateLimitedBody {
            success: false,
            message: "Too many requests. Please try again later.".to_string(),
            remaining_attempts: self.remaining,
            reset_time: self.reset_time,
        };

        let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
        let headers = response.headers_mut();
        self.apply_headers(headers);
        if let Ok(value) = HeaderValue::from_str(&self.retry_after_secs().to_string()) {
            headers.insert(header::RETRY_AFTER, value);
        }
        response
    }
}
