use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;

use crate::services::hashing;
use crate::services::redis_cache::StoreError;

/// Header carrying the anti-forgery token on state-changing requests.
pub const CSRF_HEADER: &str = "x-csrf-token";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CsrfToken {
    pub csrf_token: String,
    pub expires: DateTime<Utc>,
}

/// Server-side record of outstanding CSRF tokens.
///
/// `take` must remove and return in one step: that is what makes a token
/// single-use when two requests race with the same value.
#[async_trait]
pub trait CsrfTokenStore: Send + Sync {
    async fn insert(&self, token: &str, expires: DateTime<Utc>) -> Result<(), StoreError>;
    async fn take(&self, token: &str) -> Result<Option<DateTime<Utc>>, StoreError>;
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, StoreError>;
}

#[derive(Default)]
pub struct MemoryCsrfStore {
    tokens: DashMap<String, DateTime<Utc>>,
}

impl MemoryCsrfStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[async_trait]
impl CsrfTokenStore for MemoryCsrfStore {
    async fn insert(&self, token: &str, expires: DateTime<Utc>) -> Result<(), StoreError> {
        self.tokens.insert(token.to_string(), expires);
        Ok(())
    }

    async fn take(&self, token: &str) -> Result<Option<DateTime<Utc>>, StoreError> {
        Ok(self.tokens.remove(token).map(|(_, expires)| expires))
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let before = self.tokens.len();
        self.tokens.retain(|_, expires| *expires > now);
        Ok(before.saturating_sub(self.tokens.len()))
    }
}

#[derive(Clone)]
pub struct CsrfGuard {
    store: Arc<dyn CsrfTokenStore>,
    ttl: Duration,
}

impl CsrfGuard {
    pub fn new(store: Arc<dyn CsrfTokenStore>) -> Self {
        Self::with_ttl(store, Duration::hours(24))
    }

    pub fn with_ttl(store: Arc<dyn CsrfTokenStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Drops expired tokens. Store failures are logged and count as zero.
    pub async fn sweep(&self) -> usize {
        match self.store.purge_expired(Utc::now()).await {
            Ok(0) => 0,
            Ok(purged) => {
                tracing::debug!(purged, "swept expired csrf tokens");
                purged
            }
            Err(e) => {
                tracing::warn!(error = %e, "csrf sweep failed");
                0
            }
        }
    }

    pub async fn issue_token(&self) -> Result<CsrfToken, StoreError> {
        self.sweep().await;

        let now = Utc::now();
        let token = hashing::random_token();
        let expires = now + self.ttl;
        self.store.insert(&token, expires).await?;

        Ok(CsrfToken {
            csrf_token: token,
            expires,
        })
    }

    /// True exactly once per issued, unexpired token.
    pub async fn validate(&self, token: &str) -> bool {
        let token = token.trim();
        if token.is_empty() {
            return false;
        }

        match self.store.take(token).await {
            Ok(Some(expires)) => expires > Utc::now(),
            Ok(None) => false,
            Err(e) => {
                tracing::error!(error = %e, "csrf store unavailable");
                false
            }
        }
    }
}
