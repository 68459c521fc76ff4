use async_trait::async_trait;
use crate::BoxError;

/// Short-lived keys guarding request handling.
#[async_trait]
pub trait RequestGuard: Send + Sync {
    /// Claims `key` for `ttl_seconds`. Returns false if someone already holds it.
    async fn claim_once(&self, key: &str, ttl_seconds: u64) -> Result<bool, BoxError>;

    /// Drops a claim so the request can be retried.
    async fn release(&self, key: &str) -> Result<(), BoxError>;

    /// Counts a hit against `key` and reports whether it is within `limit`
    /// for the current window.
    async fn check_rate_limit(&self, key: &str, limit: i64, window_seconds: i64) -> Result<bool, BoxError>;
}
