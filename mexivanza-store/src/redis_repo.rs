use async_trait::async_trait;
use mexivanza_core::guard::RequestGuard;
use mexivanza_core::BoxError;
use redis::{AsyncCommands, RedisResult};
use tracing::info;

#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
}

impl RedisClient {
    pub async fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }

    pub async fn claim(&self, key: &str, ttl_seconds: u64) -> RedisResult<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        // SET NX: only the first caller gets the key
        let result: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg("1")
            .arg("NX")
            .arg("EX")
            .arg(ttl_seconds)
            .query_async(&mut conn)
            .await?;

        if result.is_some() {
            info!("Claimed {} for {}s", key, ttl_seconds);
        }
        Ok(result.is_some())
    }

    pub async fn del_key(&self, key: &str) -> RedisResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.del(key).await
    }

    pub async fn incr_window(&self, key: &str, limit: i64, window_seconds: i64) -> RedisResult<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        // Only the first hit of a window sets the expiry
        let script = redis::Script::new(
            r#"
            local count = redis.call("INCR", KEYS[1])
            if count == 1 then
                redis.call("EXPIRE", KEYS[1], ARGV[1])
            end
            return count
        "#,
        );
        let count: i64 = script.key(key).arg(window_seconds).invoke_async(&mut conn).await?;

        Ok(count <= limit)
    }
}

#[async_trait]
impl RequestGuard for RedisClient {
    async fn claim_once(&self, key: &str, ttl_seconds: u64) -> Result<bool, BoxError> {
        Ok(self.claim(key, ttl_seconds).await?)
    }

    async fn release(&self, key: &str) -> Result<(), BoxError> {
        Ok(self.del_key(key).await?)
    }

    async fn check_rate_limit(&self, key: &str, limit: i64, window_seconds: i64) -> Result<bool, BoxError> {
        Ok(self.incr_window(key, limit, window_seconds).await?)
    }
}
