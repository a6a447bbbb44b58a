// db/cache.rs
use redis::{aio::ConnectionManager, AsyncCommands};
use std::sync::Arc;

pub struct CacheHelper;

impl CacheHelper {
    /// Set a key with TTL; the value itself is irrelevant for flag-style keys.
    pub async fn set_flag(
        redis: &Arc<ConnectionManager>,
        key: &str,
        ttl_seconds: usize,
    ) -> Result<(), redis::RedisError> {
        let mut conn = ConnectionManager::clone(redis);
        let _: () = conn.set_ex(key, 1u8, ttl_seconds).await?;
        tracing::debug!("Cache SET: {} (TTL: {}s)", key, ttl_seconds);
        Ok(())
    }

    pub async fn exists(
        redis: &Arc<ConnectionManager>,
        key: &str,
    ) -> Result<bool, redis::RedisError> {
        let mut conn = ConnectionManager::clone(redis);
        let found: bool = conn.exists(key).await?;
        tracing::debug!("Cache {}: {}", if found { "HIT" } else { "MISS" }, key);
        Ok(found)
    }
}

pub fn revoked_token_key(jti: &uuid::Uuid) -> String {
    format!("token_blacklist:{}", jti)
}
