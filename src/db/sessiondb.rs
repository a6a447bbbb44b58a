// db/sessiondb.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Error;
use uuid::Uuid;

use super::{
    cache::{revoked_token_key, CacheHelper},
    db::DBClient,
};

#[async_trait]
pub trait SessionExt {
    /// Marks a token id as unusable until it would have expired anyway.
    /// Entries whose expiry has passed are dropped along the way.
    async fn revoke_token(&self, jti: Uuid, expires_at: DateTime<Utc>) -> Result<(), Error>;

    async fn is_token_revoked(&self, jti: Uuid) -> Result<bool, Error>;
}

#[async_trait]
impl SessionExt for DBClient {
    async fn revoke_token(&self, jti: Uuid, expires_at: DateTime<Utc>) -> Result<(), Error> {
        if let Some(redis) = &self.redis_client {
            let ttl = (expires_at - Utc::now()).num_seconds().max(1) as usize;
            match CacheHelper::set_flag(redis, &revoked_token_key(&jti), ttl).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::warn!("Redis revoke failed for {}: {}. Falling back to postgres", jti, e);
                }
            }
        }

        sqlx::query(
            r#"
            INSERT INTO revoked_tokens (jti, expires_at)
            VALUES ($1, $2)
            ON CONFLICT (jti) DO NOTHING
            "#,
        )
        .bind(jti)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        // rows past their expiry no longer block anything
        match sqlx::query("DELETE FROM revoked_tokens WHERE expires_at < NOW()")
            .execute(&self.pool)
            .await
        {
            Ok(result) if result.rows_affected() > 0 => {
                tracing::debug!("Purged {} expired revoked tokens", result.rows_affected());
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("Failed to purge expired revoked tokens: {}", e),
        }

        Ok(())
    }

    async fn is_token_revoked(&self, jti: Uuid) -> Result<bool, Error> {
        if let Some(redis) = &self.redis_client {
            match CacheHelper::exists(redis, &revoked_token_key(&jti)).await {
                Ok(true) => return Ok(true),
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!("Redis lookup failed for {}: {}", jti, e);
                }
            }
        }

        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM revoked_tokens WHERE jti = $1 AND expires_at > NOW())",
        )
        .bind(jti)
        .fetch_one(&self.pool)
        .await
    }
}
