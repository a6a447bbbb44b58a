// db/db.rs
use sqlx::{Pool, Postgres};
use redis::aio::ConnectionManager;
use std::sync::Arc;

use super::{
    contractdb::ContractExt, filedb::FileUploadExt, jobdb::JobExt, messagedb::MessageExt,
    proposaldb::ProposalExt, sessiondb::SessionExt, userdb::UserExt,
};

/// Handle to the backing store: table queries, the accept transaction and
/// session revocation. Services only ever see it through this trait.
pub trait Gateway:
    UserExt + JobExt + ProposalExt + ContractExt + MessageExt + FileUploadExt + SessionExt
    + std::fmt::Debug + Send + Sync
{
}

impl<T> Gateway for T where
    T: UserExt + JobExt + ProposalExt + ContractExt + MessageExt + FileUploadExt + SessionExt
        + std::fmt::Debug + Send + Sync
{
}

#[derive(Clone)]
pub struct DBClient {
    pub pool: Pool<Postgres>,
    pub redis_client: Option<Arc<ConnectionManager>>,
}

impl std::fmt::Debug for DBClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DBClient")
            .field("pool", &"Pool<Postgres>")
            .field("redis_client", &self.redis_client.is_some())
            .finish()
    }
}

impl DBClient {
    /// Create a new DBClient with PostgreSQL pool only
    pub fn new(pool: Pool<Postgres>) -> Self {
        DBClient {
            pool,
            redis_client: None,
        }
    }

    /// Create a new DBClient with both PostgreSQL and Redis. A Redis failure
    /// degrades to a Postgres-only client.
    pub async fn with_redis(pool: Pool<Postgres>, redis_url: &str) -> Self {
        match redis::Client::open(redis_url) {
            Ok(client) => match ConnectionManager::new(client).await {
                Ok(conn) => {
                    tracing::info!("Redis connection established");
                    DBClient {
                        pool,
                        redis_client: Some(Arc::new(conn)),
                    }
                }
                Err(e) => {
                    tracing::warn!("Failed to connect to Redis: {}. Continuing without it.", e);
                    DBClient::new(pool)
                }
            },
            Err(e) => {
                tracing::warn!("Failed to create Redis client: {}. Continuing without it.", e);
                DBClient::new(pool)
            }
        }
    }

    pub fn revocation_backend(&self) -> &str {
        if self.redis_client.is_some() {
            "redis"
        } else {
            "postgres"
        }
    }
}
