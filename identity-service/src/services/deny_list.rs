//! Token deny-list: jtis invalidated before natural expiry.
//!
//! Redis SET-with-expiry plus EXISTS gives read-your-writes on a single
//! key, which is what keeps a revoked token from being accepted by a
//! concurrent request.

use async_trait::async_trait;
use redis::{aio::ConnectionManager, Client};

#[async_trait]
pub trait TokenDenyList: Send + Sync {
    /// Record a jti as revoked until its natural expiry.
    async fn revoke(&self, jti: &str, ttl_seconds: i64) -> Result<(), anyhow::Error>;
    async fn is_revoked(&self, jti: &str) -> Result<bool, anyhow::Error>;
    async fn health_check(&self) -> Result<(), anyhow::Error>;
}

#[derive(Clone)]
pub struct RedisDenyList {
    manager: ConnectionManager,
}

impl RedisDenyList {
    pub async fn new(config: &crate::config::RedisConfig) -> Result<Self, anyhow::Error> {
        tracing::info!(url = %config.url, "Connecting to Redis");
        let client = Client::open(config.url.clone())?;

        // ConnectionManager reconnects on its own after drops.
        let manager = client.get_connection_manager().await.map_err(|e| {
            tracing::error!("Failed to get Redis connection manager: {}", e);
            anyhow::anyhow!("Failed to connect to Redis: {}", e)
        })?;

        tracing::info!("Successfully connected to Redis");

        Ok(Self { manager })
    }

    fn key(jti: &str) -> String {
        format!("denylist:{}", jti)
    }
}

#[async_trait]
impl TokenDenyList for RedisDenyList {
    async fn revoke(&self, jti: &str, ttl_seconds: i64) -> Result<(), anyhow::Error> {
        let mut conn = self.manager.clone();

        redis::cmd("SET")
            .arg(Self::key(jti))
            .arg("revoked")
            .arg("EX")
            .arg(ttl_seconds)
            .query_async(&mut conn)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to deny-list token: {}", e))
    }

    async fn is_revoked(&self, jti: &str) -> Result<bool, anyhow::Error> {
        let mut conn = self.manager.clone();

        let exists: bool = redis::cmd("EXISTS")
            .arg(Self::key(jti))
            .query_async(&mut conn)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to check deny-list: {}", e))?;

        Ok(exists)
    }

    async fn health_check(&self) -> Result<(), anyhow::Error> {
        let mut conn = self.manager.clone();
        redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| anyhow::anyhow!("Redis health check failed: {}", e))
    }
}

/// In-memory deny-list for tests.
#[derive(Default)]
pub struct MockDenyList {
    revoked: std::sync::Mutex<std::collections::HashSet<String>>,
}

impl MockDenyList {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenDenyList for MockDenyList {
    async fn revoke(&self, jti: &str, _ttl_seconds: i64) -> Result<(), anyhow::Error> {
        self.revoked
            .lock()
            .map_err(|e| anyhow::anyhow!("Mock deny-list mutex poisoned: {}", e))?
            .insert(jti.to_string());
        Ok(())
    }

    async fn is_revoked(&self, jti: &str) -> Result<bool, anyhow::Error> {
        let contains = self
            .revoked
            .lock()
            .map_err(|e| anyhow::anyhow!("Mock deny-list mutex poisoned: {}", e))?
            .contains(jti);
        Ok(contains)
    }

    async fn health_check(&self) -> Result<(), anyhow::Error> {
        Ok(())
    }
}
