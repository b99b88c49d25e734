// Path: crates/services/src/bridge/redis.rs
//! A [`SharedStateStore`] backed by a Redis server shared with the renderer.

use super::store::SharedStateStore;
use aether_types::error::StoreError;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

fn backend(e: redis::RedisError) -> StoreError {
    StoreError::Backend(e.to_string())
}

/// Plain `GET`/`SET` on string keys through a reconnecting connection manager.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Opens the connection eagerly so a bad URL fails at startup.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url).map_err(backend)?;
        let conn = ConnectionManager::new(client).await.map_err(backend)?;
        tracing::info!(target: "bridge", "Connected to Redis store");
        Ok(Self { conn })
    }
}

#[async_trait]
impl SharedStateStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        conn.get(key).await.map_err(backend)
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        conn.set(key, value).await.map_err(backend)
    }
}
