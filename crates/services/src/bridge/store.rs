// Path: crates/services/src/bridge/store.rs
use aether_types::error::StoreError;
use async_trait::async_trait;
use dashmap::DashMap;

/// An injected key/value store holding the bridge slots.
///
/// Each operation is atomic for its single key. There are no multi-key
/// transactions, and concurrent `set`s on one key resolve as last-write-wins.
#[async_trait]
pub trait SharedStateStore: Send + Sync {
    /// Reads the current value of `key`, or `None` if it was never written.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Overwrites `key` unconditionally.
    async fn set(&self, key: &str, value: String) -> Result<(), StoreError>;
}

/// A process-local store, used in tests and when the renderer talks to the
/// runtime over HTTP instead of sharing a Redis instance.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    slots: DashMap<String, String>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SharedStateStore for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.slots.get(key).map(|v| v.value().clone()))
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.slots.insert(key.to_string(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn absent_then_overwritten() {
        let store = InMemoryStore::new();
        assert_eq!(store.get("ui_state").await.unwrap(), None);
        store.set("ui_state", "a".into()).await.unwrap();
        store.set("ui_state", "b".into()).await.unwrap();
        assert_eq!(store.get("ui_state").await.unwrap().as_deref(), Some("b"));
        assert_eq!(store.get("last_command").await.unwrap(), None);
    }
}
