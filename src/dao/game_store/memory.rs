//! Process-local storage backend, used by default and as the test double.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use futures::future::BoxFuture;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::dao::{
    game_store::GameStore,
    models::GameStateEntity,
    storage::{StorageError, StorageResult},
};

/// Failure reported while the memory store is switched offline.
#[derive(Debug, Error)]
#[error("in-memory store is offline")]
pub struct MemoryStoreOffline;

/// Game store keeping the state record behind an async lock.
///
/// Clones share the same record, so a store handed to the application can
/// still be inspected (or taken offline) by whoever built it.
#[derive(Clone)]
pub struct MemoryGameStore {
    record: Arc<RwLock<Option<GameStateEntity>>>,
    online: Arc<AtomicBool>,
}

impl Default for MemoryGameStore {
    fn default() -> Self {
        Self {
            record: Arc::new(RwLock::new(None)),
            online: Arc::new(AtomicBool::new(true)),
        }
    }
}

impl MemoryGameStore {
    /// Create an empty, online store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle availability; every call fails while offline.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Peek at the stored record without going through the trait.
    pub async fn stored(&self) -> Option<GameStateEntity> {
        self.record.read().await.clone()
    }

    fn ensure_online(&self) -> StorageResult<()> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StorageError::unavailable(
                MemoryStoreOffline.to_string(),
                MemoryStoreOffline,
            ))
        }
    }
}

impl GameStore for MemoryGameStore {
    fn load_state(&self) -> BoxFuture<'static, StorageResult<Option<GameStateEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_online()?;
            Ok(store.record.read().await.clone())
        })
    }

    fn save_state(&self, state: GameStateEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_online()?;
            *store.record.write().await = Some(state);
            Ok(())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_online() })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_online() })
    }
}
