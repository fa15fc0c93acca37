#[cfg(feature = "couch-store")]
pub mod couchdb;
pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use crate::dao::models::GameStateEntity;
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;

/// Abstraction over the persistence layer holding the single game state record.
pub trait GameStore: Send + Sync {
    /// Fetch the stored game state, `None` when nothing was saved yet.
    fn load_state(&self) -> BoxFuture<'static, StorageResult<Option<GameStateEntity>>>;
    /// Replace the stored game state with `state` in one write.
    fn save_state(&self, state: GameStateEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Cheap round-trip used by the storage supervisor.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Re-establish the underlying connection after a failed health check.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
