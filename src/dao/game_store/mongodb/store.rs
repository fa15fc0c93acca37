use std::sync::Arc;

use futures::future::BoxFuture;
use mongodb::{Client, Collection, Database, bson::doc};
use tokio::sync::RwLock;
use tracing::info;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{MongoGameStateDocument, state_filter},
};
use crate::dao::{game_store::GameStore, models::GameStateEntity, storage::StorageResult};

const STATE_COLLECTION_NAME: &str = "game_state";

/// Game store persisting the state record as one MongoDB document.
#[derive(Clone)]
pub struct MongoGameStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    #[allow(dead_code)]
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        info!(database = %self.config.database_name, "MongoDB connection re-established");
        Ok(())
    }
}

impl MongoGameStore {
    /// Establish a connection to MongoDB.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        Ok(Self { inner })
    }

    async fn collection(&self) -> Collection<MongoGameStateDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoGameStateDocument>(STATE_COLLECTION_NAME)
    }

    async fn load_state(&self) -> MongoResult<Option<GameStateEntity>> {
        let collection = self.collection().await;

        let document = collection
            .find_one(state_filter())
            .await
            .map_err(|source| MongoDaoError::LoadState { source })?;

        Ok(document.map(Into::into))
    }

    /// Single-document replace, so players and winner land atomically.
    async fn save_state(&self, state: GameStateEntity) -> MongoResult<()> {
        let revision = state.revision;
        let document: MongoGameStateDocument = state.into();
        let collection = self.collection().await;

        collection
            .replace_one(state_filter(), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveState { revision, source })?;

        Ok(())
    }
}

impl GameStore for MongoGameStore {
    fn load_state(&self) -> BoxFuture<'static, StorageResult<Option<GameStateEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.load_state().await.map_err(Into::into) })
    }

    fn save_state(&self, state: GameStateEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_state(state).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
