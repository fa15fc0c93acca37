pub mod session;
mod sse;

use std::{future::Future, sync::Arc, time::Duration};

use tokio::sync::{Mutex, RwLock, watch};
use tokio::time::timeout;
use tracing::{info, warn};

use crate::{
    config::AppConfig,
    dao::{game_store::GameStore, models::GameStateEntity},
    error::ServiceError,
    services::sse_events,
    state::session::{GameSession, SessionError},
};

pub use self::sse::SseHub;

pub type SharedState = Arc<AppState>;
pub const DEFAULT_TRANSITION_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_SSE_CAPACITY: usize = 16;

/// Central application state: the installed game store, the degraded flag,
/// the admin SSE hub and the gate serializing every session operation.
pub struct AppState {
    game_store: RwLock<Option<Arc<dyn GameStore>>>,
    admin_sse: SseHub,
    degraded: watch::Sender<bool>,
    session_gate: Mutex<()>,
    transition_timeout: Option<Duration>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new() -> SharedState {
        Self::build(DEFAULT_SSE_CAPACITY, Some(DEFAULT_TRANSITION_TIMEOUT))
    }

    /// Construct the state using the tuning knobs from `config`.
    pub fn from_config(config: &AppConfig) -> SharedState {
        Self::build(config.sse_capacity(), Some(config.transition_timeout()))
    }

    /// Construct a state with `store` already installed (not degraded).
    pub async fn with_store(store: Arc<dyn GameStore>) -> SharedState {
        let state = Self::new();
        state.install_game_store(store).await;
        state
    }

    fn build(sse_capacity: usize, transition_timeout: Option<Duration>) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            game_store: RwLock::new(None),
            admin_sse: SseHub::new(sse_capacity),
            degraded: degraded_tx,
            session_gate: Mutex::new(()),
            transition_timeout,
        })
    }

    /// Obtain a handle to the current game store, if one is installed.
    pub async fn game_store(&self) -> Option<Arc<dyn GameStore>> {
        let guard = self.game_store.read().await;
        guard.as_ref().cloned()
    }

    /// Obtain the game store or fail with [`ServiceError::Degraded`].
    pub async fn require_game_store(&self) -> Result<Arc<dyn GameStore>, ServiceError> {
        if self.is_degraded() {
            return Err(ServiceError::Degraded);
        }
        self.game_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new game store implementation and leave degraded mode.
    pub async fn install_game_store(&self, store: Arc<dyn GameStore>) {
        {
            let mut guard = self.game_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Remove the current game store and enter degraded mode.
    pub async fn clear_game_store(&self) {
        {
            let mut guard = self.game_store.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update the degraded flag, notifying watchers and SSE clients on change.
    pub fn update_degraded(&self, value: bool) {
        if self.is_degraded() == value {
            return;
        }

        self.degraded.send_replace(value);
        info!(degraded = value, "degraded mode changed");
        sse_events::broadcast_system_status(self, value);
    }

    /// Broadcast hub used for the admin SSE stream.
    pub fn admin_sse(&self) -> &SseHub {
        &self.admin_sse
    }

    /// Run `op` against the stored session while holding the session gate.
    ///
    /// The session is loaded, mutated and, when `op` changed it, written back
    /// as one record and broadcast to admins before the gate is released, so
    /// `game.state` events go out in revision order. Only the load is bounded
    /// by the transition timeout: once a write is issued its outcome is
    /// awaited and reported as is.
    pub async fn run_session<F, T>(&self, op: F) -> Result<(T, GameSession), ServiceError>
    where
        F: FnOnce(&mut GameSession) -> Result<T, SessionError> + Send,
        T: Send,
    {
        let store = self.require_game_store().await?;
        let _gate = self.session_gate.lock().await;

        let mut session = self.bounded(load_session(store.as_ref())).await?;
        let revision = session.revision();
        let value = op(&mut session)?;
        if session.revision() != revision {
            self.commit(store.as_ref(), &session).await?;
        }
        Ok((value, session))
    }

    /// Clear the stored session while holding the session gate.
    ///
    /// An inconsistent stored record is discarded rather than reported, so a
    /// reset always gets the game back to a clean slate.
    pub async fn reset_session(&self) -> Result<GameSession, ServiceError> {
        let store = self.require_game_store().await?;
        let _gate = self.session_gate.lock().await;

        let mut session = match self.bounded(load_session(store.as_ref())).await {
            Ok(session) => session,
            Err(ServiceError::Corrupt(corrupt)) => {
                warn!(error = %corrupt, "discarding inconsistent game state on reset");
                GameSession::empty_at(corrupt.revision)
            }
            Err(err) => return Err(err),
        };
        session.reset();
        self.commit(store.as_ref(), &session).await?;
        Ok(session)
    }

    /// Persist `session` and announce it. Callers hold the session gate.
    async fn commit(&self, store: &dyn GameStore, session: &GameSession) -> Result<(), ServiceError> {
        store.save_state(GameStateEntity::from(session)).await?;
        sse_events::broadcast_game_state(self, session);
        Ok(())
    }

    async fn bounded<T>(
        &self,
        work: impl Future<Output = Result<T, ServiceError>>,
    ) -> Result<T, ServiceError> {
        match self.transition_timeout {
            Some(limit) => timeout(limit, work)
                .await
                .map_err(|_| ServiceError::Timeout)?,
            None => work.await,
        }
    }
}

async fn load_session(store: &dyn GameStore) -> Result<GameSession, ServiceError> {
    match store.load_state().await? {
        Some(entity) => Ok(GameSession::try_from(entity)?),
        None => Ok(GameSession::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::{game_store::memory::MemoryGameStore, models::PlayerEntity};

    #[tokio::test]
    async fn starts_degraded_without_store() {
        let state = AppState::new();
        assert!(state.is_degraded());
        assert!(matches!(
            state.run_session(|session| Ok(session.revision())).await,
            Err(ServiceError::Degraded)
        ));
    }

    #[tokio::test]
    async fn installing_and_clearing_store_toggles_degraded() {
        let state = AppState::new();
        let mut watcher = state.degraded_watcher();

        state
            .install_game_store(Arc::new(MemoryGameStore::new()))
            .await;
        assert!(!state.is_degraded());
        assert!(watcher.has_changed().unwrap());
        assert!(!*watcher.borrow_and_update());

        state.clear_game_store().await;
        assert!(state.is_degraded());
        assert!(state.game_store().await.is_none());
    }

    #[tokio::test]
    async fn mutations_are_written_back_and_reads_are_not() {
        let store = MemoryGameStore::new();
        let state = AppState::with_store(Arc::new(store.clone())).await;

        state
            .run_session(|session| session.register_player())
            .await
            .unwrap();
        let stored = store.stored().await.unwrap();
        assert_eq!(stored.players, vec![PlayerEntity { id: 1, steps: 0 }]);
        assert_eq!(stored.revision, 1);

        store.set_online(false);
        assert!(matches!(
            state.run_session(|session| session.get_player(1)).await,
            Err(ServiceError::Unavailable(_))
        ));
        store.set_online(true);

        state
            .run_session(|session| session.get_player(1))
            .await
            .unwrap();
        assert_eq!(store.stored().await.unwrap().revision, 1);
    }

    #[tokio::test]
    async fn rejected_operations_leave_store_untouched() {
        let store = MemoryGameStore::new();
        let state = AppState::with_store(Arc::new(store.clone())).await;

        let err = state
            .run_session(|session| session.advance(5))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Session(SessionError::NotFound(5))
        ));
        assert_eq!(store.stored().await, None);
    }

    #[tokio::test]
    async fn reset_discards_inconsistent_record() {
        let store = MemoryGameStore::new();
        store
            .save_state(GameStateEntity {
                players: vec![PlayerEntity { id: 1, steps: 0 }],
                winner: Some(8),
                revision: 4,
                updated_at: std::time::SystemTime::now(),
            })
            .await
            .unwrap();
        let state = AppState::with_store(Arc::new(store.clone())).await;

        assert!(matches!(
            state.run_session(|session| session.get_player(1)).await,
            Err(ServiceError::Corrupt(_))
        ));

        let session = state.reset_session().await.unwrap();
        assert!(session.players().is_empty());
        assert_eq!(session.revision(), 5);
        assert_eq!(store.stored().await.unwrap().winner, None);
    }
}
