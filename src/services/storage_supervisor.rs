use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dao::{game_store::GameStore, storage::StorageError},
    state::SharedState,
};

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// Exponential delay between connection attempts, capped at [`MAX_DELAY`].
struct Backoff {
    delay: Duration,
}

impl Backoff {
    fn new() -> Self {
        Self {
            delay: INITIAL_DELAY,
        }
    }

    fn reset(&mut self) {
        self.delay = INITIAL_DELAY;
    }

    async fn wait(&mut self) {
        sleep(self.delay).await;
        self.delay = (self.delay * 2).min(MAX_DELAY);
    }
}

/// Connect to the storage backend and keep the shared state in degraded mode
/// whenever it is unavailable. Never returns.
pub async fn run<F, Fut>(state: SharedState, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn GameStore>, StorageError>> + Send,
{
    let mut backoff = Backoff::new();

    loop {
        match connect().await {
            Ok(store) => {
                state.install_game_store(store.clone()).await;
                info!("storage connection established; leaving degraded mode");
                backoff.reset();

                watch_store(&state, store.as_ref()).await;

                warn!("exhausted storage reconnect attempts; dropping the connection");
                state.clear_game_store().await;
            }
            Err(err) => warn!(error = %err, "storage connection attempt failed"),
        }

        backoff.wait().await;
    }
}

/// Poll `store` until it stays unreachable through every reconnect attempt.
async fn watch_store(state: &SharedState, store: &dyn GameStore) {
    loop {
        match store.health_check().await {
            Ok(()) => {
                if state.is_degraded() {
                    info!("storage healthy again; leaving degraded mode");
                    state.update_degraded(false);
                }
                sleep(HEALTH_POLL_INTERVAL).await;
            }
            Err(err) => {
                warn!(error = %err, "storage health check failed; entering degraded mode");
                state.update_degraded(true);

                if !reconnect(store).await {
                    return;
                }
                info!("storage reconnection succeeded after health check failure");
            }
        }
    }
}

async fn reconnect(store: &dyn GameStore) -> bool {
    let mut backoff = Backoff::new();

    for attempt in 1..=MAX_RECONNECT_ATTEMPTS {
        match store.try_reconnect().await {
            Ok(()) => return true,
            Err(err) => {
                warn!(attempt, error = %err, "storage reconnect attempt failed");
                backoff.wait().await;
            }
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::{
        dao::game_store::memory::{MemoryGameStore, MemoryStoreOffline},
        state::AppState,
    };

    #[tokio::test(start_paused = true)]
    async fn retries_until_the_backend_accepts() {
        let state = AppState::new();
        let mut watcher = state.degraded_watcher();
        let attempts = Arc::new(AtomicUsize::new(0));
        let store = MemoryGameStore::new();

        let counter = attempts.clone();
        tokio::spawn(run(state.clone(), move || {
            let counter = counter.clone();
            let store = store.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(StorageError::unavailable(
                        "connection refused".into(),
                        MemoryStoreOffline,
                    ))
                } else {
                    Ok(Arc::new(store) as Arc<dyn GameStore>)
                }
            }
        }));

        watcher.wait_for(|degraded| !*degraded).await.unwrap();
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert!(state.game_store().await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn outage_toggles_degraded_mode() {
        let state = AppState::new();
        let mut watcher = state.degraded_watcher();
        let store = MemoryGameStore::new();

        let handle = store.clone();
        tokio::spawn(run(state.clone(), move || {
            let store = handle.clone();
            async move { Ok(Arc::new(store) as Arc<dyn GameStore>) }
        }));

        watcher.wait_for(|degraded| !*degraded).await.unwrap();

        store.set_online(false);
        watcher.wait_for(|degraded| *degraded).await.unwrap();

        store.set_online(true);
        watcher.wait_for(|degraded| !*degraded).await.unwrap();
        assert!(!state.is_degraded());
    }
}
