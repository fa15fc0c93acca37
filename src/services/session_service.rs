//! Game session operations backing the player and admin routes. Every call
//! goes through [`AppState::run_session`](crate::state::AppState::run_session),
//! which serializes access, persists the resulting state as one record and
//! broadcasts it to admins.

use tracing::{debug, info};

use crate::{
    dto::{
        admin::GameStateView,
        player::{PlayerView, RunResponse},
    },
    error::ServiceError,
    state::{
        SharedState,
        session::{AdvanceOutcome, PlayerId},
    },
};

/// Register the next player (ids start at 1, at most two players).
pub async fn register_player(state: &SharedState) -> Result<PlayerView, ServiceError> {
    let (player, session) = state
        .run_session(|session| session.register_player())
        .await?;

    info!(player_id = player.id, "player registered");

    Ok((player, session.winner()).into())
}

/// Read one player and the session winner.
pub async fn get_player(state: &SharedState, id: PlayerId) -> Result<PlayerView, ServiceError> {
    let (found, _session) = state.run_session(|session| session.get_player(id)).await?;
    Ok(found.into())
}

/// Apply one run action for player `id`.
pub async fn advance(state: &SharedState, id: PlayerId) -> Result<RunResponse, ServiceError> {
    let (outcome, _session) = state.run_session(|session| session.advance(id)).await?;

    match &outcome {
        AdvanceOutcome::Stepped(player) => {
            debug!(player_id = player.id, steps = player.steps, "player advanced");
        }
        AdvanceOutcome::Won(player) => {
            info!(player_id = player.id, steps = player.steps, "player won the race");
        }
        AdvanceOutcome::AlreadyConcluded { player, winner } => {
            debug!(
                player_id = player.id,
                winner, "run ignored; game already concluded"
            );
        }
    }

    Ok(outcome.into())
}

/// Drop every player and the winner.
pub async fn reset(state: &SharedState) -> Result<(), ServiceError> {
    let session = state.reset_session().await?;

    info!(revision = session.revision(), "game reset");

    Ok(())
}

/// Full game state for the admin view.
pub async fn snapshot(state: &SharedState) -> Result<GameStateView, ServiceError> {
    let ((), session) = state.run_session(|_| Ok(())).await?;
    Ok((&session).into())
}

/// Registered players in registration order.
pub async fn list_players(state: &SharedState) -> Result<Vec<PlayerView>, ServiceError> {
    Ok(snapshot(state).await?.players)
}

#[cfg(test)]
mod tests {
    use std::{
        sync::Arc,
        time::{Duration, SystemTime},
    };

    use futures::future::{BoxFuture, join_all};
    use tokio::time::sleep;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            game_store::{GameStore, memory::MemoryGameStore},
            models::GameStateEntity,
            storage::StorageResult,
        },
        dto::phase::VisibleSessionPhase,
        state::{
            AppState,
            session::{SessionError, WINNING_STEPS},
        },
    };

    async fn memory_state() -> (SharedState, MemoryGameStore) {
        let store = MemoryGameStore::new();
        let state = AppState::with_store(Arc::new(store.clone())).await;
        (state, store)
    }

    fn is_session_error(result: Result<impl std::fmt::Debug, ServiceError>, expected: SessionError) {
        match result {
            Err(ServiceError::Session(err)) => assert_eq!(err, expected),
            other => panic!("expected {expected:?}, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn third_registration_is_rejected() {
        let (state, _) = memory_state().await;

        let first = register_player(&state).await.unwrap();
        assert_eq!((first.id, first.steps), (1, 0));
        let second = register_player(&state).await.unwrap();
        assert_eq!((second.id, second.steps), (2, 0));

        is_session_error(
            register_player(&state).await,
            SessionError::CapacityExceeded,
        );
        assert_eq!(list_players(&state).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn race_scenario_through_the_service() {
        let (state, _) = memory_state().await;
        register_player(&state).await.unwrap();
        register_player(&state).await.unwrap();

        advance(&state, 1).await.unwrap();
        let run = advance(&state, 1).await.unwrap();
        assert_eq!((run.player.steps, run.winner), (2, None));

        let run = advance(&state, 2).await.unwrap();
        assert_eq!((run.player.steps, run.winner), (1, None));

        let run = advance(&state, 1).await.unwrap();
        assert_eq!((run.player.steps, run.winner), (3, Some(1)));
        assert_eq!(run.message.as_deref(), Some("You won!"));

        let run = advance(&state, 2).await.unwrap();
        assert_eq!((run.player.steps, run.winner), (1, Some(1)));
        assert!(run.concluded);

        let view = snapshot(&state).await.unwrap();
        assert_eq!(view.phase, VisibleSessionPhase::Concluded);
        assert_eq!(view.winner, Some(1));
    }

    #[tokio::test]
    async fn unknown_player_on_empty_session() {
        let (state, _) = memory_state().await;
        is_session_error(get_player(&state, 99).await, SessionError::NotFound(99));
    }

    #[tokio::test]
    async fn concluded_runs_are_not_persisted() {
        let (state, store) = memory_state().await;
        register_player(&state).await.unwrap();
        for _ in 0..WINNING_STEPS {
            advance(&state, 1).await.unwrap();
        }
        let revision = store.stored().await.unwrap().revision;

        advance(&state, 1).await.unwrap();
        assert_eq!(store.stored().await.unwrap().revision, revision);
    }

    #[tokio::test]
    async fn reset_is_idempotent() {
        let (state, _) = memory_state().await;
        register_player(&state).await.unwrap();
        advance(&state, 1).await.unwrap();

        reset(&state).await.unwrap();
        reset(&state).await.unwrap();

        let view = snapshot(&state).await.unwrap();
        assert!(view.players.is_empty());
        assert_eq!(view.winner, None);
        assert_eq!(view.phase, VisibleSessionPhase::Empty);
        assert_eq!(register_player(&state).await.unwrap().id, 1);
    }

    #[tokio::test]
    async fn state_survives_a_fresh_app_state() {
        let (state, store) = memory_state().await;
        register_player(&state).await.unwrap();
        advance(&state, 1).await.unwrap();
        drop(state);

        let restarted = AppState::with_store(Arc::new(store)).await;
        let player = get_player(&restarted, 1).await.unwrap();
        assert_eq!(player.steps, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_runs_yield_single_winner_without_lost_steps() {
        let (state, _) = memory_state().await;
        register_player(&state).await.unwrap();
        register_player(&state).await.unwrap();

        let runs = (0..24).map(|i| {
            let state = state.clone();
            let id = if i % 2 == 0 { 1 } else { 2 };
            tokio::spawn(async move { advance(&state, id).await })
        });
        let responses: Vec<RunResponse> = join_all(runs)
            .await
            .into_iter()
            .map(|joined| joined.unwrap().unwrap())
            .collect();

        let wins = responses
            .iter()
            .filter(|run| run.message.as_deref() == Some("You won!"))
            .count();
        assert_eq!(wins, 1);

        let applied = responses
            .iter()
            .filter(|run| !run.concluded || run.message.as_deref() == Some("You won!"))
            .count() as u32;
        let view = snapshot(&state).await.unwrap();
        let total: u32 = view.players.iter().map(|player| player.steps).sum();
        assert_eq!(total, applied);

        let winner = view.winner.unwrap();
        for player in &view.players {
            if player.id == winner {
                assert_eq!(player.steps, WINNING_STEPS);
            } else {
                assert!(player.steps < WINNING_STEPS);
            }
        }
    }

    #[tokio::test]
    async fn state_changes_are_broadcast_to_admins() {
        let (state, _) = memory_state().await;
        let mut receiver = state.admin_sse().subscribe();

        register_player(&state).await.unwrap();
        get_player(&state, 1).await.unwrap();

        let event = receiver.try_recv().unwrap();
        assert_eq!(event.event.as_deref(), Some("game.state"));
        let payload: serde_json::Value = serde_json::from_str(&event.data).unwrap();
        assert_eq!(payload["phase"], "registering");
        assert_eq!(payload["players"][0]["name"], "Player 1");

        assert!(receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn degraded_state_rejects_operations() {
        let state = AppState::new();
        assert!(matches!(
            register_player(&state).await,
            Err(ServiceError::Degraded)
        ));
        assert!(matches!(reset(&state).await, Err(ServiceError::Degraded)));
    }

    struct StalledStore;

    impl GameStore for StalledStore {
        fn load_state(&self) -> BoxFuture<'static, StorageResult<Option<GameStateEntity>>> {
            Box::pin(async {
                sleep(Duration::from_secs(60)).await;
                Ok(Some(GameStateEntity {
                    players: Vec::new(),
                    winner: None,
                    revision: 0,
                    updated_at: SystemTime::now(),
                }))
            })
        }

        fn save_state(&self, _state: GameStateEntity) -> BoxFuture<'static, StorageResult<()>> {
            Box::pin(async { Ok(()) })
        }

        fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
            Box::pin(async { Ok(()) })
        }

        fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
            Box::pin(async { Ok(()) })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_store_times_out() {
        let state = AppState::from_config(&AppConfig::default());
        state.install_game_store(Arc::new(StalledStore)).await;

        assert!(matches!(
            register_player(&state).await,
            Err(ServiceError::Timeout)
        ));
    }
    /// Memory store whose writes take longer than the transition timeout
    /// before they land.
    struct SlowCommitStore(MemoryGameStore);

    impl GameStore for SlowCommitStore {
        fn load_state(&self) -> BoxFuture<'static, StorageResult<Option<GameStateEntity>>> {
            self.0.load_state()
        }

        fn save_state(&self, state: GameStateEntity) -> BoxFuture<'static, StorageResult<()>> {
            let write = self.0.save_state(state);
            Box::pin(async move {
                sleep(Duration::from_secs(6)).await;
                write.await
            })
        }

        fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
            self.0.health_check()
        }

        fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
            self.0.try_reconnect()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn slow_write_reports_what_was_stored() {
        let store = MemoryGameStore::new();
        let state = AppState::from_config(&AppConfig::default());
        state
            .install_game_store(Arc::new(SlowCommitStore(store.clone())))
            .await;

        let player = register_player(&state).await.unwrap();
        let run = advance(&state, player.id).await.unwrap();

        let stored = store.stored().await.unwrap();
        assert_eq!(stored.players.len(), 1);
        assert_eq!(stored.players[0].steps, run.player.steps);
        assert_eq!(run.player.steps, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn admin_events_follow_revision_order() {
        let (state, _) = memory_state().await;
        let mut receiver = state.admin_sse().subscribe();

        let registrations = (0..2).map(|_| {
            let state = state.clone();
            tokio::spawn(async move { register_player(&state).await })
        });
        for joined in join_all(registrations).await {
            joined.unwrap().unwrap();
        }
        let runs = (0..10).map(|i| {
            let state = state.clone();
            let id = if i % 2 == 0 { 1 } else { 2 };
            tokio::spawn(async move { advance(&state, id).await })
        });
        for joined in join_all(runs).await {
            joined.unwrap().unwrap();
        }

        let mut revisions = Vec::new();
        while let Ok(event) = receiver.try_recv() {
            let payload: serde_json::Value = serde_json::from_str(&event.data).unwrap();
            revisions.push(payload["revision"].as_u64().unwrap());
        }
        assert!(revisions.len() >= 4);
        assert!(revisions.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(
            revisions.last().copied(),
            Some(snapshot(&state).await.unwrap().revision)
        );
    }
}
