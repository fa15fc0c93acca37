use serde::Serialize;
use tracing::warn;

use crate::{
    dto::{
        admin::GameStateView,
        sse::{GameStateChangedEvent, Handshake, ServerEvent, SystemStatus},
    },
    state::{AppState, session::GameSession},
};

const EVENT_HANDSHAKE: &str = "handshake";
const EVENT_GAME_STATE: &str = "game.state";
const EVENT_SYSTEM_STATUS: &str = "system.status";
const ADMIN_STREAM: &str = "admin";

/// Broadcast the full game state after it changed.
pub fn broadcast_game_state(state: &AppState, session: &GameSession) {
    let payload = GameStateChangedEvent(GameStateView::from(session));
    send_admin_event(state, EVENT_GAME_STATE, &payload);
}

/// Broadcast that the backend entered or left degraded mode.
pub fn broadcast_system_status(state: &AppState, degraded: bool) {
    send_admin_event(state, EVENT_SYSTEM_STATUS, &SystemStatus { degraded });
}

/// First event sent to a freshly connected admin stream.
pub fn admin_handshake(degraded: bool, snapshot: Option<GameStateView>) -> Option<ServerEvent> {
    let payload = Handshake {
        stream: ADMIN_STREAM.to_string(),
        degraded,
        state: snapshot,
    };
    match ServerEvent::json(Some(EVENT_HANDSHAKE.to_string()), &payload) {
        Ok(event) => Some(event),
        Err(err) => {
            warn!(error = %err, "failed to serialize admin handshake");
            None
        }
    }
}

fn send_admin_event(state: &AppState, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => state.admin_sse().broadcast(event),
        Err(err) => warn!(event, error = %err, "failed to serialize admin SSE payload"),
    }
}
