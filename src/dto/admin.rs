use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    dto::{format_system_time, phase::VisibleSessionPhase, player::PlayerView},
    state::session::{GameSession, PlayerId, WINNING_STEPS},
};

/// Full game state shown on the admin view.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct GameStateView {
    pub phase: VisibleSessionPhase,
    pub players: Vec<PlayerView>,
    pub winner: Option<PlayerId>,
    pub winning_steps: u32,
    pub revision: u64,
    pub updated_at: String,
}

impl From<&GameSession> for GameStateView {
    fn from(session: &GameSession) -> Self {
        let winner = session.winner();
        Self {
            phase: session.phase().into(),
            players: session
                .players()
                .iter()
                .cloned()
                .map(|player| PlayerView::from((player, winner)))
                .collect(),
            winner,
            winning_steps: WINNING_STEPS,
            revision: session.revision(),
            updated_at: format_system_time(session.updated_at()),
        }
    }
}
