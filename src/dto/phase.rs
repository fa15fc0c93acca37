use serde::Serialize;
use utoipa::ToSchema;

use crate::state::session::SessionPhase;

/// Publicly visible session phase exposed to clients (REST/SSE).
#[derive(Debug, Serialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VisibleSessionPhase {
    /// No player registered.
    Empty,
    /// Waiting for the second player.
    Registering,
    /// Both players registered, nobody ran yet.
    Ready,
    /// Race underway.
    InProgress,
    /// A winner has been declared.
    Concluded,
}

impl From<SessionPhase> for VisibleSessionPhase {
    fn from(value: SessionPhase) -> Self {
        match value {
            SessionPhase::Empty => VisibleSessionPhase::Empty,
            SessionPhase::Registering => VisibleSessionPhase::Registering,
            SessionPhase::Ready => VisibleSessionPhase::Ready,
            SessionPhase::InProgress => VisibleSessionPhase::InProgress,
            SessionPhase::Concluded => VisibleSessionPhase::Concluded,
        }
    }
}
