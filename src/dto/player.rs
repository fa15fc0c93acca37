use serde::Serialize;
use utoipa::ToSchema;

use crate::state::session::{AdvanceOutcome, Player, PlayerId};

/// Public projection of a player together with the session winner.
#[derive(Clone, Debug, Serialize, ToSchema, PartialEq, Eq)]
pub struct PlayerView {
    pub id: PlayerId,
    pub name: String,
    pub steps: u32,
    /// Winner of the session, absent while the race is open.
    pub winner: Option<PlayerId>,
}

impl From<(Player, Option<PlayerId>)> for PlayerView {
    fn from((player, winner): (Player, Option<PlayerId>)) -> Self {
        Self {
            name: player.name(),
            id: player.id,
            steps: player.steps,
            winner,
        }
    }
}

/// Response returned by a run action.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct RunResponse {
    pub player: PlayerView,
    pub winner: Option<PlayerId>,
    /// True when the game is over, whether or not this call ended it.
    pub concluded: bool,
    /// Banner for the acting player once the game is over.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<AdvanceOutcome> for RunResponse {
    fn from(outcome: AdvanceOutcome) -> Self {
        let winner = outcome.winner();
        let message = match &outcome {
            AdvanceOutcome::Stepped(_) => None,
            AdvanceOutcome::Won(_) => Some("You won!".to_owned()),
            AdvanceOutcome::AlreadyConcluded { winner, .. } => {
                Some(format!("Game Over - Player {winner} won!"))
            }
        };
        let player = outcome.player().clone();

        Self {
            player: (player, winner).into(),
            winner,
            concluded: winner.is_some(),
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn winning_run_congratulates_the_player() {
        let response = RunResponse::from(AdvanceOutcome::Won(Player { id: 2, steps: 3 }));
        assert_eq!(response.winner, Some(2));
        assert!(response.concluded);
        assert_eq!(response.message.as_deref(), Some("You won!"));
        assert_eq!(response.player.name, "Player 2");
    }

    #[test]
    fn late_run_reports_existing_winner() {
        let response = RunResponse::from(AdvanceOutcome::AlreadyConcluded {
            player: Player { id: 2, steps: 1 },
            winner: 1,
        });
        assert_eq!(response.player.steps, 1);
        assert_eq!(response.player.winner, Some(1));
        assert_eq!(response.message.as_deref(), Some("Game Over - Player 1 won!"));
    }

    #[test]
    fn ordinary_step_has_no_banner() {
        let value =
            serde_json::to_value(RunResponse::from(AdvanceOutcome::Stepped(Player { id: 1, steps: 1 })))
                .unwrap();
        assert!(value.get("message").is_none());
        assert_eq!(value["concluded"], false);
        assert!(value["winner"].is_null());
    }
}
