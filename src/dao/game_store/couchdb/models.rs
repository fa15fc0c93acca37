use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::dao::models::{GameStateEntity, PlayerEntity};

/// Identifier of the single game state document.
pub const STATE_DOC_ID: &str = "game_state::current";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchGameStateDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(flatten)]
    pub body: GameStateBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameStateBody {
    pub players: Vec<PlayerEntity>,
    pub winner: Option<u32>,
    pub revision: u64,
    pub updated_at: SystemTime,
}

/// Body returned by CouchDB after a successful document PUT.
#[derive(Debug, Deserialize)]
pub struct PutResponse {
    pub rev: String,
}

impl CouchGameStateDocument {
    pub fn from_entity(state: GameStateEntity, rev: Option<String>) -> Self {
        Self {
            id: STATE_DOC_ID.to_owned(),
            rev,
            body: GameStateBody {
                players: state.players,
                winner: state.winner,
                revision: state.revision,
                updated_at: state.updated_at,
            },
        }
    }

    pub fn into_entity(self) -> GameStateEntity {
        GameStateEntity {
            players: self.body.players,
            winner: self.body.winner,
            revision: self.body.revision,
            updated_at: self.body.updated_at,
        }
    }
}
