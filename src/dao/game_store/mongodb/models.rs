use mongodb::bson::{DateTime, Document, doc};
use serde::{Deserialize, Serialize};

use crate::dao::models::{GameStateEntity, PlayerEntity};

/// Fixed `_id` of the single game state document.
pub const STATE_DOCUMENT_ID: &str = "current";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoPlayerDocument {
    id: i64,
    steps: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoGameStateDocument {
    #[serde(rename = "_id")]
    id: String,
    players: Vec<MongoPlayerDocument>,
    winner: Option<i64>,
    revision: i64,
    updated_at: DateTime,
}

impl From<GameStateEntity> for MongoGameStateDocument {
    fn from(value: GameStateEntity) -> Self {
        Self {
            id: STATE_DOCUMENT_ID.to_owned(),
            players: value
                .players
                .into_iter()
                .map(|player| MongoPlayerDocument {
                    id: i64::from(player.id),
                    steps: i64::from(player.steps),
                })
                .collect(),
            winner: value.winner.map(i64::from),
            revision: i64::try_from(value.revision).unwrap_or(i64::MAX),
            updated_at: DateTime::from_system_time(value.updated_at),
        }
    }
}

impl From<MongoGameStateDocument> for GameStateEntity {
    fn from(value: MongoGameStateDocument) -> Self {
        Self {
            players: value
                .players
                .into_iter()
                .map(|player| PlayerEntity {
                    id: clamp_u32(player.id),
                    steps: clamp_u32(player.steps),
                })
                .collect(),
            winner: value.winner.map(clamp_u32),
            revision: u64::try_from(value.revision).unwrap_or_default(),
            updated_at: value.updated_at.to_system_time(),
        }
    }
}

// Out-of-range values collapse to 0, which session validation rejects for ids.
fn clamp_u32(value: i64) -> u32 {
    u32::try_from(value).unwrap_or_default()
}

pub fn state_filter() -> Document {
    doc! {"_id": STATE_DOCUMENT_ID}
}
