use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Representation of a player stored in persistence and shared across layers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerEntity {
    /// Sequential identifier assigned at registration.
    pub id: u32,
    /// Number of run actions taken so far.
    pub steps: u32,
}

/// Whole game state persisted by the storage layer as a single record so that
/// steps and winner are always written together.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameStateEntity {
    /// Registered players in registration order.
    pub players: Vec<PlayerEntity>,
    /// Identifier of the winning player, once declared.
    pub winner: Option<u32>,
    /// Counter bumped by every mutation.
    pub revision: u64,
    /// Last time the game state was updated.
    pub updated_at: SystemTime,
}
