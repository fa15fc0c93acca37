use std::{collections::HashSet, time::SystemTime};

use thiserror::Error;

use crate::dao::models::{GameStateEntity, PlayerEntity};

/// Number of steps a player must reach to win the race.
pub const WINNING_STEPS: u32 = 3;
/// Maximum number of players a session accepts.
pub const MAX_PLAYERS: usize = 2;

/// Identifier assigned to a player at registration time.
pub type PlayerId = u32;

/// Player tracked by a game session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    /// Sequential identifier, starting at 1.
    pub id: PlayerId,
    /// Number of run actions taken so far.
    pub steps: u32,
}

impl Player {
    fn new(id: PlayerId) -> Self {
        Self { id, steps: 0 }
    }

    /// Display label shown to clients.
    pub fn name(&self) -> String {
        format!("Player {}", self.id)
    }
}

/// Lifecycle phases of a session, derived from its data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No player registered yet.
    Empty,
    /// One player registered, waiting for an opponent.
    Registering,
    /// Both players registered, nobody has run yet.
    Ready,
    /// At least one run action happened and nobody has won.
    InProgress,
    /// A winner has been declared; only a reset leaves this phase.
    Concluded,
}

/// Rejections produced by the session state machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Registration attempted while the session is full.
    #[error("maximum number of players reached ({MAX_PLAYERS})")]
    CapacityExceeded,
    /// Registration attempted after a winner has been declared.
    #[error("game is over; player {winner} won")]
    GameConcluded {
        /// Winner of the concluded game.
        winner: PlayerId,
    },
    /// The referenced player does not exist.
    #[error("player `{0}` not found")]
    NotFound(PlayerId),
}

/// Result of a single run action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// The player moved one step without reaching the threshold.
    Stepped(Player),
    /// The player moved one step and won the game with it.
    Won(Player),
    /// The game was already over; nothing changed.
    AlreadyConcluded {
        /// Unchanged state of the acting player.
        player: Player,
        /// Winner declared earlier.
        winner: PlayerId,
    },
}

impl AdvanceOutcome {
    /// State of the acting player after the action.
    pub fn player(&self) -> &Player {
        match self {
            AdvanceOutcome::Stepped(player) | AdvanceOutcome::Won(player) => player,
            AdvanceOutcome::AlreadyConcluded { player, .. } => player,
        }
    }

    /// Winner of the session after the action, if any.
    pub fn winner(&self) -> Option<PlayerId> {
        match self {
            AdvanceOutcome::Stepped(_) => None,
            AdvanceOutcome::Won(player) => Some(player.id),
            AdvanceOutcome::AlreadyConcluded { winner, .. } => Some(*winner),
        }
    }
}

/// Persisted state could not be turned back into a valid session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("stored game state is inconsistent: {reason}")]
pub struct CorruptState {
    /// Revision carried by the rejected record.
    pub revision: u64,
    /// Human readable description of the violated invariant.
    pub reason: String,
}

/// Authoritative state of one two-player race.
///
/// Every method runs to completion without suspension points; callers are
/// expected to serialize access (see [`crate::state::AppState::run_session`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSession {
    players: Vec<Player>,
    winner: Option<PlayerId>,
    revision: u64,
    updated_at: SystemTime,
}

impl Default for GameSession {
    fn default() -> Self {
        Self {
            players: Vec::with_capacity(MAX_PLAYERS),
            winner: None,
            revision: 0,
            updated_at: SystemTime::now(),
        }
    }
}

impl GameSession {
    /// Create an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty session that continues the revision sequence of a previous one.
    pub fn empty_at(revision: u64) -> Self {
        Self {
            revision,
            ..Self::default()
        }
    }

    /// Registered players in registration order.
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// Winner of the session, once declared.
    pub fn winner(&self) -> Option<PlayerId> {
        self.winner
    }

    /// Counter bumped by every mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Time of the last mutation (or creation).
    pub fn updated_at(&self) -> SystemTime {
        self.updated_at
    }

    /// Look up a player by identifier.
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|player| player.id == id)
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> SessionPhase {
        if self.winner.is_some() {
            return SessionPhase::Concluded;
        }
        if self.players.iter().any(|player| player.steps > 0) {
            return SessionPhase::InProgress;
        }
        match self.players.len() {
            0 => SessionPhase::Empty,
            1 => SessionPhase::Registering,
            _ => SessionPhase::Ready,
        }
    }

    /// Register a new player with the next sequential identifier.
    ///
    /// A full session reports [`SessionError::CapacityExceeded`] whether or
    /// not the game is over.
    pub fn register_player(&mut self) -> Result<Player, SessionError> {
        if self.players.len() >= MAX_PLAYERS {
            return Err(SessionError::CapacityExceeded);
        }
        if let Some(winner) = self.winner {
            return Err(SessionError::GameConcluded { winner });
        }

        let id = self
            .players
            .iter()
            .map(|player| player.id)
            .max()
            .map_or(1, |max| max + 1);
        let player = Player::new(id);
        self.players.push(player.clone());
        self.touch();

        Ok(player)
    }

    /// Read a player together with the session winner.
    pub fn get_player(&self, id: PlayerId) -> Result<(Player, Option<PlayerId>), SessionError> {
        let player = self.player(id).ok_or(SessionError::NotFound(id))?;
        Ok((player.clone(), self.winner))
    }

    /// Apply one run action for `id`.
    ///
    /// Once a winner exists the call leaves every counter untouched and
    /// reports the stored winner, whoever the acting player is.
    pub fn advance(&mut self, id: PlayerId) -> Result<AdvanceOutcome, SessionError> {
        let index = self
            .players
            .iter()
            .position(|player| player.id == id)
            .ok_or(SessionError::NotFound(id))?;

        if let Some(winner) = self.winner {
            return Ok(AdvanceOutcome::AlreadyConcluded {
                player: self.players[index].clone(),
                winner,
            });
        }

        let player = &mut self.players[index];
        player.steps += 1;
        let player = player.clone();

        let outcome = if player.steps >= WINNING_STEPS {
            self.winner = Some(player.id);
            AdvanceOutcome::Won(player)
        } else {
            AdvanceOutcome::Stepped(player)
        };
        self.touch();

        Ok(outcome)
    }

    /// Drop every player and the winner.
    pub fn reset(&mut self) {
        self.players.clear();
        self.winner = None;
        self.touch();
    }

    fn touch(&mut self) {
        self.revision += 1;
        self.updated_at = SystemTime::now();
    }
}

impl From<&Player> for PlayerEntity {
    fn from(value: &Player) -> Self {
        Self {
            id: value.id,
            steps: value.steps,
        }
    }
}

impl From<PlayerEntity> for Player {
    fn from(value: PlayerEntity) -> Self {
        Self {
            id: value.id,
            steps: value.steps,
        }
    }
}

impl From<&GameSession> for GameStateEntity {
    fn from(value: &GameSession) -> Self {
        Self {
            players: value.players.iter().map(Into::into).collect(),
            winner: value.winner,
            revision: value.revision,
            updated_at: value.updated_at,
        }
    }
}

impl TryFrom<GameStateEntity> for GameSession {
    type Error = CorruptState;

    fn try_from(value: GameStateEntity) -> Result<Self, Self::Error> {
        let revision = value.revision;
        let corrupt = |reason: String| CorruptState { revision, reason };

        if value.players.len() > MAX_PLAYERS {
            return Err(corrupt(format!(
                "{} players stored, at most {MAX_PLAYERS} allowed",
                value.players.len()
            )));
        }

        let mut seen = HashSet::new();
        for player in &value.players {
            if player.id == 0 {
                return Err(corrupt("player id 0 is not allowed".into()));
            }
            if !seen.insert(player.id) {
                return Err(corrupt(format!("duplicate player id `{}`", player.id)));
            }
        }

        if let Some(winner) = value.winner {
            if !seen.contains(&winner) {
                return Err(corrupt(format!(
                    "winner `{winner}` is not a registered player"
                )));
            }
        }

        Ok(Self {
            players: value.players.into_iter().map(Into::into).collect(),
            winner: value.winner,
            revision,
            updated_at: value.updated_at,
        })
    }
}
