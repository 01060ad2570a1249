//! Turn state: the phase machine's data.
//!
//! ## Stage vs Phase
//!
//! A match's [`Stage`] is the authoritative sum type: lobby, waiting for the
//! current seat's action, a turn in progress, or over. [`Phase`] is the flat,
//! observable projection of it that clients see.

pub mod phase;
pub mod state;

use serde::{Deserialize, Serialize};

pub use phase::Phase;
pub use state::{
    BlockRecord, ChallengeOutcome, ChallengeRecord, ExchangeOffer, LossReason, PassSet,
    PendingLoss, TurnState, TurnStep,
};

/// Where a match is in its lifecycle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Lobby,
    ActionSelection,
    Turn(TurnState),
    GameOver,
}

impl Stage {
    #[must_use]
    pub fn phase(&self) -> Phase {
        match self {
            Stage::Lobby => Phase::Lobby,
            Stage::ActionSelection => Phase::ActionSelection,
            Stage::Turn(turn) => turn.phase(),
            Stage::GameOver => Phase::GameOver,
        }
    }

    #[must_use]
    pub fn turn(&self) -> Option<&TurnState> {
        match self {
            Stage::Turn(turn) => Some(turn),
            _ => None,
        }
    }

    pub fn turn_mut(&mut self) -> Option<&mut TurnState> {
        match self {
            Stage::Turn(turn) => Some(turn),
            _ => None,
        }
    }
}
