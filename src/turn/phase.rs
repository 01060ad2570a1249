//! The public phase of a match.

use serde::{Deserialize, Serialize};

/// Observable phase of a match.
///
/// `ResolvingChallengeAction` and `ResolvingChallengeBlock` are transient: a
/// match passes through them inside a single command's cascade and never rests
/// there once the command returns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Lobby,
    ActionSelection,
    AwaitingChallengeAction,
    ResolvingChallengeAction,
    AwaitingBlock,
    AwaitingChallengeBlock,
    ResolvingChallengeBlock,
    AwaitingInfluenceLoss,
    AwaitingExchangeReturn,
    GameOver,
}

impl Phase {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Phase::Lobby => "lobby",
            Phase::ActionSelection => "action_selection",
            Phase::AwaitingChallengeAction => "awaiting_challenge_action",
            Phase::ResolvingChallengeAction => "resolving_challenge_action",
            Phase::AwaitingBlock => "awaiting_block",
            Phase::AwaitingChallengeBlock => "awaiting_challenge_block",
            Phase::ResolvingChallengeBlock => "resolving_challenge_block",
            Phase::AwaitingInfluenceLoss => "awaiting_influence_loss",
            Phase::AwaitingExchangeReturn => "awaiting_exchange_return",
            Phase::GameOver => "game_over",
        }
    }

    /// One of the three windows where several seats may react or pass.
    #[must_use]
    pub const fn is_reaction_window(self) -> bool {
        matches!(
            self,
            Phase::AwaitingChallengeAction | Phase::AwaitingBlock | Phase::AwaitingChallengeBlock
        )
    }

    /// A match in this phase is being played (turn deadlines apply).
    #[must_use]
    pub const fn is_in_progress(self) -> bool {
        !matches!(self, Phase::Lobby | Phase::GameOver)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
