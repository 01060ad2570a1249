//! Error types for the engine.
//!
//! ## Taxonomy
//!
//! - [`RuleViolation`]: a command that is not legal right now. No state is
//!   mutated when one is returned.
//! - [`NotFound`]: unknown match, join code, reconnect token, or seat.
//! - [`EngineError`]: what [`GameService`](crate::service::GameService)
//!   returns; one of the two above.
//!
//! Archival and notification failures have their own types. They are logged
//! by the service and never reach the caller. Supervisor races are reported as
//! outcomes, not errors.

use thiserror::Error;

use crate::core::{ActionKind, MatchId, Role, SeatId};
use crate::turn::Phase;

// ============================================================================
// Validation
// ============================================================================

/// A rejected command, with a human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleViolation {
    #[error("match has not started")]
    NotStarted,

    #[error("match is over")]
    MatchOver,

    #[error("match has already started")]
    AlreadyStarted,

    #[error("{command} is not allowed during {phase}")]
    WrongPhase { command: &'static str, phase: Phase },

    #[error("it is not your turn")]
    NotYourTurn,

    #[error("spectators cannot act")]
    Spectator,

    #[error("{0} is not seated in this match")]
    NotSeated(SeatId),

    #[error("{0} has been eliminated")]
    SeatEliminated(SeatId),

    #[error("you have {coins} coins and must coup")]
    MustCoup { coins: u32 },

    #[error("{action} costs {cost} coins, you have {coins}")]
    InsufficientCoins {
        action: ActionKind,
        cost: u32,
        coins: u32,
    },

    #[error("{0} requires a target")]
    TargetRequired(ActionKind),

    #[error("{0} does not take a target")]
    TargetNotAllowed(ActionKind),

    #[error("you cannot target yourself")]
    SelfTarget,

    #[error("{0} is not a valid target")]
    InvalidTarget(SeatId),

    #[error("{0} has no coins to steal")]
    NothingToSteal(SeatId),

    #[error("you cannot pass on your own claim")]
    CannotPassOwnClaim,

    #[error("you cannot challenge your own claim")]
    CannotChallengeOwnClaim,

    #[error("you cannot block your own action")]
    CannotBlockOwnAction,

    #[error("{role} cannot block {action}")]
    RoleCannotBlock { role: Role, action: ActionKind },

    #[error("only the target may block {0}")]
    NotEligibleToBlock(ActionKind),

    #[error("you are not eligible to react in this window")]
    NotEligibleToReact,

    #[error("you are not the seat choosing an influence to lose")]
    NotTheChooser,

    #[error("you do not hold {0}")]
    CardNotHeld(Role),

    #[error("you are not the exchanging seat")]
    NotTheExchanger,

    #[error("you must keep exactly {expected} cards, got {got}")]
    KeepCountMismatch { expected: usize, got: usize },

    #[error("{0} was not offered")]
    CardNotOffered(Role),

    #[error("the match is full ({0} seats)")]
    LobbyFull(usize),

    #[error("only the host can do that")]
    NotHost,

    #[error("need at least {min} players, have {have}")]
    NotEnoughPlayers { min: usize, have: usize },

    #[error("not every player is ready")]
    PlayersNotReady,

    #[error("display name must not be empty")]
    EmptyName,
}

// ============================================================================
// Lookup
// ============================================================================

/// Lookup failure. At the transport boundary this maps to an
/// authentication or lookup error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotFound {
    #[error("no match with id {0}")]
    Match(MatchId),

    #[error("no match with code {0}")]
    Code(String),

    #[error("unknown reconnect token")]
    Token,

    #[error("no seat {0} in this match")]
    Seat(SeatId),
}

/// Error returned by [`GameService`](crate::service::GameService).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] RuleViolation),

    #[error(transparent)]
    NotFound(#[from] NotFound),
}

impl EngineError {
    /// The rule violation, if this is a validation error.
    #[must_use]
    pub fn as_violation(&self) -> Option<&RuleViolation> {
        match self {
            EngineError::Validation(v) => Some(v),
            EngineError::NotFound(_) => None,
        }
    }
}

// ============================================================================
// Collaborators
// ============================================================================

/// Failure writing a finished round to the archive.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArchiveError {
    /// The round was already recorded. Callers treat this as success.
    #[error("results for {match_id} already recorded")]
    AlreadyRecorded { match_id: MatchId },

    #[error("archive backend failure: {0}")]
    Backend(String),
}

/// Failure delivering a notification. Logged, never propagated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("notification delivery failed: {0}")]
pub struct NotifyError(pub String);

/// Invalid [`EngineConfig`](crate::core::EngineConfig) value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value for '{field}': got '{value}', expected {expected}")]
    InvalidValue {
        field: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// Failure encoding or decoding a match snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot encoding failed: {0}")]
    Encode(#[source] bincode::Error),

    #[error("snapshot decoding failed: {0}")]
    Decode(#[source] bincode::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violation_messages_are_readable() {
        let err = RuleViolation::InsufficientCoins {
            action: ActionKind::Assassinate,
            cost: 3,
            coins: 1,
        };
        assert_eq!(err.to_string(), "assassinate costs 3 coins, you have 1");

        let err = RuleViolation::WrongPhase {
            command: "pass",
            phase: Phase::ActionSelection,
        };
        assert_eq!(err.to_string(), "pass is not allowed during action_selection");
    }

    #[test]
    fn test_engine_error_is_transparent() {
        let err: EngineError = NotFound::Token.into();
        assert_eq!(err.to_string(), "unknown reconnect token");
        assert!(err.as_violation().is_none());

        let err: EngineError = RuleViolation::NotYourTurn.into();
        assert_eq!(err.as_violation(), Some(&RuleViolation::NotYourTurn));
    }
}
