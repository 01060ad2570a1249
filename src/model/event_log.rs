//! Match event log.
//!
//! Two views of the same append-only sequence:
//!
//! - a bounded ring of the most recent entries, broadcast with every public
//!   state;
//! - the full log, kept for the archive and for placement. It is an
//!   `im::Vector`, so handing it to a result record is a cheap clone.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{ActionKind, Role, SeatId};
use crate::turn::{LossReason, Phase};

/// Something that happened in a match.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameEvent {
    GameStarted {
        turn_order: Vec<SeatId>,
    },
    ActionDeclared {
        actor: SeatId,
        action: ActionKind,
        target: Option<SeatId>,
    },
    ChallengeAction {
        challenger: SeatId,
        actor: SeatId,
        role: Role,
    },
    /// The actor proved the claimed role.
    ChallengeFailed {
        proven_by: SeatId,
        role: Role,
        loser: SeatId,
    },
    ChallengeSucceeded {
        challenger: SeatId,
        actor: SeatId,
    },
    BlockDeclared {
        blocker: SeatId,
        role: Role,
        action: ActionKind,
    },
    ChallengeBlock {
        challenger: SeatId,
        blocker: SeatId,
        role: Role,
    },
    /// The blocker proved the claimed role.
    ChallengeBlockFailed {
        proven_by: SeatId,
        role: Role,
        loser: SeatId,
    },
    ChallengeBlockSucceeded {
        challenger: SeatId,
        blocker: SeatId,
    },
    BlockSucceeded {
        blocker: SeatId,
        role: Role,
        action: ActionKind,
    },
    InfluenceLost {
        seat: SeatId,
        role: Role,
        reason: LossReason,
    },
    SeatEliminated {
        seat: SeatId,
    },
    ActionResolved {
        actor: SeatId,
        action: ActionKind,
        target: Option<SeatId>,
        /// Coins that changed hands.
        coins: u32,
    },
    ExchangeStarted {
        actor: SeatId,
        drawn: usize,
    },
    ExchangeCompleted {
        actor: SeatId,
    },
    PlayerAbandoned {
        seat: SeatId,
        revealed: Vec<Role>,
    },
    /// The supervisor applied a default because a decision timed out.
    AutoAction {
        phase: Phase,
        seat: Option<SeatId>,
    },
    TurnStart {
        seat: SeatId,
    },
    GameOver {
        winner: Option<SeatId>,
    },
    MatchClosedInactivity,
}

impl GameEvent {
    /// Event type name as it appears on the wire.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            GameEvent::GameStarted { .. } => "game_started",
            GameEvent::ActionDeclared { .. } => "action_declared",
            GameEvent::ChallengeAction { .. } => "challenge_action",
            GameEvent::ChallengeFailed { .. } => "challenge_failed",
            GameEvent::ChallengeSucceeded { .. } => "challenge_succeeded",
            GameEvent::BlockDeclared { .. } => "block_declared",
            GameEvent::ChallengeBlock { .. } => "challenge_block",
            GameEvent::ChallengeBlockFailed { .. } => "challenge_block_failed",
            GameEvent::ChallengeBlockSucceeded { .. } => "challenge_block_succeeded",
            GameEvent::BlockSucceeded { .. } => "block_succeeded",
            GameEvent::InfluenceLost { .. } => "influence_lost",
            GameEvent::SeatEliminated { .. } => "seat_eliminated",
            GameEvent::ActionResolved { .. } => "action_resolved",
            GameEvent::ExchangeStarted { .. } => "exchange_started",
            GameEvent::ExchangeCompleted { .. } => "exchange_completed",
            GameEvent::PlayerAbandoned { .. } => "player_abandoned",
            GameEvent::AutoAction { .. } => "auto_action",
            GameEvent::TurnStart { .. } => "turn_start",
            GameEvent::GameOver { .. } => "game_over",
            GameEvent::MatchClosedInactivity => "match_closed_inactivity",
        }
    }
}

/// One logged event, stamped with the turn it happened in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub turn: u32,
    pub at: DateTime<Utc>,
    pub event: GameEvent,
}

/// Bounded live log plus the full archival log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLog {
    capacity: usize,
    recent: VecDeque<LogEntry>,
    full: im::Vector<LogEntry>,
}

impl EventLog {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            recent: VecDeque::with_capacity(capacity.max(1)),
            full: im::Vector::new(),
        }
    }

    pub fn push(&mut self, entry: LogEntry) {
        if self.recent.len() == self.capacity {
            self.recent.pop_front();
        }
        self.recent.push_back(entry.clone());
        self.full.push_back(entry);
    }

    /// The most recent entries, oldest first.
    pub fn recent(&self) -> impl Iterator<Item = &LogEntry> {
        self.recent.iter()
    }

    /// Every entry since the round started.
    #[must_use]
    pub fn full(&self) -> &im::Vector<LogEntry> {
        &self.full
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.full.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.full.is_empty()
    }

    pub fn clear(&mut self) {
        self.recent.clear();
        self.full = im::Vector::new();
    }

    /// Seats in the order they were eliminated, earliest first.
    #[must_use]
    pub fn elimination_order(&self) -> Vec<SeatId> {
        self.full
            .iter()
            .filter_map(|e| match e.event {
                GameEvent::SeatEliminated { seat } => Some(seat),
                _ => None,
            })
            .collect()
    }
}
