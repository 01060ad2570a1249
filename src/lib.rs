//! # coup-engine
//!
//! Authoritative rules engine and turn-state machine for Coup, the bluffing
//! card game of hidden roles, challenges and blocks.
//!
//! ## Design Principles
//!
//! 1. **One lock per match**: every command and every supervisor intervention
//!    runs its full read, validate, mutate cascade under that match's lock.
//!    Matches never block each other.
//!
//! 2. **Reject before mutate**: a command is validated completely before its
//!    first change, so a rejected command leaves the match untouched.
//!
//! 3. **Explicit turn state**: the per-turn context is a tagged union with one
//!    variant per step, carrying only the fields that step needs.
//!
//! 4. **Cascade as a trampoline**: follow-up effects (a lost challenge, an
//!    automatic influence loss, the end of the turn, the end of the game) are
//!    applied one transition at a time until the match waits on a decision.
//!
//! ## Modules
//!
//! - `core`: ids, roles, the action capability table, RNG, config, clock
//! - `model`: matches, seats, deck, event log, archival results
//! - `turn`: phases and the per-turn state
//! - `rules`: the `RulesEngine` trait, command validation and the cascade
//! - `notify`: public and private views, notification hooks
//! - `archive`: insert-only archive of finished rounds
//! - `store`: the match registry and snapshots
//! - `service`: `GameService`, the entry point for a transport layer
//! - `supervisor`: turn timeouts and inactivity reaping
//! - `logging`: tracing subscriber setup

pub mod core;
pub mod error;
pub mod model;
pub mod turn;
pub mod rules;
pub mod notify;
pub mod archive;
pub mod store;
pub mod service;
pub mod supervisor;
pub mod logging;

// Re-export commonly used types
pub use crate::core::{
    MatchId, SeatId, Role, ActionKind, Capabilities, Command,
    GameRng, GameRngState, EngineConfig,
    Clock, ManualClock, SystemClock,
};

pub use crate::error::{
    RuleViolation, NotFound, EngineError,
    ArchiveError, NotifyError, ConfigError, SnapshotError,
};

pub use crate::model::{Deck, Hand, Seat, Match, EventLog, GameEvent, LogEntry, GameResult, compute_results};

pub use crate::turn::{Phase, Stage, TurnState, TurnStep, LossReason};

pub use crate::rules::{RulesEngine, CoupRules, Outcome};

pub use crate::notify::{
    Notifier, NullNotifier, ChannelNotifier, Notification, Outbox,
    PublicState, PrivateState, PrivateExtra, SeatSummary, TurnView,
};

pub use crate::archive::{ResultArchive, InMemoryArchive, RoundKey};

pub use crate::store::{MatchStore, MatchHandle};

pub use crate::service::{GameService, Joined};

pub use crate::supervisor::{Supervisor, SweepReport, ReapReport, TimeoutOutcome};

pub use crate::logging::{init_logging, LogFormat};
