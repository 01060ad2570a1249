//! Rules engine.
//!
//! The service calls into [`RulesEngine`] for everything that changes a
//! match in play:
//! - which commands are legal for a seat
//! - how a command changes the match, including the full follow-up cascade
//! - whether the match is over
//!
//! Lobby operations (seating, readiness, starting and rematching) live in
//! [`lobby`]; they run under the same match lock but are not player commands.

mod abandon;
mod cascade;
mod commands;
pub mod engine;
pub mod lobby;

use chrono::{DateTime, Utc};

use crate::core::EngineConfig;

pub(crate) use abandon::return_exchange_draw;
pub use cascade::eligible_reactors;
pub use engine::{CoupRules, Outcome, RulesEngine};

/// What a command runs against besides the match itself.
#[derive(Clone, Copy, Debug)]
pub struct Cx<'a> {
    pub config: &'a EngineConfig,
    /// Timestamp stamped on every log entry the command produces.
    pub now: DateTime<Utc>,
}

impl<'a> Cx<'a> {
    #[must_use]
    pub fn new(config: &'a EngineConfig, now: DateTime<Utc>) -> Self {
        Self { config, now }
    }
}
