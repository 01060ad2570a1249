//! Core engine types: identifiers, roles, actions, RNG, configuration, clock.
//!
//! These are plain values with no rule validation. The rules engine gives
//! them meaning.

pub mod ids;
pub mod role;
pub mod action;
pub mod rng;
pub mod config;
pub mod clock;

pub use ids::{MatchId, SeatId};
pub use role::Role;
pub use action::{ActionKind, Capabilities, Command};
pub use rng::{GameRng, GameRngState};
pub use config::{EngineConfig, MAX_TIMING_SECS};
pub use clock::{Clock, ManualClock, SystemClock};
