//! Entity model: matches, seats, the deck, the event log and results.

pub mod deck;
pub mod seat;
pub mod event_log;
pub mod game;
pub mod result;

pub use deck::{Deck, Hand};
pub use seat::Seat;
pub use event_log::{EventLog, GameEvent, LogEntry};
pub use game::Match;
pub use result::{compute_results, GameResult};
