//! Identifiers for matches and seats.
//!
//! ## MatchId
//!
//! Allocated by the [`MatchStore`](crate::store::MatchStore), unique for the
//! lifetime of the process.
//!
//! ## SeatId
//!
//! Identifies a participant slot. Seat ids are allocated from one counter
//! shared by all matches, so a `SeatId` never collides across matches. A
//! seat's position in turn order is a separate value (`Seat::index`).

use serde::{Deserialize, Serialize};

/// Match identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MatchId(pub u64);

impl MatchId {
    /// Create a new match ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for MatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Match({})", self.0)
    }
}

/// Seat identifier.
///
/// ```
/// use coup_engine::core::SeatId;
///
/// let seat = SeatId::new(7);
/// assert_eq!(seat.raw(), 7);
/// assert_eq!(format!("{}", seat), "Seat 7");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SeatId(pub u64);

impl SeatId {
    /// Create a new seat ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SeatId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Seat {}", self.0)
    }
}
