//! Archival results of a finished round.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{MatchId, Role, SeatId};

use super::{LogEntry, Match};

/// One seat's final standing in a round.
///
/// Only the winner's record carries the full event log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameResult {
    pub match_id: MatchId,
    pub seat: SeatId,
    pub name: String,
    pub seat_index: i32,
    pub coins: u32,
    pub hand: Vec<Role>,
    pub revealed: Vec<Role>,
    pub winner: bool,
    pub alive: bool,
    /// 1 is best.
    pub placement: usize,
    pub total_players: usize,
    pub total_turns: u32,
    pub full_log: Option<im::Vector<LogEntry>>,
    pub started_at: DateTime<Utc>,
}

/// Build the result records for a finished round.
///
/// Placement: the winner is 1, any other survivor 2, and eliminated seats
/// rank by elimination order, earliest worst (`players - position`). A seat
/// missing from the elimination record ranks last.
#[must_use]
pub fn compute_results(m: &Match) -> Vec<GameResult> {
    let total = m.player_count();
    let deaths = m.log.elimination_order();
    let started_at = m.started_at.unwrap_or(m.created_at);

    m.players()
        .map(|seat| {
            let winner = m.winner == Some(seat.id);
            let placement = if winner {
                1
            } else if seat.is_alive() {
                2
            } else {
                deaths
                    .iter()
                    .position(|&d| d == seat.id)
                    .map_or(total, |i| total - i)
            };
            GameResult {
                match_id: m.id,
                seat: seat.id,
                name: seat.name.clone(),
                seat_index: seat.index,
                coins: seat.coins,
                hand: seat.hand().to_vec(),
                revealed: seat.revealed.clone(),
                winner,
                alive: seat.is_alive(),
                placement,
                total_players: total,
                total_turns: m.turn_number,
                full_log: winner.then(|| m.log.full().clone()),
                started_at,
            }
        })
        .collect()
}
