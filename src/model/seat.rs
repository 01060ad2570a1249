//! Seats: players and spectators.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{MatchId, Role, SeatId};

use super::Hand;

/// A participant slot in a match.
///
/// `index` is the turn-order position. Players hold `0..n`; spectators hold
/// negative indices so the two never collide.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seat {
    pub id: SeatId,
    pub match_id: MatchId,
    pub name: String,
    /// Reconnect secret. Never shown to other seats.
    pub token: String,
    pub index: i32,
    pub coins: u32,
    hand: Hand,
    pub revealed: Vec<Role>,
    alive: bool,
    pub host: bool,
    pub spectator: bool,
    pub ready: bool,
    pub last_activity: DateTime<Utc>,
}

impl Seat {
    /// A new lobby player.
    #[must_use]
    pub fn player(
        id: SeatId,
        match_id: MatchId,
        name: impl Into<String>,
        token: String,
        index: i32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            match_id,
            name: name.into(),
            token,
            index,
            coins: 0,
            hand: Hand::new(),
            revealed: Vec::new(),
            alive: true,
            host: false,
            spectator: false,
            ready: false,
            last_activity: now,
        }
    }

    /// A new spectator. Spectators are never alive.
    #[must_use]
    pub fn spectator(
        id: SeatId,
        match_id: MatchId,
        name: impl Into<String>,
        token: String,
        index: i32,
        now: DateTime<Utc>,
    ) -> Self {
        let mut seat = Self::player(id, match_id, name, token, index, now);
        seat.spectator = true;
        seat.alive = false;
        seat
    }

    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// A living, non-spectating seat.
    #[must_use]
    pub fn is_active_player(&self) -> bool {
        self.alive && !self.spectator
    }

    #[must_use]
    pub fn hand(&self) -> &[Role] {
        &self.hand
    }

    #[must_use]
    pub fn influence_count(&self) -> usize {
        self.hand.len()
    }

    #[must_use]
    pub fn holds(&self, role: Role) -> bool {
        self.hand.contains(&role)
    }

    /// Deal cards at the start of a round.
    pub fn deal(&mut self, cards: Hand, coins: u32) {
        self.hand = cards;
        self.coins = coins;
        self.revealed.clear();
        self.alive = true;
    }

    /// Add cards to the hand (replacement draw, exchange draw).
    pub fn receive(&mut self, cards: impl IntoIterator<Item = Role>) {
        self.hand.extend(cards);
    }

    /// Remove one hidden copy of `role` without revealing it.
    ///
    /// Used when a proven card goes back to the deck. The caller must hand the
    /// seat a replacement within the same cascade.
    pub fn take_card(&mut self, role: Role) -> Option<Role> {
        let pos = self.hand.iter().position(|&c| c == role)?;
        Some(self.hand.remove(pos))
    }

    /// Replace the whole hand. Returns the previous one.
    pub fn replace_hand(&mut self, hand: Hand) -> Hand {
        std::mem::replace(&mut self.hand, hand)
    }

    /// Reveal one held copy of `role`. Returns `false` if not held.
    ///
    /// A seat whose hand empties is dead from this point on.
    pub fn reveal(&mut self, role: Role) -> bool {
        let Some(card) = self.take_card(role) else {
            return false;
        };
        self.revealed.push(card);
        if self.hand.is_empty() {
            self.alive = false;
        }
        true
    }

    /// Reveal every held card and mark the seat dead.
    pub fn reveal_all(&mut self) -> Vec<Role> {
        let cards: Vec<Role> = self.hand.drain(..).collect();
        self.revealed.extend(cards.iter().copied());
        self.alive = false;
        cards
    }

    /// Reset to a fresh lobby player (rematch).
    pub fn reset_for_lobby(&mut self, index: i32) {
        self.index = index;
        self.coins = 0;
        self.hand.clear();
        self.revealed.clear();
        self.alive = true;
        self.spectator = false;
        self.ready = false;
    }
}
