//! The match aggregate.
//!
//! [`Match`] owns its seats, deck, treasury, turn state and log. The
//! operations here are data operations (draw, return, reveal, advance the turn
//! pointer) with no rule validation; the rules engine decides when they are
//! legal.
//!
//! ## Conservation
//!
//! While a round is in progress:
//!
//! - `treasury + Σ seat.coins == total_coins`
//! - `Σ |hand| + |deck| + Σ |revealed| == deck_size`
//!
//! [`Match::invariant_violation`] checks both, the copies of each role, and
//! the hand/alive rule.

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::core::{EngineConfig, GameRng, MatchId, Role, SeatId};
use crate::turn::{LossReason, Phase, Stage, TurnState, TurnStep};

use super::{Deck, EventLog, GameEvent, Hand, LogEntry, Seat};

/// A match: one lobby, played over any number of rounds.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    /// Join code shown to players.
    pub code: String,
    stage: Stage,
    seats: Vec<Seat>,
    pub deck: Deck,
    pub treasury: u32,
    /// Turn-order index of the seat whose turn it is.
    pub current_seat: i32,
    pub turn_number: u32,
    pub log: EventLog,
    pub winner: Option<SeatId>,
    pub min_seats: usize,
    pub max_seats: usize,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub turn_deadline: Option<DateTime<Utc>>,
    /// Start of the current round. Together with `id` it keys archived results.
    pub started_at: Option<DateTime<Utc>>,
    /// Bumped whenever the match starts waiting on a new decision.
    decision_seq: u64,
    /// Set once the match has been removed from service.
    pub closed: bool,
    rng: GameRng,
}

impl Match {
    /// A new, empty lobby.
    #[must_use]
    pub fn new(id: MatchId, code: String, config: &EngineConfig, rng: GameRng, now: DateTime<Utc>) -> Self {
        Self {
            id,
            code,
            stage: Stage::Lobby,
            seats: Vec::new(),
            deck: Deck::empty(),
            treasury: 0,
            current_seat: 0,
            turn_number: 0,
            log: EventLog::new(config.live_log_capacity),
            winner: None,
            min_seats: config.min_seats,
            max_seats: config.max_seats,
            created_at: now,
            last_activity: now,
            turn_deadline: None,
            started_at: None,
            decision_seq: 0,
            closed: false,
            rng,
        }
    }

    /// Generate a six-character join code.
    #[must_use]
    pub fn generate_code() -> String {
        let id = uuid::Uuid::new_v4().simple().to_string();
        id[..6].to_ascii_uppercase()
    }

    // ------------------------------------------------------------------------
    // Stage
    // ------------------------------------------------------------------------

    #[must_use]
    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.stage.phase()
    }

    #[must_use]
    pub fn turn(&self) -> Option<&TurnState> {
        self.stage.turn()
    }

    pub fn turn_mut(&mut self) -> Option<&mut TurnState> {
        self.stage.turn_mut()
    }

    /// Move to a new stage. Counts as a new decision.
    pub fn set_stage(&mut self, stage: Stage) {
        self.stage = stage;
        self.decision_seq += 1;
    }

    /// Move the turn in progress to a new step. Counts as a new decision.
    ///
    /// No-op outside a turn.
    pub fn set_step(&mut self, step: TurnStep) {
        if let Some(turn) = self.stage.turn_mut() {
            turn.step = step;
            self.decision_seq += 1;
        }
    }

    /// Changes whenever the match begins waiting on a different decision.
    #[must_use]
    pub fn decision_seq(&self) -> u64 {
        self.decision_seq
    }

    #[must_use]
    pub fn is_over(&self) -> bool {
        matches!(self.stage, Stage::GameOver)
    }

    // ------------------------------------------------------------------------
    // Seats
    // ------------------------------------------------------------------------

    /// Every seat, players first in turn order, then spectators.
    #[must_use]
    pub fn seats(&self) -> &[Seat] {
        &self.seats
    }

    pub fn seats_mut(&mut self) -> &mut [Seat] {
        &mut self.seats
    }

    #[must_use]
    pub fn seat(&self, id: SeatId) -> Option<&Seat> {
        self.seats.iter().find(|s| s.id == id)
    }

    pub fn seat_mut(&mut self, id: SeatId) -> Option<&mut Seat> {
        self.seats.iter_mut().find(|s| s.id == id)
    }

    #[must_use]
    pub fn seat_by_token(&self, token: &str) -> Option<&Seat> {
        self.seats.iter().find(|s| s.token == token)
    }

    /// Non-spectator seats in turn order.
    pub fn players(&self) -> impl Iterator<Item = &Seat> {
        self.seats.iter().filter(|s| !s.spectator)
    }

    /// Living players in turn order.
    pub fn alive_seats(&self) -> impl Iterator<Item = &Seat> {
        self.seats.iter().filter(|s| s.is_active_player())
    }

    #[must_use]
    pub fn alive_count(&self) -> usize {
        self.alive_seats().count()
    }

    #[must_use]
    pub fn player_count(&self) -> usize {
        self.players().count()
    }

    /// Add a seat and keep players ordered by turn index ahead of spectators.
    pub fn add_seat(&mut self, seat: Seat) {
        self.seats.push(seat);
        self.sort_seats();
    }

    /// Remove a seat entirely. Returns it if it existed.
    pub fn remove_seat(&mut self, id: SeatId) -> Option<Seat> {
        let pos = self.seats.iter().position(|s| s.id == id)?;
        Some(self.seats.remove(pos))
    }

    /// Lowest spectator index minus one (spectators count down from -1).
    #[must_use]
    pub fn next_spectator_index(&self) -> i32 {
        self.seats.iter().map(|s| s.index).min().unwrap_or(0).min(0) - 1
    }

    pub(crate) fn sort_seats(&mut self) {
        self.seats.sort_by_key(|s| (s.spectator, s.index));
    }

    // ------------------------------------------------------------------------
    // Turn order
    // ------------------------------------------------------------------------

    /// The seat whose turn index is current, alive or not.
    #[must_use]
    pub fn current_seat(&self) -> Option<&Seat> {
        self.players().find(|s| s.index == self.current_seat)
    }

    /// The living seat whose turn it is.
    #[must_use]
    pub fn current_actor(&self) -> Option<&Seat> {
        self.current_seat().filter(|s| s.is_alive())
    }

    /// Point the turn at the next living player after turn index `after`,
    /// wrapping around, then start a new turn in action selection.
    ///
    /// `after` need not belong to a living seat.
    pub fn advance_turn(&mut self, after: i32) {
        let total = i32::try_from(self.player_count()).unwrap_or(i32::MAX).max(1);
        let next = (1..=total)
            .map(|i| (after + i).rem_euclid(total))
            .find(|&idx| self.alive_seats().any(|s| s.index == idx));
        if let Some(idx) = next {
            self.current_seat = idx;
        }
        self.turn_number += 1;
        self.set_stage(Stage::ActionSelection);
    }

    // ------------------------------------------------------------------------
    // Log
    // ------------------------------------------------------------------------

    pub fn append_log(&mut self, event: GameEvent, now: DateTime<Utc>) {
        self.log.push(LogEntry {
            turn: self.turn_number,
            at: now,
            event,
        });
    }

    // ------------------------------------------------------------------------
    // Cards and coins
    // ------------------------------------------------------------------------

    pub(crate) fn rng_mut(&mut self) -> &mut GameRng {
        &mut self.rng
    }

    /// Draw up to `n` cards from the top of the deck.
    pub fn draw(&mut self, n: usize) -> Hand {
        self.deck.draw(n)
    }

    /// Return cards to the deck and reshuffle it.
    pub fn return_to_deck(&mut self, cards: impl IntoIterator<Item = Role>) {
        self.deck.return_and_shuffle(cards, &mut self.rng);
    }

    /// A seat proves `role`: the card goes back into the deck, the deck is
    /// reshuffled, and the seat draws a replacement.
    ///
    /// Returns `false` (and changes nothing) if the seat does not hold `role`.
    pub fn prove_and_swap(&mut self, seat: SeatId, role: Role) -> bool {
        let Some(card) = self.seat_mut(seat).and_then(|s| s.take_card(role)) else {
            return false;
        };
        self.return_to_deck([card]);
        let replacement = self.draw(1);
        if let Some(s) = self.seat_mut(seat) {
            s.receive(replacement);
        }
        true
    }

    /// Move a seat's coins to the treasury.
    pub fn exile(&mut self, seat: SeatId) {
        if let Some(s) = self.seat_mut(seat) {
            let coins = std::mem::take(&mut s.coins);
            self.treasury += coins;
        }
    }

    /// Reveal one influence and log it. A seat left without cards is exiled
    /// and logged as eliminated.
    ///
    /// Returns `false` if the seat does not hold `role`.
    pub fn reveal_influence(&mut self, seat: SeatId, role: Role, reason: LossReason, now: DateTime<Utc>) -> bool {
        let Some(s) = self.seat_mut(seat) else {
            return false;
        };
        if !s.reveal(role) {
            return false;
        }
        let died = !s.is_alive();
        self.append_log(GameEvent::InfluenceLost { seat, role, reason }, now);
        if died {
            self.exile(seat);
            self.append_log(GameEvent::SeatEliminated { seat }, now);
        }
        true
    }

    /// Move `amount` coins (or as many as remain) from the treasury to a seat.
    /// Returns the amount paid.
    pub fn pay_from_treasury(&mut self, seat: SeatId, amount: u32) -> u32 {
        let paid = amount.min(self.treasury);
        if let Some(s) = self.seat_mut(seat) {
            s.coins += paid;
            self.treasury -= paid;
            paid
        } else {
            0
        }
    }

    /// Move `amount` coins (or as many as the seat holds) from a seat to the
    /// treasury. Returns the amount paid.
    pub fn pay_to_treasury(&mut self, seat: SeatId, amount: u32) -> u32 {
        let Some(s) = self.seat_mut(seat) else {
            return 0;
        };
        let paid = amount.min(s.coins);
        s.coins -= paid;
        self.treasury += paid;
        paid
    }

    // ------------------------------------------------------------------------
    // Invariants
    // ------------------------------------------------------------------------

    #[must_use]
    pub fn coins_in_play(&self) -> u32 {
        self.treasury + self.seats.iter().map(|s| s.coins).sum::<u32>()
    }

    #[must_use]
    pub fn cards_in_play(&self) -> usize {
        self.deck.len()
            + self
                .seats
                .iter()
                .map(|s| s.hand().len() + s.revealed.len())
                .sum::<usize>()
    }

    /// Describe the first broken invariant, if any. Conservation is only
    /// checked once a round has been dealt.
    #[must_use]
    pub fn invariant_violation(&self, config: &EngineConfig) -> Option<String> {
        if self.phase() == Phase::Lobby {
            return None;
        }
        if let Some(s) = self.seats.iter().find(|s| s.hand().is_empty() && s.is_alive()) {
            return Some(format!("{} is alive with an empty hand", s.id));
        }
        if self.coins_in_play() != config.total_coins {
            return Some(format!(
                "coins in play {} != {}",
                self.coins_in_play(),
                config.total_coins
            ));
        }
        if self.cards_in_play() != config.deck_size() {
            return Some(format!(
                "cards in play {} != {}",
                self.cards_in_play(),
                config.deck_size()
            ));
        }
        let counts = self.role_counts();
        if let Some(role) = Role::ALL
            .into_iter()
            .find(|r| counts.get(r).copied().unwrap_or(0) != config.copies_per_role)
        {
            return Some(format!("{role} appears {} times", counts.get(&role).copied().unwrap_or(0)));
        }
        None
    }

    /// Copies of each role across deck, hands and revealed cards.
    #[must_use]
    pub fn role_counts(&self) -> FxHashMap<Role, usize> {
        let mut counts = FxHashMap::default();
        let cards = self
            .deck
            .cards()
            .iter()
            .chain(self.seats.iter().flat_map(|s| s.hand().iter().chain(&s.revealed)));
        for &role in cards {
            *counts.entry(role).or_insert(0) += 1;
        }
        counts
    }
}
