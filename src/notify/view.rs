//! What each audience may see of a match.
//!
//! [`PublicState`] is safe to broadcast: it carries hand sizes but never hand
//! contents, and never the exchange pool. [`PrivateState`] is for one seat
//! only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{ActionKind, MatchId, Role, SeatId};
use crate::model::{LogEntry, Match, Seat};
use crate::rules::eligible_reactors;
use crate::turn::{ChallengeOutcome, LossReason, Phase, TurnState, TurnStep};

/// A seat as everyone sees it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatSummary {
    pub id: SeatId,
    pub name: String,
    pub index: i32,
    pub coins: u32,
    /// Number of hidden cards.
    pub influence: usize,
    pub revealed: Vec<Role>,
    pub alive: bool,
    pub host: bool,
    pub spectator: bool,
    pub ready: bool,
}

impl SeatSummary {
    #[must_use]
    pub fn of(seat: &Seat) -> Self {
        Self {
            id: seat.id,
            name: seat.name.clone(),
            index: seat.index,
            coins: seat.coins,
            influence: seat.influence_count(),
            revealed: seat.revealed.clone(),
            alive: seat.is_alive(),
            host: seat.host,
            spectator: seat.spectator,
            ready: seat.ready,
        }
    }
}

/// The turn in progress, minus anything hidden.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnView {
    pub action: ActionKind,
    pub actor: SeatId,
    pub target: Option<SeatId>,
    pub cost_charged: bool,
    pub challenger: Option<SeatId>,
    pub challenge_outcome: Option<ChallengeOutcome>,
    pub blocker: Option<SeatId>,
    pub block_role: Option<Role>,
    pub block_challenger: Option<SeatId>,
    pub block_challenge_outcome: Option<ChallengeOutcome>,
    /// Seats that passed in the open window.
    pub passed: Vec<SeatId>,
    /// Seats whose input the match is waiting on.
    pub awaiting: Vec<SeatId>,
    pub loss_reason: Option<LossReason>,
    /// How many cards the exchanging seat must keep.
    pub exchange_keep: Option<usize>,
}

impl TurnView {
    #[must_use]
    pub fn of(m: &Match, turn: &TurnState) -> Self {
        let passed = turn
            .step
            .passes()
            .map(|p| p.iter().collect())
            .unwrap_or_default();
        let awaiting = match &turn.step {
            TurnStep::InfluenceLoss(pending) => vec![pending.seat],
            TurnStep::ExchangeReturn(_) => vec![turn.actor],
            step => {
                let passes = step.passes();
                eligible_reactors(m)
                    .into_iter()
                    .filter(|&s| !passes.is_some_and(|p| p.contains(s)))
                    .collect()
            }
        };
        let loss_reason = match &turn.step {
            TurnStep::InfluenceLoss(pending) => Some(pending.reason),
            _ => None,
        };
        let exchange_keep = match &turn.step {
            TurnStep::ExchangeReturn(offer) => Some(offer.keep),
            _ => None,
        };
        let block_challenge = turn.block.and_then(|b| b.challenge);

        Self {
            action: turn.action,
            actor: turn.actor,
            target: turn.target,
            cost_charged: turn.cost_charged,
            challenger: turn.challenge.map(|c| c.challenger),
            challenge_outcome: turn.challenge.map(|c| c.outcome),
            blocker: turn.blocker(),
            block_role: turn.block.map(|b| b.role),
            block_challenger: block_challenge.map(|c| c.challenger),
            block_challenge_outcome: block_challenge.map(|c| c.outcome),
            passed,
            awaiting,
            loss_reason,
            exchange_keep,
        }
    }
}

/// Everything anyone watching the match may see.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicState {
    pub match_id: MatchId,
    pub code: String,
    pub phase: Phase,
    pub treasury: u32,
    pub deck_size: usize,
    pub turn_number: u32,
    pub current_seat: Option<SeatId>,
    pub turn: Option<TurnView>,
    pub winner: Option<SeatId>,
    pub turn_deadline: Option<DateTime<Utc>>,
    /// The live (bounded) log, oldest first.
    pub log: Vec<LogEntry>,
    pub seats: Vec<SeatSummary>,
}

impl PublicState {
    #[must_use]
    pub fn of(m: &Match) -> Self {
        let current_seat = if m.phase().is_in_progress() {
            m.current_actor().map(|s| s.id)
        } else {
            None
        };
        Self {
            match_id: m.id,
            code: m.code.clone(),
            phase: m.phase(),
            treasury: m.treasury,
            deck_size: m.deck.len(),
            turn_number: m.turn_number,
            current_seat,
            turn: m.turn().map(|t| TurnView::of(m, t)),
            winner: m.winner,
            turn_deadline: m.turn_deadline,
            log: m.log.recent().cloned().collect(),
            seats: m.seats().iter().map(SeatSummary::of).collect(),
        }
    }
}

/// Private extras for the seat that has to act on hidden cards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrivateExtra {
    /// The pool to choose from during an exchange.
    ExchangeOffer { pool: Vec<Role>, keep: usize },
}

/// One seat's own view: its summary, its hand, its reconnect token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateState {
    pub match_id: MatchId,
    pub seat: SeatSummary,
    pub hand: Vec<Role>,
    pub token: String,
    pub extra: Option<PrivateExtra>,
}

impl PrivateState {
    /// The private view for `seat`, or `None` if it is not seated.
    #[must_use]
    pub fn of(m: &Match, seat: SeatId) -> Option<Self> {
        let s = m.seat(seat)?;
        let extra = match m.turn() {
            Some(turn) if turn.actor == seat => match &turn.step {
                TurnStep::ExchangeReturn(offer) => Some(PrivateExtra::ExchangeOffer {
                    pool: offer.pool.to_vec(),
                    keep: offer.keep,
                }),
                _ => None,
            },
            _ => None,
        };
        Some(Self {
            match_id: m.id,
            seat: SeatSummary::of(s),
            hand: s.hand().to_vec(),
            token: s.token.clone(),
            extra,
        })
    }
}
