//! Per-turn context.
//!
//! A [`TurnState`] exists from the moment a seat declares an action until the
//! turn ends. What the turn is currently waiting for is a [`TurnStep`]; each
//! variant carries only the data valid for that step, so "the pass set of the
//! block window" or "the cards offered for exchange" cannot exist outside the
//! step they belong to.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::core::{ActionKind, Role, SeatId};
use crate::model::Hand;

use super::Phase;

/// Outcome of a challenge against a claim.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeOutcome {
    /// The claimant held the role; the challenger loses an influence.
    ClaimProven,
    /// The claimant was bluffing and loses an influence.
    ClaimFailed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeRecord {
    pub challenger: SeatId,
    pub outcome: ChallengeOutcome,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRecord {
    pub blocker: SeatId,
    pub role: Role,
    pub challenge: Option<ChallengeRecord>,
}

/// Why a seat is losing an influence. Decides what happens once it is lost.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossReason {
    Coup,
    ChallengeLost,
    ChallengeBlockLost,
    Assassinated,
}

impl std::fmt::Display for LossReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            LossReason::Coup => "coup",
            LossReason::ChallengeLost => "challenge_lost",
            LossReason::ChallengeBlockLost => "challenge_block_lost",
            LossReason::Assassinated => "assassinated",
        })
    }
}

/// Seats that have passed in the current reaction window.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassSet(SmallVec<[SeatId; 6]>);

impl PassSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a pass. Returns `false` if the seat had already passed.
    pub fn insert(&mut self, seat: SeatId) -> bool {
        if self.contains(seat) {
            return false;
        }
        self.0.push(seat);
        true
    }

    #[must_use]
    pub fn contains(&self, seat: SeatId) -> bool {
        self.0.contains(&seat)
    }

    /// Whether every eligible seat has passed.
    #[must_use]
    pub fn covers(&self, eligible: &[SeatId]) -> bool {
        eligible.iter().all(|s| self.contains(*s))
    }

    pub fn iter(&self) -> impl Iterator<Item = SeatId> + '_ {
        self.0.iter().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A seat that must name which influence to reveal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingLoss {
    pub seat: SeatId,
    pub reason: LossReason,
}

/// Cards offered to the exchanging seat.
///
/// While the offer is open the drawn cards sit in the actor's hand, so the
/// hand equals `pool` as a multiset. `pool` is the pre-exchange hand followed
/// by the drawn cards, in that order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeOffer {
    pub pool: Hand,
    /// Cards the actor must keep: the pre-exchange hand size.
    pub keep: usize,
}

impl ExchangeOffer {
    /// Cards that came from the deck.
    #[must_use]
    pub fn drawn(&self) -> &[Role] {
        &self.pool[self.keep.min(self.pool.len())..]
    }
}

/// What the current turn is waiting for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStep {
    /// The action has been declared and is being routed.
    Declared,
    ChallengeWindow(PassSet),
    /// A challenge against the action is being settled.
    ResolvingChallenge,
    BlockWindow(PassSet),
    BlockChallengeWindow(PassSet),
    /// A challenge against the block is being settled.
    ResolvingBlockChallenge,
    InfluenceLoss(PendingLoss),
    ExchangeReturn(ExchangeOffer),
}

impl TurnStep {
    #[must_use]
    pub fn phase(&self) -> Phase {
        match self {
            TurnStep::Declared => Phase::ActionSelection,
            TurnStep::ChallengeWindow(_) => Phase::AwaitingChallengeAction,
            TurnStep::ResolvingChallenge => Phase::ResolvingChallengeAction,
            TurnStep::BlockWindow(_) => Phase::AwaitingBlock,
            TurnStep::BlockChallengeWindow(_) => Phase::AwaitingChallengeBlock,
            TurnStep::ResolvingBlockChallenge => Phase::ResolvingChallengeBlock,
            TurnStep::InfluenceLoss(_) => Phase::AwaitingInfluenceLoss,
            TurnStep::ExchangeReturn(_) => Phase::AwaitingExchangeReturn,
        }
    }

    /// Pass set of the open reaction window, if any.
    #[must_use]
    pub fn passes(&self) -> Option<&PassSet> {
        match self {
            TurnStep::ChallengeWindow(p) | TurnStep::BlockWindow(p) | TurnStep::BlockChallengeWindow(p) => Some(p),
            _ => None,
        }
    }

    pub fn passes_mut(&mut self) -> Option<&mut PassSet> {
        match self {
            TurnStep::ChallengeWindow(p) | TurnStep::BlockWindow(p) | TurnStep::BlockChallengeWindow(p) => Some(p),
            _ => None,
        }
    }
}

/// Context of the turn in progress.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnState {
    pub action: ActionKind,
    pub actor: SeatId,
    pub target: Option<SeatId>,
    /// The action's cost has been paid to the treasury.
    pub cost_charged: bool,
    pub challenge: Option<ChallengeRecord>,
    pub block: Option<BlockRecord>,
    pub step: TurnStep,
}

impl TurnState {
    #[must_use]
    pub fn new(action: ActionKind, actor: SeatId, target: Option<SeatId>, step: TurnStep) -> Self {
        Self {
            action,
            actor,
            target,
            cost_charged: false,
            challenge: None,
            block: None,
            step,
        }
    }

    /// The actor was caught bluffing; the action has no effect.
    #[must_use]
    pub fn action_failed(&self) -> bool {
        matches!(
            self.challenge,
            Some(ChallengeRecord {
                outcome: ChallengeOutcome::ClaimFailed,
                ..
            })
        )
    }

    /// The blocker was caught bluffing; the action goes through.
    #[must_use]
    pub fn block_failed(&self) -> bool {
        matches!(
            self.block,
            Some(BlockRecord {
                challenge: Some(ChallengeRecord {
                    outcome: ChallengeOutcome::ClaimFailed,
                    ..
                }),
                ..
            })
        )
    }

    #[must_use]
    pub fn blocker(&self) -> Option<SeatId> {
        self.block.map(|b| b.blocker)
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.step.phase()
    }
}
