//! The rules cascade.
//!
//! A command validates, makes its own change, and hands the engine the first
//! [`Transition`] to run. [`settle`] then applies transitions one after the
//! other until the match rests on a decision someone has to make (an open
//! window, a pending influence loss, an exchange offer, the next seat's
//! action) or the match is over. The whole cascade runs inside one lock
//! acquisition and never suspends.
//!
//! The win check (at most one living seat) runs before every transition.

use smallvec::SmallVec;
use tracing::{debug, info, trace};

use crate::core::{ActionKind, SeatId};
use crate::model::{GameEvent, Match};
use crate::turn::{ExchangeOffer, LossReason, PassSet, PendingLoss, Stage, TurnStep};

use super::Cx;

/// One step of the cascade.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Transition {
    OpenChallengeWindow,
    OpenBlockWindow,
    OpenBlockChallengeWindow,
    /// Every eligible seat has passed in the open window.
    CloseWindow,
    ResolveAction,
    BlockStands,
    LoseInfluence { seat: SeatId, reason: LossReason },
    AfterInfluenceLoss(LossReason),
    EndTurn,
}

/// Run transitions until the match rests.
pub(crate) fn settle(m: &mut Match, first: Option<Transition>, cx: &Cx<'_>) {
    let mut next = first;
    loop {
        if !m.is_over() && m.alive_count() <= 1 {
            finish(m, cx);
            return;
        }
        let Some(transition) = next else {
            debug!(match_id = %m.id, phase = %m.phase(), "cascade settled");
            return;
        };
        trace!(match_id = %m.id, ?transition, "cascade step");
        next = step(m, transition, cx);
    }
}

fn step(m: &mut Match, transition: Transition, cx: &Cx<'_>) -> Option<Transition> {
    match transition {
        Transition::OpenChallengeWindow => open_window(m, TurnStep::ChallengeWindow(PassSet::new())),
        Transition::OpenBlockWindow => open_window(m, TurnStep::BlockWindow(PassSet::new())),
        Transition::OpenBlockChallengeWindow => open_window(m, TurnStep::BlockChallengeWindow(PassSet::new())),
        Transition::CloseWindow => close_window(m),
        Transition::ResolveAction => resolve_action(m, cx),
        Transition::BlockStands => block_stands(m, cx),
        Transition::LoseInfluence { seat, reason } => lose_influence(m, seat, reason, cx),
        Transition::AfterInfluenceLoss(reason) => after_influence_loss(m, reason),
        Transition::EndTurn => {
            end_turn(m, cx);
            None
        }
    }
}

// ============================================================================
// Reaction windows
// ============================================================================

/// Seats that may still react in the open window.
///
/// Challenge window: every living seat but the actor. Block window: the target
/// alone for targeted actions, otherwise every living seat but the actor.
/// Block-challenge window: every living seat but the blocker.
#[must_use]
pub fn eligible_reactors(m: &Match) -> SmallVec<[SeatId; 6]> {
    let Some(turn) = m.turn() else {
        return SmallVec::new();
    };
    let others = |excluded: Option<SeatId>| -> SmallVec<[SeatId; 6]> {
        m.alive_seats()
            .map(|s| s.id)
            .filter(|&id| Some(id) != excluded)
            .collect()
    };
    match &turn.step {
        TurnStep::ChallengeWindow(_) => others(Some(turn.actor)),
        TurnStep::BlockWindow(_) if turn.action.capabilities().target_blocks_only => turn
            .target
            .filter(|&t| m.seat(t).is_some_and(|s| s.is_active_player()))
            .into_iter()
            .collect(),
        TurnStep::BlockWindow(_) => others(Some(turn.actor)),
        TurnStep::BlockChallengeWindow(_) => others(turn.blocker()),
        _ => SmallVec::new(),
    }
}

/// Whether every eligible seat has passed in the open window.
pub(crate) fn window_complete(m: &Match) -> bool {
    let eligible = eligible_reactors(m);
    m.turn()
        .and_then(|t| t.step.passes())
        .is_some_and(|passes| passes.covers(&eligible))
}

fn open_window(m: &mut Match, step: TurnStep) -> Option<Transition> {
    m.set_step(step);
    window_complete(m).then_some(Transition::CloseWindow)
}

fn close_window(m: &mut Match) -> Option<Transition> {
    let turn = m.turn()?;
    match turn.step {
        TurnStep::ChallengeWindow(_) if turn.action.is_blockable() => Some(Transition::OpenBlockWindow),
        TurnStep::ChallengeWindow(_) | TurnStep::BlockWindow(_) => Some(Transition::ResolveAction),
        TurnStep::BlockChallengeWindow(_) => Some(Transition::BlockStands),
        _ => None,
    }
}

// ============================================================================
// Effects
// ============================================================================

/// Pay the action's cost if it has not been paid yet.
fn charge_cost(m: &mut Match) -> u32 {
    let Some(turn) = m.turn_mut() else {
        return 0;
    };
    if turn.cost_charged {
        return 0;
    }
    turn.cost_charged = true;
    let (actor, cost) = (turn.actor, turn.action.cost());
    m.pay_to_treasury(actor, cost)
}

fn resolve_action(m: &mut Match, cx: &Cx<'_>) -> Option<Transition> {
    let turn = m.turn()?;
    let (action, actor, target) = (turn.action, turn.actor, turn.target);
    let target_alive = target.and_then(|t| m.seat(t)).is_some_and(|s| s.is_alive());

    let resolved = |m: &mut Match, coins: u32| {
        m.append_log(
            GameEvent::ActionResolved {
                actor,
                action,
                target,
                coins,
            },
            cx.now,
        );
    };

    match action {
        ActionKind::Income | ActionKind::ForeignAid | ActionKind::Tax => {
            let amount = match action {
                ActionKind::Income => 1,
                ActionKind::ForeignAid => 2,
                _ => 3,
            };
            let paid = m.pay_from_treasury(actor, amount);
            resolved(m, paid);
            Some(Transition::EndTurn)
        }
        ActionKind::Steal => {
            if let (Some(t), true) = (target, target_alive) {
                let stolen = m.seat(t).map_or(0, |s| s.coins.min(2));
                if let Some(victim) = m.seat_mut(t) {
                    victim.coins -= stolen;
                }
                if let Some(thief) = m.seat_mut(actor) {
                    thief.coins += stolen;
                }
                resolved(m, stolen);
            }
            Some(Transition::EndTurn)
        }
        ActionKind::Assassinate => {
            let paid = charge_cost(m);
            resolved(m, paid);
            match target {
                Some(seat) if target_alive => Some(Transition::LoseInfluence {
                    seat,
                    reason: LossReason::Assassinated,
                }),
                _ => Some(Transition::EndTurn),
            }
        }
        ActionKind::Exchange => {
            let keep = m.seat(actor)?.influence_count();
            let drawn = m.draw(2);
            let seat = m.seat_mut(actor)?;
            seat.receive(drawn.iter().copied());
            let pool = seat.hand().iter().copied().collect();
            m.append_log(
                GameEvent::ExchangeStarted {
                    actor,
                    drawn: drawn.len(),
                },
                cx.now,
            );
            m.set_step(TurnStep::ExchangeReturn(ExchangeOffer { pool, keep }));
            None
        }
        // Coup's effect is queued at declaration.
        ActionKind::Coup => Some(Transition::EndTurn),
    }
}

fn block_stands(m: &mut Match, cx: &Cx<'_>) -> Option<Transition> {
    let turn = m.turn()?;
    let block = turn.block?;
    let action = turn.action;
    m.append_log(
        GameEvent::BlockSucceeded {
            blocker: block.blocker,
            role: block.role,
            action,
        },
        cx.now,
    );
    // A blocked assassination is still paid for.
    if action == ActionKind::Assassinate {
        charge_cost(m);
    }
    Some(Transition::EndTurn)
}

// ============================================================================
// Influence loss
// ============================================================================

fn lose_influence(m: &mut Match, seat: SeatId, reason: LossReason, cx: &Cx<'_>) -> Option<Transition> {
    let Some(s) = m.seat(seat).filter(|s| s.is_alive()) else {
        return Some(Transition::AfterInfluenceLoss(reason));
    };
    match s.hand() {
        [only] => {
            let role = *only;
            m.reveal_influence(seat, role, reason, cx.now);
            Some(Transition::AfterInfluenceLoss(reason))
        }
        _ => {
            m.set_step(TurnStep::InfluenceLoss(PendingLoss { seat, reason }));
            None
        }
    }
}

fn after_influence_loss(m: &mut Match, reason: LossReason) -> Option<Transition> {
    let turn = m.turn()?;
    let next = match reason {
        LossReason::Coup | LossReason::Assassinated => Transition::EndTurn,
        LossReason::ChallengeLost if turn.action_failed() => Transition::EndTurn,
        LossReason::ChallengeLost if turn.action.is_blockable() => Transition::OpenBlockWindow,
        LossReason::ChallengeLost => Transition::ResolveAction,
        LossReason::ChallengeBlockLost if turn.block_failed() => Transition::ResolveAction,
        LossReason::ChallengeBlockLost => Transition::BlockStands,
    };
    Some(next)
}

// ============================================================================
// Turn end
// ============================================================================

/// Advance to the next living seat after the turn's actor (or after the
/// current seat when no action was declared) and log the new turn.
pub(crate) fn end_turn(m: &mut Match, cx: &Cx<'_>) {
    let after = m
        .turn()
        .and_then(|t| m.seat(t.actor))
        .map_or(m.current_seat, |s| s.index);
    m.advance_turn(after);
    if let Some(seat) = m.current_actor().map(|s| s.id) {
        m.append_log(GameEvent::TurnStart { seat }, cx.now);
    }
}

fn finish(m: &mut Match, cx: &Cx<'_>) {
    let winner = m.alive_seats().next().map(|s| s.id);
    m.winner = winner;
    m.set_stage(Stage::GameOver);
    m.append_log(GameEvent::GameOver { winner }, cx.now);
    info!(match_id = %m.id, winner = ?winner, turns = m.turn_number, "game over");
}
