//! Default resolutions for decisions that ran out of time.
//!
//! | phase                    | default                                        |
//! |--------------------------|------------------------------------------------|
//! | action selection         | Income (Coup on the next seat when forced)     |
//! | any reaction window      | every seat still eligible passes               |
//! | influence loss           | a uniformly random held card is revealed       |
//! | exchange return          | keep the first cards offered                   |
//! | anything else            | clear the stale deadline                       |
//!
//! Defaults go through the rules engine like any player command. A default
//! that fails partway leaves the match exactly as it was, log included.

use chrono::{DateTime, Utc};

use crate::core::{ActionKind, Command, SeatId};
use crate::error::RuleViolation;
use crate::model::{GameEvent, Match};
use crate::rules::{eligible_reactors, RulesEngine};
use crate::turn::{Phase, TurnStep};

/// What the supervisor did with one expired match.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeoutOutcome {
    /// A default was applied in the given phase.
    Applied(Phase),
    /// The match was not waiting on anything; the deadline was dropped.
    ClearedStale,
    /// The deadline moved or the match went away before the lock was taken.
    Raced,
}

/// Apply the default for the decision `m` is waiting on.
pub(crate) fn apply_default(
    rules: &dyn RulesEngine,
    m: &mut Match,
    now: DateTime<Utc>,
) -> Result<TimeoutOutcome, RuleViolation> {
    let phase = m.phase();
    let untouched = m.clone();
    let applied = match phase {
        Phase::ActionSelection => auto_action(rules, m, now),
        Phase::AwaitingChallengeAction | Phase::AwaitingBlock | Phase::AwaitingChallengeBlock => {
            auto_pass(rules, m, now)
        }
        Phase::AwaitingInfluenceLoss => auto_lose_influence(rules, m, now),
        Phase::AwaitingExchangeReturn => auto_exchange(rules, m, now),
        Phase::Lobby | Phase::GameOver | Phase::ResolvingChallengeAction | Phase::ResolvingChallengeBlock => {
            m.turn_deadline = None;
            return Ok(TimeoutOutcome::ClearedStale);
        }
    };
    if let Err(violation) = applied {
        // Passes applied before the failure and the AutoAction entry go too.
        *m = untouched;
        return Err(violation);
    }
    Ok(TimeoutOutcome::Applied(phase))
}

fn auto_action(rules: &dyn RulesEngine, m: &mut Match, now: DateTime<Utc>) -> Result<(), RuleViolation> {
    let actor = m.current_actor().map(|a| (a.id, a.index, a.coins));
    let Some((seat, index, coins)) = actor else {
        // The current seat is dead: move on without acting.
        let after = m.current_seat;
        m.advance_turn(after);
        if let Some(seat) = m.current_actor().map(|s| s.id) {
            m.append_log(GameEvent::TurnStart { seat }, now);
        }
        return Ok(());
    };

    let command = if coins >= rules.config().coup_threshold {
        Command::DeclareAction {
            action: ActionKind::Coup,
            target: next_alive_after(m, index),
        }
    } else {
        Command::DeclareAction {
            action: ActionKind::Income,
            target: None,
        }
    };
    rules.validate(m, seat, &command)?;
    m.append_log(
        GameEvent::AutoAction {
            phase: Phase::ActionSelection,
            seat: Some(seat),
        },
        now,
    );
    rules.apply_command(m, seat, &command, now)?;
    Ok(())
}

/// The living player seated next after turn index `index`.
fn next_alive_after(m: &Match, index: i32) -> Option<SeatId> {
    let mut alive: Vec<(i32, SeatId)> = m
        .alive_seats()
        .filter(|s| s.index != index)
        .map(|s| (s.index, s.id))
        .collect();
    alive.sort_unstable();
    alive
        .iter()
        .find(|(i, _)| *i > index)
        .or_else(|| alive.first())
        .map(|&(_, id)| id)
}

fn auto_pass(rules: &dyn RulesEngine, m: &mut Match, now: DateTime<Utc>) -> Result<(), RuleViolation> {
    let phase = m.phase();
    let window = m.decision_seq();
    m.append_log(GameEvent::AutoAction { phase, seat: None }, now);

    // Each pass can close the window, so re-read who is pending every time.
    while m.decision_seq() == window {
        let passed = m.turn().and_then(|t| t.step.passes()).cloned().unwrap_or_default();
        let Some(next) = eligible_reactors(m).into_iter().find(|&s| !passed.contains(s)) else {
            break;
        };
        rules.apply_command(m, next, &Command::Pass, now)?;
    }
    Ok(())
}

fn auto_lose_influence(rules: &dyn RulesEngine, m: &mut Match, now: DateTime<Utc>) -> Result<(), RuleViolation> {
    let Some(TurnStep::InfluenceLoss(pending)) = m.turn().map(|t| t.step.clone()) else {
        return Ok(());
    };
    let hand = m.seat(pending.seat).map(|s| s.hand().to_vec()).unwrap_or_default();
    let Some(&role) = m.rng_mut().choose(&hand) else {
        return Ok(());
    };
    m.append_log(
        GameEvent::AutoAction {
            phase: Phase::AwaitingInfluenceLoss,
            seat: Some(pending.seat),
        },
        now,
    );
    rules.apply_command(m, pending.seat, &Command::ChooseInfluenceLoss { role }, now)?;
    Ok(())
}

fn auto_exchange(rules: &dyn RulesEngine, m: &mut Match, now: DateTime<Utc>) -> Result<(), RuleViolation> {
    let Some((actor, TurnStep::ExchangeReturn(offer))) = m.turn().map(|t| (t.actor, t.step.clone())) else {
        return Ok(());
    };
    let keep = offer.pool.iter().take(offer.keep).copied().collect();
    m.append_log(
        GameEvent::AutoAction {
            phase: Phase::AwaitingExchangeReturn,
            seat: Some(actor),
        },
        now,
    );
    rules.apply_command(m, actor, &Command::ChooseExchangeCards { keep }, now)?;
    Ok(())
}
