//! A seat leaving a match in progress.
//!
//! The leaver reveals every hidden card, is exiled, and is logged as
//! eliminated. What happens next depends on what the turn was waiting for:
//!
//! | leaver is...                          | continuation                      |
//! |---------------------------------------|-----------------------------------|
//! | the seat choosing an influence to lose| continue as if the loss resolved  |
//! | the actor (any step, exchange too)    | end the turn                      |
//! | the blocker, while its block is open  | end the turn                      |
//! | a reactor in an open window           | counts as passed                  |
//! | the current seat, before declaring    | advance the turn                  |
//! | none of the above                     | nothing                           |
//!
//! A spectator leaving is simply removed.

use tracing::info;

use crate::core::SeatId;
use crate::error::RuleViolation;
use crate::model::{GameEvent, Match};
use crate::turn::{Phase, Stage, TurnStep};

use super::cascade::{self, Transition};
use super::Cx;

pub(crate) fn validate(m: &Match, seat: SeatId) -> Result<(), RuleViolation> {
    let s = m.seat(seat).ok_or(RuleViolation::NotSeated(seat))?;
    if s.spectator {
        return Ok(());
    }
    match m.phase() {
        Phase::Lobby => Err(RuleViolation::NotStarted),
        Phase::GameOver => Err(RuleViolation::MatchOver),
        _ if !s.is_alive() => Err(RuleViolation::SeatEliminated(seat)),
        _ => Ok(()),
    }
}

pub(crate) fn execute(m: &mut Match, seat: SeatId, cx: &Cx<'_>) {
    if m.seat(seat).is_some_and(|s| s.spectator) {
        m.remove_seat(seat);
        return;
    }

    return_exchange_draw(m, seat);
    let revealed = m.seat_mut(seat).map(|s| s.reveal_all()).unwrap_or_default();
    m.exile(seat);
    m.append_log(
        GameEvent::PlayerAbandoned {
            seat,
            revealed,
        },
        cx.now,
    );
    m.append_log(GameEvent::SeatEliminated { seat }, cx.now);
    info!(match_id = %m.id, %seat, phase = %m.phase(), "seat abandoned");

    let next = continuation(m, seat);
    cascade::settle(m, next, cx);
}

/// Put the cards `seat` drew for an open exchange back in the deck, leaving
/// the hand it held before the exchange. No-op unless `seat` is exchanging.
pub(crate) fn return_exchange_draw(m: &mut Match, seat: SeatId) {
    let drawn = match m.turn().map(|t| (t.actor, &t.step)) {
        Some((actor, TurnStep::ExchangeReturn(offer))) if actor == seat => offer.drawn().to_vec(),
        _ => return,
    };
    if drawn.is_empty() {
        return;
    }
    if let Some(s) = m.seat_mut(seat) {
        for card in &drawn {
            s.take_card(*card);
        }
    }
    m.return_to_deck(drawn);
}

fn continuation(m: &mut Match, seat: SeatId) -> Option<Transition> {
    let in_window = match m.stage() {
        Stage::ActionSelection => {
            return (m.current_seat().map(|s| s.id) == Some(seat)).then_some(Transition::EndTurn);
        }
        Stage::Turn(turn) => match &turn.step {
            TurnStep::InfluenceLoss(pending) if pending.seat == seat => {
                return Some(Transition::AfterInfluenceLoss(pending.reason));
            }
            _ if turn.actor == seat => return Some(Transition::EndTurn),
            TurnStep::BlockChallengeWindow(_) | TurnStep::ResolvingBlockChallenge
                if turn.blocker() == Some(seat) =>
            {
                return Some(Transition::EndTurn);
            }
            step => step.passes().is_some(),
        },
        Stage::Lobby | Stage::GameOver => false,
    };
    if !in_window {
        return None;
    }
    if let Some(passes) = m.turn_mut().and_then(|t| t.step.passes_mut()) {
        passes.insert(seat);
    }
    cascade::window_complete(m).then_some(Transition::CloseWindow)
}
