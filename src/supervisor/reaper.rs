//! Inactivity reaping.
//!
//! - a lobby idle past the inactivity window is deleted
//! - a match with no seats left is deleted once past the orphan grace period
//! - a round idle past the inactivity window is force-closed: every hidden
//!   card is revealed and the match ends with no winner (nothing is archived)
//! - a finished match idle past the inactivity window is deleted

use chrono::{DateTime, Utc};

use crate::core::EngineConfig;
use crate::model::{GameEvent, Match};
use crate::rules::return_exchange_draw;
use crate::turn::Stage;

/// What the reaper decided for one match.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReapAction {
    Keep,
    Delete,
    ForceClose,
}

/// Decide what to do with `m` at `now`.
#[must_use]
pub fn reap_action(m: &Match, config: &EngineConfig, now: DateTime<Utc>) -> ReapAction {
    let idle = now - m.last_activity;
    let inactive = idle >= config.inactivity_timeout();

    if m.seats().is_empty() && !m.is_over() && idle >= config.orphan_grace() {
        return ReapAction::Delete;
    }
    if !inactive {
        return ReapAction::Keep;
    }
    if m.phase().is_in_progress() {
        ReapAction::ForceClose
    } else {
        ReapAction::Delete
    }
}

/// End a round for inactivity.
pub(crate) fn force_close(m: &mut Match, now: DateTime<Utc>) {
    if let Some(actor) = m.turn().map(|t| t.actor) {
        return_exchange_draw(m, actor);
    }
    for seat in m.seats_mut().iter_mut().filter(|s| s.is_alive()) {
        seat.reveal_all();
    }
    m.winner = None;
    m.set_stage(Stage::GameOver);
    m.append_log(GameEvent::MatchClosedInactivity, now);
}
