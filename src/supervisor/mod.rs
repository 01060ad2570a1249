//! Timeout and inactivity supervisor.
//!
//! [`Supervisor::sweep_timeouts`] resolves every decision whose deadline has
//! passed; [`Supervisor::reap_inactive`] closes or deletes idle matches.
//! [`Supervisor::run`] drives both on tokio intervals.
//!
//! ## Races
//!
//! The sweep first collects expired matches, then handles each under its own
//! lock and re-checks the deadline there: a player may have acted in between.
//! A match that no longer needs handling is counted as raced, never as an
//! error. A failure on one match is logged and the sweep moves on.

mod reaper;
mod timeouts;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::MatchId;
use crate::error::RuleViolation;
use crate::service::{Before, GameService};
use crate::store;

pub use reaper::{reap_action, ReapAction};
pub use timeouts::TimeoutOutcome;

/// Totals from one timeout sweep.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Defaults applied or stale deadlines cleared.
    pub handled: usize,
    /// Matches that no longer needed handling once locked.
    pub raced: usize,
    pub failed: usize,
}

/// Totals from one reaper pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReapReport {
    pub deleted: usize,
    pub closed: usize,
}

/// Periodic enforcement of turn deadlines and inactivity.
#[derive(Debug)]
pub struct Supervisor {
    service: Arc<GameService>,
}

impl Supervisor {
    #[must_use]
    pub fn new(service: Arc<GameService>) -> Self {
        Self { service }
    }

    #[must_use]
    pub fn service(&self) -> &GameService {
        &self.service
    }

    // ========================================================================
    // Timeouts
    // ========================================================================

    /// Apply the default resolution to every match whose deadline is at or
    /// before `now`.
    pub fn sweep_timeouts(&self, now: DateTime<Utc>) -> SweepReport {
        let mut report = SweepReport::default();
        for id in self.expired(now) {
            match self.handle_timeout(id, now) {
                Ok(TimeoutOutcome::Raced) => report.raced += 1,
                Ok(TimeoutOutcome::Applied(_) | TimeoutOutcome::ClearedStale) => report.handled += 1,
                Err(violation) => {
                    warn!(match_id = %id, %violation, "timeout default rejected");
                    report.failed += 1;
                }
            }
        }
        if report != SweepReport::default() {
            debug!(?report, "timeout sweep");
        }
        report
    }

    fn expired(&self, now: DateTime<Utc>) -> Vec<MatchId> {
        let registry = self.service.store();
        registry
            .ids()
            .into_iter()
            .filter(|&id| {
                registry
                    .get(id)
                    .is_some_and(|h| store::lock(&h).turn_deadline.is_some_and(|d| d <= now))
            })
            .collect()
    }

    /// Handle one expired match under its lock.
    ///
    /// On error the match is still wrapped up and published, with a fresh
    /// deadline, so a failing default is retried one timeout later.
    pub fn handle_timeout(&self, id: MatchId, now: DateTime<Utc>) -> Result<TimeoutOutcome, RuleViolation> {
        let Some(handle) = self.service.store().get(id) else {
            return Ok(TimeoutOutcome::Raced);
        };
        let (result, effects) = {
            let mut m = store::lock(&handle);
            if m.closed || !m.turn_deadline.is_some_and(|d| d <= now) {
                return Ok(TimeoutOutcome::Raced);
            }
            let before = Before::of(&m);
            let phase = m.phase();
            let result = timeouts::apply_default(self.service.rules(), &mut m, now);
            match &result {
                Ok(outcome) => debug!(match_id = %id, %phase, ?outcome, "timeout handled"),
                Err(_) => m.turn_deadline = None,
            }
            (result, self.service.wrap_up(&mut m, before, now, false))
        };
        self.service.publish(effects);
        result
    }

    // ========================================================================
    // Inactivity
    // ========================================================================

    /// Close or delete every match idle at `now`.
    pub fn reap_inactive(&self, now: DateTime<Utc>) -> ReapReport {
        let mut report = ReapReport::default();
        let config = self.service.config();
        let registry = self.service.store();

        for id in registry.ids() {
            let Some(handle) = registry.get(id) else { continue };
            let mut m = store::lock(&handle);
            if m.closed {
                continue;
            }
            match reap_action(&m, config, now) {
                ReapAction::Keep => {}
                ReapAction::Delete => {
                    m.closed = true;
                    let code = m.code.clone();
                    drop(m);
                    registry.remove(id);
                    info!(match_id = %id, %code, "match deleted for inactivity");
                    report.deleted += 1;
                }
                ReapAction::ForceClose => {
                    let before = Before::of(&m);
                    reaper::force_close(&mut m, now);
                    let effects = self.service.wrap_up(&mut m, before, now, false);
                    drop(m);
                    self.service.publish(effects);
                    info!(match_id = %id, "match closed for inactivity");
                    report.closed += 1;
                }
            }
        }
        report
    }

    // ========================================================================
    // Runner
    // ========================================================================

    /// Run the sweep and the reaper on their configured intervals until
    /// `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        let config = self.service.config();
        let mut sweep = tokio::time::interval(std::time::Duration::from_secs(config.sweep_interval_secs));
        let mut reap = tokio::time::interval(std::time::Duration::from_secs(config.reap_interval_secs));
        sweep.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        reap.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        info!(
            sweep_secs = config.sweep_interval_secs,
            reap_secs = config.reap_interval_secs,
            "supervisor started"
        );

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    info!("supervisor cancelled");
                    break;
                }
                _ = sweep.tick() => {
                    self.sweep_timeouts(self.service.now());
                }
                _ = reap.tick() => {
                    let report = self.reap_inactive(self.service.now());
                    if report != ReapReport::default() {
                        info!(?report, "reaper pass");
                    }
                }
            }
        }
    }
}
