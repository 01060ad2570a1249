//! Engine configuration.
//!
//! All rule constants and supervisor timings live here. The defaults are the
//! standard game: 2-6 players, 50 coins, three copies of each role, two cards
//! and two coins dealt per player, Coup mandatory at 10 coins.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Upper bound for every timeout and supervisor period, in seconds (30 days).
pub const MAX_TIMING_SECS: u64 = 30 * 24 * 60 * 60;

/// Configuration shared by every match a service hosts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Minimum players required to start.
    pub min_seats: usize,

    /// Lobby capacity (players, not spectators).
    pub max_seats: usize,

    /// Coins dealt to each player at start.
    pub starting_coins: u32,

    /// Coins in circulation: treasury plus every seat's coins.
    pub total_coins: u32,

    /// Copies of each role in the court deck.
    pub copies_per_role: usize,

    /// Cards dealt to each player at start.
    pub hand_size: usize,

    /// Coins at which Coup becomes the only legal action.
    pub coup_threshold: u32,

    /// Entries kept in the live (broadcast) log.
    pub live_log_capacity: usize,

    /// Seconds a seat has to make an awaited decision.
    pub turn_timeout_secs: u64,

    /// Seconds without activity before the reaper closes a match.
    pub inactivity_timeout_secs: u64,

    /// Age in seconds after which a match with no seats is deleted.
    pub orphan_grace_secs: u64,

    /// Period of the supervisor's timeout sweep.
    pub sweep_interval_secs: u64,

    /// Period of the supervisor's inactivity reaper.
    pub reap_interval_secs: u64,

    /// Fixed RNG seed. `None` seeds each match from entropy.
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_seats: 2,
            max_seats: 6,
            starting_coins: 2,
            total_coins: 50,
            copies_per_role: 3,
            hand_size: 2,
            coup_threshold: 10,
            live_log_capacity: 50,
            turn_timeout_secs: 60,
            inactivity_timeout_secs: 300,
            orphan_grace_secs: 120,
            sweep_interval_secs: 10,
            reap_interval_secs: 60,
            seed: None,
        }
    }
}

impl EngineConfig {
    /// Create a config with a fixed seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Create a config with custom seat limits.
    #[must_use]
    pub fn with_seats(mut self, min: usize, max: usize) -> Self {
        self.min_seats = min;
        self.max_seats = max;
        self
    }

    /// Create a config with a custom decision timeout.
    #[must_use]
    pub fn with_turn_timeout(mut self, secs: u64) -> Self {
        self.turn_timeout_secs = secs;
        self
    }

    /// Create a config with a custom inactivity window.
    #[must_use]
    pub fn with_inactivity_timeout(mut self, secs: u64) -> Self {
        self.inactivity_timeout_secs = secs;
        self
    }

    /// Create a config with custom supervisor periods.
    #[must_use]
    pub fn with_intervals(mut self, sweep_secs: u64, reap_secs: u64) -> Self {
        self.sweep_interval_secs = sweep_secs;
        self.reap_interval_secs = reap_secs;
        self
    }

    /// Size of the court deck.
    #[must_use]
    pub fn deck_size(&self) -> usize {
        self.copies_per_role.saturating_mul(super::Role::ALL.len())
    }

    #[must_use]
    pub fn turn_timeout(&self) -> chrono::Duration {
        secs(self.turn_timeout_secs)
    }

    #[must_use]
    pub fn inactivity_timeout(&self) -> chrono::Duration {
        secs(self.inactivity_timeout_secs)
    }

    #[must_use]
    pub fn orphan_grace(&self) -> chrono::Duration {
        secs(self.orphan_grace_secs)
    }

    /// Check that a full table can be dealt and paid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_seats < 2 {
            return Err(invalid("min_seats", self.min_seats, "at least 2"));
        }
        if self.max_seats < self.min_seats {
            return Err(invalid("max_seats", self.max_seats, "at least min_seats"));
        }
        if self.hand_size == 0 {
            return Err(invalid("hand_size", self.hand_size, "at least 1"));
        }
        // Exchange draws two cards on top of every dealt hand.
        let needed = self
            .max_seats
            .checked_mul(self.hand_size)
            .and_then(|dealt| dealt.checked_add(2));
        let deck = self.copies_per_role.checked_mul(super::Role::ALL.len());
        match (needed, deck) {
            (Some(needed), Some(deck)) if needed <= deck => {}
            (None, _) => return Err(invalid("max_seats", self.max_seats, "a table whose hands fit in memory")),
            _ => {
                return Err(invalid(
                    "copies_per_role",
                    self.copies_per_role,
                    "enough cards to deal every seat and draw two",
                ))
            }
        }
        let dealt_coins = u64::try_from(self.max_seats)
            .ok()
            .and_then(|seats| seats.checked_mul(u64::from(self.starting_coins)));
        if dealt_coins.map_or(true, |dealt| dealt > u64::from(self.total_coins)) {
            return Err(invalid(
                "total_coins",
                self.total_coins,
                "enough coins to pay every seat",
            ));
        }
        if self.coup_threshold < super::ActionKind::Coup.cost() {
            return Err(invalid("coup_threshold", self.coup_threshold, "at least the coup cost"));
        }
        if self.live_log_capacity == 0 {
            return Err(invalid("live_log_capacity", self.live_log_capacity, "at least 1"));
        }
        for (field, value) in [
            ("turn_timeout_secs", self.turn_timeout_secs),
            ("sweep_interval_secs", self.sweep_interval_secs),
            ("reap_interval_secs", self.reap_interval_secs),
        ] {
            if value == 0 {
                return Err(invalid(field, value, "a non-zero period"));
            }
        }
        for (field, value) in [
            ("turn_timeout_secs", self.turn_timeout_secs),
            ("inactivity_timeout_secs", self.inactivity_timeout_secs),
            ("orphan_grace_secs", self.orphan_grace_secs),
            ("sweep_interval_secs", self.sweep_interval_secs),
            ("reap_interval_secs", self.reap_interval_secs),
        ] {
            checked_secs(value).ok_or_else(|| invalid(field, value, "at most 30 days"))?;
        }
        Ok(())
    }
}

fn checked_secs(s: u64) -> Option<chrono::Duration> {
    if s > MAX_TIMING_SECS {
        return None;
    }
    chrono::Duration::try_seconds(i64::try_from(s).ok()?)
}

/// Accessors on an unvalidated config clamp instead of panicking.
fn secs(s: u64) -> chrono::Duration {
    checked_secs(s.min(MAX_TIMING_SECS)).unwrap_or_else(chrono::Duration::zero)
}

fn invalid(field: &'static str, value: impl ToString, expected: &'static str) -> ConfigError {
    ConfigError::InvalidValue {
        field,
        value: value.to_string(),
        expected,
    }
}
