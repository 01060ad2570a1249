//! Archival of finished rounds.
//!
//! Results are insert-only and keyed by `(match id, round start)`, so a match
//! that is rematched archives each round separately and a round is never
//! recorded twice.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::core::MatchId;
use crate::error::ArchiveError;
use crate::model::GameResult;

/// Archive key: a match and the start of one of its rounds.
pub type RoundKey = (MatchId, DateTime<Utc>);

/// Insert-only store for round results.
pub trait ResultArchive: Send + Sync {
    /// Record every seat's result for one round.
    ///
    /// Returns [`ArchiveError::AlreadyRecorded`] if the round is already
    /// stored. Callers treat that as success.
    fn record(&self, key: RoundKey, results: Vec<GameResult>) -> Result<(), ArchiveError>;
}

/// Archive held in memory.
#[derive(Clone, Debug, Default)]
pub struct InMemoryArchive {
    rounds: Arc<DashMap<RoundKey, Vec<GameResult>>>,
}

impl InMemoryArchive {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, key: &RoundKey) -> Option<Vec<GameResult>> {
        self.rounds.get(key).map(|r| r.value().clone())
    }

    /// Every archived round of a match, oldest first.
    #[must_use]
    pub fn rounds_for(&self, match_id: MatchId) -> Vec<Vec<GameResult>> {
        let mut rounds: Vec<(DateTime<Utc>, Vec<GameResult>)> = self
            .rounds
            .iter()
            .filter(|r| r.key().0 == match_id)
            .map(|r| (r.key().1, r.value().clone()))
            .collect();
        rounds.sort_by_key(|(at, _)| *at);
        rounds.into_iter().map(|(_, r)| r).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rounds.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }
}

impl ResultArchive for InMemoryArchive {
    fn record(&self, key: RoundKey, results: Vec<GameResult>) -> Result<(), ArchiveError> {
        match self.rounds.entry(key) {
            Entry::Occupied(_) => Err(ArchiveError::AlreadyRecorded { match_id: key.0 }),
            Entry::Vacant(slot) => {
                slot.insert(results);
                Ok(())
            }
        }
    }
}
