//! Match registry.
//!
//! Every match sits behind its own [`Mutex`]. Commands and supervisor
//! interventions hold that lock for the whole read, validate, mutate sequence,
//! so two writers can never both observe the same pre-mutation state. There is
//! no global lock: the indexes are sharded maps and are never held while a
//! match lock is being acquired.

pub mod snapshot;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::core::{MatchId, SeatId};
use crate::model::Match;

/// Shared handle to one match.
pub type MatchHandle = Arc<Mutex<Match>>;

/// Lock a match. A poisoned lock is recovered; the match is still consistent
/// because rule execution never panics mid-cascade.
pub fn lock(handle: &Mutex<Match>) -> MutexGuard<'_, Match> {
    handle.lock().unwrap_or_else(PoisonError::into_inner)
}

/// All live matches plus the join-code and reconnect-token indexes.
#[derive(Debug, Default)]
pub struct MatchStore {
    matches: DashMap<MatchId, MatchHandle>,
    codes: DashMap<String, MatchId>,
    tokens: DashMap<String, (MatchId, SeatId)>,
    next_match: AtomicU64,
    next_seat: AtomicU64,
}

impl MatchStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn next_match_id(&self) -> MatchId {
        MatchId::new(self.next_match.fetch_add(1, Ordering::Relaxed) + 1)
    }

    #[must_use]
    pub fn next_seat_id(&self) -> SeatId {
        SeatId::new(self.next_seat.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Reserve a join code no other live match uses.
    #[must_use]
    pub fn claim_code(&self, id: MatchId) -> String {
        loop {
            let code = Match::generate_code();
            if let Entry::Vacant(slot) = self.codes.entry(code.clone()) {
                slot.insert(id);
                return code;
            }
        }
    }

    /// Register a match and the tokens of its seats.
    pub fn insert(&self, m: Match) -> MatchHandle {
        let id = m.id;
        self.codes.insert(m.code.clone(), id);
        for seat in m.seats() {
            self.tokens.insert(seat.token.clone(), (id, seat.id));
        }
        let handle = Arc::new(Mutex::new(m));
        self.matches.insert(id, Arc::clone(&handle));
        handle
    }

    #[must_use]
    pub fn get(&self, id: MatchId) -> Option<MatchHandle> {
        self.matches.get(&id).map(|r| Arc::clone(r.value()))
    }

    #[must_use]
    pub fn by_code(&self, code: &str) -> Option<MatchId> {
        self.codes.get(&code.to_ascii_uppercase()).map(|r| *r.value())
    }

    #[must_use]
    pub fn resolve_token(&self, token: &str) -> Option<(MatchId, SeatId)> {
        self.tokens.get(token).map(|r| *r.value())
    }

    pub fn register_token(&self, token: String, match_id: MatchId, seat: SeatId) {
        self.tokens.insert(token, (match_id, seat));
    }

    pub fn forget_token(&self, token: &str) {
        self.tokens.remove(token);
    }

    /// Drop a match and everything that points at it.
    pub fn remove(&self, id: MatchId) -> Option<MatchHandle> {
        let (_, handle) = self.matches.remove(&id)?;
        self.codes.retain(|_, m| *m != id);
        self.tokens.retain(|_, (m, _)| *m != id);
        Some(handle)
    }

    /// Ids of every live match.
    #[must_use]
    pub fn ids(&self) -> Vec<MatchId> {
        let mut ids: Vec<MatchId> = self.matches.iter().map(|r| *r.key()).collect();
        ids.sort_unstable();
        ids
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}
