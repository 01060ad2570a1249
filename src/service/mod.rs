//! The service boundary.
//!
//! [`GameService`] is what a transport layer talks to. Every call that touches
//! a match follows the same shape:
//!
//! 1. resolve the match (and the caller's seat, from its reconnect token)
//! 2. lock the match and run the whole read, validate, mutate cascade
//! 3. stamp activity and the turn deadline, capture the new views
//! 4. release the lock
//! 5. archive a finished round and deliver notifications
//!
//! Steps 4 and 5 are ordered so that a slow or failing collaborator can never
//! hold a match lock or undo a transition.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::archive::{InMemoryArchive, ResultArchive, RoundKey};
use crate::core::{Clock, Command, EngineConfig, GameRng, MatchId, SeatId, SystemClock};
use crate::error::{ArchiveError, ConfigError, EngineError, NotFound, RuleViolation};
use crate::model::{compute_results, GameResult, Match};
use crate::notify::{Notifier, NullNotifier, Outbox, PrivateState, PublicState};
use crate::rules::{lobby, CoupRules, Outcome, RulesEngine};
use crate::store::{self, MatchStore};

/// Credentials handed to a seat when it joins.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Joined {
    pub match_id: MatchId,
    pub code: String,
    pub seat: SeatId,
    /// Reconnect secret for the seat.
    pub token: String,
    pub spectator: bool,
}

/// State captured before a mutation, compared against after it.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Before {
    decision_seq: u64,
    over: bool,
}

impl Before {
    pub(crate) fn of(m: &Match) -> Self {
        Self {
            decision_seq: m.decision_seq(),
            over: m.is_over(),
        }
    }
}

/// Work left to do once the match lock is released.
#[derive(Debug)]
pub(crate) struct Effects {
    outbox: Outbox,
    round: Option<(RoundKey, Vec<GameResult>)>,
}

impl Effects {
    pub(crate) fn public(&self) -> &PublicState {
        self.outbox.public()
    }
}

/// Hosts matches and applies commands to them.
pub struct GameService {
    rules: CoupRules,
    store: Arc<MatchStore>,
    notifier: Arc<dyn Notifier>,
    archive: Arc<dyn ResultArchive>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for GameService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameService")
            .field("config", self.rules.config())
            .field("matches", &self.store.len())
            .finish_non_exhaustive()
    }
}

impl GameService {
    /// A service with no notifier, an in-memory archive and the wall clock.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            rules: CoupRules::new(config),
            store: Arc::new(MatchStore::new()),
            notifier: Arc::new(NullNotifier),
            archive: Arc::new(InMemoryArchive::new()),
            clock: Arc::new(SystemClock),
        })
    }

    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    #[must_use]
    pub fn with_archive(mut self, archive: Arc<dyn ResultArchive>) -> Self {
        self.archive = archive;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        self.rules.config()
    }

    #[must_use]
    pub fn rules(&self) -> &CoupRules {
        &self.rules
    }

    #[must_use]
    pub fn store(&self) -> &MatchStore {
        &self.store
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // ========================================================================
    // Lobby
    // ========================================================================

    /// Open a new lobby with `host_name` as its host.
    pub fn create_match(&self, host_name: &str) -> Result<Joined, EngineError> {
        if host_name.trim().is_empty() {
            return Err(RuleViolation::EmptyName.into());
        }
        let now = self.clock.now();
        let id = self.store.next_match_id();
        let rng = self
            .config()
            .seed
            .map_or_else(GameRng::from_entropy, |seed| GameRng::new(seed.wrapping_add(id.raw())));
        let code = self.store.claim_code(id);
        let mut m = Match::new(id, code.clone(), self.config(), rng, now);

        let seat = self.store.next_seat_id();
        let token = new_token();
        lobby::add_player(&mut m, seat, host_name, token.clone(), now)?;

        let outbox = Outbox::collect(&m);
        self.store.insert(m);
        debug!(match_id = %id, %code, "match created");
        outbox.deliver(self.notifier.as_ref());

        Ok(Joined {
            match_id: id,
            code,
            seat,
            token,
            spectator: false,
        })
    }

    /// Join by code: as a player while in the lobby, as a spectator while a
    /// round is being played.
    pub fn join_match(&self, code: &str, name: &str) -> Result<Joined, EngineError> {
        let match_id = self
            .store
            .by_code(code)
            .ok_or_else(|| NotFound::Code(code.to_string()))?;
        let seat = self.store.next_seat_id();
        let token = new_token();

        let (joined, _) = self.transact(match_id, true, |m, now| {
            let spectator = m.phase().is_in_progress();
            if spectator {
                lobby::add_spectator(m, seat, name, token.clone(), now)?;
            } else {
                lobby::add_player(m, seat, name, token.clone(), now)?;
            }
            Ok(Joined {
                match_id,
                code: m.code.clone(),
                seat,
                token: token.clone(),
                spectator,
            })
        })?;
        self.store.register_token(token, match_id, seat);
        Ok(joined)
    }

    /// Current views for a returning seat.
    pub fn reconnect(&self, token: &str) -> Result<(PublicState, PrivateState), EngineError> {
        let (match_id, seat) = self.resolve(token)?;
        let handle = self.store.get(match_id).ok_or(NotFound::Match(match_id))?;
        let m = store::lock(&handle);
        let private = PrivateState::of(&m, seat).ok_or(NotFound::Seat(seat))?;
        Ok((PublicState::of(&m), private))
    }

    pub fn set_ready(&self, token: &str, ready: bool) -> Result<PublicState, EngineError> {
        let (match_id, seat) = self.resolve(token)?;
        self.transact(match_id, true, |m, now| {
            lobby::set_ready(m, seat, ready)?;
            stamp(m, seat, now);
            Ok(())
        })
        .map(|(_, public)| public)
    }

    /// Start a round. Host only.
    pub fn start_match(&self, token: &str) -> Result<PublicState, EngineError> {
        let (match_id, seat) = self.resolve(token)?;
        let config = self.config();
        self.transact(match_id, true, |m, now| {
            lobby::start(m, seat, config, now)?;
            stamp(m, seat, now);
            Ok(())
        })
        .map(|(_, public)| public)
    }

    /// Send a finished match back to the lobby for another round.
    pub fn rematch(&self, token: &str) -> Result<PublicState, EngineError> {
        let (match_id, seat) = self.resolve(token)?;
        self.transact(match_id, true, |m, now| {
            if m.seat(seat).is_none() {
                return Err(NotFound::Seat(seat).into());
            }
            lobby::rematch(m)?;
            stamp(m, seat, now);
            Ok(())
        })
        .map(|(_, public)| public)
    }

    // ========================================================================
    // Play
    // ========================================================================

    /// Apply a player command and return the new public state.
    pub fn apply_command(
        &self,
        match_id: MatchId,
        token: &str,
        command: &Command,
    ) -> Result<PublicState, EngineError> {
        let (owner, seat) = self.resolve(token)?;
        if owner != match_id {
            return Err(NotFound::Token.into());
        }
        self.transact(match_id, true, |m, now| {
            if m.seat(seat).is_none() {
                return Err(NotFound::Seat(seat).into());
            }
            self.rules.apply_command(m, seat, command, now)?;
            stamp(m, seat, now);
            Ok(())
        })
        .map(|(_, public)| public)
    }

    /// Commands the seat holding `token` may issue right now.
    pub fn legal_commands(&self, token: &str) -> Result<Vec<Command>, EngineError> {
        let (match_id, seat) = self.resolve(token)?;
        let handle = self.store.get(match_id).ok_or(NotFound::Match(match_id))?;
        let m = store::lock(&handle);
        Ok(self.rules.legal_commands(&m, seat))
    }

    pub fn public_state(&self, match_id: MatchId) -> Result<PublicState, EngineError> {
        let handle = self.store.get(match_id).ok_or(NotFound::Match(match_id))?;
        let m = store::lock(&handle);
        Ok(PublicState::of(&m))
    }

    pub fn private_state(&self, token: &str) -> Result<PrivateState, EngineError> {
        self.reconnect(token).map(|(_, private)| private)
    }

    // ========================================================================
    // Plumbing
    // ========================================================================

    fn resolve(&self, token: &str) -> Result<(MatchId, SeatId), EngineError> {
        self.store.resolve_token(token).ok_or_else(|| NotFound::Token.into())
    }

    /// Lock a match, run `f`, wrap up, unlock, publish.
    ///
    /// `f` must not mutate the match when it returns an error.
    fn transact<T>(
        &self,
        match_id: MatchId,
        touch: bool,
        f: impl FnOnce(&mut Match, DateTime<Utc>) -> Result<T, EngineError>,
    ) -> Result<(T, PublicState), EngineError> {
        let handle = self.store.get(match_id).ok_or(NotFound::Match(match_id))?;
        let (value, effects) = {
            let mut m = store::lock(&handle);
            if m.closed {
                return Err(NotFound::Match(match_id).into());
            }
            let now = self.clock.now();
            let before = Before::of(&m);
            let value = f(&mut m, now)?;
            (value, self.wrap_up(&mut m, before, now, touch))
        };
        let public = effects.public().clone();
        self.publish(effects);
        Ok((value, public))
    }

    /// Bookkeeping after a mutation, still under the lock: activity, turn
    /// deadline, views, and the finished round's results.
    pub(crate) fn wrap_up(&self, m: &mut Match, before: Before, now: DateTime<Utc>, touch: bool) -> Effects {
        if touch {
            m.last_activity = now;
        }
        if !m.phase().is_in_progress() {
            m.turn_deadline = None;
        } else if m.decision_seq() != before.decision_seq || m.turn_deadline.is_none() {
            m.turn_deadline = Some(now + self.config().turn_timeout());
        }

        let round = match self.rules.is_terminal(m) {
            Some(Outcome::Winner(_)) if !before.over => {
                let started_at = m.started_at.unwrap_or(m.created_at);
                Some(((m.id, started_at), compute_results(m)))
            }
            _ => None,
        };
        Effects {
            outbox: Outbox::collect(m),
            round,
        }
    }

    /// Archive and notify. Never fails.
    pub(crate) fn publish(&self, effects: Effects) {
        if let Some((key, results)) = effects.round {
            match self.archive.record(key, results) {
                Ok(()) => debug!(match_id = %key.0, "round archived"),
                Err(ArchiveError::AlreadyRecorded { match_id }) => {
                    debug!(%match_id, "round already archived");
                }
                Err(e) => error!(match_id = %key.0, error = %e, "failed to archive round"),
            }
        }
        effects.outbox.deliver(self.notifier.as_ref());
    }
}

/// Stamp a seat's activity, if it is still seated.
fn stamp(m: &mut Match, seat: SeatId, now: DateTime<Utc>) {
    if let Some(s) = m.seat_mut(seat) {
        s.last_activity = now;
    }
}

fn new_token() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    use crate::core::{ActionKind, ManualClock};
    use crate::turn::Phase;

    fn service() -> (GameService, Arc<ManualClock>, Arc<InMemoryArchive>) {
        let clock = Arc::new(ManualClock::default());
        let archive = Arc::new(InMemoryArchive::new());
        let svc = GameService::new(EngineConfig::default().with_seed(11))
            .unwrap()
            .with_clock(clock.clone())
            .with_archive(archive.clone());
        (svc, clock, archive)
    }

    fn two_player_game(svc: &GameService) -> (Joined, Joined) {
        let host = svc.create_match("host").unwrap();
        let guest = svc.join_match(&host.code, "guest").unwrap();
        svc.set_ready(&host.token, true).unwrap();
        svc.set_ready(&guest.token, true).unwrap();
        svc.start_match(&host.token).unwrap();
        (host, guest)
    }

    #[test]
    fn test_unbounded_turn_timeout_is_rejected() {
        let config = EngineConfig::default().with_turn_timeout(u64::MAX);
        assert!(matches!(
            GameService::new(config),
            Err(ConfigError::InvalidValue { field: "turn_timeout_secs", .. })
        ));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = EngineConfig::default().with_seats(1, 6);
        assert!(GameService::new(config).is_err());
    }

    #[test]
    fn test_create_and_join() {
        let (svc, _, _) = service();
        let host = svc.create_match("host").unwrap();
        let guest = svc.join_match(&host.code.to_ascii_lowercase(), "guest").unwrap();

        assert_eq!(host.match_id, guest.match_id);
        assert!(!guest.spectator);
        assert_ne!(host.token, guest.token);

        let state = svc.public_state(host.match_id).unwrap();
        assert_eq!(state.phase, Phase::Lobby);
        assert_eq!(state.seats.len(), 2);
        assert!(state.seats[0].host);
    }

    #[test]
    fn test_unknown_code_and_token() {
        let (svc, _, _) = service();
        assert_eq!(
            svc.join_match("NOPE00", "x").unwrap_err(),
            EngineError::NotFound(NotFound::Code("NOPE00".into()))
        );
        assert_eq!(svc.reconnect("bogus").unwrap_err(), EngineError::NotFound(NotFound::Token));
    }

    #[test]
    fn test_join_during_play_is_spectator() {
        let (svc, _, _) = service();
        let (host, _) = two_player_game(&svc);
        let watcher = svc.join_match(&host.code, "watcher").unwrap();
        assert!(watcher.spectator);

        let (_, private) = svc.reconnect(&watcher.token).unwrap();
        assert!(private.seat.spectator);
        assert!(private.seat.index < 0);
        assert!(private.hand.is_empty());
    }

    #[test]
    fn test_deadline_follows_decisions() {
        let (svc, clock, _) = service();
        let (host, guest) = two_player_game(&svc);
        let state = svc.public_state(host.match_id).unwrap();
        assert_eq!(state.turn_deadline, Some(DateTime::<Utc>::UNIX_EPOCH + Duration::seconds(60)));

        clock.advance(Duration::seconds(5));
        let actor = state.current_seat.unwrap();
        let token = if actor == host.seat { &host.token } else { &guest.token };
        let state = svc
            .apply_command(
                host.match_id,
                token,
                &Command::DeclareAction {
                    action: ActionKind::Income,
                    target: None,
                },
            )
            .unwrap();
        assert_eq!(state.turn_deadline, Some(DateTime::<Utc>::UNIX_EPOCH + Duration::seconds(65)));
        assert_ne!(state.current_seat, Some(actor));
    }

    #[test]
    fn test_token_must_belong_to_match() {
        let (svc, _, _) = service();
        let (first, _) = two_player_game(&svc);
        let other = svc.create_match("other").unwrap();

        let err = svc.apply_command(first.match_id, &other.token, &Command::Pass).unwrap_err();
        assert_eq!(err, EngineError::NotFound(NotFound::Token));
    }

    #[test]
    fn test_finished_round_is_archived_once() {
        let (svc, _, archive) = service();
        let (host, guest) = two_player_game(&svc);
        svc.apply_command(host.match_id, &guest.token, &Command::Abandon).unwrap();

        let state = svc.public_state(host.match_id).unwrap();
        assert_eq!(state.phase, Phase::GameOver);
        assert_eq!(state.winner, Some(host.seat));
        assert_eq!(state.turn_deadline, None);
        assert_eq!(archive.len(), 1);

        let rounds = archive.rounds_for(host.match_id);
        let winner = rounds[0].iter().find(|r| r.winner).unwrap();
        assert_eq!(winner.seat, host.seat);
        assert_eq!(winner.placement, 1);
        assert!(winner.full_log.is_some());
    }

    #[test]
    fn test_rematch_starts_a_new_archive_round() {
        let (svc, clock, archive) = service();
        let (host, guest) = two_player_game(&svc);
        svc.apply_command(host.match_id, &guest.token, &Command::Abandon).unwrap();

        clock.advance(Duration::minutes(1));
        let state = svc.rematch(&guest.token).unwrap();
        assert_eq!(state.phase, Phase::Lobby);
        assert!(state.seats.iter().all(|s| !s.ready && s.coins == 0));

        svc.set_ready(&host.token, true).unwrap();
        svc.set_ready(&guest.token, true).unwrap();
        svc.start_match(&host.token).unwrap();
        svc.apply_command(host.match_id, &host.token, &Command::Abandon).unwrap();

        assert_eq!(archive.rounds_for(host.match_id).len(), 2);
    }
}
