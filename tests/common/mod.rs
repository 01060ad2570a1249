//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Utc};

use coup_engine::core::{ActionKind, Command, EngineConfig, GameRng, ManualClock, MatchId, Role, SeatId};
use coup_engine::error::RuleViolation;
use coup_engine::model::Match;
use coup_engine::rules::{lobby, CoupRules, RulesEngine};
use coup_engine::service::{GameService, Joined};
use coup_engine::store;
use coup_engine::InMemoryArchive;

pub fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

// ============================================================================
// Bare matches
// ============================================================================

/// A dealt match with seats `1..=players`, seat 1 hosting.
pub fn started(players: u64, seed: u64) -> (CoupRules, Match) {
    let rules = CoupRules::new(EngineConfig::default());
    let mut m = Match::new(MatchId::new(1), "TESTER".into(), rules.config(), GameRng::new(seed), epoch());
    for id in 1..=players {
        lobby::add_player(&mut m, SeatId::new(id), &format!("p{id}"), format!("t{id}"), epoch()).unwrap();
        lobby::set_ready(&mut m, SeatId::new(id), true).unwrap();
    }
    lobby::start(&mut m, SeatId::new(1), rules.config(), epoch()).unwrap();
    (rules, m)
}

pub fn actor(m: &Match) -> SeatId {
    m.current_actor().expect("someone's turn").id
}

/// Living players other than `seat`, in turn order.
pub fn others(m: &Match, seat: SeatId) -> Vec<SeatId> {
    m.alive_seats().map(|s| s.id).filter(|&s| s != seat).collect()
}

pub fn declare(
    rules: &CoupRules,
    m: &mut Match,
    seat: SeatId,
    action: ActionKind,
    target: Option<SeatId>,
) -> Result<bool, RuleViolation> {
    rules.apply_command(m, seat, &Command::DeclareAction { action, target }, epoch())
}

pub fn send(rules: &CoupRules, m: &mut Match, seat: SeatId, command: Command) -> Result<bool, RuleViolation> {
    rules.apply_command(m, seat, &command, epoch())
}

/// Give `seat` exactly `roles`, keeping every role's copy count intact.
///
/// The seat's old hand goes back to the deck first. A role missing from the
/// deck is taken from another seat, which gets a deck card in exchange.
pub fn rig_hand(m: &mut Match, seat: SeatId, roles: &[Role]) {
    let old = m.seat_mut(seat).unwrap().replace_hand(Default::default());
    m.return_to_deck(old);
    for &role in roles {
        if m.deck.remove(role).is_none() {
            let holder = m
                .players()
                .find(|s| s.id != seat && s.holds(role))
                .map(|s| s.id)
                .expect("role is somewhere");
            let replacement = m.deck.draw(1);
            let h = m.seat_mut(holder).unwrap();
            h.take_card(role);
            h.receive(replacement);
        }
        m.seat_mut(seat).unwrap().receive([role]);
    }
}

/// Move coins between the treasury and `seat` so it holds exactly `coins`.
pub fn set_coins(m: &mut Match, seat: SeatId, coins: u32) {
    let have = m.seat(seat).unwrap().coins;
    if coins > have {
        m.treasury -= coins - have;
    } else {
        m.treasury += have - coins;
    }
    m.seat_mut(seat).unwrap().coins = coins;
}

pub fn assert_invariants(m: &Match) {
    if let Some(violation) = m.invariant_violation(&EngineConfig::default()) {
        panic!("invariant broken: {violation}");
    }
}

// ============================================================================
// Service-backed tables
// ============================================================================

pub struct Table {
    pub svc: Arc<GameService>,
    pub clock: Arc<ManualClock>,
    pub archive: Arc<InMemoryArchive>,
    pub match_id: MatchId,
    pub seats: Vec<Joined>,
}

impl Table {
    /// A lobby with `players` seats, not yet started.
    pub fn lobby(players: usize, config: EngineConfig) -> Self {
        let clock = Arc::new(ManualClock::default());
        let archive = Arc::new(InMemoryArchive::new());
        let svc = GameService::new(config)
            .unwrap()
            .with_clock(clock.clone())
            .with_archive(archive.clone());
        let host = svc.create_match("p1").unwrap();
        let mut seats = vec![host.clone()];
        for i in 2..=players {
            seats.push(svc.join_match(&host.code, &format!("p{i}")).unwrap());
        }
        Self {
            svc: Arc::new(svc),
            clock,
            archive,
            match_id: host.match_id,
            seats,
        }
    }

    /// A started game with `players` seats.
    pub fn started(players: usize, seed: u64) -> Self {
        let table = Self::lobby(players, EngineConfig::default().with_seed(seed));
        for seat in &table.seats {
            table.svc.set_ready(&seat.token, true).unwrap();
        }
        table.svc.start_match(&table.seats[0].token).unwrap();
        table
    }

    pub fn token(&self, seat: SeatId) -> &str {
        &self.seats.iter().find(|j| j.seat == seat).expect("seated").token
    }

    /// Run `f` against the match under its lock.
    pub fn with_match<T>(&self, f: impl FnOnce(&mut Match) -> T) -> T {
        let handle = self.svc.store().get(self.match_id).expect("match exists");
        let mut m = store::lock(&handle);
        f(&mut m)
    }

    pub fn actor(&self) -> SeatId {
        self.with_match(|m| actor(m))
    }

    pub fn send(&self, seat: SeatId, command: Command) -> Result<(), coup_engine::EngineError> {
        self.svc
            .apply_command(self.match_id, self.token(seat), &command)
            .map(|_| ())
    }
}
