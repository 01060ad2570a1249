//! Lobby: seating, readiness, starting a round and rematches.

use chrono::{DateTime, Utc};
use tracing::info;

use crate::core::{EngineConfig, SeatId};
use crate::error::RuleViolation;
use crate::model::{Deck, GameEvent, Match, Seat};
use crate::turn::{Phase, Stage};

/// Seat a new player in the lobby. The first player seated is the host.
pub fn add_player(
    m: &mut Match,
    id: SeatId,
    name: &str,
    token: String,
    now: DateTime<Utc>,
) -> Result<SeatId, RuleViolation> {
    match m.phase() {
        Phase::Lobby => {}
        Phase::GameOver => return Err(RuleViolation::MatchOver),
        _ => return Err(RuleViolation::AlreadyStarted),
    }
    if name.trim().is_empty() {
        return Err(RuleViolation::EmptyName);
    }
    let players = m.player_count();
    if players >= m.max_seats {
        return Err(RuleViolation::LobbyFull(m.max_seats));
    }
    let index = i32::try_from(players).unwrap_or(i32::MAX);
    let mut seat = Seat::player(id, m.id, name.trim(), token, index, now);
    seat.host = players == 0;
    m.add_seat(seat);
    Ok(id)
}

/// Seat a spectator in a match that is being played.
pub fn add_spectator(
    m: &mut Match,
    id: SeatId,
    name: &str,
    token: String,
    now: DateTime<Utc>,
) -> Result<SeatId, RuleViolation> {
    match m.phase() {
        Phase::GameOver => return Err(RuleViolation::MatchOver),
        Phase::Lobby => return Err(RuleViolation::NotStarted),
        _ => {}
    }
    if name.trim().is_empty() {
        return Err(RuleViolation::EmptyName);
    }
    let index = m.next_spectator_index();
    m.add_seat(Seat::spectator(id, m.id, name.trim(), token, index, now));
    Ok(id)
}

pub fn set_ready(m: &mut Match, seat: SeatId, ready: bool) -> Result<(), RuleViolation> {
    if m.phase() != Phase::Lobby {
        return Err(RuleViolation::AlreadyStarted);
    }
    let s = m.seat_mut(seat).ok_or(RuleViolation::NotSeated(seat))?;
    s.ready = ready;
    Ok(())
}

/// Start a round: shuffle turn order, build the deck, deal.
pub fn start(m: &mut Match, host: SeatId, config: &EngineConfig, now: DateTime<Utc>) -> Result<(), RuleViolation> {
    if m.phase() != Phase::Lobby {
        return Err(RuleViolation::AlreadyStarted);
    }
    let s = m.seat(host).ok_or(RuleViolation::NotSeated(host))?;
    if !s.host {
        return Err(RuleViolation::NotHost);
    }
    let have = m.player_count();
    if have < m.min_seats {
        return Err(RuleViolation::NotEnoughPlayers {
            min: m.min_seats,
            have,
        });
    }
    if m.players().any(|p| !p.ready) {
        return Err(RuleViolation::PlayersNotReady);
    }

    let mut order: Vec<i32> = (0..i32::try_from(have).unwrap_or(i32::MAX)).collect();
    m.rng_mut().shuffle(&mut order);
    let mut deck = Deck::standard(config.copies_per_role, m.rng_mut());

    let mut next = order.into_iter();
    for seat in m.seats_mut().iter_mut().filter(|s| !s.spectator) {
        seat.index = next.next().unwrap_or(seat.index);
        seat.deal(deck.draw(config.hand_size), config.starting_coins);
    }
    m.sort_seats();

    let dealt = config.starting_coins * u32::try_from(have).unwrap_or(u32::MAX);
    m.treasury = config.total_coins.saturating_sub(dealt);
    m.deck = deck;
    m.current_seat = 0;
    m.turn_number = 1;
    m.winner = None;
    m.log.clear();
    m.started_at = Some(now);
    m.set_stage(Stage::ActionSelection);

    let turn_order = m.players().map(|s| s.id).collect();
    m.append_log(GameEvent::GameStarted { turn_order }, now);
    if let Some(first) = m.current_actor().map(|s| s.id) {
        m.append_log(GameEvent::TurnStart { seat: first }, now);
    }
    info!(match_id = %m.id, players = have, "match started");
    Ok(())
}

/// Return a finished match to the lobby. Spectators become players.
pub fn rematch(m: &mut Match) -> Result<(), RuleViolation> {
    if m.phase() != Phase::GameOver {
        return Err(RuleViolation::WrongPhase {
            command: "rematch",
            phase: m.phase(),
        });
    }
    m.sort_seats();
    for (i, seat) in m.seats_mut().iter_mut().enumerate() {
        seat.reset_for_lobby(i32::try_from(i).unwrap_or(i32::MAX));
    }
    m.sort_seats();

    m.deck = Deck::empty();
    m.treasury = 0;
    m.current_seat = 0;
    m.turn_number = 0;
    m.winner = None;
    m.log.clear();
    m.started_at = None;
    m.turn_deadline = None;
    m.set_stage(Stage::Lobby);
    info!(match_id = %m.id, "rematch");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{GameRng, MatchId};

    fn join(m: &mut Match, id: u64) -> Result<SeatId, RuleViolation> {
        add_player(m, SeatId::new(id), &format!("p{id}"), format!("t{id}"), DateTime::<Utc>::UNIX_EPOCH)
    }

    fn lobby(config: &EngineConfig) -> Match {
        Match::new(MatchId::new(1), "CODE".into(), config, GameRng::new(8), DateTime::<Utc>::UNIX_EPOCH)
    }

    #[test]
    fn test_first_player_is_host() {
        let config = EngineConfig::default();
        let mut m = lobby(&config);
        join(&mut m, 1).unwrap();
        join(&mut m, 2).unwrap();

        assert!(m.seat(SeatId::new(1)).unwrap().host);
        assert!(!m.seat(SeatId::new(2)).unwrap().host);
        assert_eq!(m.seat(SeatId::new(2)).unwrap().index, 1);
    }

    #[test]
    fn test_lobby_full() {
        let config = EngineConfig::default().with_seats(2, 2);
        let mut m = lobby(&config);
        join(&mut m, 1).unwrap();
        join(&mut m, 2).unwrap();
        assert_eq!(join(&mut m, 3), Err(RuleViolation::LobbyFull(2)));
    }

    #[test]
    fn test_start_requires_ready_and_host() {
        let config = EngineConfig::default();
        let mut m = lobby(&config);
        join(&mut m, 1).unwrap();
        join(&mut m, 2).unwrap();
        let now = DateTime::<Utc>::UNIX_EPOCH;

        assert_eq!(start(&mut m, SeatId::new(1), &config, now), Err(RuleViolation::PlayersNotReady));
        set_ready(&mut m, SeatId::new(1), true).unwrap();
        set_ready(&mut m, SeatId::new(2), true).unwrap();
        assert_eq!(start(&mut m, SeatId::new(2), &config, now), Err(RuleViolation::NotHost));
        assert!(m.invariant_violation(&config).is_none());

        start(&mut m, SeatId::new(1), &config, now).unwrap();
        assert_eq!(m.phase(), Phase::ActionSelection);
        assert_eq!(m.treasury, 46);
        assert_eq!(m.deck.len(), 11);
        assert_eq!(m.turn_number, 1);
        assert_eq!(m.current_actor().unwrap().index, 0);
        assert!(m.invariant_violation(&config).is_none());
    }

    #[test]
    fn test_start_needs_minimum_players() {
        let config = EngineConfig::default();
        let mut m = lobby(&config);
        join(&mut m, 1).unwrap();
        set_ready(&mut m, SeatId::new(1), true).unwrap();
        assert_eq!(
            start(&mut m, SeatId::new(1), &config, DateTime::<Utc>::UNIX_EPOCH),
            Err(RuleViolation::NotEnoughPlayers { min: 2, have: 1 })
        );
    }
}
