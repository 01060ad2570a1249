//! Supervisor behavior through the service: timeout defaults, races with
//! player commands, inactivity reaping, and the tokio runner.

mod common;

use chrono::Duration;
use tokio_util::sync::CancellationToken;

use coup_engine::core::{ActionKind, Command, EngineConfig};
use coup_engine::error::{EngineError, NotFound};
use coup_engine::model::GameEvent;
use coup_engine::supervisor::{ReapReport, SweepReport, Supervisor, TimeoutOutcome};
use coup_engine::turn::Phase;

use common::*;

fn supervisor(table: &Table) -> Supervisor {
    Supervisor::new(table.svc.clone())
}

fn income() -> Command {
    Command::DeclareAction {
        action: ActionKind::Income,
        target: None,
    }
}

// ============================================================================
// Timeout defaults
// ============================================================================

#[test]
fn test_nothing_expires_early() {
    let table = Table::started(3, 20);
    table.clock.advance(Duration::seconds(59));
    let report = supervisor(&table).sweep_timeouts(table.svc.now());
    assert_eq!(report, SweepReport::default());
}

#[test]
fn test_idle_actor_takes_income() {
    let table = Table::started(3, 21);
    let me = table.actor();

    table.clock.advance(Duration::seconds(60));
    let now = table.svc.now();
    let report = supervisor(&table).sweep_timeouts(now);
    assert_eq!(report.handled, 1);

    table.with_match(|m| {
        assert_eq!(m.seat(me).unwrap().coins, 3);
        assert_ne!(actor(m), me);
        assert!(m.log.recent().any(|e| e.event
            == GameEvent::AutoAction {
                phase: Phase::ActionSelection,
                seat: Some(me)
            }));
        assert_invariants(m);
    });
    let state = table.svc.public_state(table.match_id).unwrap();
    assert_eq!(state.turn_deadline, Some(now + Duration::seconds(60)));
}

#[test]
fn test_open_window_passes_for_everyone() {
    let table = Table::started(3, 22);
    let me = table.actor();
    table
        .send(
            me,
            Command::DeclareAction {
                action: ActionKind::Tax,
                target: None,
            },
        )
        .unwrap();

    table.clock.advance(Duration::seconds(61));
    let outcome = supervisor(&table).handle_timeout(table.match_id, table.svc.now());
    assert_eq!(outcome, Ok(TimeoutOutcome::Applied(Phase::AwaitingChallengeAction)));

    table.with_match(|m| {
        assert_eq!(m.seat(me).unwrap().coins, 5);
        assert_eq!(m.phase(), Phase::ActionSelection);
        assert!(m.log.recent().any(|e| e.event
            == GameEvent::AutoAction {
                phase: Phase::AwaitingChallengeAction,
                seat: None
            }));
    });
}

#[test]
fn test_idle_chooser_loses_a_held_card() {
    let table = Table::started(2, 23);
    let me = table.actor();
    let them = table.with_match(|m| {
        set_coins(m, me, 7);
        others(m, me)[0]
    });
    let hand = table.with_match(|m| m.seat(them).unwrap().hand().to_vec());

    table
        .send(
            me,
            Command::DeclareAction {
                action: ActionKind::Coup,
                target: Some(them),
            },
        )
        .unwrap();
    assert_eq!(table.with_match(|m| m.phase()), Phase::AwaitingInfluenceLoss);

    table.clock.advance(Duration::seconds(61));
    let report = supervisor(&table).sweep_timeouts(table.svc.now());
    assert_eq!(report.handled, 1);

    table.with_match(|m| {
        let t = m.seat(them).unwrap();
        assert_eq!(t.revealed.len(), 1);
        assert!(hand.contains(&t.revealed[0]));
        assert_eq!(t.influence_count(), 1);
        assert_eq!(actor(m), them);
        assert_invariants(m);
    });
}

#[test]
fn test_forced_coup_when_idle_at_threshold() {
    let table = Table::started(2, 24);
    let me = table.actor();
    let them = table.with_match(|m| {
        set_coins(m, me, 10);
        others(m, me)[0]
    });

    table.clock.advance(Duration::seconds(61));
    supervisor(&table).sweep_timeouts(table.svc.now());

    table.with_match(|m| {
        assert_eq!(m.seat(me).unwrap().coins, 3);
        assert!(m.log.recent().any(|e| e.event
            == GameEvent::ActionDeclared {
                actor: me,
                action: ActionKind::Coup,
                target: Some(them)
            }));
        assert_eq!(m.phase(), Phase::AwaitingInfluenceLoss);
    });
}

// ============================================================================
// Races
// ============================================================================

#[test]
fn test_player_acting_first_wins_the_race() {
    let table = Table::started(2, 25);
    let me = table.actor();
    table.clock.advance(Duration::seconds(61));
    let now = table.svc.now();

    // The player's command lands between the scan and the lock.
    table.send(me, income()).unwrap();
    let outcome = supervisor(&table).handle_timeout(table.match_id, now);
    assert_eq!(outcome, Ok(TimeoutOutcome::Raced));

    table.with_match(|m| {
        assert_eq!(m.seat(me).unwrap().coins, 3);
        assert!(!m.log.recent().any(|e| matches!(e.event, GameEvent::AutoAction { .. })));
    });
}

#[test]
fn test_timeout_for_unknown_match_is_a_race() {
    let table = Table::started(2, 26);
    let sup = supervisor(&table);
    let outcome = sup.handle_timeout(coup_engine::MatchId::new(999), table.svc.now());
    assert_eq!(outcome, Ok(TimeoutOutcome::Raced));
}

#[test]
fn test_stale_deadline_is_cleared() {
    let table = Table::lobby(2, EngineConfig::default());
    table.with_match(|m| m.turn_deadline = Some(epoch()));

    let outcome = supervisor(&table).handle_timeout(table.match_id, table.svc.now());
    assert_eq!(outcome, Ok(TimeoutOutcome::ClearedStale));
    assert_eq!(table.with_match(|m| m.turn_deadline), None);
}

// ============================================================================
// Inactivity
// ============================================================================

#[test]
fn test_idle_lobby_is_deleted() {
    let table = Table::lobby(2, EngineConfig::default());
    let sup = supervisor(&table);

    table.clock.advance(Duration::seconds(299));
    assert_eq!(sup.reap_inactive(table.svc.now()), ReapReport::default());

    table.clock.advance(Duration::seconds(1));
    let report = sup.reap_inactive(table.svc.now());
    assert_eq!(report, ReapReport { deleted: 1, closed: 0 });

    assert!(table.svc.store().is_empty());
    assert_eq!(
        table.svc.reconnect(&table.seats[1].token).unwrap_err(),
        EngineError::NotFound(NotFound::Token)
    );
    assert!(table.svc.join_match(&table.seats[0].code, "late").is_err());
}

#[test]
fn test_idle_game_is_force_closed_then_deleted() {
    let table = Table::started(3, 27);
    let sup = supervisor(&table);

    table.clock.advance(Duration::seconds(300));
    let report = sup.reap_inactive(table.svc.now());
    assert_eq!(report, ReapReport { deleted: 0, closed: 1 });

    let state = table.svc.public_state(table.match_id).unwrap();
    assert_eq!(state.phase, Phase::GameOver);
    assert_eq!(state.winner, None);
    assert_eq!(state.turn_deadline, None);
    assert!(state.seats.iter().all(|s| s.influence == 0 && s.revealed.len() == 2));
    assert!(state.log.iter().any(|e| e.event == GameEvent::MatchClosedInactivity));
    assert!(table.archive.is_empty());

    // Still idle: the finished match goes away on a later pass.
    table.clock.advance(Duration::seconds(60));
    let report = sup.reap_inactive(table.svc.now());
    assert_eq!(report, ReapReport { deleted: 1, closed: 0 });
    assert!(table.svc.public_state(table.match_id).is_err());
}

#[test]
fn test_timeout_defaults_do_not_count_as_activity() {
    let table = Table::started(2, 28);
    let sup = supervisor(&table);

    for _ in 0..4 {
        table.clock.advance(Duration::seconds(61));
        sup.sweep_timeouts(table.svc.now());
    }
    assert_eq!(table.with_match(|m| m.turn_number), 5);

    table.clock.advance(Duration::seconds(60));
    let report = sup.reap_inactive(table.svc.now());
    assert_eq!(report.closed, 1);
}

#[test]
fn test_player_activity_keeps_game_alive() {
    let table = Table::started(2, 29);
    let sup = supervisor(&table);

    table.clock.advance(Duration::seconds(250));
    let me = table.actor();
    table.send(me, income()).unwrap();

    table.clock.advance(Duration::seconds(100));
    assert_eq!(sup.reap_inactive(table.svc.now()), ReapReport::default());
}

// ============================================================================
// Runner
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_run_sweeps_until_cancelled() {
    let table = Table::started(2, 30);
    let me = table.actor();
    table.clock.advance(Duration::seconds(61));
    let sup = supervisor(&table);

    let cancel = CancellationToken::new();
    let stopper = {
        let cancel = cancel.clone();
        async move {
            tokio::time::sleep(std::time::Duration::from_secs(25)).await;
            cancel.cancel();
        }
    };
    tokio::join!(sup.run(cancel.clone()), stopper);

    assert!(cancel.is_cancelled());
    // The manual clock never moved, so the refreshed deadline never expired.
    table.with_match(|m| {
        assert_eq!(m.seat(me).unwrap().coins, 3);
        assert_eq!(m.turn_number, 2);
    });
}
