//! Property tests over random legal play.
//!
//! Random seeds, table sizes and move choices drive matches through the rules
//! engine. After every command the conservation rules, the hand/alive rule
//! and the must-coup rule are checked, and random illegal commands are tried
//! to make sure a rejection never leaves a trace.

mod common;

use proptest::prelude::*;

use coup_engine::core::{ActionKind, Command, Role, SeatId};
use coup_engine::model::{GameEvent, Match};
use coup_engine::rules::{CoupRules, RulesEngine};
use coup_engine::store::snapshot;
use coup_engine::turn::Phase;

use common::*;

/// Every command shape worth trying, legal or not.
fn command_shapes(m: &Match) -> Vec<Command> {
    let mut all = vec![Command::Pass, Command::ChallengeAction, Command::ChallengeBlock];
    let seats: Vec<SeatId> = m.seats().iter().map(|s| s.id).collect();
    for action in ActionKind::ALL {
        all.push(Command::DeclareAction { action, target: None });
        for &target in &seats {
            all.push(Command::DeclareAction {
                action,
                target: Some(target),
            });
        }
    }
    for role in Role::ALL {
        all.push(Command::DeclareBlock { role });
        all.push(Command::ChooseInfluenceLoss { role });
        all.push(Command::ChooseExchangeCards { keep: vec![role] });
        all.push(Command::ChooseExchangeCards { keep: vec![role, role] });
    }
    all
}

/// Every (seat, command) a living seat may issue right now.
fn legal_moves(rules: &CoupRules, m: &Match) -> Vec<(SeatId, Command)> {
    m.alive_seats()
        .flat_map(|s| {
            rules
                .legal_commands(m, s.id)
                .into_iter()
                .map(move |c| (s.id, c))
        })
        .collect()
}

fn check_state(rules: &CoupRules, m: &Match) -> Result<(), TestCaseError> {
    if let Some(violation) = m.invariant_violation(rules.config()) {
        return Err(TestCaseError::fail(violation));
    }
    prop_assert!(!matches!(
        m.phase(),
        Phase::ResolvingChallengeAction | Phase::ResolvingChallengeBlock
    ));
    for s in m.players() {
        if !s.is_alive() {
            prop_assert_eq!(s.coins, 0);
            prop_assert!(s.hand().is_empty());
        }
        let deaths = m
            .log
            .full()
            .iter()
            .filter(|e| e.event == GameEvent::SeatEliminated { seat: s.id })
            .count();
        prop_assert!(deaths <= 1);
    }
    if m.phase() == Phase::ActionSelection {
        if let Some(a) = m.current_actor().filter(|a| a.coins >= rules.config().coup_threshold) {
            let legal = rules.legal_commands(m, a.id);
            prop_assert!(!legal.is_empty());
            let only_coup = legal
                .iter()
                .all(|c| matches!(c, Command::DeclareAction { action: ActionKind::Coup, .. }));
            prop_assert!(only_coup);
        }
    }
    match m.phase() {
        Phase::GameOver => prop_assert!(m.alive_count() <= 1),
        _ => prop_assert!(m.alive_count() >= 2),
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_random_play_keeps_invariants(
        seed in any::<u64>(),
        players in 2u64..=6,
        choices in prop::collection::vec(any::<usize>(), 1..200),
    ) {
        let (rules, mut m) = started(players, seed);
        check_state(&rules, &m)?;

        for choice in choices {
            let moves = legal_moves(&rules, &m);
            if m.is_over() {
                prop_assert!(moves.is_empty());
                break;
            }
            prop_assert!(!moves.is_empty(), "stuck in {}", m.phase());

            // Try one command; if it is illegal it must change nothing.
            let shapes = command_shapes(&m);
            let attempt = &shapes[choice % shapes.len()];
            let sender = SeatId::new((choice / shapes.len()) as u64 % (players + 1) + 1);
            if let Err(violation) = rules.validate(&m, sender, attempt) {
                let before = snapshot::encode(&m).unwrap();
                prop_assert_eq!(rules.apply_command(&mut m, sender, attempt, epoch()), Err(violation));
                prop_assert_eq!(snapshot::encode(&m).unwrap(), before);
            }

            // Occasionally someone walks away instead.
            let (seat, command) = if choice % 29 == 0 {
                let alive: Vec<SeatId> = m.alive_seats().map(|s| s.id).collect();
                (alive[choice % alive.len()], Command::Abandon)
            } else {
                moves[choice % moves.len()].clone()
            };
            let result = rules.apply_command(&mut m, seat, &command, epoch());
            prop_assert_eq!(result, Ok(true), "{:?} by {} in {}", command, seat, m.phase());
            check_state(&rules, &m)?;
        }
    }

    #[test]
    fn test_repeat_pass_changes_nothing(seed in any::<u64>(), players in 3u64..=6) {
        let (rules, mut m) = started(players, seed);
        let me = actor(&m);
        declare(&rules, &mut m, me, ActionKind::ForeignAid, None).unwrap();
        let first = others(&m, me)[0];
        prop_assert_eq!(send(&rules, &mut m, first, Command::Pass), Ok(true));

        let before = snapshot::encode(&m).unwrap();
        prop_assert_eq!(send(&rules, &mut m, first, Command::Pass), Ok(false));
        prop_assert_eq!(snapshot::encode(&m).unwrap(), before);
        prop_assert!(!rules.legal_commands(&m, first).contains(&Command::Pass));
    }
}

#[test]
fn test_game_reaches_an_end() {
    // Income only, so forced coups eventually finish everyone off.
    let (rules, mut m) = started(4, 7);
    for _ in 0..500 {
        if m.is_over() {
            break;
        }
        let moves = legal_moves(&rules, &m);
        let (seat, command) = moves
            .iter()
            .find(|(_, c)| {
                matches!(
                    c,
                    Command::DeclareAction {
                        action: ActionKind::Income | ActionKind::Coup,
                        ..
                    } | Command::ChooseInfluenceLoss { .. }
                )
            })
            .cloned()
            .expect("income, coup or a loss is always available");
        rules.apply_command(&mut m, seat, &command, epoch()).unwrap();
        assert_invariants(&m);
    }
    assert!(m.is_over());
    let winner = m.winner.expect("someone won");
    assert!(m.seat(winner).unwrap().is_alive());
    assert_eq!(m.log.elimination_order().len(), 3);
}
