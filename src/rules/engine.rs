//! Rules engine trait and the Coup implementation.
//!
//! The engine defines:
//! - What commands are legal for a seat
//! - How a command modifies the match
//! - Win conditions

use chrono::{DateTime, Utc};
use tracing::error;

use crate::core::{ActionKind, Command, EngineConfig, Role, SeatId};
use crate::error::RuleViolation;
use crate::model::Match;
use crate::turn::TurnStep;

use super::{commands, Cx};

/// How a finished match ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Last seat standing.
    Winner(SeatId),
    /// Closed without a winner (inactivity).
    NoWinner,
}

impl Outcome {
    /// Check if a seat won.
    #[must_use]
    pub fn is_winner(&self, seat: SeatId) -> bool {
        match self {
            Outcome::Winner(s) => *s == seat,
            Outcome::NoWinner => false,
        }
    }
}

/// Rules engine trait.
///
/// ## Implementation Notes
///
/// - `validate` must not mutate anything
/// - `apply_command` runs the whole cascade before returning, so the match is
///   left waiting on a decision or over
/// - `is_terminal`: return `None` if the match continues
pub trait RulesEngine: Send + Sync {
    /// Get the engine configuration.
    fn config(&self) -> &EngineConfig;

    /// Check that `seat` may issue `command` right now.
    fn validate(&self, m: &Match, seat: SeatId, command: &Command) -> Result<(), RuleViolation>;

    /// Validate and run a command.
    ///
    /// Returns `Ok(false)` when the command was legal but changed nothing
    /// (a repeated pass). On `Err` the match is untouched.
    fn apply_command(
        &self,
        m: &mut Match,
        seat: SeatId,
        command: &Command,
        now: DateTime<Utc>,
    ) -> Result<bool, RuleViolation>;

    /// Check if the match is over.
    fn is_terminal(&self, m: &Match) -> Option<Outcome>;

    // === Convenience Methods ===

    /// Every command `seat` may issue right now.
    ///
    /// Abandoning is always possible in play and is left out. A pass the seat
    /// already made in the open window is left out too.
    fn legal_commands(&self, m: &Match, seat: SeatId) -> Vec<Command> {
        let already_passed = m
            .turn()
            .and_then(|t| t.step.passes())
            .is_some_and(|p| p.contains(seat));

        candidates(m, seat)
            .into_iter()
            .filter(|c| !(already_passed && *c == Command::Pass))
            .filter(|c| self.validate(m, seat, c).is_ok())
            .collect()
    }
}

/// Every command shape worth asking [`RulesEngine::validate`] about.
fn candidates(m: &Match, seat: SeatId) -> Vec<Command> {
    let mut out = Vec::new();

    for action in ActionKind::ALL {
        if action.requires_target() {
            out.extend(
                m.players()
                    .filter(|s| s.id != seat)
                    .map(|s| Command::DeclareAction {
                        action,
                        target: Some(s.id),
                    }),
            );
        } else {
            out.push(Command::DeclareAction { action, target: None });
        }
    }

    out.push(Command::Pass);
    out.push(Command::ChallengeAction);
    out.push(Command::ChallengeBlock);
    out.extend(Role::ALL.into_iter().map(|role| Command::DeclareBlock { role }));

    if let Some(s) = m.seat(seat) {
        let mut held: Vec<Role> = s.hand().to_vec();
        held.sort_unstable();
        held.dedup();
        out.extend(held.into_iter().map(|role| Command::ChooseInfluenceLoss { role }));
    }

    if let Some(TurnStep::ExchangeReturn(offer)) = m.turn().map(|t| &t.step) {
        let mut keeps = combinations(&offer.pool, offer.keep);
        for keep in &mut keeps {
            keep.sort_unstable();
        }
        keeps.sort_unstable();
        keeps.dedup();
        out.extend(keeps.into_iter().map(|keep| Command::ChooseExchangeCards { keep }));
    }

    out
}

/// All `k`-element selections from `pool`, by position.
fn combinations(pool: &[Role], k: usize) -> Vec<Vec<Role>> {
    if k == 0 {
        return vec![Vec::new()];
    }
    if pool.len() < k {
        return Vec::new();
    }
    let mut out = Vec::new();
    for (i, &first) in pool.iter().enumerate() {
        for mut rest in combinations(&pool[i + 1..], k - 1) {
            rest.insert(0, first);
            out.push(rest);
        }
    }
    out
}

// ============================================================================
// Coup
// ============================================================================

/// The standard Coup rules.
#[derive(Clone, Debug, Default)]
pub struct CoupRules {
    config: EngineConfig,
}

impl CoupRules {
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }
}

impl RulesEngine for CoupRules {
    fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn validate(&self, m: &Match, seat: SeatId, command: &Command) -> Result<(), RuleViolation> {
        commands::validate(m, seat, command, &Cx::new(&self.config, m.last_activity))
    }

    fn apply_command(
        &self,
        m: &mut Match,
        seat: SeatId,
        command: &Command,
        now: DateTime<Utc>,
    ) -> Result<bool, RuleViolation> {
        let cx = Cx::new(&self.config, now);
        commands::validate(m, seat, command, &cx)?;
        let changed = commands::execute(m, seat, command, &cx);
        if let Some(violation) = m.invariant_violation(&self.config) {
            error!(match_id = %m.id, %seat, command = command.name(), %violation, "invariant broken");
        }
        Ok(changed)
    }

    fn is_terminal(&self, m: &Match) -> Option<Outcome> {
        if !m.is_over() {
            return None;
        }
        Some(m.winner.map_or(Outcome::NoWinner, Outcome::Winner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{GameRng, MatchId};
    use crate::rules::lobby;
    use crate::turn::Phase;

    fn epoch() -> DateTime<Utc> {
        DateTime::<Utc>::UNIX_EPOCH
    }

    fn started(players: u64) -> (CoupRules, Match) {
        let rules = CoupRules::default();
        let mut m = Match::new(MatchId::new(1), "ABCDEF".into(), rules.config(), GameRng::new(42), epoch());
        for id in 1..=players {
            lobby::add_player(&mut m, SeatId::new(id), &format!("p{id}"), format!("t{id}"), epoch()).unwrap();
            lobby::set_ready(&mut m, SeatId::new(id), true).unwrap();
        }
        lobby::start(&mut m, SeatId::new(1), rules.config(), epoch()).unwrap();
        (rules, m)
    }

    fn actor(m: &Match) -> SeatId {
        m.current_actor().unwrap().id
    }

    #[test]
    fn test_outcome_is_winner() {
        let outcome = Outcome::Winner(SeatId::new(1));
        assert!(outcome.is_winner(SeatId::new(1)));
        assert!(!outcome.is_winner(SeatId::new(2)));
        assert!(!Outcome::NoWinner.is_winner(SeatId::new(1)));
    }

    #[test]
    fn test_combinations() {
        let pool = [Role::Duke, Role::Duke, Role::Captain];
        assert_eq!(combinations(&pool, 2).len(), 3);
        assert_eq!(combinations(&pool, 0), vec![Vec::<Role>::new()]);
        assert!(combinations(&pool, 4).is_empty());
    }

    #[test]
    fn test_opening_legal_commands() {
        let (rules, m) = started(3);
        let me = actor(&m);
        let legal = rules.legal_commands(&m, me);

        assert!(legal.contains(&Command::DeclareAction {
            action: ActionKind::Income,
            target: None
        }));
        assert!(legal.contains(&Command::DeclareAction {
            action: ActionKind::Exchange,
            target: None
        }));
        assert!(!legal.iter().any(|c| matches!(
            c,
            Command::DeclareAction {
                action: ActionKind::Coup | ActionKind::Assassinate,
                ..
            }
        )));
        let steals = legal
            .iter()
            .filter(|c| matches!(c, Command::DeclareAction { action: ActionKind::Steal, .. }))
            .count();
        assert_eq!(steals, 2);

        let other = m.players().find(|s| s.id != me).unwrap().id;
        assert!(rules.legal_commands(&m, other).is_empty());
    }

    #[test]
    fn test_must_coup_at_threshold() {
        let (rules, mut m) = started(2);
        let me = actor(&m);
        m.seat_mut(me).unwrap().coins = 10;
        m.treasury -= 8;

        let legal = rules.legal_commands(&m, me);
        assert_eq!(legal.len(), 1);
        assert!(matches!(
            legal[0],
            Command::DeclareAction {
                action: ActionKind::Coup,
                target: Some(_)
            }
        ));
    }

    #[test]
    fn test_income_advances_turn() {
        let (rules, mut m) = started(2);
        let me = actor(&m);
        let changed = rules
            .apply_command(
                &mut m,
                me,
                &Command::DeclareAction {
                    action: ActionKind::Income,
                    target: None,
                },
                epoch(),
            )
            .unwrap();

        assert!(changed);
        assert_eq!(m.seat(me).unwrap().coins, 3);
        assert_eq!(m.treasury, 45);
        assert_eq!(m.turn_number, 2);
        assert_ne!(actor(&m), me);
        assert_eq!(m.phase(), Phase::ActionSelection);
    }

    #[test]
    fn test_rejected_command_leaves_match_untouched() {
        let (rules, mut m) = started(2);
        let other = m.players().find(|s| s.id != actor(&m)).unwrap().id;
        let seq = m.decision_seq();
        let log_len = m.log.len();

        let err = rules
            .apply_command(
                &mut m,
                other,
                &Command::DeclareAction {
                    action: ActionKind::Tax,
                    target: None,
                },
                epoch(),
            )
            .unwrap_err();

        assert_eq!(err, RuleViolation::NotYourTurn);
        assert_eq!(m.decision_seq(), seq);
        assert_eq!(m.log.len(), log_len);
        assert_eq!(m.treasury, 46);
    }

    #[test]
    fn test_repeat_pass_changes_nothing() {
        let (rules, mut m) = started(3);
        let me = actor(&m);
        rules
            .apply_command(
                &mut m,
                me,
                &Command::DeclareAction {
                    action: ActionKind::Tax,
                    target: None,
                },
                epoch(),
            )
            .unwrap();
        let other = m.players().find(|s| s.id != me).unwrap().id;

        assert!(rules.legal_commands(&m, other).contains(&Command::Pass));
        assert_eq!(rules.apply_command(&mut m, other, &Command::Pass, epoch()), Ok(true));
        assert!(!rules.legal_commands(&m, other).contains(&Command::Pass));
        assert_eq!(rules.apply_command(&mut m, other, &Command::Pass, epoch()), Ok(false));
        assert_eq!(m.phase(), Phase::AwaitingChallengeAction);
    }

    #[test]
    fn test_is_terminal() {
        let (rules, mut m) = started(2);
        assert_eq!(rules.is_terminal(&m), None);

        let me = actor(&m);
        let other = m.players().find(|s| s.id != me).unwrap().id;
        rules.apply_command(&mut m, other, &Command::Abandon, epoch()).unwrap();
        assert_eq!(rules.is_terminal(&m), Some(Outcome::Winner(me)));
    }
}
