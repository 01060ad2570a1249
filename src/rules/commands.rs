//! Command validation and execution.
//!
//! [`validate`] checks a command against the current match without touching
//! it. [`execute`] runs a validated command: it makes the command's own change
//! and hands the follow-up to the cascade. Every rejection happens in
//! `validate`, so a rejected command never mutates the match.

use tracing::debug;

use crate::core::{ActionKind, Command, Role, SeatId};
use crate::error::RuleViolation;
use crate::model::{GameEvent, Match, Seat};
use crate::turn::{
    BlockRecord, ChallengeOutcome, ChallengeRecord, LossReason, Phase, Stage, TurnState, TurnStep,
};

use super::cascade::{self, eligible_reactors, Transition};
use super::{abandon, Cx};

/// Check that `seat` may issue `command` right now.
pub(crate) fn validate(m: &Match, seat: SeatId, command: &Command, cx: &Cx<'_>) -> Result<(), RuleViolation> {
    if let Command::Abandon = command {
        return abandon::validate(m, seat);
    }
    match m.phase() {
        Phase::Lobby => return Err(RuleViolation::NotStarted),
        Phase::GameOver => return Err(RuleViolation::MatchOver),
        _ => {}
    }
    let s = acting_seat(m, seat)?;

    match command {
        Command::DeclareAction { action, target } => validate_declare(m, s, *action, *target, cx),
        Command::Pass => validate_pass(m, s, command),
        Command::ChallengeAction => {
            let turn = window(m, command, Phase::AwaitingChallengeAction)?;
            if turn.actor == seat {
                return Err(RuleViolation::CannotChallengeOwnClaim);
            }
            Ok(())
        }
        Command::DeclareBlock { role } => {
            let turn = window(m, command, Phase::AwaitingBlock)?;
            if !turn.action.can_be_blocked_by(*role) {
                return Err(RuleViolation::RoleCannotBlock {
                    role: *role,
                    action: turn.action,
                });
            }
            if turn.actor == seat {
                return Err(RuleViolation::CannotBlockOwnAction);
            }
            if turn.action.capabilities().target_blocks_only && turn.target != Some(seat) {
                return Err(RuleViolation::NotEligibleToBlock(turn.action));
            }
            Ok(())
        }
        Command::ChallengeBlock => {
            let turn = window(m, command, Phase::AwaitingChallengeBlock)?;
            if turn.blocker() == Some(seat) {
                return Err(RuleViolation::CannotChallengeOwnClaim);
            }
            Ok(())
        }
        Command::ChooseInfluenceLoss { role } => {
            let turn = window(m, command, Phase::AwaitingInfluenceLoss)?;
            let TurnStep::InfluenceLoss(pending) = &turn.step else {
                return Err(wrong_phase(command, m.phase()));
            };
            if pending.seat != seat {
                return Err(RuleViolation::NotTheChooser);
            }
            if !s.holds(*role) {
                return Err(RuleViolation::CardNotHeld(*role));
            }
            Ok(())
        }
        Command::ChooseExchangeCards { keep } => {
            let turn = window(m, command, Phase::AwaitingExchangeReturn)?;
            let TurnStep::ExchangeReturn(offer) = &turn.step else {
                return Err(wrong_phase(command, m.phase()));
            };
            if turn.actor != seat {
                return Err(RuleViolation::NotTheExchanger);
            }
            if keep.len() != offer.keep {
                return Err(RuleViolation::KeepCountMismatch {
                    expected: offer.keep,
                    got: keep.len(),
                });
            }
            remaining_after_keep(&offer.pool, keep).map(|_| ())
        }
        Command::Abandon => Ok(()),
    }
}

/// Run a command that [`validate`] accepted. Returns `false` if it changed
/// nothing (a repeated pass).
pub(crate) fn execute(m: &mut Match, seat: SeatId, command: &Command, cx: &Cx<'_>) -> bool {
    debug!(match_id = %m.id, %seat, command = command.name(), phase = %m.phase(), "applying command");
    match command {
        Command::DeclareAction { action, target } => declare_action(m, seat, *action, *target, cx),
        Command::Pass => return pass(m, seat, cx),
        Command::ChallengeAction => challenge_action(m, seat, cx),
        Command::DeclareBlock { role } => declare_block(m, seat, *role, cx),
        Command::ChallengeBlock => challenge_block(m, seat, cx),
        Command::ChooseInfluenceLoss { role } => choose_influence_loss(m, seat, *role, cx),
        Command::ChooseExchangeCards { keep } => choose_exchange_cards(m, seat, keep, cx),
        Command::Abandon => abandon::execute(m, seat, cx),
    }
    true
}

// ============================================================================
// Validation helpers
// ============================================================================

fn wrong_phase(command: &Command, phase: Phase) -> RuleViolation {
    RuleViolation::WrongPhase {
        command: command.name(),
        phase,
    }
}

/// A seated, living, non-spectating seat.
fn acting_seat(m: &Match, seat: SeatId) -> Result<&Seat, RuleViolation> {
    let s = m.seat(seat).ok_or(RuleViolation::NotSeated(seat))?;
    if s.spectator {
        return Err(RuleViolation::Spectator);
    }
    if !s.is_alive() {
        return Err(RuleViolation::SeatEliminated(seat));
    }
    Ok(s)
}

/// The turn in progress, if the match is in `phase`.
fn window<'m>(m: &'m Match, command: &Command, phase: Phase) -> Result<&'m TurnState, RuleViolation> {
    match m.turn() {
        Some(turn) if turn.phase() == phase => Ok(turn),
        _ => Err(wrong_phase(command, m.phase())),
    }
}

fn validate_declare(
    m: &Match,
    actor: &Seat,
    action: ActionKind,
    target: Option<SeatId>,
    cx: &Cx<'_>,
) -> Result<(), RuleViolation> {
    if !matches!(m.stage(), Stage::ActionSelection) {
        return Err(RuleViolation::WrongPhase {
            command: "declare_action",
            phase: m.phase(),
        });
    }
    if m.current_actor().map(|s| s.id) != Some(actor.id) {
        return Err(RuleViolation::NotYourTurn);
    }
    if actor.coins >= cx.config.coup_threshold && action != ActionKind::Coup {
        return Err(RuleViolation::MustCoup { coins: actor.coins });
    }
    if actor.coins < action.cost() {
        return Err(RuleViolation::InsufficientCoins {
            action,
            cost: action.cost(),
            coins: actor.coins,
        });
    }
    match (action.requires_target(), target) {
        (true, None) => Err(RuleViolation::TargetRequired(action)),
        (false, Some(_)) => Err(RuleViolation::TargetNotAllowed(action)),
        (false, None) => Ok(()),
        (true, Some(t)) => {
            if t == actor.id {
                return Err(RuleViolation::SelfTarget);
            }
            let victim = m
                .seat(t)
                .filter(|s| s.is_active_player())
                .ok_or(RuleViolation::InvalidTarget(t))?;
            if action == ActionKind::Steal && victim.coins == 0 {
                return Err(RuleViolation::NothingToSteal(t));
            }
            Ok(())
        }
    }
}

fn validate_pass(m: &Match, s: &Seat, command: &Command) -> Result<(), RuleViolation> {
    let turn = match m.turn() {
        Some(turn) if turn.phase().is_reaction_window() => turn,
        _ => return Err(wrong_phase(command, m.phase())),
    };
    let claimant = match turn.step {
        TurnStep::BlockChallengeWindow(_) => turn.blocker(),
        _ => Some(turn.actor),
    };
    if claimant == Some(s.id) {
        return Err(RuleViolation::CannotPassOwnClaim);
    }
    if !eligible_reactors(m).contains(&s.id) {
        return Err(RuleViolation::NotEligibleToReact);
    }
    Ok(())
}

/// Take `keep` out of `pool` as a multiset. Returns what is left over.
pub(crate) fn remaining_after_keep(pool: &[Role], keep: &[Role]) -> Result<Vec<Role>, RuleViolation> {
    let mut rest = pool.to_vec();
    for card in keep {
        let pos = rest
            .iter()
            .position(|c| c == card)
            .ok_or(RuleViolation::CardNotOffered(*card))?;
        rest.remove(pos);
    }
    Ok(rest)
}

// ============================================================================
// Execution
// ============================================================================

fn declare_action(m: &mut Match, actor: SeatId, action: ActionKind, target: Option<SeatId>, cx: &Cx<'_>) {
    m.append_log(GameEvent::ActionDeclared { actor, action, target }, cx.now);
    m.set_stage(Stage::Turn(TurnState::new(action, actor, target, TurnStep::Declared)));

    let first = match (action, target) {
        (ActionKind::Coup, Some(seat)) => {
            // Coup is paid up front and never refunded.
            m.pay_to_treasury(actor, action.cost());
            if let Some(turn) = m.turn_mut() {
                turn.cost_charged = true;
            }
            Transition::LoseInfluence {
                seat,
                reason: LossReason::Coup,
            }
        }
        _ if action.is_challengeable() => Transition::OpenChallengeWindow,
        _ if action.is_blockable() => Transition::OpenBlockWindow,
        _ => Transition::ResolveAction,
    };
    cascade::settle(m, Some(first), cx);
}

fn pass(m: &mut Match, seat: SeatId, cx: &Cx<'_>) -> bool {
    let inserted = m
        .turn_mut()
        .and_then(|t| t.step.passes_mut())
        .is_some_and(|passes| passes.insert(seat));
    if !inserted {
        return false;
    }
    if cascade::window_complete(m) {
        cascade::settle(m, Some(Transition::CloseWindow), cx);
    }
    true
}

fn challenge_action(m: &mut Match, challenger: SeatId, cx: &Cx<'_>) {
    let Some(turn) = m.turn() else { return };
    let actor = turn.actor;
    let Some(role) = turn.action.claimed_role() else {
        return;
    };
    m.append_log(GameEvent::ChallengeAction { challenger, actor, role }, cx.now);
    m.set_step(TurnStep::ResolvingChallenge);

    let proven = m.prove_and_swap(actor, role);
    let (outcome, loser) = if proven {
        m.append_log(
            GameEvent::ChallengeFailed {
                proven_by: actor,
                role,
                loser: challenger,
            },
            cx.now,
        );
        (ChallengeOutcome::ClaimProven, challenger)
    } else {
        m.append_log(GameEvent::ChallengeSucceeded { challenger, actor }, cx.now);
        (ChallengeOutcome::ClaimFailed, actor)
    };
    if let Some(turn) = m.turn_mut() {
        turn.challenge = Some(ChallengeRecord { challenger, outcome });
    }
    cascade::settle(
        m,
        Some(Transition::LoseInfluence {
            seat: loser,
            reason: LossReason::ChallengeLost,
        }),
        cx,
    );
}

fn declare_block(m: &mut Match, blocker: SeatId, role: Role, cx: &Cx<'_>) {
    let Some(turn) = m.turn_mut() else { return };
    turn.block = Some(BlockRecord {
        blocker,
        role,
        challenge: None,
    });
    let action = turn.action;
    m.append_log(GameEvent::BlockDeclared { blocker, role, action }, cx.now);
    cascade::settle(m, Some(Transition::OpenBlockChallengeWindow), cx);
}

fn challenge_block(m: &mut Match, challenger: SeatId, cx: &Cx<'_>) {
    let Some(block) = m.turn().and_then(|t| t.block) else {
        return;
    };
    let (blocker, role) = (block.blocker, block.role);
    m.append_log(GameEvent::ChallengeBlock { challenger, blocker, role }, cx.now);
    m.set_step(TurnStep::ResolvingBlockChallenge);

    let proven = m.prove_and_swap(blocker, role);
    let (outcome, loser) = if proven {
        m.append_log(
            GameEvent::ChallengeBlockFailed {
                proven_by: blocker,
                role,
                loser: challenger,
            },
            cx.now,
        );
        (ChallengeOutcome::ClaimProven, challenger)
    } else {
        m.append_log(GameEvent::ChallengeBlockSucceeded { challenger, blocker }, cx.now);
        (ChallengeOutcome::ClaimFailed, blocker)
    };
    if let Some(block) = m.turn_mut().and_then(|t| t.block.as_mut()) {
        block.challenge = Some(ChallengeRecord { challenger, outcome });
    }
    cascade::settle(
        m,
        Some(Transition::LoseInfluence {
            seat: loser,
            reason: LossReason::ChallengeBlockLost,
        }),
        cx,
    );
}

fn choose_influence_loss(m: &mut Match, seat: SeatId, role: Role, cx: &Cx<'_>) {
    let Some(TurnStep::InfluenceLoss(pending)) = m.turn().map(|t| t.step.clone()) else {
        return;
    };
    m.reveal_influence(seat, role, pending.reason, cx.now);
    cascade::settle(m, Some(Transition::AfterInfluenceLoss(pending.reason)), cx);
}

fn choose_exchange_cards(m: &mut Match, actor: SeatId, keep: &[Role], cx: &Cx<'_>) {
    let Some(TurnStep::ExchangeReturn(offer)) = m.turn().map(|t| t.step.clone()) else {
        return;
    };
    let Ok(rest) = remaining_after_keep(&offer.pool, keep) else {
        return;
    };
    if let Some(s) = m.seat_mut(actor) {
        s.replace_hand(keep.iter().copied().collect());
    }
    m.return_to_deck(rest);
    m.append_log(GameEvent::ExchangeCompleted { actor }, cx.now);
    cascade::settle(m, Some(Transition::EndTurn), cx);
}
