//! Actions, their capability table, and the commands a seat can issue.
//!
//! ## Capability table
//!
//! | action       | cost | target | claims     | blocked by            |
//! |--------------|------|--------|------------|-----------------------|
//! | income       | 0    | no     | -          | -                     |
//! | foreign_aid  | 0    | no     | -          | duke                  |
//! | coup         | 7    | yes    | -          | -                     |
//! | tax          | 0    | no     | duke       | -                     |
//! | assassinate  | 3    | yes    | assassin   | contessa              |
//! | steal        | 0    | yes    | captain    | ambassador, captain   |
//! | exchange     | 0    | no     | ambassador | -                     |
//!
//! An action is challengeable exactly when it claims a role.

use serde::{Deserialize, Serialize};

use super::{Role, SeatId};

/// A turn action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Income,
    ForeignAid,
    Coup,
    Tax,
    Assassinate,
    Steal,
    Exchange,
}

/// Static rules for one action.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Capabilities {
    /// Coins the actor must hold (and eventually pay).
    pub cost: u32,
    pub requires_target: bool,
    /// Role the actor claims by declaring the action.
    pub claimed_role: Option<Role>,
    /// Roles that may block the action.
    pub blocked_by: &'static [Role],
    /// Whether only the target may block (otherwise any other seat).
    pub target_blocks_only: bool,
}

impl ActionKind {
    pub const ALL: [ActionKind; 7] = [
        ActionKind::Income,
        ActionKind::ForeignAid,
        ActionKind::Coup,
        ActionKind::Tax,
        ActionKind::Assassinate,
        ActionKind::Steal,
        ActionKind::Exchange,
    ];

    /// The capability row for this action.
    #[must_use]
    pub const fn capabilities(self) -> Capabilities {
        match self {
            ActionKind::Income => Capabilities {
                cost: 0,
                requires_target: false,
                claimed_role: None,
                blocked_by: &[],
                target_blocks_only: false,
            },
            ActionKind::ForeignAid => Capabilities {
                cost: 0,
                requires_target: false,
                claimed_role: None,
                blocked_by: &[Role::Duke],
                target_blocks_only: false,
            },
            ActionKind::Coup => Capabilities {
                cost: 7,
                requires_target: true,
                claimed_role: None,
                blocked_by: &[],
                target_blocks_only: false,
            },
            ActionKind::Tax => Capabilities {
                cost: 0,
                requires_target: false,
                claimed_role: Some(Role::Duke),
                blocked_by: &[],
                target_blocks_only: false,
            },
            ActionKind::Assassinate => Capabilities {
                cost: 3,
                requires_target: true,
                claimed_role: Some(Role::Assassin),
                blocked_by: &[Role::Contessa],
                target_blocks_only: true,
            },
            ActionKind::Steal => Capabilities {
                cost: 0,
                requires_target: true,
                claimed_role: Some(Role::Captain),
                blocked_by: &[Role::Ambassador, Role::Captain],
                target_blocks_only: true,
            },
            ActionKind::Exchange => Capabilities {
                cost: 0,
                requires_target: false,
                claimed_role: Some(Role::Ambassador),
                blocked_by: &[],
                target_blocks_only: false,
            },
        }
    }

    #[must_use]
    pub const fn cost(self) -> u32 {
        self.capabilities().cost
    }

    #[must_use]
    pub const fn requires_target(self) -> bool {
        self.capabilities().requires_target
    }

    #[must_use]
    pub const fn claimed_role(self) -> Option<Role> {
        self.capabilities().claimed_role
    }

    #[must_use]
    pub const fn is_challengeable(self) -> bool {
        self.capabilities().claimed_role.is_some()
    }

    #[must_use]
    pub const fn is_blockable(self) -> bool {
        !self.capabilities().blocked_by.is_empty()
    }

    /// Whether `role` is a legal blocking claim against this action.
    #[must_use]
    pub fn can_be_blocked_by(self, role: Role) -> bool {
        self.capabilities().blocked_by.contains(&role)
    }

    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ActionKind::Income => "income",
            ActionKind::ForeignAid => "foreign_aid",
            ActionKind::Coup => "coup",
            ActionKind::Tax => "tax",
            ActionKind::Assassinate => "assassinate",
            ActionKind::Steal => "steal",
            ActionKind::Exchange => "exchange",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A command issued by one seat against its match.
///
/// The issuing seat is not part of the command; the service resolves it from
/// the reconnect token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    DeclareAction {
        action: ActionKind,
        target: Option<SeatId>,
    },
    Pass,
    ChallengeAction,
    DeclareBlock {
        role: Role,
    },
    ChallengeBlock,
    ChooseInfluenceLoss {
        role: Role,
    },
    ChooseExchangeCards {
        keep: Vec<Role>,
    },
    Abandon,
}

impl Command {
    /// Short name used in logs and error messages.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Command::DeclareAction { .. } => "declare_action",
            Command::Pass => "pass",
            Command::ChallengeAction => "challenge_action",
            Command::DeclareBlock { .. } => "declare_block",
            Command::ChallengeBlock => "challenge_block",
            Command::ChooseInfluenceLoss { .. } => "choose_influence_loss",
            Command::ChooseExchangeCards { .. } => "choose_exchange_cards",
            Command::Abandon => "abandon",
        }
    }
}
