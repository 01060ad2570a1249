//! The five court roles (influence cards).

use serde::{Deserialize, Serialize};

/// A role token. The court deck holds `copies_per_role` of each.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Duke,
    Assassin,
    Captain,
    Ambassador,
    Contessa,
}

impl Role {
    /// Every role, in deck-building order.
    pub const ALL: [Role; 5] = [
        Role::Duke,
        Role::Assassin,
        Role::Captain,
        Role::Ambassador,
        Role::Contessa,
    ];

    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Role::Duke => "duke",
            Role::Assassin => "assassin",
            Role::Captain => "captain",
            Role::Ambassador => "ambassador",
            Role::Contessa => "contessa",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
