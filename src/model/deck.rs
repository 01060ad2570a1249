//! The court deck.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::core::{GameRng, Role};

/// Hidden cards held by one seat. Two normally, up to four during Exchange.
pub type Hand = SmallVec<[Role; 4]>;

/// Face-down role cards. Index 0 is the top of the deck.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deck {
    cards: Vec<Role>,
}

impl Deck {
    /// Build a deck holding `copies` of every role, shuffled.
    #[must_use]
    pub fn standard(copies: usize, rng: &mut GameRng) -> Self {
        let mut cards: Vec<Role> = Role::ALL
            .iter()
            .flat_map(|&role| std::iter::repeat(role).take(copies))
            .collect();
        rng.shuffle(&mut cards);
        Self { cards }
    }

    /// An empty deck (lobby and reset matches).
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Take up to `n` cards from the top.
    pub fn draw(&mut self, n: usize) -> Hand {
        let n = n.min(self.cards.len());
        self.cards.drain(..n).collect()
    }

    /// Put cards back and reshuffle the whole deck.
    pub fn return_and_shuffle(&mut self, cards: impl IntoIterator<Item = Role>, rng: &mut GameRng) {
        self.cards.extend(cards);
        rng.shuffle(&mut self.cards);
    }

    /// Remove one copy of `role`, wherever it is. Used to rig deals.
    pub fn remove(&mut self, role: Role) -> Option<Role> {
        let pos = self.cards.iter().position(|&c| c == role)?;
        Some(self.cards.remove(pos))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Copies of `role` in the deck.
    #[must_use]
    pub fn count(&self, role: Role) -> usize {
        self.cards.iter().filter(|&&c| c == role).count()
    }

    #[must_use]
    pub fn cards(&self) -> &[Role] {
        &self.cards
    }
}
