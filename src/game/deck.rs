//! Deck
//!
//! Shuffled draw pile. Cards leave from the front.

use std::collections::VecDeque;

use crate::core::rng::DeterministicRng;
use crate::game::card::{all_cards, Card};

/// Ordered draw pile.
#[derive(Clone, Debug, Default)]
pub struct Deck {
    cards: VecDeque<Card>,
}

impl Deck {
    /// A deck in exactly the given order (first element is drawn first).
    pub fn from_cards(cards: Vec<Card>) -> Self {
        Self { cards: cards.into() }
    }

    /// Draw up to `count` cards from the front.
    pub fn draw(&mut self, count: usize) -> Vec<Card> {
        let n = count.min(self.cards.len());
        self.cards.drain(..n).collect()
    }

    /// Draw every remaining card.
    pub fn draw_all(&mut self) -> Vec<Card> {
        self.cards.drain(..).collect()
    }

    /// Cards left.
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// True once every card has been dealt.
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Check membership.
    pub fn contains(&self, card: &Card) -> bool {
        self.cards.contains(card)
    }

    /// Iterate in draw order.
    pub fn iter(&self) -> impl Iterator<Item = &Card> {
        self.cards.iter()
    }
}

/// All 81 cards in uniformly shuffled order.
pub fn generate_deck(rng: &mut DeterministicRng) -> Deck {
    let mut cards = all_cards();
    rng.shuffle(&mut cards);
    Deck::from_cards(cards)
}
