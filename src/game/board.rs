//! Board Lifecycle
//!
//! Initial deal and replenishment. Both top up once with 3 extra cards when
//! the board holds no set; this is best-effort and never loops.

use serde::{Serialize, Deserialize};

use crate::game::card::Card;
use crate::game::deck::Deck;
use crate::game::rules::{find_any_set, count_sets};

/// Default number of face-up cards.
pub const DEFAULT_BOARD_SIZE: usize = 12;

/// Cards drawn per replenishment or top-up.
pub const DRAW_SIZE: usize = 3;

/// Face-up cards shared by every player.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    cards: Vec<Card>,
}

impl Board {
    /// Board holding exactly these cards.
    pub fn from_cards(cards: Vec<Card>) -> Self {
        Self { cards }
    }

    /// Deal the first board of a game.
    ///
    /// Draws `count` cards; if they hold no set, draws up to 3 more.
    pub fn deal(deck: &mut Deck, count: usize) -> Self {
        let mut board = Self { cards: deck.draw(count) };
        if !board.has_set() {
            board.cards.extend(deck.draw(DRAW_SIZE));
        }
        board
    }

    /// Remove a winning set and refill from the deck.
    ///
    /// Winning cards are matched by value. With at least 3 cards in the deck
    /// this draws 3, then 3 more if the board still has no set and the deck
    /// allows it. With fewer than 3 left, the rest of the deck is appended.
    pub fn replenish(&mut self, winning: &[Card], deck: &mut Deck) {
        self.cards.retain(|c| !winning.contains(c));

        if deck.len() >= DRAW_SIZE {
            self.cards.extend(deck.draw(DRAW_SIZE));
            if !self.has_set() && deck.len() >= DRAW_SIZE {
                self.cards.extend(deck.draw(DRAW_SIZE));
            }
        } else {
            self.cards.extend(deck.draw_all());
        }
    }

    /// Check that every card is face-up.
    pub fn contains_all(&self, cards: &[Card]) -> bool {
        cards.iter().all(|c| self.cards.contains(c))
    }

    /// True if any 3 cards form a set.
    pub fn has_set(&self) -> bool {
        find_any_set(&self.cards).is_some()
    }

    /// First set in board order, if any.
    pub fn find_set(&self) -> Option<[Card; 3]> {
        find_any_set(&self.cards)
    }

    /// Total sets on the board.
    pub fn set_count(&self) -> usize {
        count_sets(&self.cards)
    }

    /// Cards in display order.
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    /// Number of face-up cards.
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// True when no cards are face-up.
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}
