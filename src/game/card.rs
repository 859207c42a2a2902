//! Card Model
//!
//! The 3^4 attribute space and the stable card-id table used at the
//! transport boundary.

use std::fmt;
use serde::{Serialize, Deserialize};

use crate::core::rng::DeterministicRng;

/// Number of distinct cards (3 values for each of 4 attributes).
pub const CARD_COUNT: usize = 81;

/// External card identifier in `0..CARD_COUNT`.
pub type CardId = u8;

// =============================================================================
// ATTRIBUTES
// =============================================================================

/// Card color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Color {
    /// Red
    Red = 0,
    /// Green
    Green = 1,
    /// Purple
    Purple = 2,
}

/// Card shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Shape {
    /// Diamond
    Diamond = 0,
    /// Oval
    Oval = 1,
    /// Squiggle
    Squiggle = 2,
}

/// Number of symbols on the card.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Number {
    /// One symbol
    One = 0,
    /// Two symbols
    Two = 1,
    /// Three symbols
    Three = 2,
}

/// Card shading.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Shading {
    /// Solid fill
    Solid = 0,
    /// Striped fill
    Striped = 1,
    /// No fill
    Open = 2,
}

impl Color {
    /// All colors in canonical order.
    pub const ALL: [Color; 3] = [Color::Red, Color::Green, Color::Purple];
}

impl Shape {
    /// All shapes in canonical order.
    pub const ALL: [Shape; 3] = [Shape::Diamond, Shape::Oval, Shape::Squiggle];
}

impl Number {
    /// All numbers in canonical order.
    pub const ALL: [Number; 3] = [Number::One, Number::Two, Number::Three];

    /// Symbol count (1-3).
    pub fn count(self) -> u8 {
        self as u8 + 1
    }
}

impl Shading {
    /// All shadings in canonical order.
    pub const ALL: [Shading; 3] = [Shading::Solid, Shading::Striped, Shading::Open];
}

// =============================================================================
// CARD
// =============================================================================

/// A single card. Equality and hashing use the full attribute tuple.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Card {
    /// Color attribute
    pub color: Color,
    /// Shape attribute
    pub shape: Shape,
    /// Number attribute
    pub number: Number,
    /// Shading attribute
    pub shading: Shading,
}

impl Card {
    /// Create a card from its four attributes.
    pub const fn new(color: Color, shape: Shape, number: Number, shading: Shading) -> Self {
        Self { color, shape, number, shading }
    }

    /// Attribute indices in (color, shape, number, shading) order.
    #[inline]
    pub fn attributes(&self) -> [u8; 4] {
        [
            self.color as u8,
            self.shape as u8,
            self.number as u8,
            self.shading as u8,
        ]
    }

    /// Rebuild a card from attribute indices (each 0-2).
    pub fn from_attributes(attrs: [u8; 4]) -> Option<Self> {
        Some(Self {
            color: *Color::ALL.get(attrs[0] as usize)?,
            shape: *Shape::ALL.get(attrs[1] as usize)?,
            number: *Number::ALL.get(attrs[2] as usize)?,
            shading: *Shading::ALL.get(attrs[3] as usize)?,
        })
    }

    /// Canonical position in the attribute space (base-3 digits), `0..81`.
    #[inline]
    pub fn ordinal(&self) -> usize {
        self.attributes()
            .iter()
            .fold(0usize, |acc, &a| acc * 3 + a as usize)
    }

    /// Inverse of [`Card::ordinal`].
    pub fn from_ordinal(ordinal: usize) -> Option<Self> {
        if ordinal >= CARD_COUNT {
            return None;
        }
        Self::from_attributes([
            (ordinal / 27) as u8,
            (ordinal / 9 % 3) as u8,
            (ordinal / 3 % 3) as u8,
            (ordinal % 3) as u8,
        ])
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:?} {:?} {:?}",
            self.number.count(),
            self.color,
            self.shading,
            self.shape,
        )
    }
}

/// Every card in canonical (ordinal) order.
pub fn all_cards() -> Vec<Card> {
    let mut cards = Vec::with_capacity(CARD_COUNT);
    for color in Color::ALL {
        for shape in Shape::ALL {
            for number in Number::ALL {
                for shading in Shading::ALL {
                    cards.push(Card::new(color, shape, number, shading));
                }
            }
        }
    }
    cards
}

// =============================================================================
// CARD TABLE
// =============================================================================

/// Bidirectional card <-> id table, built once per game.
///
/// Forward lookup is an array index; reverse lookup is direct-mapped by
/// [`Card::ordinal`]. Ids are a seeded permutation, so they carry no
/// attribute information.
#[derive(Clone, Debug)]
pub struct CardTable {
    cards: [Card; CARD_COUNT],
    ids: [CardId; CARD_COUNT],
}

impl CardTable {
    /// Table where each card's id is its ordinal.
    pub fn canonical() -> Self {
        let mut cards = [Card::new(Color::Red, Shape::Diamond, Number::One, Shading::Solid); CARD_COUNT];
        let mut ids = [0; CARD_COUNT];
        for (i, card) in all_cards().into_iter().enumerate() {
            cards[i] = card;
            ids[i] = i as CardId;
        }
        Self { cards, ids }
    }

    /// Table with ids assigned from a shuffled permutation.
    pub fn shuffled(rng: &mut DeterministicRng) -> Self {
        let mut order = all_cards();
        rng.shuffle(&mut order);

        let mut table = Self::canonical();
        for (id, card) in order.into_iter().enumerate() {
            table.cards[id] = card;
            table.ids[card.ordinal()] = id as CardId;
        }
        table
    }

    /// Look up the card for an id.
    #[inline]
    pub fn card(&self, id: CardId) -> Option<Card> {
        self.cards.get(id as usize).copied()
    }

    /// Look up the id for a card.
    #[inline]
    pub fn id(&self, card: &Card) -> CardId {
        self.ids[card.ordinal()]
    }
}

impl Default for CardTable {
    fn default() -> Self {
        Self::canonical()
    }
}
