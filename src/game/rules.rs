//! Set Rules
//!
//! The set predicate and exhaustive board search.

use crate::game::card::Card;

/// Check whether the given cards form a set.
///
/// Returns false unless exactly 3 cards are given. For each attribute the
/// three values must be all equal or all different.
pub fn is_set(cards: &[Card]) -> bool {
    let [a, b, c] = match cards {
        [a, b, c] => [a.attributes(), b.attributes(), c.attributes()],
        _ => return false,
    };

    (0..4).all(|i| {
        let all_same = a[i] == b[i] && b[i] == c[i];
        let all_different = a[i] != b[i] && b[i] != c[i] && a[i] != c[i];
        all_same || all_different
    })
}

/// The unique card that completes a set with `a` and `b`.
///
/// Per attribute: the shared value if both agree, otherwise the third value.
/// With 0..3 indices that is `(6 - x - y) % 3`, which also covers x == y.
pub fn third_card(a: &Card, b: &Card) -> Card {
    let (x, y) = (a.attributes(), b.attributes());
    let mut attrs = [0u8; 4];
    for i in 0..4 {
        attrs[i] = (6 - x[i] - y[i]) % 3;
    }
    // Indices stay in 0..3, so this always resolves.
    Card::from_attributes(attrs).unwrap_or(*a)
}

/// Find the first set on the board.
///
/// Enumerates index triples `i < j < k` lexicographically and returns the
/// first match, so the result is deterministic for a given board order.
pub fn find_any_set(board: &[Card]) -> Option<[Card; 3]> {
    find_any_set_indices(board).map(|[i, j, k]| [board[i], board[j], board[k]])
}

/// Board positions of the first set, in the same order as [`find_any_set`].
pub fn find_any_set_indices(board: &[Card]) -> Option<[usize; 3]> {
    let n = board.len();
    for i in 0..n {
        for j in (i + 1)..n {
            for k in (j + 1)..n {
                if is_set(&[board[i], board[j], board[k]]) {
                    return Some([i, j, k]);
                }
            }
        }
    }
    None
}

/// Count every set on the board.
pub fn count_sets(board: &[Card]) -> usize {
    let n = board.len();
    let mut count = 0;
    for i in 0..n {
        for j in (i + 1)..n {
            for k in (j + 1)..n {
                if is_set(&[board[i], board[j], board[k]]) {
                    count += 1;
                }
            }
        }
    }
    count
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::game::card::{all_cards, Color, Shape, Number, Shading, CARD_COUNT};
    use proptest::prelude::*;

    pub(crate) fn card(color: Color, shape: Shape, number: u8, shading: Shading) -> Card {
        let number = Number::ALL[(number - 1) as usize];
        Card::new(color, shape, number, shading)
    }

    /// Twelve cards with no set among them.
    pub(crate) fn no_set_board() -> Vec<Card> {
        use Color::*;
        use Shape::*;
        use Shading::*;
        vec![
            card(Red, Diamond, 2, Striped),
            card(Green, Diamond, 3, Solid),
            card(Green, Squiggle, 1, Open),
            card(Purple, Oval, 3, Striped),
            card(Red, Squiggle, 3, Striped),
            card(Red, Diamond, 3, Open),
            card(Purple, Squiggle, 2, Striped),
            card(Green, Squiggle, 3, Striped),
            card(Green, Diamond, 2, Solid),
            card(Purple, Squiggle, 1, Open),
            card(Purple, Squiggle, 1, Solid),
            card(Red, Diamond, 1, Striped),
        ]
    }

    #[test]
    fn test_is_set_examples() {
        use Color::*;
        use Shape::*;
        use Shading::*;

        // numbers differ, rest same
        assert!(is_set(&[
            card(Red, Oval, 1, Solid),
            card(Red, Oval, 2, Solid),
            card(Red, Oval, 3, Solid),
        ]));
        // everything differs
        assert!(is_set(&[
            card(Red, Diamond, 1, Solid),
            card(Green, Squiggle, 2, Striped),
            card(Purple, Oval, 3, Open),
        ]));
        // two red, one green
        assert!(!is_set(&[
            card(Red, Oval, 1, Solid),
            card(Red, Oval, 2, Solid),
            card(Green, Oval, 3, Solid),
        ]));
        // only color differs
        assert!(is_set(&[
            card(Red, Oval, 1, Solid),
            card(Green, Oval, 1, Solid),
            card(Purple, Oval, 1, Solid),
        ]));
        // mixed
        assert!(is_set(&[
            card(Red, Oval, 1, Solid),
            card(Red, Squiggle, 2, Striped),
            card(Red, Diamond, 3, Open),
        ]));
    }

    #[test]
    fn test_is_set_wrong_count() {
        let cards = all_cards();
        assert!(!is_set(&[]));
        assert!(!is_set(&cards[..2]));
        assert!(!is_set(&cards[..4]));
    }

    #[test]
    fn test_find_any_set_none_on_fixture() {
        let board = no_set_board();
        assert_eq!(find_any_set(&board), None);
        assert_eq!(count_sets(&board), 0);
    }

    #[test]
    fn test_find_any_set_lexicographic() {
        let cards = all_cards();
        // Canonical order: first three cards differ only in shading.
        let board = &cards[..12];
        assert_eq!(find_any_set_indices(board), Some([0, 1, 2]));
        let found = find_any_set(board).unwrap();
        assert!(is_set(&found));
    }

    #[test]
    fn test_full_deck_set_count() {
        // Each of the C(81,2) pairs has exactly one completion; each set counted 3 times.
        assert_eq!(count_sets(&all_cards()), 81 * 80 / 2 / 3);
    }

    fn any_card() -> impl Strategy<Value = Card> {
        (0..CARD_COUNT).prop_map(|i| Card::from_ordinal(i).unwrap())
    }

    proptest! {
        #[test]
        fn prop_is_set_symmetric(a in any_card(), b in any_card(), c in any_card()) {
            let expected = is_set(&[a, b, c]);
            prop_assert_eq!(is_set(&[a, c, b]), expected);
            prop_assert_eq!(is_set(&[b, a, c]), expected);
            prop_assert_eq!(is_set(&[b, c, a]), expected);
            prop_assert_eq!(is_set(&[c, a, b]), expected);
            prop_assert_eq!(is_set(&[c, b, a]), expected);
        }

        #[test]
        fn prop_third_card_is_unique_completion(a in any_card(), b in any_card()) {
            prop_assume!(a != b);
            let c = third_card(&a, &b);
            prop_assert!(c != a && c != b);
            prop_assert!(is_set(&[a, b, c]));

            let completions = all_cards()
                .into_iter()
                .filter(|x| *x != a && *x != b && is_set(&[a, b, *x]))
                .count();
            prop_assert_eq!(completions, 1);
        }

        #[test]
        fn prop_find_any_set_agrees_with_count(seed in any::<u64>(), len in 3usize..=15) {
            let mut cards = all_cards();
            crate::core::rng::DeterministicRng::new(seed).shuffle(&mut cards);
            let board = &cards[..len];
            prop_assert_eq!(find_any_set(board).is_some(), count_sets(board) > 0);
        }
    }
}
