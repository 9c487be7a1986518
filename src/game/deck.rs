use rand::seq::SliceRandom;
use rand::Rng;

use super::card::Card;
use super::state::{GameConfig, GameState, TABLEAU_COUNT};

/// Uniform Fisher–Yates permutation of `deck`.
pub fn shuffle<R: Rng + ?Sized>(mut deck: Vec<Card>, rng: &mut R) -> Vec<Card> {
    deck.shuffle(rng);
    deck
}

/// Triangular deal: round `r` puts one card on every tableau `j >= r`, so
/// tableau `i` ends with `i + 1` cards. The remaining 24 cards become the stock.
/// Only the top card of each tableau is turned face up.
pub fn deal(deck: Vec<Card>, config: GameConfig) -> GameState {
    let mut state = GameState::empty(config);
    let mut cards = deck.into_iter().map(|mut card| {
        card.face_up = false;
        card
    });

    for round in 0..TABLEAU_COUNT {
        for pile in state.tableaus.iter_mut().skip(round) {
            if let Some(card) = cards.next() {
                pile.push(card);
            }
        }
    }
    for pile in state.tableaus.iter_mut() {
        if let Some(top) = pile.last_mut() {
            top.face_up = true;
        }
    }

    state.stock = cards.collect();
    state
}
