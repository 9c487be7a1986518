//! Auto-complete: keep sending safe cards to their foundations until none
//! qualify.

use super::card::CardId;
use super::rules::{Move, RuleEngine};
use super::state::{GameEvent, GameState, PileId};

/// First card that can go to its foundation, checking the waste top and then
/// each face-up tableau top from left to right. The `held` card is skipped.
pub fn next_auto_move(state: &GameState, held: Option<CardId>) -> Option<Move> {
    let tableau_tops = (0..state.tableaus.len()).map(|index| PileId::Tableau { index });

    std::iter::once(PileId::Waste)
        .chain(tableau_tops)
        .filter_map(|pile| state.top_location(pile))
        .find_map(|from| {
            let card = state.card_at(from)?;
            if !card.face_up || Some(card.id()) == held {
                return None;
            }
            let mv = Move::relocate(from, GameState::foundation_for(card.suit));
            RuleEngine::validate(state, &mv).ok().map(|_| mv)
        })
}

/// Runs auto-moves to a fixed point. Each move adds a card to a foundation,
/// so this stops after at most 52 iterations.
pub fn run_to_fixed_point(state: &mut GameState, held: Option<CardId>) -> Vec<GameEvent> {
    let mut events = Vec::new();
    while let Some(Move::Relocate { from, to }) = next_auto_move(state, held) {
        let applied = RuleEngine::execute_relocate(state, from, to, true);
        if applied.is_empty() {
            break;
        }
        events.extend(applied);
    }
    events
}
