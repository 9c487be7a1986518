use std::fmt::Write;

use once_cell::sync::Lazy;

use crate::game::{Card, GameConfig, GameState, FOUNDATION_COUNT};

/// Fixed part of every hint request: rules and the reply contract.
pub static SYSTEM_INSTRUCTION: Lazy<String> = Lazy::new(|| {
    let example = serde_json::json!({
        "move": {
            "type": "move",
            "from": { "pile": "tableau", "index": 2, "card_index": 3 },
            "to": { "pile": "foundation", "index": 1 },
            "cards": ["QH"]
        },
        "reason": "Frees the face-down card under the queen."
    });
    format!(
        "You are an expert Klondike Solitaire player. Suggest the single best next move.\n\
         \n\
         Rules:\n\
         - Foundations build up by suit from Ace to King. Foundation 0 is Spades, 1 Hearts, 2 Diamonds, 3 Clubs.\n\
         - Tableau piles build down in alternating colors.\n\
         - Only a King, or a run headed by a King, may move to an empty tableau pile.\n\
         - Any face-up tableau card may move together with every card above it.\n\
         - Only the top card of the waste is playable.\n\
         - Drawing with an empty stock turns the waste back into the stock.\n\
         \n\
         Prefer moves that reveal face-down tableau cards, then moves to the foundations. \
         If nothing else helps, draw.\n\
         \n\
         Cards are written rank then suit, e.g. QH is the Queen of Hearts and TS the Ten of Spades. \
         Pile indices are 0-based.\n\
         \n\
         Reply with JSON only, shaped like:\n{}\n\
         For a draw reply with {{\"move\": {{\"type\": \"draw\"}}, \"reason\": \"...\"}}.",
        serde_json::to_string_pretty(&example).unwrap_or_default()
    )
});

fn codes(cards: &[Card]) -> String {
    cards.iter().map(Card::code).collect::<Vec<_>>().join(", ")
}

/// The ruleset in force, in one sentence per rule.
pub fn ruleset_text(config: &GameConfig, passes_remaining: Option<u32>) -> String {
    let draw = if config.draw_count == 3 {
        "Draw 3 cards from the stock at a time."
    } else {
        "Draw 1 card from the stock at a time."
    };
    let redeals = match (config.pass_limit, passes_remaining) {
        (Some(limit), Some(left)) => format!("Limited redeals: {left} of {limit} left."),
        (Some(limit), None) => format!("Limited redeals: {limit}."),
        (None, _) => "Unlimited redeals.".to_owned(),
    };
    format!("{draw} {redeals}")
}

/// Text rendering of everything a player can see. Face-down cards are only
/// counted, never named.
pub fn describe_board(state: &GameState) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Stock: {} cards face down", state.stock.len());
    match state.waste.last() {
        None => {
            let _ = writeln!(out, "Waste: empty");
        }
        Some(top) => {
            let _ = writeln!(
                out,
                "Waste: {} cards, playable top {} (showing {})",
                state.waste.len(),
                top.code(),
                codes(state.waste_window())
            );
        }
    }

    let _ = writeln!(out, "Foundations:");
    for index in 0..FOUNDATION_COUNT {
        let suit = GameState::foundation_suit(index)
            .map(|suit| format!("{suit:?}"))
            .unwrap_or_default();
        let top = state.foundations[index]
            .last()
            .map(Card::code)
            .unwrap_or_else(|| "empty".to_owned());
        let _ = writeln!(out, "  Foundation {index} ({suit}): {top}");
    }

    let _ = writeln!(out, "Tableau:");
    for (index, pile) in state.tableaus.iter().enumerate() {
        let down = pile.iter().filter(|card| !card.face_up).count();
        let up: Vec<Card> = pile.iter().filter(|card| card.face_up).copied().collect();
        let shown = if up.is_empty() {
            "empty".to_owned()
        } else {
            codes(&up)
        };
        let _ = writeln!(out, "  Tableau {index}: [{down} down] [{shown}]");
    }

    out
}

/// User turn of the advisor conversation.
pub fn build_prompt(state: &GameState) -> String {
    format!(
        "Ruleset: {}\n\nCurrent game state:\n{}\nWhat is the best move?",
        ruleset_text(&state.config, state.passes_remaining),
        describe_board(state)
    )
}
