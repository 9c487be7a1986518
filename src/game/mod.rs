//! Klondike rules: cards, deal, move validation, transitions, undo history.

pub mod autoplay;
pub mod card;
pub mod deck;
pub mod history;
pub mod rules;
pub mod score;
pub mod session;
pub mod state;

pub use card::{create_deck, Card, CardId, Color, Rank, Suit, DECK_SIZE};
pub use deck::{deal, shuffle};
pub use history::History;
pub use rules::{Move, RuleEngine, RuleError};
pub use session::{GameStatus, MoveReport, Solitaire, WinCallback};
pub use state::{
    CardLocation, Difficulty, GameConfig, GameEvent, GameState, IntegrityError, Pile, PileId,
    FOUNDATION_COUNT, TABLEAU_COUNT,
};
