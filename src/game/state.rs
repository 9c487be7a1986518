use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::card::{Card, CardId, Suit, DECK_SIZE, RANKS_PER_SUIT};

pub const FOUNDATION_COUNT: usize = 4;
pub const TABLEAU_COUNT: usize = 7;

/// A pile, bottom first. The last card is the top.
pub type Pile = Vec<Card>;

/// Addresses one pile on the board.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PileId {
    Stock,
    Waste,
    Foundation { index: usize },
    Tableau { index: usize },
}

impl fmt::Display for PileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PileId::Stock => write!(f, "stock"),
            PileId::Waste => write!(f, "waste"),
            PileId::Foundation { index } => write!(f, "foundation {}", index + 1),
            PileId::Tableau { index } => write!(f, "tableau {}", index + 1),
        }
    }
}

/// A card position: the pile plus the offset from the bottom of that pile.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct CardLocation {
    pub pile: PileId,
    pub offset: usize,
}

impl CardLocation {
    pub fn new(pile: PileId, offset: usize) -> Self {
        Self { pile, offset }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl FromStr for Difficulty {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "easy" | "draw1" => Ok(Difficulty::Easy),
            "medium" | "normal" | "draw3" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            _ => Err(()),
        }
    }
}

const HARD_PASS_LIMIT: u32 = 2;

fn default_draw_count() -> u8 {
    1
}

fn default_auto_complete() -> bool {
    true
}

/// Rules in force for one deal. Only changed by starting a new game.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameConfig {
    #[serde(default = "default_draw_count")]
    pub draw_count: u8,
    /// Number of waste-to-stock recycles allowed; `None` means unlimited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pass_limit: Option<u32>,
    #[serde(default = "default_auto_complete")]
    pub auto_complete: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit_secs: Option<u32>,
}

impl GameConfig {
    pub fn from_difficulty(difficulty: Difficulty) -> Self {
        match difficulty {
            Difficulty::Easy => Self::default(),
            Difficulty::Medium => Self::default().with_draw_count(3),
            Difficulty::Hard => Self::default()
                .with_draw_count(3)
                .with_pass_limit(Some(HARD_PASS_LIMIT)),
        }
    }

    /// Anything other than 3 is treated as draw-one.
    pub fn with_draw_count(mut self, draw_count: u8) -> Self {
        self.draw_count = if draw_count == 3 { 3 } else { 1 };
        self
    }

    pub fn with_pass_limit(mut self, pass_limit: Option<u32>) -> Self {
        self.pass_limit = pass_limit;
        self
    }

    pub fn with_auto_complete(mut self, enabled: bool) -> Self {
        self.auto_complete = enabled;
        self
    }

    pub fn with_time_limit(mut self, secs: Option<u32>) -> Self {
        self.time_limit_secs = secs;
        self
    }

    pub(crate) fn normalized(self) -> Self {
        let draw_count = self.draw_count;
        self.with_draw_count(draw_count)
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            draw_count: default_draw_count(),
            pass_limit: None,
            auto_complete: default_auto_complete(),
            time_limit_secs: None,
        }
    }
}

/// Notifications emitted by state transitions, in the order they happened.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum GameEvent {
    CardsDrawn {
        cards: Vec<CardId>,
    },
    WasteRecycled {
        count: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        passes_remaining: Option<u32>,
    },
    CardsMoved {
        from: CardLocation,
        to: PileId,
        cards: Vec<CardId>,
        #[serde(default)]
        automatic: bool,
    },
    CardRevealed {
        location: CardLocation,
        card: CardId,
    },
    GameWon {
        score: u32,
    },
    GameLost {
        elapsed_secs: u32,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
#[serde(tag = "type")]
pub enum IntegrityError {
    #[error("expected 52 cards, found {count}")]
    WrongCardCount { count: usize },
    #[error("card {card} appears more than once")]
    DuplicateCard { card: CardId },
    #[error("face-up card {card} in the stock")]
    FaceUpInStock { card: CardId },
    #[error("face-down card {card} in {pile}")]
    FaceDownCard { pile: PileId, card: CardId },
    #[error("foundation {index} is out of order")]
    FoundationOutOfOrder { index: usize },
    #[error("{remaining} passes left but the limit is {limit}")]
    PassesExceedLimit { remaining: u32, limit: u32 },
}

/// Complete, serializable board snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameState {
    #[serde(default)]
    pub stock: Pile,
    #[serde(default)]
    pub waste: Pile,
    #[serde(default)]
    pub foundations: [Pile; FOUNDATION_COUNT],
    #[serde(default)]
    pub tableaus: [Pile; TABLEAU_COUNT],
    #[serde(default)]
    pub config: GameConfig,
    /// Recycles still allowed under a pass limit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passes_remaining: Option<u32>,
    #[serde(default)]
    pub score: u32,
    #[serde(default)]
    pub moves: u32,
}

impl GameState {
    pub fn empty(config: GameConfig) -> Self {
        let config = config.normalized();
        Self {
            stock: Vec::new(),
            waste: Vec::new(),
            foundations: Default::default(),
            tableaus: Default::default(),
            passes_remaining: config.pass_limit,
            config,
            score: 0,
            moves: 0,
        }
    }

    pub fn pile(&self, id: PileId) -> Option<&Pile> {
        match id {
            PileId::Stock => Some(&self.stock),
            PileId::Waste => Some(&self.waste),
            PileId::Foundation { index } => self.foundations.get(index),
            PileId::Tableau { index } => self.tableaus.get(index),
        }
    }

    pub fn pile_mut(&mut self, id: PileId) -> Option<&mut Pile> {
        match id {
            PileId::Stock => Some(&mut self.stock),
            PileId::Waste => Some(&mut self.waste),
            PileId::Foundation { index } => self.foundations.get_mut(index),
            PileId::Tableau { index } => self.tableaus.get_mut(index),
        }
    }

    pub fn card_at(&self, location: CardLocation) -> Option<&Card> {
        self.pile(location.pile)?.get(location.offset)
    }

    pub fn top_card(&self, id: PileId) -> Option<&Card> {
        self.pile(id)?.last()
    }

    /// Location of the top card of a pile, if it has one.
    pub fn top_location(&self, id: PileId) -> Option<CardLocation> {
        let len = self.pile(id)?.len();
        len.checked_sub(1).map(|offset| CardLocation::new(id, offset))
    }

    pub fn foundation_suit(index: usize) -> Option<Suit> {
        Suit::ALL.get(index).copied()
    }

    pub fn foundation_for(suit: Suit) -> PileId {
        PileId::Foundation {
            index: suit.index(),
        }
    }

    pub fn foundation_total(&self) -> usize {
        self.foundations.iter().map(Vec::len).sum()
    }

    pub fn is_won(&self) -> bool {
        self.foundations
            .iter()
            .all(|pile| pile.len() == RANKS_PER_SUIT)
    }

    /// Cards visible in the draw window: the last `draw_count` waste cards.
    pub fn waste_window(&self) -> &[Card] {
        let window = usize::from(self.config.draw_count).max(1);
        let start = self.waste.len().saturating_sub(window);
        &self.waste[start..]
    }

    fn all_cards(&self) -> impl Iterator<Item = &Card> {
        self.stock
            .iter()
            .chain(self.waste.iter())
            .chain(self.foundations.iter().flatten())
            .chain(self.tableaus.iter().flatten())
    }

    pub fn card_count(&self) -> usize {
        self.all_cards().count()
    }

    /// Brings a deserialized board in line with its config, then checks it.
    /// A missing pass counter under a pass limit starts full.
    pub fn restore(mut self) -> Result<Self, IntegrityError> {
        self.config = self.config.normalized();
        self.passes_remaining = match (self.config.pass_limit, self.passes_remaining) {
            (None, _) => None,
            (Some(limit), None) => Some(limit),
            (Some(limit), Some(remaining)) if remaining > limit => {
                return Err(IntegrityError::PassesExceedLimit { remaining, limit });
            }
            (Some(_), remaining) => remaining,
        };
        self.integrity_check()?;
        Ok(self)
    }

    /// Checks the 52-card partition and the per-pile orientation rules.
    pub fn integrity_check(&self) -> Result<(), IntegrityError> {
        let mut seen = HashSet::with_capacity(DECK_SIZE);
        for card in self.all_cards() {
            if !seen.insert(card.id()) {
                return Err(IntegrityError::DuplicateCard { card: card.id() });
            }
        }
        if seen.len() != DECK_SIZE {
            return Err(IntegrityError::WrongCardCount { count: seen.len() });
        }

        if let Some(card) = self.stock.iter().find(|card| card.face_up) {
            return Err(IntegrityError::FaceUpInStock { card: card.id() });
        }
        if let Some(card) = self.waste.iter().find(|card| !card.face_up) {
            return Err(IntegrityError::FaceDownCard {
                pile: PileId::Waste,
                card: card.id(),
            });
        }

        for (index, pile) in self.foundations.iter().enumerate() {
            if let Some(card) = pile.iter().find(|card| !card.face_up) {
                return Err(IntegrityError::FaceDownCard {
                    pile: PileId::Foundation { index },
                    card: card.id(),
                });
            }
            let in_order = pile.iter().enumerate().all(|(pos, card)| {
                Some(card.suit) == Self::foundation_suit(index)
                    && usize::from(card.rank.value()) == pos + 1
            });
            if !in_order {
                return Err(IntegrityError::FoundationOutOfOrder { index });
            }
        }

        Ok(())
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::empty(GameConfig::default())
    }
}
