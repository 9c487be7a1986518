use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::card::{Card, Rank, Suit};
use super::score;
use super::state::{
    CardLocation, GameEvent, GameState, IntegrityError, PileId, FOUNDATION_COUNT, TABLEAU_COUNT,
};
use crate::utils;

/// A proposed transition.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Move {
    /// Stock to waste, or recycle the waste when the stock is empty.
    Draw,
    /// Move the card at `from` and every card above it onto `to`.
    Relocate { from: CardLocation, to: PileId },
}

impl Move {
    pub fn relocate(from: CardLocation, to: PileId) -> Self {
        Move::Relocate { from, to }
    }
}

/// Why a move was refused. The `Display` text is the user-facing reason.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
#[serde(tag = "type")]
pub enum RuleError {
    #[error("the game is over")]
    GameOver,
    #[error("no such pile: {pile}")]
    UnknownPile { pile: PileId },
    #[error("cannot move cards out of the {pile}")]
    InvalidSource { pile: PileId },
    #[error("cannot place cards on the {pile}")]
    InvalidDestination { pile: PileId },
    #[error("source and destination are the same pile")]
    SamePile,
    #[error("no card at position {offset} of {pile}")]
    NoCardAt { pile: PileId, offset: usize },
    #[error("only the top card of the {pile} can be moved")]
    NotTopCard { pile: PileId },
    #[error("card is face down")]
    FaceDownCard,
    #[error("cards being moved are not a valid run")]
    BrokenRun,
    #[error("only one card at a time can go to a foundation")]
    MultipleCardsToFoundation { count: usize },
    #[error("wrong suit for this foundation")]
    WrongSuit { expected: Suit, actual: Suit },
    #[error("only an ace can start a foundation")]
    FoundationNeedsAce,
    #[error("card not in sequence for foundation")]
    FoundationOutOfSequence,
    #[error("only a king can go on an empty tableau")]
    EmptyTableauNeedsKing,
    #[error("cannot place on a face-down card")]
    DestinationFaceDown,
    #[error("same color")]
    SameColor,
    #[error("card not in descending order")]
    NotDescending,
    #[error("stock and waste are both empty")]
    NothingToDraw,
    #[error("no passes remaining")]
    NoPassesRemaining,
    #[error("integrity violation: {error}")]
    IntegrityViolation { error: IntegrityError },
}

impl RuleError {
    pub fn reason(&self) -> String {
        self.to_string()
    }
}

/// Pure move validation and state transitions.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleEngine;

impl RuleEngine {
    fn ensure_pile(state: &GameState, pile: PileId) -> Result<&Vec<Card>, RuleError> {
        state.pile(pile).ok_or(RuleError::UnknownPile { pile })
    }

    fn ensure_draw(state: &GameState) -> Result<(), RuleError> {
        if !state.stock.is_empty() {
            return Ok(());
        }
        if state.waste.is_empty() {
            return Err(RuleError::NothingToDraw);
        }
        if state.passes_remaining == Some(0) {
            return Err(RuleError::NoPassesRemaining);
        }
        Ok(())
    }

    /// The run that would leave `from`, validated as a movable unit.
    fn movable_run(state: &GameState, from: CardLocation) -> Result<&[Card], RuleError> {
        let pile = Self::ensure_pile(state, from.pile)?;
        let card = pile.get(from.offset).ok_or(RuleError::NoCardAt {
            pile: from.pile,
            offset: from.offset,
        })?;

        match from.pile {
            PileId::Stock => return Err(RuleError::InvalidSource { pile: from.pile }),
            PileId::Waste | PileId::Foundation { .. } => {
                if from.offset + 1 != pile.len() {
                    return Err(RuleError::NotTopCard { pile: from.pile });
                }
            }
            PileId::Tableau { .. } => {}
        }
        if !card.face_up {
            return Err(RuleError::FaceDownCard);
        }

        let run = &pile[from.offset..];
        let well_formed = run.windows(2).all(|pair| {
            pair[1].face_up
                && pair[0].color() != pair[1].color()
                && pair[1].rank.value() + 1 == pair[0].rank.value()
        });
        if !well_formed {
            return Err(RuleError::BrokenRun);
        }
        Ok(run)
    }

    /// Foundation build law. Slot `index` only ever holds `Suit::ALL[index]`.
    pub fn can_build_foundation(
        state: &GameState,
        index: usize,
        card: &Card,
    ) -> Result<(), RuleError> {
        let pile = PileId::Foundation { index };
        let expected = GameState::foundation_suit(index).ok_or(RuleError::UnknownPile { pile })?;
        if card.suit != expected {
            return Err(RuleError::WrongSuit {
                expected,
                actual: card.suit,
            });
        }
        match state.top_card(pile) {
            None if card.rank == Rank::Ace => Ok(()),
            None => Err(RuleError::FoundationNeedsAce),
            Some(top) if top.suit == card.suit && top.rank.value() + 1 == card.rank.value() => {
                Ok(())
            }
            Some(_) => Err(RuleError::FoundationOutOfSequence),
        }
    }

    /// Tableau build law for a run whose first card is `head`.
    pub fn can_build_tableau(
        state: &GameState,
        index: usize,
        head: &Card,
    ) -> Result<(), RuleError> {
        let pile = PileId::Tableau { index };
        Self::ensure_pile(state, pile)?;
        match state.top_card(pile) {
            None if head.rank == Rank::King => Ok(()),
            None => Err(RuleError::EmptyTableauNeedsKing),
            Some(top) if !top.face_up => Err(RuleError::DestinationFaceDown),
            Some(top) if top.color() == head.color() => Err(RuleError::SameColor),
            Some(top) if head.rank.value() + 1 != top.rank.value() => {
                Err(RuleError::NotDescending)
            }
            Some(_) => Ok(()),
        }
    }

    /// Checks a move without touching the state.
    pub fn validate(state: &GameState, mv: &Move) -> Result<(), RuleError> {
        let (from, to) = match *mv {
            Move::Draw => return Self::ensure_draw(state),
            Move::Relocate { from, to } => (from, to),
        };

        Self::ensure_pile(state, to)?;
        if from.pile == to {
            return Err(RuleError::SamePile);
        }
        let run = Self::movable_run(state, from)?;
        let head = &run[0];

        match to {
            PileId::Stock | PileId::Waste => Err(RuleError::InvalidDestination { pile: to }),
            PileId::Foundation { index } => {
                if run.len() > 1 {
                    return Err(RuleError::MultipleCardsToFoundation { count: run.len() });
                }
                Self::can_build_foundation(state, index, head)
            }
            PileId::Tableau { index } => Self::can_build_tableau(state, index, head),
        }
    }

    /// Applies a move the caller has already validated.
    pub fn execute(state: &mut GameState, mv: &Move) -> Vec<GameEvent> {
        match *mv {
            Move::Draw => Self::execute_draw(state),
            Move::Relocate { from, to } => Self::execute_relocate(state, from, to, false),
        }
    }

    /// Validates and executes. A rejected move leaves `state` untouched.
    pub fn apply(state: &mut GameState, mv: &Move) -> Result<Vec<GameEvent>, RuleError> {
        Self::validate(state, mv)?;
        Ok(Self::execute(state, mv))
    }

    fn execute_draw(state: &mut GameState) -> Vec<GameEvent> {
        if state.stock.is_empty() {
            return Self::recycle_waste(state);
        }

        let count = usize::from(state.config.draw_count).min(state.stock.len());
        let mut drawn = Vec::with_capacity(count);
        for _ in 0..count {
            if let Some(mut card) = state.stock.pop() {
                card.face_up = true;
                drawn.push(card.id());
                state.waste.push(card);
            }
        }
        vec![GameEvent::CardsDrawn { cards: drawn }]
    }

    fn recycle_waste(state: &mut GameState) -> Vec<GameEvent> {
        if state.waste.is_empty() {
            return Vec::new();
        }
        if let Some(passes) = state.passes_remaining.as_mut() {
            if *passes == 0 {
                return Vec::new();
            }
            *passes -= 1;
        }

        let count = state.waste.len();
        utils::log(&format!(
            "recycling {count} waste cards, passes left {:?}",
            state.passes_remaining
        ));
        state.stock = state
            .waste
            .drain(..)
            .rev()
            .map(|mut card| {
                card.face_up = false;
                card
            })
            .collect();
        vec![GameEvent::WasteRecycled {
            count,
            passes_remaining: state.passes_remaining,
        }]
    }

    pub(crate) fn execute_relocate(
        state: &mut GameState,
        from: CardLocation,
        to: PileId,
        automatic: bool,
    ) -> Vec<GameEvent> {
        let run = match state.pile_mut(from.pile) {
            Some(pile) if from.offset < pile.len() => pile.split_off(from.offset),
            _ => return Vec::new(),
        };
        let cards = run.iter().map(Card::id).collect();

        let mut events = Vec::new();
        let mut revealed = false;
        if let PileId::Tableau { .. } = from.pile {
            if let Some(pile) = state.pile_mut(from.pile) {
                if let Some(top) = pile.last_mut().filter(|card| !card.face_up) {
                    top.face_up = true;
                    revealed = true;
                    events.push(GameEvent::CardRevealed {
                        location: CardLocation::new(from.pile, from.offset - 1),
                        card: top.id(),
                    });
                }
            }
        }

        match state.pile_mut(to) {
            Some(pile) => pile.extend(run),
            None => {
                // unreachable for validated moves; put the run back
                if let Some(pile) = state.pile_mut(from.pile) {
                    pile.extend(run);
                }
                return Vec::new();
            }
        }

        state.score = score::apply(state.score, score::for_move(from.pile, to, revealed));
        events.insert(
            0,
            GameEvent::CardsMoved {
                from,
                to,
                cards,
                automatic,
            },
        );
        events
    }

    /// Every legal relocation from the current position, draws excluded.
    pub fn legal_relocations(state: &GameState) -> Vec<Move> {
        let mut sources = Vec::new();
        if let Some(top) = state.top_location(PileId::Waste) {
            sources.push(top);
        }
        for index in 0..FOUNDATION_COUNT {
            if let Some(top) = state.top_location(PileId::Foundation { index }) {
                sources.push(top);
            }
        }
        for (index, pile) in state.tableaus.iter().enumerate() {
            for (offset, card) in pile.iter().enumerate() {
                if card.face_up {
                    sources.push(CardLocation::new(PileId::Tableau { index }, offset));
                }
            }
        }

        let destinations = (0..FOUNDATION_COUNT)
            .map(|index| PileId::Foundation { index })
            .chain((0..TABLEAU_COUNT).map(|index| PileId::Tableau { index }));

        destinations
            .flat_map(|to| sources.iter().map(move |&from| Move::relocate(from, to)))
            .filter(|mv| Self::validate(state, mv).is_ok())
            .collect()
    }
}
