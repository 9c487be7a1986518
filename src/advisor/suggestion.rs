//! Parsing advisor replies into moves the rule engine can check.
//!
//! A reply is either a structured JSON suggestion or free-text advice. A
//! structured suggestion only becomes a [`Move`] after it resolves against
//! the board and passes [`RuleEngine::validate`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::client::AdvisorError;
use crate::game::{
    Card, CardLocation, GameState, Move, PileId, Rank, RuleEngine, RuleError, Suit,
};

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum PileName {
    Stock,
    Waste,
    Foundation,
    Tableau,
}

#[derive(Debug, Deserialize)]
struct WirePile {
    pile: PileName,
    #[serde(default, alias = "pileIndex")]
    index: Option<usize>,
    #[serde(default, alias = "cardIndex")]
    card_index: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireCard {
    Code(String),
    Parts { rank: String, suit: String },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum WireMove {
    Draw,
    #[serde(alias = "relocate")]
    Move {
        from: WirePile,
        to: WirePile,
        #[serde(default)]
        cards: Vec<WireCard>,
    },
}

#[derive(Debug, Deserialize)]
struct WireReply {
    #[serde(rename = "move")]
    action: WireMove,
    #[serde(default)]
    reason: String,
}

/// A suggested action, resolved to board coordinates but not yet validated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SuggestedAction {
    Draw,
    Relocate {
        from: PileId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        card_index: Option<usize>,
        to: PileId,
        #[serde(default)]
        cards: Vec<Card>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Suggestion {
    pub action: SuggestedAction,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum AdvisorReply {
    Structured { suggestion: Suggestion },
    Instruction { text: String },
}

/// Why a structured suggestion could not be turned into a legal move.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
#[serde(tag = "type")]
pub enum SuggestionError {
    #[error("suggested card {card} is not a face-up card of the {pile}")]
    CardNotFound { pile: PileId, card: String },
    #[error("suggested cards do not match the {pile}")]
    CardsMismatch { pile: PileId },
    #[error("suggestion names no card to move from the {pile}")]
    MissingCard { pile: PileId },
    #[error("illegal suggestion: {error}")]
    Illegal { error: RuleError },
}

fn pile_id(wire: &WirePile) -> Result<PileId, AdvisorError> {
    let index = || {
        wire.index.ok_or_else(|| AdvisorError::MalformedResponse {
            message: format!("{:?} pile without an index", wire.pile),
        })
    };
    Ok(match wire.pile {
        PileName::Stock => PileId::Stock,
        PileName::Waste => PileId::Waste,
        PileName::Foundation => PileId::Foundation { index: index()? },
        PileName::Tableau => PileId::Tableau { index: index()? },
    })
}

fn wire_card(wire: &WireCard) -> Result<Card, AdvisorError> {
    let parsed = match wire {
        WireCard::Code(code) => Card::parse_code(code),
        WireCard::Parts { rank, suit } => rank
            .parse::<Rank>()
            .ok()
            .zip(suit.parse::<Suit>().ok())
            .map(|(rank, suit)| Card::new(suit, rank)),
    };
    parsed.ok_or_else(|| AdvisorError::MalformedResponse {
        message: format!("unreadable card {wire:?}"),
    })
}

fn from_wire(reply: WireReply) -> Result<Suggestion, AdvisorError> {
    let action = match reply.action {
        WireMove::Draw => SuggestedAction::Draw,
        WireMove::Move { from, to, cards } => SuggestedAction::Relocate {
            from: pile_id(&from)?,
            card_index: from.card_index,
            to: pile_id(&to)?,
            cards: cards.iter().map(wire_card).collect::<Result<_, _>>()?,
        },
    };
    Ok(Suggestion {
        action,
        reason: reply.reason,
    })
}

/// Drops a surrounding markdown code fence, with or without a language tag.
fn strip_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(body) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = body.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Reads an advisor's text reply. JSON that fails to parse is an error; any
/// other non-empty text is passed through as an instruction.
pub fn parse_reply(text: &str) -> Result<AdvisorReply, AdvisorError> {
    let body = strip_fence(text);
    if body.is_empty() {
        return Err(AdvisorError::MalformedResponse {
            message: "empty reply".to_owned(),
        });
    }
    if !body.starts_with('{') {
        return Ok(AdvisorReply::Instruction {
            text: body.to_owned(),
        });
    }
    let wire: WireReply =
        serde_json::from_str(body).map_err(|error| AdvisorError::MalformedResponse {
            message: error.to_string(),
        })?;
    Ok(AdvisorReply::Structured {
        suggestion: from_wire(wire)?,
    })
}

impl Suggestion {
    /// Resolves the suggestion on `state` and checks it is legal there.
    pub fn to_move(&self, state: &GameState) -> Result<Move, SuggestionError> {
        let mv = match &self.action {
            SuggestedAction::Draw => Move::Draw,
            SuggestedAction::Relocate {
                from,
                card_index,
                to,
                cards,
            } => {
                let offset = Self::source_offset(state, *from, *card_index, cards)?;
                Move::relocate(CardLocation::new(*from, offset), *to)
            }
        };
        RuleEngine::validate(state, &mv).map_err(|error| SuggestionError::Illegal { error })?;
        Ok(mv)
    }

    fn source_offset(
        state: &GameState,
        from: PileId,
        card_index: Option<usize>,
        cards: &[Card],
    ) -> Result<usize, SuggestionError> {
        let pile = state.pile(from).ok_or(SuggestionError::Illegal {
            error: RuleError::UnknownPile { pile: from },
        })?;

        let offset = match (cards.first(), card_index) {
            (Some(head), _) => pile
                .iter()
                .position(|card| card.face_up && card.same_card(head))
                .ok_or_else(|| SuggestionError::CardNotFound {
                    pile: from,
                    card: head.code(),
                })?,
            (None, Some(index)) => index,
            (None, None) => pile
                .len()
                .checked_sub(1)
                .ok_or(SuggestionError::MissingCard { pile: from })?,
        };

        if !cards.is_empty() {
            let run = pile.get(offset..).unwrap_or_default();
            let matches = run.len() == cards.len()
                && run.iter().zip(cards).all(|(card, named)| card.same_card(named));
            if !matches {
                return Err(SuggestionError::CardsMismatch { pile: from });
            }
        }
        Ok(offset)
    }
}

/// A reply evaluated against the position it was asked about.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdvisorHint {
    pub reply: AdvisorReply,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_move: Option<Move>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection: Option<SuggestionError>,
}

impl AdvisorHint {
    pub fn evaluate(reply: AdvisorReply, state: &GameState) -> Self {
        let (suggested_move, rejection) = match &reply {
            AdvisorReply::Structured { suggestion } => match suggestion.to_move(state) {
                Ok(mv) => (Some(mv), None),
                Err(error) => (None, Some(error)),
            },
            AdvisorReply::Instruction { .. } => (None, None),
        };
        Self {
            reply,
            suggested_move,
            rejection,
        }
    }
}
