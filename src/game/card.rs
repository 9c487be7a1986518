use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Stable identity of a card: `suit_index * 13 + (rank - 1)`, in `0..52`.
pub type CardId = u8;

pub const DECK_SIZE: usize = 52;
pub const RANKS_PER_SUIT: usize = 13;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Suit {
    Spades,
    Hearts,
    Diamonds,
    Clubs,
}

impl Suit {
    /// Canonical order. Foundation slot `i` is built in `Suit::ALL[i]`.
    pub const ALL: [Suit; 4] = [Suit::Spades, Suit::Hearts, Suit::Diamonds, Suit::Clubs];

    pub fn index(self) -> usize {
        match self {
            Suit::Spades => 0,
            Suit::Hearts => 1,
            Suit::Diamonds => 2,
            Suit::Clubs => 3,
        }
    }

    pub fn color(self) -> Color {
        match self {
            Suit::Hearts | Suit::Diamonds => Color::Red,
            Suit::Spades | Suit::Clubs => Color::Black,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Suit::Spades => 'S',
            Suit::Hearts => 'H',
            Suit::Diamonds => 'D',
            Suit::Clubs => 'C',
        }
    }
}

impl FromStr for Suit {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "s" | "spade" | "spades" | "♠" => Ok(Suit::Spades),
            "h" | "heart" | "hearts" | "♥" => Ok(Suit::Hearts),
            "d" | "diamond" | "diamonds" | "♦" => Ok(Suit::Diamonds),
            "c" | "club" | "clubs" | "♣" => Ok(Suit::Clubs),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Color {
    Red,
    Black,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Rank {
    Ace = 1,
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
}

impl Rank {
    pub const ALL: [Rank; 13] = [
        Rank::Ace,
        Rank::Two,
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
    ];

    pub fn value(self) -> u8 {
        self as u8
    }

    pub fn from_value(value: u8) -> Option<Rank> {
        if (1..=13).contains(&value) {
            Some(Rank::ALL[usize::from(value - 1)])
        } else {
            None
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Rank::Ace => "A",
            Rank::Two => "2",
            Rank::Three => "3",
            Rank::Four => "4",
            Rank::Five => "5",
            Rank::Six => "6",
            Rank::Seven => "7",
            Rank::Eight => "8",
            Rank::Nine => "9",
            Rank::Ten => "T",
            Rank::Jack => "J",
            Rank::Queen => "Q",
            Rank::King => "K",
        }
    }
}

impl FromStr for Rank {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim().to_ascii_lowercase();
        match value.as_str() {
            "a" | "ace" => Ok(Rank::Ace),
            "t" | "ten" => Ok(Rank::Ten),
            "j" | "jack" => Ok(Rank::Jack),
            "q" | "queen" => Ok(Rank::Queen),
            "k" | "king" => Ok(Rank::King),
            other => other
                .parse::<u8>()
                .ok()
                .and_then(Rank::from_value)
                .ok_or(()),
        }
    }
}

/// A playing card. Identity is `(suit, rank)`; `face_up` is orientation only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Card {
    pub suit: Suit,
    pub rank: Rank,
    #[serde(default)]
    pub face_up: bool,
}

impl Card {
    pub fn new(suit: Suit, rank: Rank) -> Self {
        Self {
            suit,
            rank,
            face_up: false,
        }
    }

    pub fn face_up(mut self) -> Self {
        self.face_up = true;
        self
    }

    pub fn id(&self) -> CardId {
        (self.suit.index() * RANKS_PER_SUIT) as u8 + self.rank.value() - 1
    }

    pub fn from_id(id: CardId) -> Option<Card> {
        let id = usize::from(id);
        if id >= DECK_SIZE {
            return None;
        }
        Some(Card::new(
            Suit::ALL[id / RANKS_PER_SUIT],
            Rank::ALL[id % RANKS_PER_SUIT],
        ))
    }

    pub fn color(&self) -> Color {
        self.suit.color()
    }

    /// Same card regardless of orientation.
    pub fn same_card(&self, other: &Card) -> bool {
        self.id() == other.id()
    }

    /// Short code such as `"QH"` or `"TS"`.
    pub fn code(&self) -> String {
        format!("{}{}", self.rank.symbol(), self.suit.symbol())
    }

    /// Parses codes like `"QH"`, `"10S"` or `"Q♥"` into a face-down card.
    pub fn parse_code(code: &str) -> Option<Card> {
        let code = code.trim();
        let split = code.char_indices().last()?.0;
        let (rank, suit) = code.split_at(split);
        Some(Card::new(suit.parse().ok()?, rank.parse().ok()?))
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.rank.symbol(), self.suit.symbol())
    }
}

/// The 52 canonical cards, face down, suit-major in `Suit::ALL` order.
pub fn create_deck() -> Vec<Card> {
    Suit::ALL
        .iter()
        .flat_map(|&suit| Rank::ALL.iter().map(move |&rank| Card::new(suit, rank)))
        .collect()
}
