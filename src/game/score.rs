//! Standard Klondike scoring.

use super::state::PileId;

pub const TO_FOUNDATION: i32 = 10;
pub const WASTE_TO_TABLEAU: i32 = 5;
pub const FOUNDATION_TO_TABLEAU: i32 = -10;
pub const REVEAL: i32 = 5;

pub fn for_move(from: PileId, to: PileId, revealed: bool) -> i32 {
    let placement = match (from, to) {
        (PileId::Foundation { .. }, PileId::Foundation { .. }) => 0,
        (_, PileId::Foundation { .. }) => TO_FOUNDATION,
        (PileId::Waste, PileId::Tableau { .. }) => WASTE_TO_TABLEAU,
        (PileId::Foundation { .. }, PileId::Tableau { .. }) => FOUNDATION_TO_TABLEAU,
        _ => 0,
    };
    placement + if revealed { REVEAL } else { 0 }
}

/// Adds `delta`, flooring at zero.
pub fn apply(score: u32, delta: i32) -> u32 {
    let total = i64::from(score) + i64::from(delta);
    total.clamp(0, i64::from(u32::MAX)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scores_by_route() {
        let waste = PileId::Waste;
        let tableau = PileId::Tableau { index: 0 };
        let foundation = PileId::Foundation { index: 0 };
        assert_eq!(for_move(waste, foundation, false), 10);
        assert_eq!(for_move(tableau, foundation, true), 15);
        assert_eq!(for_move(waste, tableau, false), 5);
        assert_eq!(for_move(foundation, tableau, false), -10);
        assert_eq!(for_move(tableau, PileId::Tableau { index: 3 }, true), 5);
        assert_eq!(for_move(tableau, PileId::Tableau { index: 3 }, false), 0);
    }

    #[test]
    fn score_never_goes_negative() {
        assert_eq!(apply(4, FOUNDATION_TO_TABLEAU), 0);
        assert_eq!(apply(30, FOUNDATION_TO_TABLEAU), 20);
    }
}
