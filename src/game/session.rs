use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use super::autoplay;
use super::card::{create_deck, Card};
use super::deck::{deal, shuffle};
use super::history::History;
use super::rules::{Move, RuleEngine, RuleError};
use super::state::{CardLocation, GameConfig, GameEvent, GameState, PileId};
use crate::utils;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Playing,
    Won,
    Lost,
}

/// What an accepted move did.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MoveReport {
    pub events: Vec<GameEvent>,
    /// Tableau card turned face up by this move, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revealed: Option<CardLocation>,
    pub won: bool,
    pub score: u32,
}

pub type WinCallback = Box<dyn FnMut(&GameState)>;

/// Owns the board and its history. Every mutation goes through here.
pub struct Solitaire {
    state: GameState,
    history: History,
    status: GameStatus,
    elapsed_secs: u32,
    on_win: Option<WinCallback>,
}

impl Solitaire {
    pub fn new(config: GameConfig) -> Self {
        Self::deal_with(config, SmallRng::from_entropy())
    }

    pub fn with_seed(config: GameConfig, seed: u64) -> Self {
        utils::log(&format!("dealing seed {seed}"));
        Self::deal_with(config, SmallRng::seed_from_u64(seed))
    }

    /// Wraps an existing position, e.g. one restored from JSON.
    pub fn from_state(state: GameState) -> Result<Self, RuleError> {
        let state = state
            .restore()
            .map_err(|error| RuleError::IntegrityViolation { error })?;
        let status = if state.is_won() {
            GameStatus::Won
        } else {
            GameStatus::Playing
        };
        Ok(Self {
            state,
            history: History::new(),
            status,
            elapsed_secs: 0,
            on_win: None,
        })
    }

    fn deal_with(config: GameConfig, mut rng: SmallRng) -> Self {
        let state = deal(shuffle(create_deck(), &mut rng), config);
        utils::log(&format!(
            "new deal: draw {}, pass limit {:?}",
            state.config.draw_count, state.config.pass_limit
        ));
        Self {
            state,
            history: History::new(),
            status: GameStatus::Playing,
            elapsed_secs: 0,
            on_win: None,
        }
    }

    /// Deals a fresh game, clearing history. The win callback is kept.
    pub fn new_game(&mut self, config: GameConfig, seed: Option<u64>) -> &GameState {
        let on_win = self.on_win.take();
        *self = match seed {
            Some(seed) => Self::with_seed(config, seed),
            None => Self::new(config),
        };
        self.on_win = on_win;
        &self.state
    }

    pub fn set_on_win(&mut self, callback: WinCallback) {
        self.on_win = Some(callback);
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn config(&self) -> &GameConfig {
        &self.state.config
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn can_undo(&self) -> bool {
        self.status == GameStatus::Playing && self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.status == GameStatus::Playing && self.history.can_redo()
    }

    /// A game with at least one move that has not finished yet.
    pub fn in_progress(&self) -> bool {
        self.status == GameStatus::Playing && self.state.moves > 0
    }

    pub fn elapsed_secs(&self) -> u32 {
        self.elapsed_secs
    }

    pub fn remaining_secs(&self) -> Option<u32> {
        self.state
            .config
            .time_limit_secs
            .map(|limit| limit.saturating_sub(self.elapsed_secs))
    }

    fn ensure_playing(&self) -> Result<(), RuleError> {
        if self.status != GameStatus::Playing {
            return Err(RuleError::GameOver);
        }
        Ok(())
    }

    pub fn validate(&self, mv: &Move) -> Result<(), RuleError> {
        self.ensure_playing()?;
        RuleEngine::validate(&self.state, mv)
    }

    pub fn request_move(&mut self, mv: Move) -> Result<MoveReport, RuleError> {
        if let Err(error) = self.validate(&mv) {
            utils::warn(&format!("move rejected: {error}"));
            return Err(error);
        }

        // a card pulled down from a foundation is not swept straight back
        let held = match mv {
            Move::Relocate { from, .. } if matches!(from.pile, PileId::Foundation { .. }) => {
                self.state.card_at(from).map(Card::id)
            }
            _ => None,
        };

        self.history.record(self.state.clone());
        let mut events = RuleEngine::execute(&mut self.state, &mv);
        self.state.moves += 1;
        if self.state.config.auto_complete {
            events.extend(autoplay::run_to_fixed_point(&mut self.state, held));
        }
        Ok(self.finish_turn(events))
    }

    pub fn request_draw(&mut self) -> Result<MoveReport, RuleError> {
        self.request_move(Move::Draw)
    }

    /// Sends every eligible card home as one undoable step.
    pub fn auto_complete(&mut self) -> Result<MoveReport, RuleError> {
        self.ensure_playing()?;
        let before = self.state.clone();
        let events = autoplay::run_to_fixed_point(&mut self.state, None);
        if !events.is_empty() {
            self.history.record(before);
        }
        Ok(self.finish_turn(events))
    }

    fn finish_turn(&mut self, mut events: Vec<GameEvent>) -> MoveReport {
        let revealed = events.iter().find_map(|event| match event {
            GameEvent::CardRevealed { location, .. } => Some(*location),
            _ => None,
        });

        if self.state.is_won() {
            self.status = GameStatus::Won;
            events.push(GameEvent::GameWon {
                score: self.state.score,
            });
            utils::log(&format!("game won with score {}", self.state.score));
            if let Some(callback) = self.on_win.as_mut() {
                callback(&self.state);
            }
        }

        MoveReport {
            events,
            revealed,
            won: self.status == GameStatus::Won,
            score: self.state.score,
        }
    }

    pub fn undo(&mut self) -> Option<&GameState> {
        if self.status != GameStatus::Playing {
            return None;
        }
        self.state = self.history.undo(&self.state)?;
        Some(&self.state)
    }

    pub fn redo(&mut self) -> Option<&GameState> {
        if self.status != GameStatus::Playing {
            return None;
        }
        self.state = self.history.redo(&self.state)?;
        Some(&self.state)
    }

    /// Advances the countdown clock. Returns `GameLost` when time runs out.
    pub fn tick(&mut self, secs: u32) -> Option<GameEvent> {
        if self.status != GameStatus::Playing {
            return None;
        }
        self.elapsed_secs = self.elapsed_secs.saturating_add(secs);
        let limit = self.state.config.time_limit_secs?;
        if self.elapsed_secs < limit {
            return None;
        }
        self.status = GameStatus::Lost;
        utils::log(&format!("time is up after {} seconds", self.elapsed_secs));
        Some(GameEvent::GameLost {
            elapsed_secs: self.elapsed_secs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::card::{Card, Suit};
    use crate::game::state::{IntegrityError, PileId};
    use std::cell::Cell;
    use std::rc::Rc;

    fn draw_one() -> GameConfig {
        GameConfig::default().with_auto_complete(false)
    }

    #[test]
    fn seeded_deal_layout() {
        let game = Solitaire::with_seed(draw_one(), 2024);
        let state = game.state();
        assert_eq!(state.tableaus[0].len(), 1);
        assert!(state.tableaus[0][0].face_up);
        assert_eq!(state.tableaus[6].len(), 7);
        assert_eq!(state.tableaus[6].iter().filter(|c| !c.face_up).count(), 6);
        assert_eq!(state.stock.len(), 24);
        assert_eq!(game.status(), GameStatus::Playing);
        assert!(!game.can_undo());

        let again = Solitaire::with_seed(draw_one(), 2024);
        assert_eq!(again.state(), state);
    }

    #[test]
    fn twenty_four_draws_then_recycle() {
        let mut game = Solitaire::with_seed(draw_one(), 5);
        for _ in 0..24 {
            game.request_draw().unwrap();
        }
        assert!(game.state().stock.is_empty());
        assert_eq!(game.state().waste.len(), 24);

        let report = game.request_draw().unwrap();
        assert_eq!(
            report.events,
            vec![GameEvent::WasteRecycled {
                count: 24,
                passes_remaining: None
            }]
        );
        assert_eq!(game.state().stock.len(), 24);
        assert!(game.state().stock.iter().all(|c| !c.face_up));
        assert!(game.state().waste.is_empty());
        assert_eq!(game.state().moves, 25);
    }

    #[test]
    fn hard_mode_limits_recycles() {
        let config = GameConfig::default()
            .with_pass_limit(Some(2))
            .with_auto_complete(false);
        let mut game = Solitaire::with_seed(config, 11);
        let mut recycles = 0;
        let error = loop {
            match game.request_draw() {
                Ok(report) => {
                    if matches!(report.events[0], GameEvent::WasteRecycled { .. }) {
                        recycles += 1;
                    }
                }
                Err(error) => break error,
            }
        };
        assert_eq!(recycles, 2);
        assert_eq!(error, RuleError::NoPassesRemaining);
        assert_ne!(error, RuleError::NothingToDraw);
        assert!(game.state().stock.is_empty());
    }

    #[test]
    fn rejected_moves_change_nothing() {
        let mut game = Solitaire::with_seed(draw_one(), 3);
        let before = game.state().clone();
        let mv = Move::relocate(
            CardLocation::new(PileId::Tableau { index: 6 }, 0),
            PileId::Tableau { index: 0 },
        );
        assert_eq!(game.request_move(mv), Err(RuleError::FaceDownCard));
        assert_eq!(game.state(), &before);
        assert!(!game.can_undo());
    }

    #[test]
    fn undo_and_redo_retrace_draws() {
        let mut game = Solitaire::with_seed(draw_one(), 8);
        let initial = game.state().clone();
        let mut snapshots = Vec::new();
        for _ in 0..5 {
            game.request_draw().unwrap();
            snapshots.push(game.state().clone());
        }
        for _ in 0..5 {
            assert!(game.undo().is_some());
        }
        assert_eq!(game.state(), &initial);
        assert!(game.undo().is_none());
        for expected in &snapshots {
            assert_eq!(game.redo(), Some(expected));
        }
        assert!(game.redo().is_none());
    }

    fn nearly_won() -> GameState {
        let mut state = GameState::empty(GameConfig::default());
        for card in crate::game::card::create_deck() {
            state.foundations[card.suit.index()].push(card.face_up());
        }
        let king = state.foundations[Suit::Clubs.index()].pop().unwrap();
        state.tableaus[0].push(king);
        state
    }

    #[test]
    fn winning_move_fires_callback_and_ends_game() {
        let mut game = Solitaire::from_state(nearly_won()).unwrap();
        let wins = Rc::new(Cell::new(0));
        let counter = Rc::clone(&wins);
        game.set_on_win(Box::new(move |_| counter.set(counter.get() + 1)));

        let report = game
            .request_move(Move::relocate(
                CardLocation::new(PileId::Tableau { index: 0 }, 0),
                PileId::Foundation { index: 3 },
            ))
            .unwrap();
        assert!(report.won);
        assert!(report.events.contains(&GameEvent::GameWon { score: 10 }));
        assert_eq!(wins.get(), 1);
        assert_eq!(game.status(), GameStatus::Won);
        assert_eq!(game.request_draw(), Err(RuleError::GameOver));
        assert!(game.undo().is_none());
    }

    #[test]
    fn auto_complete_finishes_the_game() {
        let mut game = Solitaire::from_state(nearly_won()).unwrap();
        let report = game.auto_complete().unwrap();
        assert!(report.won);
        assert!(game.state().is_won());
    }

    #[test]
    fn auto_moves_share_the_undo_step_of_the_user_move() {
        let mut state = nearly_won();
        // queen of clubs on the waste, king of clubs open on tableau 1,
        // king of spades hidden on tableau 2 so the game is not finished
        let queen = state.foundations[Suit::Clubs.index()].pop().unwrap();
        state.waste.push(queen);
        let king = state.tableaus[0].pop().unwrap();
        state.tableaus[1].push(king);
        let mut hidden_king = state.foundations[Suit::Spades.index()].pop().unwrap();
        hidden_king.face_up = false;
        state.tableaus[2].push(hidden_king);
        let before = state.clone();
        let mut game = Solitaire::from_state(state).unwrap();

        let report = game
            .request_move(Move::relocate(
                CardLocation::new(PileId::Waste, 0),
                PileId::Foundation { index: 3 },
            ))
            .unwrap();
        assert!(!report.won);
        assert!(report
            .events
            .iter()
            .any(|e| matches!(e, GameEvent::CardsMoved { automatic: true, .. })));
        assert_eq!(game.state().foundations[Suit::Clubs.index()].len(), 13);

        assert_eq!(game.undo(), Some(&before));
        assert!(game.undo().is_none());
    }

    #[test]
    fn reveal_is_reported() {
        let mut state = GameState::empty(draw_one());
        let mut deck = crate::game::card::create_deck();
        let king = deck.iter().position(|c| c.code() == "KH").unwrap();
        let king = deck.remove(king).face_up();
        let queen = deck.iter().position(|c| c.code() == "QS").unwrap();
        let queen = deck.remove(queen).face_up();
        let hidden = deck.pop().unwrap();
        state.tableaus[0] = vec![king];
        state.tableaus[1] = vec![hidden, queen];
        state.stock = deck;
        let mut game = Solitaire::from_state(state).unwrap();

        let report = game
            .request_move(Move::relocate(
                CardLocation::new(PileId::Tableau { index: 1 }, 1),
                PileId::Tableau { index: 0 },
            ))
            .unwrap();
        assert_eq!(
            report.revealed,
            Some(CardLocation::new(PileId::Tableau { index: 1 }, 0))
        );
        assert_eq!(report.score, 5);
        assert!(game.state().tableaus[1][0].face_up);
    }

    #[test]
    fn countdown_runs_out() {
        let config = draw_one().with_time_limit(Some(600));
        let mut game = Solitaire::with_seed(config, 1);
        assert_eq!(game.tick(599), None);
        assert_eq!(game.remaining_secs(), Some(1));
        assert_eq!(
            game.tick(1),
            Some(GameEvent::GameLost { elapsed_secs: 600 })
        );
        assert_eq!(game.status(), GameStatus::Lost);
        assert_eq!(game.request_draw(), Err(RuleError::GameOver));
        assert_eq!(game.tick(5), None);
    }

    #[test]
    fn untimed_games_never_expire() {
        let mut game = Solitaire::with_seed(draw_one(), 1);
        assert_eq!(game.tick(100_000), None);
        assert_eq!(game.remaining_secs(), None);
        assert_eq!(game.elapsed_secs(), 100_000);
    }

    #[test]
    fn new_game_resets_history_and_keeps_callback() {
        let mut game = Solitaire::with_seed(draw_one(), 4);
        let flag = Rc::new(Cell::new(false));
        let seen = Rc::clone(&flag);
        game.set_on_win(Box::new(move |_| seen.set(true)));
        game.request_draw().unwrap();
        assert!(game.in_progress());

        let hard = GameConfig::from_difficulty(crate::game::Difficulty::Hard);
        let fresh = game.new_game(hard, Some(4)).clone();
        assert_eq!(fresh.config.draw_count, 3);
        assert_eq!(fresh.passes_remaining, Some(2));
        assert!(!game.can_undo());
        assert!(!game.in_progress());
        assert!(game.on_win.is_some());
    }

    #[test]
    fn corrupt_states_are_refused() {
        let mut state = nearly_won();
        state.tableaus[0].push(Card::parse_code("AS").unwrap().face_up());
        assert!(matches!(
            Solitaire::from_state(state),
            Err(RuleError::IntegrityViolation { .. })
        ));
    }

    #[test]
    fn saved_game_without_pass_counter_keeps_its_limit() {
        let config = draw_one().with_pass_limit(Some(2));
        let game = Solitaire::with_seed(config, 12);
        let mut saved = serde_json::to_value(game.state()).unwrap();
        saved.as_object_mut().unwrap().remove("passes_remaining");
        let state: GameState = serde_json::from_value(saved).unwrap();
        assert_eq!(state.passes_remaining, None);

        let mut game = Solitaire::from_state(state).unwrap();
        assert_eq!(game.state().passes_remaining, Some(2));

        let mut recycles = 0;
        let mut refusal = None;
        for _ in 0..200 {
            match game.request_draw() {
                Ok(report) => {
                    let recycled = report
                        .events
                        .iter()
                        .any(|e| matches!(e, GameEvent::WasteRecycled { .. }));
                    if recycled {
                        recycles += 1;
                    }
                }
                Err(error) => {
                    refusal = Some(error);
                    break;
                }
            }
        }
        assert_eq!(recycles, 2);
        assert_eq!(refusal, Some(RuleError::NoPassesRemaining));
    }

    #[test]
    fn saved_draw_count_is_normalized() {
        for bad in [0u8, 2, 7] {
            let mut state = Solitaire::with_seed(draw_one(), 3).state().clone();
            state.config.draw_count = bad;
            let mut game = Solitaire::from_state(state).unwrap();
            assert_eq!(game.config().draw_count, 1);

            game.request_draw().unwrap();
            assert_eq!(game.state().stock.len(), 23);
            assert_eq!(game.state().waste.len(), 1);
        }
    }

    #[test]
    fn excess_pass_counter_is_refused() {
        let mut state = Solitaire::with_seed(draw_one().with_pass_limit(Some(1)), 3)
            .state()
            .clone();
        state.passes_remaining = Some(5);
        assert_eq!(
            Solitaire::from_state(state).err(),
            Some(RuleError::IntegrityViolation {
                error: IntegrityError::PassesExceedLimit {
                    remaining: 5,
                    limit: 1
                }
            })
        );
    }

    #[test]
    fn card_taken_off_a_foundation_stays_down() {
        // clubs and hearts built to the queen, both kings open on the tableau
        let mut state = nearly_won();
        let king_of_hearts = state.foundations[Suit::Hearts.index()].pop().unwrap();
        state.tableaus[1].push(king_of_hearts);
        let mut game = Solitaire::from_state(state).unwrap();
        assert!(game.config().auto_complete);

        let report = game
            .request_move(Move::relocate(
                CardLocation::new(PileId::Foundation { index: 3 }, 11),
                PileId::Tableau { index: 1 },
            ))
            .unwrap();
        assert!(!report
            .events
            .iter()
            .any(|e| matches!(e, GameEvent::CardsMoved { automatic: true, .. })));
        assert_eq!(game.state().foundations[Suit::Clubs.index()].len(), 11);
        assert_eq!(game.state().tableaus[1].last().map(Card::code), Some("QC".to_owned()));
        assert_eq!(game.state().moves, 1);

        // an explicit sweep may still send it home
        assert!(game.auto_complete().unwrap().won);
    }
}
