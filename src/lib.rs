pub mod advisor;
pub mod game;
pub mod stats;
pub mod utils;

use serde::Serialize;
use serde_wasm_bindgen::{from_value, to_value};
use std::str::FromStr;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;
use web_sys::js_sys::{Function, Promise};

pub use advisor::{
    AdvisorConfig, AdvisorError, AdvisorHint, AdvisorReply, HintGate, Suggestion,
    SuggestionError,
};
pub use game::{
    create_deck, Card, CardId, CardLocation, Difficulty, GameConfig, GameEvent, GameState,
    GameStatus, IntegrityError, Move, MoveReport, PileId, Rank, RuleEngine, RuleError, Solitaire,
    Suit, DECK_SIZE,
};
pub use stats::{GameStats, LocalStorage, MemoryStore, StatsStore};

#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn start() {
    utils::set_panic_hook();
}

fn to_js_error<E: Serialize + std::fmt::Display>(error: &E) -> JsValue {
    to_value(error).unwrap_or_else(|_| JsValue::from_str(&error.to_string()))
}

fn serde_to_js_error<E: std::fmt::Display>(error: E) -> JsValue {
    JsValue::from_str(&error.to_string())
}

/// Decodes a board from JS and brings it in line with its config.
fn restore_state(value: JsValue) -> Result<GameState, JsValue> {
    let state: GameState = from_value(value).map_err(JsValue::from)?;
    state
        .restore()
        .map_err(|error| to_js_error(&RuleError::IntegrityViolation { error }))
}

/// An explicit config wins over a difficulty name; neither means easy.
fn parse_config(
    config_json: Option<String>,
    difficulty: Option<String>,
) -> Result<GameConfig, JsValue> {
    if let Some(json) = config_json {
        return serde_json::from_str(&json).map_err(serde_to_js_error);
    }
    let difficulty = difficulty
        .as_deref()
        .and_then(|value| Difficulty::from_str(value).ok())
        .unwrap_or(Difficulty::Easy);
    Ok(GameConfig::from_difficulty(difficulty))
}

#[derive(Serialize)]
struct MoveResponse<'a> {
    accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RuleError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    revealed: Option<CardLocation>,
    events: Vec<GameEvent>,
    won: bool,
    status: GameStatus,
    state: &'a GameState,
}

#[derive(Serialize)]
struct GameView<'a> {
    status: GameStatus,
    elapsed_secs: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    remaining_secs: Option<u32>,
    can_undo: bool,
    can_redo: bool,
    state: &'a GameState,
}

#[derive(Serialize)]
struct Validity {
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

impl From<Result<(), RuleError>> for Validity {
    fn from(result: Result<(), RuleError>) -> Self {
        Self {
            valid: result.is_ok(),
            reason: result.err().map(|error| error.reason()),
        }
    }
}

#[wasm_bindgen]
pub struct SolitaireEngine {
    game: Solitaire,
    stats: LocalStorage,
    advisor: AdvisorConfig,
    hints: HintGate,
}

#[wasm_bindgen]
impl SolitaireEngine {
    #[wasm_bindgen(constructor)]
    pub fn new(
        config_json: Option<String>,
        difficulty: Option<String>,
        seed: Option<u64>,
    ) -> Result<SolitaireEngine, JsValue> {
        let config = parse_config(config_json, difficulty)?;
        let game = match seed {
            Some(seed) => Solitaire::with_seed(config, seed),
            None => Solitaire::new(config),
        };
        Ok(SolitaireEngine {
            game,
            stats: LocalStorage,
            advisor: AdvisorConfig::default(),
            hints: HintGate::new(),
        })
    }

    /// Resumes a saved position. The board is integrity-checked first.
    pub fn from_state_json(state_json: &str) -> Result<SolitaireEngine, JsValue> {
        let state: GameState = serde_json::from_str(state_json).map_err(serde_to_js_error)?;
        let game = Solitaire::from_state(state).map_err(|error| to_js_error(&error))?;
        Ok(SolitaireEngine {
            game,
            stats: LocalStorage,
            advisor: AdvisorConfig::default(),
            hints: HintGate::new(),
        })
    }

    /// Deals again. A game abandoned mid-play counts as a loss.
    pub fn new_game(
        &mut self,
        config_json: Option<String>,
        difficulty: Option<String>,
        seed: Option<u64>,
    ) -> Result<String, JsValue> {
        let config = parse_config(config_json, difficulty)?;
        if self.game.in_progress() {
            self.stats.record_game_end(false, self.game.elapsed_secs());
        }
        self.hints.cancel_all();
        let state = self.game.new_game(config, seed);
        serde_json::to_string(state).map_err(serde_to_js_error)
    }

    pub fn state_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(self.game.state()).map_err(serde_to_js_error)
    }

    /// State plus status, clock and history flags.
    pub fn view_json(&self) -> Result<String, JsValue> {
        let view = GameView {
            status: self.game.status(),
            elapsed_secs: self.game.elapsed_secs(),
            remaining_secs: self.game.remaining_secs(),
            can_undo: self.game.can_undo(),
            can_redo: self.game.can_redo(),
            state: self.game.state(),
        };
        serde_json::to_string(&view).map_err(serde_to_js_error)
    }

    pub fn is_valid_json(&self, move_json: &str) -> Result<String, JsValue> {
        let mv: Move = serde_json::from_str(move_json).map_err(serde_to_js_error)?;
        let validity = Validity::from(self.game.validate(&mv));
        serde_json::to_string(&validity).map_err(serde_to_js_error)
    }

    /// Rejections are reported in the response, not thrown.
    pub fn request_move_json(&mut self, move_json: &str) -> Result<String, JsValue> {
        let mv: Move = serde_json::from_str(move_json).map_err(serde_to_js_error)?;
        let result = self.game.request_move(mv);
        self.respond(result)
    }

    pub fn request_draw(&mut self) -> Result<String, JsValue> {
        let result = self.game.request_draw();
        self.respond(result)
    }

    pub fn auto_complete(&mut self) -> Result<String, JsValue> {
        let result = self.game.auto_complete();
        self.respond(result)
    }

    pub fn can_undo(&self) -> bool {
        self.game.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.game.can_redo()
    }

    pub fn undo(&mut self) -> Result<Option<String>, JsValue> {
        self.game
            .undo()
            .map(serde_json::to_string)
            .transpose()
            .map_err(serde_to_js_error)
    }

    pub fn redo(&mut self) -> Result<Option<String>, JsValue> {
        self.game
            .redo()
            .map(serde_json::to_string)
            .transpose()
            .map_err(serde_to_js_error)
    }

    /// Advances the countdown. Returns the `GameLost` event when time runs out.
    pub fn tick(&mut self, secs: u32) -> Result<Option<String>, JsValue> {
        let Some(event) = self.game.tick(secs) else {
            return Ok(None);
        };
        self.stats.record_game_end(false, self.game.elapsed_secs());
        serde_json::to_string(&event).map(Some).map_err(serde_to_js_error)
    }

    /// `callback` receives the final state when the game is won.
    pub fn set_on_win(&mut self, callback: Function) {
        self.game.set_on_win(Box::new(move |state: &GameState| {
            let payload = to_value(state).unwrap_or(JsValue::NULL);
            if let Err(error) = callback.call1(&JsValue::NULL, &payload) {
                utils::warn(&format!("win callback failed: {error:?}"));
            }
        }));
    }

    pub fn stats_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.stats.load()).map_err(serde_to_js_error)
    }

    pub fn reset_stats(&mut self) -> Result<String, JsValue> {
        serde_json::to_string(&self.stats.reset()).map_err(serde_to_js_error)
    }

    pub fn set_advisor_config_json(&mut self, config_json: &str) -> Result<(), JsValue> {
        self.advisor = serde_json::from_str(config_json).map_err(serde_to_js_error)?;
        Ok(())
    }

    pub fn describe_board(&self) -> String {
        advisor::describe_board(self.game.state())
    }

    /// Resolves to an `AdvisorHint` JSON string. Only the latest request can
    /// resolve; earlier ones reject with `Superseded`.
    pub fn request_hint(&self, api_key: Option<String>, delay_ms: Option<u32>) -> Promise {
        let ticket = self.hints.issue();
        let config = self.advisor.clone();
        let snapshot = self.game.state().clone();
        let api_key = api_key.unwrap_or_default();
        let delay = delay_ms.unwrap_or(0);

        future_to_promise(async move {
            let hint = advisor::request_hint(config, api_key, snapshot, ticket, delay)
                .await
                .map_err(|error| to_js_error(&error))?;
            let json = serde_json::to_string(&hint).map_err(serde_to_js_error)?;
            Ok(JsValue::from_str(&json))
        })
    }

    /// Re-checks an advisor reply against the current board before it is shown.
    pub fn check_hint_json(&self, reply_text: &str) -> Result<String, JsValue> {
        let reply = advisor::parse_reply(reply_text).map_err(|error| to_js_error(&error))?;
        let hint = AdvisorHint::evaluate(reply, self.game.state());
        serde_json::to_string(&hint).map_err(serde_to_js_error)
    }

    fn respond(&mut self, result: Result<MoveReport, RuleError>) -> Result<String, JsValue> {
        let response = match result {
            Ok(report) => {
                if report.won {
                    self.stats.record_game_end(true, self.game.elapsed_secs());
                }
                MoveResponse {
                    accepted: true,
                    reason: None,
                    error: None,
                    revealed: report.revealed,
                    events: report.events,
                    won: report.won,
                    status: self.game.status(),
                    state: self.game.state(),
                }
            }
            Err(error) => MoveResponse {
                accepted: false,
                reason: Some(error.reason()),
                error: Some(error),
                revealed: None,
                events: Vec::new(),
                won: false,
                status: self.game.status(),
                state: self.game.state(),
            },
        };
        serde_json::to_string(&response).map_err(serde_to_js_error)
    }
}

/// The 52 cards in canonical order, face down.
#[wasm_bindgen(js_name = "createDeck")]
pub fn create_deck_js() -> Result<JsValue, JsValue> {
    to_value(&create_deck()).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "dealGame")]
pub fn deal_game(config: JsValue, seed: Option<u64>) -> Result<JsValue, JsValue> {
    let config: GameConfig = if config.is_undefined() || config.is_null() {
        GameConfig::default()
    } else {
        from_value(config).map_err(JsValue::from)?
    };
    let game = match seed {
        Some(seed) => Solitaire::with_seed(config, seed),
        None => Solitaire::new(config),
    };
    to_value(game.state()).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "validateState")]
pub fn validate_state(state: JsValue) -> Result<(), JsValue> {
    restore_state(state).map(|_| ())
}

#[wasm_bindgen(js_name = "isMoveValid")]
pub fn is_move_valid(state: JsValue, mv: JsValue) -> Result<JsValue, JsValue> {
    let state = restore_state(state)?;
    let mv: Move = from_value(mv).map_err(JsValue::from)?;
    to_value(&Validity::from(RuleEngine::validate(&state, &mv))).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "applyMove")]
pub fn apply_move(state: JsValue, mv: JsValue) -> Result<JsValue, JsValue> {
    let mut state = restore_state(state)?;
    let mv: Move = from_value(mv).map_err(JsValue::from)?;
    RuleEngine::apply(&mut state, &mv).map_err(|error| to_js_error(&error))?;
    to_value(&state).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "legalMoves")]
pub fn legal_moves(state: JsValue) -> Result<JsValue, JsValue> {
    let state = restore_state(state)?;
    to_value(&RuleEngine::legal_relocations(&state)).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "describeBoard")]
pub fn describe_board(state: JsValue) -> Result<String, JsValue> {
    let state = restore_state(state)?;
    Ok(advisor::describe_board(&state))
}
