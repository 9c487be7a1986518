//! Lifetime play statistics kept in a small key-value store.

use serde::{Deserialize, Serialize};

use crate::utils;

pub const STATS_KEY: &str = "solitaire-stats";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameStats {
    #[serde(default)]
    pub games_played: u32,
    #[serde(default)]
    pub games_won: u32,
    #[serde(default)]
    pub current_streak: u32,
    #[serde(default)]
    pub best_streak: u32,
    /// Seconds across all finished games.
    #[serde(default)]
    pub total_time_played: u64,
}

impl GameStats {
    pub fn record_game_end(&mut self, won: bool, elapsed_secs: u32) {
        self.games_played += 1;
        self.total_time_played += u64::from(elapsed_secs);
        if won {
            self.games_won += 1;
            self.current_streak += 1;
            self.best_streak = self.best_streak.max(self.current_streak);
        } else {
            self.current_streak = 0;
        }
    }

    /// Whole-number percentage of games won.
    pub fn win_rate(&self) -> u32 {
        if self.games_played == 0 {
            return 0;
        }
        ((u64::from(self.games_won) * 100 + u64::from(self.games_played) / 2)
            / u64::from(self.games_played)) as u32
    }
}

/// Raw string storage under a key, e.g. `window.localStorage`.
pub trait StatsStore {
    fn read(&self, key: &str) -> Option<String>;
    fn write(&mut self, key: &str, value: &str);

    fn load(&self) -> GameStats {
        let Some(raw) = self.read(STATS_KEY) else {
            return GameStats::default();
        };
        serde_json::from_str(&raw).unwrap_or_else(|error| {
            utils::warn(&format!("discarding unreadable stats: {error}"));
            GameStats::default()
        })
    }

    fn save(&mut self, stats: &GameStats) {
        match serde_json::to_string(stats) {
            Ok(json) => self.write(STATS_KEY, &json),
            Err(error) => utils::warn(&format!("failed to save stats: {error}")),
        }
    }

    /// Loads, records one finished game, saves and returns the new totals.
    fn record_game_end(&mut self, won: bool, elapsed_secs: u32) -> GameStats {
        let mut stats = self.load();
        stats.record_game_end(won, elapsed_secs);
        self.save(&stats);
        stats
    }

    fn reset(&mut self) -> GameStats {
        let stats = GameStats::default();
        self.save(&stats);
        stats
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: std::collections::HashMap<String, String>,
}

impl StatsStore for MemoryStore {
    fn read(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn write(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_owned(), value.to_owned());
    }
}

/// `window.localStorage`. Reads and writes are silently skipped when storage
/// is unavailable (private mode, no window).
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalStorage;

impl LocalStorage {
    fn storage() -> Option<web_sys::Storage> {
        web_sys::window()?.local_storage().ok().flatten()
    }
}

impl StatsStore for LocalStorage {
    fn read(&self, key: &str) -> Option<String> {
        Self::storage()?.get_item(key).ok().flatten()
    }

    fn write(&mut self, key: &str, value: &str) {
        let written = Self::storage().map(|storage| storage.set_item(key, value).is_ok());
        if written != Some(true) {
            utils::warn("localStorage unavailable; stats not saved");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn streaks_track_consecutive_wins() {
        let mut stats = GameStats::default();
        stats.record_game_end(true, 120);
        stats.record_game_end(true, 90);
        stats.record_game_end(false, 600);
        stats.record_game_end(true, 60);

        assert_eq!(stats.games_played, 4);
        assert_eq!(stats.games_won, 3);
        assert_eq!(stats.current_streak, 1);
        assert_eq!(stats.best_streak, 2);
        assert_eq!(stats.total_time_played, 870);
        assert_eq!(stats.win_rate(), 75);
    }

    #[test]
    fn win_rate_of_nothing_is_zero() {
        assert_eq!(GameStats::default().win_rate(), 0);
    }

    #[test]
    fn store_round_trips_and_resets() {
        let mut store = MemoryStore::default();
        assert_eq!(store.load(), GameStats::default());

        store.record_game_end(true, 30);
        let stats = store.record_game_end(false, 45);
        assert_eq!(stats.games_played, 2);
        assert_eq!(store.load(), stats);

        assert_eq!(store.reset(), GameStats::default());
        assert_eq!(store.load().games_played, 0);
    }

    #[test]
    fn corrupt_or_partial_records_are_tolerated() {
        let mut store = MemoryStore::default();
        store.write(STATS_KEY, "{not json");
        assert_eq!(store.load(), GameStats::default());

        store.write(STATS_KEY, r#"{"games_played":3,"games_won":1}"#);
        let stats = store.load();
        assert_eq!(stats.games_played, 3);
        assert_eq!(stats.best_streak, 0);
    }
}
