use super::state::GameState;

/// Linear undo/redo over full state snapshots. Applying a new move drops
/// whatever could have been redone.
#[derive(Debug, Clone, Default)]
pub struct History {
    undo: Vec<GameState>,
    redo: Vec<GameState>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the pre-move snapshot.
    pub fn record(&mut self, before: GameState) {
        self.undo.push(before);
        self.redo.clear();
    }

    /// Returns the state to restore, parking `current` for redo.
    pub fn undo(&mut self, current: &GameState) -> Option<GameState> {
        let previous = self.undo.pop()?;
        self.redo.push(current.clone());
        Some(previous)
    }

    pub fn redo(&mut self, current: &GameState) -> Option<GameState> {
        let next = self.redo.pop()?;
        self.undo.push(current.clone());
        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }
}
