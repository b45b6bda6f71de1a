//! Column cursor input handler.
//!
//! Keeps a highlighted column between key presses and turns key intents into
//! engine actions for the current lifecycle.

use crossterm::event::KeyEvent;

use crate::map::{handle_key_event, KeyIntent};
use crate::types::{GameAction, Lifecycle, GRID_WIDTH, START_COLUMN};

#[derive(Debug, Clone)]
pub struct InputHandler {
    cursor: u8,
}

impl InputHandler {
    pub fn new() -> Self {
        Self {
            cursor: START_COLUMN,
        }
    }

    /// Column currently highlighted
    pub fn cursor(&self) -> u8 {
        self.cursor
    }

    /// Back to the centre column (after a restart)
    pub fn reset(&mut self) {
        self.cursor = START_COLUMN;
    }

    /// Translate a key press; cursor moves yield no action
    pub fn handle_key(&mut self, key: KeyEvent, lifecycle: Lifecycle) -> Option<GameAction> {
        self.handle_intent(handle_key_event(key)?, lifecycle)
    }

    pub fn handle_intent(&mut self, intent: KeyIntent, lifecycle: Lifecycle) -> Option<GameAction> {
        match intent {
            KeyIntent::Action(GameAction::SelectColumn(column)) => {
                self.cursor = column.min(GRID_WIDTH - 1);
                Some(GameAction::SelectColumn(column))
            }
            KeyIntent::Action(GameAction::Restart) => {
                self.reset();
                Some(GameAction::Restart)
            }
            KeyIntent::Action(action) => Some(action),
            KeyIntent::CursorLeft => {
                self.cursor = self.cursor.saturating_sub(1);
                None
            }
            KeyIntent::CursorRight => {
                self.cursor = (self.cursor + 1).min(GRID_WIDTH - 1);
                None
            }
            KeyIntent::DropAtCursor => Some(GameAction::SelectColumn(self.cursor)),
            KeyIntent::Confirm => match lifecycle {
                Lifecycle::AwaitingStart => Some(GameAction::Start),
                Lifecycle::GameOver => Some(GameAction::Restart),
                Lifecycle::Playing | Lifecycle::Paused => Some(GameAction::SelectColumn(self.cursor)),
            },
        }
    }
}

impl Default for InputHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyCode;

    #[test]
    fn cursor_moves_within_grid() {
        let mut h = InputHandler::new();
        assert_eq!(h.cursor(), 3);
        for _ in 0..10 {
            assert_eq!(h.handle_key(KeyEvent::from(KeyCode::Right), Lifecycle::Playing), None);
        }
        assert_eq!(h.cursor(), GRID_WIDTH - 1);
        for _ in 0..10 {
            h.handle_key(KeyEvent::from(KeyCode::Left), Lifecycle::Playing);
        }
        assert_eq!(h.cursor(), 0);
    }

    #[test]
    fn drop_key_selects_cursor_column() {
        let mut h = InputHandler::new();
        h.handle_key(KeyEvent::from(KeyCode::Left), Lifecycle::Playing);
        assert_eq!(
            h.handle_key(KeyEvent::from(KeyCode::Down), Lifecycle::Playing),
            Some(GameAction::SelectColumn(2))
        );
    }

    #[test]
    fn digits_move_cursor_too() {
        let mut h = InputHandler::new();
        assert_eq!(
            h.handle_key(KeyEvent::from(KeyCode::Char('5')), Lifecycle::Playing),
            Some(GameAction::SelectColumn(4))
        );
        assert_eq!(h.cursor(), 4);
    }

    #[test]
    fn enter_depends_on_lifecycle() {
        let mut h = InputHandler::new();
        let enter = KeyEvent::from(KeyCode::Enter);
        assert_eq!(h.handle_key(enter, Lifecycle::AwaitingStart), Some(GameAction::Start));
        assert_eq!(h.handle_key(enter, Lifecycle::GameOver), Some(GameAction::Restart));
        assert_eq!(
            h.handle_key(enter, Lifecycle::Playing),
            Some(GameAction::SelectColumn(3))
        );
    }

    #[test]
    fn restart_recentres_cursor() {
        let mut h = InputHandler::new();
        h.handle_key(KeyEvent::from(KeyCode::Char('1')), Lifecycle::Playing);
        assert_eq!(
            h.handle_key(KeyEvent::from(KeyCode::Char('r')), Lifecycle::Playing),
            Some(GameAction::Restart)
        );
        assert_eq!(h.cursor(), START_COLUMN);
    }
}
