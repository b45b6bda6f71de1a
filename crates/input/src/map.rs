//! Key mapping from terminal events to input intents.

use crate::types::{GameAction, GRID_WIDTH};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// What a key press asks for, before the column cursor is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyIntent {
    /// Directly mapped engine action
    Action(GameAction),
    CursorLeft,
    CursorRight,
    /// Select the column under the cursor
    DropAtCursor,
    /// Start on the title screen, drop at cursor while playing
    Confirm,
}

/// Map keyboard input to intents.
pub fn handle_key_event(key: KeyEvent) -> Option<KeyIntent> {
    match key.code {
        // Direct column selection: '1'..'6'
        KeyCode::Char(c @ '1'..='9') => {
            let column = c as u8 - b'1';
            (column < GRID_WIDTH).then_some(KeyIntent::Action(GameAction::SelectColumn(column)))
        }

        // Cursor
        KeyCode::Left | KeyCode::Char('h') | KeyCode::Char('H') | KeyCode::Char('a') | KeyCode::Char('A') => {
            Some(KeyIntent::CursorLeft)
        }
        KeyCode::Right | KeyCode::Char('l') | KeyCode::Char('L') | KeyCode::Char('d') | KeyCode::Char('D') => {
            Some(KeyIntent::CursorRight)
        }
        KeyCode::Down | KeyCode::Char(' ') | KeyCode::Char('j') | KeyCode::Char('J') => {
            Some(KeyIntent::DropAtCursor)
        }
        KeyCode::Enter => Some(KeyIntent::Confirm),

        // Actions
        KeyCode::Char('s') | KeyCode::Char('S') => Some(KeyIntent::Action(GameAction::Start)),
        KeyCode::Char('p') | KeyCode::Char('P') => Some(KeyIntent::Action(GameAction::TogglePause)),
        KeyCode::Char('r') | KeyCode::Char('R') => Some(KeyIntent::Action(GameAction::Restart)),

        _ => None,
    }
}

/// Check if key should quit the game.
pub fn should_quit(key: KeyEvent) -> bool {
    matches!(key.code, KeyCode::Char('q') | KeyCode::Char('Q'))
        || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    #[test]
    fn test_digit_keys_select_columns() {
        assert_eq!(
            handle_key_event(KeyEvent::from(KeyCode::Char('1'))),
            Some(KeyIntent::Action(GameAction::SelectColumn(0)))
        );
        assert_eq!(
            handle_key_event(KeyEvent::from(KeyCode::Char('6'))),
            Some(KeyIntent::Action(GameAction::SelectColumn(5)))
        );
        assert_eq!(handle_key_event(KeyEvent::from(KeyCode::Char('7'))), None);
        assert_eq!(handle_key_event(KeyEvent::from(KeyCode::Char('0'))), None);
    }

    #[test]
    fn test_cursor_keys() {
        assert_eq!(
            handle_key_event(KeyEvent::from(KeyCode::Left)),
            Some(KeyIntent::CursorLeft)
        );
        assert_eq!(
            handle_key_event(KeyEvent::from(KeyCode::Char('L'))),
            Some(KeyIntent::CursorRight)
        );
        assert_eq!(
            handle_key_event(KeyEvent::from(KeyCode::Char(' '))),
            Some(KeyIntent::DropAtCursor)
        );
        assert_eq!(
            handle_key_event(KeyEvent::from(KeyCode::Enter)),
            Some(KeyIntent::Confirm)
        );
    }

    #[test]
    fn test_action_keys() {
        assert_eq!(
            handle_key_event(KeyEvent::from(KeyCode::Char('p'))),
            Some(KeyIntent::Action(GameAction::TogglePause))
        );
        assert_eq!(
            handle_key_event(KeyEvent::from(KeyCode::Char('R'))),
            Some(KeyIntent::Action(GameAction::Restart))
        );
        assert_eq!(
            handle_key_event(KeyEvent::from(KeyCode::Char('s'))),
            Some(KeyIntent::Action(GameAction::Start))
        );
    }

    #[test]
    fn test_quit_keys() {
        assert!(should_quit(KeyEvent::from(KeyCode::Char('q'))));
        assert!(should_quit(KeyEvent::new(
            KeyCode::Char('c'),
            KeyModifiers::CONTROL
        )));
        assert!(!should_quit(KeyEvent::from(KeyCode::Char('x'))));
    }
}
