//! Key conversion from crossterm to editor and app actions.

use crate::editor::EditCommand;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// What a key press asks the app to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Edit(EditCommand),
    Submit,
    ClearConsole,
    Save,
    Quit,
    Ignore,
}

/// Convert a crossterm KeyEvent to an action.
pub fn convert_key(event: KeyEvent) -> KeyAction {
    // Only presses; some terminals also report release and repeat
    if event.kind == KeyEventKind::Release {
        return KeyAction::Ignore;
    }

    if event.modifiers.contains(KeyModifiers::CONTROL) {
        return match event.code {
            KeyCode::Char('r') => KeyAction::Submit,
            KeyCode::Char('l') => KeyAction::ClearConsole,
            KeyCode::Char('s') => KeyAction::Save,
            KeyCode::Char('q') | KeyCode::Char('c') => KeyAction::Quit,
            _ => KeyAction::Ignore,
        };
    }

    let command = match event.code {
        KeyCode::F(5) => return KeyAction::Submit,
        KeyCode::Char(c) => EditCommand::Insert(c),
        KeyCode::Enter => EditCommand::Newline,
        KeyCode::Tab => EditCommand::Tab,
        KeyCode::Backspace => EditCommand::Backspace,
        KeyCode::Delete => EditCommand::Delete,
        KeyCode::Left => EditCommand::Left,
        KeyCode::Right => EditCommand::Right,
        KeyCode::Up => EditCommand::Up,
        KeyCode::Down => EditCommand::Down,
        KeyCode::Home => EditCommand::Home,
        KeyCode::End => EditCommand::End,
        KeyCode::PageUp => EditCommand::PageUp,
        KeyCode::PageDown => EditCommand::PageDown,
        _ => return KeyAction::Ignore,
    };
    KeyAction::Edit(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    #[test]
    fn test_control_keys() {
        assert_eq!(convert_key(ctrl('r')), KeyAction::Submit);
        assert_eq!(convert_key(ctrl('l')), KeyAction::ClearConsole);
        assert_eq!(convert_key(ctrl('s')), KeyAction::Save);
        assert_eq!(convert_key(ctrl('q')), KeyAction::Quit);
        assert_eq!(convert_key(ctrl('c')), KeyAction::Quit);
        assert_eq!(convert_key(ctrl('x')), KeyAction::Ignore);
    }

    #[test]
    fn test_editing_keys() {
        assert_eq!(
            convert_key(KeyEvent::from(KeyCode::Char('a'))),
            KeyAction::Edit(EditCommand::Insert('a'))
        );
        assert_eq!(
            convert_key(KeyEvent::new(KeyCode::Char('A'), KeyModifiers::SHIFT)),
            KeyAction::Edit(EditCommand::Insert('A'))
        );
        assert_eq!(
            convert_key(KeyEvent::from(KeyCode::Enter)),
            KeyAction::Edit(EditCommand::Newline)
        );
        assert_eq!(
            convert_key(KeyEvent::from(KeyCode::Tab)),
            KeyAction::Edit(EditCommand::Tab)
        );
        assert_eq!(convert_key(KeyEvent::from(KeyCode::F(5))), KeyAction::Submit);
        assert_eq!(convert_key(KeyEvent::from(KeyCode::Esc)), KeyAction::Ignore);
    }

    #[test]
    fn test_release_ignored() {
        let mut event = KeyEvent::from(KeyCode::Char('a'));
        event.kind = KeyEventKind::Release;
        assert_eq!(convert_key(event), KeyAction::Ignore);
    }
}
