//! Keyboard stand-in for the physical buttons.
//!
//! Three rows of five keys map onto positions `0..15`:
//!
//! ```text
//!   1 2 3 4 5     ->   0  1  2  3  4
//!   q w e r t     ->   5  6  7  8  9
//!   a s d f g     ->  10 11 12 13 14
//! ```
//!
//! The shifted key (uppercase letter, or `! @ # $ %` on the digit row)
//! holds the button past the long-press threshold.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

const ROWS: [&str; 3] = ["12345", "qwert", "asdfg"];
const SHIFTED_DIGITS: &str = "!@#$%";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Quit,
    Tap(usize),
    Hold(usize),
}

pub fn map_key(key: KeyEvent) -> Option<KeyAction> {
    match key.code {
        KeyCode::Esc => Some(KeyAction::Quit),
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(KeyAction::Quit)
        }
        KeyCode::Char(c) => {
            let shifted = key.modifiers.contains(KeyModifiers::SHIFT) || c.is_ascii_uppercase();
            if let Some(idx) = SHIFTED_DIGITS.find(c) {
                return Some(KeyAction::Hold(idx));
            }
            let position = position_of(c.to_ascii_lowercase())?;
            Some(if shifted {
                KeyAction::Hold(position)
            } else {
                KeyAction::Tap(position)
            })
        }
        _ => None,
    }
}

fn position_of(c: char) -> Option<usize> {
    ROWS.iter()
        .enumerate()
        .find_map(|(row, keys)| keys.find(c).map(|col| row * 5 + col))
}

/// Key hint printed on the button at `position`.
pub fn key_hint(position: usize) -> Option<char> {
    let row = ROWS.get(position / 5)?;
    row.chars().nth(position % 5)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn rows_map_to_positions() {
        let plain = |c| map_key(key(KeyCode::Char(c), KeyModifiers::NONE));
        assert_eq!(plain('1'), Some(KeyAction::Tap(0)));
        assert_eq!(plain('t'), Some(KeyAction::Tap(9)));
        assert_eq!(plain('g'), Some(KeyAction::Tap(14)));
        assert_eq!(plain('z'), None);
    }

    #[test]
    fn shifted_keys_hold() {
        assert_eq!(
            map_key(key(KeyCode::Char('Q'), KeyModifiers::SHIFT)),
            Some(KeyAction::Hold(5))
        );
        assert_eq!(
            map_key(key(KeyCode::Char('#'), KeyModifiers::SHIFT)),
            Some(KeyAction::Hold(2))
        );
    }

    #[test]
    fn escape_and_ctrl_c_quit() {
        assert_eq!(
            map_key(key(KeyCode::Esc, KeyModifiers::NONE)),
            Some(KeyAction::Quit)
        );
        assert_eq!(
            map_key(key(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(KeyAction::Quit)
        );
    }

    #[test]
    fn hints_follow_layout() {
        assert_eq!(key_hint(0), Some('1'));
        assert_eq!(key_hint(12), Some('d'));
        assert_eq!(key_hint(15), None);
    }
}
