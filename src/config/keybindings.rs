//! Keybinding configuration for the TUI.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde::Deserialize;
use tracing::warn;

use crate::tui::event::Action;

/// Key lists per action, as written in the config file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KeybindingConfig {
    pub quit: Vec<String>,
    pub move_up: Vec<String>,
    pub move_down: Vec<String>,
    pub next_page: Vec<String>,
    pub prev_page: Vec<String>,
    pub next_pane: Vec<String>,
    pub prev_pane: Vec<String>,
    pub select: Vec<String>,
    pub open_in_browser: Vec<String>,
    pub delete_bookmark: Vec<String>,
    pub sign_in: Vec<String>,
    pub sign_out: Vec<String>,
    pub reload: Vec<String>,
}

fn keys(list: &[&str]) -> Vec<String> {
    list.iter().map(|k| k.to_string()).collect()
}

impl Default for KeybindingConfig {
    fn default() -> Self {
        Self {
            quit: keys(&["q", "Ctrl+c"]),
            move_up: keys(&["k", "Up"]),
            move_down: keys(&["j", "Down"]),
            next_page: keys(&["n", "PageDown"]),
            prev_page: keys(&["p", "PageUp"]),
            next_pane: keys(&["Tab"]),
            prev_pane: keys(&["BackTab", "Shift+Tab"]),
            select: keys(&["Enter"]),
            open_in_browser: keys(&["o"]),
            delete_bookmark: keys(&["d", "Delete"]),
            sign_in: keys(&["l"]),
            sign_out: keys(&["L"]),
            reload: keys(&["R"]),
        }
    }
}

impl KeybindingConfig {
    /// Parse every configured key once. Unparseable entries are logged and skipped.
    pub fn keymap(&self) -> Keymap {
        let table: [(&[String], Action); 13] = [
            (&self.quit, Action::Quit),
            (&self.move_up, Action::MoveUp),
            (&self.move_down, Action::MoveDown),
            (&self.next_page, Action::NextPage),
            (&self.prev_page, Action::PrevPage),
            (&self.next_pane, Action::NextPane),
            (&self.prev_pane, Action::PrevPane),
            (&self.select, Action::Select),
            (&self.open_in_browser, Action::OpenInBrowser),
            (&self.delete_bookmark, Action::DeleteBookmark),
            (&self.sign_in, Action::SignIn),
            (&self.sign_out, Action::SignOut),
            (&self.reload, Action::Reload),
        ];

        let mut bindings = Vec::new();
        for (entries, action) in table {
            for entry in entries {
                match parse_key_string(entry) {
                    Ok(binding) => bindings.push((binding, action)),
                    Err(e) => warn!("Ignoring keybinding {:?} for {:?}: {}", entry, action, e),
                }
            }
        }
        Keymap { bindings }
    }
}

/// Parsed keybindings, first match wins.
#[derive(Debug, Clone)]
pub struct Keymap {
    bindings: Vec<(KeyBinding, Action)>,
}

impl Keymap {
    pub fn action_for(&self, key: &KeyEvent) -> Action {
        self.bindings
            .iter()
            .find(|(binding, _)| binding.matches(key))
            .map(|(_, action)| *action)
            .unwrap_or(Action::None)
    }
}

/// A parsed key binding with code and modifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBinding {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeyBinding {
    /// Shift is implied by the character itself, so "L" matches Shift+l as typed.
    pub fn matches(&self, key: &KeyEvent) -> bool {
        self.code == key.code
            && (self.modifiers == key.modifiers
                || self.modifiers == (key.modifiers & !KeyModifiers::SHIFT))
    }
}

/// Parse "x", "Ctrl+x", "Shift+Tab", "F5", "PageDown" and the like.
pub fn parse_key_string(s: &str) -> Result<KeyBinding, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Empty key".to_string());
    }

    // A lone "+" is the plus key, not a separator.
    let (prefix, key_part) = match s.rsplit_once('+') {
        Some((prefix, "")) => (prefix.strip_suffix('+').unwrap_or(""), "+"),
        Some((prefix, key)) => (prefix, key),
        None => ("", s),
    };

    let mut modifiers = KeyModifiers::NONE;
    for part in prefix.split('+').filter(|p| !p.is_empty()) {
        modifiers |= match part.to_lowercase().as_str() {
            "ctrl" | "control" => KeyModifiers::CONTROL,
            "shift" => KeyModifiers::SHIFT,
            "alt" | "meta" => KeyModifiers::ALT,
            _ => return Err(format!("Unknown modifier: {}", part)),
        };
    }

    Ok(KeyBinding {
        code: parse_key_code(key_part)?,
        modifiers,
    })
}

fn parse_key_code(s: &str) -> Result<KeyCode, String> {
    let mut chars = s.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return Ok(KeyCode::Char(c));
    }

    let lower = s.to_lowercase();
    if let Some(n) = lower.strip_prefix('f').and_then(|n| n.parse::<u8>().ok()) {
        if (1..=12).contains(&n) {
            return Ok(KeyCode::F(n));
        }
    }

    match lower.as_str() {
        "enter" | "return" => Ok(KeyCode::Enter),
        "tab" => Ok(KeyCode::Tab),
        "backtab" => Ok(KeyCode::BackTab),
        "backspace" | "bs" => Ok(KeyCode::Backspace),
        "delete" | "del" => Ok(KeyCode::Delete),
        "home" => Ok(KeyCode::Home),
        "end" => Ok(KeyCode::End),
        "pageup" | "pgup" => Ok(KeyCode::PageUp),
        "pagedown" | "pgdn" => Ok(KeyCode::PageDown),
        "up" => Ok(KeyCode::Up),
        "down" => Ok(KeyCode::Down),
        "left" => Ok(KeyCode::Left),
        "right" => Ok(KeyCode::Right),
        "esc" | "escape" => Ok(KeyCode::Esc),
        "space" => Ok(KeyCode::Char(' ')),
        _ => Err(format!("Unknown key: {}", s)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_and_special_keys() {
        assert_eq!(parse_key_string("j").unwrap().code, KeyCode::Char('j'));
        assert_eq!(parse_key_string("L").unwrap().code, KeyCode::Char('L'));
        assert_eq!(parse_key_string("Enter").unwrap().code, KeyCode::Enter);
        assert_eq!(parse_key_string("pgdn").unwrap().code, KeyCode::PageDown);
        assert_eq!(parse_key_string("F12").unwrap().code, KeyCode::F(12));
        assert_eq!(parse_key_string("+").unwrap().code, KeyCode::Char('+'));
    }

    #[test]
    fn test_parse_modifiers() {
        let binding = parse_key_string("Ctrl+Shift+a").unwrap();
        assert_eq!(binding.code, KeyCode::Char('a'));
        assert_eq!(binding.modifiers, KeyModifiers::CONTROL | KeyModifiers::SHIFT);

        let binding = parse_key_string("Ctrl++").unwrap();
        assert_eq!(binding.code, KeyCode::Char('+'));
        assert_eq!(binding.modifiers, KeyModifiers::CONTROL);
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_key_string("").is_err());
        assert!(parse_key_string("Hyper+x").is_err());
        assert!(parse_key_string("F13").is_err());
        assert!(parse_key_string("NotAKey").is_err());
    }

    #[test]
    fn test_shift_is_implied_by_uppercase() {
        let binding = parse_key_string("L").unwrap();
        assert!(binding.matches(&KeyEvent::new(KeyCode::Char('L'), KeyModifiers::SHIFT)));
        assert!(binding.matches(&KeyEvent::new(KeyCode::Char('L'), KeyModifiers::NONE)));
    }

    #[test]
    fn test_default_keymap() {
        let keymap = KeybindingConfig::default().keymap();
        let press = |code, modifiers| keymap.action_for(&KeyEvent::new(code, modifiers));

        assert_eq!(press(KeyCode::Char('c'), KeyModifiers::CONTROL), Action::Quit);
        assert_eq!(press(KeyCode::Char('c'), KeyModifiers::NONE), Action::None);
        assert_eq!(press(KeyCode::Delete, KeyModifiers::NONE), Action::DeleteBookmark);
        assert_eq!(press(KeyCode::Char('l'), KeyModifiers::NONE), Action::SignIn);
        assert_eq!(press(KeyCode::Char('L'), KeyModifiers::SHIFT), Action::SignOut);
        assert_eq!(press(KeyCode::BackTab, KeyModifiers::SHIFT), Action::PrevPane);
    }

    #[test]
    fn test_invalid_entries_are_skipped() {
        let config = KeybindingConfig {
            quit: keys(&["Bogus+q", "x"]),
            ..KeybindingConfig::default()
        };
        let keymap = config.keymap();
        let key = KeyEvent::new(KeyCode::Char('x'), KeyModifiers::NONE);
        assert_eq!(keymap.action_for(&key), Action::Quit);
    }
}
