#![forbid(unsafe_code)]

//! Canonical key types.
//!
//! Hosts deliver keyboard input as DOM `KeyboardEvent.key` strings plus
//! modifier flags. This module turns those into a small closed set of typed
//! keys so the resolver never compares raw strings.
//!
//! # Design Notes
//!
//! - A one-`char` key value is always [`Key::Char`], including `' '`.
//! - Multi-character values must name a [`NamedKey`]; anything else is
//!   rejected and the dispatcher lets the event pass through.
//! - `Modifiers` use bitflags for easy combination.

use std::fmt;

use bitflags::bitflags;

/// A non-character key, identified by its DOM name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedKey {
    Escape,
    Enter,
    Tab,
    Backspace,
    Delete,
    Insert,
    Home,
    End,
    PageUp,
    PageDown,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    /// Function key `F1`..=`F24`.
    F(u8),
    Shift,
    Control,
    Alt,
    Meta,
    CapsLock,
}

impl NamedKey {
    /// Parse a DOM key name such as `"Escape"` or `"F5"`.
    #[must_use]
    pub fn from_dom(name: &str) -> Option<Self> {
        let key = match name {
            "Escape" | "Esc" => Self::Escape,
            "Enter" => Self::Enter,
            "Tab" => Self::Tab,
            "Backspace" => Self::Backspace,
            "Delete" => Self::Delete,
            "Insert" => Self::Insert,
            "Home" => Self::Home,
            "End" => Self::End,
            "PageUp" => Self::PageUp,
            "PageDown" => Self::PageDown,
            "ArrowUp" => Self::ArrowUp,
            "ArrowDown" => Self::ArrowDown,
            "ArrowLeft" => Self::ArrowLeft,
            "ArrowRight" => Self::ArrowRight,
            "Shift" => Self::Shift,
            "Control" => Self::Control,
            "Alt" => Self::Alt,
            "Meta" => Self::Meta,
            "CapsLock" => Self::CapsLock,
            other => {
                let n: u8 = other.strip_prefix('F')?.parse().ok()?;
                if !(1..=24).contains(&n) {
                    return None;
                }
                Self::F(n)
            }
        };
        Some(key)
    }

    /// Keys that only change the state of other keys.
    #[must_use]
    pub const fn is_modifier(self) -> bool {
        matches!(
            self,
            Self::Shift | Self::Control | Self::Alt | Self::Meta | Self::CapsLock
        )
    }
}

impl fmt::Display for NamedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Escape => "Escape",
            Self::Enter => "Enter",
            Self::Tab => "Tab",
            Self::Backspace => "Backspace",
            Self::Delete => "Delete",
            Self::Insert => "Insert",
            Self::Home => "Home",
            Self::End => "End",
            Self::PageUp => "PageUp",
            Self::PageDown => "PageDown",
            Self::ArrowUp => "ArrowUp",
            Self::ArrowDown => "ArrowDown",
            Self::ArrowLeft => "ArrowLeft",
            Self::ArrowRight => "ArrowRight",
            Self::F(n) => return write!(f, "F{n}"),
            Self::Shift => "Shift",
            Self::Control => "Control",
            Self::Alt => "Alt",
            Self::Meta => "Meta",
            Self::CapsLock => "CapsLock",
        };
        f.write_str(name)
    }
}

/// A single key symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// A key that produces one character.
    Char(char),
    /// A named, non-character key.
    Named(NamedKey),
}

impl Key {
    /// Parse a DOM `KeyboardEvent.key` value.
    ///
    /// Returns `None` for empty strings and unknown multi-character names
    /// (`"Unidentified"`, `"AudioVolumeUp"`, ...).
    #[must_use]
    pub fn from_dom(value: &str) -> Option<Self> {
        let mut chars = value.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Some(Self::Char(c)),
            (Some(_), Some(_)) => NamedKey::from_dom(value).map(Self::Named),
            (None, _) => None,
        }
    }

    /// True for keys whose DOM value is a single character.
    ///
    /// Only these keys take part in the resolver's last-key retry.
    #[must_use]
    pub const fn is_single_char(self) -> bool {
        matches!(self, Self::Char(_))
    }

    #[must_use]
    pub const fn is_modifier(self) -> bool {
        matches!(self, Self::Named(named) if named.is_modifier())
    }

    #[must_use]
    pub const fn is_escape(self) -> bool {
        matches!(self, Self::Named(NamedKey::Escape))
    }

    /// Lowercase a character key. Characters whose lowercase form expands to
    /// several characters are left unchanged.
    #[must_use]
    pub fn to_lowercase(self) -> Self {
        match self {
            Self::Char(c) => {
                let mut lower = c.to_lowercase();
                match (lower.next(), lower.next()) {
                    (Some(l), None) => Self::Char(l),
                    _ => self,
                }
            }
            named => named,
        }
    }
}

impl From<char> for Key {
    fn from(c: char) -> Self {
        Self::Char(c)
    }
}

impl From<NamedKey> for Key {
    fn from(named: NamedKey) -> Self {
        Self::Named(named)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Char(c) => write!(f, "{c}"),
            Self::Named(named) => named.fmt(f),
        }
    }
}

bitflags! {
    /// Modifier keys that can be held during a key press.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        /// No modifiers.
        const NONE  = 0b0000;
        /// Shift key.
        const SHIFT = 0b0001;
        /// Control key.
        const CTRL  = 0b0010;
        /// Alt/Option key.
        const ALT   = 0b0100;
        /// Meta/Command key.
        const META  = 0b1000;
    }
}

impl Default for Modifiers {
    fn default() -> Self {
        Self::NONE
    }
}

/// A key press as delivered by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyPress {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyPress {
    #[must_use]
    pub const fn new(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers::NONE,
        }
    }

    #[must_use]
    pub const fn char(c: char) -> Self {
        Self::new(Key::Char(c))
    }

    #[must_use]
    pub const fn named(named: NamedKey) -> Self {
        Self::new(Key::Named(named))
    }

    #[must_use]
    pub const fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Build a press from a DOM key value; `None` if the value is unknown.
    #[must_use]
    pub fn from_dom(value: &str, modifiers: Modifiers) -> Option<Self> {
        Key::from_dom(value).map(|key| Self { key, modifiers })
    }

    /// Ctrl, Alt, or Meta held. Such chords belong to the browser.
    #[must_use]
    pub fn has_command_modifier(&self) -> bool {
        self.modifiers
            .intersects(Modifiers::CTRL | Modifiers::ALT | Modifiers::META)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_char_values_are_char_keys() {
        assert_eq!(Key::from_dom("j"), Some(Key::Char('j')));
        assert_eq!(Key::from_dom("G"), Some(Key::Char('G')));
        assert_eq!(Key::from_dom(" "), Some(Key::Char(' ')));
        assert_eq!(Key::from_dom("é"), Some(Key::Char('é')));
    }

    #[test]
    fn named_values_parse() {
        assert_eq!(Key::from_dom("Escape"), Some(Key::Named(NamedKey::Escape)));
        assert_eq!(Key::from_dom("Esc"), Some(Key::Named(NamedKey::Escape)));
        assert_eq!(
            Key::from_dom("ArrowLeft"),
            Some(Key::Named(NamedKey::ArrowLeft))
        );
        assert_eq!(Key::from_dom("F12"), Some(Key::Named(NamedKey::F(12))));
    }

    #[test]
    fn unknown_values_are_rejected() {
        assert_eq!(Key::from_dom(""), None);
        assert_eq!(Key::from_dom("Unidentified"), None);
        assert_eq!(Key::from_dom("F0"), None);
        assert_eq!(Key::from_dom("F25"), None);
        assert_eq!(Key::from_dom("Fx"), None);
    }

    #[test]
    fn display_matches_dom_name() {
        for name in ["Escape", "Enter", "PageDown", "F7", "CapsLock"] {
            let key = Key::from_dom(name).unwrap();
            assert_eq!(key.to_string(), name);
        }
        assert_eq!(Key::Char('x').to_string(), "x");
    }

    #[test]
    fn modifier_only_keys() {
        assert!(Key::Named(NamedKey::Shift).is_modifier());
        assert!(Key::Named(NamedKey::CapsLock).is_modifier());
        assert!(!Key::Named(NamedKey::Escape).is_modifier());
        assert!(!Key::Char('a').is_modifier());
    }

    #[test]
    fn lowercase_only_touches_chars() {
        assert_eq!(Key::Char('A').to_lowercase(), Key::Char('a'));
        assert_eq!(Key::Char('a').to_lowercase(), Key::Char('a'));
        assert_eq!(
            Key::Named(NamedKey::Enter).to_lowercase(),
            Key::Named(NamedKey::Enter)
        );
        // 'İ' lowercases to two chars; left as-is.
        assert_eq!(Key::Char('İ').to_lowercase(), Key::Char('İ'));
    }

    #[test]
    fn command_modifiers() {
        let plain = KeyPress::char('j');
        assert!(!plain.has_command_modifier());
        assert!(!plain.with_modifiers(Modifiers::SHIFT).has_command_modifier());
        assert!(plain.with_modifiers(Modifiers::CTRL).has_command_modifier());
        assert!(plain.with_modifiers(Modifiers::ALT).has_command_modifier());
        assert!(
            plain
                .with_modifiers(Modifiers::META | Modifiers::SHIFT)
                .has_command_modifier()
        );
    }

    #[test]
    fn press_from_dom() {
        let press = KeyPress::from_dom("Tab", Modifiers::SHIFT).unwrap();
        assert_eq!(press.key, Key::Named(NamedKey::Tab));
        assert_eq!(press.modifiers, Modifiers::SHIFT);
        assert!(KeyPress::from_dom("Dead", Modifiers::NONE).is_none());
    }
}
