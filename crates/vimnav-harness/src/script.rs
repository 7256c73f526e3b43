#![forbid(unsafe_code)]

//! Line-oriented scripts for driving an engine.
//!
//! ```text
//! # scroll, then follow the second link in a new tab
//! keys j j gg
//! wait 300
//! keys F a s
//! focus 7
//! keys text:hello esc
//! search fox
//! settings {"scrollStepSize": 40}
//! url https://mail.example.com/inbox
//! ```
//!
//! | Line | Step |
//! |------|------|
//! | `keys <tokens>` | one [`ScriptStep::Key`] per key, `wait:<ms>` tokens inline |
//! | `wait <ms>` | advance the clock |
//! | `focus <id>` / `blur <id>` | user moves focus |
//! | `search <query>` | submit the search bar |
//! | `cancel-search` | Escape in the search bar |
//! | `settings <json>` | `SETTINGS_UPDATED` message |
//! | `url <url>` | same-document navigation |
//!
//! Key tokens: `esc`, `enter`, `tab`, `space`, `backspace`, `up`, `down`,
//! `left`, `right`, `pageup`, `pagedown`, `home`, `end`; modifier chords
//! like `ctrl+f` or `shift+tab`; `text:<chars>` types each character; DOM
//! names such as `F5` or `ArrowDown`; any other token types its characters
//! one by one, so `gg` is two presses of `g`.

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use vimnav_core::element::ElementId;
use vimnav_core::{KeyPress, Modifiers, NamedKey};

/// One scripted input.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptStep {
    Key(KeyPress),
    Wait(Duration),
    Focus(ElementId),
    Blur(ElementId),
    Search(String),
    CancelSearch,
    Settings(Value),
    Navigate(String),
}

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("line {line}: unknown command `{command}`")]
    UnknownCommand { line: usize, command: String },

    #[error("line {line}: `{command}` needs an argument")]
    MissingArgument { line: usize, command: &'static str },

    #[error("line {line}: bad key token `{token}`")]
    BadKey { line: usize, token: String },

    #[error("line {line}: bad number `{value}`")]
    BadNumber { line: usize, value: String },

    #[error("line {line}: settings JSON: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Parse a whole script.
pub fn parse_script(source: &str) -> Result<Vec<ScriptStep>, ScriptError> {
    let mut steps = Vec::new();
    for (index, raw) in source.lines().enumerate() {
        let line = index + 1;
        let text = raw.trim();
        if text.is_empty() || text.starts_with('#') {
            continue;
        }
        let (command, rest) = match text.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (text, ""),
        };
        match command {
            "keys" => {
                let tokens = require(line, "keys", rest)?;
                for token in tokens.split_whitespace() {
                    parse_key_token(line, token, &mut steps)?;
                }
            }
            "wait" => steps.push(ScriptStep::Wait(parse_millis(line, require(line, "wait", rest)?)?)),
            "focus" => steps.push(ScriptStep::Focus(parse_element(line, require(line, "focus", rest)?)?)),
            "blur" => steps.push(ScriptStep::Blur(parse_element(line, require(line, "blur", rest)?)?)),
            // An empty query is meaningful: it closes the bar without searching.
            "search" => steps.push(ScriptStep::Search(rest.to_string())),
            "cancel-search" => steps.push(ScriptStep::CancelSearch),
            "settings" => {
                let json = require(line, "settings", rest)?;
                let value = serde_json::from_str(json)
                    .map_err(|source| ScriptError::Json { line, source })?;
                steps.push(ScriptStep::Settings(value));
            }
            "url" => steps.push(ScriptStep::Navigate(require(line, "url", rest)?.to_string())),
            other => {
                return Err(ScriptError::UnknownCommand {
                    line,
                    command: other.to_string(),
                });
            }
        }
    }
    Ok(steps)
}

fn require<'a>(line: usize, command: &'static str, rest: &'a str) -> Result<&'a str, ScriptError> {
    if rest.is_empty() {
        Err(ScriptError::MissingArgument { line, command })
    } else {
        Ok(rest)
    }
}

fn parse_millis(line: usize, value: &str) -> Result<Duration, ScriptError> {
    value
        .trim()
        .trim_end_matches("ms")
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| ScriptError::BadNumber {
            line,
            value: value.to_string(),
        })
}

fn parse_element(line: usize, value: &str) -> Result<ElementId, ScriptError> {
    value
        .trim_start_matches('#')
        .parse::<u64>()
        .map(ElementId::new)
        .map_err(|_| ScriptError::BadNumber {
            line,
            value: value.to_string(),
        })
}

fn named_token(lower: &str) -> Option<KeyPress> {
    let key = match lower {
        "esc" | "escape" => NamedKey::Escape,
        "enter" | "return" => NamedKey::Enter,
        "tab" => NamedKey::Tab,
        "backspace" => NamedKey::Backspace,
        "delete" | "del" => NamedKey::Delete,
        "up" => NamedKey::ArrowUp,
        "down" => NamedKey::ArrowDown,
        "left" => NamedKey::ArrowLeft,
        "right" => NamedKey::ArrowRight,
        "pageup" => NamedKey::PageUp,
        "pagedown" => NamedKey::PageDown,
        "home" => NamedKey::Home,
        "end" => NamedKey::End,
        "space" => return Some(KeyPress::char(' ')),
        _ => return None,
    };
    Some(KeyPress::named(key))
}

fn modifier(name: &str) -> Option<Modifiers> {
    match name {
        "ctrl" | "control" => Some(Modifiers::CTRL),
        "alt" | "opt" => Some(Modifiers::ALT),
        "meta" | "cmd" | "super" => Some(Modifiers::META),
        "shift" => Some(Modifiers::SHIFT),
        _ => None,
    }
}

/// A single key, possibly a `mod+key` chord.
fn parse_single(token: &str) -> Option<KeyPress> {
    let lower = token.to_ascii_lowercase();
    if let Some(press) = named_token(&lower) {
        return Some(press);
    }
    if let Some(press) = KeyPress::from_dom(token, Modifiers::NONE)
        && token.chars().count() > 1
    {
        return Some(press);
    }
    let (mods, key) = token.rsplit_once('+')?;
    if key.is_empty() {
        return None;
    }
    let mut modifiers = Modifiers::NONE;
    for name in mods.split('+') {
        modifiers |= modifier(&name.to_ascii_lowercase())?;
    }
    let press = parse_single(key).or_else(|| {
        let mut chars = key.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Some(KeyPress::char(c)),
            _ => None,
        }
    })?;
    Some(press.with_modifiers(press.modifiers | modifiers))
}

fn parse_key_token(line: usize, token: &str, steps: &mut Vec<ScriptStep>) -> Result<(), ScriptError> {
    let lower = token.to_ascii_lowercase();

    if lower.starts_with("sleep:") || lower.starts_with("wait:") {
        let value = token.split_once(':').map_or("0", |(_, value)| value);
        steps.push(ScriptStep::Wait(parse_millis(line, value)?));
        return Ok(());
    }

    if lower.starts_with("text:") {
        let text = token.split_once(':').map_or("", |(_, value)| value);
        steps.extend(text.chars().map(|c| ScriptStep::Key(KeyPress::char(c))));
        return Ok(());
    }

    if let Some(press) = parse_single(token) {
        steps.push(ScriptStep::Key(press));
        return Ok(());
    }

    // Chords that failed to parse are errors; plain runs are typed.
    if token.len() > 1 && token.contains('+') {
        return Err(ScriptError::BadKey {
            line,
            token: token.to_string(),
        });
    }
    steps.extend(token.chars().map(|c| ScriptStep::Key(KeyPress::char(c))));
    Ok(())
}
