//! Settings descriptor recovery.
//!
//! A build's settings script is a single global assignment such as
//! `window._CCSettings={platform:'web-mobile',jsList:['libs/a.js'],...};`.
//! It is JavaScript, not JSON, and it is never executed here. Recovery runs
//! through a fixed chain of layers, each attempted only when the previous
//! one fails:
//!
//! 1. find the assignment to one of [`TARGET_NAMES`] and isolate the literal
//! 2. normalize it toward JSON (quotes, trailing commas, bare keys, `!0`/`!1`)
//! 3. parse it with `serde_json` -> [`ParsedSettings::FullyParsed`]
//! 4. regex out only the script list -> [`ParsedSettings::PartiallyRecovered`]
//! 5. give up -> [`ParsedSettings::Empty`]

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};

/// Global variables a settings script may assign
pub const TARGET_NAMES: [&str; 2] = ["window._CCSettings", "window.CCSettings"];

/// Keys under which the auxiliary script list is stored
pub const SCRIPT_LIST_KEYS: [&str; 2] = ["scriptList", "jsList"];

/// Structured settings recovered from a settings script
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SettingsDescriptor {
    fields: Map<String, Value>,
}

impl SettingsDescriptor {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Ordered auxiliary script paths, duplicates included
    pub fn script_list(&self) -> Vec<String> {
        SCRIPT_LIST_KEYS
            .iter()
            .find_map(|key| self.fields.get(*key).and_then(Value::as_array))
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Outcome of [`parse`], tagged with how far recovery got
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedSettings {
    /// The whole literal parsed as data
    FullyParsed(SettingsDescriptor),
    /// Only the script list could be pulled out
    PartiallyRecovered(SettingsDescriptor),
    /// Nothing recognizable
    Empty,
}

impl ParsedSettings {
    pub fn descriptor(&self) -> Option<&SettingsDescriptor> {
        match self {
            Self::FullyParsed(d) | Self::PartiallyRecovered(d) => Some(d),
            Self::Empty => None,
        }
    }

    pub fn into_descriptor(self) -> SettingsDescriptor {
        match self {
            Self::FullyParsed(d) | Self::PartiallyRecovered(d) => d,
            Self::Empty => SettingsDescriptor::default(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        !matches!(self, Self::FullyParsed(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::FullyParsed(_) => "fully parsed",
            Self::PartiallyRecovered(_) => "partially recovered",
            Self::Empty => "empty",
        }
    }
}

static TRAILING_COMMA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",\s*([}\]])").expect("valid regex"));

static BARE_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"([{,]\s*)([A-Za-z_$][\w$]*)\s*:"#).expect("valid regex"));

/// `!0` / `!1` as emitted by minifiers
static MINIFIED_BOOL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([:\[,]\s*)!([01])\b").expect("valid regex"));

static SCRIPT_LIST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)\b(scriptList|jsList)\s*:\s*\[(.*?)\]").expect("valid regex")
});

/// Recover a settings descriptor from raw settings script bytes
pub fn parse(raw: &[u8]) -> ParsedSettings {
    let text = String::from_utf8_lossy(raw);
    tracing::debug!(
        "settings content: {}...",
        text.chars().take(200).collect::<String>()
    );

    if let Some(literal) = isolate_literal(&text) {
        let normalized = normalize(literal);
        match serde_json::from_str::<Value>(&normalized) {
            Ok(Value::Object(fields)) => {
                return ParsedSettings::FullyParsed(SettingsDescriptor::new(fields));
            }
            Ok(other) => {
                tracing::debug!("settings literal is not an object: {}", other);
            }
            Err(e) => {
                tracing::debug!("settings literal did not parse, extracting script list: {}", e);
            }
        }
    }

    if let Some(descriptor) = recover_script_list(&text) {
        return ParsedSettings::PartiallyRecovered(descriptor);
    }

    tracing::warn!("no settings assignment or script list found, using empty settings");
    ParsedSettings::Empty
}

/// Text of the object literal in the first assignment to a target name.
///
/// Reads of the name (`var s = window._CCSettings`) and comparisons are skipped.
fn isolate_literal(text: &str) -> Option<&str> {
    let value = TARGET_NAMES.iter().find_map(|name| {
        text.match_indices(name).find_map(|(start, _)| {
            let after_name = text[start + name.len()..].trim_start();
            let value = after_name.strip_prefix('=')?;
            (!value.starts_with('=')).then(|| value.trim_start())
        })
    })?;

    Some(match balanced_object(value) {
        Some(end) => &value[..end],
        None => value.trim_end().trim_end_matches(';').trim_end(),
    })
}

/// Byte length of the leading `{...}` block, skipping over string contents
fn balanced_object(text: &str) -> Option<usize> {
    if !text.starts_with('{') {
        return None;
    }

    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '"' | '\'' | '`' => quote = Some(c),
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }

    None
}

/// Push a JavaScript object literal toward strict JSON
fn normalize(literal: &str) -> String {
    let quoted = literal.replace('\'', "\"");
    let keyed = BARE_KEY.replace_all(&quoted, "$1\"$2\":");
    let booleans = MINIFIED_BOOL.replace_all(&keyed, |caps: &regex::Captures| {
        let value = if &caps[2] == "0" { "true" } else { "false" };
        format!("{}{}", &caps[1], value)
    });
    TRAILING_COMMA.replace_all(&booleans, "$1").into_owned()
}

/// Pull just the script list array out of unparseable settings text
fn recover_script_list(text: &str) -> Option<SettingsDescriptor> {
    let caps = SCRIPT_LIST.captures(text)?;
    let key = caps[1].to_string();

    let items: Vec<Value> = caps[2]
        .split(',')
        .map(|item| item.trim().trim_matches(|c| c == '\'' || c == '"').trim())
        .filter(|item| !item.is_empty())
        .map(|item| Value::String(item.to_string()))
        .collect();

    let mut fields = Map::new();
    fields.insert(key, Value::Array(items));
    Some(SettingsDescriptor::new(fields))
}
