use serde::{Deserialize, Serialize};

/// A keyboard key, identified the way the browser reports `KeyboardEvent.code`.
///
/// The keys the default bindings care about get their own variants; every
/// other code is carried verbatim so hosts can bind arbitrary keys.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Key {
    Space,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Other(String),
}

impl Key {
    /// Parse a DOM `KeyboardEvent.code` string.
    pub fn from_code(code: &str) -> Self {
        match code {
            "Space" => Key::Space,
            "ArrowUp" => Key::ArrowUp,
            "ArrowDown" => Key::ArrowDown,
            "ArrowLeft" => Key::ArrowLeft,
            "ArrowRight" => Key::ArrowRight,
            other => Key::Other(other.to_string()),
        }
    }

    /// The DOM code string for this key.
    pub fn code(&self) -> &str {
        match self {
            Key::Space => "Space",
            Key::ArrowUp => "ArrowUp",
            Key::ArrowDown => "ArrowDown",
            Key::ArrowLeft => "ArrowLeft",
            Key::ArrowRight => "ArrowRight",
            Key::Other(code) => code,
        }
    }

    /// Keys whose browser default (scrolling) the host should suppress while running.
    pub fn is_navigation(&self) -> bool {
        !matches!(self, Key::Other(_))
    }
}

impl From<String> for Key {
    fn from(code: String) -> Self {
        Key::from_code(&code)
    }
}

impl From<Key> for String {
    fn from(key: Key) -> Self {
        match key {
            Key::Other(code) => code,
            named => named.code().to_string(),
        }
    }
}
