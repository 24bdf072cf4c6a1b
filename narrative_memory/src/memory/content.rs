//! Opaque memory payload.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Structured payload carried by a memory.
///
/// The store passes this through unmodified. The only thing it ever reads
/// from it is the set of string leaves, as plain text for keyword matching.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoryContent(Map<String, Value>);

impl MemoryContent {
    /// Create an empty payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a payload holding a single `text` field.
    pub fn text(text: impl Into<String>) -> Self {
        Self::new().with("text", text.into())
    }

    /// Set a field on the payload.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Get a field from the payload.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the underlying record.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Every string leaf in the payload, depth first, joined by spaces.
    pub fn plain_text(&self) -> String {
        let mut fragments = Vec::new();
        for value in self.0.values() {
            collect_strings(value, &mut fragments);
        }
        fragments.join(" ")
    }
}

impl From<Map<String, Value>> for MemoryContent {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<&str> for MemoryContent {
    fn from(text: &str) -> Self {
        Self::text(text)
    }
}

impl From<String> for MemoryContent {
    fn from(text: String) -> Self {
        Self::text(text)
    }
}

fn collect_strings<'a>(value: &'a Value, out: &mut Vec<&'a str>) {
    match value {
        Value::String(s) => out.push(s),
        Value::Array(items) => items.iter().for_each(|v| collect_strings(v, out)),
        Value::Object(map) => map.values().for_each(|v| collect_strings(v, out)),
        _ => {}
    }
}

/// Split text into lowercase alphanumeric words.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Words of `text`, plus every run of up to `max_words` consecutive words
/// joined by single spaces, for matching multi-word keywords.
pub(crate) fn keyword_windows(text: &str, max_words: usize) -> Vec<String> {
    let tokens = tokenize(text);
    let mut windows = Vec::new();
    for width in 1..=max_words.min(tokens.len()) {
        windows.extend(tokens.windows(width).map(|w| w.join(" ")));
    }
    windows
}

/// Normalize a free-form tag or keyword; blank values are dropped.
pub(crate) fn normalize_tag(tag: &str) -> Option<String> {
    let tag = tag.trim().to_lowercase();
    if tag.is_empty() {
        None
    } else {
        Some(tag)
    }
}

/// Normalize a trigger keyword into the same word form text lookups
/// produce: lowercase alphanumeric words joined by single spaces.
/// Keywords with no words are dropped.
pub(crate) fn normalize_keyword(keyword: &str) -> Option<String> {
    let words = tokenize(keyword);
    if words.is_empty() {
        None
    } else {
        Some(words.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_text_collects_nested_strings() {
        let content = MemoryContent::new()
            .with("summary", "The bridge collapsed")
            .with("details", json!({ "cause": "storm", "deaths": 3 }))
            .with("witnesses", json!(["Mara", "Tobin"]));

        let text = content.plain_text();
        assert!(text.contains("The bridge collapsed"));
        assert!(text.contains("storm"));
        assert!(text.contains("Tobin"));
        assert!(!text.contains('3'));
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(
            tokenize("Because the King's guard fled, the gate fell!"),
            vec!["because", "the", "king", "s", "guard", "fled", "the", "gate", "fell"]
        );
        assert!(tokenize("  ...  ").is_empty());
    }

    #[test]
    fn test_keyword_windows() {
        assert_eq!(
            keyword_windows("Iron gate, held", 2),
            vec!["iron", "gate", "held", "iron gate", "gate held"]
        );
        assert!(keyword_windows("", 3).is_empty());
    }

    #[test]
    fn test_normalize_tag() {
        assert_eq!(normalize_tag("  Betrayal "), Some("betrayal".to_string()));
        assert_eq!(normalize_tag("   "), None);
    }

    #[test]
    fn test_normalize_keyword_matches_windows() {
        assert_eq!(normalize_keyword("King's Guard"), Some("king s guard".to_string()));
        assert_eq!(normalize_keyword(" Lord-Commander "), Some("lord commander".to_string()));
        assert_eq!(normalize_keyword("--"), None);

        let windows = keyword_windows("The king's guard fled", 3);
        assert!(windows.contains(&"king s guard".to_string()));
    }

    #[test]
    fn test_content_is_transparent_json() {
        let content = MemoryContent::text("hello");
        assert_eq!(serde_json::to_value(&content).unwrap(), json!({ "text": "hello" }));
    }
}
