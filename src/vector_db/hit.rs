// Ranked search hits as returned by a vector index
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;

/// Attribute key holding the answer row of a QA pair
pub const ANSWER_KEY: &str = "a";
/// Attribute key holding the source file path
pub const FILE_NAME_KEY: &str = "fileName";
/// Attribute key holding the source line number
pub const LINE_NUMBER_KEY: &str = "lineNumber";

/// One ranked result. Attribute values are the raw bytes the backend
/// stored, so string values usually arrive JSON-quoted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub content: String,
    pub score: f32,
    pub attributes: HashMap<String, Vec<u8>>,
}

impl SearchHit {
    pub fn new(content: impl Into<String>, score: f32) -> Self {
        Self {
            content: content.into(),
            score,
            attributes: HashMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: &str, raw: impl Into<Vec<u8>>) -> Self {
        self.attributes.insert(key.to_string(), raw.into());
        self
    }

    /// Build a hit from JSON metadata, keeping each value's JSON encoding
    pub fn from_json_metadata(
        content: String,
        score: f32,
        metadata: impl IntoIterator<Item = (String, JsonValue)>,
    ) -> Self {
        let attributes = metadata
            .into_iter()
            .map(|(key, value)| (key, value.to_string().into_bytes()))
            .collect();
        Self {
            content,
            score,
            attributes,
        }
    }

    pub fn raw_attribute(&self, key: &str) -> &[u8] {
        self.attributes.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Decode the citation attributes once
    pub fn decode_attributes(&self) -> HitAttributes {
        HitAttributes::decode(&self.attributes)
    }
}

/// Typed view of the citation attributes of a hit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HitAttributes {
    /// Present iff the raw answer bytes are non-empty; unquoted
    pub answer: Option<String>,
    /// Unquoted source file path
    pub file_path: Option<String>,
    /// `None` when absent or not a base-10 integer
    pub line_number: Option<i64>,
}

impl HitAttributes {
    pub fn decode(attributes: &HashMap<String, Vec<u8>>) -> Self {
        let text = |key: &str| {
            attributes
                .get(key)
                .filter(|raw| !raw.is_empty())
                .map(|raw| String::from_utf8_lossy(raw).into_owned())
        };

        Self {
            answer: text(ANSWER_KEY).map(|s| unquote(&s).to_string()),
            file_path: text(FILE_NAME_KEY).map(|s| unquote(&s).to_string()),
            line_number: text(LINE_NUMBER_KEY).and_then(|s| s.parse::<i64>().ok()),
        }
    }
}

/// Strip one leading and one trailing `"` when both are present
pub fn unquote(s: &str) -> &str {
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        &s[1..s.len() - 1]
    } else {
        s
    }
}
