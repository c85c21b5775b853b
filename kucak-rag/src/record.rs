//! Data types for stored vectors, query matches, filters, and answers.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::llm::{ChatMessage, Role};

/// Metadata key holding the attribution of a passage.
pub const SOURCE_KEY: &str = "source";
/// Metadata key holding the passage text.
pub const TEXT_KEY: &str = "text";
/// Metadata key holding the gestation week a passage applies to.
pub const PREGNANCY_WEEK_KEY: &str = "pregnancy_week";
/// Metadata key holding the infant age (in weeks) a passage applies to.
pub const BABY_AGE_WEEKS_KEY: &str = "baby_age_weeks";

/// A single metadata value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MetadataValue {
    String(String),
    Number(f64),
    Bool(bool),
}

impl MetadataValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            // Integral numbers come back from JSON backends as floats; show `20`, not `20.0`.
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Self::Number(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<u32> for MetadataValue {
    fn from(value: u32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Key-value metadata attached to a stored vector.
///
/// Every passage carries at least [`SOURCE_KEY`] and [`TEXT_KEY`]. Keys are
/// kept sorted so serialized payloads are stable.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Metadata(BTreeMap<String, MetadataValue>);

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Metadata for a passage with the required `source` and `text` keys.
    pub fn passage(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new().with(SOURCE_KEY, source.into()).with(TEXT_KEY, text.into())
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<MetadataValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &MetadataValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The passage attribution, if present and a string.
    pub fn source(&self) -> Option<&str> {
        self.get(SOURCE_KEY).and_then(MetadataValue::as_str)
    }

    /// The passage text, if present and a string.
    pub fn text(&self) -> Option<&str> {
        self.get(TEXT_KEY).and_then(MetadataValue::as_str)
    }
}

impl FromIterator<(String, MetadataValue)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (String, MetadataValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A stored embedding with its ID and metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Vector {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: Metadata,
}

impl Vector {
    pub fn new(id: impl Into<String>, values: Vec<f32>, metadata: Metadata) -> Self {
        Self { id: id.into(), values, metadata }
    }
}

/// A vector returned by a similarity query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Match {
    pub id: String,
    /// The similarity score (higher is more relevant).
    pub score: f32,
    pub metadata: Metadata,
}

/// Single-field equality predicate applied to vector metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Filter {
    pub field: String,
    pub value: MetadataValue,
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        Self { field: field.into(), value: value.into() }
    }

    /// Whether `metadata` satisfies this predicate.
    pub fn matches(&self, metadata: &Metadata) -> bool {
        metadata.get(&self.field).is_some_and(|v| v == &self.value)
    }
}

/// The final answer for one question.
///
/// Built once by [`RagPipeline::answer`](crate::RagPipeline::answer) and not
/// mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Answer {
    text: String,
    references: Vec<String>,
    suggested_actions: Vec<String>,
}

impl Answer {
    pub fn new(text: String, references: Vec<String>, suggested_actions: Vec<String>) -> Self {
        Self { text, references, suggested_actions }
    }

    /// The generated answer text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Sources of the retrieved passages, in ranking order.
    pub fn references(&self) -> &[String] {
        &self.references
    }

    /// Advisories triggered by phrases in the answer text.
    pub fn suggested_actions(&self) -> &[String] {
        &self.suggested_actions
    }

    /// The answer as an assistant message for a chat history.
    pub fn to_message(&self) -> ChatMessage {
        ChatMessage { role: Role::Assistant, content: self.text.clone() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integral_numbers_display_without_fraction() {
        assert_eq!(MetadataValue::Number(20.0).to_string(), "20");
        assert_eq!(MetadataValue::Number(6.5).to_string(), "6.5");
        assert_eq!(MetadataValue::from("WHO").to_string(), "WHO");
    }

    #[test]
    fn metadata_round_trips_through_json() {
        let metadata = Metadata::passage("WHO", "Folic acid").with(PREGNANCY_WEEK_KEY, 12u32);
        let json = serde_json::to_value(&metadata).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"pregnancy_week": 12.0, "source": "WHO", "text": "Folic acid"})
        );
        let back: Metadata = serde_json::from_value(json).unwrap();
        assert_eq!(back, metadata);
    }

    #[test]
    fn filter_matches_on_equal_value_only() {
        let metadata = Metadata::passage("s", "t").with(PREGNANCY_WEEK_KEY, 12u32);
        assert!(Filter::eq(PREGNANCY_WEEK_KEY, 12u32).matches(&metadata));
        assert!(!Filter::eq(PREGNANCY_WEEK_KEY, 13u32).matches(&metadata));
        assert!(!Filter::eq(BABY_AGE_WEEKS_KEY, 12u32).matches(&metadata));
    }

    #[test]
    fn answer_becomes_assistant_message() {
        let answer = Answer::new("Rest well.".into(), vec!["WHO".into()], vec![]);
        let message = answer.to_message();
        assert_eq!(message.role, Role::Assistant);
        assert_eq!(message.content, "Rest well.");
    }
}
