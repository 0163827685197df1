use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc, Weekday};
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};

/// Label used for conversations that carry no `default_model_slug`.
pub const UNKNOWN_MODEL: &str = "Unknown";

/// One chat session from a `conversations.json` export.
#[derive(Debug, Clone, Deserialize)]
pub struct Conversation {
    /// Message nodes keyed by an opaque node id. Order carries no meaning.
    pub mapping: HashMap<String, MessageNode>,
    #[serde(default)]
    pub default_model_slug: Option<String>,
}

impl Conversation {
    pub fn model_label(&self) -> &str {
        match self.default_model_slug.as_deref() {
            Some(slug) if !slug.is_empty() => slug,
            _ => UNKNOWN_MODEL,
        }
    }

    /// Iterate the messages of this conversation, skipping structural nodes.
    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.mapping.values().filter_map(|node| node.message.as_ref())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageNode {
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub author: Option<Author>,
    #[serde(default)]
    pub content: Option<Content>,
    /// Unix timestamp in seconds.
    #[serde(default)]
    pub create_time: Option<f64>,
}

impl Message {
    pub fn role(&self) -> Option<&str> {
        self.author.as_ref().and_then(|a| a.role.as_deref())
    }

    /// Length of the concatenated text parts, in Unicode scalar values.
    pub fn body_len(&self) -> u64 {
        self.content
            .iter()
            .flat_map(|c| c.parts.iter().flatten())
            .map(|part| match part {
                ContentPart::Text(text) => text.chars().count() as u64,
                ContentPart::Other(_) => 0,
            })
            .sum()
    }

    /// The creation instant, if the export recorded a usable one.
    ///
    /// Zero, negative and non-finite timestamps are treated as missing, as
    /// are values outside the representable range.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        let seconds = self.create_time.filter(|t| *t > 0.0 && t.is_finite())?;
        DateTime::from_timestamp_micros((seconds * 1_000_000.0) as i64)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Author {
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Option<Vec<ContentPart>>,
}

/// A single entry of `content.parts`. Exports mix plain strings with
/// objects such as image asset pointers; only strings count as text.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ContentPart {
    Text(String),
    Other(IgnoredAny),
}

/// The whole export, in file order.
#[derive(Debug, Clone, Default)]
pub struct Archive {
    pub conversations: Vec<Conversation>,
}

impl Archive {
    pub fn new(conversations: Vec<Conversation>) -> Self {
        Self { conversations }
    }

    /// Number of messages that carry no usable timestamp.
    pub fn messages_without_timestamp(&self) -> usize {
        self.conversations
            .iter()
            .flat_map(Conversation::messages)
            .filter(|m| m.created_at().is_none())
            .count()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekStart {
    #[default]
    Sunday,
    Monday,
}

impl WeekStart {
    pub fn weekday(self) -> Weekday {
        match self {
            WeekStart::Sunday => Weekday::Sun,
            WeekStart::Monday => Weekday::Mon,
        }
    }
}

impl std::str::FromStr for WeekStart {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sunday" | "sun" => Ok(WeekStart::Sunday),
            "monday" | "mon" => Ok(WeekStart::Monday),
            _ => anyhow::bail!("Invalid week start '{s}'. Use 'sunday' or 'monday'"),
        }
    }
}

/// Aggregate usage statistics for one archive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub user_message_count: u64,
    pub assistant_message_count: u64,
    pub user_char_count: u64,
    pub assistant_char_count: u64,
    pub conversation_count: u64,
    /// Assistant messages per model label.
    pub model_counts: BTreeMap<String, u64>,
    /// Week-start date (`YYYY-MM-DD`) to per-model message counts, all roles.
    pub weekly_messages: BTreeMap<String, BTreeMap<String, u64>>,
    pub chat_lengths: Vec<u64>,
    pub first_message_date: DateTime<Utc>,
    pub longest_chat: u64,
    pub average_messages_per_day: f64,
}

impl Stats {
    /// Zeroed stats whose first-message date starts at `now`.
    pub fn empty(now: DateTime<Utc>) -> Self {
        Self {
            user_message_count: 0,
            assistant_message_count: 0,
            user_char_count: 0,
            assistant_char_count: 0,
            conversation_count: 0,
            model_counts: BTreeMap::new(),
            weekly_messages: BTreeMap::new(),
            chat_lengths: Vec::new(),
            first_message_date: now,
            longest_chat: 0,
            average_messages_per_day: 0.0,
        }
    }

    pub fn total_messages(&self) -> u64 {
        self.user_message_count + self.assistant_message_count
    }

    pub fn models_used(&self) -> usize {
        self.model_counts.len()
    }

    /// Model counts sorted by descending count, ties broken by name.
    pub fn models_by_usage(&self) -> Vec<(&str, u64)> {
        let mut models: Vec<(&str, u64)> = self
            .model_counts
            .iter()
            .map(|(model, count)| (model.as_str(), *count))
            .collect();
        models.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        models
    }
}

/// One week of the stacked time-series chart.
///
/// Model counts are flattened next to `week`, `weekStart` and `total`, so a
/// model literally named after one of those fields yields a duplicate JSON
/// key. `counts` itself always holds every label intact.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyPoint {
    /// Display label, e.g. `Jan 7, 2024`.
    pub week: String,
    pub week_start: String,
    #[serde(flatten)]
    pub counts: BTreeMap<String, u64>,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistogramBin {
    pub range: String,
    pub count: u64,
}

/// Anonymized aggregate payload sent by `gptwrapped share`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub submission_id: String,
    pub timestamp: String,
    pub total_messages: u64,
    pub conversation_count: u64,
    pub average_messages_per_day: f64,
    pub models_used: u64,
    pub first_message_date: String,
    pub longest_chat: u64,
    pub model_counts: BTreeMap<String, u64>,
    pub weekly_message_counts: BTreeMap<String, BTreeMap<String, u64>>,
    pub chat_length_distribution: Vec<u64>,
}

#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
