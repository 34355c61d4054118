//! Data models shared across the briefing pipeline.
//!
//! - [`NewsEntry`]: one normalized news item, the unit every stage works on
//! - [`RawFeedItem`]: an item as the feed parser hands it over, before normalization
//! - [`TrendingRepo`]: one row scraped from the trending-repositories page
//! - [`StorySummary`] and [`BriefingArchive`]: what gets written to `archive/`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils::truncate_chars;

/// Maximum number of characters kept in [`NewsEntry::summary`].
pub const SUMMARY_MAX_CHARS: usize = 500;

/// Title used when a source provides none.
pub const UNTITLED: &str = "Untitled";

/// Literal written in place of a publish timestamp that could not be resolved.
pub const UNKNOWN_PUBLISHED: &str = "unknown";

/// Coarse importance bucket, the primary ranking key.
///
/// Deserialization is lenient: any unrecognized string becomes [`Priority::Medium`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    /// Sort rank: high=0, medium=1, low=2.
    pub fn rank(self) -> u8 {
        match self {
            Priority::High => 0,
            Priority::Medium => 1,
            Priority::Low => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

impl From<&str> for Priority {
    fn from(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Priority::High,
            "low" => Priority::Low,
            _ => Priority::Medium,
        }
    }
}

impl From<String> for Priority {
    fn from(s: String) -> Self {
        Priority::from(s.as_str())
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Publish time of an entry, or the "unknown" sentinel.
///
/// Serialized as an RFC 3339 string or exactly `"unknown"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Published {
    At(DateTime<Utc>),
    Unknown,
}

impl Published {
    pub fn is_unknown(&self) -> bool {
        matches!(self, Published::Unknown)
    }
}

impl From<Option<DateTime<Utc>>> for Published {
    fn from(dt: Option<DateTime<Utc>>) -> Self {
        dt.map_or(Published::Unknown, Published::At)
    }
}

impl fmt::Display for Published {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Published::At(dt) => f.write_str(&dt.to_rfc3339()),
            Published::Unknown => f.write_str(UNKNOWN_PUBLISHED),
        }
    }
}

impl From<Published> for String {
    fn from(p: Published) -> Self {
        p.to_string()
    }
}

impl TryFrom<String> for Published {
    type Error = chrono::ParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        if s == UNKNOWN_PUBLISHED {
            return Ok(Published::Unknown);
        }
        let dt = DateTime::parse_from_rfc3339(&s)?;
        Ok(Published::At(dt.with_timezone(&Utc)))
    }
}

/// One normalized news item.
///
/// Built through [`NewsEntry::new`], which enforces the summary length limit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsEntry {
    pub title: String,
    pub link: String,
    /// At most [`SUMMARY_MAX_CHARS`] characters.
    pub summary: String,
    pub published: Published,
    /// Name of the originating source.
    pub source: String,
    pub priority: Priority,
}

impl NewsEntry {
    pub fn new(
        title: impl Into<String>,
        link: impl Into<String>,
        summary: &str,
        published: Published,
        source: impl Into<String>,
        priority: Priority,
    ) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            summary: truncate_chars(summary, SUMMARY_MAX_CHARS),
            published,
            source: source.into(),
            priority,
        }
    }

    /// Lowercased `title + " " + summary`, the text skip keywords are matched against.
    pub fn search_text(&self) -> String {
        format!("{} {}", self.title, self.summary).to_lowercase()
    }
}

/// A feed item as parsed from RSS or Atom, before normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawFeedItem {
    pub title: Option<String>,
    pub link: Option<String>,
    pub summary: Option<String>,
    pub published: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
}

impl RawFeedItem {
    /// The "published" timestamp if present, otherwise "updated".
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.published.or(self.updated)
    }
}

/// One repository row from the trending page, in page order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrendingRepo {
    /// `owner/name`.
    pub full_name: String,
    pub description: Option<String>,
    pub stars_today: u64,
}

/// Title, link and source of a story, as handed to delivery and the archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorySummary {
    pub title: String,
    pub link: String,
    pub source: String,
}

impl From<&NewsEntry> for StorySummary {
    fn from(e: &NewsEntry) -> Self {
        Self {
            title: e.title.clone(),
            link: e.link.clone(),
            source: e.source.clone(),
        }
    }
}

/// The record written to `archive/<date>.json` for each run.
#[derive(Debug, Serialize, Deserialize)]
pub struct BriefingArchive {
    pub date: String,
    pub entries_found: usize,
    pub entries: Vec<NewsEntry>,
    pub top_stories: Vec<StorySummary>,
    pub script_path: String,
    pub audio_path: Option<String>,
    pub digest_path: Option<String>,
    pub script_word_count: usize,
}
