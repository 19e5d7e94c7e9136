use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Media references a feed entry may carry through RSS extensions.
/// Every field may be absent; the extractor decides which one to trust.
#[derive(Debug, Clone, Default)]
pub struct MediaHints {
    /// Explicit thumbnail reference (media:thumbnail).
    pub thumbnail: Option<String>,
    /// Generic media reference with no declared type.
    pub media_url: Option<String>,
    /// Enclosure reference, only usable together with its MIME type
    /// or a recognizable file extension.
    pub enclosure_url: Option<String>,
    pub enclosure_mime: Option<String>,
}

/// One entry of a fetched feed, before any normalization.
/// Lives only for the duration of a single collection pass.
#[derive(Debug, Clone)]
pub struct RawFeedItem {
    pub title: Option<String>,
    pub link: String,
    pub published: Option<DateTime<Utc>>,
    /// Full content body, when the feed provides one.
    pub content_html: Option<String>,
    /// Short summary/snippet; fallback when there is no full content.
    pub summary_html: Option<String>,
    pub media: MediaHints,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Competition,
    Education,
    Technology,
    General,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Competition => "competition",
            Category::Education => "education",
            Category::Technology => "technology",
            Category::General => "general",
        }
    }

    pub fn parse(s: &str) -> Category {
        match s {
            "competition" => Category::Competition,
            "education" => Category::Education,
            "technology" => Category::Technology,
            _ => Category::General,
        }
    }
}

/// A normalized article that has not been persisted yet.
/// Category and relevance score are placeholders until scoring runs.
#[derive(Debug, Clone)]
pub struct CandidateArticle {
    pub title: String,
    /// Plain text derived from the richest available HTML field.
    pub content: String,
    pub excerpt: String,
    pub source_name: String,
    /// Canonical item link; this is the dedupe key.
    pub source_url: String,
    pub image_url: Option<String>,
    pub published_at: DateTime<Utc>,
    pub collected_at: DateTime<Utc>,
    pub keywords: Vec<String>,
    pub category: Category,
    pub relevance_score: u32,
    pub active: bool,
    pub views: i64,
}

/// A persisted article that passed filtering, dedup and ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectedArticle {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub source_name: String,
    pub source_url: String,
    pub image_url: Option<String>,
    pub published_at: DateTime<Utc>,
    pub collected_at: DateTime<Utc>,
    pub keywords: Vec<String>,
    pub category: Category,
    pub relevance_score: u32,
    pub active: bool,
    pub views: i64,
}
