use chrono::{DateTime, Utc};

use crate::models::{CandidateArticle, Category};

/// Candidates below this score are never persisted.
pub const MIN_RELEVANCE_SCORE: u32 = 50;
/// Per-feed cap on persisted articles per run.
pub const MAX_ARTICLES_PER_FEED: usize = 3;
/// Plain-text length gate, applied before scoring.
pub const MIN_CONTENT_LENGTH: usize = 500;

/// Outlets whose name alone is worth a trust bonus.
const TRUSTED_SOURCES: &[&str] = &[
    "reuters",
    "associated press",
    "bbc",
    "ieee spectrum",
    "mit technology review",
    "techcrunch",
    "wired",
    "the verge",
    "ars technica",
    "sciencedaily",
];

const COMPETITION_TERMS: &[&str] = &[
    "competition",
    "championship",
    "olympiad",
    "contest",
    "tournament",
    "league",
    "first robotics",
    "robocup",
];

const EDUCATION_TERMS: &[&str] = &[
    "education",
    "school",
    "student",
    "classroom",
    "curriculum",
    "teacher",
    "learning",
    "stem",
    "course",
];

const TECHNOLOGY_TERMS: &[&str] = &[
    "robot",
    "robotics",
    "artificial intelligence",
    "machine learning",
    "engineering",
    "coding",
    "software",
    "sensor",
    "drone",
];

/// Additive relevance score in [0, 100]. Each signal contributes its own
/// capped amount; the sum is capped at 100.
pub fn relevance_score(article: &CandidateArticle, keywords: &[String]) -> u32 {
    let title = article.title.to_lowercase();
    let content = article.content.to_lowercase();
    let excerpt = article.excerpt.to_lowercase();

    let mut score: u32 = 0;

    for keyword in keywords {
        let keyword = keyword.to_lowercase();
        if keyword.is_empty() {
            continue;
        }

        if title.contains(&keyword) {
            score += 30;
        }

        let occurrences = content.matches(&keyword).count() as u32;
        score += (occurrences * 5).min(20);

        if excerpt.contains(&keyword) {
            score += 10;
        }
    }

    if is_trusted_source(&article.source_name) {
        score += 20;
    }

    score += recency_bonus(article.published_at);

    if article.image_url.is_some() {
        score += 10;
    }

    score.min(100)
}

pub fn is_trusted_source(name: &str) -> bool {
    let name = name.to_lowercase();
    TRUSTED_SOURCES.iter().any(|t| name.contains(t))
}

fn recency_bonus(published_at: DateTime<Utc>) -> u32 {
    // Compare in hours: day truncation would hand every tier an extra day.
    let hours = (Utc::now() - published_at).num_hours();
    if hours <= 24 {
        10
    } else if hours <= 24 * 7 {
        7
    } else if hours <= 24 * 30 {
        3
    } else {
        0
    }
}

/// Keyword-bucket category over title + body. First matching bucket wins;
/// buckets are never combined.
pub fn categorize(title: &str, content: &str) -> Category {
    let text = format!("{} {}", title.to_lowercase(), content.to_lowercase());

    let buckets = [
        (Category::Competition, COMPETITION_TERMS),
        (Category::Education, EDUCATION_TERMS),
        (Category::Technology, TECHNOLOGY_TERMS),
    ];

    for (category, terms) in buckets {
        if terms.iter().any(|term| text.contains(term)) {
            return category;
        }
    }

    Category::General
}
