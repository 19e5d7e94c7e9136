use chrono::{Duration, Utc};

use crate::db::Repository;
use crate::error::Result;
use crate::models::CandidateArticle;

/// Titles at or above this Sørensen–Dice score count as the same story.
pub const TITLE_SIMILARITY_THRESHOLD: f64 = 0.80;
/// Near-duplicate matching only looks this far back.
pub const RECENT_WINDOW_DAYS: i64 = 30;

pub struct DuplicateChecker<'a> {
    repo: &'a Repository,
}

impl<'a> DuplicateChecker<'a> {
    pub fn new(repo: &'a Repository) -> Self {
        Self { repo }
    }

    /// True when the candidate matches a stored article by exact source URL
    /// (any age) or by title similarity within the recent window.
    ///
    /// Fails OPEN: if the store is unreachable the candidate is treated as
    /// new, trading occasional duplicates for never dropping content on a
    /// database blip.
    pub async fn is_duplicate(&self, candidate: &CandidateArticle) -> bool {
        match self.check(candidate).await {
            Ok(duplicate) => duplicate,
            Err(e) => {
                tracing::warn!(
                    "Duplicate check failed for {}, treating as new: {}",
                    candidate.source_url,
                    e
                );
                false
            }
        }
    }

    async fn check(&self, candidate: &CandidateArticle) -> Result<bool> {
        if self.repo.source_url_exists(&candidate.source_url).await? {
            return Ok(true);
        }

        let since = Utc::now() - Duration::days(RECENT_WINDOW_DAYS);
        for (title, _published) in self.repo.recent_titles(since).await? {
            if title_similarity(&title, &candidate.title) >= TITLE_SIMILARITY_THRESHOLD {
                tracing::debug!(
                    "Near-duplicate title: '{}' ~ '{}'",
                    candidate.title,
                    title
                );
                return Ok(true);
            }
        }

        Ok(false)
    }
}

/// Case-insensitive Sørensen–Dice similarity on bigrams.
pub fn title_similarity(a: &str, b: &str) -> f64 {
    strsim::sorensen_dice(&a.to_lowercase(), &b.to_lowercase())
}
