use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;

use crate::db::Repository;
use crate::dedup::DuplicateChecker;
use crate::error::Result;
use crate::feed::{extract_image_url, normalize_item, FeedFetcher};
use crate::models::{default_sources, CollectionLog, FeedSource, RawFeedItem, RunStatus};
use crate::scoring::{categorize, relevance_score, MAX_ARTICLES_PER_FEED, MIN_CONTENT_LENGTH, MIN_RELEVANCE_SCORE};
use crate::services::ImagePipeline;

/// Cooperative cancellation flag, checked at the top of each source
/// iteration. Cloning shares the flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Drives the whole pipeline: fetch each source, normalize and filter its
/// items, score and rank survivors, resolve their images and persist,
/// then record an aggregate run log.
pub struct NewsCollector {
    repo: Repository,
    fetcher: FeedFetcher,
    images: ImagePipeline,
}

impl NewsCollector {
    pub fn new(repo: Repository, images: ImagePipeline) -> Self {
        Self {
            repo,
            fetcher: FeedFetcher::new(),
            images,
        }
    }

    /// Run one collection pass over `sources` (default: all active built-in
    /// sources). Per-source failures land in the log's error list; only an
    /// error escaping the whole loop marks the run as failed.
    pub async fn collect(&self, sources: Option<Vec<FeedSource>>) -> Result<CollectionLog> {
        self.collect_with_cancel(sources, CancelToken::new()).await
    }

    pub async fn collect_with_cancel(
        &self,
        sources: Option<Vec<FeedSource>>,
        cancel: CancelToken,
    ) -> Result<CollectionLog> {
        let sources = sources.unwrap_or_else(default_sources);
        let active: Vec<FeedSource> = sources.into_iter().filter(|s| s.active).collect();
        let source_ids: Vec<String> = active.iter().map(|s| s.id.clone()).collect();

        let started_at = Utc::now();
        let log_id = self.repo.start_log(started_at, &source_ids).await?;
        let mut log = CollectionLog::start(log_id, started_at, source_ids);

        tracing::info!("Collection run {} started over {} sources", log_id, active.len());

        let outcome = self.run_sources(&active, &mut log, &cancel).await;

        match outcome {
            Ok(()) => {
                log.finish(RunStatus::Completed);
                self.repo.finalize_log(&log).await?;
                tracing::info!(
                    "Collection run {} completed: {} collected, {} duplicates, {} failed",
                    log.id,
                    log.collected,
                    log.duplicates,
                    log.failed
                );
                Ok(log)
            }
            Err(e) => {
                log.errors.push(e.to_string());
                log.finish(RunStatus::Failed);
                // Best effort; the original error is the one worth surfacing.
                if let Err(log_err) = self.repo.finalize_log(&log).await {
                    tracing::error!("Failed to finalize run log {}: {}", log.id, log_err);
                }
                Err(e)
            }
        }
    }

    async fn run_sources(
        &self,
        sources: &[FeedSource],
        log: &mut CollectionLog,
        cancel: &CancelToken,
    ) -> Result<()> {
        for source in sources {
            if cancel.is_cancelled() {
                tracing::info!("Collection cancelled before source {}", source.id);
                log.errors.push("collection cancelled".to_string());
                break;
            }

            let items = match self.fetcher.fetch(&source.url).await {
                Ok(items) => items,
                Err(e) => {
                    tracing::warn!("Feed fetch failed for {}: {}", source.id, e);
                    log.errors.push(format!("{}: feed fetch failed: {}", source.id, e));
                    continue;
                }
            };

            self.process_source(source, items, log).await;
        }
        Ok(())
    }

    /// Run one source's items through normalize → length filter → dedup →
    /// score → rank/top-3 → image resolution → persistence, accumulating
    /// counters and errors into the run log.
    async fn process_source(
        &self,
        source: &FeedSource,
        items: Vec<RawFeedItem>,
        log: &mut CollectionLog,
    ) {
        let checker = DuplicateChecker::new(&self.repo);
        let mut eligible = Vec::new();

        for item in &items {
            let image_url = extract_image_url(item);
            let mut candidate = normalize_item(item, source, image_url);

            // Thin content is filtered before any scoring effort.
            if candidate.content.chars().count() < MIN_CONTENT_LENGTH {
                tracing::debug!(
                    "Skipping thin content ({} chars): {}",
                    candidate.content.chars().count(),
                    candidate.source_url
                );
                continue;
            }

            if checker.is_duplicate(&candidate).await {
                log.duplicates += 1;
                continue;
            }

            candidate.relevance_score = relevance_score(&candidate, &source.keywords);
            candidate.category = categorize(&candidate.title, &candidate.content);

            if candidate.relevance_score < MIN_RELEVANCE_SCORE {
                tracing::debug!(
                    "Below relevance threshold ({}): {}",
                    candidate.relevance_score,
                    candidate.source_url
                );
                continue;
            }

            eligible.push(candidate);
        }

        // Highest score first; equal scores rank the earlier-published
        // article first so the cutoff is deterministic.
        eligible.sort_by(|a, b| {
            b.relevance_score
                .cmp(&a.relevance_score)
                .then(a.published_at.cmp(&b.published_at))
        });
        eligible.truncate(MAX_ARTICLES_PER_FEED);

        // Image work is the only concurrent stage; each task fails (and
        // falls back) independently. join_all keeps the ranking order.
        let selected = join_all(eligible.into_iter().map(|mut candidate| async {
            if let Some(image_url) = candidate.image_url.take() {
                candidate.image_url = Some(self.images.process(&image_url).await);
            }
            candidate
        }))
        .await;

        for candidate in selected {
            let title = candidate.title.clone();
            let url = candidate.source_url.clone();
            match self.repo.insert_article(candidate).await {
                Ok(_) => {
                    tracing::info!("Collected '{}' from {}", title, source.id);
                    log.collected += 1;
                }
                Err(e) => {
                    tracing::warn!("Failed to store '{}': {}", title, e);
                    log.failed += 1;
                    log.errors.push(format!("{}: failed to store {}: {}", source.id, url, e));
                }
            }
        }
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }
}
