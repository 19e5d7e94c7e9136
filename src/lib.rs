//! News collection pipeline: pulls configured RSS/Atom feeds, filters and
//! deduplicates their items, scores relevance, relocates article images to
//! object storage and persists the survivors together with a per-run log.

pub mod collector;
pub mod config;
pub mod db;
pub mod dedup;
pub mod error;
pub mod feed;
pub mod models;
pub mod scoring;
pub mod services;

pub use collector::{CancelToken, NewsCollector};
pub use config::Config;
pub use db::Repository;
pub use error::{AppError, Result};
pub use models::{
    default_sources, CandidateArticle, Category, CollectedArticle, CollectionLog, FeedSource,
    RunStatus,
};
pub use services::{ImagePipeline, ObjectStorage};
