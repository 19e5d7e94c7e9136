mod article;
mod log;
mod source;

pub use article::{CandidateArticle, Category, CollectedArticle, MediaHints, RawFeedItem};
pub use log::{CollectionLog, RunStatus};
pub use source::{default_sources, FeedSource};
