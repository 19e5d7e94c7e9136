pub mod extract;
pub mod fetcher;
pub mod normalize;

pub use extract::extract_image_url;
pub use fetcher::FeedFetcher;
pub use normalize::normalize_item;
