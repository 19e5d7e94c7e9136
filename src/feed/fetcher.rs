use std::time::Duration;

use feed_rs::model::Feed;
use feed_rs::parser;
use reqwest::Client;

use crate::error::Result;
use crate::models::{MediaHints, RawFeedItem};

pub struct FeedFetcher {
    client: Client,
}

impl FeedFetcher {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("news-collector/1.0")
            .build()
            .expect("Failed to create HTTP client");

        Self { client }
    }

    /// Fetch and parse one feed into raw items. A network failure, a non-2xx
    /// response or a malformed body all abort this source; there is no retry.
    pub async fn fetch(&self, url: &str) -> Result<Vec<RawFeedItem>> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!("Failed to fetch feed: HTTP {}", response.status()).into());
        }

        let bytes = response.bytes().await?;
        let feed = parser::parse(&bytes[..])?;

        let items = items_from_feed(feed);
        tracing::debug!("Fetched {} items from {}", items.len(), url);
        Ok(items)
    }
}

/// Map parsed feed entries to raw items. Absent fields stay `None`; nothing
/// here is an error.
fn items_from_feed(feed: Feed) -> Vec<RawFeedItem> {
    feed.entries
        .into_iter()
        .map(|entry| {
            // Full content is richer than the summary snippet; keep both
            // and let the normalizer prefer the former.
            let content_html = entry.content.and_then(|c| c.body);
            let summary_html = entry.summary.map(|s| s.content);

            let mut media = MediaHints::default();
            for object in &entry.media {
                if media.thumbnail.is_none() {
                    if let Some(thumb) = object.thumbnails.first() {
                        media.thumbnail = Some(thumb.image.uri.clone());
                    }
                }
                for content in &object.content {
                    let Some(url) = &content.url else { continue };
                    match &content.content_type {
                        // A declared MIME type marks an enclosure-style
                        // reference; the extractor gates on it.
                        Some(mime) => {
                            if media.enclosure_url.is_none() {
                                media.enclosure_url = Some(url.to_string());
                                media.enclosure_mime = Some(mime.essence().to_string());
                            }
                        }
                        None => {
                            if media.media_url.is_none() {
                                media.media_url = Some(url.to_string());
                            }
                        }
                    }
                }
            }

            RawFeedItem {
                title: entry.title.map(|t| t.content),
                link: entry
                    .links
                    .first()
                    .map(|l| l.href.clone())
                    .unwrap_or_default(),
                published: entry.published.or(entry.updated),
                content_html,
                summary_html,
                media,
            }
        })
        .collect()
}

impl Default for FeedFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS_WITH_MEDIA: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:media="http://search.yahoo.com/mrss/">
  <channel>
    <title>Robotics Wire</title>
    <item>
      <title>New robot arm ships</title>
      <link>https://example.com/posts/arm</link>
      <description>A &lt;b&gt;new&lt;/b&gt; arm.</description>
      <pubDate>Tue, 03 Jun 2025 09:00:00 GMT</pubDate>
      <enclosure url="https://cdn.example.com/arm.jpg" length="12345" type="image/jpeg"/>
      <media:thumbnail url="https://cdn.example.com/arm-thumb.jpg" width="150" height="100"/>
    </item>
    <item>
      <link>https://example.com/posts/bare</link>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn maps_entries_with_media_hints() {
        let feed = parser::parse(RSS_WITH_MEDIA.as_bytes()).unwrap();
        let items = items_from_feed(feed);
        assert_eq!(items.len(), 2);

        let item = &items[0];
        assert_eq!(item.title.as_deref(), Some("New robot arm ships"));
        assert_eq!(item.link, "https://example.com/posts/arm");
        assert!(item.published.is_some());
        assert!(item.summary_html.as_deref().unwrap().contains("new"));
        assert_eq!(
            item.media.thumbnail.as_deref(),
            Some("https://cdn.example.com/arm-thumb.jpg")
        );
        assert_eq!(
            item.media.enclosure_url.as_deref(),
            Some("https://cdn.example.com/arm.jpg")
        );
        // The declared type must come through as a bare essence, parameters
        // stripped, so the extractor's image/ prefix gate works.
        assert_eq!(item.media.enclosure_mime.as_deref(), Some("image/jpeg"));
    }

    #[test]
    fn sparse_entries_map_to_none_fields() {
        let feed = parser::parse(RSS_WITH_MEDIA.as_bytes()).unwrap();
        let items = items_from_feed(feed);

        let bare = &items[1];
        assert_eq!(bare.title, None);
        assert_eq!(bare.link, "https://example.com/posts/bare");
        assert_eq!(bare.content_html, None);
        assert_eq!(bare.media.thumbnail, None);
        assert_eq!(bare.media.enclosure_url, None);
        assert_eq!(bare.media.media_url, None);
    }
}
