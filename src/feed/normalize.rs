use chrono::Utc;
use regex::Regex;

use crate::models::{CandidateArticle, Category, FeedSource, RawFeedItem};

/// Excerpt length bounds, in characters.
const EXCERPT_MIN: usize = 300;
const EXCERPT_MAX: usize = 500;

/// Turn a raw feed item into a candidate article. Category and score stay
/// at their placeholder values until the scorer runs.
pub fn normalize_item(
    item: &RawFeedItem,
    source: &FeedSource,
    image_url: Option<String>,
) -> CandidateArticle {
    let html = item
        .content_html
        .as_deref()
        .or(item.summary_html.as_deref())
        .unwrap_or("");

    let content = plain_text(html);
    let excerpt = make_excerpt(&content);

    CandidateArticle {
        title: item
            .title
            .clone()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| "Untitled".to_string()),
        content,
        excerpt,
        source_name: source.name.clone(),
        source_url: item.link.clone(),
        image_url,
        published_at: item.published.unwrap_or_else(Utc::now),
        collected_at: Utc::now(),
        keywords: source.keywords.clone(),
        category: Category::General,
        relevance_score: 0,
        active: true,
        views: 0,
    }
}

/// Strip scripts, styles and tags, decode entities, collapse whitespace.
pub fn plain_text(html: &str) -> String {
    let mut text = html.to_string();

    for pattern in [
        r"(?is)<script[^>]*>.*?</script>",
        r"(?is)<style[^>]*>.*?</style>",
        r"(?s)<[^>]+>",
    ] {
        if let Ok(re) = Regex::new(pattern) {
            text = re.replace_all(&text, " ").into_owned();
        }
    }

    text = decode_entities(&text);

    match Regex::new(r"\s+") {
        Ok(re) => re.replace_all(&text, " ").trim().to_string(),
        Err(_) => text.trim().to_string(),
    }
}

/// Decode numeric character references and the common named entities.
pub(crate) fn decode_entities(s: &str) -> String {
    let mut text = s.to_string();

    if let Ok(re) = Regex::new(r"&#(\d+);") {
        text = re
            .replace_all(&text, |caps: &regex::Captures| {
                caps[1]
                    .parse::<u32>()
                    .ok()
                    .and_then(char::from_u32)
                    .map(String::from)
                    .unwrap_or_default()
            })
            .into_owned();
    }
    if let Ok(re) = Regex::new(r"&#x([0-9a-fA-F]+);") {
        text = re
            .replace_all(&text, |caps: &regex::Captures| {
                u32::from_str_radix(&caps[1], 16)
                    .ok()
                    .and_then(char::from_u32)
                    .map(String::from)
                    .unwrap_or_default()
            })
            .into_owned();
    }

    // &amp; must go last so it cannot produce new entities to decode.
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Bounded excerpt: min(500, max(300, length)) characters, so truncation
/// only ever happens past 500.
fn make_excerpt(text: &str) -> String {
    let len = text.chars().count();
    let limit = len.clamp(EXCERPT_MIN, EXCERPT_MAX);
    if len <= limit {
        text.to_string()
    } else {
        let mut excerpt: String = text.chars().take(limit).collect();
        excerpt.push_str("...");
        excerpt
    }
}
