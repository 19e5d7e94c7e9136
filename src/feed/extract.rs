use regex::Regex;
use url::Url;

use crate::feed::normalize::decode_entities;
use crate::models::RawFeedItem;

const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".webp"];

/// Find the best image reference for a feed item, in priority order:
/// explicit thumbnail, generic media reference, enclosure (image MIME or
/// image extension required), then an `<img>` scan over the raw HTML.
/// `None` is a normal outcome, not an error.
pub fn extract_image_url(item: &RawFeedItem) -> Option<String> {
    if let Some(url) = non_empty(item.media.thumbnail.as_deref()) {
        return Some(normalize_image_url(url, &item.link));
    }

    if let Some(url) = non_empty(item.media.media_url.as_deref()) {
        return Some(normalize_image_url(url, &item.link));
    }

    if let Some(url) = non_empty(item.media.enclosure_url.as_deref()) {
        let mime_ok = item
            .media
            .enclosure_mime
            .as_deref()
            .is_some_and(|m| m.starts_with("image/"));
        if mime_ok || has_image_extension(url) {
            return Some(normalize_image_url(url, &item.link));
        }
    }

    let html = item
        .content_html
        .as_deref()
        .or(item.summary_html.as_deref())?;

    scan_html_images(html).map(|url| normalize_image_url(&url, &item.link))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn has_image_extension(url: &str) -> bool {
    // Ignore any query string when checking the extension.
    let path = url.split('?').next().unwrap_or(url).to_lowercase();
    IMAGE_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// Scan `<img>` tags with tolerant patterns (quoted src, unquoted src,
/// lazy-load attributes) and keep the one with the largest declared
/// width*height. Tags without dimensions count as area 0.
fn scan_html_images(html: &str) -> Option<String> {
    let tag_re = Regex::new(r"(?is)<img[^>]*>").ok()?;
    let src_patterns = [
        Regex::new(r#"(?i)\bsrc\s*=\s*["']([^"']+)["']"#).ok()?,
        Regex::new(r#"(?i)\bsrc\s*=\s*([^"'\s>]+)"#).ok()?,
        Regex::new(r#"(?i)\bdata-(?:src|lazy-src|original)\s*=\s*["']([^"']+)["']"#).ok()?,
    ];
    let width_re = Regex::new(r#"(?i)\bwidth\s*=\s*["']?(\d+)"#).ok()?;
    let height_re = Regex::new(r#"(?i)\bheight\s*=\s*["']?(\d+)"#).ok()?;

    let mut best: Option<(u64, String)> = None;

    for tag_match in tag_re.find_iter(html) {
        let tag = tag_match.as_str();

        let Some(src) = src_patterns
            .iter()
            .find_map(|re| re.captures(tag).and_then(|c| c.get(1)))
            .map(|m| m.as_str().to_string())
        else {
            continue;
        };

        let width = capture_u64(&width_re, tag);
        let height = capture_u64(&height_re, tag);
        let area = width * height;

        // Strictly greater keeps the first tag on ties.
        if best.as_ref().is_none_or(|(best_area, _)| area > *best_area) {
            best = Some((area, src));
        }
    }

    best.map(|(_, src)| src)
}

fn capture_u64(re: &Regex, tag: &str) -> u64 {
    re.captures(tag)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

/// Decode entities and resolve the reference into an absolute URL:
/// protocol-relative references get https, relative ones are joined
/// against the item link.
pub fn normalize_image_url(raw: &str, base_link: &str) -> String {
    let url = decode_entities(raw.trim());

    if url.starts_with("//") {
        return format!("https:{}", url);
    }

    if url.starts_with("http://") || url.starts_with("https://") || url.starts_with("data:") {
        return url;
    }

    if let Ok(base) = Url::parse(base_link) {
        if let Ok(resolved) = base.join(&url) {
            return resolved.to_string();
        }
    }

    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MediaHints;

    fn item_with(media: MediaHints, content: Option<&str>) -> RawFeedItem {
        RawFeedItem {
            title: Some("t".to_string()),
            link: "https://news.example.com/posts/1".to_string(),
            published: None,
            content_html: content.map(|c| c.to_string()),
            summary_html: None,
            media,
        }
    }

    #[test]
    fn thumbnail_hint_wins_over_everything() {
        let media = MediaHints {
            thumbnail: Some("https://cdn.example.com/thumb.jpg".to_string()),
            media_url: Some("https://cdn.example.com/media.jpg".to_string()),
            ..Default::default()
        };
        let item = item_with(media, Some(r#"<img src="https://x.com/a.png">"#));
        assert_eq!(
            extract_image_url(&item).as_deref(),
            Some("https://cdn.example.com/thumb.jpg")
        );
    }

    #[test]
    fn media_hint_used_without_thumbnail() {
        let media = MediaHints {
            media_url: Some("https://cdn.example.com/media.jpg".to_string()),
            ..Default::default()
        };
        assert_eq!(
            extract_image_url(&item_with(media, None)).as_deref(),
            Some("https://cdn.example.com/media.jpg")
        );
    }

    #[test]
    fn enclosure_accepted_by_mime() {
        let media = MediaHints {
            enclosure_url: Some("https://cdn.example.com/pic".to_string()),
            enclosure_mime: Some("image/jpeg".to_string()),
            ..Default::default()
        };
        assert_eq!(
            extract_image_url(&item_with(media, None)).as_deref(),
            Some("https://cdn.example.com/pic")
        );
    }

    #[test]
    fn enclosure_accepted_by_extension() {
        let media = MediaHints {
            enclosure_url: Some("https://cdn.example.com/pic.PNG?w=200".to_string()),
            enclosure_mime: Some("application/octet-stream".to_string()),
            ..Default::default()
        };
        assert!(extract_image_url(&item_with(media, None)).is_some());
    }

    #[test]
    fn non_image_enclosure_rejected() {
        let media = MediaHints {
            enclosure_url: Some("https://cdn.example.com/episode.mp3".to_string()),
            enclosure_mime: Some("audio/mpeg".to_string()),
            ..Default::default()
        };
        assert_eq!(extract_image_url(&item_with(media, None)), None);
    }

    #[test]
    fn html_scan_picks_largest_declared_image() {
        let html = r#"
            <img src="https://x.com/small.jpg" width="100" height="50">
            <img src="https://x.com/large.jpg" width="800" height="600">
            <img src="https://x.com/nodims.jpg">
        "#;
        let item = item_with(MediaHints::default(), Some(html));
        assert_eq!(
            extract_image_url(&item).as_deref(),
            Some("https://x.com/large.jpg")
        );
    }

    #[test]
    fn html_scan_reads_lazy_load_attributes() {
        let html = r#"<img class="lazy" data-src="https://x.com/lazy.jpg">"#;
        let item = item_with(MediaHints::default(), Some(html));
        assert_eq!(
            extract_image_url(&item).as_deref(),
            Some("https://x.com/lazy.jpg")
        );
    }

    #[test]
    fn html_scan_accepts_unquoted_src() {
        let html = r#"<img src=https://x.com/plain.gif width=10 height=10>"#;
        let item = item_with(MediaHints::default(), Some(html));
        assert_eq!(
            extract_image_url(&item).as_deref(),
            Some("https://x.com/plain.gif")
        );
    }

    #[test]
    fn protocol_relative_url_gets_https() {
        assert_eq!(
            normalize_image_url("//cdn.example.com/a.jpg", "https://news.example.com/p"),
            "https://cdn.example.com/a.jpg"
        );
    }

    #[test]
    fn relative_url_resolves_against_item_link() {
        assert_eq!(
            normalize_image_url("/images/a.jpg", "https://news.example.com/posts/1"),
            "https://news.example.com/images/a.jpg"
        );
    }

    #[test]
    fn entities_in_url_are_decoded() {
        assert_eq!(
            normalize_image_url(
                "https://x.com/a.jpg?w=1&amp;h=2",
                "https://news.example.com/p"
            ),
            "https://x.com/a.jpg?w=1&h=2"
        );
    }

    #[test]
    fn no_candidate_is_a_normal_outcome() {
        let item = item_with(MediaHints::default(), Some("<p>no pictures here</p>"));
        assert_eq!(extract_image_url(&item), None);
    }
}
