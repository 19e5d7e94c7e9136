use serde::{Deserialize, Serialize};

/// A configured feed endpoint with the keywords used for scoring its items.
/// Defined at deploy time; read-only at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedSource {
    pub id: String,
    pub name: String,
    pub url: String,
    pub keywords: Vec<String>,
    pub active: bool,
}

impl FeedSource {
    pub fn new(id: &str, name: &str, url: &str, keywords: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            url: url.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            active: true,
        }
    }
}

/// Built-in source catalog. Callers can pass their own list to the
/// collector; this is only the default argument.
pub fn default_sources() -> Vec<FeedSource> {
    vec![
        FeedSource::new(
            "ieee-spectrum-robotics",
            "IEEE Spectrum",
            "https://spectrum.ieee.org/feeds/topic/robotics.rss",
            &["robot", "robotics", "automation", "AI"],
        ),
        FeedSource::new(
            "the-robot-report",
            "The Robot Report",
            "https://www.therobotreport.com/feed/",
            &["robot", "robotics", "autonomous", "drone"],
        ),
        FeedSource::new(
            "robohub",
            "Robohub",
            "https://robohub.org/feed/",
            &["robot", "robotics", "research", "competition"],
        ),
        FeedSource::new(
            "techcrunch-robotics",
            "TechCrunch",
            "https://techcrunch.com/category/robotics/feed/",
            &["robot", "robotics", "startup", "AI"],
        ),
        FeedSource::new(
            "edsurge",
            "EdSurge",
            "https://www.edsurge.com/articles_rss",
            &["STEM", "coding", "education", "student", "robotics"],
        ),
        FeedSource::new(
            "sciencedaily-robotics",
            "ScienceDaily",
            "https://www.sciencedaily.com/rss/computers_math/robotics.xml",
            &["robot", "robotics", "engineering", "research"],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_sources_are_active_with_keywords() {
        let sources = default_sources();
        assert!(!sources.is_empty());
        for source in &sources {
            assert!(source.active);
            assert!(!source.keywords.is_empty());
            assert!(source.url.starts_with("https://"));
        }
    }
}
