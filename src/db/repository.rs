use chrono::{DateTime, Utc};
use rusqlite::{params, Row};
use tokio_rusqlite::Connection;

use crate::error::Result;
use crate::models::{CandidateArticle, Category, CollectedArticle, CollectionLog, RunStatus};

use super::schema::SCHEMA;

pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub async fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).await?;

        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    // Article operations

    pub async fn insert_article(&self, article: CandidateArticle) -> Result<i64> {
        let keywords_json = serde_json::to_string(&article.keywords)?;
        let id = self
            .conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO articles
                       (title, content, excerpt, source_name, source_url, image_url,
                        published_at, collected_at, keywords, category, relevance_score,
                        is_active, views)
                       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"#,
                    params![
                        article.title,
                        article.content,
                        article.excerpt,
                        article.source_name,
                        article.source_url,
                        article.image_url,
                        article.published_at.to_rfc3339(),
                        article.collected_at.to_rfc3339(),
                        keywords_json,
                        article.category.as_str(),
                        article.relevance_score,
                        article.active,
                        article.views,
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;
        Ok(id)
    }

    pub async fn source_url_exists(&self, url: &str) -> Result<bool> {
        let url = url.to_string();
        let exists = self
            .conn
            .call(move |conn| {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM articles WHERE source_url = ?1",
                    params![url],
                    |row| row.get(0),
                )?;
                Ok(count > 0)
            })
            .await?;
        Ok(exists)
    }

    /// Titles and publish dates of articles published since `since`,
    /// for near-duplicate matching.
    pub async fn recent_titles(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<(String, DateTime<Utc>)>> {
        let since = since.to_rfc3339();
        let titles = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT title, published_at FROM articles WHERE published_at >= ?1",
                )?;
                let titles = stmt
                    .query_map(params![since], |row| {
                        let title: String = row.get(0)?;
                        let published: String = row.get(1)?;
                        Ok((title, published))
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(titles)
            })
            .await?;
        Ok(titles
            .into_iter()
            .filter_map(|(title, published)| {
                parse_datetime(&published).map(|dt| (title, dt))
            })
            .collect())
    }

    pub async fn get_recent_articles(&self, limit: u32) -> Result<Vec<CollectedArticle>> {
        let articles = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    r#"SELECT id, title, content, excerpt, source_name, source_url, image_url,
                              published_at, collected_at, keywords, category, relevance_score,
                              is_active, views
                       FROM articles
                       ORDER BY collected_at DESC, relevance_score DESC
                       LIMIT ?1"#,
                )?;
                let articles = stmt
                    .query_map(params![limit], |row| Ok(article_from_row(row)))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(articles)
            })
            .await?;
        Ok(articles)
    }

    // Collection log operations

    /// Insert a `running` log row at the start of a run.
    pub async fn start_log(&self, started_at: DateTime<Utc>, sources: &[String]) -> Result<i64> {
        let sources_json = serde_json::to_string(sources)?;
        let started = started_at.to_rfc3339();
        let id = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO collection_logs (started_at, status, sources) VALUES (?1, 'running', ?2)",
                    params![started, sources_json],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;
        Ok(id)
    }

    pub async fn finalize_log(&self, log: &CollectionLog) -> Result<()> {
        let errors_json = serde_json::to_string(&log.errors)?;
        let id = log.id;
        let completed = log.completed_at.map(|dt| dt.to_rfc3339());
        let duration_ms = log.duration_ms;
        let status = log.status.as_str();
        let (collected, duplicates, failed) = (log.collected, log.duplicates, log.failed);
        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"UPDATE collection_logs
                       SET completed_at = ?1, duration_ms = ?2, status = ?3,
                           collected = ?4, duplicates = ?5, failed = ?6, errors = ?7
                       WHERE id = ?8"#,
                    params![completed, duration_ms, status, collected, duplicates, failed, errors_json, id],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn get_log(&self, id: i64) -> Result<CollectionLog> {
        let log = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    r#"SELECT id, started_at, completed_at, duration_ms, status,
                              sources, collected, duplicates, failed, errors
                       FROM collection_logs WHERE id = ?1"#,
                )?;
                let log = stmt.query_row(params![id], |row| Ok(log_from_row(row)))?;
                Ok(log)
            })
            .await?;
        Ok(log)
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    // RFC3339 first (e.g. "2026-01-11T12:34:56+00:00")
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // SQLite datetime format (e.g. "2026-01-11 12:34:56")
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

fn json_list(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_default()
}

fn article_from_row(row: &Row) -> CollectedArticle {
    CollectedArticle {
        id: row.get(0).unwrap(),
        title: row.get(1).unwrap(),
        content: row.get(2).unwrap(),
        excerpt: row.get(3).unwrap(),
        source_name: row.get(4).unwrap(),
        source_url: row.get(5).unwrap(),
        image_url: row.get(6).unwrap(),
        published_at: row
            .get::<_, String>(7)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
        collected_at: row
            .get::<_, String>(8)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
        keywords: json_list(&row.get::<_, String>(9).unwrap_or_default()),
        category: Category::parse(&row.get::<_, String>(10).unwrap_or_default()),
        relevance_score: row.get(11).unwrap(),
        active: row.get::<_, i64>(12).unwrap() != 0,
        views: row.get(13).unwrap(),
    }
}

fn log_from_row(row: &Row) -> CollectionLog {
    CollectionLog {
        id: row.get(0).unwrap(),
        started_at: row
            .get::<_, String>(1)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
        completed_at: row
            .get::<_, Option<String>>(2)
            .unwrap()
            .and_then(|s| parse_datetime(&s)),
        duration_ms: row.get(3).unwrap(),
        status: RunStatus::parse(&row.get::<_, String>(4).unwrap_or_default()),
        sources: json_list(&row.get::<_, String>(5).unwrap_or_default()),
        collected: row.get(6).unwrap(),
        duplicates: row.get(7).unwrap(),
        failed: row.get(8).unwrap(),
        errors: json_list(&row.get::<_, String>(9).unwrap_or_default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;
    use chrono::Duration;

    async fn temp_repo() -> (tempfile::TempDir, Repository) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");
        let repo = Repository::new(path.to_str().unwrap()).await.unwrap();
        (dir, repo)
    }

    fn sample_article(url: &str, title: &str, published_at: DateTime<Utc>) -> CandidateArticle {
        CandidateArticle {
            title: title.to_string(),
            content: "c".repeat(600),
            excerpt: "c".repeat(300),
            source_name: "Test Source".to_string(),
            source_url: url.to_string(),
            image_url: None,
            published_at,
            collected_at: Utc::now(),
            keywords: vec!["robot".to_string()],
            category: Category::Technology,
            relevance_score: 80,
            active: true,
            views: 0,
        }
    }

    #[tokio::test]
    async fn insert_and_read_back_article() {
        let (_dir, repo) = temp_repo().await;
        let id = repo
            .insert_article(sample_article("https://e.com/1", "Robot news", Utc::now()))
            .await
            .unwrap();
        assert!(id > 0);

        let articles = repo.get_recent_articles(10).await.unwrap();
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].title, "Robot news");
        assert_eq!(articles[0].category, Category::Technology);
        assert_eq!(articles[0].relevance_score, 80);
        assert_eq!(articles[0].keywords, vec!["robot".to_string()]);
        assert!(articles[0].active);
    }

    #[tokio::test]
    async fn source_url_lookup() {
        let (_dir, repo) = temp_repo().await;
        repo.insert_article(sample_article("https://e.com/1", "A", Utc::now()))
            .await
            .unwrap();
        assert!(repo.source_url_exists("https://e.com/1").await.unwrap());
        assert!(!repo.source_url_exists("https://e.com/2").await.unwrap());
    }

    #[tokio::test]
    async fn recent_titles_respects_window() {
        let (_dir, repo) = temp_repo().await;
        repo.insert_article(sample_article("https://e.com/old", "Old", Utc::now() - Duration::days(40)))
            .await
            .unwrap();
        repo.insert_article(sample_article("https://e.com/new", "New", Utc::now() - Duration::days(2)))
            .await
            .unwrap();

        let since = Utc::now() - Duration::days(30);
        let titles = repo.recent_titles(since).await.unwrap();
        assert_eq!(titles.len(), 1);
        assert_eq!(titles[0].0, "New");
    }

    #[tokio::test]
    async fn log_lifecycle() {
        let (_dir, repo) = temp_repo().await;
        let started = Utc::now();
        let sources = vec!["src-a".to_string(), "src-b".to_string()];
        let id = repo.start_log(started, &sources).await.unwrap();

        let running = repo.get_log(id).await.unwrap();
        assert_eq!(running.status, RunStatus::Running);
        assert_eq!(running.sources, sources);
        assert!(running.completed_at.is_none());

        let mut log = CollectionLog::start(id, started, sources);
        log.collected = 2;
        log.duplicates = 1;
        log.errors.push("src-b: feed fetch failed".to_string());
        log.finish(RunStatus::Completed);
        repo.finalize_log(&log).await.unwrap();

        let done = repo.get_log(id).await.unwrap();
        assert_eq!(done.status, RunStatus::Completed);
        assert_eq!(done.collected, 2);
        assert_eq!(done.duplicates, 1);
        assert_eq!(done.failed, 0);
        assert_eq!(done.errors.len(), 1);
        assert!(done.completed_at.is_some());
        assert!(done.duration_ms.is_some());
    }
}
