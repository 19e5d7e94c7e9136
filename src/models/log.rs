use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> RunStatus {
        match s {
            "running" => RunStatus::Running,
            "completed" => RunStatus::Completed,
            _ => RunStatus::Failed,
        }
    }
}

/// Audit record for one collection run. Created as `running` when the run
/// starts and finalized at the end, whatever happened in between.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionLog {
    pub id: i64,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
    pub status: RunStatus,
    /// Identifiers of the sources this run attempted.
    pub sources: Vec<String>,
    pub collected: u32,
    pub duplicates: u32,
    pub failed: u32,
    pub errors: Vec<String>,
}

impl CollectionLog {
    pub fn start(id: i64, started_at: DateTime<Utc>, sources: Vec<String>) -> Self {
        Self {
            id,
            started_at,
            completed_at: None,
            duration_ms: None,
            status: RunStatus::Running,
            sources,
            collected: 0,
            duplicates: 0,
            failed: 0,
            errors: Vec::new(),
        }
    }

    /// Stamp the completion time and derived duration.
    pub fn finish(&mut self, status: RunStatus) {
        let now = Utc::now();
        self.duration_ms = Some((now - self.started_at).num_milliseconds());
        self.completed_at = Some(now);
        self.status = status;
    }
}
