use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    InProgress,
    Finished,
    Expired,
}

impl AttemptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptStatus::InProgress => "in_progress",
            AttemptStatus::Finished => "finished",
            AttemptStatus::Expired => "expired",
        }
    }
}

/// `simulado_attempts` row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimuladoAttempt {
    pub id: Uuid,
    pub user_id: Uuid,
    pub question_ids: Vec<Uuid>,
    pub status: AttemptStatus,
    pub time_limit_minutes: i64,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub score: Option<i64>,
    #[serde(default)]
    pub total_questions: Option<i64>,
}

impl SimuladoAttempt {
    /// `started_at + time_limit_minutes`. A limit that is negative or too
    /// large to represent leaves no time at all.
    pub fn deadline(&self) -> DateTime<Utc> {
        Duration::try_minutes(self.time_limit_minutes.max(0))
            .and_then(|limit| self.started_at.checked_add_signed(limit))
            .unwrap_or(self.started_at)
    }

    /// Effective status at `now`: an in-progress attempt past its deadline is expired
    pub fn status_at(&self, now: DateTime<Utc>) -> AttemptStatus {
        match self.status {
            AttemptStatus::InProgress if now > self.deadline() => AttemptStatus::Expired,
            status => status,
        }
    }

    pub fn contains(&self, question_id: Uuid) -> bool {
        self.question_ids.contains(&question_id)
    }
}

/// `simulado_answers` row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimuladoAnswer {
    pub id: Uuid,
    pub attempt_id: Uuid,
    pub question_id: Uuid,
    pub selected_answer: String,
    #[serde(default)]
    pub is_correct: Option<bool>,
    #[serde(default)]
    pub answered_at: Option<DateTime<Utc>>,
}
