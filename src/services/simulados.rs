//! Timed, server-scored practice exams.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::catalog;
use crate::catalog::tables::ANSWER_LETTERS;
use crate::catalog::SortOrder;
use crate::database::models::{from_row, from_rows, AttemptStatus, Question, SimuladoAnswer, SimuladoAttempt};
use crate::database::{DatabaseError, TableStore};
use crate::query::{QuerySpec, Row};

const ATTEMPTS: &str = "simulado_attempts";
const ANSWERS: &str = "simulado_answers";
const QUESTIONS: &str = "questions";

pub const DEFAULT_QUESTION_COUNT: u32 = 10;
pub const MAX_QUESTION_COUNT: u32 = 100;
pub const DEFAULT_TIME_LIMIT_MINUTES: u32 = 60;
pub const MAX_TIME_LIMIT_MINUTES: u32 = 600;

#[derive(Debug, Error)]
pub enum SimuladoError {
    #[error("{0}")]
    InvalidRequest(String),
    #[error("Simulado {0} not found")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

#[derive(Debug, Default, Deserialize)]
pub struct StartRequest {
    pub subject: Option<String>,
    pub exam_board: Option<String>,
    pub difficulty: Option<String>,
    pub question_count: Option<u32>,
    pub time_limit_minutes: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub question_id: Uuid,
    pub selected_answer: String,
}

/// Attempt plus its questions; answers are hidden until the attempt ends
#[derive(Debug, Serialize)]
pub struct AttemptView {
    pub attempt: SimuladoAttempt,
    pub deadline: DateTime<Utc>,
    pub questions: Vec<Question>,
    pub answers: Vec<SimuladoAnswer>,
}

#[derive(Debug, Serialize)]
pub struct AnswerReceipt {
    pub attempt_id: Uuid,
    pub question_id: Uuid,
    pub selected_answer: String,
    pub answered_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct QuestionResult {
    pub question_id: Uuid,
    pub selected_answer: Option<String>,
    pub correct_answer: Option<String>,
    pub is_correct: bool,
}

#[derive(Debug, Serialize)]
pub struct SimuladoResult {
    pub attempt: SimuladoAttempt,
    pub score: i64,
    pub total: i64,
    pub percentage: f64,
    pub results: Vec<QuestionResult>,
}

/// Percentage with two decimals
pub fn percentage(score: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    (score as f64 * 10_000.0 / total as f64).round() / 100.0
}

fn bounded(value: Option<u32>, default: u32, max: u32, name: &str) -> Result<u32, SimuladoError> {
    match value.unwrap_or(default) {
        n if (1..=max).contains(&n) => Ok(n),
        _ => Err(SimuladoError::InvalidRequest(format!("{} must be between 1 and {}", name, max))),
    }
}

fn normalize_letter(raw: &str) -> Result<String, SimuladoError> {
    let letter = raw.trim().to_ascii_uppercase();
    if ANSWER_LETTERS.contains(&letter.as_str()) {
        Ok(letter)
    } else {
        Err(SimuladoError::InvalidRequest(format!(
            "selected_answer must be one of {}",
            ANSWER_LETTERS.join(", ")
        )))
    }
}

pub struct SimuladoService<'a> {
    store: &'a dyn TableStore,
}

impl<'a> SimuladoService<'a> {
    pub fn new(store: &'a dyn TableStore) -> Self {
        Self { store }
    }

    /// Create an in-progress attempt over a random selection of matching questions
    pub async fn start(&self, user_id: Uuid, request: StartRequest) -> Result<AttemptView, SimuladoError> {
        let count = bounded(request.question_count, DEFAULT_QUESTION_COUNT, MAX_QUESTION_COUNT, "question_count")?;
        let time_limit = bounded(
            request.time_limit_minutes,
            DEFAULT_TIME_LIMIT_MINUTES,
            MAX_TIME_LIMIT_MINUTES,
            "time_limit_minutes",
        )?;

        let table = catalog::table(QUESTIONS)
            .ok_or_else(|| SimuladoError::InvalidRequest("questions table missing".to_string()))?;
        let mut spec = QuerySpec::new();
        for (column, value) in [
            ("subject", request.subject),
            ("exam_board", request.exam_board),
            ("difficulty", request.difficulty),
        ] {
            let Some(value) = value.filter(|v| !v.trim().is_empty()) else {
                continue;
            };
            let def = table
                .column(column)
                .ok_or_else(|| SimuladoError::InvalidRequest(format!("unknown column {}", column)))?;
            let coerced = def
                .coerce_str(value.trim())
                .map_err(|e| SimuladoError::InvalidRequest(e.to_string()))?;
            spec = spec.eq(column, coerced);
        }

        let mut candidates: Vec<Question> = from_rows(QUESTIONS, self.store.select(QUESTIONS, &spec).await?);
        if candidates.is_empty() {
            return Err(SimuladoError::InvalidRequest("No questions match the requested filters".to_string()));
        }

        candidates.shuffle(&mut rand::thread_rng());
        candidates.truncate(count as usize);

        let now = Utc::now();
        let question_ids: Vec<Uuid> = candidates.iter().map(|q| q.id).collect();
        let row = json!({
            "user_id": user_id,
            "question_ids": question_ids,
            "status": AttemptStatus::InProgress,
            "time_limit_minutes": time_limit,
            "started_at": now,
            "total_questions": question_ids.len(),
        });
        let inserted = self.store.insert(ATTEMPTS, object(row)).await?;
        let attempt: SimuladoAttempt = from_row(inserted)?;

        tracing::info!(
            "User {} started simulado {} with {} questions",
            user_id,
            attempt.id,
            attempt.question_ids.len()
        );

        Ok(AttemptView {
            deadline: attempt.deadline(),
            attempt,
            questions: candidates.into_iter().map(Question::without_answer).collect(),
            answers: vec![],
        })
    }

    /// Caller's attempts, newest first
    pub async fn list(&self, user_id: Uuid) -> Result<Vec<SimuladoAttempt>, SimuladoError> {
        let spec = QuerySpec::new()
            .eq("user_id", user_id.to_string())
            .order_by("started_at", SortOrder::Desc);
        Ok(from_rows(ATTEMPTS, self.store.select(ATTEMPTS, &spec).await?))
    }

    /// Attempt with answers; `is_admin` may read other users' attempts
    pub async fn get(&self, user_id: Uuid, attempt_id: &str, is_admin: bool) -> Result<AttemptView, SimuladoError> {
        let attempt = self.load(attempt_id).await?;
        if attempt.user_id != user_id && !is_admin {
            return Err(SimuladoError::NotFound(attempt_id.to_string()));
        }

        let open = attempt.status_at(Utc::now()) == AttemptStatus::InProgress;
        let mut questions = self.questions_in_order(&attempt).await?;
        let mut answers = self.answers(attempt.id).await?;
        if open {
            questions = questions.into_iter().map(Question::without_answer).collect();
            answers.iter_mut().for_each(|a| a.is_correct = None);
        }

        Ok(AttemptView { deadline: attempt.deadline(), attempt, questions, answers })
    }

    /// Record or replace the caller's answer to one question
    pub async fn answer(
        &self,
        user_id: Uuid,
        attempt_id: &str,
        request: AnswerRequest,
    ) -> Result<AnswerReceipt, SimuladoError> {
        let attempt = self.owned(user_id, attempt_id).await?;
        let letter = normalize_letter(&request.selected_answer)?;
        if !attempt.contains(request.question_id) {
            return Err(SimuladoError::InvalidRequest("Question is not part of this simulado".to_string()));
        }

        let now = Utc::now();
        match (attempt.status, attempt.status_at(now)) {
            (AttemptStatus::InProgress, AttemptStatus::Expired) => {
                self.set_status(&attempt, AttemptStatus::Expired).await?;
                return Err(SimuladoError::Conflict("Simulado time limit has expired".to_string()));
            }
            (_, AttemptStatus::InProgress) => {}
            (_, status) => {
                return Err(SimuladoError::Conflict(format!("Simulado is {}", status.as_str())));
            }
        }

        let is_correct = self
            .store
            .find(QUESTIONS, &request.question_id.to_string())
            .await?
            .map(from_row::<Question>)
            .transpose()?
            .map(|q| q.is_correct(&letter));

        let fields = object(json!({
            "selected_answer": letter,
            "is_correct": is_correct,
            "answered_at": now,
        }));

        let existing_spec = QuerySpec::new()
            .eq("attempt_id", attempt.id.to_string())
            .eq("question_id", request.question_id.to_string());
        match self.store.select_one(ANSWERS, &existing_spec).await? {
            Some(existing) => {
                let id = existing.get("id").map(value_text).unwrap_or_default();
                self.store.update(ANSWERS, &id, fields).await?;
            }
            None => {
                let mut row = fields;
                row.insert("attempt_id".to_string(), json!(attempt.id));
                row.insert("question_id".to_string(), json!(request.question_id));
                self.store.insert(ANSWERS, row).await?;
            }
        }

        Ok(AnswerReceipt {
            attempt_id: attempt.id,
            question_id: request.question_id,
            selected_answer: letter,
            answered_at: now,
        })
    }

    /// Score the attempt; finishing twice returns the stored score
    pub async fn finish(&self, user_id: Uuid, attempt_id: &str) -> Result<SimuladoResult, SimuladoError> {
        let mut attempt = self.owned(user_id, attempt_id).await?;

        let questions: HashMap<Uuid, Question> = self
            .questions_in_order(&attempt)
            .await?
            .into_iter()
            .map(|q| (q.id, q))
            .collect();
        let answers: HashMap<Uuid, SimuladoAnswer> = self
            .answers(attempt.id)
            .await?
            .into_iter()
            .map(|a| (a.question_id, a))
            .collect();

        let results: Vec<QuestionResult> = attempt
            .question_ids
            .iter()
            .map(|id| {
                let selected = answers.get(id).map(|a| a.selected_answer.clone());
                let question = questions.get(id);
                let is_correct = match (question, selected.as_deref()) {
                    (Some(q), Some(letter)) => q.is_correct(letter),
                    _ => false,
                };
                QuestionResult {
                    question_id: *id,
                    selected_answer: selected,
                    correct_answer: question.and_then(|q| q.correct_answer.clone()),
                    is_correct,
                }
            })
            .collect();

        if let (Some(score), Some(total)) = (attempt.score, attempt.total_questions) {
            return Ok(SimuladoResult { percentage: percentage(score, total), score, total, results, attempt });
        }

        let now = Utc::now();
        let status = match attempt.status_at(now) {
            AttemptStatus::Expired => AttemptStatus::Expired,
            _ => AttemptStatus::Finished,
        };
        let score = results.iter().filter(|r| r.is_correct).count() as i64;
        let total = attempt.question_ids.len() as i64;

        let patch = object(json!({
            "status": status,
            "finished_at": now,
            "score": score,
            "total_questions": total,
        }));
        if let Some(row) = self.store.update(ATTEMPTS, &attempt.id.to_string(), patch).await? {
            attempt = from_row(row)?;
        }

        tracing::info!("Simulado {} {} with {}/{}", attempt.id, status.as_str(), score, total);
        Ok(SimuladoResult { attempt, score, total, percentage: percentage(score, total), results })
    }

    async fn load(&self, attempt_id: &str) -> Result<SimuladoAttempt, SimuladoError> {
        if Uuid::parse_str(attempt_id).is_err() {
            return Err(SimuladoError::NotFound(attempt_id.to_string()));
        }
        match self.store.find(ATTEMPTS, attempt_id).await? {
            Some(row) => Ok(from_row(row)?),
            None => Err(SimuladoError::NotFound(attempt_id.to_string())),
        }
    }

    async fn owned(&self, user_id: Uuid, attempt_id: &str) -> Result<SimuladoAttempt, SimuladoError> {
        let attempt = self.load(attempt_id).await?;
        if attempt.user_id != user_id {
            return Err(SimuladoError::NotFound(attempt_id.to_string()));
        }
        Ok(attempt)
    }

    async fn set_status(&self, attempt: &SimuladoAttempt, status: AttemptStatus) -> Result<(), SimuladoError> {
        let patch = object(json!({ "status": status }));
        self.store.update(ATTEMPTS, &attempt.id.to_string(), patch).await?;
        Ok(())
    }

    async fn questions_in_order(&self, attempt: &SimuladoAttempt) -> Result<Vec<Question>, SimuladoError> {
        let ids = attempt.question_ids.iter().map(|id| json!(id)).collect();
        let rows = self.store.select(QUESTIONS, &QuerySpec::new().is_in("id", ids)).await?;
        let mut by_id: HashMap<Uuid, Question> =
            from_rows::<Question>(QUESTIONS, rows).into_iter().map(|q| (q.id, q)).collect();
        // Deleted questions drop out of the listing but still count in the total
        Ok(attempt.question_ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    async fn answers(&self, attempt_id: Uuid) -> Result<Vec<SimuladoAnswer>, SimuladoError> {
        let spec = QuerySpec::new()
            .eq("attempt_id", attempt_id.to_string())
            .order_by("answered_at", SortOrder::Asc);
        Ok(from_rows(ANSWERS, self.store.select(ANSWERS, &spec).await?))
    }
}

fn object(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        _ => Row::new(),
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use chrono::Duration;

    async fn seed(store: &MemoryStore, n: usize) -> Vec<Uuid> {
        let mut ids = vec![];
        for i in 0..n {
            let row = json!({
                "statement": format!("Questão {}", i),
                "alternatives": [{ "letter": "A", "text": "a" }, { "letter": "B", "text": "b" }],
                "correct_answer": if i % 2 == 0 { "A" } else { "B" },
                "subject": if i < 3 { "Didática" } else { "Legislação" },
            });
            let row = store.insert(QUESTIONS, object(row)).await.unwrap();
            ids.push(Uuid::parse_str(row["id"].as_str().unwrap()).unwrap());
        }
        ids
    }

    fn start_request(count: u32) -> StartRequest {
        StartRequest { question_count: Some(count), ..Default::default() }
    }

    #[test]
    fn percentages_round_to_two_decimals() {
        assert_eq!(percentage(1, 3), 33.33);
        assert_eq!(percentage(2, 3), 66.67);
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(5, 5), 100.0);
    }

    #[test]
    fn letters_are_case_insensitive() {
        assert_eq!(normalize_letter(" c ").unwrap(), "C");
        assert!(normalize_letter("F").is_err());
        assert!(normalize_letter("").is_err());
    }

    #[tokio::test]
    async fn start_picks_matching_questions_without_answers() {
        let store = MemoryStore::new();
        seed(&store, 5).await;
        let service = SimuladoService::new(&store);

        let request = StartRequest { subject: Some("Didática".into()), question_count: Some(10), ..Default::default() };
        let view = service.start(Uuid::new_v4(), request).await.unwrap();
        assert_eq!(view.questions.len(), 3);
        assert!(view.questions.iter().all(|q| q.correct_answer.is_none()));
        assert_eq!(view.attempt.status, AttemptStatus::InProgress);
        assert_eq!(view.attempt.time_limit_minutes, 60);
    }

    #[tokio::test]
    async fn start_validates_bounds_and_empty_selection() {
        let store = MemoryStore::new();
        let service = SimuladoService::new(&store);
        assert!(matches!(
            service.start(Uuid::new_v4(), start_request(0)).await,
            Err(SimuladoError::InvalidRequest(_))
        ));
        assert!(matches!(
            service.start(Uuid::new_v4(), start_request(101)).await,
            Err(SimuladoError::InvalidRequest(_))
        ));
        assert!(matches!(
            service.start(Uuid::new_v4(), start_request(5)).await,
            Err(SimuladoError::InvalidRequest(msg)) if msg.contains("No questions")
        ));
    }

    #[tokio::test]
    async fn answers_are_upserted_and_scored_on_finish() {
        let store = MemoryStore::new();
        seed(&store, 4).await;
        let service = SimuladoService::new(&store);
        let user = Uuid::new_v4();
        let view = service.start(user, start_request(4)).await.unwrap();
        let attempt_id = view.attempt.id.to_string();
        let first = view.attempt.question_ids[0];

        service
            .answer(user, &attempt_id, AnswerRequest { question_id: first, selected_answer: "e".into() })
            .await
            .unwrap();
        let stored = store.find(QUESTIONS, &first.to_string()).await.unwrap().unwrap();
        let correct = stored["correct_answer"].as_str().unwrap().to_string();
        service
            .answer(user, &attempt_id, AnswerRequest { question_id: first, selected_answer: correct.clone() })
            .await
            .unwrap();
        assert_eq!(store.count(ANSWERS, &QuerySpec::new()).await.unwrap(), 1);

        let result = service.finish(user, &attempt_id).await.unwrap();
        assert_eq!(result.score, 1);
        assert_eq!(result.total, 4);
        assert_eq!(result.percentage, 25.0);
        assert_eq!(result.attempt.status, AttemptStatus::Finished);
        assert_eq!(result.results[0].correct_answer.as_deref(), Some(correct.as_str()));

        let again = service.finish(user, &attempt_id).await.unwrap();
        assert_eq!(again.score, 1);

        let late = service
            .answer(user, &attempt_id, AnswerRequest { question_id: first, selected_answer: "A".into() })
            .await;
        assert!(matches!(late, Err(SimuladoError::Conflict(_))));
    }

    #[tokio::test]
    async fn rejects_foreign_questions_and_other_users() {
        let store = MemoryStore::new();
        seed(&store, 2).await;
        let service = SimuladoService::new(&store);
        let user = Uuid::new_v4();
        let view = service.start(user, start_request(2)).await.unwrap();
        let attempt_id = view.attempt.id.to_string();

        let foreign = AnswerRequest { question_id: Uuid::new_v4(), selected_answer: "A".into() };
        assert!(matches!(service.answer(user, &attempt_id, foreign).await, Err(SimuladoError::InvalidRequest(_))));

        let stranger = Uuid::new_v4();
        assert!(matches!(service.get(stranger, &attempt_id, false).await, Err(SimuladoError::NotFound(_))));
        assert!(service.get(stranger, &attempt_id, true).await.is_ok());
        assert!(matches!(service.finish(stranger, &attempt_id).await, Err(SimuladoError::NotFound(_))));
    }

    #[tokio::test]
    async fn late_answers_expire_the_attempt() {
        let store = MemoryStore::new();
        seed(&store, 2).await;
        let service = SimuladoService::new(&store);
        let user = Uuid::new_v4();
        let view = service.start(user, start_request(2)).await.unwrap();
        let attempt_id = view.attempt.id.to_string();

        let started = Utc::now() - Duration::minutes(120);
        store
            .update(ATTEMPTS, &attempt_id, object(json!({ "started_at": started })))
            .await
            .unwrap();

        let question_id = view.attempt.question_ids[0];
        let result = service
            .answer(user, &attempt_id, AnswerRequest { question_id, selected_answer: "A".into() })
            .await;
        assert!(matches!(result, Err(SimuladoError::Conflict(_))));

        let stored = store.find(ATTEMPTS, &attempt_id).await.unwrap().unwrap();
        assert_eq!(stored["status"], "expired");

        let result = service.finish(user, &attempt_id).await.unwrap();
        assert_eq!(result.attempt.status, AttemptStatus::Expired);
        assert_eq!(result.score, 0);
    }
}
