use std::collections::{BTreeSet, HashMap};

use serde::Serialize;
use serde_json::Value;

use crate::catalog;
use crate::catalog::SortOrder;
use crate::config::QueryConfig;
use crate::database::models::{from_row, from_rows, Question, QuestionMetadata};
use crate::database::{DatabaseError, TableStore};
use crate::error::ApiError;
use crate::query::{parse_order, ListParams, Page, QuerySpec};

const QUESTIONS: &str = "questions";
const METADATA: &str = "question_metadata";

/// Query keys accepted by the public question browser
const PUBLIC_FILTERS: &[&str] = &["subject", "year", "exam_board", "difficulty", "search", "page", "limit", "order"];

/// Columns the public browser may sort by
const PUBLIC_ORDER: &[&str] = &["subject", "year", "exam_board", "difficulty", "created_at"];

/// Delete a question, then best-effort delete its metadata rows.
///
/// Returns `false` when the question did not exist. A metadata failure is
/// logged only; the question stays deleted.
pub async fn delete_question(store: &dyn TableStore, id: &str) -> Result<bool, DatabaseError> {
    if !store.delete(QUESTIONS, id).await? {
        return Ok(false);
    }

    let spec = QuerySpec::new().eq("question_id", id);
    match store.delete_where(METADATA, &spec).await {
        Ok(removed) => tracing::debug!("Removed {} metadata rows for question {}", removed, id),
        Err(e) => tracing::warn!("Question {} deleted but metadata cleanup failed: {}", id, e),
    }
    Ok(true)
}

/// Public listing; answers are stripped
pub async fn browse(
    store: &dyn TableStore,
    params: &HashMap<String, String>,
    config: &QueryConfig,
) -> Result<Page<Question>, ApiError> {
    if let Some(key) = params.keys().find(|k| !PUBLIC_FILTERS.contains(&k.as_str())) {
        return Err(ApiError::bad_request(format!("Unsupported filter '{}'", key)));
    }
    if let Some(order) = params.get("order") {
        let columns = parse_order(order)?;
        if let Some((column, _)) = columns.iter().find(|(c, _)| !PUBLIC_ORDER.contains(&c.as_str())) {
            return Err(ApiError::bad_request(format!("Cannot order by '{}'", column)));
        }
    }

    let table = catalog::table(QUESTIONS).ok_or_else(|| ApiError::internal_server_error("questions table missing"))?;
    let list = ListParams::from_query(table, params, config)?;

    let total = store.count(QUESTIONS, &list.spec).await?;
    let rows = store.select(QUESTIONS, &list.spec).await?;
    let questions: Vec<Question> =
        from_rows::<Question>(QUESTIONS, rows).into_iter().map(Question::without_answer).collect();

    Ok(Page::new(questions, total, list.page, list.limit))
}

#[derive(Debug, Default, Serialize)]
pub struct Facets {
    pub subjects: Vec<String>,
    pub exam_boards: Vec<String>,
    pub difficulties: Vec<String>,
    pub years: Vec<i64>,
}

/// Distinct values for the browse filters
pub async fn facets(store: &dyn TableStore) -> Result<Facets, DatabaseError> {
    let rows = store.select(QUESTIONS, &QuerySpec::new()).await?;

    let mut subjects = BTreeSet::new();
    let mut exam_boards = BTreeSet::new();
    let mut difficulties = BTreeSet::new();
    let mut years = BTreeSet::new();

    let text = |row: &serde_json::Map<String, Value>, key: &str| {
        row.get(key).and_then(Value::as_str).map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
    };

    for row in &rows {
        subjects.extend(text(row, "subject"));
        exam_boards.extend(text(row, "exam_board"));
        difficulties.extend(text(row, "difficulty"));
        years.extend(row.get("year").and_then(Value::as_i64));
    }

    Ok(Facets {
        subjects: subjects.into_iter().collect(),
        exam_boards: exam_boards.into_iter().collect(),
        difficulties: difficulties.into_iter().collect(),
        years: years.into_iter().collect(),
    })
}

#[derive(Debug, Serialize)]
pub struct QuestionDetail {
    #[serde(flatten)]
    pub question: Question,
    pub metadata: Vec<QuestionMetadata>,
}

pub async fn detail(store: &dyn TableStore, id: &str) -> Result<QuestionDetail, DatabaseError> {
    let question: Question = from_row(store.find_404(QUESTIONS, id).await?)?;

    let spec = QuerySpec::new().eq("question_id", id).order_by("created_at", SortOrder::Asc);
    let metadata: Vec<QuestionMetadata> = from_rows(METADATA, store.select(METADATA, &spec).await?);

    Ok(QuestionDetail { question, metadata })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::database::MemoryStore;
    use serde_json::json;
    use uuid::Uuid;

    async fn insert(store: &MemoryStore, table: &str, value: Value) -> String {
        let row = store.insert(table, value.as_object().cloned().unwrap()).await.unwrap();
        row["id"].as_str().unwrap().to_string()
    }

    fn question(subject: &str, year: i64, board: &str) -> Value {
        json!({
            "statement": format!("{} {}", subject, year),
            "alternatives": [{ "letter": "A", "text": "Sim" }, { "letter": "B", "text": "Não" }],
            "correct_answer": "A",
            "subject": subject,
            "year": year,
            "exam_board": board,
            "difficulty": "medio",
        })
    }

    #[tokio::test]
    async fn delete_cascades_to_metadata() {
        let store = MemoryStore::new();
        let id = insert(&store, QUESTIONS, question("Didática", 2022, "FCC")).await;
        insert(&store, METADATA, json!({ "question_id": id, "topic": "Planejamento" })).await;
        insert(&store, METADATA, json!({ "question_id": Uuid::new_v4().to_string(), "topic": "Outro" })).await;

        assert!(delete_question(&store, &id).await.unwrap());
        assert_eq!(store.count(METADATA, &QuerySpec::new()).await.unwrap(), 1);
        assert!(!delete_question(&store, &id).await.unwrap());
    }

    #[tokio::test]
    async fn cascade_failure_does_not_fail_the_delete() {
        let store = MemoryStore::new();
        let id = insert(&store, QUESTIONS, question("Didática", 2022, "FCC")).await;
        store.fail_table(METADATA).await;

        assert!(delete_question(&store, &id).await.unwrap());
        assert!(store.find(QUESTIONS, &id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn browse_strips_answers_and_rejects_unknown_filters() {
        let store = MemoryStore::new();
        insert(&store, QUESTIONS, question("Didática", 2022, "FCC")).await;
        insert(&store, QUESTIONS, question("Legislação", 2023, "CESPE")).await;
        let config = AppConfig::development().query;

        let params = HashMap::from([("subject".to_string(), "Didática".to_string())]);
        let page = browse(&store, &params, &config).await.unwrap();
        assert_eq!(page.total, 1);
        assert!(page.rows[0].correct_answer.is_none());

        let params = HashMap::from([("correct_answer".to_string(), "A".to_string())]);
        assert!(matches!(browse(&store, &params, &config).await, Err(ApiError::BadRequest(_))));

        let params = HashMap::from([("order".to_string(), "year.desc,correct_answer.asc".to_string())]);
        assert!(matches!(browse(&store, &params, &config).await, Err(ApiError::BadRequest(_))));
    }

    #[tokio::test]
    async fn facets_are_distinct_and_sorted() {
        let store = MemoryStore::new();
        insert(&store, QUESTIONS, question("Legislação", 2023, "CESPE")).await;
        insert(&store, QUESTIONS, question("Didática", 2022, "FCC")).await;
        insert(&store, QUESTIONS, question("Didática", 2023, "FCC")).await;

        let facets = facets(&store).await.unwrap();
        assert_eq!(facets.subjects, vec!["Didática", "Legislação"]);
        assert_eq!(facets.exam_boards, vec!["CESPE", "FCC"]);
        assert_eq!(facets.years, vec![2022, 2023]);
        assert_eq!(facets.difficulties, vec!["medio"]);
    }

    #[tokio::test]
    async fn detail_includes_answer_and_metadata() {
        let store = MemoryStore::new();
        let id = insert(&store, QUESTIONS, question("Didática", 2022, "FCC")).await;
        insert(&store, METADATA, json!({ "question_id": id, "topic": "Planejamento", "tags": ["bncc"] })).await;

        let detail = detail(&store, &id).await.unwrap();
        assert_eq!(detail.question.correct_answer.as_deref(), Some("A"));
        assert_eq!(detail.metadata.len(), 1);
        assert_eq!(detail.metadata[0].tags, vec!["bncc"]);

        assert!(matches!(
            super::detail(&store, &Uuid::new_v4().to_string()).await,
            Err(DatabaseError::NotFound(_))
        ));
    }
}
