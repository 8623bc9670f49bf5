use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alternative {
    pub letter: String,
    pub text: String,
}

/// `questions` row. `correct_answer` is omitted from serialized output when
/// stripped for public listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: Uuid,
    pub statement: String,
    #[serde(default)]
    pub alternatives: Vec<Alternative>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
    pub subject: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub exam_board: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Question {
    pub fn without_answer(mut self) -> Self {
        self.correct_answer = None;
        self
    }

    pub fn is_correct(&self, letter: &str) -> bool {
        self.correct_answer.as_deref().map_or(false, |answer| answer.eq_ignore_ascii_case(letter))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionMetadata {
    pub id: Uuid,
    pub question_id: Uuid,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub subtopic: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::from_row;
    use serde_json::json;

    fn question() -> Question {
        let row = json!({
            "id": "0d3c5a61-5d0b-4c36-9d0e-3f8e7b0a1c22",
            "statement": "Qual lei rege a educação nacional?",
            "alternatives": [{ "letter": "A", "text": "LDB" }, { "letter": "B", "text": "CLT" }],
            "correct_answer": "A",
            "subject": "Legislação",
            "year": 2022,
            "exam_board": null,
        });
        from_row(row.as_object().cloned().unwrap()).unwrap()
    }

    #[test]
    fn stripped_questions_do_not_serialize_the_answer() {
        let value = serde_json::to_value(question().without_answer()).unwrap();
        assert!(value.get("correct_answer").is_none());
        assert_eq!(value["alternatives"][0]["text"], "LDB");
    }

    #[test]
    fn answers_compare_case_insensitively() {
        let q = question();
        assert!(q.is_correct("a"));
        assert!(!q.is_correct("B"));
        assert!(!q.without_answer().is_correct("A"));
    }
}
