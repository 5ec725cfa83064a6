use serde::{Deserialize, Serialize};

/// Group identifier — a plain string, compared lexicographically when
/// establishing the canonical comparison order.
pub type GroupId = String;
/// Test identifier.
pub type TestId = String;

/// Question type tag as stored by the test platform.
///
/// Unrecognized tags deserialize to [`QuestionType::Unknown`]; the normalizer
/// has a best-effort fallback path for those rather than failing the attempt.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    Single,
    Multiple,
    Scale,
    Text,
    #[serde(other)]
    Unknown,
}

/// One selectable option of a single/multiple choice question.
///
/// `text` is the display text shown to the test-taker; `value` is the
/// author-assigned numeric weight used for scoring.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct AnswerOption {
    #[serde(default, alias = "_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub value: Option<f64>,
}

/// A question reference as it appears on a stored answer: either a populated
/// object or a bare identifier string, depending on how the attempt was
/// fetched.
///
/// Callers never match on this directly — [`Answer::question_key`] resolves
/// whichever shape is present into one canonical [`AnswerKey`].
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(untagged)]
pub enum QuestionRef {
    Populated(QuestionInfo),
    Id(String),
}

/// The populated form of a question reference.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct QuestionInfo {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default, rename = "type")]
    pub question_type: Option<QuestionType>,
    #[serde(default)]
    pub text: Option<String>,
}

/// Canonical `{question id, question type}` pair resolved once per answer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnswerKey {
    pub question_id: String,
    pub question_type: QuestionType,
}

/// One answer within a completed attempt.
///
/// The platform stores the question reference under `question` when populated
/// and under `questionId` in raw exports; both fields tolerate either shape.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    #[serde(default)]
    pub question: Option<QuestionRef>,
    #[serde(default)]
    pub question_id: Option<QuestionRef>,
    #[serde(default)]
    pub selected_options: Vec<AnswerOption>,
    #[serde(default)]
    pub text_answer: Option<String>,
    #[serde(default)]
    pub scale_value: Option<f64>,
}

impl Answer {
    /// Resolve the question reference into a canonical [`AnswerKey`].
    ///
    /// Prefers the populated `question` field, falls back to the alternate
    /// `questionId` field. Returns `None` when neither is present — such an
    /// answer cannot be matched to any question and contributes nothing.
    pub fn question_key(&self) -> Option<AnswerKey> {
        let reference = self.question.as_ref().or(self.question_id.as_ref())?;
        Some(match reference {
            QuestionRef::Populated(info) => AnswerKey {
                question_id: info.id.clone(),
                question_type: info.question_type.unwrap_or(QuestionType::Unknown),
            },
            QuestionRef::Id(id) => AnswerKey {
                question_id: id.clone(),
                question_type: QuestionType::Unknown,
            },
        })
    }
}

/// One test-taker's completed run through a test.
///
/// Attempts are scoped to a group and filtered to `completed` status at fetch
/// time by the data provider; the engine never re-filters them.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CompletedAttempt {
    #[serde(alias = "_id")]
    pub id: String,
    pub user_id: String,
    pub test_id: TestId,
    #[serde(default)]
    pub group_id: Option<GroupId>,
    #[serde(default)]
    pub answers: Vec<Answer>,
}

/// A participant group created by a test author.
///
/// `author_id` and `test_id` are optional because the orchestrator must be
/// able to report a broken record as a validation error instead of panicking
/// on it.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    #[serde(alias = "_id")]
    pub id: GroupId,
    pub name: String,
    #[serde(default)]
    pub author_id: Option<String>,
    #[serde(default)]
    pub test_id: Option<TestId>,
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// A test question, as listed for the test under comparison.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    #[serde(alias = "_id")]
    pub id: String,
    pub text: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
}

/// Test metadata; only the display name is consumed by the engine.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Test {
    #[serde(alias = "_id")]
    pub id: TestId,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── QuestionType ────────────────────────────────────────────────────

    #[test]
    fn question_type_deserializes_lowercase_tags() {
        assert_eq!(
            serde_json::from_str::<QuestionType>("\"single\"").unwrap(),
            QuestionType::Single
        );
        assert_eq!(
            serde_json::from_str::<QuestionType>("\"scale\"").unwrap(),
            QuestionType::Scale
        );
    }

    #[test]
    fn question_type_unknown_tag_falls_back_to_unknown() {
        let qt: QuestionType = serde_json::from_str("\"ranking\"").unwrap();
        assert_eq!(qt, QuestionType::Unknown);
    }

    // ── QuestionRef resolution ──────────────────────────────────────────

    #[test]
    fn question_key_from_populated_object() {
        let answer: Answer = serde_json::from_str(
            r#"{"question": {"id": "q1", "type": "single", "text": "Pick one"}}"#,
        )
        .unwrap();
        let key = answer.question_key().unwrap();
        assert_eq!(key.question_id, "q1");
        assert_eq!(key.question_type, QuestionType::Single);
    }

    #[test]
    fn question_key_from_bare_id_string() {
        let answer: Answer = serde_json::from_str(r#"{"question": "q7"}"#).unwrap();
        let key = answer.question_key().unwrap();
        assert_eq!(key.question_id, "q7");
        assert_eq!(key.question_type, QuestionType::Unknown);
    }

    #[test]
    fn question_key_falls_back_to_alternate_field() {
        let answer: Answer =
            serde_json::from_str(r#"{"questionId": {"id": "q3", "type": "scale"}}"#).unwrap();
        let key = answer.question_key().unwrap();
        assert_eq!(key.question_id, "q3");
        assert_eq!(key.question_type, QuestionType::Scale);
    }

    #[test]
    fn question_key_alternate_field_raw_form() {
        let answer: Answer = serde_json::from_str(r#"{"questionId": "q9"}"#).unwrap();
        assert_eq!(answer.question_key().unwrap().question_id, "q9");
    }

    #[test]
    fn question_key_missing_reference_is_none() {
        let answer: Answer = serde_json::from_str(r#"{"textAnswer": "hello"}"#).unwrap();
        assert!(answer.question_key().is_none());
    }

    #[test]
    fn populated_ref_without_type_resolves_to_unknown() {
        let answer: Answer =
            serde_json::from_str(r#"{"question": {"id": "q2", "text": "t"}}"#).unwrap();
        assert_eq!(
            answer.question_key().unwrap().question_type,
            QuestionType::Unknown
        );
    }

    // ── Entity deserialization ──────────────────────────────────────────

    #[test]
    fn attempt_deserializes_from_camel_case() {
        let attempt: CompletedAttempt = serde_json::from_str(
            r#"{
                "id": "a1",
                "userId": "u1",
                "testId": "t1",
                "groupId": "g1",
                "answers": [{"question": "q1", "scaleValue": 7}]
            }"#,
        )
        .unwrap();
        assert_eq!(attempt.id, "a1");
        assert_eq!(attempt.answers.len(), 1);
        assert_eq!(attempt.answers[0].scale_value, Some(7.0));
    }

    #[test]
    fn group_with_missing_author_deserializes() {
        let group: Group =
            serde_json::from_str(r#"{"id": "g1", "name": "Group A", "members": []}"#).unwrap();
        assert!(group.author_id.is_none());
        assert!(group.is_active);
    }

    #[test]
    fn answer_option_accepts_mongo_style_id() {
        let opt: AnswerOption =
            serde_json::from_str(r#"{"_id": "o1", "text": "Yes", "value": 1}"#).unwrap();
        assert_eq!(opt.id.as_deref(), Some("o1"));
        assert_eq!(opt.value, Some(1.0));
    }
}
