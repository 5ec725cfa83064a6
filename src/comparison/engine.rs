//! Group comparison orchestration.
//!
//! Validates a pair of groups, fetches their completed attempts, evaluates
//! every question of the shared test, aggregates a single verdict, and
//! persists it. All data access goes through the injected
//! [`TestDataProvider`]; the engine holds no state of its own between calls.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use super::chi_square::{evaluate, round2, significance};
use super::contingency::build_contingency_table;
use super::result::{GroupComparisonResult, QuestionComparison};
use super::store::{now_ms, ComparisonStore};
use crate::error::{KontrastError, Result};
use crate::types::{CompletedAttempt, Group, Question, Test};

/// Data-access collaborator implemented by the surrounding CRUD layer.
///
/// `completed_attempts` must return attempts already scoped to the group's
/// members and filtered to completed status; the engine does not re-filter.
#[async_trait]
pub trait TestDataProvider: Send + Sync {
    async fn group_by_id(&self, id: &str) -> Result<Option<Group>>;
    async fn test_by_id(&self, id: &str) -> Result<Option<Test>>;
    async fn questions_by_test(&self, test_id: &str) -> Result<Vec<Question>>;
    async fn completed_attempts(
        &self,
        test_id: &str,
        group_id: &str,
    ) -> Result<Vec<CompletedAttempt>>;
}

pub struct ComparisonEngine {
    provider: Arc<dyn TestDataProvider>,
    store: Arc<ComparisonStore>,
}

impl ComparisonEngine {
    pub fn new(provider: Arc<dyn TestDataProvider>, store: Arc<ComparisonStore>) -> Self {
        Self { provider, store }
    }

    /// Compare two groups of the same test and persist the verdict.
    ///
    /// The pair is processed in canonical order (ascending group id) so the
    /// computation is invariant to argument order; the returned copy swaps
    /// the groups back to match the caller's request. The persisted record
    /// always reflects the canonical order.
    pub async fn compare(
        &self,
        group1_id: &str,
        group2_id: &str,
        author_id: &str,
    ) -> Result<GroupComparisonResult> {
        if group1_id.trim().is_empty() || group2_id.trim().is_empty() {
            return Err(KontrastError::NotValid(
                "both group ids are required".to_string(),
            ));
        }
        if group1_id == group2_id {
            return Err(KontrastError::NotValid(
                "cannot compare a group with itself".to_string(),
            ));
        }

        let group1 = self
            .provider
            .group_by_id(group1_id)
            .await?
            .ok_or_else(|| KontrastError::GroupNotFound(group1_id.to_string()))?;
        let group2 = self
            .provider
            .group_by_id(group2_id)
            .await?
            .ok_or_else(|| KontrastError::GroupNotFound(group2_id.to_string()))?;

        let (author1, test1) = validated_refs(&group1)?;
        let (author2, test2) = validated_refs(&group2)?;

        if author1 != author_id || author2 != author_id {
            return Err(KontrastError::Forbidden(
                "requesting author must own both groups".to_string(),
            ));
        }
        if test1 != test2 {
            return Err(KontrastError::TestMismatch {
                group1_test: test1.to_string(),
                group2_test: test2.to_string(),
            });
        }
        let test_id = test1.to_string();

        // Canonical order: ascending group id, whatever the caller passed.
        let swapped = group1_id > group2_id;
        let (first, second) = if swapped {
            (group2, group1)
        } else {
            (group1, group2)
        };
        tracing::info!(
            group1 = %first.id,
            group2 = %second.id,
            test = %test_id,
            swapped,
            "starting group comparison"
        );

        let attempts1 = self.provider.completed_attempts(&test_id, &first.id).await?;
        if attempts1.is_empty() {
            return Err(KontrastError::InsufficientData(format!(
                "group '{}' has no completed attempts",
                first.id
            )));
        }
        let attempts2 = self
            .provider
            .completed_attempts(&test_id, &second.id)
            .await?;
        if attempts2.is_empty() {
            return Err(KontrastError::InsufficientData(format!(
                "group '{}' has no completed attempts",
                second.id
            )));
        }

        let questions = self.provider.questions_by_test(&test_id).await?;
        if questions.is_empty() {
            return Err(KontrastError::InsufficientData(format!(
                "test '{}' has no questions",
                test_id
            )));
        }
        let test = self
            .provider
            .test_by_id(&test_id)
            .await?
            .ok_or_else(|| KontrastError::TestNotFound(test_id.clone()))?;

        let outcome = score_questions(&questions, &attempts1, &attempts2);
        if outcome.rows.is_empty() {
            return Err(KontrastError::InsufficientData(
                "no question yielded a usable contingency table".to_string(),
            ));
        }

        let stored = self.store.save(outcome.into_result(
            &first,
            &second,
            &test,
            author_id,
        ))?;
        tracing::info!(
            result_id = %stored.id,
            questions = stored.total_questions,
            significant = stored.significant_questions,
            "comparison persisted"
        );

        // Response matches the caller's original order; the stored record
        // stays canonical.
        if swapped {
            let mut response = stored;
            std::mem::swap(&mut response.group1_id, &mut response.group2_id);
            std::mem::swap(&mut response.group1_name, &mut response.group2_name);
            Ok(response)
        } else {
            Ok(stored)
        }
    }
}

/// Group record integrity: a comparable group carries an author, a test, and
/// at least one member. Broken records are reported, not unwrapped.
fn validated_refs(group: &Group) -> Result<(&str, &str)> {
    let author = group
        .author_id
        .as_deref()
        .filter(|a| !a.trim().is_empty())
        .ok_or_else(|| {
            KontrastError::NotValid(format!("group '{}' has no author", group.id))
        })?;
    let test = group
        .test_id
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| {
            KontrastError::NotValid(format!("group '{}' has no associated test", group.id))
        })?;
    if group.members.is_empty() {
        return Err(KontrastError::NotValid(format!(
            "group '{}' has no members",
            group.id
        )));
    }
    Ok((author, test))
}

struct ScoredQuestions {
    rows: Vec<QuestionComparison>,
    total_chi_square: f64,
    total_degrees_of_freedom: u32,
    significant_questions: u32,
    is_small_sample: bool,
    adapted_method: Option<String>,
}

/// Per-question loop. A question that produces no usable table is skipped
/// and logged; one bad question never aborts the comparison.
fn score_questions(
    questions: &[Question],
    attempts1: &[CompletedAttempt],
    attempts2: &[CompletedAttempt],
) -> ScoredQuestions {
    let mut outcome = ScoredQuestions {
        rows: Vec::new(),
        total_chi_square: 0.0,
        total_degrees_of_freedom: 0,
        significant_questions: 0,
        is_small_sample: false,
        adapted_method: None,
    };

    for question in questions {
        let Some(table) = build_contingency_table(&question.id, attempts1, attempts2) else {
            tracing::warn!(question_id = %question.id, "skipping question: no contingency table");
            continue;
        };
        if table.len() < 2 {
            // A single-category table carries no discriminating signal.
            tracing::warn!(
                question_id = %question.id,
                categories = table.len(),
                "skipping question: not enough answer categories"
            );
            continue;
        }

        let eval = evaluate(&table);
        if let Some(reason) = &eval.error {
            tracing::warn!(question_id = %question.id, %reason, "question evaluated as degenerate");
        }

        outcome.total_chi_square += eval.chi_square;
        outcome.total_degrees_of_freedom += eval.degrees_of_freedom;
        if eval.is_significant {
            outcome.significant_questions += 1;
        }
        outcome.is_small_sample |= eval.is_small_sample;
        if outcome.adapted_method.is_none() {
            outcome.adapted_method = eval.adapted_method.clone();
        }
        outcome.rows.push(QuestionComparison {
            question_id: question.id.clone(),
            question_text: question.text.clone(),
            chi_square: eval.chi_square,
            degrees_of_freedom: eval.degrees_of_freedom,
            is_significant: eval.is_significant,
            critical_value: eval.critical_value,
            p_value: eval.p_value,
        });
    }

    outcome
}

impl ScoredQuestions {
    /// Aggregate verdict over the scored questions.
    ///
    /// The aggregate chi-square and degrees of freedom are MEANS across the
    /// questions, not a pooled test. Statistically non-standard, but this is
    /// the platform's documented reporting behavior and downstream consumers
    /// depend on it; a Fisher-style combination would change every stored
    /// verdict. The fraction of significant questions is reported alongside.
    fn into_result(
        self,
        group1: &Group,
        group2: &Group,
        test: &Test,
        author_id: &str,
    ) -> GroupComparisonResult {
        let valid = self.rows.len() as u32;
        let chi_square_value = round2(self.total_chi_square / valid as f64);
        let degrees_of_freedom =
            ((self.total_degrees_of_freedom as f64 / valid as f64).round() as u32).max(1);
        let (_, is_significant, p_value) = significance(chi_square_value, degrees_of_freedom);

        let significant_ratio = self.significant_questions as f64 / valid as f64;
        let significant_percentage = (significant_ratio * 1000.0).round() / 10.0;

        GroupComparisonResult {
            id: Uuid::new_v4().to_string(),
            group1_id: group1.id.clone(),
            group1_name: group1.name.clone(),
            group2_id: group2.id.clone(),
            group2_name: group2.name.clone(),
            test_id: test.id.clone(),
            test_name: test.name.clone(),
            author_id: author_id.to_string(),
            chi_square_value,
            degrees_of_freedom,
            is_significant,
            p_value,
            significant_questions: self.significant_questions,
            total_questions: valid,
            significant_ratio,
            significant_percentage,
            question_results: self.rows,
            is_small_sample: self.is_small_sample,
            adapted_method: self.adapted_method,
            created_at: now_ms(),
        }
    }
}
