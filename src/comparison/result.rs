use serde::{Deserialize, Serialize};

use crate::error::{KontrastError, Result};

/// Per-question breakdown row inside a persisted comparison verdict.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuestionComparison {
    pub question_id: String,
    pub question_text: String,
    pub chi_square: f64,
    pub degrees_of_freedom: u32,
    pub is_significant: bool,
    pub critical_value: f64,
    pub p_value: f64,
}

/// A persisted group comparison verdict.
///
/// Stored in canonical group order (ascending group id) regardless of how the
/// caller ordered the pair; the engine swaps the response copy back. The
/// aggregate `chi_square_value` / `degrees_of_freedom` are means across the
/// scored questions, not a pooled test — see the engine for why.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GroupComparisonResult {
    pub id: String,
    pub group1_id: String,
    pub group1_name: String,
    pub group2_id: String,
    pub group2_name: String,
    pub test_id: String,
    pub test_name: String,
    pub author_id: String,
    /// Mean chi-square across scored questions, 2 decimals.
    pub chi_square_value: f64,
    /// Mean degrees of freedom across scored questions, rounded, at least 1.
    pub degrees_of_freedom: u32,
    pub is_significant: bool,
    pub p_value: f64,
    pub significant_questions: u32,
    pub total_questions: u32,
    /// `significant_questions / total_questions`.
    pub significant_ratio: f64,
    /// Same ratio ×100, 1 decimal.
    pub significant_percentage: f64,
    pub question_results: Vec<QuestionComparison>,
    pub is_small_sample: bool,
    pub adapted_method: Option<String>,
    /// Unix millis.
    pub created_at: i64,
}

impl GroupComparisonResult {
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(KontrastError::NotValid(
                "comparison result must have an id".to_string(),
            ));
        }
        if self.author_id.trim().is_empty() {
            return Err(KontrastError::NotValid(
                "comparison result must have an author".to_string(),
            ));
        }
        if self.group1_id == self.group2_id {
            return Err(KontrastError::NotValid(format!(
                "comparison result references the same group twice: {}",
                self.group1_id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_result() -> GroupComparisonResult {
        GroupComparisonResult {
            id: "550e8400-e29b-41d4-a716-446655440000".to_string(),
            group1_id: "g1".to_string(),
            group1_name: "Группа А".to_string(),
            group2_id: "g2".to_string(),
            group2_name: "Группа Б".to_string(),
            test_id: "t1".to_string(),
            test_name: "Тест тревожности".to_string(),
            author_id: "author-1".to_string(),
            chi_square_value: 4.21,
            degrees_of_freedom: 2,
            is_significant: false,
            p_value: 0.1218,
            significant_questions: 1,
            total_questions: 4,
            significant_ratio: 0.25,
            significant_percentage: 25.0,
            question_results: vec![QuestionComparison {
                question_id: "q1".to_string(),
                question_text: "Как часто вы волнуетесь?".to_string(),
                chi_square: 7.2,
                degrees_of_freedom: 1,
                is_significant: true,
                critical_value: 3.841,
                p_value: 0.0073,
            }],
            is_small_sample: false,
            adapted_method: None,
            created_at: 1700000000000,
        }
    }

    #[test]
    fn validate_valid_result_succeeds() {
        assert!(valid_result().validate().is_ok());
    }

    #[test]
    fn validate_same_group_twice_fails() {
        let mut r = valid_result();
        r.group2_id = r.group1_id.clone();
        assert!(matches!(r.validate(), Err(KontrastError::NotValid(_))));
    }

    #[test]
    fn validate_empty_author_fails() {
        let mut r = valid_result();
        r.author_id = "  ".to_string();
        assert!(r.validate().is_err());
    }

    #[test]
    fn result_serializes_to_camel_case() {
        let json = serde_json::to_string(&valid_result()).unwrap();
        assert!(json.contains("group1Id"));
        assert!(json.contains("chiSquareValue"));
        assert!(json.contains("questionResults"));
        assert!(json.contains("significantRatio"));
        assert!(!json.contains("group1_id"));
    }

    #[test]
    fn result_roundtrips_through_json() {
        let r = valid_result();
        let json = serde_json::to_string(&r).unwrap();
        let back: GroupComparisonResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, r.id);
        assert_eq!(back.chi_square_value, r.chi_square_value);
        assert_eq!(back.question_results, r.question_results);
        assert_eq!(back.created_at, r.created_at);
    }
}
