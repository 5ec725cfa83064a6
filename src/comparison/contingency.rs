//! Contingency table construction.
//!
//! For one question, counts normalized answer labels across the completed
//! attempts of two groups into a `label → [count_group1, count_group2]`
//! table. Tables are built fresh per comparison call and never persisted.

use indexmap::IndexMap;

use super::normalize::normalize_answer;
use super::SMALL_SAMPLE_MIN;
use crate::types::{Answer, AnswerKey, CompletedAttempt};

/// Label → `[group1 count, group2 count]`.
///
/// An `IndexMap` keeps insertion order, which is deterministic because both
/// attempt slices are sorted by attempt id before any label is produced.
pub type ContingencyTable = IndexMap<String, [u32; 2]>;

/// Merged category for low-count labels in small-sample collapsing.
pub const OTHER_LABEL: &str = "другие";

/// Maximum distinct categories a small-sample table may keep.
const SMALL_SAMPLE_MAX_CATEGORIES: usize = 3;

/// Build the contingency table for `question_id` from two groups' attempts.
///
/// Returns `None` when either attempts slice is empty — the caller skips the
/// question as "insufficient data". A table with fewer than two categories is
/// returned as-is; it carries no discriminating signal and is likewise the
/// caller's check.
pub fn build_contingency_table(
    question_id: &str,
    group1_attempts: &[CompletedAttempt],
    group2_attempts: &[CompletedAttempt],
) -> Option<ContingencyTable> {
    if group1_attempts.is_empty() || group2_attempts.is_empty() {
        return None;
    }

    // Sort by attempt id so table construction is invariant to storage order.
    let group1 = sorted_by_id(group1_attempts);
    let group2 = sorted_by_id(group2_attempts);

    let matched1 = matched_answers(question_id, &group1);
    let matched2 = matched_answers(question_id, &group2);

    let small_sample = (matched1.len() as u32) < SMALL_SAMPLE_MIN
        || (matched2.len() as u32) < SMALL_SAMPLE_MIN;

    let mut table = ContingencyTable::new();
    for (answer, key) in &matched1 {
        let label = normalize_answer(answer, key.question_type, small_sample);
        table.entry(label).or_insert([0, 0])[0] += 1;
    }
    for (answer, key) in &matched2 {
        let label = normalize_answer(answer, key.question_type, small_sample);
        table.entry(label).or_insert([0, 0])[1] += 1;
    }

    if small_sample {
        table = collapse_categories(table);
    }
    Some(table)
}

fn sorted_by_id<'a>(attempts: &'a [CompletedAttempt]) -> Vec<&'a CompletedAttempt> {
    let mut sorted: Vec<&CompletedAttempt> = attempts.iter().collect();
    sorted.sort_by(|a, b| a.id.cmp(&b.id));
    sorted
}

/// Each attempt contributes at most one answer: the first whose resolved key
/// matches the question. Attempts with no matching answer contribute nothing.
fn matched_answers<'a>(
    question_id: &str,
    attempts: &[&'a CompletedAttempt],
) -> Vec<(&'a Answer, AnswerKey)> {
    let mut matched = Vec::new();
    for attempt in attempts {
        let found = attempt.answers.iter().find_map(|answer| {
            answer
                .question_key()
                .filter(|key| key.question_id == question_id)
                .map(|key| (answer, key))
        });
        if let Some(pair) = found {
            matched.push(pair);
        }
    }
    matched
}

/// Adaptive category reduction, checkpoint one of two (the evaluator applies
/// a second, row-total-based merge). Keeps the two highest-total labels and
/// folds everything else into [`OTHER_LABEL`], so that small samples do not
/// scatter across many near-empty cells.
fn collapse_categories(table: ContingencyTable) -> ContingencyTable {
    if table.len() <= SMALL_SAMPLE_MAX_CATEGORIES {
        return table;
    }

    let mut entries: Vec<(String, [u32; 2])> = table.into_iter().collect();
    // Stable sort: ties keep their post-id-sort insertion order.
    entries.sort_by(|a, b| {
        let total_a = a.1[0] + a.1[1];
        let total_b = b.1[0] + b.1[1];
        total_b.cmp(&total_a)
    });

    let mut collapsed = ContingencyTable::new();
    let mut other = [0u32, 0u32];
    for (rank, (label, counts)) in entries.into_iter().enumerate() {
        if rank < SMALL_SAMPLE_MAX_CATEGORIES - 1 {
            collapsed.insert(label, counts);
        } else {
            other[0] += counts[0];
            other[1] += counts[1];
        }
    }
    // If a natural label equal to OTHER_LABEL survived the top-2 cut, this
    // insert replaces its counts with the merged remainder. Accepted
    // collision; stored verdicts depend on it staying this way.
    collapsed.insert(OTHER_LABEL.to_string(), other);
    collapsed
}
