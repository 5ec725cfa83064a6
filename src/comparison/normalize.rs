//! Answer label extraction.
//!
//! Turns one raw answer into a single lowercase categorical label, according
//! to the question type. Labels are the row keys of the contingency tables;
//! the sentinel values are kept in the platform's original Russian spelling
//! because persisted comparison results are rendered to users verbatim.

use crate::types::{Answer, AnswerOption, QuestionType};

/// No option selected / no usable payload at all.
pub const NO_ANSWER: &str = "нет_ответа";
/// A selection slot exists but carries neither text nor identifier.
pub const EMPTY_ANSWER: &str = "пустой_ответ";
/// Free-text question answered with non-empty text.
pub const WITH_TEXT: &str = "с_ответом";
/// Free-text question left blank.
pub const WITHOUT_TEXT: &str = "без_ответа";

/// Produce the canonical label for one answer.
///
/// `small_sample` switches the information-discarding variants on: multiple
/// selections degrade to a count-of-selections label, scale values are banded,
/// and any numeric label is re-bucketed into three coarse value bands. The
/// flag is derived by the table builder from per-group matched-answer counts.
///
/// Pure function; never panics.
pub fn normalize_answer(answer: &Answer, question_type: QuestionType, small_sample: bool) -> String {
    let raw = match question_type {
        QuestionType::Single => single_label(answer),
        QuestionType::Multiple => multiple_label(answer, small_sample),
        QuestionType::Scale => scale_label(answer, small_sample),
        QuestionType::Text => text_label(answer),
        QuestionType::Unknown => fallback_label(answer),
    };

    let mut label = raw.trim().to_lowercase();
    if label.is_empty() {
        label = NO_ANSWER.to_string();
    }
    if small_sample {
        label = bucket_numeric_label(label);
    }
    label
}

/// Display text of an option, falling back to its identifier.
fn option_label(option: &AnswerOption) -> Option<String> {
    if let Some(text) = &option.text {
        let text = text.trim();
        if !text.is_empty() {
            return Some(text.to_string());
        }
    }
    option
        .id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

fn single_label(answer: &Answer) -> String {
    match answer.selected_options.first() {
        Some(option) => option_label(option).unwrap_or_else(|| EMPTY_ANSWER.to_string()),
        None => NO_ANSWER.to_string(),
    }
}

fn multiple_label(answer: &Answer, small_sample: bool) -> String {
    if answer.selected_options.is_empty() {
        return NO_ANSWER.to_string();
    }
    if small_sample {
        // Keep cells populated by counting selections instead of naming them.
        return format!("выбрано_{}_вариантов", answer.selected_options.len());
    }
    let mut labels: Vec<String> = answer
        .selected_options
        .iter()
        .map(|option| option_label(option).unwrap_or_else(|| EMPTY_ANSWER.to_string()))
        .collect();
    labels.sort();
    labels.join("|")
}

fn scale_label(answer: &Answer, small_sample: bool) -> String {
    match answer.scale_value {
        Some(value) if value.is_finite() => {
            if small_sample {
                scale_band(value).to_string()
            } else {
                format_number(value)
            }
        }
        _ => NO_ANSWER.to_string(),
    }
}

/// Fixed ordinal bands for small-sample scale answers: ≤3 / 4–7 / ≥8.
fn scale_band(value: f64) -> &'static str {
    if value <= 3.0 {
        "низкий_балл"
    } else if value <= 7.0 {
        "средний_балл"
    } else {
        "высокий_балл"
    }
}

fn text_label(answer: &Answer) -> String {
    match &answer.text_answer {
        Some(text) if !text.trim().is_empty() => WITH_TEXT.to_string(),
        _ => WITHOUT_TEXT.to_string(),
    }
}

/// Best-effort chain for untyped questions: option text, then scale value,
/// then free-text presence.
fn fallback_label(answer: &Answer) -> String {
    if let Some(option) = answer.selected_options.first() {
        if let Some(label) = option_label(option) {
            return label;
        }
    }
    if let Some(value) = answer.scale_value {
        if value.is_finite() {
            return format_number(value);
        }
    }
    match &answer.text_answer {
        Some(text) if !text.trim().is_empty() => WITH_TEXT.to_string(),
        _ => NO_ANSWER.to_string(),
    }
}

/// Second, coarser numeric bucketing applied uniformly across types in
/// small-sample mode: any label that parses as a number collapses into one of
/// three value bands.
fn bucket_numeric_label(label: String) -> String {
    match label.parse::<f64>() {
        Ok(value) if value.is_finite() => {
            if value <= 2.0 {
                "низкое_значение".to_string()
            } else if value <= 5.0 {
                "среднее_значение".to_string()
            } else {
                "высокое_значение".to_string()
            }
        }
        _ => label,
    }
}

/// Integral values render without a trailing `.0` so that `7.0` and `7`
/// produce the same category.
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}
