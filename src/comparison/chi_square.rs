//! Two-sample chi-square evaluation of a contingency table.
//!
//! Pure functions of the table: statistic, degrees of freedom, critical value
//! at α = 0.05, significance flag, and right-tail p-value. Small samples get
//! an adaptive minimum-expected-frequency rule (3 instead of the classical 5)
//! and a second category-reduction checkpoint on top of the builder's one.

use super::contingency::ContingencyTable;
use super::SMALL_SAMPLE_MIN;

/// Merged row name for the evaluator-level low-count merge.
pub const OTHER_ROWS_LABEL: &str = "другие_варианты";

/// Minimum expected cell count for a row to enter the chi-square sum.
const MIN_EXPECTED: f64 = 5.0;
/// Relaxed minimum for small samples.
const MIN_EXPECTED_SMALL: f64 = 3.0;
/// Rows below this total are merged before evaluation of a small sample.
const MIN_ROW_TOTAL_SMALL: u32 = 3;
/// Fewer total observations than this cannot be evaluated at all.
const MIN_OBSERVATIONS: u32 = 5;

/// Outcome of evaluating one contingency table.
#[derive(Debug, Clone, PartialEq)]
pub struct ChiSquareResult {
    /// Statistic rounded to 2 decimals; 0.0 for degenerate inputs.
    pub chi_square: f64,
    /// Distinct labels − 1, from the table as given (before any row merge).
    pub degrees_of_freedom: u32,
    pub is_significant: bool,
    /// Critical value at α = 0.05 for `degrees_of_freedom`.
    pub critical_value: f64,
    /// Right-tail probability, rounded to 4 decimals, floored at 0.0001.
    pub p_value: f64,
    /// Either column total was below the small-sample minimum.
    pub is_small_sample: bool,
    /// Note describing the relaxed threshold when it was applied.
    pub adapted_method: Option<String>,
    /// Explanation for degenerate results; `None` on a normal evaluation.
    pub error: Option<String>,
}

fn degenerate(is_small_sample: bool, error: Option<String>) -> ChiSquareResult {
    ChiSquareResult {
        chi_square: 0.0,
        degrees_of_freedom: 0,
        is_significant: false,
        critical_value: 0.0,
        p_value: 1.0,
        is_small_sample,
        adapted_method: None,
        error,
    }
}

/// Evaluate a contingency table into a [`ChiSquareResult`]. Never panics.
pub fn evaluate(table: &ContingencyTable) -> ChiSquareResult {
    if table.is_empty() {
        return degenerate(false, None);
    }

    let group1_total: u32 = table.values().map(|counts| counts[0]).sum();
    let group2_total: u32 = table.values().map(|counts| counts[1]).sum();
    let total = group1_total + group2_total;

    if group1_total == 0 || group2_total == 0 {
        return degenerate(false, None);
    }
    if total < MIN_OBSERVATIONS {
        return degenerate(
            true,
            Some(format!(
                "too few observations for chi-square: {} < {}",
                total, MIN_OBSERVATIONS
            )),
        );
    }

    let degrees_of_freedom = table.len() as u32 - 1;
    if degrees_of_freedom == 0 {
        return degenerate(false, None);
    }

    // Alphabetical row order: evaluation must not depend on how the builder
    // happened to order its keys.
    let mut rows: Vec<(String, [u32; 2])> = table
        .iter()
        .map(|(label, counts)| (label.clone(), *counts))
        .collect();
    rows.sort_by(|a, b| a.0.cmp(&b.0));

    let is_small_sample = group1_total < SMALL_SAMPLE_MIN || group2_total < SMALL_SAMPLE_MIN;
    if is_small_sample {
        rows = merge_low_count_rows(rows);
    }

    let min_expected = if is_small_sample {
        MIN_EXPECTED_SMALL
    } else {
        MIN_EXPECTED
    };

    let total_f = total as f64;
    let group1_f = group1_total as f64;
    let group2_f = group2_total as f64;

    let mut chi_square = 0.0;
    let mut rows_used = 0usize;
    for (_, counts) in &rows {
        let row_total = (counts[0] + counts[1]) as f64;
        let expected1 = group1_f * row_total / total_f;
        let expected2 = group2_f * row_total / total_f;
        if expected1 < min_expected || expected2 < min_expected {
            continue;
        }
        chi_square += (counts[0] as f64 - expected1).powi(2) / expected1
            + (counts[1] as f64 - expected2).powi(2) / expected2;
        rows_used += 1;
    }

    if rows_used == 0 {
        return degenerate(
            true,
            Some(format!(
                "no row reached the minimum expected frequency of {}",
                min_expected
            )),
        );
    }

    let chi_square = round2(chi_square);
    let (critical_value, is_significant, p_value) = significance(chi_square, degrees_of_freedom);

    ChiSquareResult {
        chi_square,
        degrees_of_freedom,
        is_significant,
        critical_value,
        p_value,
        is_small_sample,
        adapted_method: is_small_sample.then(|| {
            format!(
                "minimum expected frequency relaxed to {} for small sample",
                MIN_EXPECTED_SMALL
            )
        }),
        error: None,
    }
}

/// Adaptive category reduction, checkpoint two: merge rows whose own total is
/// below 3 into one synthetic row. When no row qualifies, the original rows
/// are used unchanged.
fn merge_low_count_rows(rows: Vec<(String, [u32; 2])>) -> Vec<(String, [u32; 2])> {
    let any_low = rows
        .iter()
        .any(|(_, counts)| counts[0] + counts[1] < MIN_ROW_TOTAL_SMALL);
    if !any_low {
        return rows;
    }

    let mut merged = [0u32, 0u32];
    let mut kept = Vec::with_capacity(rows.len());
    for (label, counts) in rows {
        if counts[0] + counts[1] < MIN_ROW_TOTAL_SMALL {
            merged[0] += counts[0];
            merged[1] += counts[1];
        } else {
            kept.push((label, counts));
        }
    }
    kept.push((OTHER_ROWS_LABEL.to_string(), merged));
    kept
}

/// Critical value, significance flag, and p-value for a chi-square statistic.
///
/// Shared by per-question evaluation and the orchestrator's aggregate verdict
/// so the averaged statistics go through the identical derivation.
pub fn significance(chi_square: f64, degrees_of_freedom: u32) -> (f64, bool, f64) {
    let critical_value = critical_value_at_05(degrees_of_freedom);
    let is_significant = chi_square > critical_value;
    let p_value = p_value(chi_square, degrees_of_freedom, critical_value);
    (critical_value, is_significant, p_value)
}

/// α = 0.05 critical values for df 1–10; normal approximation beyond.
pub fn critical_value_at_05(degrees_of_freedom: u32) -> f64 {
    match degrees_of_freedom {
        0 => 0.0,
        1 => 3.841,
        2 => 5.991,
        3 => 7.815,
        4 => 9.488,
        5 => 11.07,
        6 => 12.592,
        7 => 14.067,
        8 => 15.507,
        9 => 16.919,
        10 => 18.307,
        df => (2.0 * df as f64).sqrt() * 1.96 + df as f64,
    }
}

/// Right-tail p-value with the coarse bucketed fallback. Must never panic:
/// when the CDF comes back non-finite or out of range, the statistic is
/// bucketed against the critical value instead.
fn p_value(chi_square: f64, degrees_of_freedom: u32, critical_value: f64) -> f64 {
    if degrees_of_freedom == 0 {
        return 1.0;
    }
    let cdf = chi_square_cdf(chi_square, degrees_of_freedom as f64);
    let p = 1.0 - cdf;
    if !p.is_finite() || !(0.0..=1.0).contains(&p) {
        // Last-resort guard; the gamma implementation below converges for
        // every chi_square ≥ 0 and df ≥ 1 this crate produces.
        return if chi_square <= critical_value {
            0.1
        } else if critical_value > 0.0 && chi_square / critical_value > 1.5 {
            0.01
        } else {
            0.03
        };
    }
    (round4(p)).clamp(0.0001, 1.0)
}

/// CDF of the chi-square distribution: P(df/2, x/2), the regularized lower
/// incomplete gamma function.
pub fn chi_square_cdf(x: f64, degrees_of_freedom: f64) -> f64 {
    if x <= 0.0 || degrees_of_freedom <= 0.0 {
        return 0.0;
    }
    regularized_lower_gamma(degrees_of_freedom / 2.0, x / 2.0)
}

// ── Regularized lower incomplete gamma (series + continued fraction) ─

fn regularized_lower_gamma(a: f64, x: f64) -> f64 {
    if x < a + 1.0 {
        gamma_series(a, x)
    } else {
        (1.0 - gamma_continued_fraction(a, x)).clamp(0.0, 1.0)
    }
}

/// Series representation, converges fast for x < a + 1.
fn gamma_series(a: f64, x: f64) -> f64 {
    const MAX_ITERS: usize = 200;
    const EPS: f64 = 3.0e-7;

    let mut ap = a;
    let mut sum = 1.0 / a;
    let mut term = sum;
    for _ in 0..MAX_ITERS {
        ap += 1.0;
        term *= x / ap;
        sum += term;
        if term.abs() < sum.abs() * EPS {
            break;
        }
    }
    (sum * (-x + a * x.ln() - ln_gamma(a)).exp()).clamp(0.0, 1.0)
}

/// Upper tail Q(a, x) via Lentz's continued fraction, for x ≥ a + 1.
fn gamma_continued_fraction(a: f64, x: f64) -> f64 {
    const MAX_ITERS: usize = 200;
    const EPS: f64 = 3.0e-7;
    const FPMIN: f64 = 1.0e-30;

    let mut b = x + 1.0 - a;
    let mut c = 1.0 / FPMIN;
    let mut d = 1.0 / b;
    let mut h = d;

    for i in 1..=MAX_ITERS {
        let an = -(i as f64) * (i as f64 - a);
        b += 2.0;
        d = an * d + b;
        if d.abs() < FPMIN {
            d = FPMIN;
        }
        c = b + an / c;
        if c.abs() < FPMIN {
            c = FPMIN;
        }
        d = 1.0 / d;
        let delta = d * c;
        h *= delta;
        if (delta - 1.0).abs() < EPS {
            break;
        }
    }

    ((-x + a * x.ln() - ln_gamma(a)).exp() * h).clamp(0.0, 1.0)
}

/// Lanczos approximation of ln(Gamma(x)) for x > 0.
#[allow(clippy::excessive_precision)]
fn ln_gamma(x: f64) -> f64 {
    // Lanczos coefficients (g=7)
    let coefficients = [
        0.99999999999980993,
        676.5203681218851,
        -1259.1392167224028,
        771.32342877765313,
        -176.61502916214059,
        12.507343278686905,
        -0.13857109526572012,
        9.9843695780195716e-6,
        1.5056327351493116e-7,
    ];

    if x < 0.5 {
        // Reflection formula
        let pi = std::f64::consts::PI;
        return (pi / (pi * x).sin()).ln() - ln_gamma(1.0 - x);
    }

    let x = x - 1.0;
    let mut acc = coefficients[0];
    let t = x + 7.5; // g + 0.5

    for (i, &coef) in coefficients.iter().enumerate().skip(1) {
        acc += coef / (x + i as f64);
    }

    0.5 * (2.0 * std::f64::consts::PI).ln() + (t.ln() * (x + 0.5)) - t + acc.ln()
}

pub(crate) fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}
