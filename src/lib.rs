//! Group comparison engine for a test platform.
//!
//! Given two groups of respondents who completed the same test, the engine
//! builds a per-question contingency table of normalized answers, runs a
//! chi-square test of independence on each, aggregates the verdicts, and
//! persists the result. Small samples get coarser answer categories and
//! relaxed expected-frequency thresholds instead of being rejected outright.
//!
//! The entry point is [`ComparisonEngine::compare`]; the surrounding
//! application supplies a [`TestDataProvider`] for groups, tests, questions,
//! and completed attempts.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod comparison;
pub mod error;
pub mod types;

/// Install the default tracing subscriber, honoring `RUST_LOG`.
///
/// Convenience for embedding applications and examples; a host that already
/// configures its own subscriber should skip this.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

pub use comparison::chi_square::{evaluate, ChiSquareResult};
pub use comparison::contingency::{build_contingency_table, ContingencyTable};
pub use comparison::engine::{ComparisonEngine, TestDataProvider};
pub use comparison::result::{GroupComparisonResult, QuestionComparison};
pub use comparison::store::ComparisonStore;
pub use error::{KontrastError, Result};
