// Estimation core: market-data lookup and schema-constrained cost estimation.
// All model calls go through llm_client::GenerativeModel.

pub mod estimator;
pub mod market_data;
pub mod prompts;
pub mod schema;
pub mod share;
pub mod validation;

use std::fmt;

use thiserror::Error;

use crate::llm_client::LlmError;

/// Target markets offered to clients. Any non-empty country is accepted.
pub const SUPPORTED_COUNTRIES: [&str; 12] = [
    "United States",
    "United Kingdom",
    "Germany",
    "Canada",
    "Australia",
    "India",
    "Poland",
    "Brazil",
    "Ukraine",
    "Vietnam",
    "Estonia",
    "Mexico",
];

/// The two external calls of one estimation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    MarketData,
    Estimation,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::MarketData => f.write_str("Market data lookup"),
            Stage::Estimation => f.write_str("Estimation"),
        }
    }
}

#[derive(Debug, Error)]
pub enum EstimationError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("Could not read the model's answer: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Market data incomplete: {0}")]
    InvalidWageData(String),

    #[error("Estimate failed consistency checks: {}", .0.join("; "))]
    InconsistentEstimate(Vec<String>),

    #[error("{stage} timed out after {secs}s")]
    TimedOut { stage: Stage, secs: u64 },

    #[error("Estimation cancelled")]
    Cancelled,
}
