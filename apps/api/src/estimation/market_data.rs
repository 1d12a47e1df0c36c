//! Market Data: localized hourly wage rates via a search-grounded model call.
//!
//! Search grounding cannot be combined with a response schema, so the answer is free
//! text run through `json_extract` and validated here. What happens on failure is a
//! `MarketDataPolicy`: substitute `WageData::fallback` (default) or propagate.

use std::str::FromStr;
use std::time::Duration;

use chrono::{Datelike, Utc};
use serde::Deserialize;
use tracing::{info, warn};

use crate::estimation::prompts::MARKET_DATA_PROMPT_TEMPLATE;
use crate::estimation::{EstimationError, Stage};
use crate::llm_client::json_extract::parse_model_json;
use crate::llm_client::prompts::JSON_ONLY_INSTRUCTION;
use crate::llm_client::{GenerateRequest, GenerativeModel, MARKET_DATA_MODEL};
use crate::models::wage::{HourlyRates, WageData};

/// What a failed market lookup turns into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MarketDataPolicy {
    /// Log the error and continue with fixed USD rates.
    #[default]
    Fallback,
    /// Fail the run like any estimation error.
    Propagate,
}

impl FromStr for MarketDataPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fallback" => Ok(MarketDataPolicy::Fallback),
            "propagate" | "fail" => Ok(MarketDataPolicy::Propagate),
            other => Err(format!(
                "unknown market data policy '{other}' (expected 'fallback' or 'propagate')"
            )),
        }
    }
}

impl MarketDataPolicy {
    /// Applies the policy to the outcome of a lookup for `country`.
    pub fn resolve(
        self,
        country: &str,
        outcome: Result<WageData, EstimationError>,
    ) -> Result<WageData, EstimationError> {
        match (outcome, self) {
            (Ok(wage), _) => Ok(wage),
            (Err(e), MarketDataPolicy::Fallback) => {
                warn!("Market data lookup for {country} failed, using fallback rates: {e}");
                Ok(WageData::fallback(country))
            }
            (Err(e), MarketDataPolicy::Propagate) => Err(e),
        }
    }
}

/// Lenient view of the model's answer; every field is checked in `into_wage_data`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MarketDataReply {
    country: Option<String>,
    currency_symbol: Option<String>,
    currency_code: Option<String>,
    hourly_rates: Option<HourlyRates>,
    source_summary: Option<String>,
}

impl MarketDataReply {
    fn into_wage_data(self, requested_country: &str) -> Result<WageData, EstimationError> {
        let hourly_rates = self.hourly_rates.ok_or_else(|| {
            EstimationError::InvalidWageData("response has no hourlyRates".to_string())
        })?;
        if !hourly_rates.is_populated() {
            return Err(EstimationError::InvalidWageData(format!(
                "hourlyRates must all be positive numbers (got {hourly_rates:?})"
            )));
        }

        let currency_code = self
            .currency_code
            .map(|c| c.trim().to_ascii_uppercase())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| {
                EstimationError::InvalidWageData("response has no currencyCode".to_string())
            })?;

        let country = self
            .country
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| requested_country.to_string());

        Ok(WageData {
            country,
            currency_symbol: self
                .currency_symbol
                .unwrap_or_else(|| currency_code.clone()),
            currency_code,
            hourly_rates,
            source_summary: self.source_summary.unwrap_or_default(),
        })
    }
}

/// `"2025/2026"` for a lookup made in 2026.
fn survey_years() -> String {
    let year = Utc::now().year();
    format!("{}/{}", year - 1, year)
}

pub fn build_market_data_prompt(country: &str) -> String {
    MARKET_DATA_PROMPT_TEMPLATE
        .replace("{survey_years}", &survey_years())
        .replace("{json_only_instruction}", JSON_ONLY_INSTRUCTION)
        .replace("{country}", country)
}

/// One lookup attempt with no policy applied.
pub async fn request_market_data(
    model: &dyn GenerativeModel,
    country: &str,
) -> Result<WageData, EstimationError> {
    let prompt = build_market_data_prompt(country);
    let request = GenerateRequest::search_augmented(MARKET_DATA_MODEL, &prompt);

    let text = model.generate(&request).await?;
    let reply: MarketDataReply = parse_model_json(&text)?;
    reply.into_wage_data(country)
}

/// Looks up wage data for `country` within `deadline` and applies `policy` to failures.
///
/// Under `MarketDataPolicy::Fallback` this never returns `Err`.
pub async fn fetch_market_data(
    model: &dyn GenerativeModel,
    country: &str,
    policy: MarketDataPolicy,
    deadline: Duration,
) -> Result<WageData, EstimationError> {
    info!("Looking up market data for {country}");
    let outcome = match tokio::time::timeout(deadline, request_market_data(model, country)).await
    {
        Ok(outcome) => outcome,
        Err(_) => Err(EstimationError::TimedOut {
            stage: Stage::MarketData,
            secs: deadline.as_secs(),
        }),
    };

    let wage = policy.resolve(country, outcome)?;
    info!(
        "Market data for {}: {} junior={} mid={} senior={} devops={}",
        wage.country,
        wage.currency_code,
        wage.hourly_rates.junior,
        wage.hourly_rates.mid,
        wage.hourly_rates.senior,
        wage.hourly_rates.devops
    );
    Ok(wage)
}
