use serde::{Deserialize, Serialize};

pub const FALLBACK_CURRENCY_CODE: &str = "USD";
pub const FALLBACK_CURRENCY_SYMBOL: &str = "$";
pub const FALLBACK_SOURCE_SUMMARY: &str = "Fallback estimation data (Search failed)";

/// Average hourly rate per tier, in the local currency.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HourlyRates {
    pub junior: f64,
    pub mid: f64,
    pub senior: f64,
    pub devops: f64,
}

impl HourlyRates {
    pub const FALLBACK: HourlyRates = HourlyRates {
        junior: 25.0,
        mid: 50.0,
        senior: 80.0,
        devops: 70.0,
    };

    /// All four tiers carry a usable positive rate.
    pub fn is_populated(&self) -> bool {
        [self.junior, self.mid, self.senior, self.devops]
            .iter()
            .all(|r| r.is_finite() && *r > 0.0)
    }
}

/// Localized labor-rate figures for one estimation run. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WageData {
    pub country: String,
    pub currency_symbol: String,
    /// ISO 4217
    pub currency_code: String,
    pub hourly_rates: HourlyRates,
    pub source_summary: String,
}

impl WageData {
    /// Fixed data substituted when the market lookup fails.
    pub fn fallback(country: &str) -> Self {
        Self {
            country: country.to_string(),
            currency_symbol: FALLBACK_CURRENCY_SYMBOL.to_string(),
            currency_code: FALLBACK_CURRENCY_CODE.to_string(),
            hourly_rates: HourlyRates::FALLBACK,
            source_summary: FALLBACK_SOURCE_SUMMARY.to_string(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.source_summary == FALLBACK_SOURCE_SUMMARY
    }
}
