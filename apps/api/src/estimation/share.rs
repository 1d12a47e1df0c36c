//! Share summary for a finished estimate: one text block plus social intent links.

use anyhow::Result;
use reqwest::Url;
use serde::Serialize;

use crate::models::estimate::EstimationResult;

const TWITTER_INTENT: &str = "https://twitter.com/intent/tweet";
const LINKEDIN_SHARE: &str = "https://www.linkedin.com/sharing/share-offsite/";
const FACEBOOK_SHARE: &str = "https://www.facebook.com/sharer/sharer.php";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareSummary {
    pub text: String,
    pub twitter_url: String,
    pub linkedin_url: String,
    pub facebook_url: String,
}

/// ISO 4217 currencies without a minor unit.
const ZERO_DECIMAL_CURRENCIES: &[&str] = &[
    "BIF", "CLP", "DJF", "GNF", "ISK", "JPY", "KMF", "KRW", "PYG", "RWF", "UGX", "UYI", "VND",
    "VUV", "XAF", "XOF", "XPF",
];

/// ISO 4217 currencies with three decimal places.
const THREE_DECIMAL_CURRENCIES: &[&str] = &["BHD", "IQD", "JOD", "KWD", "LYD", "OMR", "TND"];

/// Decimal places shown for `currency_code`. Unknown codes get two.
pub fn minor_unit_digits(currency_code: &str) -> u32 {
    let code = currency_code.trim().to_ascii_uppercase();
    if ZERO_DECIMAL_CURRENCIES.contains(&code.as_str()) {
        0
    } else if THREE_DECIMAL_CURRENCIES.contains(&code.as_str()) {
        3
    } else {
        2
    }
}

/// `€1,234,567.50` style amount with the currency symbol prefixed and
/// as many decimals as the currency has minor units (`¥1,250,000` for JPY).
pub fn format_money(symbol: &str, currency_code: &str, value: f64) -> String {
    let digits = minor_unit_digits(currency_code);
    let scale = 10u64.pow(digits);
    let minor = (value.abs() * scale as f64).round() as u64;
    let whole = (minor / scale).to_string();

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && minor > 0 { "-" } else { "" };
    if digits == 0 {
        format!("{sign}{symbol}{grouped}")
    } else {
        let fraction = minor % scale;
        format!("{sign}{symbol}{grouped}.{fraction:0width$}", width = digits as usize)
    }
}

pub fn share_text(result: &EstimationResult) -> String {
    let wage = &result.wage_data_used;
    format!(
        "I just generated a project estimate for \"{}\" using DevCost AI.\n\n\
         💰 Estimate: {} - {}\n\
         ⏱️ Timeline: {}-{} weeks\n\
         📍 Market: {}",
        result.project_name,
        format_money(&wage.currency_symbol, &wage.currency_code, result.total_cost.min),
        format_money(&wage.currency_symbol, &wage.currency_code, result.total_cost.max),
        result.timeline_weeks.min,
        result.timeline_weeks.max,
        result.wage_data_used.country
    )
}

pub fn build_share_summary(result: &EstimationResult, public_origin: &str) -> Result<ShareSummary> {
    let text = share_text(result);

    let twitter = Url::parse_with_params(
        TWITTER_INTENT,
        &[("text", text.as_str()), ("url", public_origin)],
    )?;
    let linkedin = Url::parse_with_params(LINKEDIN_SHARE, &[("url", public_origin)])?;
    let facebook = Url::parse_with_params(
        FACEBOOK_SHARE,
        &[("u", public_origin), ("quote", text.as_str())],
    )?;

    Ok(ShareSummary {
        text,
        twitter_url: twitter.into(),
        linkedin_url: linkedin.into(),
        facebook_url: facebook.into(),
    })
}
