//! Project Estimation: attachments + requirements + wage data → `EstimationResult`.
//!
//! Flow: build prompt → schema-constrained multimodal call with a thinking budget →
//!       parse → consistency checks → attach the input `WageData`.
//!
//! No fallback here: a fabricated estimate would mislead, so every failure propagates.

use tracing::info;

use crate::estimation::prompts::{ESTIMATION_PROMPT_TEMPLATE, ESTIMATION_SYSTEM};
use crate::estimation::schema::estimate_response_schema;
use crate::estimation::validation::{check_estimate, warn_on_component_drift};
use crate::estimation::EstimationError;
use crate::llm_client::json_extract::parse_model_json;
use crate::llm_client::prompts::LOCAL_CURRENCY_INSTRUCTION;
use crate::llm_client::{GenerateRequest, GenerativeModel, Part, ESTIMATION_MODEL, THINKING_BUDGET};
use crate::models::estimate::{EstimationResult, ModelEstimate};
use crate::models::upload::UploadedFile;
use crate::models::wage::WageData;

pub fn build_estimation_prompt(requirements: &str, wage: &WageData) -> String {
    let rates = &wage.hourly_rates;
    ESTIMATION_PROMPT_TEMPLATE
        .replace("{country}", &wage.country)
        .replace("{currency_code}", &wage.currency_code)
        .replace("{currency_symbol}", &wage.currency_symbol)
        .replace("{junior}", &rates.junior.to_string())
        .replace("{mid}", &rates.mid.to_string())
        .replace("{senior}", &rates.senior.to_string())
        .replace("{devops}", &rates.devops.to_string())
        .replace("{currency_instruction}", LOCAL_CURRENCY_INSTRUCTION)
        // Last, so placeholder-like text inside the user's requirements stays literal.
        .replace("{requirements}", requirements)
}

pub fn build_estimation_request(
    files: &[UploadedFile],
    requirements: &str,
    wage: &WageData,
) -> GenerateRequest {
    let attachments = files
        .iter()
        .map(|f| Part::inline(f.mime_type.clone(), f.base64.to_string()))
        .collect();

    GenerateRequest::structured(
        ESTIMATION_MODEL,
        ESTIMATION_SYSTEM,
        attachments,
        &build_estimation_prompt(requirements, wage),
        estimate_response_schema(),
        THINKING_BUDGET,
    )
}

/// Runs the estimation call. The caller guarantees `files` or `requirements` is non-empty.
///
/// `wage_data_used` on the result is always `wage`, whatever the model echoed.
pub async fn generate_estimate(
    model: &dyn GenerativeModel,
    files: &[UploadedFile],
    requirements: &str,
    wage: &WageData,
) -> Result<EstimationResult, EstimationError> {
    let request = build_estimation_request(files, requirements, wage);
    info!(
        "Requesting estimate: {} attachment(s), {} chars of requirements, market {}",
        files.len(),
        requirements.len(),
        wage.country
    );

    let text = model.generate(&request).await?;
    let estimate: ModelEstimate = parse_model_json(&text)?;

    check_estimate(&estimate)?;
    warn_on_component_drift(&estimate);

    info!(
        "Estimate for '{}': {}{}-{} over {}-{} weeks",
        estimate.project_name,
        wage.currency_symbol,
        estimate.total_cost.min,
        estimate.total_cost.max,
        estimate.timeline_weeks.min,
        estimate.timeline_weeks.max
    );

    Ok(estimate.with_wage_data(wage.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::testing::ScriptedModel;
    use crate::llm_client::LlmError;
    use crate::models::estimate::ComponentCosts;
    use crate::models::wage::HourlyRates;
    use bytes::Bytes;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn germany() -> WageData {
        WageData {
            country: "Germany".to_string(),
            currency_symbol: "€".to_string(),
            currency_code: "EUR".to_string(),
            hourly_rates: HourlyRates {
                junior: 35.0,
                mid: 55.0,
                senior: 80.0,
                devops: 75.0,
            },
            source_summary: "Salary surveys".to_string(),
        }
    }

    fn model_reply(echoed_wage: serde_json::Value) -> String {
        json!({
            "projectName": "Logistics Portal",
            "summary": "Shipment tracking with a customer portal.",
            "totalCost": {"min": 800, "avg": 1000, "max": 1200},
            "timelineWeeks": {"min": 12, "max": 16},
            "componentCosts": {"backend": 400, "frontend": 300, "devops": 200, "qa": 100},
            "infrastructureCostMonthly": 350,
            "thirdPartyLicensesCost": 900,
            "assumptions": ["Two environments", "No native mobile app"],
            "wageDataUsed": echoed_wage
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_wage_data_used_is_the_input_not_the_echo() {
        let echo = json!({
            "country": "Atlantis", "currencySymbol": "A", "currencyCode": "ATL",
            "hourlyRates": {"junior": 1, "mid": 2, "senior": 3, "devops": 4},
            "sourceSummary": "hallucinated"
        });
        let model = ScriptedModel::replying(&model_reply(echo));
        let wage = germany();

        let result = generate_estimate(&model, &[], "Build a portal", &wage)
            .await
            .unwrap();

        assert_eq!(result.wage_data_used, wage);
    }

    #[tokio::test]
    async fn test_component_costs_round_trip_unchanged() {
        let model = ScriptedModel::replying(&model_reply(json!(null)));
        let result = generate_estimate(&model, &[], "Build a portal", &germany())
            .await
            .unwrap();

        assert_eq!(
            result.component_costs,
            ComponentCosts {
                backend: 400.0,
                frontend: 300.0,
                devops: 200.0,
                qa: 100.0
            }
        );
        assert_eq!(result.assumptions.len(), 2);
    }

    #[tokio::test]
    async fn test_request_carries_attachments_schema_and_thinking_budget() {
        let model = ScriptedModel::replying(&model_reply(json!(null)));
        let files = vec![
            UploadedFile::new("flow.png".into(), "image/png".into(), Bytes::from_static(b"png")),
            UploadedFile::new("brief.pdf".into(), "application/pdf".into(), Bytes::from_static(b"pdf")),
        ];
        generate_estimate(&model, &files, "", &germany()).await.unwrap();

        let request = &model.recorded()[0];
        assert_eq!(request.model, ESTIMATION_MODEL);
        let body = serde_json::to_value(request).unwrap();
        let parts = body["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[1]["inlineData"]["mimeType"], "application/pdf");
        assert!(parts[2]["text"].as_str().unwrap().contains("Junior 35, Mid 55"));
        assert_eq!(
            body["generationConfig"]["thinkingConfig"]["thinkingBudget"],
            THINKING_BUDGET
        );
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert!(body["systemInstruction"]["parts"][0]["text"]
            .as_str()
            .unwrap()
            .contains("Backend: 40%"));
    }

    #[test]
    fn test_requirements_are_embedded_literally() {
        let prompt = build_estimation_prompt("Needs {country} picker", &germany());
        assert!(prompt.contains("User Requirements Text: \"Needs {country} picker\""));
        assert!(prompt.contains("Target Country: Germany"));
        assert!(prompt.contains("Currency: EUR (€)"));
    }

    #[tokio::test]
    async fn test_transport_error_propagates() {
        let model = ScriptedModel::failing(503, "model overloaded");
        let err = generate_estimate(&model, &[], "x", &germany())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "API error (status 503): model overloaded");
        assert!(matches!(err, EstimationError::Llm(LlmError::Api { .. })));
    }

    #[tokio::test]
    async fn test_malformed_json_is_parse_error() {
        let model = ScriptedModel::replying("{\"projectName\": \"cut off");
        let err = generate_estimate(&model, &[], "x", &germany())
            .await
            .unwrap_err();
        assert!(matches!(err, EstimationError::Parse(_)));
    }

    #[tokio::test]
    async fn test_schema_violation_is_parse_error() {
        let model = ScriptedModel::replying(r#"{"projectName": "X", "totalCost": 5}"#);
        let err = generate_estimate(&model, &[], "x", &germany())
            .await
            .unwrap_err();
        assert!(matches!(err, EstimationError::Parse(_)));
    }

    #[tokio::test]
    async fn test_inverted_range_is_rejected() {
        let reply = model_reply(json!(null)).replace("\"max\":1200", "\"max\":10");
        let model = ScriptedModel::replying(&reply);
        let err = generate_estimate(&model, &[], "x", &germany())
            .await
            .unwrap_err();
        assert!(matches!(err, EstimationError::InconsistentEstimate(_)));
    }
}
