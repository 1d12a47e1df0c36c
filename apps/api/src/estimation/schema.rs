//! Response schema for the estimation call, in the Gemini OpenAPI subset.
//! Field names mirror `ModelEstimate`; `wageDataUsed` is attached locally instead.

use serde_json::{json, Value};

pub const REQUIRED_FIELDS: [&str; 7] = [
    "projectName",
    "totalCost",
    "timelineWeeks",
    "componentCosts",
    "infrastructureCostMonthly",
    "thirdPartyLicensesCost",
    "assumptions",
];

fn number_object(fields: &[&str]) -> Value {
    let properties: serde_json::Map<String, Value> = fields
        .iter()
        .map(|f| (f.to_string(), json!({ "type": "NUMBER" })))
        .collect();
    json!({
        "type": "OBJECT",
        "properties": properties,
        "required": fields,
    })
}

pub fn estimate_response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "projectName": { "type": "STRING" },
            "summary": { "type": "STRING" },
            "totalCost": number_object(&["min", "avg", "max"]),
            "timelineWeeks": number_object(&["min", "max"]),
            "componentCosts": number_object(&["backend", "frontend", "devops", "qa"]),
            "infrastructureCostMonthly": { "type": "NUMBER" },
            "thirdPartyLicensesCost": { "type": "NUMBER" },
            "assumptions": { "type": "ARRAY", "items": { "type": "STRING" } },
        },
        "required": REQUIRED_FIELDS,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_schema_requires_core_fields_but_not_wage_data() {
        let schema = estimate_response_schema();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        assert_eq!(required, REQUIRED_FIELDS.to_vec());
        assert!(schema["properties"].get("wageDataUsed").is_none());
    }

    #[test]
    fn test_nested_cost_objects_require_every_field() {
        let schema = estimate_response_schema();
        assert_eq!(
            schema["properties"]["totalCost"]["required"],
            json!(["min", "avg", "max"])
        );
        assert_eq!(
            schema["properties"]["componentCosts"]["properties"]["qa"]["type"],
            "NUMBER"
        );
        assert_eq!(schema["properties"]["assumptions"]["items"]["type"], "STRING");
    }
}
