use serde::{Deserialize, Serialize};

use crate::models::wage::WageData;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostRange {
    pub min: f64,
    pub avg: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimelineWeeks {
    pub min: f64,
    pub max: f64,
}

/// Cost per delivery area. The model is told to split 40/30/20/10.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComponentCosts {
    pub backend: f64,
    pub frontend: f64,
    pub devops: f64,
    pub qa: f64,
}

impl ComponentCosts {
    pub fn total(&self) -> f64 {
        self.backend + self.frontend + self.devops + self.qa
    }
}

/// What the estimation model is asked to return: the result minus `wageDataUsed`.
/// Any `wageDataUsed` the model echoes is ignored during deserialization.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelEstimate {
    pub project_name: String,
    #[serde(default)]
    pub summary: String,
    pub total_cost: CostRange,
    pub timeline_weeks: TimelineWeeks,
    pub component_costs: ComponentCosts,
    pub infrastructure_cost_monthly: f64,
    pub third_party_licenses_cost: f64,
    pub assumptions: Vec<String>,
}

impl ModelEstimate {
    /// Attaches the wage data that was actually sent to the model.
    pub fn with_wage_data(self, wage_data_used: WageData) -> EstimationResult {
        EstimationResult {
            project_name: self.project_name,
            summary: self.summary,
            total_cost: self.total_cost,
            timeline_weeks: self.timeline_weeks,
            component_costs: self.component_costs,
            infrastructure_cost_monthly: self.infrastructure_cost_monthly,
            third_party_licenses_cost: self.third_party_licenses_cost,
            assumptions: self.assumptions,
            wage_data_used,
        }
    }
}

/// Structured cost/timeline output of one estimation run. Read-only once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimationResult {
    pub project_name: String,
    pub summary: String,
    pub total_cost: CostRange,
    pub timeline_weeks: TimelineWeeks,
    pub component_costs: ComponentCosts,
    pub infrastructure_cost_monthly: f64,
    pub third_party_licenses_cost: f64,
    pub assumptions: Vec<String>,
    pub wage_data_used: WageData,
}
