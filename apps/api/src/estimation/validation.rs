//! Numeric sanity checks on a model estimate.
//!
//! Ordering and sign violations reject the estimate: a range with `min > max` cannot be
//! displayed truthfully. The 40/30/20/10 component split is an instruction to the model,
//! so a component total that drifts from `totalCost.avg` is only logged.

use tracing::warn;

use crate::estimation::EstimationError;
use crate::models::estimate::ModelEstimate;

/// Relative gap between component total and `totalCost.avg` tolerated without a warning.
pub const COMPONENT_DRIFT_TOLERANCE: f64 = 0.10;

/// Collects every violation rather than stopping at the first.
pub fn check_estimate(estimate: &ModelEstimate) -> Result<(), EstimationError> {
    let mut violations = Vec::new();

    let amounts = [
        ("totalCost.min", estimate.total_cost.min),
        ("totalCost.avg", estimate.total_cost.avg),
        ("totalCost.max", estimate.total_cost.max),
        ("timelineWeeks.min", estimate.timeline_weeks.min),
        ("timelineWeeks.max", estimate.timeline_weeks.max),
        ("componentCosts.backend", estimate.component_costs.backend),
        ("componentCosts.frontend", estimate.component_costs.frontend),
        ("componentCosts.devops", estimate.component_costs.devops),
        ("componentCosts.qa", estimate.component_costs.qa),
        ("infrastructureCostMonthly", estimate.infrastructure_cost_monthly),
        ("thirdPartyLicensesCost", estimate.third_party_licenses_cost),
    ];
    for (field, value) in amounts {
        if !value.is_finite() || value < 0.0 {
            violations.push(format!("{field} must be a non-negative number (got {value})"));
        }
    }

    let cost = estimate.total_cost;
    if cost.min > cost.avg || cost.avg > cost.max {
        violations.push(format!(
            "totalCost must satisfy min <= avg <= max (got {} / {} / {})",
            cost.min, cost.avg, cost.max
        ));
    }

    let weeks = estimate.timeline_weeks;
    if weeks.min > weeks.max {
        violations.push(format!(
            "timelineWeeks.min ({}) exceeds timelineWeeks.max ({})",
            weeks.min, weeks.max
        ));
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(EstimationError::InconsistentEstimate(violations))
    }
}

/// Relative drift of the component total from `totalCost.avg`, if `avg` is positive.
pub fn component_drift(estimate: &ModelEstimate) -> Option<f64> {
    let avg = estimate.total_cost.avg;
    (avg > 0.0).then(|| (estimate.component_costs.total() - avg).abs() / avg)
}

/// Logs when the component split does not add up to the average total.
pub fn warn_on_component_drift(estimate: &ModelEstimate) {
    if let Some(drift) = component_drift(estimate) {
        if drift > COMPONENT_DRIFT_TOLERANCE {
            warn!(
                "Component costs for '{}' sum to {} but totalCost.avg is {} ({:.0}% drift)",
                estimate.project_name,
                estimate.component_costs.total(),
                estimate.total_cost.avg,
                drift * 100.0
            );
        }
    }
}
