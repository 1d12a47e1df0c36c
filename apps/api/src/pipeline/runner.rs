//! Drives one estimation run: market data, then the estimate.
//!
//! The session lock is only taken to apply a transition, never across a model call.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::info;

use crate::estimation::estimator::generate_estimate;
use crate::estimation::market_data::{fetch_market_data, MarketDataPolicy};
use crate::estimation::{EstimationError, Stage};
use crate::llm_client::GenerativeModel;
use crate::models::estimate::EstimationResult;
use crate::pipeline::state_machine::{EstimationSession, RunTicket};

pub type SharedSession = Arc<Mutex<EstimationSession>>;

#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    pub market_data_policy: MarketDataPolicy,
    pub market_data_timeout: Duration,
    pub estimation_timeout: Duration,
}

/// Runs both stages for `ticket` and records the outcome on the session.
/// Returns once the session has left the running states for this run.
pub async fn run_pipeline(
    session: SharedSession,
    model: Arc<dyn GenerativeModel>,
    options: PipelineOptions,
    ticket: RunTicket,
) {
    let outcome = tokio::select! {
        _ = ticket.cancel.cancelled() => Err(EstimationError::Cancelled),
        outcome = run_stages(&session, model.as_ref(), &options, &ticket) => outcome,
    };

    let mut session = session.lock().await;
    match outcome {
        Ok(result) => {
            session.estimate_resolved(ticket.epoch, result);
        }
        // cancel() already moved the session to Error.
        Err(EstimationError::Cancelled) => {
            info!("Session {} run {} stopped: cancelled", session.id(), ticket.epoch);
        }
        Err(e) => {
            session.estimate_failed(ticket.epoch, &e.to_string());
        }
    }
}

async fn run_stages(
    session: &SharedSession,
    model: &dyn GenerativeModel,
    options: &PipelineOptions,
    ticket: &RunTicket,
) -> Result<EstimationResult, EstimationError> {
    let wage = fetch_market_data(
        model,
        &ticket.country,
        options.market_data_policy,
        options.market_data_timeout,
    )
    .await?;

    if !session
        .lock()
        .await
        .market_resolved(ticket.epoch, wage.clone())
    {
        return Err(EstimationError::Cancelled);
    }

    let estimate = generate_estimate(model, &ticket.files, &ticket.requirements, &wage);
    match tokio::time::timeout(options.estimation_timeout, estimate).await {
        Ok(outcome) => outcome,
        Err(_) => Err(EstimationError::TimedOut {
            stage: Stage::Estimation,
            secs: options.estimation_timeout.as_secs(),
        }),
    }
}
