//! Follow-up advisor: answers questions about one `EstimationResult`.
//!
//! Every call restates the estimate in a grounding message and replays the visible
//! transcript, so no server-side model session needs to outlive the request.

use crate::chat::prompts::{CHAT_SYSTEM, GROUNDING_TEMPLATE};
use crate::llm_client::{Content, GenerateRequest, GenerativeModel, LlmError, Role, CHAT_MODEL};
use crate::models::chat::{ChatMessage, ChatRole};
use crate::models::estimate::EstimationResult;

pub fn build_grounding_message(context: &EstimationResult, question: &str) -> String {
    let wage = &context.wage_data_used;
    GROUNDING_TEMPLATE
        .replace("{project_name}", &context.project_name)
        .replace("{currency_symbol}", &wage.currency_symbol)
        .replace("{cost_min}", &context.total_cost.min.to_string())
        .replace("{cost_max}", &context.total_cost.max.to_string())
        .replace("{weeks_min}", &context.timeline_weeks.min.to_string())
        .replace("{weeks_max}", &context.timeline_weeks.max.to_string())
        .replace("{country}", &wage.country)
        .replace("{question}", question)
}

fn to_content(message: &ChatMessage) -> Content {
    let role = match message.role {
        ChatRole::User => Role::User,
        ChatRole::Model => Role::Model,
    };
    Content::turn(role, message.text.clone())
}

/// Sends `message` with `history` as prior turns and returns the model's plain-text answer.
pub async fn send_follow_up(
    model: &dyn GenerativeModel,
    history: &[ChatMessage],
    message: &str,
    context: &EstimationResult,
) -> Result<String, LlmError> {
    let request = GenerateRequest::conversation(
        CHAT_MODEL,
        CHAT_SYSTEM,
        history.iter().map(to_content).collect(),
        &build_grounding_message(context, message),
    );
    model.generate(&request).await
}
