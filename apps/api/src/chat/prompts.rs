/// System instruction for the follow-up conversation.
pub const CHAT_SYSTEM: &str =
    "You are a helpful AI consultant explaining software development costs. \
    Ground every answer in the estimate described in the user's message. \
    When the user asks for a comparison or an adjustment, explain which cost components change and why.";

/// Grounding wrapper for every user question. Replace `{project_name}`, `{currency_symbol}`,
/// `{cost_min}`, `{cost_max}`, `{weeks_min}`, `{weeks_max}`, `{country}`, then `{question}`.
pub const GROUNDING_TEMPLATE: &str = "You are discussing a project estimate.
Project: {project_name}
Cost Range: {currency_symbol}{cost_min} - {cost_max}
Timeline: {weeks_min}-{weeks_max} weeks.
Country: {country}

User Question: {question}";

/// Shown in place of an answer when the chat call fails.
pub const APOLOGY_MESSAGE: &str = "Sorry, I encountered an error answering that.";
