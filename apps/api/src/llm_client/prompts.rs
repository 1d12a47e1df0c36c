// Shared prompt fragments.
// Each service that needs model calls defines its own prompts.rs alongside it.
// This file contains cross-cutting fragments only.

/// Appended to prompts whose call cannot carry a response schema (search-grounded calls).
pub const JSON_ONLY_INSTRUCTION: &str = "\
    IMPORTANT: Provide the output strictly as a valid JSON object. \
    Do not include markdown formatting or conversational text outside the JSON.";

/// Shared by every prompt that quotes monetary figures.
pub const LOCAL_CURRENCY_INSTRUCTION: &str = "\
    All monetary values must be plain numbers in the local currency given in the context. \
    Do not include currency symbols, thousands separators, or ranges inside numeric fields.";
