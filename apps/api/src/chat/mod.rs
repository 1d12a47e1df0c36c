// Follow-up chat: free-text questions about the estimate currently on screen.
// All model calls go through llm_client::GenerativeModel.

pub mod advisor;
pub mod handlers;
pub mod prompts;
pub mod transcript;
