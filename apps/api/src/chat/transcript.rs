use std::fmt::Display;

use tracing::warn;

use crate::chat::prompts::APOLOGY_MESSAGE;
use crate::models::chat::ChatMessage;

/// Append-only record of one follow-up conversation.
#[derive(Debug, Clone, Default)]
pub struct ChatTranscript {
    messages: Vec<ChatMessage>,
}

impl ChatTranscript {
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Appends the user's question as soon as it is asked.
    pub fn push_question(&mut self, question: &str) {
        self.messages.push(ChatMessage::user(question));
    }

    /// Appends the answer, or the fixed apology if the call failed.
    /// Returns the model-role message that was appended.
    pub fn record_reply<E: Display>(&mut self, outcome: Result<String, E>) -> &ChatMessage {
        let reply = match outcome {
            Ok(answer) => ChatMessage::model(answer),
            Err(e) => {
                warn!("Follow-up chat failed, showing apology: {e}");
                ChatMessage::model(APOLOGY_MESSAGE)
            }
        };
        self.messages.push(reply);
        &self.messages[self.messages.len() - 1]
    }
}
