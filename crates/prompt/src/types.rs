//! Prompt types for ragchat.

use serde::Serialize;

/// Role substituted into `{{role}}` when none is given.
pub const DEFAULT_ROLE: &str = "AI Assistant";

/// Template used to rewrite a question before retrieval.
pub const REWRITE_PROMPT: &str = "rewrite";

/// Template used to turn a follow-up into a standalone question.
pub const CONDENSE_PROMPT: &str = "condense";

/// Instruction appended to answer prompts unless the user picks another.
pub const DEFAULT_INSTRUCTION: &str =
    "Answer only with the content of the documents - otherwise say 'Answer not included in the documents'";

/// Variables available to every template.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PromptVars {
    pub role: String,
    pub context: String,
    pub question: String,
    pub chat_history: String,
}

impl PromptVars {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            role: DEFAULT_ROLE.to_string(),
            question: question.into(),
            ..Default::default()
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    pub fn with_chat_history(mut self, chat_history: impl Into<String>) -> Self {
        self.chat_history = chat_history.into();
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = role.into();
        self
    }
}
