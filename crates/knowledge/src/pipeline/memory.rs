//! Conversation history for follow-up questions.

use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub question: String,
    pub answer: String,
}

/// Question/answer turns shared by every chain of one pipeline.
#[derive(Debug, Default)]
pub struct ConversationMemory {
    turns: Mutex<Vec<Turn>>,
}

impl ConversationMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record(&self, question: impl Into<String>, answer: impl Into<String>) {
        self.turns.lock().await.push(Turn {
            question: question.into(),
            answer: answer.into(),
        });
    }

    /// History as `Human:`/`Assistant:` lines; empty when nothing was said.
    pub async fn render(&self) -> String {
        self.turns
            .lock()
            .await
            .iter()
            .map(|t| format!("Human: {}\nAssistant: {}", t.question, t.answer))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub async fn turns(&self) -> Vec<Turn> {
        self.turns.lock().await.clone()
    }

    pub async fn clear(&self) {
        self.turns.lock().await.clear();
    }
}
