//! OpenAI-backed implementation of the scoring oracle.

use super::Scorer;
use crate::error::{KlippError, Result};
use crate::openai::create_client_with_timeout;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use std::time::Duration;

/// Scoring oracle backed by OpenAI chat completions.
pub struct OpenAiScorer {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
}

impl OpenAiScorer {
    /// Create a scorer for the given model with a per-call request timeout.
    ///
    /// Scoring calls are short; a tight timeout plus the callers' neutral
    /// fallbacks keeps one slow call from stalling the pipeline.
    pub fn new(model: &str, timeout: Duration) -> Self {
        Self {
            client: create_client_with_timeout(timeout),
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl Scorer for OpenAiScorer {
    async fn generate_text(&self, system: &str, user: &str) -> Result<String> {
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system)
                .build()
                .map_err(|e| KlippError::Scoring(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(user)
                .build()
                .map_err(|e| KlippError::Scoring(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(0.0)
            .build()
            .map_err(|e| KlippError::Scoring(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| KlippError::OpenAI(format!("Scoring request failed: {}", e)))?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .ok_or_else(|| KlippError::OpenAI("Empty response from oracle".to_string()))?;

        Ok(content.clone())
    }

    async fn score_relevance(&self, text: &str, subject: &str) -> Result<f64> {
        let system = "You rate text relevance. Respond with a single number from 0 to 100. \
                      No words, no explanation, just the number.";
        let user = format!("Subject: {}\n\nText: {}\n\nRelevance (0-100):", subject, text);

        let raw = self.generate_text(system, &user).await?;
        raw.trim()
            .parse::<f64>()
            .map(|score| score.clamp(0.0, 100.0))
            .map_err(|_| {
                KlippError::Scoring(format!(
                    "Non-numeric relevance response: {:?}",
                    raw.chars().take(80).collect::<String>()
                ))
            })
    }
}
