//! LLM provider factory.
//!
//! Resolves which generation provider to use from the environment and builds
//! the matching client. A missing credential is a configuration error raised
//! at construction time, never deferred to the first request.

use crate::client::LlmClient;
use crate::providers::{GeminiClient, OpenAiClient};
use crate::types::{LlmSelection, ProviderType, GEMINI_API_KEY_ENV, OPENAI_API_KEY_ENV};
use ragchat_core::{AppError, AppResult};
use std::sync::Arc;

const MISSING_CREDENTIALS: &str =
    "Invalid LLM configuration. Please set OPENAI_API_KEY or GEMINI_API_KEY.";

/// Pick a provider from a variable lookup.
///
/// Gemini wins when both keys are present. Empty values count as unset.
pub fn select_provider<F>(lookup: F) -> AppResult<LlmSelection>
where
    F: Fn(&str) -> Option<String>,
{
    let present = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(key) = present(GEMINI_API_KEY_ENV) {
        tracing::info!("Using Gemini model.");
        return Ok(LlmSelection::new(ProviderType::Gemini, key));
    }

    if let Some(key) = present(OPENAI_API_KEY_ENV) {
        tracing::info!("Using OpenAI model.");
        return Ok(LlmSelection::new(ProviderType::OpenAI, key));
    }

    Err(AppError::Config(MISSING_CREDENTIALS.to_string()))
}

/// Build a client for an explicit selection.
///
/// # Arguments
/// * `selection` - Provider, model, credential and temperature
/// * `endpoint` - Optional base URL override (OpenAI-compatible gateways, tests)
pub fn create_client(
    selection: &LlmSelection,
    endpoint: Option<&str>,
) -> AppResult<Arc<dyn LlmClient>> {
    match selection.provider {
        ProviderType::OpenAI => {
            let mut client = OpenAiClient::new(&selection.api_key, &selection.model)?;
            if let Some(endpoint) = endpoint {
                client = client.with_base_url(endpoint);
            }
            if let Some(temperature) = selection.temperature {
                client = client.with_temperature(temperature);
            }
            Ok(Arc::new(client))
        }
        ProviderType::Gemini => {
            let mut client = GeminiClient::new(&selection.api_key, &selection.model)?;
            if let Some(endpoint) = endpoint {
                client = client.with_base_url(endpoint);
            }
            if let Some(temperature) = selection.temperature {
                client = client.with_temperature(temperature);
            }
            Ok(Arc::new(client))
        }
    }
}

/// Build the generation client from `GEMINI_API_KEY` / `OPENAI_API_KEY`.
pub fn client_from_env() -> AppResult<Arc<dyn LlmClient>> {
    tracing::info!("Loading LLM...");
    let selection = select_provider(|name| std::env::var(name).ok())?;
    create_client(&selection, None)
}
