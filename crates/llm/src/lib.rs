//! Generation provider crate for ragchat.
//!
//! A provider-agnostic [`LlmClient`] trait with OpenAI and Gemini
//! implementations. [`client_from_env`] picks the provider from the
//! credentials present in the environment.
//!
//! # Example
//! ```no_run
//! use ragchat_llm::{client_from_env, LlmRequest};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = client_from_env()?;
//! let response = client.complete(&LlmRequest::new("Hello, world!")).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::{client_from_env, create_client, select_provider};
pub use providers::{GeminiClient, OpenAiClient};
pub use types::{LlmSelection, ProviderType};
