//! Prompt templates for ragchat.
//!
//! Answer strategies ("zero_shot", "cot", "react", ...) are plain templates
//! keyed by name, loaded from a YAML/JSON file or taken from the builtin set,
//! and rendered with Handlebars.

pub mod builder;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::{build_prompt, render_template};
pub use loader::PromptStore;
pub use types::{
    PromptVars, CONDENSE_PROMPT, DEFAULT_INSTRUCTION, DEFAULT_ROLE, REWRITE_PROMPT,
};
