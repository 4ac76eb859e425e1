//! Concrete embedding providers.

pub mod openai;
pub mod trigram;
