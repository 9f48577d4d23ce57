//! Wire format types for each provider protocol

pub mod anthropic;
pub mod division;
pub mod google;
pub mod ollama;
pub mod openai;
