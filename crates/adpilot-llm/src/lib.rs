//! Adpilot LLM - LLM Provider Abstraction
//!
//! This crate provides the generation capability used by adpilot:
//! - Provider: the `LlmProvider` trait every backend implements
//! - OpenAI: OpenAI-compatible chat completions over HTTP
//! - Mock: a scriptable provider for tests and offline runs

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod completion;
pub mod error;
pub mod message;
pub mod mock;
pub mod openai;
pub mod provider;
pub mod util;

pub use completion::{CompletionRequest, CompletionResponse, TokenUsage};
pub use error::{Error, Result};
pub use message::{Message, MessageRole};
pub use mock::MockProvider;
pub use openai::{OpenAiConfig, OpenAiProvider};
pub use provider::LlmProvider;
