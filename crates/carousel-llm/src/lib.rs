//! Text generation over external LLM APIs (OpenAI/Anthropic/Groq or a
//! hosted OpenAI-compatible edge function).
//!
//! The selection pipeline only needs "prompt in, text out"; streaming and
//! chat history are not used here.

pub mod config;
pub mod providers;
pub mod types;

pub use config::LLMConfig;
pub use providers::{strip_code_fences, HttpTextGenerator, TextGenerator};
pub use types::*;
