pub mod client;
pub mod types;

pub use client::{OllamaForwarder, UpstreamResponse, MODEL_OVERRIDE, UPSTREAM_TIMEOUT};
pub use types::{ChatMessage, ChatPrompt};
