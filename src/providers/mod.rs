pub mod ollama;
pub mod streaming;

pub use ollama::OllamaForwarder;
