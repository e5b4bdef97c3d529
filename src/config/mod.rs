pub mod settings;

pub use settings::{CorsConfig, ServerConfig, Settings, UpstreamConfig};
