pub mod handlers;
pub(crate) mod util;

use crate::config::{CorsConfig, Settings};
use crate::error::{RelayError, Result as AppResult};
use crate::providers::OllamaForwarder;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, header};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub forwarder: OllamaForwarder,
}

pub fn create_app(config: Settings) -> AppResult<Router> {
    let forwarder = OllamaForwarder::new(&config.upstream)?;
    tracing::info!("Relaying /chat to {}", forwarder.chat_url());

    let cors = cors_layer(&config.cors)?;
    let app_state = AppState { forwarder };

    // Prompts are relayed whatever their size
    let app = handlers::routes()
        .with_state(Arc::new(app_state))
        .layer(DefaultBodyLimit::disable())
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    Ok(app)
}

/// 固定来源白名单；仅白名单内的 Origin 会被回显，并允许携带凭据
pub fn cors_layer(cfg: &CorsConfig) -> AppResult<CorsLayer> {
    let origins = cfg
        .allowed_origins
        .iter()
        .map(|o| {
            if o.trim() == "*" {
                return Err(RelayError::Config(
                    "wildcard CORS origin cannot be combined with credentials".into(),
                ));
            }
            HeaderValue::from_str(o.trim())
                .map_err(|_| RelayError::Config(format!("invalid CORS origin: {o}")))
        })
        .collect::<AppResult<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true))
}
