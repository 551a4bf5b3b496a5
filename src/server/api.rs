use crate::agent::ConsultAgent;
use crate::cli::Args;
use crate::error::AgentError;
use crate::models::chat::{ ConsultRequest, ConsultResponse };
use crate::server::stream::chunked_body;
use std::sync::Arc;
use std::time::Duration;
use axum::{
    routing::{ get, post },
    Router,
    extract::State,
    response::{ IntoResponse, Response },
    http::{ header, StatusCode },
    Json,
};
use serde::Serialize;
use tower_http::cors::{ Any, CorsLayer };
use log::{ info, error };

#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<ConsultAgent>,
    pub args: Args,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    provider: String,
    model: String,
}

#[derive(Serialize)]
struct ReloadResponse {
    success: bool,
    message: String,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/consult", post(consult_handler))
        .route("/api/consult/stream", post(consult_stream_handler))
        .route("/api/health", get(health_handler))
        .route("/api/reload-prompts", get(reload_prompts_handler))
        .layer(cors)
        .with_state(state)
}

fn validate(req: &ConsultRequest) -> Result<(), AgentError> {
    if req.messages.is_empty() {
        return Err(AgentError::Validation(
            "messages array is required and must not be empty".to_string()
        ));
    }
    Ok(())
}

async fn consult_handler(
    State(state): State<AppState>,
    Json(req): Json<ConsultRequest>
) -> Response {
    if let Err(err) = validate(&req) {
        return err.into_response();
    }
    info!("Processing consult request with {} messages", req.messages.len());

    match state.agent.respond(&req.messages).await {
        Ok(text) => (StatusCode::OK, Json(ConsultResponse { response: text })).into_response(),
        Err(err) => {
            error!("Consult request failed: {}", err);
            err.into_response()
        }
    }
}

async fn consult_stream_handler(
    State(state): State<AppState>,
    Json(req): Json<ConsultRequest>
) -> Response {
    if let Err(err) = validate(&req) {
        return err.into_response();
    }
    info!("Processing streaming consult request with {} messages", req.messages.len());

    // The provider is not streamed from: the complete reply is fetched
    // first, then re-chunked on word boundaries. Failures here still have a
    // JSON error channel; once the body below starts, they do not.
    let full_text = match state.agent.respond(&req.messages).await {
        Ok(text) => text,
        Err(err) => {
            error!("Streaming consult request failed: {}", err);
            return err.into_response();
        }
    };

    let delay = Duration::from_millis(state.args.stream_chunk_delay_ms);
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::CACHE_CONTROL, "no-store"),
        ],
        chunked_body(full_text, delay),
    ).into_response()
}

async fn health_handler(State(state): State<AppState>) -> Response {
    Json(HealthResponse {
        status: "ok",
        provider: state.args.chat_llm_type.clone(),
        model: state.agent.model(),
    }).into_response()
}

async fn reload_prompts_handler(State(state): State<AppState>) -> Response {
    match state.agent.reload_prompts_if_changed(&state.args).await {
        Ok(true) => Json(ReloadResponse {
            success: true,
            message: "Prompts reloaded".to_string(),
        }).into_response(),
        Ok(false) => Json(ReloadResponse {
            success: true,
            message: "Prompts unchanged".to_string(),
        }).into_response(),
        Err(err) => {
            error!("Prompt reload failed: {}", err);
            err.into_response()
        }
    }
}
