//! HTTP surface for the chat frontend.
//!
//! This is an opinionated concrete implementation on top of `axum`. In contrast to the other
//! services, it does not expose a generic trait interface: it only translates JSON requests into
//! calls on the [`crate::interaction`] flows and their results into JSON responses.
//!
//! Every handler isolates its own errors; a failure becomes a `500` with an `{ "error": ... }`
//! body and never takes the process down. Unreadable request bodies get the same payload with
//! a `400` or `422` status.

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::{HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use serde::Serialize;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, instrument, warn};

use crate::{
    base::types::{ChatRequest, ErrorResponse, FormSubmissionRequest, RelevanceRequest, RelevanceResponse, Res, Void},
    interaction,
    runtime::Runtime,
};

/// Build the application router.
pub fn router(runtime: Runtime) -> Res<Router> {
    let cors = build_cors_layer(&runtime.config.cors_allowed_origins)?;

    let router = Router::new()
        .route("/api/check_relevance", post(handle_check_relevance))
        .route("/api/chat", post(handle_chat))
        .route("/api/submit_form", post(handle_submit_form))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(runtime);

    Ok(router)
}

/// Bind the configured address and serve until Ctrl-C.
pub async fn serve(runtime: Runtime) -> Void {
    let listener = tokio::net::TcpListener::bind(&runtime.config.bind_address).await?;

    info!("Listening on http://{} ...", listener.local_addr()?);

    axum::serve(listener, router(runtime)?).with_graceful_shutdown(shutdown_signal()).await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {err}");
        std::future::pending::<()>().await;
    }

    info!("Shutting down ...");
}

/// Allow any origin unless specific origins are configured.
fn build_cors_layer(origins: &[String]) -> Res<CorsLayer> {
    let cors = CorsLayer::new().allow_methods([Method::POST, Method::OPTIONS]).allow_headers(Any);

    if origins.is_empty() || origins.iter().any(|origin| origin.trim() == "*") {
        return Ok(cors.allow_origin(Any));
    }

    let origins = origins.iter().map(|origin| HeaderValue::from_str(origin.trim())).collect::<Result<Vec<_>, _>>()?;

    Ok(cors.allow_origin(AllowOrigin::list(origins)))
}

// Handlers.

#[instrument(skip_all)]
async fn handle_check_relevance(State(runtime): State<Runtime>, payload: Result<Json<RelevanceRequest>, JsonRejection>) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return reject(rejection),
    };

    let result = interaction::relevance::check_relevance(&request.message, &runtime.store, &runtime.llm)
        .await
        .map(|relevant_file| RelevanceResponse { relevant_file });

    respond(result)
}

#[instrument(skip_all)]
async fn handle_chat(State(runtime): State<Runtime>, payload: Result<Json<ChatRequest>, JsonRejection>) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return reject(rejection),
    };

    respond(interaction::chat::handle_chat(request, &runtime.store, &runtime.llm).await)
}

#[instrument(skip_all)]
async fn handle_submit_form(State(runtime): State<Runtime>, payload: Result<Json<FormSubmissionRequest>, JsonRejection>) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return reject(rejection),
    };

    respond(interaction::form::handle_form_submission(request, &runtime.store).await)
}

/// Serialize a handler result, mapping errors to a `500` error payload.
fn respond<T: Serialize>(result: Res<T>) -> Response {
    match result {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(err) => {
            error!("Error while handling: {err}");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorResponse { error: err.to_string() })).into_response()
        }
    }
}

/// Report an unreadable request body as an error payload, keeping the rejection's status.
fn reject(rejection: JsonRejection) -> Response {
    let error = rejection.body_text();
    warn!("Rejected request body: {error}");

    (rejection.status(), Json(ErrorResponse { error })).into_response()
}

// Tests.

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cors_layer_accepts_configured_origins() {
        let origins = vec!["http://localhost:3000".to_string(), " http://127.0.0.1:3000 ".to_string()];

        assert!(build_cors_layer(&origins).is_ok());
    }

    #[test]
    fn test_cors_layer_rejects_invalid_origins() {
        let origins = vec!["http://bad\norigin".to_string()];

        assert!(build_cors_layer(&origins).is_err());
    }
}
