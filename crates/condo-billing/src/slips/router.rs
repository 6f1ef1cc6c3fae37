use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;
use uuid::Uuid;

use super::domain::{GenerationContext, SlipId};
use super::lifecycle::SlipAction;
use super::repository::RepositoryError;
use super::service::{SlipGenerationService, SlipLifecycleService, SlipServiceError};

/// Shared handles for the slip endpoints.
#[derive(Clone)]
pub struct SlipApi {
    pub generation: Arc<SlipGenerationService>,
    pub lifecycle: Arc<SlipLifecycleService>,
}

/// Router builder exposing slip generation and lifecycle endpoints.
pub fn slip_router(api: SlipApi) -> Router {
    Router::new()
        .route("/api/v1/slips/generate", post(generate_handler))
        .route("/api/v1/slips/expire-overdue", post(expire_overdue_handler))
        .route("/api/v1/slips/:slip_id", get(slip_handler))
        .route("/api/v1/slips/:slip_id/send", post(send_handler))
        .route("/api/v1/slips/:slip_id/pay", post(pay_handler))
        .route("/api/v1/slips/:slip_id/expire", post(expire_handler))
        .route("/api/v1/slips/:slip_id/cancel", post(cancel_handler))
        .with_state(api)
}

pub(crate) async fn generate_handler(
    State(api): State<SlipApi>,
    axum::Json(command): axum::Json<GenerationContext>,
) -> Response {
    match api.generation.generate(&command) {
        Ok(summary) => (StatusCode::CREATED, axum::Json(summary)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn expire_overdue_handler(State(api): State<SlipApi>) -> Response {
    match api.lifecycle.expire_overdue() {
        Ok(expired) => (StatusCode::OK, axum::Json(json!({ "expired": expired }))).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn slip_handler(
    State(api): State<SlipApi>,
    Path(slip_id): Path<String>,
) -> Response {
    let Some(slip_id) = parse_slip_id(&slip_id) else {
        return invalid_slip_id(&slip_id);
    };

    match api.lifecycle.get(&slip_id) {
        Ok(slip) => (StatusCode::OK, axum::Json(slip)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn send_handler(state: State<SlipApi>, path: Path<String>) -> Response {
    transition(state, path, SlipAction::Send)
}

pub(crate) async fn pay_handler(state: State<SlipApi>, path: Path<String>) -> Response {
    transition(state, path, SlipAction::Pay)
}

pub(crate) async fn expire_handler(state: State<SlipApi>, path: Path<String>) -> Response {
    transition(state, path, SlipAction::Expire)
}

pub(crate) async fn cancel_handler(state: State<SlipApi>, path: Path<String>) -> Response {
    transition(state, path, SlipAction::Cancel)
}

fn transition(
    State(api): State<SlipApi>,
    Path(slip_id): Path<String>,
    action: SlipAction,
) -> Response {
    let Some(slip_id) = parse_slip_id(&slip_id) else {
        return invalid_slip_id(&slip_id);
    };

    match api.lifecycle.apply(&slip_id, action) {
        Ok(slip) => (StatusCode::OK, axum::Json(slip)).into_response(),
        Err(error) => error_response(error),
    }
}

fn parse_slip_id(raw: &str) -> Option<SlipId> {
    Uuid::parse_str(raw.trim()).ok().map(SlipId)
}

fn invalid_slip_id(raw: &str) -> Response {
    let payload = json!({
        "error": format!("'{raw}' is not a valid slip id"),
        "code": "invalid_slip_id",
    });
    (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
}

pub(crate) fn error_response(error: SlipServiceError) -> Response {
    let (status, code) = match &error {
        SlipServiceError::Period(_) => (StatusCode::BAD_REQUEST, "invalid_period"),
        SlipServiceError::Policy(rejection) => (StatusCode::UNPROCESSABLE_ENTITY, rejection.code()),
        SlipServiceError::Lifecycle(conflict) => (StatusCode::CONFLICT, conflict.code()),
        SlipServiceError::Repository(RepositoryError::NotFound) => {
            (StatusCode::NOT_FOUND, "slip_not_found")
        }
        SlipServiceError::Repository(RepositoryError::Conflict) => {
            (StatusCode::CONFLICT, "concurrent_update")
        }
        SlipServiceError::Repository(RepositoryError::Unavailable(_))
        | SlipServiceError::Publish(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
    };

    let payload = json!({
        "error": error.to_string(),
        "code": code,
    });
    (status, axum::Json(payload)).into_response()
}
