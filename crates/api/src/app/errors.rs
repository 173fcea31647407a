use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

use haulboard_core::DomainError;
use haulboard_infra::StoreError;
use haulboard_infra::inbox::InboxError;
use haulboard_infra::notifications::NotificationStoreError;
use haulboard_infra::tasks::TaskError;

use crate::app::services::PublishError;

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

fn internal(code: &'static str, err: impl std::fmt::Display) -> Response {
    error!(error = %err, code, "request failed");
    json_error(StatusCode::INTERNAL_SERVER_ERROR, code, err.to_string())
}

pub fn domain_error_to_response(err: DomainError) -> Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvariantViolation(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", msg)
        }
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
    }
}

pub fn store_error_to_response(err: StoreError) -> Response {
    match err {
        StoreError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        StoreError::Storage(_) => internal("store_error", err),
    }
}

pub fn notification_error_to_response(err: NotificationStoreError) -> Response {
    internal("notification_store_error", err)
}

pub fn task_error_to_response(err: TaskError) -> Response {
    match err {
        TaskError::AlreadyRunning { ref name, .. } => json_error(
            StatusCode::CONFLICT,
            "already_running",
            format!("a '{name}' task is currently in progress"),
        ),
        TaskError::UnknownJob(name) => {
            json_error(StatusCode::NOT_FOUND, "unknown_job", format!("no job named '{name}'"))
        }
        TaskError::NotFound(id) => json_error(StatusCode::NOT_FOUND, "not_found", format!("task {id} not found")),
        TaskError::Store(_) => internal("task_store_error", err),
        TaskError::Notification(e) => notification_error_to_response(e),
    }
}

pub fn inbox_error_to_response(err: InboxError) -> Response {
    match err {
        InboxError::Domain(e) => domain_error_to_response(e),
        InboxError::Store(e) => store_error_to_response(e),
        InboxError::Notification(e) => notification_error_to_response(e),
    }
}

pub fn publish_error_to_response(err: PublishError) -> Response {
    match err {
        PublishError::Domain(e) => domain_error_to_response(e),
        PublishError::Store(e) => store_error_to_response(e),
    }
}

pub fn user_not_found(username: &str) -> Response {
    json_error(StatusCode::NOT_FOUND, "user_not_found", format!("user '{username}' not found"))
}
