use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use tracing::error;

use haulboard_core::UserId;
use haulboard_infra::social::UserStore;

use crate::app::services::AppServices;
use crate::context::UserContext;

/// Header carrying the caller's user id, set by the upstream session layer.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Resolve the caller from [`USER_ID_HEADER`]; unknown or malformed ids are 401.
pub async fn identity_middleware(
    State(services): State<Arc<AppServices>>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let user_id = extract_user_id(req.headers())?;

    let user = services
        .users
        .get(user_id)
        .map_err(|e| {
            error!(user_id = %user_id, error = %e, "user lookup failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .ok_or(StatusCode::UNAUTHORIZED)?;

    req.extensions_mut().insert(UserContext::new(user));

    Ok(next.run(req).await)
}

fn extract_user_id(headers: &HeaderMap) -> Result<UserId, StatusCode> {
    let header = headers
        .get(USER_ID_HEADER)
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let header = header.to_str().map_err(|_| StatusCode::UNAUTHORIZED)?;

    header.trim().parse().map_err(|_| StatusCode::UNAUTHORIZED)
}
