use std::sync::Arc;

use axum::{
    Json,
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use haulboard_infra::social::UserStore;
use haulboard_social::User;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::UserContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(Extension(user): Extension<UserContext>) -> impl IntoResponse {
    Json(dto::UserView::from(user.user().clone()))
}

/// Register a username. Stands in for the external registration flow.
pub async fn register_user(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::RegisterUserRequest>,
) -> Response {
    let user = match User::new(body.username) {
        Ok(u) => u,
        Err(e) => return errors::domain_error_to_response(e),
    };

    if let Err(e) = services.users.insert(user.clone()) {
        return errors::store_error_to_response(e);
    }

    tracing::info!(user_id = %user.id, username = %user.username, "user registered");
    (StatusCode::CREATED, Json(dto::UserView::from(user))).into_response()
}
