use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use haulboard_infra::social::SocialGraph;

use crate::app::errors;
use crate::app::routes::find_user;
use crate::app::services::AppServices;
use crate::context::UserContext;

pub async fn follow(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(me): Extension<UserContext>,
    Path(username): Path<String>,
) -> Response {
    let target = match find_user(&services, &username) {
        Ok(u) => u,
        Err(resp) => return resp,
    };
    if target.id == me.user_id() {
        return errors::json_error(StatusCode::BAD_REQUEST, "cannot_follow_self", "you cannot follow yourself");
    }

    match services.graph.follow(me.user_id(), target.id) {
        Ok(changed) => {
            tracing::info!(follower_id = %me.user_id(), followee_id = %target.id, changed, "follow");
            Json(json!({"username": target.username, "following": true, "changed": changed})).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn unfollow(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(me): Extension<UserContext>,
    Path(username): Path<String>,
) -> Response {
    let target = match find_user(&services, &username) {
        Ok(u) => u,
        Err(resp) => return resp,
    };
    if target.id == me.user_id() {
        return errors::json_error(StatusCode::BAD_REQUEST, "cannot_unfollow_self", "you cannot unfollow yourself");
    }

    match services.graph.unfollow(me.user_id(), target.id) {
        Ok(changed) => {
            tracing::info!(follower_id = %me.user_id(), followee_id = %target.id, changed, "unfollow");
            Json(json!({"username": target.username, "following": false, "changed": changed})).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}
