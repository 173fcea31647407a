use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use haulboard_infra::notifications::NotificationStore;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::UserContext;

/// Everything newer than `since` (default 0), oldest first.
pub async fn notifications(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(me): Extension<UserContext>,
    Query(q): Query<dto::NotificationsQuery>,
) -> Response {
    let since = q.since.unwrap_or(0.0);
    if since.is_nan() {
        return errors::json_error(StatusCode::BAD_REQUEST, "invalid_since", "since must be a number");
    }

    match services.notifications.since(me.user_id(), since) {
        Ok(items) => {
            let views: Vec<dto::NotificationView> = items.into_iter().map(Into::into).collect();
            Json(views).into_response()
        }
        Err(e) => errors::notification_error_to_response(e),
    }
}
