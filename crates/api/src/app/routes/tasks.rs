use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use haulboard_infra::tasks::EXPORT_POSTS;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::UserContext;

/// Start exporting the caller's posts. 409 while an export is in progress.
pub async fn export_posts(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(me): Extension<UserContext>,
) -> Response {
    match services
        .tasks
        .launch_registered(&services.catalog, me.user_id(), EXPORT_POSTS)
    {
        Ok(handle) => (StatusCode::ACCEPTED, Json(dto::TaskView::from(handle.task().clone()))).into_response(),
        Err(e) => errors::task_error_to_response(e),
    }
}

/// The caller's active task with this name.
pub async fn active_task(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(me): Extension<UserContext>,
    Path(name): Path<String>,
) -> Response {
    match services.tasks.get_active_task(me.user_id(), &name) {
        Ok(Some(task)) => Json(dto::TaskView::from(task)).into_response(),
        Ok(None) => errors::json_error(
            StatusCode::NOT_FOUND,
            "not_found",
            format!("no '{name}' task in progress"),
        ),
        Err(e) => errors::task_error_to_response(e),
    }
}

/// Every task the caller launched, oldest first.
pub async fn list_tasks(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(me): Extension<UserContext>,
) -> Response {
    match services.tasks.tasks_for(me.user_id()) {
        Ok(tasks) => {
            let views: Vec<dto::TaskView> = tasks.into_iter().map(Into::into).collect();
            Json(views).into_response()
        }
        Err(e) => errors::task_error_to_response(e),
    }
}
