use axum::{
    Json, Router,
    response::{IntoResponse, Response},
    routing::{get, post},
};

use haulboard_infra::social::UserStore;
use haulboard_social::{Page, Post, User};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub mod feed;
pub mod messages;
pub mod notifications;
pub mod social;
pub mod system;
pub mod tasks;

/// Router for all endpoints that need a caller identity.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/", get(feed::timeline).post(feed::publish))
        .route("/index", get(feed::timeline).post(feed::publish))
        .route("/explore", get(feed::explore))
        .route("/user/:username", get(feed::user_page))
        .route("/search", get(feed::search))
        .route("/follow/:username", post(social::follow))
        .route("/unfollow/:username", post(social::unfollow))
        .route("/send_message/:recipient", post(messages::send_message))
        .route("/messages", get(messages::messages))
        .route("/notifications", get(notifications::notifications))
        .route("/export_posts", post(tasks::export_posts))
        .route("/tasks", get(tasks::list_tasks))
        .route("/tasks/:name", get(tasks::active_task))
}

/// Look up a user by name, or produce the 404 response.
pub(crate) fn find_user(services: &AppServices, username: &str) -> Result<User, Response> {
    match services.users.by_username(username) {
        Ok(Some(user)) => Ok(user),
        Ok(None) => Err(errors::user_not_found(username)),
        Err(e) => Err(errors::store_error_to_response(e)),
    }
}

/// Render a page of posts with author names resolved.
pub(crate) fn post_page(services: &AppServices, page: Page<Post>) -> Response {
    match post_page_view(services, page) {
        Ok(view) => Json(view).into_response(),
        Err(resp) => resp,
    }
}

pub(crate) fn post_page_view(
    services: &AppServices,
    page: Page<Post>,
) -> Result<dto::PageView<dto::PostView>, Response> {
    let mut authors = Vec::with_capacity(page.items.len());
    for post in &page.items {
        authors.push(
            services
                .username_of(post.author_id)
                .map_err(errors::store_error_to_response)?,
        );
    }
    let mut authors = authors.into_iter();
    Ok(page
        .map(|post| dto::PostView::new(post, authors.next().flatten()))
        .into())
}
