use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use haulboard_infra::social::SocialGraph;

use crate::app::routes::{find_user, post_page, post_page_view};
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::UserContext;

/// The caller's timeline: own posts plus everyone they follow.
pub async fn timeline(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(me): Extension<UserContext>,
    Query(q): Query<dto::PageQuery>,
) -> Response {
    let request = match services.page_request(q.page) {
        Ok(r) => r,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.feed.timeline(me.user_id(), request) {
        Ok(page) => post_page(&services, page),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn publish(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(me): Extension<UserContext>,
    Json(body): Json<dto::PublishPostRequest>,
) -> Response {
    match services.publish_post(me.user_id(), &body.body) {
        Ok(post) => (
            StatusCode::CREATED,
            Json(dto::PostView::new(post, Some(me.username().to_string()))),
        )
            .into_response(),
        Err(e) => errors::publish_error_to_response(e),
    }
}

pub async fn explore(
    Extension(services): Extension<Arc<AppServices>>,
    Query(q): Query<dto::PageQuery>,
) -> Response {
    let request = match services.page_request(q.page) {
        Ok(r) => r,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.feed.explore(request) {
        Ok(page) => post_page(&services, page),
        Err(e) => errors::store_error_to_response(e),
    }
}

/// Profile page: the user, follow counts, whether the caller follows them,
/// and one page of their posts.
pub async fn user_page(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(me): Extension<UserContext>,
    Path(username): Path<String>,
    Query(q): Query<dto::PageQuery>,
) -> Response {
    let user = match find_user(&services, &username) {
        Ok(u) => u,
        Err(resp) => return resp,
    };
    let request = match services.page_request(q.page) {
        Ok(r) => r,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let graph = &services.graph;
    let (followers, following, is_following) = match (
        graph.followers_of(user.id),
        graph.followees_of(user.id),
        graph.is_following(me.user_id(), user.id),
    ) {
        (Ok(a), Ok(b), Ok(c)) => (a.len(), b.len(), c),
        (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => return errors::store_error_to_response(e),
    };

    let posts = match services.feed.user_posts(user.id, request) {
        Ok(page) => page,
        Err(e) => return errors::store_error_to_response(e),
    };
    let posts = match post_page_view(&services, posts) {
        Ok(view) => view,
        Err(resp) => return resp,
    };

    Json(json!({
        "user": dto::UserView::from(user),
        "followers": followers,
        "following": following,
        "is_following": is_following,
        "posts": posts,
    }))
    .into_response()
}

pub async fn search(
    Extension(services): Extension<Arc<AppServices>>,
    Query(q): Query<dto::SearchQuery>,
) -> Response {
    let request = match services.page_request(q.page) {
        Ok(r) => r,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.search.search(&q.q, request) {
        Ok(page) => post_page(&services, page),
        Err(e) => errors::store_error_to_response(e),
    }
}
