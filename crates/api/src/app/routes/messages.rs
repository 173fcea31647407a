use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::app::routes::find_user;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::UserContext;

pub async fn send_message(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(me): Extension<UserContext>,
    Path(recipient): Path<String>,
    Json(body): Json<dto::SendMessageRequest>,
) -> Response {
    let recipient = match find_user(&services, &recipient) {
        Ok(u) => u,
        Err(resp) => return resp,
    };

    match services.inbox.send_message(me.user_id(), recipient.id, &body.body) {
        Ok(message) => (
            StatusCode::CREATED,
            Json(dto::MessageView::new(message, Some(me.username().to_string()))),
        )
            .into_response(),
        Err(e) => errors::inbox_error_to_response(e),
    }
}

/// Read the inbox. Marks everything read.
pub async fn messages(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(me): Extension<UserContext>,
    Query(q): Query<dto::PageQuery>,
) -> Response {
    let request = match services.page_request(q.page) {
        Ok(r) => r,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let page = match services.inbox.read_messages(me.user_id(), request) {
        Ok(p) => p,
        Err(e) => return errors::inbox_error_to_response(e),
    };

    let mut senders = Vec::with_capacity(page.items.len());
    for message in &page.items {
        match services.username_of(message.sender_id) {
            Ok(name) => senders.push(name),
            Err(e) => return errors::store_error_to_response(e),
        }
    }
    let mut senders = senders.into_iter();
    let view: dto::PageView<dto::MessageView> = page
        .map(|m| dto::MessageView::new(m, senders.next().flatten()))
        .into();
    Json(view).into_response()
}
