use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use haulboard_core::{MessageId, PostId, TaskId, UserId};
use haulboard_infra::notifications::Notification;
use haulboard_infra::tasks::{Task, TaskOutcome};
use haulboard_social::{Message, Page, Post, User};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct RegisterUserRequest {
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct PublishPostRequest {
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub body: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    pub page: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NotificationsQuery {
    pub since: Option<f64>,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct UserView {
    pub id: UserId,
    pub username: String,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PostView {
    pub id: PostId,
    pub author_id: UserId,
    pub author: Option<String>,
    pub body: String,
    pub timestamp: DateTime<Utc>,
}

impl PostView {
    pub fn new(post: Post, author: Option<String>) -> Self {
        Self {
            id: post.id,
            author_id: post.author_id,
            author,
            body: post.body,
            timestamp: post.timestamp,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageView {
    pub id: MessageId,
    pub sender_id: UserId,
    pub sender: Option<String>,
    pub body: String,
    pub timestamp: DateTime<Utc>,
}

impl MessageView {
    pub fn new(message: Message, sender: Option<String>) -> Self {
        Self {
            id: message.id,
            sender_id: message.sender_id,
            sender,
            body: message.body,
            timestamp: message.timestamp,
        }
    }
}

/// Wire shape of a notification.
#[derive(Debug, Serialize)]
pub struct NotificationView {
    pub name: String,
    pub payload: JsonValue,
    /// Same value as `payload`, for older polling clients.
    pub data: JsonValue,
    pub timestamp: f64,
}

impl From<Notification> for NotificationView {
    fn from(n: Notification) -> Self {
        Self {
            name: n.name,
            data: n.payload.clone(),
            payload: n.payload,
            timestamp: n.timestamp,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TaskView {
    pub id: TaskId,
    pub name: String,
    pub description: String,
    pub progress: f64,
    pub complete: bool,
    pub outcome: Option<TaskOutcome>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<Task> for TaskView {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            name: task.name,
            description: task.description,
            progress: task.progress,
            complete: task.complete,
            outcome: task.outcome,
            created_at: task.created_at,
            completed_at: task.completed_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PageView<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub has_next: bool,
    pub has_prev: bool,
    pub next_page: Option<usize>,
    pub prev_page: Option<usize>,
}

impl<T> From<Page<T>> for PageView<T> {
    fn from(page: Page<T>) -> Self {
        let next_page = page.next_num();
        let prev_page = page.prev_num();
        Self {
            items: page.items,
            page: page.page,
            has_next: page.has_next,
            has_prev: page.has_prev,
            next_page,
            prev_page,
        }
    }
}
