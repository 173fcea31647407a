use core::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use haulboard_core::{DomainError, DomainResult, PostId, UserId};

/// A published post. Read-only for everything downstream of publication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub author_id: UserId,
    pub body: String,
    pub timestamp: DateTime<Utc>,
}

impl Post {
    pub fn new(author_id: UserId, body: impl Into<String>, timestamp: DateTime<Utc>) -> DomainResult<Self> {
        Self::with_id(PostId::new(), author_id, body, timestamp)
    }

    pub fn with_id(
        id: PostId,
        author_id: UserId,
        body: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let body = body.into();
        if body.trim().is_empty() {
            return Err(DomainError::validation("post body must not be empty"));
        }
        Ok(Self {
            id,
            author_id,
            body,
            timestamp,
        })
    }
}

/// Feed total order: newest first, ties broken by the larger post id first.
///
/// Two posts compare equal only if they share an id, so any slice of a list
/// sorted with this order is stable across pages.
pub fn feed_order(a: &Post, b: &Post) -> Ordering {
    b.timestamp
        .cmp(&a.timestamp)
        .then_with(|| b.id.cmp(&a.id))
}

pub fn sort_for_feed(posts: &mut [Post]) {
    posts.sort_unstable_by(feed_order);
}
