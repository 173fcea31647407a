//! The `export_posts` job.

use async_trait::async_trait;
use serde_json::{Value as JsonValue, json};
use tracing::info;

use crate::social::PostStore;

use super::job::{TaskContext, TaskJob};
use super::types::JobFailure;

pub const EXPORT_POSTS: &str = "export_posts";

/// Collects every post of the task owner, oldest first, reporting progress
/// after each one.
///
/// Result: `{post_count, posts: [{body, timestamp}]}`.
#[derive(Debug, Clone)]
pub struct ExportPostsJob<P> {
    posts: P,
}

impl<P> ExportPostsJob<P> {
    pub fn new(posts: P) -> Self {
        Self { posts }
    }
}

#[async_trait]
impl<P> TaskJob for ExportPostsJob<P>
where
    P: PostStore + 'static,
{
    async fn run(&self, ctx: TaskContext) -> Result<JsonValue, JobFailure> {
        let mut posts = self
            .posts
            .by_author(ctx.owner_id())
            .map_err(|e| JobFailure::error(e.to_string()))?;
        posts.reverse();

        let total = posts.len();
        let mut exported = Vec::with_capacity(total);
        for (i, post) in posts.into_iter().enumerate() {
            exported.push(json!({
                "body": post.body,
                "timestamp": post.timestamp.to_rfc3339(),
            }));
            ctx.report_progress((i + 1) as f64 / total as f64);
            tokio::task::yield_now().await;
        }

        info!(task_id = %ctx.task_id(), owner_id = %ctx.owner_id(), post_count = total, "posts exported");
        Ok(json!({
            "post_count": total,
            "posts": exported,
        }))
    }
}
