//! Service wiring: every store and service the handlers use.

use std::sync::Arc;

use haulboard_core::{DomainResult, SharedClock, UserId};
use haulboard_infra::inbox::{InMemoryMessageStore, Inbox};
use haulboard_infra::notifications::InMemoryNotificationStore;
use haulboard_infra::social::{
    FeedComposer, InMemoryPostStore, InMemorySearchIndex, InMemorySocialGraph, InMemoryUserStore, PostSearch,
    PostStore, UserStore,
};
use haulboard_infra::tasks::{
    EXPORT_POSTS, ExportPostsJob, InMemoryTaskStore, TaskCatalog, TaskRegistry, TaskRunner, TaskRunnerConfig,
};
use haulboard_infra::StoreError;
use haulboard_social::{PageRequest, Post};

use crate::config::AppConfig;

pub type Registry = TaskRegistry<Arc<InMemoryTaskStore>, Arc<InMemoryNotificationStore>>;
pub type Feed = FeedComposer<Arc<InMemorySocialGraph>, Arc<InMemoryPostStore>>;
pub type Search = PostSearch<Arc<InMemorySearchIndex>, Arc<InMemoryPostStore>>;
pub type Messages = Inbox<Arc<InMemoryMessageStore>, Arc<InMemoryNotificationStore>>;

pub struct AppServices {
    pub config: AppConfig,
    pub clock: SharedClock,
    pub users: Arc<InMemoryUserStore>,
    pub graph: Arc<InMemorySocialGraph>,
    pub posts: Arc<InMemoryPostStore>,
    pub feed: Feed,
    pub search: Search,
    pub notifications: Arc<InMemoryNotificationStore>,
    pub tasks: Arc<Registry>,
    pub catalog: TaskCatalog,
    pub inbox: Messages,
}

impl AppServices {
    /// In-memory wiring (dev/test) with the default job catalog.
    pub fn in_memory(config: AppConfig, clock: SharedClock) -> Self {
        let users = Arc::new(InMemoryUserStore::new());
        let graph = Arc::new(InMemorySocialGraph::new());
        let posts = Arc::new(InMemoryPostStore::new());
        let index = Arc::new(InMemorySearchIndex::new());
        let notifications = Arc::new(InMemoryNotificationStore::new(clock.clone()));

        let runner = TaskRunner::new(
            TaskRunnerConfig::default()
                .with_timeout(config.task_timeout)
                .with_name("api-task-runner"),
        );
        let tasks = Arc::new(TaskRegistry::new(
            InMemoryTaskStore::arc(),
            notifications.clone(),
            runner,
            clock.clone(),
        ));

        let catalog = TaskCatalog::builder()
            .register(
                EXPORT_POSTS,
                "Exporting posts...",
                Arc::new(ExportPostsJob::new(posts.clone())),
            )
            .build();

        Self {
            feed: FeedComposer::new(graph.clone(), posts.clone()),
            search: PostSearch::new(index, posts.clone()),
            inbox: Inbox::new(Arc::new(InMemoryMessageStore::new()), notifications.clone(), clock.clone()),
            config,
            clock,
            users,
            graph,
            posts,
            notifications,
            tasks,
            catalog,
        }
    }

    /// Replace the job catalog (tests register slow or failing jobs).
    pub fn with_catalog(mut self, catalog: TaskCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Page request with the configured page size.
    pub fn page_request(&self, page: Option<i64>) -> DomainResult<PageRequest> {
        PageRequest::new(page.unwrap_or(1), self.config.posts_per_page)
    }

    /// Validate, store and index a new post.
    pub fn publish_post(&self, author: UserId, body: &str) -> Result<Post, PublishError> {
        let post = Post::new(author, body.trim(), self.clock.now())?;
        self.posts.insert(post.clone())?;
        self.search.index(&post)?;
        tracing::info!(post_id = %post.id, author_id = %author, "post published");
        Ok(post)
    }

    /// Username for display; `None` if the user is gone.
    pub fn username_of(&self, user_id: UserId) -> Result<Option<String>, StoreError> {
        Ok(self.users.get(user_id)?.map(|u| u.username))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error(transparent)]
    Domain(#[from] haulboard_core::DomainError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
