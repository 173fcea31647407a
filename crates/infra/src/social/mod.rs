//! Social stores and read paths: users, follow graph, posts, feeds, search.

pub mod feed;
pub mod graph;
pub mod posts;
pub mod search;
pub mod users;

pub use feed::FeedComposer;
pub use graph::{InMemorySocialGraph, SocialGraph};
pub use posts::{InMemoryPostStore, PostFilter, PostStore};
pub use search::{InMemorySearchIndex, PostSearch, SearchIndex};
pub use users::{InMemoryUserStore, UserStore};
