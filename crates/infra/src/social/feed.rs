//! Timeline composition.

use std::collections::HashSet;

use tracing::debug;

use haulboard_core::UserId;
use haulboard_social::{Page, PageRequest, Post};

use crate::error::StoreError;

use super::graph::SocialGraph;
use super::posts::{PostFilter, PostStore};

/// Builds paginated, reverse-chronological post listings.
///
/// Every listing uses the same total order (timestamp desc, then post id
/// desc), so pages are stable as long as no posts are inserted in between.
#[derive(Debug, Clone)]
pub struct FeedComposer<G, P> {
    graph: G,
    posts: P,
}

impl<G, P> FeedComposer<G, P>
where
    G: SocialGraph,
    P: PostStore,
{
    pub fn new(graph: G, posts: P) -> Self {
        Self { graph, posts }
    }

    /// Posts by `user` and everyone `user` follows.
    ///
    /// The user's own posts are always included, whether or not a self-edge
    /// exists in the graph. An unknown user simply gets an empty page.
    pub fn timeline(&self, user: UserId, request: PageRequest) -> Result<Page<Post>, StoreError> {
        let mut authors: HashSet<UserId> = self.graph.followees_of(user)?.into_iter().collect();
        authors.insert(user);
        debug!(user_id = %user, authors = authors.len(), page = request.page(), "composing timeline");
        self.window(PostFilter::Authors(&authors), request)
    }

    /// Every post.
    pub fn explore(&self, request: PageRequest) -> Result<Page<Post>, StoreError> {
        self.window(PostFilter::All, request)
    }

    /// One author's posts.
    pub fn user_posts(&self, author: UserId, request: PageRequest) -> Result<Page<Post>, StoreError> {
        let authors: HashSet<UserId> = [author].into_iter().collect();
        self.window(PostFilter::Authors(&authors), request)
    }

    fn window(&self, filter: PostFilter<'_>, request: PageRequest) -> Result<Page<Post>, StoreError> {
        let rows = self
            .posts
            .feed_window(filter, request.offset(), request.per_page().saturating_add(1))?;
        Ok(Page::from_lookahead(rows, request))
    }
}
