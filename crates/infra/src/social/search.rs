//! Post search collaborator.
//!
//! Ranking is out of scope: matches are returned in feed order.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use haulboard_core::PostId;
use haulboard_social::{Page, PageRequest, Post};

use crate::error::StoreError;

use super::posts::{FeedKey, PostStore};

/// External search index.
pub trait SearchIndex: Send + Sync {
    fn index(&self, post: &Post) -> Result<(), StoreError>;

    /// One page of matching ids plus the total number of matches.
    fn search(&self, query: &str, request: PageRequest) -> Result<(Vec<PostId>, usize), StoreError>;
}

impl<S> SearchIndex for Arc<S>
where
    S: SearchIndex + ?Sized,
{
    fn index(&self, post: &Post) -> Result<(), StoreError> {
        (**self).index(post)
    }

    fn search(&self, query: &str, request: PageRequest) -> Result<(Vec<PostId>, usize), StoreError> {
        (**self).search(query, request)
    }
}

/// Case-insensitive, all-terms substring matcher.
#[derive(Debug, Default)]
pub struct InMemorySearchIndex {
    docs: RwLock<BTreeMap<FeedKey, (PostId, String)>>,
}

impl InMemorySearchIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SearchIndex for InMemorySearchIndex {
    fn index(&self, post: &Post) -> Result<(), StoreError> {
        let mut docs = self.docs.write().map_err(|_| StoreError::poisoned())?;
        docs.insert(FeedKey::of(post), (post.id, post.body.to_lowercase()));
        Ok(())
    }

    fn search(&self, query: &str, request: PageRequest) -> Result<(Vec<PostId>, usize), StoreError> {
        let terms: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
        if terms.is_empty() {
            return Ok((Vec::new(), 0));
        }

        let docs = self.docs.read().map_err(|_| StoreError::poisoned())?;
        let hits: Vec<PostId> = docs
            .values()
            .filter(|(_, body)| terms.iter().all(|t| body.contains(t.as_str())))
            .map(|(id, _)| *id)
            .collect();
        let total = hits.len();
        let page = hits
            .into_iter()
            .skip(request.offset())
            .take(request.per_page())
            .collect();
        Ok((page, total))
    }
}

/// Resolves search hits back to posts.
#[derive(Debug, Clone)]
pub struct PostSearch<I, P> {
    index: I,
    posts: P,
}

impl<I, P> PostSearch<I, P>
where
    I: SearchIndex,
    P: PostStore,
{
    pub fn new(index: I, posts: P) -> Self {
        Self { index, posts }
    }

    /// Make a freshly stored post searchable.
    pub fn index(&self, post: &Post) -> Result<(), StoreError> {
        self.index.index(post)
    }

    /// `has_next` follows the reported total (`total > page * per_page`),
    /// even if some hits no longer resolve to a stored post.
    pub fn search(&self, query: &str, request: PageRequest) -> Result<Page<Post>, StoreError> {
        let (ids, total) = self.index.search(query, request)?;
        let mut items = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(post) = self.posts.get(id)? {
                items.push(post);
            }
        }
        Ok(Page::from_total(items, request, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::social::posts::InMemoryPostStore;
    use chrono::{TimeZone, Utc};
    use haulboard_core::UserId;

    fn fixture(bodies: &[&str]) -> (PostSearch<InMemorySearchIndex, Arc<InMemoryPostStore>>, Vec<Post>) {
        let posts = Arc::new(InMemoryPostStore::new());
        let search = PostSearch::new(InMemorySearchIndex::new(), posts.clone());
        let author = UserId::new();
        let stored = bodies
            .iter()
            .enumerate()
            .map(|(i, body)| {
                let ts = Utc.timestamp_opt(1_700_000_000 + i as i64, 0).unwrap();
                let post = Post::new(author, *body, ts).unwrap();
                posts.insert(post.clone()).unwrap();
                search.index(&post).unwrap();
                post
            })
            .collect();
        (search, stored)
    }

    #[test]
    fn matches_all_terms_case_insensitively_newest_first() {
        let (search, posts) = fixture(&["Reefer load to Tulsa", "dry van", "reefer LOAD from Reno"]);

        let page = search.search("load reefer", PageRequest::first(10).unwrap()).unwrap();
        assert_eq!(page.items, vec![posts[2].clone(), posts[0].clone()]);
        assert!(!page.has_next);
    }

    #[test]
    fn pagination_uses_total() {
        let (search, posts) = fixture(&["load a", "load b", "load c"]);

        let first = search.search("load", PageRequest::new(1, 2).unwrap()).unwrap();
        assert_eq!(first.items, vec![posts[2].clone(), posts[1].clone()]);
        assert!(first.has_next);

        let second = search.search("load", PageRequest::new(2, 2).unwrap()).unwrap();
        assert_eq!(second.items, vec![posts[0].clone()]);
        assert!(!second.has_next);
        assert!(second.has_prev);
    }

    #[test]
    fn blank_query_matches_nothing() {
        let (search, _) = fixture(&["anything"]);
        let page = search.search("   ", PageRequest::first(10).unwrap()).unwrap();
        assert!(page.items.is_empty());
        assert!(!page.has_next);
    }
}
