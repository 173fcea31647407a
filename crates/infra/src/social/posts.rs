//! Post storage with feed-ordered windows.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use haulboard_core::{PostId, UserId};
use haulboard_social::Post;

use crate::error::StoreError;

/// Which posts a feed query covers.
#[derive(Debug, Clone, Copy)]
pub enum PostFilter<'a> {
    All,
    Authors(&'a HashSet<UserId>),
}

impl PostFilter<'_> {
    fn admits(&self, post: &Post) -> bool {
        match self {
            PostFilter::All => true,
            PostFilter::Authors(authors) => authors.contains(&post.author_id),
        }
    }
}

/// Post persistence.
pub trait PostStore: Send + Sync {
    /// Insert a published post. Ids are unique.
    fn insert(&self, post: Post) -> Result<(), StoreError>;

    fn get(&self, post_id: PostId) -> Result<Option<Post>, StoreError>;

    /// Posts matching `filter` in feed order (timestamp desc, id desc),
    /// skipping `offset` rows and returning at most `limit`.
    fn feed_window(
        &self,
        filter: PostFilter<'_>,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Post>, StoreError>;

    /// Every post by `author`, in feed order.
    fn by_author(&self, author: UserId) -> Result<Vec<Post>, StoreError>;
}

impl<S> PostStore for Arc<S>
where
    S: PostStore + ?Sized,
{
    fn insert(&self, post: Post) -> Result<(), StoreError> {
        (**self).insert(post)
    }

    fn get(&self, post_id: PostId) -> Result<Option<Post>, StoreError> {
        (**self).get(post_id)
    }

    fn feed_window(
        &self,
        filter: PostFilter<'_>,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Post>, StoreError> {
        (**self).feed_window(filter, offset, limit)
    }

    fn by_author(&self, author: UserId) -> Result<Vec<Post>, StoreError> {
        (**self).by_author(author)
    }
}

/// Sort key whose natural order is the feed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct FeedKey(Reverse<DateTime<Utc>>, Reverse<PostId>);

impl FeedKey {
    pub(crate) fn of(post: &Post) -> Self {
        Self(Reverse(post.timestamp), Reverse(post.id))
    }
}

#[derive(Debug, Default)]
struct PostTable {
    ordered: BTreeMap<FeedKey, Post>,
    keys: HashMap<PostId, FeedKey>,
}

/// In-memory post store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryPostStore {
    inner: RwLock<PostTable>,
}

impl InMemoryPostStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PostStore for InMemoryPostStore {
    fn insert(&self, post: Post) -> Result<(), StoreError> {
        let mut table = self.inner.write().map_err(|_| StoreError::poisoned())?;
        if table.keys.contains_key(&post.id) {
            return Err(StoreError::Conflict(format!("post {} exists", post.id)));
        }
        let key = FeedKey::of(&post);
        table.keys.insert(post.id, key);
        table.ordered.insert(key, post);
        Ok(())
    }

    fn get(&self, post_id: PostId) -> Result<Option<Post>, StoreError> {
        let table = self.inner.read().map_err(|_| StoreError::poisoned())?;
        Ok(table
            .keys
            .get(&post_id)
            .and_then(|key| table.ordered.get(key))
            .cloned())
    }

    fn feed_window(
        &self,
        filter: PostFilter<'_>,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Post>, StoreError> {
        let table = self.inner.read().map_err(|_| StoreError::poisoned())?;
        Ok(table
            .ordered
            .values()
            .filter(|p| filter.admits(p))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    fn by_author(&self, author: UserId) -> Result<Vec<Post>, StoreError> {
        let table = self.inner.read().map_err(|_| StoreError::poisoned())?;
        Ok(table
            .ordered
            .values()
            .filter(|p| p.author_id == author)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn windows_follow_feed_order() {
        let store = InMemoryPostStore::new();
        let a = UserId::new();
        let b = UserId::new();
        let p1 = Post::new(a, "one", at(1)).unwrap();
        let p2 = Post::new(b, "two", at(2)).unwrap();
        let p3 = Post::new(a, "three", at(3)).unwrap();
        for p in [&p2, &p1, &p3] {
            store.insert(p.clone()).unwrap();
        }

        let all = store.feed_window(PostFilter::All, 0, 10).unwrap();
        assert_eq!(all, vec![p3.clone(), p2.clone(), p1.clone()]);

        let only_a: HashSet<UserId> = [a].into_iter().collect();
        let window = store.feed_window(PostFilter::Authors(&only_a), 1, 10).unwrap();
        assert_eq!(window, vec![p1.clone()]);

        assert_eq!(store.by_author(b).unwrap(), vec![p2.clone()]);
        assert_eq!(store.get(p2.id).unwrap(), Some(p2));
    }

    #[test]
    fn equal_timestamps_break_ties_by_id_desc() {
        let store = InMemoryPostStore::new();
        let author = UserId::new();
        let low = Post::with_id(PostId::from_uuid(uuid::Uuid::from_u128(1)), author, "low", at(5)).unwrap();
        let high = Post::with_id(PostId::from_uuid(uuid::Uuid::from_u128(2)), author, "high", at(5)).unwrap();
        store.insert(low.clone()).unwrap();
        store.insert(high.clone()).unwrap();

        let window = store.feed_window(PostFilter::All, 0, 2).unwrap();
        assert_eq!(window, vec![high, low]);
    }

    #[test]
    fn duplicate_ids_conflict() {
        let store = InMemoryPostStore::new();
        let post = Post::new(UserId::new(), "hello", at(0)).unwrap();
        store.insert(post.clone()).unwrap();
        assert!(matches!(store.insert(post), Err(StoreError::Conflict(_))));
    }
}
