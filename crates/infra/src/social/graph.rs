//! Directed follow relation.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock};

use tracing::debug;

use haulboard_core::UserId;
use haulboard_social::FollowEdge;

use crate::error::StoreError;

/// Directed follow graph over user ids.
///
/// `follow` and `unfollow` are idempotent and report whether the edge set
/// changed. A user can never follow themselves; such requests are no-ops.
pub trait SocialGraph: Send + Sync {
    fn follow(&self, follower: UserId, followee: UserId) -> Result<bool, StoreError>;

    fn unfollow(&self, follower: UserId, followee: UserId) -> Result<bool, StoreError>;

    fn is_following(&self, follower: UserId, followee: UserId) -> Result<bool, StoreError>;

    /// Users `user` follows, in id order.
    fn followees_of(&self, user: UserId) -> Result<Vec<UserId>, StoreError>;

    /// Users following `user`, in id order.
    fn followers_of(&self, user: UserId) -> Result<Vec<UserId>, StoreError>;
}

impl<S> SocialGraph for Arc<S>
where
    S: SocialGraph + ?Sized,
{
    fn follow(&self, follower: UserId, followee: UserId) -> Result<bool, StoreError> {
        (**self).follow(follower, followee)
    }

    fn unfollow(&self, follower: UserId, followee: UserId) -> Result<bool, StoreError> {
        (**self).unfollow(follower, followee)
    }

    fn is_following(&self, follower: UserId, followee: UserId) -> Result<bool, StoreError> {
        (**self).is_following(follower, followee)
    }

    fn followees_of(&self, user: UserId) -> Result<Vec<UserId>, StoreError> {
        (**self).followees_of(user)
    }

    fn followers_of(&self, user: UserId) -> Result<Vec<UserId>, StoreError> {
        (**self).followers_of(user)
    }
}

#[derive(Debug, Default)]
struct Adjacency {
    following: HashMap<UserId, BTreeSet<UserId>>,
    followers: HashMap<UserId, BTreeSet<UserId>>,
}

/// In-memory follow graph with forward and reverse adjacency under one lock.
#[derive(Debug, Default)]
pub struct InMemorySocialGraph {
    inner: RwLock<Adjacency>,
}

impl InMemorySocialGraph {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SocialGraph for InMemorySocialGraph {
    fn follow(&self, follower: UserId, followee: UserId) -> Result<bool, StoreError> {
        let Ok(edge) = FollowEdge::new(follower, followee) else {
            debug!(user_id = %follower, "self-follow ignored");
            return Ok(false);
        };

        let mut adj = self.inner.write().map_err(|_| StoreError::poisoned())?;
        let added = adj
            .following
            .entry(edge.follower)
            .or_default()
            .insert(edge.followee);
        if added {
            adj.followers
                .entry(edge.followee)
                .or_default()
                .insert(edge.follower);
        }
        Ok(added)
    }

    fn unfollow(&self, follower: UserId, followee: UserId) -> Result<bool, StoreError> {
        if follower == followee {
            return Ok(false);
        }

        let mut adj = self.inner.write().map_err(|_| StoreError::poisoned())?;
        let removed = adj
            .following
            .get_mut(&follower)
            .is_some_and(|set| set.remove(&followee));
        if removed {
            if let Some(set) = adj.followers.get_mut(&followee) {
                set.remove(&follower);
            }
        }
        Ok(removed)
    }

    fn is_following(&self, follower: UserId, followee: UserId) -> Result<bool, StoreError> {
        let adj = self.inner.read().map_err(|_| StoreError::poisoned())?;
        Ok(adj
            .following
            .get(&follower)
            .is_some_and(|set| set.contains(&followee)))
    }

    fn followees_of(&self, user: UserId) -> Result<Vec<UserId>, StoreError> {
        let adj = self.inner.read().map_err(|_| StoreError::poisoned())?;
        Ok(adj
            .following
            .get(&user)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default())
    }

    fn followers_of(&self, user: UserId) -> Result<Vec<UserId>, StoreError> {
        let adj = self.inner.read().map_err(|_| StoreError::poisoned())?;
        Ok(adj
            .followers
            .get(&user)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn follow_is_idempotent() {
        let graph = InMemorySocialGraph::new();
        let (a, b) = (UserId::new(), UserId::new());

        assert!(graph.follow(a, b).unwrap());
        assert!(!graph.follow(a, b).unwrap());
        assert!(graph.is_following(a, b).unwrap());
        assert!(!graph.is_following(b, a).unwrap());
        assert_eq!(graph.followees_of(a).unwrap(), vec![b]);
        assert_eq!(graph.followers_of(b).unwrap(), vec![a]);
    }

    #[test]
    fn unfollow_is_idempotent() {
        let graph = InMemorySocialGraph::new();
        let (a, b) = (UserId::new(), UserId::new());

        assert!(!graph.unfollow(a, b).unwrap());
        graph.follow(a, b).unwrap();
        assert!(graph.unfollow(a, b).unwrap());
        assert!(!graph.unfollow(a, b).unwrap());
        assert!(graph.followees_of(a).unwrap().is_empty());
        assert!(graph.followers_of(b).unwrap().is_empty());
    }

    #[test]
    fn self_edges_never_exist() {
        let graph = InMemorySocialGraph::new();
        let a = UserId::new();

        assert!(!graph.follow(a, a).unwrap());
        assert!(!graph.is_following(a, a).unwrap());
        assert!(!graph.unfollow(a, a).unwrap());
        assert!(graph.followees_of(a).unwrap().is_empty());
    }

    #[test]
    fn unknown_user_has_no_edges() {
        let graph = InMemorySocialGraph::new();
        assert!(graph.followees_of(UserId::new()).unwrap().is_empty());
        assert!(graph.followers_of(UserId::new()).unwrap().is_empty());
    }
}
