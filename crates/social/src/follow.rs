use serde::{Deserialize, Serialize};

use haulboard_core::{DomainError, DomainResult, UserId};

/// Directed follow relation: the follower's feed includes the followee's posts.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FollowEdge {
    pub follower: UserId,
    pub followee: UserId,
}

impl FollowEdge {
    /// Build an edge. Self-edges are never representable.
    pub fn new(follower: UserId, followee: UserId) -> DomainResult<Self> {
        if follower == followee {
            return Err(DomainError::invariant("a user cannot follow itself"));
        }
        Ok(Self { follower, followee })
    }
}
