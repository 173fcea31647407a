//! Social domain module.
//!
//! Users, posts, follow edges, private messages and pagination, implemented
//! purely as deterministic domain logic (no IO, no HTTP, no storage).

pub mod follow;
pub mod message;
pub mod page;
pub mod post;
pub mod user;

pub use follow::FollowEdge;
pub use message::Message;
pub use page::{Page, PageRequest};
pub use post::{Post, feed_order, sort_for_feed};
pub use user::User;
