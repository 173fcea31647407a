//! `haulboard-core` — shared domain primitives.
//!
//! Identifiers, the domain error model and the clock abstraction. No IO, no
//! infrastructure concerns.

pub mod clock;
pub mod error;
pub mod id;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use error::{DomainError, DomainResult};
pub use id::{MessageId, PostId, TaskId, UserId};
