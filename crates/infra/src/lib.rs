//! Infrastructure layer: stores, notification stream, background tasks.
//!
//! Every store is a trait with an in-memory implementation; production
//! backends plug in behind the same traits.

pub mod error;
pub mod inbox;
pub mod notifications;
pub mod social;
pub mod tasks;

pub use error::StoreError;
