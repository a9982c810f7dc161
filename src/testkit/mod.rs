//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`fixtures`]: Unique feeds, timestamps relative to the expiration boundary, errors.
//! - [`spy`]: [`FeedStoreSpy`](spy::FeedStoreSpy), a store whose results the test completes by hand.
//! - [`specs`]: Behaviour every [`FeedStore`](crate::store::FeedStore) must show, as reusable assertions.

pub mod fixtures;
pub mod specs;
pub mod spy;

pub use spy::{FeedStoreSpy, ReceivedMessage};
