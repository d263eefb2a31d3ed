//! In-process event bus for studio activity.
//!
//! - [`EventBus`]: publish/subscribe hub backed by `tokio::sync::broadcast`.
//! - [`PlatformEvent`]: the event envelope published by the pipeline and
//!   streamed to clients by the API's activity feed.
//! - [`names`]: the event type names in use.

pub mod bus;
pub mod names;

pub use bus::{EventBus, PlatformEvent};
