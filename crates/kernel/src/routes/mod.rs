//! HTTP route handlers.

pub mod content_item;
pub mod health;
pub mod metrics;
