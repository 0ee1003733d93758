//! Data models.

mod content_item;

pub use content_item::{ContentItem, FieldErrors, ItemAttributes};
