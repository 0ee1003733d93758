//! Item representations for responses and publish payloads.

use crate::models::{ContentItem, FieldErrors};

/// Builds absolute API URLs for content items.
///
/// Injected into the public presenter so URL construction has no dependency
/// on request context.
#[derive(Debug, Clone)]
pub struct UrlBuilder {
    site_url: String,
}

impl UrlBuilder {
    /// Create a builder rooted at `site_url`.
    pub fn new(site_url: &str) -> Self {
        Self {
            site_url: site_url.trim_end_matches('/').to_string(),
        }
    }

    /// Absolute API URL for an encoded base path.
    pub fn api_url(&self, base_path: &str) -> String {
        format!("{}/content{}", self.site_url, base_path)
    }
}

/// Private (internal) representation: every stored field, plus the field
/// errors of a failed attempt when present. Used for write-path responses
/// and as the publish payload.
pub struct PrivateItemPresenter<'a> {
    item: &'a ContentItem,
    errors: Option<&'a FieldErrors>,
}

impl<'a> PrivateItemPresenter<'a> {
    pub fn new(item: &'a ContentItem) -> Self {
        Self { item, errors: None }
    }

    pub fn with_errors(item: &'a ContentItem, errors: &'a FieldErrors) -> Self {
        Self {
            item,
            errors: Some(errors),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        let mut body = serde_json::json!({
            "base_path": self.item.base_path,
            "title": self.item.title,
            "description": self.item.description,
            "format": self.item.format,
            "update_type": self.item.update_type,
            "publishing_app": self.item.publishing_app,
            "details": self.item.details,
            "public_updated_at": self.item.public_updated_at,
            "updated_at": self.item.updated_at,
        });

        if let Some(errors) = self.errors
            && !errors.is_empty()
            && let Ok(value) = serde_json::to_value(errors)
        {
            body["errors"] = value;
        }

        body
    }
}

/// Public representation: externally visible fields only, with an absolute
/// API URL. Internal attributes (`publishing_app`, `update_type`) and error
/// state are never exposed here.
pub struct PublicItemPresenter<'a> {
    item: &'a ContentItem,
    urls: &'a UrlBuilder,
}

impl<'a> PublicItemPresenter<'a> {
    pub fn new(item: &'a ContentItem, urls: &'a UrlBuilder) -> Self {
        Self { item, urls }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "base_path": self.item.base_path,
            "title": self.item.title,
            "description": self.item.description,
            "format": self.item.format,
            "details": self.item.details,
            "public_updated_at": self.item.public_updated_at,
            "api_url": self.urls.api_url(&self.item.base_path),
        })
    }
}
