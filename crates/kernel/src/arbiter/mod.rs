//! Path registry client.
//!
//! The registry grants exclusive write ownership of a base path to a
//! publishing app. Reservation is a single synchronous call; it is never
//! retried, since a repeated call could leave duplicate or conflicting
//! registrations behind.

use std::time::Duration;

use async_trait::async_trait;

use crate::models::FieldErrors;

/// Outcome of a reservation call, branched on by tag rather than caught.
#[derive(Debug, Clone, PartialEq)]
pub enum ReservationOutcome {
    /// The path is reserved for the requesting app.
    Reserved,

    /// Another app owns the path. Carries the registry's field errors.
    Conflict(FieldErrors),

    /// The registry rejected the path or request as invalid.
    Invalid(FieldErrors),

    /// The registry could not be reached or answered outside its contract.
    TransportFailure(String),
}

/// Grants exclusive write ownership of base paths.
#[async_trait]
pub trait PathArbiter: Send + Sync {
    /// Reserve `base_path` for `publishing_app`. At most one attempt.
    async fn reserve(&self, base_path: &str, publishing_app: &str) -> ReservationOutcome;
}

/// HTTP client for the external path registry.
pub struct HttpPathArbiter {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPathArbiter {
    /// Create a client for the registry at `base_url`.
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl PathArbiter for HttpPathArbiter {
    async fn reserve(&self, base_path: &str, publishing_app: &str) -> ReservationOutcome {
        let url = format!("{}/paths{}", self.base_url, base_path);
        let body = serde_json::json!({ "publishing_app": publishing_app });

        let response = match self.client.put(&url).json(&body).send().await {
            Ok(response) => response,
            Err(e) => {
                return ReservationOutcome::TransportFailure(format!(
                    "path registry unreachable: {e}"
                ));
            }
        };

        let status = response.status();
        if status.is_success() {
            return ReservationOutcome::Reserved;
        }

        let raw_body = response.text().await.unwrap_or_default();
        match status.as_u16() {
            409 => ReservationOutcome::Conflict(parse_registry_errors(status.as_u16(), &raw_body)),
            422 => ReservationOutcome::Invalid(parse_registry_errors(status.as_u16(), &raw_body)),
            code => ReservationOutcome::TransportFailure(format!(
                "unexpected path registry response: {code} {raw_body}"
            )),
        }
    }
}

/// Extract the registry's `errors` object, or synthesize a single error
/// from the raw status and body when none is present.
fn parse_registry_errors(status: u16, raw_body: &str) -> FieldErrors {
    let mut errors = FieldErrors::new();

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(raw_body)
        && let Some(object) = value.get("errors").and_then(|e| e.as_object())
    {
        for (field, messages) in object {
            match messages {
                serde_json::Value::Array(list) => {
                    for message in list {
                        if let Some(message) = message.as_str() {
                            errors.add(field, message);
                        }
                    }
                }
                serde_json::Value::String(message) => errors.add(field, message.clone()),
                _ => {}
            }
        }
    }

    if errors.is_empty() {
        errors.add("base", format!("{status}: {raw_body}"));
    }

    errors
}

impl std::fmt::Debug for HttpPathArbiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpPathArbiter")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn structured_errors_are_parsed() {
        let body = r#"{"errors":{"base_path":["is already reserved by the publisher application"]}}"#;
        let errors = parse_registry_errors(409, body);
        assert_eq!(
            errors.get("base_path").unwrap(),
            &vec!["is already reserved by the publisher application".to_string()]
        );
    }

    #[test]
    fn string_valued_errors_are_accepted() {
        let body = r#"{"errors":{"publishing_app":"is required"}}"#;
        let errors = parse_registry_errors(422, body);
        assert_eq!(
            errors.get("publishing_app").unwrap(),
            &vec!["is required".to_string()]
        );
    }

    #[test]
    fn unstructured_body_becomes_synthetic_error() {
        let errors = parse_registry_errors(409, "Conflict");
        assert_eq!(errors.get("base").unwrap(), &vec!["409: Conflict".to_string()]);
    }

    #[test]
    fn empty_errors_object_becomes_synthetic_error() {
        let errors = parse_registry_errors(422, r#"{"errors":{}}"#);
        assert!(errors.get("base").unwrap()[0].starts_with("422:"));
    }
}
