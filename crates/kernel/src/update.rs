//! Update coordination.
//!
//! Drives one update request through a fixed sequence: reserve the path,
//! persist the item, publish the change event. Only failures before
//! persistence can change the caller-visible outcome; once the item is
//! stored, the outcome is fixed and the publish result is informational.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use tracing::{error, info};

use crate::arbiter::{PathArbiter, ReservationOutcome};
use crate::metrics::Metrics;
use crate::models::{ContentItem, FieldErrors};
use crate::queue::{MessagePublisher, PublishEvent};
use crate::store::{ContentStore, UpsertOutcome};

/// Terminal state of one update request.
#[derive(Debug)]
pub enum UpdateOutcome {
    /// First write for this base path. Maps to 201.
    Created(ContentItem),

    /// Existing item wholly replaced. Maps to 200.
    Replaced(ContentItem),

    /// Another app owns the path. Maps to 409; nothing persisted.
    PathConflict {
        item: ContentItem,
        errors: FieldErrors,
    },

    /// The registry rejected the reservation as invalid. Maps to 422;
    /// nothing persisted.
    PathInvalid {
        item: ContentItem,
        errors: FieldErrors,
    },

    /// The payload failed validation. Maps to 422; nothing persisted,
    /// nothing published.
    AttributesInvalid {
        item: ContentItem,
        errors: FieldErrors,
    },

    /// The registry could not be consulted. Maps to 502. The reservation
    /// is not retried and nothing is persisted.
    RegistryUnavailable(String),
}

/// Orchestrates reservation, persistence, and notification for updates.
///
/// All collaborators are injected, so any of them can be replaced with a
/// test double.
pub struct UpdateCoordinator {
    arbiter: Arc<dyn PathArbiter>,
    store: Arc<dyn ContentStore>,
    publisher: Arc<dyn MessagePublisher>,
    metrics: Arc<Metrics>,
}

impl UpdateCoordinator {
    pub fn new(
        arbiter: Arc<dyn PathArbiter>,
        store: Arc<dyn ContentStore>,
        publisher: Arc<dyn MessagePublisher>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            arbiter,
            store,
            publisher,
            metrics,
        }
    }

    /// Run one update for an encoded base path.
    ///
    /// `payload` is the decoded request body with any `base_path` key
    /// already stripped; the path in the URL is authoritative.
    pub async fn update(
        &self,
        base_path: &str,
        payload: &serde_json::Value,
    ) -> Result<UpdateOutcome> {
        let publishing_app = payload
            .get("publishing_app")
            .and_then(|v| v.as_str())
            .unwrap_or_default();

        match self.arbiter.reserve(base_path, publishing_app).await {
            ReservationOutcome::Reserved => {
                self.metrics.record_reservation("reserved");
            }
            ReservationOutcome::Conflict(registry_errors) => {
                self.metrics.record_reservation("conflict");
                return Ok(UpdateOutcome::PathConflict {
                    item: ContentItem::transient(base_path, payload),
                    errors: registration_errors(&registry_errors),
                });
            }
            ReservationOutcome::Invalid(registry_errors) => {
                self.metrics.record_reservation("invalid");
                return Ok(UpdateOutcome::PathInvalid {
                    item: ContentItem::transient(base_path, payload),
                    errors: registration_errors(&registry_errors),
                });
            }
            ReservationOutcome::TransportFailure(message) => {
                self.metrics.record_reservation("transport_failure");
                error!(base_path = %base_path, message = %message, "path reservation failed");
                return Ok(UpdateOutcome::RegistryUnavailable(message));
            }
        }

        let started = Instant::now();
        let outcome = self.store.create_or_replace(base_path, payload).await?;
        self.metrics
            .observe_store_op("update.create_or_replace", started.elapsed().as_secs_f64());

        match outcome {
            UpsertOutcome::Invalid { item, errors } => {
                Ok(UpdateOutcome::AttributesInvalid { item, errors })
            }
            UpsertOutcome::Created(item) => {
                info!(base_path = %base_path, "content item created");
                self.publisher.send(PublishEvent::for_item(&item)).await;
                Ok(UpdateOutcome::Created(item))
            }
            UpsertOutcome::Replaced(item) => {
                info!(base_path = %base_path, "content item replaced");
                self.publisher.send(PublishEvent::for_item(&item)).await;
                Ok(UpdateOutcome::Replaced(item))
            }
        }
    }
}

/// Flatten the registry's field errors under the `path_registration` key,
/// as `"<field> <message>"` strings. Synthetic errors (recorded under
/// `base`) keep their message as-is.
fn registration_errors(registry_errors: &FieldErrors) -> FieldErrors {
    let mut errors = FieldErrors::new();
    for (field, messages) in registry_errors.iter() {
        for message in messages {
            if field == "base" {
                errors.add("path_registration", message.clone());
            } else {
                errors.add("path_registration", format!("{field} {message}"));
            }
        }
    }
    errors
}

impl std::fmt::Debug for UpdateCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateCoordinator").finish()
    }
}
