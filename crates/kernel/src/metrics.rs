//! Prometheus metrics collection.
//!
//! Covers the write path's three coordination stages: reservation outcomes,
//! store operation timings, and publish confirms. Publish failures are
//! absorbed by the publisher, so this counter is the operator's only signal
//! of silent notification loss besides the error log.

use prometheus_client::encoding::{EncodeLabelSet, text::encode};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::{Histogram, exponential_buckets};
use prometheus_client::registry::Registry;

/// Store operation labels.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct StoreOpLabels {
    pub op: String,
}

/// Reservation outcome labels.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ReservationLabels {
    pub outcome: String,
}

/// Application metrics.
pub struct Metrics {
    registry: Registry,

    /// Store operation duration by operation name.
    pub store_duration_seconds: Family<StoreOpLabels, Histogram>,

    /// Reservation calls by outcome.
    pub reservations: Family<ReservationLabels, Counter>,

    /// Messages confirmed by the broker.
    pub messages_published: Counter,

    /// Publish attempts that were nacked, unconfirmed, or failed outright.
    pub publish_failures: Counter,
}

impl Metrics {
    /// Create a new metrics registry.
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let store_duration_seconds = Family::<StoreOpLabels, Histogram>::new_with_constructor(
            || Histogram::new(exponential_buckets(0.0001, 2.0, 14)),
        );
        registry.register(
            "store_operation_duration_seconds",
            "Content store operation duration in seconds",
            store_duration_seconds.clone(),
        );

        let reservations = Family::<ReservationLabels, Counter>::default();
        registry.register(
            "path_reservations_total",
            "Path reservation calls by outcome",
            reservations.clone(),
        );

        let messages_published = Counter::default();
        registry.register(
            "messages_published_total",
            "Messages confirmed by the broker",
            messages_published.clone(),
        );

        let publish_failures = Counter::default();
        registry.register(
            "publish_failures_total",
            "Publish attempts without a positive broker confirm",
            publish_failures.clone(),
        );

        Self {
            registry,
            store_duration_seconds,
            reservations,
            messages_published,
            publish_failures,
        }
    }

    /// Time a store operation.
    pub fn observe_store_op(&self, op: &str, duration_secs: f64) {
        self.store_duration_seconds
            .get_or_create(&StoreOpLabels { op: op.to_string() })
            .observe(duration_secs);
    }

    /// Count a reservation call outcome.
    pub fn record_reservation(&self, outcome: &str) {
        self.reservations
            .get_or_create(&ReservationLabels {
                outcome: outcome.to_string(),
            })
            .inc();
    }

    /// Encode metrics in Prometheus text format.
    ///
    /// # Panics
    ///
    /// Panics if Prometheus metric encoding to a `String` buffer fails.
    /// The `fmt::Write` impl for `String` is infallible, and all metric
    /// labels use derived `Display`/`EncodeLabelSet` impls that do not
    /// produce `fmt::Error`.
    pub fn encode(&self) -> String {
        let mut buffer = String::new();
        // Prometheus encoding to String buffer is infallible
        #[allow(clippy::expect_used)]
        encode(&mut buffer, &self.registry).expect("encoding metrics");
        buffer
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish()
    }
}
