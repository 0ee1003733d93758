//! AMQP publisher with synchronous publisher confirms.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use lapin::options::{BasicPublishOptions, ConfirmSelectOptions, ExchangeDeclareOptions};
use lapin::publisher_confirm::Confirmation;
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind};
use tracing::error;

use crate::metrics::Metrics;

use super::{MessagePublisher, PublishEvent};

/// Publisher backed by a topic exchange on an AMQP broker.
///
/// The channel is created once at startup and confirms are enabled on it,
/// so every publish can wait for the broker's ack.
pub struct AmqpPublisher {
    channel: Channel,
    exchange: String,
    metrics: Arc<Metrics>,
}

impl AmqpPublisher {
    /// Connect to the broker and bind to an existing exchange.
    ///
    /// The exchange is asserted with a passive declare: it must already
    /// exist, this service never creates it.
    pub async fn connect(amqp_url: &str, exchange: &str, metrics: Arc<Metrics>) -> Result<Self> {
        let connection = Connection::connect(amqp_url, ConnectionProperties::default())
            .await
            .context("failed to connect to message broker")?;

        let channel = connection
            .create_channel()
            .await
            .context("failed to open broker channel")?;

        // Enable publisher confirms, so we get acks back after publishes.
        channel
            .confirm_select(ConfirmSelectOptions::default())
            .await
            .context("failed to enable publisher confirms")?;

        channel
            .exchange_declare(
                exchange,
                ExchangeKind::Topic,
                ExchangeDeclareOptions {
                    passive: true,
                    ..ExchangeDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await
            .with_context(|| format!("exchange '{exchange}' does not exist"))?;

        Ok(Self {
            channel,
            exchange: exchange.to_string(),
            metrics,
        })
    }
}

#[async_trait]
impl MessagePublisher for AmqpPublisher {
    async fn send(&self, event: PublishEvent) {
        let body = match serde_json::to_vec(&event.payload) {
            Ok(body) => body,
            Err(e) => {
                error!(
                    error = %e,
                    routing_key = %event.routing_key,
                    "failed to serialize publish payload"
                );
                self.metrics.publish_failures.inc();
                return;
            }
        };

        let properties = BasicProperties::default()
            .with_content_type("application/json".into())
            .with_delivery_mode(2);

        let published = self
            .channel
            .basic_publish(
                &self.exchange,
                &event.routing_key,
                BasicPublishOptions::default(),
                &body,
                properties,
            )
            .await;

        let confirmation = match published {
            Ok(confirm) => confirm.await,
            Err(e) => Err(e),
        };

        match confirmation {
            Ok(Confirmation::Ack(_)) | Ok(Confirmation::NotRequested) => {
                self.metrics.messages_published.inc();
            }
            Ok(Confirmation::Nack(_)) => {
                error!(
                    routing_key = %event.routing_key,
                    payload = %event.payload,
                    "broker rejected published message"
                );
                self.metrics.publish_failures.inc();
            }
            Err(e) => {
                error!(
                    error = %e,
                    routing_key = %event.routing_key,
                    payload = %event.payload,
                    "publishing message failed"
                );
                self.metrics.publish_failures.inc();
            }
        }
    }
}

impl std::fmt::Debug for AmqpPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AmqpPublisher")
            .field("exchange", &self.exchange)
            .finish()
    }
}
