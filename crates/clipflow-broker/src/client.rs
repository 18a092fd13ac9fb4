//! Reconnecting broker client.
//!
//! Queues are durable, non-exclusive, non-auto-delete and carry the
//! `delivery_mode=2` argument; published messages are persistent. On
//! connection loss [`BrokerClient::reconnect`] re-establishes the
//! connection, re-declares every queue, and replaces the publish channel;
//! unacknowledged messages are redelivered by the broker.

use std::time::Duration;

use lapin::options::{BasicPublishOptions, QueueDeclareOptions};
use lapin::types::{AMQPValue, FieldTable};
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::sleep;

use clipflow_core::{AppError, RabbitSettings};

use crate::{CONFIRM_VIDEO_HLS_CONVERTING, CONVERT_VIDEO_TO_HLS, UNPROCESSED_VIDEO_UPLOADED};

/// Maximum delay between reconnect attempts.
pub const MAX_RECONNECT_BACKOFF_SECS: u64 = 30;

const PERSISTENT_DELIVERY_MODE: u8 = 2;

/// Computes backoff for a given reconnect attempt (exponential with cap).
#[inline]
pub(crate) fn reconnect_backoff(attempt: u32) -> Duration {
    Duration::from_secs(2_u64.saturating_pow(attempt.min(16)).min(MAX_RECONNECT_BACKOFF_SECS))
}

pub struct BrokerClient {
    uri: String,
    connection: Mutex<Connection>,
    publisher: Mutex<Channel>,
}

impl BrokerClient {
    /// Connect, retrying with capped exponential backoff, and declare every
    /// pipeline queue.
    pub async fn connect(settings: &RabbitSettings) -> Result<Self, AppError> {
        let uri = settings.url();
        let connection = Self::connect_with_backoff(&uri).await?;
        let publisher = Self::open_channel(&connection).await?;

        tracing::info!(host = %settings.host, port = settings.port, "Connected to message broker");
        Ok(Self {
            uri,
            connection: Mutex::new(connection),
            publisher: Mutex::new(publisher),
        })
    }

    async fn connect_with_backoff(uri: &str) -> Result<Connection, AppError> {
        let mut attempt: u32 = 0;
        loop {
            match Connection::connect(uri, ConnectionProperties::default()).await {
                Ok(connection) => return Ok(connection),
                Err(e) => {
                    let delay = reconnect_backoff(attempt);
                    tracing::warn!(
                        error = %e,
                        attempt,
                        delay_secs = delay.as_secs(),
                        "Broker connection failed, retrying"
                    );
                    sleep(delay).await;
                    attempt = attempt.saturating_add(1);
                }
            }
        }
    }

    async fn open_channel(connection: &Connection) -> Result<Channel, AppError> {
        let channel = connection
            .create_channel()
            .await
            .map_err(|e| AppError::Broker(format!("failed to open channel: {}", e)))?;
        Self::declare_queues(&channel).await?;
        Ok(channel)
    }

    /// Declare one durable queue.
    pub async fn declare_queue(channel: &Channel, name: &str) -> Result<(), AppError> {
        let mut arguments = FieldTable::default();
        arguments.insert("delivery_mode".into(), AMQPValue::LongInt(2));

        channel
            .queue_declare(
                name,
                QueueDeclareOptions {
                    durable: true,
                    exclusive: false,
                    auto_delete: false,
                    ..Default::default()
                },
                arguments,
            )
            .await
            .map_err(|e| AppError::Broker(format!("failed to declare queue {}: {}", name, e)))?;
        Ok(())
    }

    /// Declare all three pipeline queues.
    pub async fn declare_queues(channel: &Channel) -> Result<(), AppError> {
        for queue in [
            UNPROCESSED_VIDEO_UPLOADED,
            CONVERT_VIDEO_TO_HLS,
            CONFIRM_VIDEO_HLS_CONVERTING,
        ] {
            Self::declare_queue(channel, queue).await?;
        }
        Ok(())
    }

    /// Tear down and re-establish the connection, re-declaring queues and
    /// replacing the publish channel.
    pub async fn reconnect(&self) -> Result<(), AppError> {
        let mut connection = self.connection.lock().await;
        let fresh = Self::connect_with_backoff(&self.uri).await?;
        let publisher = Self::open_channel(&fresh).await?;
        *connection = fresh;
        *self.publisher.lock().await = publisher;

        tracing::info!("Broker connection re-established");
        Ok(())
    }

    /// Open a dedicated channel on the current connection, e.g. for a
    /// consumer with its own prefetch window.
    pub async fn channel(&self) -> Result<Channel, AppError> {
        let connection = self.connection.lock().await;
        connection
            .create_channel()
            .await
            .map_err(|e| AppError::Broker(format!("failed to open channel: {}", e)))
    }

    /// Publish a JSON message with persistent delivery.
    pub async fn publish_persistent<T: Serialize>(
        &self,
        queue: &str,
        message: &T,
    ) -> Result<(), AppError> {
        let body = serde_json::to_vec(message)
            .map_err(|e| AppError::Internal(format!("failed to encode message: {}", e)))?;

        let channel = self.publisher.lock().await.clone();
        channel
            .basic_publish(
                "",
                queue,
                BasicPublishOptions::default(),
                &body,
                BasicProperties::default()
                    .with_content_type("application/json".into())
                    .with_delivery_mode(PERSISTENT_DELIVERY_MODE),
            )
            .await
            .map_err(|e| AppError::Broker(format!("failed to publish to {}: {}", queue, e)))?
            .await
            .map_err(|e| AppError::Broker(format!("publish to {} not confirmed: {}", queue, e)))?;

        tracing::debug!(queue, bytes = body.len(), "Published persistent message");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_is_exponential_with_cap() {
        assert_eq!(reconnect_backoff(0), Duration::from_secs(1));
        assert_eq!(reconnect_backoff(1), Duration::from_secs(2));
        assert_eq!(reconnect_backoff(3), Duration::from_secs(8));
        assert_eq!(reconnect_backoff(10), Duration::from_secs(30));
        assert_eq!(reconnect_backoff(u32::MAX), Duration::from_secs(30));
    }
}
