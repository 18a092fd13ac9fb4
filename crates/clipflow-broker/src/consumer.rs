//! Manual-ack consumer loop.
//!
//! One message at a time per prefetch window. Handler results map to broker
//! decisions through [`Disposition`]: success acks, transient errors nack
//! with requeue, transcode failures nack without requeue, poison messages
//! are acked and dropped. The outer loop survives connection loss by
//! reconnecting, re-declaring the queue, and resuming; messages that were
//! in flight are redelivered by the broker.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use lapin::options::{BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicQosOptions};
use lapin::types::FieldTable;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use clipflow_core::{AppError, Disposition};

use crate::client::BrokerClient;

/// Pause after a requeued failure so a persistent outage does not spin the
/// same message through the handler hot.
const REQUEUE_PAUSE: Duration = Duration::from_secs(1);
const RESUBSCRIBE_PAUSE: Duration = Duration::from_secs(2);

/// Consume `queue` until `shutdown` fires. An in-flight handler always runs
/// to completion; cancellation is only observed between deliveries.
pub async fn run_consumer<F, Fut>(
    client: Arc<BrokerClient>,
    queue: &'static str,
    consumer_tag: &'static str,
    prefetch: u16,
    shutdown: CancellationToken,
    handler: F,
) where
    F: Fn(Vec<u8>) -> Fut,
    Fut: Future<Output = Result<(), AppError>>,
{
    while !shutdown.is_cancelled() {
        let channel = match client.channel().await {
            Ok(channel) => channel,
            Err(e) => {
                tracing::warn!(queue, error = %e, "Failed to open consumer channel");
                if client.reconnect().await.is_err() {
                    sleep(RESUBSCRIBE_PAUSE).await;
                }
                continue;
            }
        };

        let subscription = async {
            channel
                .basic_qos(prefetch, BasicQosOptions::default())
                .await
                .map_err(|e| AppError::Broker(format!("failed to set prefetch: {}", e)))?;
            BrokerClient::declare_queue(&channel, queue).await?;
            channel
                .basic_consume(
                    queue,
                    consumer_tag,
                    BasicConsumeOptions::default(),
                    FieldTable::default(),
                )
                .await
                .map_err(|e| AppError::Broker(format!("failed to start consumer: {}", e)))
        };

        let mut consumer = match subscription.await {
            Ok(consumer) => consumer,
            Err(e) => {
                tracing::warn!(queue, error = %e, "Failed to subscribe, retrying");
                sleep(RESUBSCRIBE_PAUSE).await;
                continue;
            }
        };

        tracing::info!(queue, consumer_tag, prefetch, "Consuming");

        loop {
            let delivery = tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!(queue, "Consumer shutting down");
                    return;
                }
                delivery = consumer.next() => delivery,
            };

            match delivery {
                Some(Ok(delivery)) => {
                    let outcome = handler(delivery.data.clone()).await;
                    let broker_result = match &outcome {
                        Ok(()) => delivery.ack(BasicAckOptions::default()).await,
                        Err(err) => match err.disposition() {
                            Disposition::Discard => {
                                tracing::warn!(queue, error = %err, "Dropping poison message");
                                delivery.ack(BasicAckOptions::default()).await
                            }
                            Disposition::Requeue => {
                                tracing::warn!(queue, error = %err, "Requeueing after transient failure");
                                let nacked = delivery
                                    .nack(BasicNackOptions {
                                        requeue: true,
                                        ..Default::default()
                                    })
                                    .await;
                                sleep(REQUEUE_PAUSE).await;
                                nacked
                            }
                            Disposition::Reject => {
                                tracing::error!(queue, error = %err, "Rejecting message without requeue");
                                delivery
                                    .nack(BasicNackOptions {
                                        requeue: false,
                                        ..Default::default()
                                    })
                                    .await
                            }
                        },
                    };

                    if let Err(e) = broker_result {
                        tracing::error!(queue, error = %e, "Failed to settle delivery");
                        break;
                    }
                }
                Some(Err(e)) => {
                    tracing::error!(queue, error = %e, "Consumer stream error");
                    break;
                }
                None => {
                    tracing::warn!(queue, "Consumer stream ended");
                    break;
                }
            }
        }

        if shutdown.is_cancelled() {
            return;
        }
        tracing::warn!(queue, "Consumer stopped, reconnecting");
        if client.reconnect().await.is_err() {
            sleep(RESUBSCRIBE_PAUSE).await;
        }
    }
}
