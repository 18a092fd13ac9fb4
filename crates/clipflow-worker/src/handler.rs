//! Convert-command consumer.
//!
//! One job at a time (prefetch = 1). Step ordering per job is contractual:
//! the HLS tree is uploaded before the source is deleted, the source is
//! deleted before the confirmation is published, and the confirmation is
//! published before the message is acknowledged.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use clipflow_broker::{run_consumer, BrokerClient, CONFIRM_VIDEO_HLS_CONVERTING, CONVERT_VIDEO_TO_HLS};
use clipflow_core::messages::{self, ConfirmVideoHlsConverting, ConvertVideoToHls};
use clipflow_core::AppError;
use clipflow_transcode::VideoPipeline;

const CONSUMER_TAG: &str = "video_postprocess";

pub async fn run_convert_consumer(
    broker: Arc<BrokerClient>,
    pipeline: Arc<VideoPipeline>,
    shutdown: CancellationToken,
) {
    let handler_broker = broker.clone();
    run_consumer(
        broker,
        CONVERT_VIDEO_TO_HLS,
        CONSUMER_TAG,
        1,
        shutdown,
        move |body| {
            let broker = handler_broker.clone();
            let pipeline = pipeline.clone();
            async move { handle_convert_video_to_hls(&broker, &pipeline, &body).await }
        },
    )
    .await;
}

pub async fn handle_convert_video_to_hls(
    broker: &BrokerClient,
    pipeline: &VideoPipeline,
    body: &[u8],
) -> Result<(), AppError> {
    let command: ConvertVideoToHls = messages::decode(body)?;

    pipeline
        .process(command.uuid, &command.video_path)
        .await
        .map_err(AppError::from)?;

    broker
        .publish_persistent(
            CONFIRM_VIDEO_HLS_CONVERTING,
            &ConfirmVideoHlsConverting { uuid: command.uuid },
        )
        .await?;

    tracing::info!(uuid = %command.uuid, "Confirmation published");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipflow_core::messages::decode;
    use clipflow_core::Disposition;

    #[test]
    fn command_without_video_path_is_poison() {
        let err = decode::<ConvertVideoToHls>(
            br#"{"uuid": "11111111-1111-4111-8111-111111111111"}"#,
        )
        .unwrap_err();
        assert_eq!(err.disposition(), Disposition::Discard);
    }
}
