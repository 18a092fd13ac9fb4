//! RabbitMQ plumbing: a reconnecting client with durable queue declaration
//! and persistent publishing, plus the manual-ack consumer loop.

pub mod client;
pub mod consumer;

pub use client::BrokerClient;
pub use consumer::run_consumer;

/// Raw upload events from the external uploader.
pub const UNPROCESSED_VIDEO_UPLOADED: &str = "unprocessed_video_uploaded";
/// Work commands from the ingestion coordinator to transcoder workers.
pub const CONVERT_VIDEO_TO_HLS: &str = "convert_video_to_hls";
/// Completion signals from transcoder workers back to the coordinator.
pub const CONFIRM_VIDEO_HLS_CONVERTING: &str = "confirm_video_hls_converting";
