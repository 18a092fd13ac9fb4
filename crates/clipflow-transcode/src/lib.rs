//! Video transcoding: resolution probing, the rendition ladder, ffmpeg HLS
//! rendering, master playlist synthesis, and the per-job pipeline.

pub mod error;
pub mod hls;
pub mod job;
pub mod ladder;
pub mod probe;

pub use error::JobError;
pub use hls::HlsTranscoder;
pub use job::VideoPipeline;
pub use ladder::{build_ladder, Rendition};
