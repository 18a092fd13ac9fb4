//! Shared foundation for the clipflow services: configuration, error
//! taxonomy, domain models, queue message types, and telemetry init.

pub mod config;
pub mod error;
pub mod messages;
pub mod models;
pub mod telemetry;

pub use config::{
    AuthConfig, ChannelConfig, DatabaseSettings, PostprocessConfig, RabbitSettings, RedisSettings,
    RsaKeySettings, S3Settings, ServerSettings,
};
pub use error::{AppError, Disposition};
