//! Postgres access for the metadata store: pool construction, schema
//! bootstrap, and the video/user repositories.

pub mod pool;
pub mod schema;
pub mod users;
pub mod videos;

pub use pool::connect_pool;
pub use users::UserRepository;
pub use videos::VideoRepository;
