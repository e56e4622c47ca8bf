pub mod client;
pub mod error;
pub mod types;

pub use client::{VideoService, VideosClient};
pub use error::VideoApiError;
pub use types::{CreateVideoRequest, VideoJob, VideoStatus, VideoVariant};
