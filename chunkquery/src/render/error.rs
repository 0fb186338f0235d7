use thiserror::Error;

/// Failure of a render request.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("invalid render request: {0}")]
    InvalidArgument(String),

    #[error("failed to encode image: {0}")]
    Encode(#[from] image::ImageError),

    #[error("render task failed: {0}")]
    Task(String),

    #[error("render pipeline is shut down")]
    ShutDown,
}
