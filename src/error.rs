use thiserror::Error;

/// `NotFound` and `InvalidArgument` are expected outcomes that the HTTP layer turns
/// into user-facing messages. Everything else fails the request it occurred in.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("no results for {0}")]
    NotFound(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The render sink or output file could not be written.
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("image encoding failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("store unavailable: {0}")]
    Store(#[from] sqlx::Error),

    #[error("malformed basemap: {0}")]
    Basemap(String),

    #[error("font {0} could not be parsed")]
    Font(String),

    #[error("seed dataset unreadable: {0}")]
    Seed(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, DirectoryError>;
