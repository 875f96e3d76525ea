use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AppError {
    #[error("Failed to fetch library catalog: {0}")]
    Catalog(String),

    #[error("Download failed: {0}")]
    Download(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("No library row at path {0:?}")]
    InvalidRow(String),

    #[error("Library \"{0}\" is already downloading")]
    AlreadyDownloading(String),

    #[error("Library \"{0}\" has no download URL")]
    MissingUrl(String),
}
