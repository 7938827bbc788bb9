use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("No home directory")]
    NoHomeDir,

    /// Transport or parse failure talking to the task data service.
    #[error("Fetch failed: {0}")]
    Fetch(String),

    /// The refresh endpoint could not be called or answered non-2xx.
    #[error("Refresh failed: {0}")]
    Refresh(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A task record rejected before it is stored.
    #[error("Invalid task result: {0}")]
    InvalidResult(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Task join error: {0}")]
    TaskJoin(String),
}

pub type Result<T> = std::result::Result<T, Error>;
