use std::path::PathBuf;

/// Fatal errors. Any of these aborts the run.
#[derive(Debug, thiserror::Error)]
pub enum LsfLogError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to write table: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to serialize records: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config {path:?}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config {path:?}: `{field}` must not be blank")]
    ConfigValue { path: PathBuf, field: &'static str },
}

pub type Result<T> = std::result::Result<T, LsfLogError>;
