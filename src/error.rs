use thiserror::Error;

/// Failures that stop a render cycle.
///
/// Schema and value anomalies never show up here: the loader absorbs them
/// and only counts them in its `LoadReport`.
#[derive(Debug, Error)]
pub enum DashError {
    #[error("data source unavailable: {0}")]
    SourceUnavailable(String),
    #[error("no data found in the data source")]
    EmptySource,
    #[error("expected column `{0}` is not present in the data")]
    MissingColumn(String),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid dashboard config: {0}")]
    Config(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, DashError>;
