use thiserror::Error;

/// Everything here is fatal: the job performs no retries, and any failure
/// aborts the run where it happened.
#[derive(Debug, Error)]
pub enum EtlError {
    #[error("configuration parameter not found: {0}")]
    ConfigNotFound(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("missing required column {0:?} in source header")]
    MissingColumn(String),

    #[error("cannot convert {column} value {value:?} to integer (line {line})")]
    TypeConversion {
        column: &'static str,
        value: String,
        line: u64,
    },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Archive(#[from] zip::result::ZipError),

    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, EtlError>;
