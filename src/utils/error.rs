// src/utils/error.rs
use std::path::PathBuf;
use thiserror::Error;

// Errors raised while loading per-ticker input tables
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Required input not found: {0}")]
    MissingInput(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error), // Automatically convert csv errors

    #[error("'{metric}' row not found in {path}")]
    MissingRow { metric: String, path: PathBuf },

    #[error("Failed to parse input data: {0}")]
    Parse(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error), // Automatically convert IO errors

    #[error("Input data error: {0}")]
    Data(#[from] DataError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Data processing failed: {0}")]
    Processing(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_input_message_names_path() {
        let err = DataError::MissingInput(PathBuf::from("saham/BBCA.JK/BBCA.JK_cashflow.csv"));
        assert_eq!(
            err.to_string(),
            "Required input not found: saham/BBCA.JK/BBCA.JK_cashflow.csv"
        );
    }

    #[test]
    fn test_app_error_wraps_data_error() {
        let err: AppError = DataError::Parse("bad header".to_string()).into();
        assert!(matches!(err, AppError::Data(_)), "Should convert via #[from]");
        assert!(err.to_string().contains("bad header"));
    }
}
