use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PacError {
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("Backup failed: {0}")]
    Backup(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

pub type Result<T> = std::result::Result<T, PacError>;
