use std::path::PathBuf;

use thiserror::Error;

/// Main error type for Flowdoc operations
#[derive(Error, Debug)]
pub enum FlowdocError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parser error: {0}")]
    Parser(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Build descriptor error: {0}")]
    Xml(String),

    #[error("File system error: {0}")]
    FileSystem(String),

    #[error("Project root is not a readable directory: {}", .0.display())]
    InvalidRoot(PathBuf),
}

pub type Result<T> = std::result::Result<T, FlowdocError>;
