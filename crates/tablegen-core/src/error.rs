//! Core error types

use std::path::PathBuf;
use thiserror::Error;

/// The data document could not be turned into a context
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Data document not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Failed to read data document {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse data document {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Data document {} must have a mapping at its root, found {found}", path.display())]
    NotAMapping { path: PathBuf, found: &'static str },
}

/// The template root could not be enumerated
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("Template directory not found: {}", path.display())]
    RootNotFound { path: PathBuf },

    #[error("Template root is not a directory: {}", path.display())]
    RootNotDirectory { path: PathBuf },

    #[error("Failed to scan template directory {}: {source}", path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Template name is not valid UTF-8: {}", path.display())]
    NonUtf8Name { path: PathBuf },
}

#[derive(Error, Debug)]
pub enum CoreError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error("Invalid configuration {}: {message}", path.display())]
    InvalidConfig { path: PathBuf, message: String },

    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
