//! CLI error types with exit code handling
//!
//! Every failure the binary reports is a [`CliError`], which knows the
//! exit code it maps to.

use miette::Diagnostic;
use tablegen_core::{CoreError, DiscoveryError, LoadError};
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// The data document could not be loaded
    #[error("Failed to load data document")]
    #[diagnostic(
        code(tablegen::cli::load),
        help("Pass --data or set `data` in tablegen.yaml")
    )]
    Load(#[source] LoadError),

    /// The template root could not be scanned
    #[error("Failed to discover templates")]
    #[diagnostic(
        code(tablegen::cli::discovery),
        help("Pass --templates or set `templates` in tablegen.yaml")
    )]
    Discovery(#[source] DiscoveryError),

    /// tablegen.yaml is unreadable or invalid
    #[error("Invalid configuration")]
    #[diagnostic(code(tablegen::cli::config))]
    Config(#[source] CoreError),

    /// One or more templates failed
    #[error("Template rendering failed: {summary}")]
    #[diagnostic(code(tablegen::cli::template))]
    Render { summary: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Load(_) => exit_codes::LOAD_ERROR,
            CliError::Discovery(_) => exit_codes::DISCOVERY_ERROR,
            CliError::Config(_) => exit_codes::CONFIG_ERROR,
            CliError::Render { .. } => exit_codes::TEMPLATE_ERROR,
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
