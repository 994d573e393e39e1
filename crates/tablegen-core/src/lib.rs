//! Tablegen Core - the data side of table generation
//!
//! This crate provides the foundational types used throughout tablegen:
//! - `Context`: the parsed data document templates render against
//! - `TemplateSet`: deterministic discovery of template files
//! - `TemplateRef` / `OutputRef`: template names and the output paths they map to
//! - `GeneratorConfig`: conventional locations and run options

pub mod config;
pub mod context;
pub mod error;
pub mod template;

pub use config::GeneratorConfig;
pub use context::{Context, ContextValue, Timestamp};
pub use error::{CoreError, DiscoveryError, LoadError};
pub use template::{OutputRef, TemplateRef, TemplateSet, DEFAULT_TEMPLATE_SUFFIXES};
