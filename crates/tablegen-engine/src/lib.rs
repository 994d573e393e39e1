//! Tablegen Engine - Jinja2 template expansion for generated sources
//!
//! This crate provides a MiniJinja-based template engine with:
//! - Code-generation filters (date_time_format, escape_java_string, flat_get)
//! - Human-readable error messages with suggestions
//! - A renderer that maps every template to exactly one output file

pub mod engine;
pub mod error;
pub mod filters;
pub mod renderer;
pub mod suggestions;
pub mod value;

pub use engine::{Engine, EngineBuilder};
pub use error::{RenderError, RenderReport, TemplateError, TemplateErrorKind};
pub use filters::{Filter, FilterSet};
pub use renderer::{FailurePolicy, RenderedFile, Renderer};
pub use suggestions::AVAILABLE_FILTERS;
pub use value::Lookup;
