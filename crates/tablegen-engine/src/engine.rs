//! Template engine based on MiniJinja

use minijinja::{AutoEscape, Environment, Error, Output, State, Value};
use std::path::Path;
use tablegen_core::Context;

use crate::error::{Result, TemplateError};
use crate::filters::{self, FilterSet};
use crate::value::{MissingValue, context_to_value, reject_stringified_missing};

/// Template engine builder
pub struct EngineBuilder {
    strict_mode: bool,
    filters: FilterSet,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            strict_mode: false,
            filters: FilterSet::standard(),
        }
    }

    /// Set strict mode (fail on undefined variables)
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict_mode = strict;
        self
    }

    /// Filters made available to templates
    pub fn filters(mut self, filters: FilterSet) -> Self {
        self.filters = filters;
        self
    }

    /// Build the engine
    pub fn build(self) -> Engine {
        Engine {
            strict_mode: self.strict_mode,
            filters: self.filters,
        }
    }
}

/// The template engine
///
/// Holds configuration only; every environment it creates is independent.
#[derive(Debug, Clone)]
pub struct Engine {
    strict_mode: bool,
    filters: FilterSet,
}

impl Default for Engine {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Engine {
    /// Create a builder
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    pub fn filters(&self) -> &FilterSet {
        &self.filters
    }

    /// Create a configured MiniJinja environment
    ///
    /// With a `template_root`, templates (and anything they include) are
    /// loaded by their `/`-separated path below it.
    pub fn environment(&self, template_root: Option<&Path>) -> Environment<'static> {
        let mut env = Environment::new();

        if self.strict_mode {
            env.set_undefined_behavior(minijinja::UndefinedBehavior::Strict);
        } else {
            env.set_undefined_behavior(minijinja::UndefinedBehavior::Lenient);
        }

        // Generated sources are never HTML
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.set_formatter(format_output);

        self.filters.install(&mut env);
        env.add_test("defined", filters::is_defined);
        env.add_test("undefined", filters::is_undefined);
        env.add_filter("default", filters::default_value);
        env.add_filter("d", filters::default_value);

        if let Some(root) = template_root {
            env.set_loader(minijinja::path_loader(root));
        }

        env
    }

    /// Render a single template string against a context
    pub fn render_string(
        &self,
        template: &str,
        context: &Context,
        template_name: &str,
    ) -> Result<String> {
        let mut env = self.environment(None);
        let data_keys: Vec<String> = context.root().keys().cloned().collect();

        env.add_template_owned(template_name.to_string(), template.to_string())
            .map_err(|e| TemplateError::from_minijinja(e, template_name, template, &data_keys))?;

        let tmpl = env
            .get_template(template_name)
            .map_err(|e| TemplateError::from_minijinja(e, template_name, template, &data_keys))?;

        tmpl.render(context_to_value(context))
            .and_then(reject_stringified_missing)
            .map_err(|e| TemplateError::from_minijinja(e, template_name, template, &data_keys))
    }
}

/// Output formatter: a missing lookup fails here, at the point it is written
fn format_output(out: &mut Output<'_>, state: &State<'_, '_>, value: &Value) -> std::result::Result<(), Error> {
    if let Some(missing) = value.downcast_object_ref::<MissingValue>() {
        return Err(missing.to_error());
    }
    minijinja::escape_formatter(out, state, value)
}
