//! Generate command - render every template into the output tree

use tablegen_core::{Context, GeneratorConfig, TemplateSet};
use tablegen_engine::{Engine, FailurePolicy, Renderer};

use crate::display;
use crate::error::{CliError, Result};

pub fn run(config: &GeneratorConfig) -> Result<()> {
    // Both must succeed before anything is written
    let context = Context::load(&config.data).map_err(CliError::Load)?;
    let templates =
        TemplateSet::discover(&config.templates, &config.suffixes).map_err(CliError::Discovery)?;

    tracing::info!(
        data = %config.data.display(),
        keys = context.len(),
        templates = templates.len(),
        "starting generation"
    );

    let engine = Engine::builder().strict(config.strict).build();
    let renderer = Renderer::new(&engine, &templates, &context, &config.output);

    let policy = if config.keep_going {
        FailurePolicy::KeepGoing
    } else {
        FailurePolicy::FailFast
    };

    let report = renderer.render_all(&templates, policy, display::display_rendered);

    if report.has_errors() {
        let summary = report.summary();
        display::display_render_report(report);
        return Err(CliError::Render { summary });
    }

    display::display_success(report.rendered.len(), renderer.output_root());
    Ok(())
}
