//! List command - show templates and their output paths without rendering

use tablegen_core::{GeneratorConfig, TemplateSet};

use crate::display;
use crate::error::{CliError, Result};

pub fn run(config: &GeneratorConfig) -> Result<()> {
    let templates =
        TemplateSet::discover(&config.templates, &config.suffixes).map_err(CliError::Discovery)?;

    display::display_template_list(&templates, &config.output);
    Ok(())
}
