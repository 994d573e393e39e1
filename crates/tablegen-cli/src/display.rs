//! Display formatting for CLI output
//!
//! Progress lines go to stdout, failures to stderr.

use console::style;
use tablegen_core::TemplateSet;
use tablegen_engine::{RenderReport, RenderedFile};
use std::path::Path;

/// One line per written file
pub fn display_rendered(file: &RenderedFile) {
    println!(
        "{} {} to {}",
        style("Render").green(),
        file.template,
        file.path.display()
    );
}

/// Templates and the files they would produce
pub fn display_template_list(templates: &TemplateSet, output_root: &Path) {
    if templates.is_empty() {
        println!(
            "{} No templates found in {}",
            style("!").yellow(),
            templates.root().display()
        );
        return;
    }

    let width = templates.iter().map(|t| t.name().len()).max().unwrap_or(0);
    for template in templates {
        println!(
            "{:<width$}  {} {}",
            template.name(),
            style("->").dim(),
            template.output_ref().resolve(output_root).display(),
            width = width
        );
    }
    println!();
    println!(
        "{}",
        style(pluralize(templates.len(), "template", "templates")).bold()
    );
}

/// Display every failure with its diagnostic, then the skipped templates
pub fn display_render_report(report: RenderReport) {
    let skipped = report.skipped;
    for failure in report.failures {
        eprintln!("{:?}", miette::Report::new(failure));
    }

    if !skipped.is_empty() {
        eprintln!(
            "  {} {} not rendered after the first failure:",
            style("→").blue(),
            pluralize(skipped.len(), "template", "templates")
        );
        for template in &skipped {
            eprintln!("    - {}", template);
        }
        eprintln!("  {} use --keep-going to render them anyway", style("hint:").blue());
    }
}

/// Display the outcome of a successful run
pub fn display_success(rendered: usize, output_root: &Path) {
    println!(
        "{} {} into {}",
        style("✓").green().bold(),
        pluralize(rendered, "file generated", "files generated"),
        output_root.display()
    );
}

/// Format count with proper pluralization
pub fn pluralize(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{} {}", count, singular)
    } else {
        format!("{} {}", count, plural)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pluralize() {
        assert_eq!(pluralize(1, "template", "templates"), "1 template");
        assert_eq!(pluralize(0, "template", "templates"), "0 templates");
        assert_eq!(pluralize(3, "template", "templates"), "3 templates");
    }
}
