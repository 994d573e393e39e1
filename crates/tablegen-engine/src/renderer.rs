//! Render discovered templates into the output tree

use minijinja::{Environment, Value};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tablegen_core::{Context, OutputRef, TemplateRef, TemplateSet};

use crate::engine::Engine;
use crate::error::{RenderError, RenderReport, TemplateError};
use crate::value::{context_to_value, reject_stringified_missing};

/// What to do with the remaining templates once one fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop at the first failing template
    #[default]
    FailFast,
    /// Render every template and report all failures
    KeepGoing,
}

/// A template that was rendered and written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFile {
    pub template: TemplateRef,
    pub output: OutputRef,
    /// Absolute location of the written file
    pub path: PathBuf,
    /// Bytes written
    pub size: usize,
}

/// Renders the templates of one template root against one context
pub struct Renderer {
    env: Environment<'static>,
    context: Value,
    data_keys: Vec<String>,
    template_root: PathBuf,
    output_root: PathBuf,
}

impl Renderer {
    pub fn new(
        engine: &Engine,
        templates: &TemplateSet,
        context: &Context,
        output_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            env: engine.environment(Some(templates.root())),
            context: context_to_value(context),
            data_keys: context.root().keys().cloned().collect(),
            template_root: templates.root().to_path_buf(),
            output_root: output_root.into(),
        }
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Render one template and write it to its output location
    ///
    /// The file is written to a temporary sibling and renamed into place,
    /// so a failure never leaves a partial file behind. An existing file
    /// is replaced.
    pub fn render(&self, template: &TemplateRef) -> Result<RenderedFile, RenderError> {
        let output = template.output_ref();
        let path = output.resolve(&self.output_root);
        let write_error = |source| RenderError::Write {
            template: template.clone(),
            path: path.clone(),
            source,
        };

        let parent = path.parent().unwrap_or(&self.output_root);
        fs::create_dir_all(parent).map_err(write_error)?;

        let text = self.render_text(template)?;

        let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(write_error)?;
        tmp.write_all(text.as_bytes()).map_err(write_error)?;
        // Temp files are created owner-only
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tmp.as_file()
                .set_permissions(fs::Permissions::from_mode(0o644))
                .map_err(write_error)?;
        }
        tmp.persist(&path).map_err(|e| write_error(e.error))?;

        tracing::debug!(
            template = %template,
            output = %path.display(),
            bytes = text.len(),
            "rendered template"
        );

        Ok(RenderedFile {
            template: template.clone(),
            output,
            path,
            size: text.len(),
        })
    }

    /// Rendered text of a template, terminated by a single newline
    fn render_text(&self, template: &TemplateRef) -> Result<String, RenderError> {
        let to_render_error = |err: minijinja::Error| {
            let source = fs::read_to_string(self.template_root.join(template.to_path()))
                .unwrap_or_default();
            RenderError::Template {
                template: template.clone(),
                source: TemplateError::from_minijinja(
                    err,
                    template.name(),
                    &source,
                    &self.data_keys,
                ),
            }
        };

        let tmpl = self.env.get_template(template.name()).map_err(to_render_error)?;
        let mut text = tmpl
            .render(&self.context)
            .and_then(reject_stringified_missing)
            .map_err(to_render_error)?;
        text.push('\n');
        Ok(text)
    }

    /// Render every template in discovery order
    ///
    /// `on_rendered` is called after each file is written. Under
    /// [`FailurePolicy::FailFast`] the templates after the first failure
    /// are recorded as skipped.
    pub fn render_all<F>(
        &self,
        templates: &TemplateSet,
        policy: FailurePolicy,
        mut on_rendered: F,
    ) -> RenderReport
    where
        F: FnMut(&RenderedFile),
    {
        let mut report = RenderReport::new();
        let mut iter = templates.iter();

        for template in iter.by_ref() {
            match self.render(template) {
                Ok(file) => {
                    on_rendered(&file);
                    report.add_success(file);
                }
                Err(err) => {
                    tracing::debug!(template = %template, error = %err, "template failed");
                    report.add_failure(err);
                    if policy == FailurePolicy::FailFast {
                        break;
                    }
                }
            }
        }

        report.skipped.extend(iter.cloned());
        tracing::info!(summary = %report.summary(), "generation finished");
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TemplateErrorKind;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        templates: TemplateSet,
        output: PathBuf,
        context: Context,
    }

    fn fixture(files: &[(&str, &str)]) -> Fixture {
        let dir = TempDir::new().unwrap();
        let template_root = dir.path().join("templates");
        for (name, content) in files {
            let path = template_root.join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        fs::create_dir_all(&template_root).unwrap();

        let context = Context::from_yaml(
            r#"
updated: 2024-01-31
countries:
  AD: {length: 24, name: Andorra}
  NL: {length: 18, name: Netherlands}
"#,
        )
        .unwrap();

        Fixture {
            templates: TemplateSet::discover(&template_root, &["j2"]).unwrap(),
            output: dir.path().join("out"),
            _dir: dir,
            context,
        }
    }

    fn renderer(f: &Fixture) -> Renderer {
        Renderer::new(&Engine::default(), &f.templates, &f.context, &f.output)
    }

    fn snapshot_tree(root: &Path) -> BTreeMap<String, String> {
        walkdir::WalkDir::new(root)
            .into_iter()
            .map(Result::unwrap)
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| {
                let rel = entry.path().strip_prefix(root).unwrap();
                (
                    rel.to_string_lossy().replace('\\', "/"),
                    fs::read_to_string(entry.path()).unwrap(),
                )
            })
            .collect()
    }

    #[test]
    fn test_render_mirrors_directories() {
        let f = fixture(&[(
            "nl/garvelink/iban/CountryCodes.java.j2",
            "{% for code in countries %}{{ code }}{% if not loop.last %},{% endif %}{% endfor %}\n",
        )]);
        let template = f.templates.iter().next().unwrap();

        let file = renderer(&f).render(template).unwrap();

        assert_eq!(file.output.name(), "nl/garvelink/iban/CountryCodes.java");
        assert_eq!(
            file.path,
            f.output.join("nl").join("garvelink").join("iban").join("CountryCodes.java")
        );
        assert_eq!(fs::read_to_string(&file.path).unwrap(), "AD,NL\n");
        assert_eq!(file.size, 6);
    }

    #[test]
    fn test_render_all_one_output_per_template() {
        let f = fixture(&[
            ("a.txt.j2", "a"),
            ("sub/b.txt.j2", "b {{ updated | date_time_format('%Y') }}"),
            ("sub/deeper/c.txt.j2", "c"),
        ]);

        let mut seen = Vec::new();
        let report = renderer(&f).render_all(&f.templates, FailurePolicy::FailFast, |file| {
            seen.push(file.output.name().to_string())
        });

        assert!(report.is_success());
        assert_eq!(seen, vec!["a.txt", "sub/b.txt", "sub/deeper/c.txt"]);
        for (template, file) in f.templates.iter().zip(&report.rendered) {
            assert_eq!(&file.template, template);
            assert_eq!(file.output, template.output_ref());
        }
        let listing: Vec<String> = snapshot_tree(&f.output)
            .into_iter()
            .map(|(name, text)| format!("{name} => {}", text.escape_debug()))
            .collect();
        insta::assert_snapshot!(listing.join("\n"), @r"
        a.txt => a\n
        sub/b.txt => b 2024\n
        sub/deeper/c.txt => c\n
        ");
    }

    #[test]
    fn test_rerun_overwrites_and_is_deterministic() {
        let f = fixture(&[("t.txt.j2", "{{ countries.NL.name }}")]);
        fs::create_dir_all(&f.output).unwrap();
        fs::write(f.output.join("t.txt"), "stale content that is longer").unwrap();

        let r = renderer(&f);
        assert!(r.render_all(&f.templates, FailurePolicy::FailFast, |_| {}).is_success());
        let first = snapshot_tree(&f.output);
        assert!(r.render_all(&f.templates, FailurePolicy::FailFast, |_| {}).is_success());
        let second = snapshot_tree(&f.output);

        assert_eq!(first, second);
        assert_eq!(first["t.txt"], "Netherlands\n");
    }

    #[test]
    fn test_fail_fast_stops_at_first_error() {
        let f = fixture(&[
            ("1.txt.j2", "ok"),
            ("2.txt.j2", "{{ countries | flat_get('DE.length') }}"),
            ("3.txt.j2", "never"),
        ]);

        let report = renderer(&f).render_all(&f.templates, FailurePolicy::FailFast, |_| {});

        assert_eq!(report.rendered.len(), 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.skipped, vec![TemplateRef::new("3.txt.j2")]);
        let failure = &report.failures[0];
        assert_eq!(failure.template().name(), "2.txt.j2");
        assert_eq!(
            failure.template_error().map(|e| e.kind()),
            Some(TemplateErrorKind::MissingLookup)
        );
        assert!(!f.output.join("2.txt").exists());
        assert!(!f.output.join("3.txt").exists());
    }

    #[test]
    fn test_keep_going_renders_the_rest() {
        let f = fixture(&[
            ("1.txt.j2", "{{ countries | flat_get('DE.name') | upper }}"),
            ("2.txt.j2", "{% if %}"),
            ("3.txt.j2", "fine"),
        ]);

        let report = renderer(&f).render_all(&f.templates, FailurePolicy::KeepGoing, |_| {});

        assert_eq!(report.failures.len(), 2);
        assert_eq!(report.rendered.len(), 1);
        assert!(report.skipped.is_empty());
        assert_eq!(report.summary(), "2 templates failed, 1 rendered");
        assert_eq!(fs::read_to_string(f.output.join("3.txt")).unwrap(), "fine\n");
    }

    #[test]
    fn test_failed_render_keeps_previous_file() {
        let f = fixture(&[("t.txt.j2", "{{ countries | flat_get('XX.name') }}")]);
        fs::create_dir_all(&f.output).unwrap();
        fs::write(f.output.join("t.txt"), "previous\n").unwrap();

        let err = renderer(&f).render(f.templates.iter().next().unwrap()).unwrap_err();

        assert!(matches!(err, RenderError::Template { .. }));
        assert_eq!(fs::read_to_string(f.output.join("t.txt")).unwrap(), "previous\n");
        let leftovers: Vec<_> = fs::read_dir(&f.output).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn test_stringified_missing_lookup_fails_without_output() {
        let f = fixture(&[(
            "t.txt.j2",
            "static final String X = \"{{ 'x' ~ (countries | flat_get('DE.name')) }}\";",
        )]);

        let err = renderer(&f).render(f.templates.iter().next().unwrap()).unwrap_err();

        assert_eq!(
            err.template_error().map(|e| e.kind()),
            Some(TemplateErrorKind::MissingLookup)
        );
        assert!(!f.output.join("t.txt").exists());
    }

    #[test]
    fn test_undefined_variable_renders_empty_unless_strict() {
        let f = fixture(&[("t.txt.j2", "[{{ nope }}]")]);
        let template = f.templates.iter().next().unwrap();

        let file = renderer(&f).render(template).unwrap();
        assert_eq!(fs::read_to_string(file.path).unwrap(), "[]\n");

        let strict = Engine::builder().strict(true).build();
        let err = Renderer::new(&strict, &f.templates, &f.context, &f.output)
            .render(template)
            .unwrap_err();
        assert_eq!(
            err.template_error().map(|e| e.kind()),
            Some(TemplateErrorKind::UndefinedVariable)
        );
    }

    #[test]
    fn test_include_non_template_partial() {
        let f = fixture(&[
            ("_row.inc", "{{ code }}={{ c.length }}"),
            ("table.txt.j2", "{% for code, c in countries | items %}{% include '_row.inc' %};{% endfor %}"),
        ]);
        assert_eq!(f.templates.len(), 1);

        let report = renderer(&f).render_all(&f.templates, FailurePolicy::FailFast, |_| {});

        assert!(report.is_success());
        assert_eq!(
            fs::read_to_string(f.output.join("table.txt")).unwrap(),
            "AD=24;NL=18;\n"
        );
    }

    #[test]
    fn test_write_error_when_output_is_blocked() {
        let f = fixture(&[("dir/t.txt.j2", "x")]);
        fs::create_dir_all(&f.output).unwrap();
        // A file where the output directory should go
        fs::write(f.output.join("dir"), "").unwrap();

        let err = renderer(&f).render(f.templates.iter().next().unwrap()).unwrap_err();
        assert!(matches!(err, RenderError::Write { .. }));
    }
}
