//! Template discovery and template-to-output path mapping

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::DiscoveryError;

/// File extensions that mark a file as a Jinja2 template
pub const DEFAULT_TEMPLATE_SUFFIXES: &[&str] = &["j2", "jinja", "jinja2"];

/// A template, named by its `/`-separated path relative to the template root
///
/// The name is also the key the template engine loads the template under.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TemplateRef {
    name: String,
}

impl TemplateRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Build from a path relative to the template root
    ///
    /// Returns `None` for paths that are not valid UTF-8.
    pub fn from_relative_path(path: &Path) -> Option<Self> {
        let parts: Option<Vec<&str>> = path.components().map(|c| c.as_os_str().to_str()).collect();
        parts.map(|parts| Self::new(parts.join("/")))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Directory portion ("" for templates at the root)
    pub fn dir(&self) -> &str {
        split_name(&self.name).0
    }

    pub fn file_name(&self) -> &str {
        split_name(&self.name).1
    }

    /// Relative filesystem path
    pub fn to_path(&self) -> PathBuf {
        self.name.split('/').collect()
    }

    /// Output location: same directory, file name minus its last suffix
    pub fn output_ref(&self) -> OutputRef {
        let stem = strip_last_suffix(self.file_name());
        let name = match self.dir() {
            "" => stem.to_string(),
            dir => format!("{}/{}", dir, stem),
        };
        OutputRef { name }
    }
}

impl fmt::Display for TemplateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// The generated file for one template, relative to the output root
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OutputRef {
    name: String,
}

impl OutputRef {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dir(&self) -> &str {
        split_name(&self.name).0
    }

    pub fn file_name(&self) -> &str {
        split_name(&self.name).1
    }

    pub fn to_path(&self) -> PathBuf {
        self.name.split('/').collect()
    }

    /// Absolute location under `output_root`
    pub fn resolve(&self, output_root: &Path) -> PathBuf {
        output_root.join(self.to_path())
    }
}

impl fmt::Display for OutputRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

fn split_name(name: &str) -> (&str, &str) {
    match name.rfind('/') {
        Some(idx) => (&name[..idx], &name[idx + 1..]),
        None => ("", name),
    }
}

/// `Countries.java.j2` -> `Countries.java`; dot files keep their name
fn strip_last_suffix(file_name: &str) -> &str {
    match file_name.rfind('.') {
        Some(idx) if idx > 0 => &file_name[..idx],
        _ => file_name,
    }
}

/// The templates found under a template root, in generation order
///
/// Order is lexicographic by template name, so repeated runs over an
/// unchanged tree produce the same sequence. The set can be iterated
/// any number of times.
#[derive(Debug, Clone)]
pub struct TemplateSet {
    root: PathBuf,
    templates: Vec<TemplateRef>,
}

impl TemplateSet {
    /// Scan `root` for files whose last extension is one of `suffixes`
    ///
    /// Suffixes are matched case-insensitively and without the leading dot.
    pub fn discover<S: AsRef<str>>(
        root: impl AsRef<Path>,
        suffixes: &[S],
    ) -> Result<Self, DiscoveryError> {
        let root = root.as_ref();

        if !root.exists() {
            return Err(DiscoveryError::RootNotFound {
                path: root.to_path_buf(),
            });
        }
        if !root.is_dir() {
            return Err(DiscoveryError::RootNotDirectory {
                path: root.to_path_buf(),
            });
        }

        let mut templates = Vec::new();

        for entry in walkdir::WalkDir::new(root).min_depth(1).follow_links(true) {
            let entry = entry.map_err(|source| DiscoveryError::Walk {
                path: root.to_path_buf(),
                source,
            })?;

            if !entry.file_type().is_file() || !has_template_suffix(entry.path(), suffixes) {
                continue;
            }

            let rel_path = entry.path().strip_prefix(root).unwrap_or(entry.path());
            let template = TemplateRef::from_relative_path(rel_path).ok_or_else(|| {
                DiscoveryError::NonUtf8Name {
                    path: entry.path().to_path_buf(),
                }
            })?;
            templates.push(template);
        }

        templates.sort();
        tracing::debug!(
            root = %root.display(),
            count = templates.len(),
            "discovered templates"
        );

        Ok(Self {
            root: root.to_path_buf(),
            templates,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of a template's source file
    pub fn source_path(&self, template: &TemplateRef) -> PathBuf {
        self.root.join(template.to_path())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TemplateRef> {
        self.templates.iter()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl<'a> IntoIterator for &'a TemplateSet {
    type Item = &'a TemplateRef;
    type IntoIter = std::slice::Iter<'a, TemplateRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.templates.iter()
    }
}

fn has_template_suffix<S: AsRef<str>>(path: &Path, suffixes: &[S]) -> bool {
    let Some(ext) = path.extension() else {
        return false;
    };
    let ext = ext.to_string_lossy();
    suffixes
        .iter()
        .any(|s| s.as_ref().trim_start_matches('.').eq_ignore_ascii_case(&ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    fn names(set: &TemplateSet) -> Vec<&str> {
        set.iter().map(TemplateRef::name).collect()
    }

    #[test]
    fn test_output_ref_strips_last_suffix() {
        let template = TemplateRef::new("nl/garvelink/iban/CountryCodes.java.j2");
        let output = template.output_ref();

        assert_eq!(output.name(), "nl/garvelink/iban/CountryCodes.java");
        assert_eq!(output.dir(), template.dir());
        assert_eq!(output.file_name(), "CountryCodes.java");
    }

    #[test]
    fn test_output_ref_at_root() {
        let output = TemplateRef::new("README.md.jinja2").output_ref();
        assert_eq!(output.name(), "README.md");
        assert_eq!(output.dir(), "");
    }

    #[test]
    fn test_output_ref_single_suffix() {
        assert_eq!(TemplateRef::new("a/Makefile.j2").output_ref().name(), "a/Makefile");
        assert_eq!(TemplateRef::new("a/.j2").output_ref().name(), "a/.j2");
    }

    #[test]
    fn test_output_ref_resolve() {
        let output = TemplateRef::new("a/b/c.txt.j2").output_ref();
        assert_eq!(
            output.resolve(Path::new("/out")),
            Path::new("/out").join("a").join("b").join("c.txt")
        );
    }

    #[test]
    fn test_discover_sorted_and_filtered() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "z.txt.j2");
        touch(dir.path(), "a/b.java.jinja2");
        touch(dir.path(), "a-b.java.j2");
        touch(dir.path(), "a/macros.inc");
        touch(dir.path(), "notes.md");
        touch(dir.path(), "upper.txt.J2");

        let set = TemplateSet::discover(dir.path(), DEFAULT_TEMPLATE_SUFFIXES).unwrap();
        assert_eq!(
            names(&set),
            vec!["a-b.java.j2", "a/b.java.jinja2", "upper.txt.J2", "z.txt.j2"]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_discover_follows_symlinks() {
        let dir = TempDir::new().unwrap();
        let shared = TempDir::new().unwrap();
        touch(shared.path(), "common/Header.java.j2");
        touch(dir.path(), "real.txt.j2");
        std::os::unix::fs::symlink(
            shared.path().join("common/Header.java.j2"),
            dir.path().join("linked.txt.j2"),
        )
        .unwrap();
        std::os::unix::fs::symlink(shared.path().join("common"), dir.path().join("common")).unwrap();

        let set = TemplateSet::discover(dir.path(), &["j2"]).unwrap();
        assert_eq!(
            names(&set),
            vec!["common/Header.java.j2", "linked.txt.j2", "real.txt.j2"]
        );
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_discover_rejects_non_utf8_name() {
        use std::os::unix::ffi::OsStrExt;

        let dir = TempDir::new().unwrap();
        touch(dir.path(), "ok.j2");
        let bad = dir.path().join(std::ffi::OsStr::from_bytes(b"bad\xff.j2"));
        fs::write(&bad, "").unwrap();

        let err = TemplateSet::discover(dir.path(), &["j2"]).unwrap_err();
        match err {
            DiscoveryError::NonUtf8Name { path } => assert_eq!(path, bad),
            other => panic!("expected NonUtf8Name, got {:?}", other),
        }
    }

    #[test]
    fn test_discover_is_restartable() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "one.j2");
        touch(dir.path(), "two.j2");

        let set = TemplateSet::discover(dir.path(), &["j2"]).unwrap();
        let first: Vec<_> = set.iter().cloned().collect();
        let second: Vec<_> = (&set).into_iter().cloned().collect();
        assert_eq!(first, second);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_discover_custom_suffix() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "a.tmpl");
        touch(dir.path(), "b.j2");

        let set = TemplateSet::discover(dir.path(), &[".tmpl"]).unwrap();
        assert_eq!(names(&set), vec!["a.tmpl"]);
    }

    #[test]
    fn test_discover_missing_root() {
        let dir = TempDir::new().unwrap();
        let err = TemplateSet::discover(dir.path().join("nope"), DEFAULT_TEMPLATE_SUFFIXES)
            .unwrap_err();
        assert!(matches!(err, DiscoveryError::RootNotFound { .. }));
    }

    #[test]
    fn test_discover_root_is_file() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "file.j2");
        let err = TemplateSet::discover(dir.path().join("file.j2"), DEFAULT_TEMPLATE_SUFFIXES)
            .unwrap_err();
        assert!(matches!(err, DiscoveryError::RootNotDirectory { .. }));
    }

    #[test]
    fn test_source_path() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "x/y.j2");
        let set = TemplateSet::discover(dir.path(), &["j2"]).unwrap();
        let template = set.iter().next().unwrap();
        assert!(set.source_path(template).is_file());
    }
}
