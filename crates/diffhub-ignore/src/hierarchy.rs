//! Layered loading of ignore files from the repository root downwards.
//!
//! Rules from deeper directories are appended after rules from shallower
//! ones, so under last-match-wins they override their ancestors.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::error::{IgnoreError, IgnoreResult};
use crate::matcher;
use crate::parser::parse_rules;
use crate::rule::{normalize_dir, IgnoreRule};

/// File name of a per-directory ignore file.
pub const DEFAULT_IGNORE_FILE: &str = ".gitignore";

/// Provides the content of the ignore file of a directory.
pub trait IgnoreSource {
    /// Content of the ignore file in `dir` (repository-relative, `""` for the
    /// root), or `Ok(None)` if the directory has none.
    fn read_ignore_file(&self, dir: &str) -> IgnoreResult<Option<String>>;
}

impl<S: IgnoreSource + ?Sized> IgnoreSource for &S {
    fn read_ignore_file(&self, dir: &str) -> IgnoreResult<Option<String>> {
        (**self).read_ignore_file(dir)
    }
}

/// Reads ignore files from a directory tree on disk.
#[derive(Clone, Debug)]
pub struct FsIgnoreSource {
    root: PathBuf,
    file_name: String,
}

impl FsIgnoreSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            file_name: DEFAULT_IGNORE_FILE.to_string(),
        }
    }

    /// Use a different per-directory file name.
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl IgnoreSource for FsIgnoreSource {
    fn read_ignore_file(&self, dir: &str) -> IgnoreResult<Option<String>> {
        let path = self.root.join(dir).join(&self.file_name);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(IgnoreError::Read { path, source }),
        }
    }
}

/// Ignore files held in memory, keyed by repository-relative directory.
#[derive(Clone, Debug, Default)]
pub struct MemoryIgnoreSource {
    files: BTreeMap<String, String>,
}

impl MemoryIgnoreSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, dir: &str, content: impl Into<String>) {
        self.files.insert(normalize_dir(dir), content.into());
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl<D: AsRef<str>, C: Into<String>> FromIterator<(D, C)> for MemoryIgnoreSource {
    fn from_iter<T: IntoIterator<Item = (D, C)>>(iter: T) -> Self {
        let mut source = Self::new();
        for (dir, content) in iter {
            source.insert(dir.as_ref(), content);
        }
        source
    }
}

impl IgnoreSource for MemoryIgnoreSource {
    fn read_ignore_file(&self, dir: &str) -> IgnoreResult<Option<String>> {
        Ok(self.files.get(dir).cloned())
    }
}

/// Collect the rules that apply inside `relative_dir` of the repository at
/// `repo_root`, reading each directory's `.gitignore` top-down.
pub fn load_hierarchical_rules(repo_root: &Path, relative_dir: &str) -> IgnoreResult<Vec<IgnoreRule>> {
    load_rules_from(&FsIgnoreSource::new(repo_root), relative_dir)
}

/// Same as [`load_hierarchical_rules`] over an arbitrary [`IgnoreSource`].
pub fn load_rules_from<S: IgnoreSource + ?Sized>(
    source: &S,
    relative_dir: &str,
) -> IgnoreResult<Vec<IgnoreRule>> {
    let dir = checked_dir(relative_dir)?;
    let mut rules = Vec::new();
    for scope in scopes(&dir) {
        if let Some(content) = source.read_ignore_file(scope)? {
            let parsed = parse_rules(&content, scope);
            debug!(scope, count = parsed.len(), "loaded ignore rules");
            rules.extend(parsed);
        }
    }
    Ok(rules)
}

/// Caches the rule list of every directory it has seen, so each ignore file
/// is read and parsed once per matcher.
pub struct IgnoreMatcher<S> {
    source: S,
    cache: HashMap<String, Arc<Vec<IgnoreRule>>>,
}

impl<S: IgnoreSource> IgnoreMatcher<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            cache: HashMap::new(),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// All rules applying inside `dir`, shallowest first.
    pub fn rules_for_dir(&mut self, dir: &str) -> IgnoreResult<Arc<Vec<IgnoreRule>>> {
        let dir = checked_dir(dir)?;
        self.rules_for_normalized(&dir)
    }

    /// Whether the repository-relative file `path` is ignored.
    pub fn is_ignored(&mut self, path: &str) -> IgnoreResult<bool> {
        let normalized = normalize_dir(path);
        let parent = normalized
            .rsplit_once('/')
            .map_or("", |(parent, _)| parent)
            .to_string();
        let rules = self.rules_for_dir(&parent)?;
        Ok(matcher::is_ignored(path, &rules))
    }

    fn rules_for_normalized(&mut self, dir: &str) -> IgnoreResult<Arc<Vec<IgnoreRule>>> {
        if let Some(rules) = self.cache.get(dir) {
            return Ok(Arc::clone(rules));
        }

        let mut rules = match dir.rsplit_once('/') {
            Some((parent, _)) => self.rules_for_normalized(parent)?.as_ref().clone(),
            None if dir.is_empty() => Vec::new(),
            None => self.rules_for_normalized("")?.as_ref().clone(),
        };
        if let Some(content) = self.source.read_ignore_file(dir)? {
            rules.extend(parse_rules(&content, dir));
        }

        let rules = Arc::new(rules);
        self.cache.insert(dir.to_string(), Arc::clone(&rules));
        Ok(rules)
    }
}

/// `a/b` yields `""`, `a`, `a/b`.
fn scopes(dir: &str) -> impl Iterator<Item = &str> {
    let inner = dir.match_indices('/').map(move |(i, _)| &dir[..i]);
    let last = (!dir.is_empty()).then_some(dir);
    std::iter::once("").chain(inner).chain(last)
}

fn checked_dir(dir: &str) -> IgnoreResult<String> {
    let dir = normalize_dir(dir);
    if dir.split('/').any(|c| c == "..") {
        return Err(IgnoreError::OutsideRoot(dir));
    }
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn scopes_walk_top_down() {
        assert_eq!(scopes("").collect::<Vec<_>>(), vec![""]);
        assert_eq!(scopes("a").collect::<Vec<_>>(), vec!["", "a"]);
        assert_eq!(scopes("a/b/c").collect::<Vec<_>>(), vec!["", "a", "a/b", "a/b/c"]);
    }

    #[test]
    fn loads_rules_top_down_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), ".gitignore", "*.log\n");
        write(dir.path(), "src/.gitignore", "!keep.log\n");
        write(dir.path(), "src/deep/.gitignore", "*.tmp\n");
        write(dir.path(), "other/.gitignore", "*.rs\n");

        let rules = load_hierarchical_rules(dir.path(), "src/deep").unwrap();
        let scopes: Vec<&str> = rules.iter().map(|r| r.source_scope()).collect();
        assert_eq!(scopes, vec!["", "src", "src/deep"]);

        assert!(matcher::is_ignored("src/deep/x.log", &rules));
        assert!(!matcher::is_ignored("src/deep/keep.log", &rules));
        assert!(matcher::is_ignored("src/deep/a.tmp", &rules));
        assert!(!matcher::is_ignored("src/deep/a.rs", &rules));
    }

    #[test]
    fn missing_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let rules = load_hierarchical_rules(dir.path(), "a/b").unwrap();
        assert!(rules.is_empty());
    }

    #[test]
    fn parent_traversal_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_hierarchical_rules(dir.path(), "a/../../etc").unwrap_err();
        assert!(matches!(err, IgnoreError::OutsideRoot(_)));
    }

    #[test]
    fn custom_file_name() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), ".diffignore", "*.bin\n");
        let source = FsIgnoreSource::new(dir.path()).with_file_name(".diffignore");
        let rules = load_rules_from(&source, "").unwrap();
        assert_eq!(rules.len(), 1);
    }

    #[test]
    fn memory_source_and_matcher() {
        let source: MemoryIgnoreSource = [("", "*.log\n"), ("docs", "!*.log\n")]
            .into_iter()
            .collect();
        let mut matcher = IgnoreMatcher::new(source);

        assert!(matcher.is_ignored("debug.log").unwrap());
        assert!(matcher.is_ignored("src/debug.log").unwrap());
        assert!(!matcher.is_ignored("docs/debug.log").unwrap());
        assert!(!matcher.is_ignored("docs/api/debug.log").unwrap());
        assert!(!matcher.is_ignored("file.txt").unwrap());
    }

    #[test]
    fn matcher_caches_per_directory() {
        let source: MemoryIgnoreSource = [("", "a\n"), ("x", "b\n")].into_iter().collect();
        let mut matcher = IgnoreMatcher::new(source);
        let first = matcher.rules_for_dir("x/y").unwrap();
        let second = matcher.rules_for_dir("x/y/").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn matcher_agrees_with_flat_loading() {
        let source: MemoryIgnoreSource = [("", "build/\n*.o\n"), ("lib", "!*.o\n")]
            .into_iter()
            .collect();
        let flat = load_rules_from(&source, "lib/sub").unwrap();
        let mut matcher = IgnoreMatcher::new(&source);
        for path in ["lib/sub/a.o", "lib/build/a.c", "a.o", "lib/sub/b.c"] {
            assert_eq!(
                matcher.is_ignored(path).unwrap(),
                matcher::is_ignored(path, &flat),
                "{path}"
            );
        }
    }
}
