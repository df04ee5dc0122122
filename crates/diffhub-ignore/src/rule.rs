//! A single parsed ignore rule and its matching logic.

use std::fmt;

use glob::{MatchOptions, Pattern};
use tracing::warn;

/// `*` stays within one path segment; leading dots are not special.
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// One line of an ignore file, resolved against the directory it lives in.
///
/// Rules are immutable once parsed. A rule whose pattern contains a `/` is
/// anchored to its scope directory; otherwise it matches the basename of any
/// path under the scope.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct IgnoreRule {
    pattern: String,
    is_negation: bool,
    is_directory_only: bool,
    source_scope: String,
    anchored: bool,
    glob: Pattern,
}

impl IgnoreRule {
    /// Build a rule from an already-split pattern.
    ///
    /// `pattern` must not carry the leading `!` or the trailing `/`; those are
    /// passed as flags. `scope` is the repository-relative directory of the
    /// ignore file (`""` for the root).
    pub fn new(pattern: &str, is_negation: bool, is_directory_only: bool, scope: &str) -> Self {
        let anchored = pattern.contains('/');
        let body = pattern.trim_start_matches('/');
        let glob = compile(body);

        Self {
            pattern: pattern.to_string(),
            is_negation,
            is_directory_only,
            source_scope: normalize_dir(scope),
            anchored,
            glob,
        }
    }

    /// The pattern text, without `!` prefix or trailing `/`.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn is_negation(&self) -> bool {
        self.is_negation
    }

    pub fn is_directory_only(&self) -> bool {
        self.is_directory_only
    }

    /// Repository-relative directory of the ignore file this rule came from.
    pub fn source_scope(&self) -> &str {
        &self.source_scope
    }

    /// Whether the pattern is anchored to its scope directory.
    pub fn is_anchored(&self) -> bool {
        self.anchored
    }

    /// Test the rule against a normalized, repository-relative path.
    ///
    /// Directory-only rules never match files.
    pub fn matches(&self, path: &str, is_dir: bool) -> bool {
        if self.is_directory_only && !is_dir {
            return false;
        }
        let rel = match self.relative_to_scope(path) {
            Some(rel) if !rel.is_empty() => rel,
            _ => return false,
        };

        if self.anchored {
            self.glob.matches_with(rel, MATCH_OPTIONS)
        } else {
            let basename = rel.rsplit_once('/').map_or(rel, |(_, name)| name);
            self.glob.matches_with(basename, MATCH_OPTIONS)
        }
    }

    fn relative_to_scope<'a>(&self, path: &'a str) -> Option<&'a str> {
        if self.source_scope.is_empty() {
            return Some(path);
        }
        path.strip_prefix(self.source_scope.as_str())?
            .strip_prefix('/')
    }
}

impl fmt::Display for IgnoreRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scope = if self.source_scope.is_empty() {
            "/"
        } else {
            self.source_scope.as_str()
        };
        write!(
            f,
            "{}{}{} (in {})",
            if self.is_negation { "!" } else { "" },
            self.pattern,
            if self.is_directory_only { "/" } else { "" },
            scope
        )
    }
}

/// Strip surrounding slashes and a leading `./` from a directory path.
pub(crate) fn normalize_dir(dir: &str) -> String {
    let dir = dir.replace('\\', "/");
    let dir = dir.strip_prefix("./").unwrap_or(&dir);
    dir.trim_matches('/').to_string()
}

/// Compile a gitignore pattern body into a glob, translating backslash escapes
/// into bracket classes. Syntax the glob crate rejects is matched literally.
fn compile(body: &str) -> Pattern {
    let translated = translate_escapes(body);
    match Pattern::new(&translated) {
        Ok(pattern) => pattern,
        Err(e) => {
            warn!(pattern = body, error = %e, "invalid ignore pattern, matching literally");
            Pattern::new(&Pattern::escape(body)).unwrap_or_default()
        }
    }
}

fn translate_escapes(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(next @ ('*' | '?' | '[' | ']')) => {
                out.push('[');
                out.push(next);
                out.push(']');
            }
            Some(next) => out.push(next),
            None => out.push('\\'),
        }
    }
    out
}
