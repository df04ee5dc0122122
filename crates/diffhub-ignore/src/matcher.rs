//! Last-match-wins evaluation of an ordered rule list.

use crate::rule::IgnoreRule;

/// Why a path is (or is not) ignored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict<'a> {
    /// No rule matched the path or any of its ancestors.
    Unmatched,
    /// The last matching rule was a non-negated rule.
    Ignored(&'a IgnoreRule),
    /// The last matching rule was a negation.
    Included(&'a IgnoreRule),
    /// An ancestor directory is excluded. A non-negated directory-only rule
    /// excludes it outright. Any other rule excludes it only when no later
    /// rule matches the path itself.
    ExcludedDirectory {
        directory: String,
        rule: &'a IgnoreRule,
    },
}

impl Verdict<'_> {
    pub fn is_ignored(&self) -> bool {
        matches!(self, Self::Ignored(_) | Self::ExcludedDirectory { .. })
    }

    /// The rule that decided the outcome, if any.
    pub fn rule(&self) -> Option<&IgnoreRule> {
        match self {
            Self::Unmatched => None,
            Self::Ignored(rule) | Self::Included(rule) => Some(rule),
            Self::ExcludedDirectory { rule, .. } => Some(rule),
        }
    }
}

/// Returns `true` if `path` is excluded by `rules`.
///
/// `path` is repository-relative; a trailing `/` marks it as a directory.
/// The result depends only on `path` and the ordered rule list.
pub fn is_ignored(path: &str, rules: &[IgnoreRule]) -> bool {
    explain(path, rules).is_ignored()
}

/// Evaluate `path` against `rules` and report the deciding rule.
pub fn explain<'a>(path: &str, rules: &'a [IgnoreRule]) -> Verdict<'a> {
    let (path, is_dir) = normalize_path(path);
    if path.is_empty() {
        return Verdict::Unmatched;
    }

    let hard = ancestors(&path).find_map(|directory| {
        rules
            .iter()
            .find(|r| !r.is_negation() && r.is_directory_only() && r.matches(directory, true))
            .map(|rule| (directory, rule))
    });
    if let Some((directory, rule)) = hard {
        return Verdict::ExcludedDirectory {
            directory: directory.to_string(),
            rule,
        };
    }

    let own = last_match(&path, is_dir, rules);
    let inherited = ancestors(&path)
        .filter_map(|directory| {
            last_match(directory, true, rules)
                .filter(|(_, r)| !r.is_negation())
                .map(|(index, rule)| (index, directory, rule))
        })
        .max_by_key(|(index, _, _)| *index);

    match (own, inherited) {
        (Some((own_index, _)), Some((index, directory, rule))) if index > own_index => {
            Verdict::ExcludedDirectory {
                directory: directory.to_string(),
                rule,
            }
        }
        (None, Some((_, directory, rule))) => Verdict::ExcludedDirectory {
            directory: directory.to_string(),
            rule,
        },
        (Some((_, rule)), _) if rule.is_negation() => Verdict::Included(rule),
        (Some((_, rule)), _) => Verdict::Ignored(rule),
        (None, None) => Verdict::Unmatched,
    }
}

/// The last rule matching `path`, with its position in `rules`.
fn last_match<'a>(
    path: &str,
    is_dir: bool,
    rules: &'a [IgnoreRule],
) -> Option<(usize, &'a IgnoreRule)> {
    rules
        .iter()
        .enumerate()
        .rev()
        .find(|(_, r)| r.matches(path, is_dir))
}

/// Proper ancestors of `path`, shallowest first: `a/b/c` yields `a`, `a/b`.
fn ancestors(path: &str) -> impl Iterator<Item = &str> {
    path.match_indices('/').map(move |(i, _)| &path[..i])
}

fn normalize_path(path: &str) -> (String, bool) {
    let path = path.replace('\\', "/");
    let is_dir = path.ends_with('/');
    let path = path.strip_prefix("./").unwrap_or(&path);
    (path.trim_matches('/').to_string(), is_dir)
}
