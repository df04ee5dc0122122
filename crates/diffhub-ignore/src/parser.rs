//! Ignore-file parsing.

use crate::rule::IgnoreRule;

/// Parse the content of one ignore file into an ordered rule list.
///
/// - blank lines and lines starting with `#` are skipped (`\#` is a literal `#`)
/// - a leading `!` negates the rest of the line (`\!` is a literal `!`)
/// - a trailing unescaped `/` makes the rule directory-only
/// - trailing spaces are trimmed unless escaped with `\`
///
/// `scope_dir` is the repository-relative directory the file lives in.
pub fn parse_rules(content: &str, scope_dir: &str) -> Vec<IgnoreRule> {
    content
        .lines()
        .filter_map(|line| parse_line(line, scope_dir))
        .collect()
}

fn parse_line(line: &str, scope_dir: &str) -> Option<IgnoreRule> {
    let line = trim_trailing_whitespace(line);
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let (is_negation, body) = match line.strip_prefix('!') {
        Some(rest) => (true, rest),
        None => (false, line),
    };

    let (is_directory_only, body) = match body.strip_suffix('/') {
        Some(rest) if !rest.ends_with('\\') => (true, rest),
        _ => (false, body),
    };

    if body.is_empty() || body.chars().all(|c| c == '/') {
        return None;
    }

    Some(IgnoreRule::new(body, is_negation, is_directory_only, scope_dir))
}

fn trim_trailing_whitespace(line: &str) -> &str {
    let trimmed = line.trim_end_matches([' ', '\t']);
    if trimmed.len() < line.len() && trimmed.ends_with('\\') {
        // keep the escaped space
        &line[..trimmed.len() + 1]
    } else {
        trimmed
    }
}
