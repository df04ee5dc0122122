//! Hierarchical ignore-rule engine.
//!
//! Decides which repository paths take part in a diff. Rules are parsed from
//! ignore files (`.gitignore` syntax), collected top-down from the repository
//! root to a directory, and evaluated with a "last matching rule wins" policy.
//!
//! # Evaluation
//!
//! 1. An ancestor directory matched by a non-negated directory-only rule
//!    (`build/`) excludes the path unconditionally, regardless of later
//!    negations.
//! 2. Otherwise the last rule matching the path or excluding one of its
//!    ancestors decides: a negation on the path re-includes it, any other
//!    rule ignores it.
//! 3. No matching rule means the path is not ignored.
//!
//! # Modules
//!
//! - [`rule`]: [`IgnoreRule`] and single-rule matching
//! - [`parser`]: [`parse_rules`]
//! - [`matcher`]: [`is_ignored`], [`explain`], [`Verdict`]
//! - [`hierarchy`]: [`load_hierarchical_rules`], [`IgnoreSource`], [`IgnoreMatcher`]

pub mod error;
pub mod hierarchy;
pub mod matcher;
pub mod parser;
pub mod rule;

pub use error::{IgnoreError, IgnoreResult};
pub use hierarchy::{
    load_hierarchical_rules, load_rules_from, FsIgnoreSource, IgnoreMatcher, IgnoreSource,
    MemoryIgnoreSource, DEFAULT_IGNORE_FILE,
};
pub use matcher::{explain, is_ignored, Verdict};
pub use parser::parse_rules;
pub use rule::IgnoreRule;
