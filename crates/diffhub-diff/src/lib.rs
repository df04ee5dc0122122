//! Diff engine for diffhub.
//!
//! Compares the trees reachable from two branch tips, drops ignored paths,
//! and produces line-level diffs for every file that differs.
//!
//! # Key Types
//!
//! - [`DiffGenerator`] -- branch-to-branch comparison producing a [`diffhub_types::DiffResult`]
//! - [`RepositoryAccess`] -- branch listing, tree listing, and content retrieval
//! - [`GitCliRepository`] -- backend that drives the `git` binary
//! - [`InMemoryRepository`] -- backend for tests and embedding
//! - [`diff_lines`] -- line-level alignment with hunk headers and context

pub mod config;
pub mod error;
pub mod generator;
pub mod git;
pub mod line_diff;
pub mod memory;
pub mod names;
pub mod repository;
pub mod tree_diff;

pub use config::{DiffConfig, LineAlgorithm};
pub use error::{DiffError, Result};
pub use generator::DiffGenerator;
pub use git::GitCliRepository;
pub use line_diff::{decode_text, diff_lines, whole_file};
pub use memory::InMemoryRepository;
pub use names::validate_branch_name;
pub use repository::{RepositoryAccess, TreeListing};
pub use tree_diff::{diff_trees, PathChange};
