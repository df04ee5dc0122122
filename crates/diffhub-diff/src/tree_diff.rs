//! Tree-level diff: compare two branch listings path by path.

use crate::repository::TreeListing;

/// A single path that differs between two listings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathChange {
    /// Present only in the target branch.
    Added { path: String, new_id: String },
    /// Present only in the source branch.
    Deleted { path: String, old_id: String },
    /// Present in both with different blob ids.
    Modified {
        path: String,
        old_id: String,
        new_id: String,
    },
}

impl PathChange {
    pub fn path(&self) -> &str {
        match self {
            Self::Added { path, .. } | Self::Deleted { path, .. } | Self::Modified { path, .. } => {
                path
            }
        }
    }
}

/// Compare `from` (old side) with `into` (new side).
///
/// Paths with equal blob ids are omitted. Output is ordered by path.
pub fn diff_trees(from: &TreeListing, into: &TreeListing) -> Vec<PathChange> {
    let mut changes = Vec::new();

    for (path, old_id) in from {
        match into.get(path) {
            None => changes.push(PathChange::Deleted {
                path: path.clone(),
                old_id: old_id.clone(),
            }),
            Some(new_id) if new_id != old_id => changes.push(PathChange::Modified {
                path: path.clone(),
                old_id: old_id.clone(),
                new_id: new_id.clone(),
            }),
            Some(_) => {}
        }
    }

    for (path, new_id) in into {
        if !from.contains_key(path) {
            changes.push(PathChange::Added {
                path: path.clone(),
                new_id: new_id.clone(),
            });
        }
    }

    changes.sort_by(|a, b| a.path().cmp(b.path()));
    changes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(entries: &[(&str, &str)]) -> TreeListing {
        entries
            .iter()
            .map(|(p, id)| (p.to_string(), id.to_string()))
            .collect()
    }

    #[test]
    fn identical_trees_no_changes() {
        let tree = listing(&[("a.txt", "1"), ("b/c.txt", "2")]);
        assert!(diff_trees(&tree, &tree).is_empty());
    }

    #[test]
    fn classifies_changes() {
        let from = listing(&[("keep.txt", "1"), ("gone.txt", "2"), ("edit.txt", "3")]);
        let into = listing(&[("keep.txt", "1"), ("edit.txt", "4"), ("new.txt", "5")]);

        let changes = diff_trees(&from, &into);
        assert_eq!(
            changes,
            vec![
                PathChange::Modified {
                    path: "edit.txt".into(),
                    old_id: "3".into(),
                    new_id: "4".into()
                },
                PathChange::Deleted {
                    path: "gone.txt".into(),
                    old_id: "2".into()
                },
                PathChange::Added {
                    path: "new.txt".into(),
                    new_id: "5".into()
                },
            ]
        );
    }

    #[test]
    fn empty_source_all_added() {
        let into = listing(&[("x", "1"), ("y", "2")]);
        let changes = diff_trees(&TreeListing::new(), &into);
        assert!(changes.iter().all(|c| matches!(c, PathChange::Added { .. })));
        assert_eq!(changes.len(), 2);
    }
}
