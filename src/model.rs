// src/model.rs

use chrono::{DateTime, Utc};

/// One commit of the loaded history. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    /// Full object id, unique within the history
    pub id: String,
    pub short_id: String,
    pub author_name: String,
    pub author_email: String,
    pub timestamp: DateTime<Utc>,
    pub subject: String,
    pub body: String,
    /// 0-based index in the full, oldest-first history
    pub position: usize,
}

/// How a file changed in a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Added,
    Modified,
    Renamed,
    Deleted,
}

impl ChangeKind {
    /// Display ordering: added, modified, renamed, deleted.
    pub fn rank(self) -> u8 {
        match self {
            ChangeKind::Added => 0,
            ChangeKind::Modified => 1,
            ChangeKind::Renamed => 2,
            ChangeKind::Deleted => 3,
        }
    }

    pub fn prefix(self) -> char {
        match self {
            ChangeKind::Added => '+',
            ChangeKind::Modified => '~',
            ChangeKind::Renamed => '→',
            ChangeKind::Deleted => '-',
        }
    }
}

/// Change details for one file in a commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub path: String,
    /// Set for renames
    pub previous_path: Option<String>,
    pub kind: ChangeKind,
    pub additions: usize,
    pub deletions: usize,
}

/// Aggregate change statistics of a single commit.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChangeSet {
    pub file_count: usize,
    pub total_additions: usize,
    pub total_deletions: usize,
    pub changes: Vec<FileChange>,
}

impl ChangeSet {
    /// Builds a change set from file changes in fetch order.
    ///
    /// The changes are stably sorted by kind rank, so files of the same kind
    /// keep the order in which they were fetched.
    pub fn from_changes(mut changes: Vec<FileChange>) -> Self {
        changes.sort_by_key(|c| c.kind.rank());
        ChangeSet {
            file_count: changes.len(),
            total_additions: changes.iter().map(|c| c.additions).sum(),
            total_deletions: changes.iter().map(|c| c.deletions).sum(),
            changes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(path: &str, kind: ChangeKind, additions: usize, deletions: usize) -> FileChange {
        FileChange { path: path.to_string(), previous_path: None, kind, additions, deletions }
    }

    #[test]
    fn from_changes_orders_by_kind_and_keeps_fetch_order_within_kind() {
        let set = ChangeSet::from_changes(vec![
            change("gone.rs", ChangeKind::Deleted, 0, 12),
            change("b.rs", ChangeKind::Modified, 3, 1),
            change("moved.rs", ChangeKind::Renamed, 0, 0),
            change("new.rs", ChangeKind::Added, 40, 0),
            change("a.rs", ChangeKind::Modified, 1, 1),
        ]);

        let paths: Vec<&str> = set.changes.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(paths, ["new.rs", "b.rs", "a.rs", "moved.rs", "gone.rs"]);
        assert_eq!(set.file_count, 5);
        assert_eq!(set.total_additions, 44);
        assert_eq!(set.total_deletions, 14);
    }

    #[test]
    fn empty_change_set_has_zero_totals() {
        let set = ChangeSet::from_changes(Vec::new());
        assert_eq!(set, ChangeSet::default());
    }
}
