// src/history.rs

use crate::error::{HistoryError, Result};
use crate::model::*;
use chrono::{TimeZone, Utc};
use git2::{
    Commit, Delta, DiffFile, DiffFindOptions, DiffOptions, ErrorCode, Oid, Patch, Repository, Sort,
};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Where commits and their change statistics come from.
///
/// Implementations are called off the event loop, so they must be shareable
/// across threads.
pub trait HistorySource: Send + Sync {
    /// Loads the history oldest-first with positions `0..n`.
    fn load_history(&self) -> Result<Vec<CommitRecord>>;

    /// Computes the change set of a single commit.
    fn load_change_set(&self, id: &str) -> Result<ChangeSet>;
}

/// Reads history from a git repository on disk.
#[derive(Debug, Clone)]
pub struct GitSource {
    root: PathBuf,
    branch: String,
    /// 0 means no limit
    max_count: usize,
}

impl GitSource {
    pub fn new(root: impl Into<PathBuf>, branch: impl Into<String>, max_count: usize) -> Self {
        GitSource { root: root.into(), branch: branch.into(), max_count }
    }

    fn open(&self) -> Result<Repository> {
        open_repository(&self.root)
    }
}

impl HistorySource for GitSource {
    fn load_history(&self) -> Result<Vec<CommitRecord>> {
        let repo = self.open()?;
        info!(
            root = %self.root.display(),
            branch = %self.branch,
            max = self.max_count,
            "loading history"
        );

        let Some(tip) = resolve_tip(&repo, &self.branch)? else {
            info!("branch has no commits yet");
            return Ok(Vec::new());
        };

        let mut revwalk = repo.revwalk()?;
        revwalk.push(tip)?;
        revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;

        // Newest first, so the limit keeps the most recent commits
        let limit = if self.max_count == 0 { usize::MAX } else { self.max_count };
        let mut oids = Vec::new();
        for oid in revwalk.take(limit) {
            oids.push(oid?);
        }
        oids.reverse();

        let mut commits = Vec::with_capacity(oids.len());
        for oid in oids {
            let commit = match repo.find_commit(oid) {
                Ok(commit) => commit,
                Err(e) => {
                    warn!(%oid, error = %e, "skipping unreadable commit");
                    continue;
                }
            };
            match to_record(&commit, commits.len()) {
                Some(record) => commits.push(record),
                None => warn!(%oid, "skipping malformed commit"),
            }
        }

        info!(count = commits.len(), "history loaded");
        Ok(commits)
    }

    fn load_change_set(&self, id: &str) -> Result<ChangeSet> {
        let repo = self.open()?;
        let oid = Oid::from_str(id).map_err(|_| HistoryError::InvalidIdentifier(id.to_string()))?;
        let commit = repo.find_commit(oid)?;

        // Merges are compared against their first parent
        let parent_tree = if commit.parent_count() > 0 {
            Some(commit.parent(0)?.tree()?)
        } else {
            None
        };
        let current_tree = commit.tree()?;

        let mut diff_opts = DiffOptions::new();
        diff_opts.include_untracked(false);
        diff_opts.ignore_filemode(true);

        let mut diff = repo.diff_tree_to_tree(
            parent_tree.as_ref(),
            Some(&current_tree),
            Some(&mut diff_opts),
        )?;
        let mut find_opts = DiffFindOptions::new();
        find_opts.renames(true);
        diff.find_similar(Some(&mut find_opts))?;

        let mut changes = Vec::new();
        for (idx, delta) in diff.deltas().enumerate() {
            let kind = match delta.status() {
                Delta::Added | Delta::Copied => ChangeKind::Added,
                Delta::Deleted => ChangeKind::Deleted,
                Delta::Renamed => ChangeKind::Renamed,
                Delta::Modified | Delta::Typechange => ChangeKind::Modified,
                _ => continue,
            };
            let old_path = file_path(&delta.old_file());
            let new_path = file_path(&delta.new_file());
            let path = match kind {
                ChangeKind::Deleted => old_path.clone(),
                _ => new_path.or_else(|| old_path.clone()),
            };
            let Some(path) = path else { continue };

            // Binary files have no line stats
            let (additions, deletions) = match Patch::from_diff(&diff, idx)? {
                Some(patch) => {
                    let (_, additions, deletions) = patch.line_stats()?;
                    (additions, deletions)
                }
                None => (0, 0),
            };

            changes.push(FileChange {
                path,
                previous_path: if kind == ChangeKind::Renamed { old_path } else { None },
                kind,
                additions,
                deletions,
            });
        }

        debug!(id, files = changes.len(), "change set computed");
        Ok(ChangeSet::from_changes(changes))
    }
}

/// Whether `path` lies inside a git repository.
pub fn is_repository(path: &Path) -> bool {
    Repository::discover(path).is_ok()
}

/// Name of the checked-out branch, or `HEAD` when detached or unborn.
pub fn default_branch(path: &Path) -> String {
    Repository::discover(path)
        .ok()
        .and_then(|repo| {
            let head = repo.head().ok()?;
            if head.is_branch() {
                head.shorthand().map(String::from)
            } else {
                None
            }
        })
        .unwrap_or_else(|| "HEAD".to_string())
}

fn open_repository(root: &Path) -> Result<Repository> {
    Repository::discover(root).map_err(|e| match e.code() {
        ErrorCode::NotFound => HistoryError::NotARepository(root.to_path_buf()),
        _ => HistoryError::Git(e),
    })
}

/// Resolves the commit to walk from; `None` for an unborn HEAD.
fn resolve_tip(repo: &Repository, branch: &str) -> Result<Option<Oid>> {
    if branch.is_empty() || branch == "HEAD" {
        return match repo.head() {
            Ok(head) => Ok(Some(head.peel_to_commit()?.id())),
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => Ok(None),
            Err(e) => Err(e.into()),
        };
    }
    let commit = repo.revparse_single(branch)?.peel_to_commit()?;
    Ok(Some(commit.id()))
}

fn to_record(commit: &Commit, position: usize) -> Option<CommitRecord> {
    let author = commit.author();
    let author_name = author.name()?.to_string();
    let author_email = author.email()?.to_string();
    let timestamp = Utc.timestamp_opt(commit.time().seconds(), 0).single()?;

    let id = commit.id().to_string();
    let short_id = commit
        .as_object()
        .short_id()
        .ok()
        .and_then(|buf| buf.as_str().map(String::from))
        .unwrap_or_else(|| id.chars().take(7).collect());

    let message = String::from_utf8_lossy(commit.message_bytes()).into_owned();
    let mut parts = message.splitn(2, '\n');
    let subject = parts.next().unwrap_or("").trim().to_string();
    let body = parts.next().unwrap_or("").trim().to_string();

    Some(CommitRecord {
        id,
        short_id,
        author_name,
        author_email,
        timestamp,
        subject,
        body,
        position,
    })
}

fn file_path(file: &DiffFile) -> Option<String> {
    file.path().map(|p| p.to_string_lossy().into_owned())
}
