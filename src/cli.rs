// src/cli.rs

use crate::error::HistoryError;
use crate::history;
use clap::Parser;
use std::path::PathBuf;

/// Replay a repository's commit history like a movie
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the git repository
    #[arg(default_value = ".")]
    pub directory: PathBuf,

    /// Branch to walk (default: the current branch)
    #[arg(short, long)]
    pub branch: Option<String>,

    /// Maximum number of commits to load, most recent first; 0 loads everything
    #[arg(long = "max", default_value_t = 500)]
    pub max_count: usize,

    /// Start with the history filtered to one author
    #[arg(long)]
    pub author: Option<String>,

    /// Start playing as soon as the history is loaded
    #[arg(long)]
    pub play: bool,

    /// Print the playback to stdout instead of opening the interactive view
    #[arg(long)]
    pub headless: bool,

    /// Write logs to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

/// Everything resolved from the command line before playback starts.
#[derive(Debug, Clone)]
pub struct Session {
    pub root: PathBuf,
    pub branch: String,
    pub max_count: usize,
    pub author: Option<String>,
    pub autoplay: bool,
    pub headless: bool,
}

impl Args {
    pub fn into_session(self) -> Result<Session, HistoryError> {
        let root = std::path::absolute(&self.directory).unwrap_or_else(|_| self.directory.clone());
        if !root.is_dir() {
            return Err(HistoryError::NotADirectory(root));
        }
        if !history::is_repository(&root) {
            return Err(HistoryError::NotARepository(root));
        }
        let branch = self.branch.unwrap_or_else(|| history::default_branch(&root));
        Ok(Session {
            root,
            branch,
            max_count: self.max_count,
            author: self.author.filter(|a| !a.is_empty()),
            autoplay: self.play || self.headless,
            headless: self.headless,
        })
    }
}
