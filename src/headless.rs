// src/headless.rs

use crate::engine::{ChangeOutcome, Engine, Mode};
use crate::model::CommitRecord;
use crate::runtime::{Flow, Frontend};
use indicatif::ProgressBar;
use std::io::{self, Write};

/// Plays the history to a writer, one line per visited commit.
pub struct Headless<W: Write> {
    out: W,
    bar: ProgressBar,
    /// Position of the last printed commit
    shown: Option<usize>,
    /// Id whose change summary has been printed
    summarized: Option<String>,
    played: bool,
}

impl<W: Write> Headless<W> {
    pub fn new(out: W, bar: ProgressBar) -> Self {
        Headless { out, bar, shown: None, summarized: None, played: false }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    fn print(&mut self, line: String) -> io::Result<()> {
        let out = &mut self.out;
        self.bar.suspend(|| writeln!(out, "{line}"))
    }
}

impl<W: Write> Frontend for Headless<W> {
    fn draw(&mut self, engine: &Engine) -> io::Result<Flow> {
        match engine.mode() {
            Mode::Loading => return Ok(Flow::Continue),
            Mode::Unavailable { .. } => {
                self.bar.abandon();
                return Ok(Flow::Quit);
            }
            _ => {}
        }

        self.bar.set_length(engine.view_len() as u64);
        if let Some(commit) = engine.current_commit() {
            if self.shown != Some(commit.position) {
                self.shown = Some(commit.position);
                self.bar.set_position(engine.cursor().map_or(0, |c| c as u64 + 1));
                self.bar.set_message(format!("{} {}", commit.short_id, engine.speed().label()));
                self.print(commit_line(commit))?;
            }
            if let Some(ChangeOutcome::Loaded(set)) = engine.change_outcome() {
                if self.summarized.as_deref() != Some(commit.id.as_str()) {
                    self.summarized = Some(commit.id.clone());
                    self.print(format!(
                        "        {} file(s)  +{} -{}",
                        set.file_count, set.total_additions, set.total_deletions
                    ))?;
                }
            }
        }

        match engine.mode() {
            Mode::Playing => self.played = true,
            Mode::Ready if self.played || engine.view_len() == 0 => {
                self.bar.finish();
                return Ok(Flow::Quit);
            }
            _ => {}
        }
        Ok(Flow::Continue)
    }
}

fn commit_line(commit: &CommitRecord) -> String {
    format!(
        "{:>5}  {}  {}  {:<20}  {}",
        commit.position + 1,
        commit.short_id,
        commit.timestamp.format("%Y-%m-%d"),
        commit.author_name,
        commit.subject
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::tests::five_commits;
    use crate::engine::EngineConfig;
    use crate::runtime::tests::MemorySource;
    use crate::runtime::Runtime;
    use std::time::Duration;

    fn play(config: EngineConfig, source: MemorySource) -> (Engine, String) {
        let mut runtime = Runtime::new(source);
        let mut engine = Engine::new(config);
        let mut headless = Headless::new(Vec::new(), ProgressBar::hidden());
        runtime.run(&mut engine, &mut headless).unwrap();
        (engine, String::from_utf8(headless.into_inner()).unwrap())
    }

    fn autoplay() -> EngineConfig {
        EngineConfig {
            base_interval: Duration::from_millis(20),
            autoplay: true,
            ..EngineConfig::default()
        }
    }

    #[test]
    fn prints_each_commit_once_in_order() {
        let (engine, out) = play(autoplay(), MemorySource::new(five_commits()));
        let commit_lines: Vec<&str> = out.lines().filter(|l| !l.starts_with("        ")).collect();

        assert_eq!(commit_lines.len(), 5);
        assert!(commit_lines[0].contains("c0") && commit_lines[0].contains("Initial commit"));
        assert!(commit_lines[4].contains("c4") && commit_lines[4].contains("Release v1"));
        assert_eq!(engine.mode(), &Mode::Ready);
    }

    #[test]
    fn plays_only_the_filtered_view() {
        let config = EngineConfig { initial_author: Some("alice".into()), ..autoplay() };
        let (_, out) = play(config, MemorySource::new(five_commits()));
        let commit_lines: Vec<&str> = out.lines().filter(|l| !l.starts_with("        ")).collect();

        assert_eq!(commit_lines.len(), 2);
        assert!(commit_lines[0].contains("Add parser"));
        assert!(commit_lines[1].contains("Write docs"));
    }

    #[test]
    fn empty_view_finishes_immediately() {
        let config = EngineConfig { initial_author: Some("mallory".into()), ..autoplay() };
        let (engine, out) = play(config, MemorySource::new(five_commits()));
        assert!(out.is_empty());
        assert_eq!(engine.cursor(), None);
    }

    #[test]
    fn load_failure_quits() {
        let mut source = MemorySource::new(Vec::new());
        source.fail = true;
        let (engine, out) = play(autoplay(), source);
        assert!(out.is_empty());
        assert!(matches!(engine.mode(), Mode::Unavailable { .. }));
    }
}
