// src/runtime.rs

//! The serial event loop.
//!
//! Every state change happens on the thread that calls [`Runtime::run`]. The
//! history load and change-set fetches run on the rayon pool and report back
//! through the same channel as key presses, so the engine only ever sees one
//! event at a time.

use crate::engine::{Effect, Effects, Engine, Event};
use crate::error::AppError;
use crate::history::HistorySource;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::io;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, trace};

/// Whether the loop should keep going after a draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Shows the engine state after each event.
pub trait Frontend {
    fn draw(&mut self, engine: &Engine) -> io::Result<Flow>;
}

pub struct Runtime<S> {
    source: Arc<S>,
    tx: Sender<Event>,
    rx: Receiver<Event>,
    /// The single pending playback tick
    next_tick: Option<Instant>,
}

impl<S: HistorySource + 'static> Runtime<S> {
    pub fn new(source: S) -> Self {
        let (tx, rx) = unbounded();
        Runtime { source: Arc::new(source), tx, rx, next_tick: None }
    }

    /// Sender for producers outside the loop, such as a terminal input thread.
    pub fn sender(&self) -> Sender<Event> {
        self.tx.clone()
    }

    pub fn run<F: Frontend>(
        &mut self,
        engine: &mut Engine,
        frontend: &mut F,
    ) -> Result<(), AppError> {
        if self.dispatch(engine.start()) == Flow::Quit {
            return Ok(());
        }
        loop {
            if frontend.draw(engine)? == Flow::Quit {
                break;
            }
            let event = match self.next_event() {
                Some(event) => event,
                None => break,
            };
            trace!(?event, mode = engine.mode().name(), "event");
            let effects = engine.handle(event);
            if self.dispatch(effects) == Flow::Quit {
                break;
            }
        }
        debug!("event loop finished");
        Ok(())
    }

    /// Waits for the next event, turning an expired deadline into a tick.
    fn next_event(&mut self) -> Option<Event> {
        match self.next_tick {
            Some(deadline) => match self.rx.recv_deadline(deadline) {
                Ok(event) => Some(event),
                Err(RecvTimeoutError::Timeout) => {
                    self.next_tick = None;
                    Some(Event::Tick)
                }
                Err(RecvTimeoutError::Disconnected) => None,
            },
            None => self.rx.recv().ok(),
        }
    }

    fn dispatch(&mut self, effects: Effects) -> Flow {
        for effect in effects {
            match effect {
                Effect::LoadHistory => {
                    let source = Arc::clone(&self.source);
                    let tx = self.tx.clone();
                    rayon::spawn(move || {
                        let _ = tx.send(Event::HistoryLoaded(source.load_history()));
                    });
                }
                Effect::FetchChangeSet(id) => {
                    let source = Arc::clone(&self.source);
                    let tx = self.tx.clone();
                    rayon::spawn(move || {
                        let result = source.load_change_set(&id);
                        let _ = tx.send(Event::ChangeSetLoaded { id, result });
                    });
                }
                Effect::ScheduleTick(delay) => self.next_tick = Some(Instant::now() + delay),
                Effect::Quit => return Flow::Quit,
            }
        }
        Flow::Continue
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::engine::tests::{change_set, five_commits};
    use crate::engine::{ChangeOutcome, EngineConfig, Mode};
    use crate::error::{HistoryError, Result};
    use crate::input::Key;
    use crate::model::{ChangeSet, CommitRecord};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Serves a fixed history from memory and counts fetches.
    pub(crate) struct MemorySource {
        pub commits: Vec<CommitRecord>,
        pub fetches: AtomicUsize,
        pub fail: bool,
    }

    impl MemorySource {
        pub(crate) fn new(commits: Vec<CommitRecord>) -> Self {
            MemorySource { commits, fetches: AtomicUsize::new(0), fail: false }
        }
    }

    impl HistorySource for MemorySource {
        fn load_history(&self) -> Result<Vec<CommitRecord>> {
            if self.fail {
                return Err(HistoryError::NotARepository("/nowhere".into()));
            }
            Ok(self.commits.clone())
        }

        fn load_change_set(&self, id: &str) -> Result<ChangeSet> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let position = self.commits.iter().position(|c| c.id == id);
            position
                .map(|p| change_set(p + 1))
                .ok_or_else(|| HistoryError::InvalidIdentifier(id.to_string()))
        }
    }

    /// Records each visited commit and quits once playback is over.
    struct Recorder {
        visited: Vec<usize>,
        played: bool,
        draws: usize,
    }

    impl Frontend for Recorder {
        fn draw(&mut self, engine: &Engine) -> io::Result<Flow> {
            self.draws += 1;
            if let Some(cursor) = engine.cursor() {
                if self.visited.last() != Some(&cursor) {
                    self.visited.push(cursor);
                }
            }
            match engine.mode() {
                Mode::Playing => self.played = true,
                Mode::Ready if self.played => return Ok(Flow::Quit),
                Mode::Unavailable { .. } => return Ok(Flow::Quit),
                _ => {}
            }
            Ok(Flow::Continue)
        }
    }

    fn autoplay() -> EngineConfig {
        EngineConfig {
            base_interval: Duration::from_millis(5),
            autoplay: true,
            ..EngineConfig::default()
        }
    }

    #[test]
    fn autoplay_visits_every_commit_then_stops() {
        let mut runtime = Runtime::new(MemorySource::new(five_commits()));
        let mut engine = Engine::new(autoplay());
        let mut recorder = Recorder { visited: Vec::new(), played: false, draws: 0 };

        runtime.run(&mut engine, &mut recorder).unwrap();

        assert_eq!(recorder.visited, [0, 1, 2, 3, 4]);
        assert_eq!(engine.mode(), &Mode::Ready);
        assert_eq!(engine.cursor(), Some(4));
        assert!(runtime.source.fetches.load(Ordering::SeqCst) <= 5);
    }

    #[test]
    fn load_failure_reaches_the_frontend() {
        let mut source = MemorySource::new(Vec::new());
        source.fail = true;
        let mut runtime = Runtime::new(source);
        let mut engine = Engine::new(EngineConfig::default());
        let mut recorder = Recorder { visited: Vec::new(), played: false, draws: 0 };

        runtime.run(&mut engine, &mut recorder).unwrap();
        assert!(matches!(engine.mode(), Mode::Unavailable { .. }));
        assert!(recorder.draws >= 2);
    }

    #[test]
    fn quit_key_ends_the_loop_and_change_sets_arrive() {
        /// Presses `q` once the first change set is on screen.
        struct QuitOnceShown {
            tx: Sender<Event>,
            sent: bool,
        }
        impl Frontend for QuitOnceShown {
            fn draw(&mut self, engine: &Engine) -> io::Result<Flow> {
                if !self.sent && engine.change_outcome().is_some() {
                    self.sent = true;
                    self.tx.send(Event::Key(Key::Char('q'))).unwrap();
                }
                Ok(Flow::Continue)
            }
        }

        let mut runtime = Runtime::new(MemorySource::new(five_commits()));
        let mut engine = Engine::new(EngineConfig::default());
        let mut frontend = QuitOnceShown { tx: runtime.sender(), sent: false };

        runtime.run(&mut engine, &mut frontend).unwrap();
        assert!(frontend.sent);
        assert_eq!(engine.cursor(), Some(0));
        let outcome = engine.change_outcome();
        assert!(matches!(outcome, Some(ChangeOutcome::Loaded(set)) if set.total_additions == 1));
    }
}
