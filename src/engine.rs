// src/engine.rs

//! The navigation and playback engine.
//!
//! The engine is a plain state machine. Every event is applied in full by
//! [`Engine::handle`], which returns the asynchronous work the runtime must
//! start ([`Effect`]). Completed work comes back as another [`Event`], so state
//! is only ever touched from the single event loop.

use crate::cache::{ChangeSetCache, Lookup};
use crate::contributors::ContributorRegistry;
use crate::error::HistoryError;
use crate::input::{self, Key};
use crate::model::{ChangeSet, CommitRecord};
use crate::playback::{Speed, SpeedStep, BASE_INTERVAL};
use rayon::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Something that happened outside the engine.
#[derive(Debug)]
pub enum Event {
    HistoryLoaded(Result<Vec<CommitRecord>, HistoryError>),
    ChangeSetLoaded { id: String, result: Result<ChangeSet, HistoryError> },
    /// The playback timer fired
    Tick,
    Key(Key),
    /// The terminal changed size; only the frontend cares
    Resize,
}

/// Work the engine asks the runtime to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    LoadHistory,
    FetchChangeSet(String),
    /// Replace any pending playback tick with one after this delay
    ScheduleTick(Duration),
    Quit,
}

pub type Effects = Vec<Effect>;

/// Interaction mode. Exactly one holds at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Loading,
    /// History could not be loaded; only quitting is possible
    Unavailable { reason: String },
    Ready,
    Playing,
    Searching { query: String, results: Vec<usize> },
    Filtering { query: String },
}

impl Mode {
    pub fn name(&self) -> &'static str {
        match self {
            Mode::Loading => "loading",
            Mode::Unavailable { .. } => "unavailable",
            Mode::Ready => "ready",
            Mode::Playing => "playing",
            Mode::Searching { .. } => "searching",
            Mode::Filtering { .. } => "filtering",
        }
    }
}

/// Which subset of the history the cursor moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    Full,
    Filtered,
    /// Full history, positioned on a confirmed search hit
    SearchResult,
}

/// Change data for the commit under the cursor.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeOutcome {
    Loaded(Arc<ChangeSet>),
    Unavailable(String),
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub base_interval: Duration,
    /// Author filter applied as soon as history loads
    pub initial_author: Option<String>,
    /// Start playing as soon as history loads
    pub autoplay: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig { base_interval: BASE_INTERVAL, initial_author: None, autoplay: false }
    }
}

#[derive(Debug)]
struct Filter {
    author: String,
    positions: Vec<usize>,
}

#[derive(Debug)]
struct SearchHits {
    query: String,
    results: Vec<usize>,
}

pub struct Engine {
    config: EngineConfig,
    history: Arc<[CommitRecord]>,
    contributors: ContributorRegistry,
    cache: ChangeSetCache,
    mode: Mode,
    filter: Option<Filter>,
    /// Hits of the last confirmed search
    search: Option<SearchHits>,
    /// Index into the active view; `None` iff the view is empty
    cursor: Option<usize>,
    speed: Speed,
    /// The change set the cursor is waiting for
    pending_fetch: Option<String>,
    outcome: Option<ChangeOutcome>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Engine {
            config,
            history: Arc::from(Vec::new()),
            contributors: ContributorRegistry::new(),
            cache: ChangeSetCache::new(),
            mode: Mode::Loading,
            filter: None,
            search: None,
            cursor: None,
            speed: Speed::default(),
            pending_fetch: None,
            outcome: None,
        }
    }

    /// Effects to run before the first event.
    pub fn start(&self) -> Effects {
        vec![Effect::LoadHistory]
    }

    pub fn handle(&mut self, event: Event) -> Effects {
        match event {
            Event::HistoryLoaded(result) => self.on_history_loaded(result),
            Event::ChangeSetLoaded { id, result } => {
                self.on_change_set_loaded(&id, result);
                Vec::new()
            }
            Event::Tick => self.tick(),
            Event::Key(key) => input::handle_key(self, key),
            Event::Resize => Vec::new(),
        }
    }

    // ── Observable state ─────────────────────────────────────────────────

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn history(&self) -> &[CommitRecord] {
        &self.history
    }

    pub fn contributors(&self) -> &ContributorRegistry {
        &self.contributors
    }

    pub fn cache(&self) -> &ChangeSetCache {
        &self.cache
    }

    pub fn speed(&self) -> Speed {
        self.speed
    }

    pub fn pending_fetch(&self) -> Option<&str> {
        self.pending_fetch.as_deref()
    }

    /// Change data for the current commit, once it has arrived.
    pub fn change_outcome(&self) -> Option<&ChangeOutcome> {
        self.outcome.as_ref()
    }

    pub fn view_kind(&self) -> ViewKind {
        if self.filter.is_some() {
            ViewKind::Filtered
        } else if self.search.is_some() {
            ViewKind::SearchResult
        } else {
            ViewKind::Full
        }
    }

    pub fn view_len(&self) -> usize {
        match &self.filter {
            Some(filter) => filter.positions.len(),
            None => self.history.len(),
        }
    }

    /// Commits of the active view in chronological order.
    pub fn active_view(&self) -> impl Iterator<Item = &CommitRecord> + '_ {
        (0..self.view_len())
            .filter_map(move |i| self.position_at(i).and_then(|p| self.history.get(p)))
    }

    pub fn current_commit(&self) -> Option<&CommitRecord> {
        let position = self.position_at(self.cursor?)?;
        self.history.get(position)
    }

    pub fn filter_author(&self) -> Option<&str> {
        self.filter.as_ref().map(|f| f.author.as_str())
    }

    /// The query being typed, or the one last confirmed.
    pub fn search_query(&self) -> Option<&str> {
        match &self.mode {
            Mode::Searching { query, .. } => Some(query),
            _ => self.search.as_ref().map(|s| s.query.as_str()),
        }
    }

    /// Positions into the full history matching the current search.
    pub fn search_results(&self) -> &[usize] {
        match &self.mode {
            Mode::Searching { results, .. } => results,
            _ => match &self.search {
                Some(search) => &search.results,
                None => &[],
            },
        }
    }

    pub fn filter_query(&self) -> Option<&str> {
        match &self.mode {
            Mode::Filtering { query } => Some(query),
            _ => None,
        }
    }

    fn position_at(&self, index: usize) -> Option<usize> {
        match &self.filter {
            Some(filter) => filter.positions.get(index).copied(),
            None => (index < self.history.len()).then_some(index),
        }
    }

    fn navigable(&self) -> bool {
        matches!(self.mode, Mode::Ready | Mode::Playing)
    }

    // ── Navigation ───────────────────────────────────────────────────────

    /// Moves one commit forward. At the end this stops playback, if any.
    pub fn advance(&mut self) -> Effects {
        if !self.navigable() {
            return Vec::new();
        }
        match self.cursor {
            Some(index) if index + 1 < self.view_len() => self.move_to(index + 1),
            _ => {
                self.stop_playback();
                Vec::new()
            }
        }
    }

    pub fn retreat(&mut self) -> Effects {
        if !self.navigable() {
            return Vec::new();
        }
        match self.cursor {
            Some(index) if index > 0 => self.move_to(index - 1),
            _ => Vec::new(),
        }
    }

    pub fn jump_to_first(&mut self) -> Effects {
        if !self.navigable() || self.view_len() == 0 {
            return Vec::new();
        }
        self.move_to(0)
    }

    pub fn jump_to_last(&mut self) -> Effects {
        if !self.navigable() || self.view_len() == 0 {
            return Vec::new();
        }
        self.move_to(self.view_len() - 1)
    }

    /// Clears filter and search, stops playback and returns to the first commit.
    pub fn reset_to_start(&mut self) -> Effects {
        if !self.navigable() {
            return Vec::new();
        }
        self.stop_playback();
        self.filter = None;
        self.search = None;
        self.cursor = (!self.history.is_empty()).then_some(0);
        debug!("reset to start");
        self.select_current()
    }

    fn move_to(&mut self, index: usize) -> Effects {
        self.cursor = Some(index);
        self.select_current()
    }

    /// Shows the change set of the commit under the cursor, requesting it if needed.
    fn select_current(&mut self) -> Effects {
        self.outcome = None;
        let Some(id) = self.current_commit().map(|c| c.id.clone()) else {
            self.pending_fetch = None;
            return Vec::new();
        };
        match self.cache.get_or_fetch(&id) {
            Lookup::Ready(set) => {
                self.pending_fetch = None;
                self.outcome = Some(ChangeOutcome::Loaded(set));
                Vec::new()
            }
            Lookup::Pending => {
                debug!(%id, "change set already requested");
                self.pending_fetch = Some(id);
                Vec::new()
            }
            Lookup::Fetch => {
                debug!(%id, "requesting change set");
                self.pending_fetch = Some(id.clone());
                vec![Effect::FetchChangeSet(id)]
            }
        }
    }

    // ── Playback ─────────────────────────────────────────────────────────

    pub fn toggle_playback(&mut self) -> Effects {
        match self.mode {
            Mode::Ready if self.view_len() > 0 => {
                self.mode = Mode::Playing;
                info!(speed = self.speed.multiplier(), "playback started");
                vec![self.next_tick()]
            }
            Mode::Playing => {
                self.stop_playback();
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    /// Changes speed; the new interval applies from the next scheduled tick.
    pub fn set_speed(&mut self, step: SpeedStep) {
        self.speed = self.speed.step(step);
        debug!(speed = self.speed.multiplier(), "speed changed");
    }

    fn tick(&mut self) -> Effects {
        if self.mode != Mode::Playing {
            return Vec::new();
        }
        match self.cursor {
            Some(index) if index + 1 < self.view_len() => {
                let mut effects = self.move_to(index + 1);
                effects.push(self.next_tick());
                effects
            }
            _ => {
                info!("playback reached the end of the view");
                self.stop_playback();
                Vec::new()
            }
        }
    }

    fn next_tick(&self) -> Effect {
        Effect::ScheduleTick(self.speed.interval(self.config.base_interval))
    }

    fn stop_playback(&mut self) {
        if self.mode == Mode::Playing {
            self.mode = Mode::Ready;
            info!("playback stopped");
        }
    }

    // ── Search ───────────────────────────────────────────────────────────

    pub fn enter_search(&mut self) {
        if !self.navigable() {
            return;
        }
        self.stop_playback();
        self.search = None;
        self.mode = Mode::Searching { query: String::new(), results: Vec::new() };
    }

    pub fn update_search_query(&mut self, text: &str) {
        if !matches!(self.mode, Mode::Searching { .. }) {
            return;
        }
        let hits = search_history(&self.history, text);
        if let Mode::Searching { query, results } = &mut self.mode {
            *query = text.to_string();
            *results = hits;
        }
    }

    /// Jumps to the first hit in the full history, if there is one.
    pub fn confirm_search(&mut self) -> Effects {
        if !matches!(self.mode, Mode::Searching { .. }) {
            return Vec::new();
        }
        let (query, results) = match std::mem::replace(&mut self.mode, Mode::Ready) {
            Mode::Searching { query, results } => (query, results),
            _ => return Vec::new(),
        };
        let Some(&first) = results.first() else {
            debug!(%query, "search matched nothing");
            return Vec::new();
        };
        info!(%query, hits = results.len(), "search confirmed");
        self.filter = None;
        self.search = Some(SearchHits { query, results });
        self.move_to(first)
    }

    pub fn cancel_search(&mut self) {
        if matches!(self.mode, Mode::Searching { .. }) {
            self.mode = Mode::Ready;
            self.search = None;
        }
    }

    // ── Filter ───────────────────────────────────────────────────────────

    pub fn enter_filter(&mut self) {
        if !self.navigable() {
            return;
        }
        self.stop_playback();
        self.mode = Mode::Filtering { query: String::new() };
    }

    pub fn update_filter_query(&mut self, text: &str) {
        if let Mode::Filtering { query } = &mut self.mode {
            *query = text.to_string();
        }
    }

    /// Applies the typed author filter; an empty query clears it.
    pub fn confirm_filter(&mut self) -> Effects {
        if !matches!(self.mode, Mode::Filtering { .. }) {
            return Vec::new();
        }
        let query = match std::mem::replace(&mut self.mode, Mode::Ready) {
            Mode::Filtering { query } => query,
            _ => return Vec::new(),
        };
        // A confirmed filter replaces any confirmed search
        self.search = None;
        self.apply_filter(&query);
        self.cursor = (self.view_len() > 0).then_some(0);
        self.select_current()
    }

    pub fn cancel_filter(&mut self) {
        if matches!(self.mode, Mode::Filtering { .. }) {
            self.mode = Mode::Ready;
        }
    }

    fn apply_filter(&mut self, author: &str) {
        if author.is_empty() {
            self.filter = None;
            debug!("filter cleared");
            return;
        }
        let positions = filter_history(&self.history, author);
        info!(author, matches = positions.len(), "filter applied");
        self.filter = Some(Filter { author: author.to_string(), positions });
    }

    // ── Completions ──────────────────────────────────────────────────────

    fn on_history_loaded(&mut self, result: Result<Vec<CommitRecord>, HistoryError>) -> Effects {
        if self.mode != Mode::Loading {
            warn!("ignoring a second history load");
            return Vec::new();
        }
        let commits = match result {
            Ok(commits) => commits,
            Err(e) => {
                warn!(error = %e, "history unavailable");
                self.mode = Mode::Unavailable { reason: e.to_string() };
                return Vec::new();
            }
        };

        self.contributors = ContributorRegistry::from_history(&commits);
        self.history = Arc::from(commits);
        self.mode = Mode::Ready;
        info!(
            commits = self.history.len(),
            contributors = self.contributors.len(),
            "history ready"
        );

        if let Some(author) = self.config.initial_author.clone() {
            self.apply_filter(&author);
        }
        self.cursor = (self.view_len() > 0).then_some(0);
        let mut effects = self.select_current();
        if self.config.autoplay {
            effects.extend(self.toggle_playback());
        }
        effects
    }

    fn on_change_set_loaded(&mut self, id: &str, result: Result<ChangeSet, HistoryError>) {
        let result = result.map_err(|e| e.to_string());
        if let Err(reason) = &result {
            warn!(id, %reason, "change set unavailable");
        }
        let stored = self.cache.complete(id, result);

        if self.pending_fetch.as_deref() != Some(id) {
            debug!(id, "discarding stale change set");
            return;
        }
        self.pending_fetch = None;
        self.outcome = Some(match stored {
            Ok(set) => ChangeOutcome::Loaded(set),
            Err(reason) => ChangeOutcome::Unavailable(reason),
        });
    }
}

/// Positions whose subject, author name or id contain `query`, ignoring case.
fn search_history(history: &[CommitRecord], query: &str) -> Vec<usize> {
    if query.is_empty() {
        return Vec::new();
    }
    let needle = query.to_lowercase();
    history
        .par_iter()
        .filter(|c| {
            c.subject.to_lowercase().contains(&needle)
                || c.author_name.to_lowercase().contains(&needle)
                || c.id.to_lowercase().contains(&needle)
        })
        .map(|c| c.position)
        .collect()
}

/// Positions whose author name or email contain `author`, ignoring case.
fn filter_history(history: &[CommitRecord], author: &str) -> Vec<usize> {
    let needle = author.to_lowercase();
    history
        .par_iter()
        .filter(|c| {
            c.author_name.to_lowercase().contains(&needle)
                || c.author_email.to_lowercase().contains(&needle)
        })
        .map(|c| c.position)
        .collect()
}
