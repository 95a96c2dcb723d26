// src/view.rs

//! Presentation of the engine state.
//!
//! [`render`] is a pure function of the engine: it never writes back and the
//! same state always produces the same frame. Backends only map [`Tone`]s to
//! colors and print the lines.

use crate::engine::{ChangeOutcome, Engine, Mode, ViewKind};
use crate::model::{ChangeKind, CommitRecord};
use chrono::{DateTime, Utc};

/// Rows taken by everything but the body
const CHROME_ROWS: usize = 8;
const MIN_BAR_WIDTH: usize = 10;
const KEY_HELP: &str =
    "Space play/pause  j/k step  +/- speed  g/G first/last  f filter  / search  Esc reset  q quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Plain,
    Muted,
    Accent,
    Added,
    Deleted,
    Renamed,
    Warning,
    Error,
    Rgb([u8; 3]),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub tone: Tone,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Line {
    pub spans: Vec<Span>,
}

impl Line {
    fn new() -> Self {
        Self::default()
    }

    fn plain(text: impl Into<String>) -> Self {
        Line::new().push(text, Tone::Plain)
    }

    fn push(mut self, text: impl Into<String>, tone: Tone) -> Self {
        self.spans.push(Span { text: text.into(), tone });
        self
    }

    /// The line's text without styling.
    #[cfg(test)]
    pub fn text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }

    #[cfg(test)]
    fn width(&self) -> usize {
        self.spans.iter().map(|s| s.text.chars().count()).sum()
    }

    fn clip(mut self, width: usize) -> Self {
        let mut remaining = width;
        for span in &mut self.spans {
            let len = span.text.chars().count();
            if len > remaining {
                span.text = span.text.chars().take(remaining).collect();
            }
            remaining -= span.text.chars().count();
        }
        self.spans.retain(|s| !s.text.is_empty());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    pub lines: Vec<Line>,
}

/// What the engine does not know about the session.
#[derive(Debug, Clone)]
pub struct Context {
    pub repo: String,
    pub branch: String,
}

pub fn render(
    engine: &Engine,
    context: &Context,
    width: u16,
    height: u16,
    now: DateTime<Utc>,
) -> Frame {
    let width = usize::from(width).max(20);
    let height = usize::from(height);
    let body_rows = height.saturating_sub(CHROME_ROWS).max(1);

    let rule = Line::new().push("─".repeat(width), Tone::Muted);
    let mut lines = vec![header(engine, context), legend(engine), rule.clone()];
    let mut body = body(engine, context, width, now);
    body.truncate(body_rows);
    body.resize(body_rows, Line::new());
    lines.extend(body);
    lines.push(rule);
    lines.extend(timeline(engine, width));
    lines.push(status_bar(engine));

    lines.truncate(height);
    Frame { lines: lines.into_iter().map(|l| l.clip(width)).collect() }
}

fn header(engine: &Engine, context: &Context) -> Line {
    Line::new()
        .push(" git-reel ", Tone::Accent)
        .push(format!(" {}", context.repo), Tone::Muted)
        .push("  branch: ", Tone::Muted)
        .push(context.branch.clone(), Tone::Accent)
        .push(format!("  {} commits", engine.history().len()), Tone::Muted)
}

fn legend(engine: &Engine) -> Line {
    let mut line = Line::new().push(" ", Tone::Plain);
    for contributor in engine.contributors().iter() {
        let tag = format!("{} {}  ", contributor.symbol, contributor.name);
        line = line.push(tag, Tone::Rgb(contributor.color));
    }
    if !engine.contributors().is_empty() {
        line = line.push(format!("{} authors", engine.contributors().len()), Tone::Muted);
    }
    if let Some(author) = engine.filter_author() {
        line = line.push(format!("  filter: {author}"), Tone::Warning);
    }
    line
}

fn body(engine: &Engine, context: &Context, width: usize, now: DateTime<Utc>) -> Vec<Line> {
    match engine.mode() {
        Mode::Loading => {
            return vec![
                Line::new(),
                Line::new()
                    .push(format!("  Loading git history for {}…", context.repo), Tone::Accent),
                Line::new().push("  Reading commits, building author registry…", Tone::Muted),
            ]
        }
        Mode::Unavailable { reason } => {
            return vec![
                Line::new(),
                Line::new().push(format!("  Error: {reason}"), Tone::Error),
                Line::new(),
                Line::new().push("  Press q to quit.", Tone::Muted),
            ]
        }
        Mode::Searching { .. } => return search_results(engine, width),
        _ => {}
    }

    if engine.history().is_empty() {
        return vec![
            Line::new(),
            Line::new().push("  No commits found in this branch.", Tone::Muted),
        ];
    }
    match engine.current_commit() {
        Some(commit) => commit_detail(engine, commit, width, now),
        None => vec![
            Line::new(),
            Line::new().push(
                format!("  No commits by \"{}\".", engine.filter_author().unwrap_or_default()),
                Tone::Warning,
            ),
            Line::new().push("  Press f to change the filter or Esc to clear it.", Tone::Muted),
        ],
    }
}

fn commit_detail(
    engine: &Engine,
    commit: &CommitRecord,
    width: usize,
    now: DateTime<Utc>,
) -> Vec<Line> {
    let mut lines = Vec::new();
    lines.push(
        Line::new()
            .push(format!("  {}", commit.short_id), Tone::Accent)
            .push(format!("  {}", commit.id), Tone::Muted),
    );
    lines.push(Line::plain(format!("  {}", commit.subject)));

    let (symbol, tone) = match engine.contributors().lookup(&commit.author_email) {
        Some(c) => (c.symbol, Tone::Rgb(c.color)),
        None => ('●', Tone::Accent),
    };
    lines.push(
        Line::new()
            .push(format!("  {symbol} {}", commit.author_name), tone)
            .push(format!(" <{}>", commit.author_email), Tone::Muted),
    );
    lines.push(
        Line::new()
            .push(format!("  {}", commit.timestamp.format("%b %d, %Y %H:%M")), Tone::Plain)
            .push(format!("  ·  {}", relative_time(commit.timestamp, now)), Tone::Muted),
    );
    for body_line in commit.body.lines().take(4) {
        lines.push(Line::new().push(format!("    {body_line}"), Tone::Muted));
    }
    lines.push(Line::new());

    match engine.change_outcome() {
        None => lines.push(Line::new().push("  loading changes…", Tone::Muted)),
        Some(ChangeOutcome::Unavailable(reason)) => {
            let text = format!("  no change data available ({reason})");
            lines.push(Line::new().push(text, Tone::Warning))
        }
        Some(ChangeOutcome::Loaded(set)) => {
            lines.push(
                Line::new()
                    .push(format!("  +{}", set.total_additions), Tone::Added)
                    .push(format!("  -{}", set.total_deletions), Tone::Deleted)
                    .push(format!("  {} file(s) changed", set.file_count), Tone::Muted),
            );
            for change in &set.changes {
                let path = match &change.previous_path {
                    Some(previous) => format!("{previous} → {}", change.path),
                    None => change.path.clone(),
                };
                let stats = format!("  +{} -{}", change.additions, change.deletions);
                let room = width.saturating_sub(stats.chars().count() + 6);
                lines.push(
                    Line::new()
                        .push(format!("    {} ", change.kind.prefix()), kind_tone(change.kind))
                        .push(truncate(&path, room), Tone::Plain)
                        .push(stats, Tone::Muted),
                );
            }
        }
    }
    lines
}

fn search_results(engine: &Engine, width: usize) -> Vec<Line> {
    let query = engine.search_query().unwrap_or_default();
    if query.is_empty() {
        return vec![Line::new().push("  Type to search subjects, authors and ids.", Tone::Muted)];
    }
    let results = engine.search_results();
    if results.is_empty() {
        return vec![Line::new().push(format!("  No commits match \"{query}\"."), Tone::Warning)];
    }
    results
        .iter()
        .filter_map(|&position| engine.history().get(position))
        .map(|commit| {
            Line::new()
                .push(format!("  {:>5}  ", commit.position + 1), Tone::Muted)
                .push(format!("{}  ", commit.short_id), Tone::Accent)
                .push(truncate(&commit.subject, width.saturating_sub(40)), Tone::Plain)
                .push(format!("  {}", commit.author_name), Tone::Muted)
        })
        .collect()
}

fn timeline(engine: &Engine, width: usize) -> Vec<Line> {
    let total = engine.view_len();
    let play_icon =
        if *engine.mode() == Mode::Playing { ("⏸", Tone::Error) } else { ("▶", Tone::Accent) };
    let speed = engine.speed().label();
    let bar_width = width.saturating_sub(speed.chars().count() + 8).max(MIN_BAR_WIDTH);

    let filled = match (engine.cursor(), total) {
        (Some(_), 1) => bar_width,
        (Some(index), total) => {
            ((index as f64 / (total - 1) as f64) * bar_width as f64).round() as usize
        }
        (None, _) => 0,
    };
    let bar = Line::new()
        .push(format!(" {} ", play_icon.0), play_icon.1)
        .push(format!("{speed}  "), Tone::Muted)
        .push("━".repeat(filled), Tone::Accent)
        .push("─".repeat(bar_width - filled), Tone::Muted);

    let mut position = Line::new().push(
        match engine.cursor() {
            Some(index) => format!(" {}/{total} ", index + 1),
            None => format!(" 0/{total} "),
        },
        Tone::Muted,
    );
    if let Some((badge, tone)) = view_badge(engine) {
        position = position.push(badge, tone);
    }
    if let Some(commit) = engine.current_commit() {
        let author = engine.contributors().lookup(&commit.author_email);
        if let Some(c) = author {
            position = position.push(format!("{} ", c.symbol), Tone::Rgb(c.color));
        }
        position = position
            .push(format!("{}  ", commit.short_id), Tone::Accent)
            .push(truncate(&commit.subject, width.saturating_sub(40)), Tone::Plain)
            .push(format!("  {}", commit.timestamp.format("%b %d, %Y")), Tone::Muted);
    }
    vec![bar, author_strip(engine, width), position]
}

/// Which subset the cursor walks, when it is not the full history.
fn view_badge(engine: &Engine) -> Option<(String, Tone)> {
    match engine.view_kind() {
        ViewKind::Full => None,
        ViewKind::Filtered => {
            let author = engine.filter_author().unwrap_or_default();
            Some((format!("[filter: {author}] "), Tone::Warning))
        }
        ViewKind::SearchResult => {
            let query = engine.search_query().unwrap_or_default();
            let hits = engine.search_results().len();
            Some((format!("[search: {query}, {hits} hits] "), Tone::Accent))
        }
    }
}

/// Contributor symbols of the active view around the cursor.
fn author_strip(engine: &Engine, width: usize) -> Line {
    let mut line = Line::new().push(" ", Tone::Plain);
    let Some(cursor) = engine.cursor() else {
        return line;
    };
    let slots = (width.saturating_sub(2) / 2).max(1);
    let start = cursor.saturating_sub(slots / 2).min(engine.view_len().saturating_sub(slots));
    for (index, commit) in engine.active_view().enumerate().skip(start).take(slots) {
        let (symbol, tone) = match engine.contributors().lookup(&commit.author_email) {
            Some(c) => (c.symbol, Tone::Rgb(c.color)),
            None => ('·', Tone::Muted),
        };
        if index == cursor {
            line = line.push("▸", Tone::Accent).push(symbol.to_string(), tone);
        } else {
            line = line.push(format!(" {symbol}"), tone);
        }
    }
    line
}

fn status_bar(engine: &Engine) -> Line {
    match engine.mode() {
        Mode::Searching { query, results } => {
            let mut line =
                Line::new().push("  / ", Tone::Accent).push(format!("{query}█"), Tone::Plain);
            if !query.is_empty() {
                line = line.push(format!("  {} results", results.len()), Tone::Muted);
            }
            line
        }
        Mode::Filtering { query } => Line::new()
            .push("  filter author: ", Tone::Warning)
            .push(format!("{query}█"), Tone::Plain),
        Mode::Loading | Mode::Unavailable { .. } => Line::new().push("  q quit", Tone::Muted),
        _ => {
            let mut line = Line::new().push("  ", Tone::Plain).push(KEY_HELP, Tone::Muted);
            if let Some(id) = engine.pending_fetch() {
                line = line.push(format!("  fetching {}", &id[..id.len().min(7)]), Tone::Muted);
            }
            line
        }
    }
}

fn kind_tone(kind: ChangeKind) -> Tone {
    match kind {
        ChangeKind::Added => Tone::Added,
        ChangeKind::Modified => Tone::Warning,
        ChangeKind::Renamed => Tone::Renamed,
        ChangeKind::Deleted => Tone::Deleted,
    }
}

/// Cuts `text` to `max` chars, ending in `…` when shortened.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    if max < 3 {
        return "…".to_string();
    }
    let mut out: String = text.chars().take(max - 1).collect();
    out.push('…');
    out
}

/// Human-friendly age of `then` as seen at `now`.
pub fn relative_time(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(then);
    let plural = |n: i64, unit: &str| {
        if n == 1 {
            format!("1 {unit} ago")
        } else {
            format!("{n} {unit}s ago")
        }
    };
    let days = elapsed.num_days();
    match () {
        _ if elapsed.num_minutes() < 1 => "just now".to_string(),
        _ if elapsed.num_hours() < 1 => plural(elapsed.num_minutes(), "minute"),
        _ if days < 1 => plural(elapsed.num_hours(), "hour"),
        _ if days == 1 => "yesterday".to_string(),
        _ if days < 30 => format!("{days} days ago"),
        _ if days < 365 => plural(days / 30, "month"),
        _ => plural(days / 365, "year"),
    }
}
