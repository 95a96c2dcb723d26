// src/input.rs

use crate::engine::{Effect, Effects, Engine, Mode};
use crate::playback::SpeedStep;

/// A key press, independent of the terminal backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Enter,
    Esc,
    Backspace,
    Up,
    Down,
    Home,
    End,
    /// Ctrl+C
    Interrupt,
}

/// Routes a key to the handler of the current mode.
///
/// While searching or filtering, printable keys edit the query instead of
/// navigating.
pub fn handle_key(engine: &mut Engine, key: Key) -> Effects {
    if key == Key::Interrupt {
        return vec![Effect::Quit];
    }
    if matches!(engine.mode(), Mode::Searching { .. }) {
        handle_search_key(engine, key)
    } else if matches!(engine.mode(), Mode::Filtering { .. }) {
        handle_filter_key(engine, key)
    } else {
        handle_normal_key(engine, key)
    }
}

fn handle_normal_key(engine: &mut Engine, key: Key) -> Effects {
    match key {
        Key::Char('q') => vec![Effect::Quit],
        Key::Char('j') | Key::Down => engine.advance(),
        Key::Char('k') | Key::Up => engine.retreat(),
        Key::Char('g') | Key::Home => engine.jump_to_first(),
        Key::Char('G') | Key::End => engine.jump_to_last(),
        Key::Char(' ') => engine.toggle_playback(),
        Key::Char('+') | Key::Char('=') => {
            engine.set_speed(SpeedStep::Faster);
            Vec::new()
        }
        Key::Char('-') => {
            engine.set_speed(SpeedStep::Slower);
            Vec::new()
        }
        Key::Char('/') => {
            engine.enter_search();
            Vec::new()
        }
        Key::Char('f') => {
            engine.enter_filter();
            Vec::new()
        }
        Key::Esc => engine.reset_to_start(),
        _ => Vec::new(),
    }
}

fn handle_search_key(engine: &mut Engine, key: Key) -> Effects {
    match key {
        Key::Esc => engine.cancel_search(),
        Key::Enter => return engine.confirm_search(),
        Key::Backspace => {
            if let Some(query) = edited_query(engine.search_query(), None) {
                engine.update_search_query(&query);
            }
        }
        Key::Char(c) => {
            if let Some(query) = edited_query(engine.search_query(), Some(c)) {
                engine.update_search_query(&query);
            }
        }
        _ => {}
    }
    Vec::new()
}

fn handle_filter_key(engine: &mut Engine, key: Key) -> Effects {
    match key {
        Key::Esc => engine.cancel_filter(),
        Key::Enter => return engine.confirm_filter(),
        Key::Backspace => {
            if let Some(query) = edited_query(engine.filter_query(), None) {
                engine.update_filter_query(&query);
            }
        }
        Key::Char(c) => {
            if let Some(query) = edited_query(engine.filter_query(), Some(c)) {
                engine.update_filter_query(&query);
            }
        }
        _ => {}
    }
    Vec::new()
}

/// Appends `typed`, or drops the last char when `typed` is `None`.
/// Returns `None` when nothing changes.
fn edited_query(current: Option<&str>, typed: Option<char>) -> Option<String> {
    let mut query = current.unwrap_or_default().to_string();
    match typed {
        Some(c) if !c.is_control() => query.push(c),
        Some(_) => return None,
        None => {
            query.pop()?;
        }
    }
    Some(query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::tests::five_commits;
    use crate::engine::{EngineConfig, Event, ViewKind};

    fn engine() -> Engine {
        let mut engine = Engine::new(EngineConfig::default());
        engine.handle(Event::HistoryLoaded(Ok(five_commits())));
        engine
    }

    fn type_text(engine: &mut Engine, text: &str) {
        for c in text.chars() {
            handle_key(engine, Key::Char(c));
        }
    }

    #[test]
    fn navigation_keys() {
        let mut engine = engine();
        handle_key(&mut engine, Key::Char('j'));
        handle_key(&mut engine, Key::Down);
        assert_eq!(engine.cursor(), Some(2));
        handle_key(&mut engine, Key::Up);
        assert_eq!(engine.cursor(), Some(1));
        handle_key(&mut engine, Key::Char('G'));
        assert_eq!(engine.cursor(), Some(4));
        handle_key(&mut engine, Key::Home);
        assert_eq!(engine.cursor(), Some(0));
    }

    #[test]
    fn playback_and_speed_keys() {
        let mut engine = engine();
        handle_key(&mut engine, Key::Char('+'));
        handle_key(&mut engine, Key::Char('='));
        assert_eq!(engine.speed().multiplier(), 4.0);
        handle_key(&mut engine, Key::Char('-'));
        assert_eq!(engine.speed().multiplier(), 2.0);
        handle_key(&mut engine, Key::Char(' '));
        assert_eq!(engine.mode(), &Mode::Playing);
        handle_key(&mut engine, Key::Char(' '));
        assert_eq!(engine.mode(), &Mode::Ready);
    }

    #[test]
    fn search_mode_captures_typed_keys() {
        let mut engine = engine();
        handle_key(&mut engine, Key::Char('/'));
        type_text(&mut engine, "jq");
        assert_eq!(engine.search_query(), Some("jq"));
        assert_eq!(engine.cursor(), Some(0), "j must not navigate while searching");

        handle_key(&mut engine, Key::Backspace);
        handle_key(&mut engine, Key::Backspace);
        handle_key(&mut engine, Key::Backspace);
        assert_eq!(engine.search_query(), Some(""));

        type_text(&mut engine, "Docs");
        assert_eq!(engine.search_results(), &[3]);
        handle_key(&mut engine, Key::Enter);
        assert_eq!(engine.cursor(), Some(3));
        assert_eq!(engine.view_kind(), ViewKind::SearchResult);
    }

    #[test]
    fn escape_cancels_search_then_resets() {
        let mut engine = engine();
        handle_key(&mut engine, Key::Char('j'));
        handle_key(&mut engine, Key::Char('/'));
        type_text(&mut engine, "fix");
        handle_key(&mut engine, Key::Esc);
        assert_eq!(engine.mode(), &Mode::Ready);
        assert_eq!(engine.cursor(), Some(1));

        handle_key(&mut engine, Key::Esc);
        assert_eq!(engine.cursor(), Some(0));
    }

    #[test]
    fn filter_mode_confirms_author() {
        let mut engine = engine();
        handle_key(&mut engine, Key::Char('f'));
        type_text(&mut engine, "alicex");
        handle_key(&mut engine, Key::Backspace);
        assert_eq!(engine.filter_query(), Some("alice"));
        let effects = handle_key(&mut engine, Key::Enter);
        assert_eq!(effects, vec![Effect::FetchChangeSet("c1".into())]);
        assert_eq!(engine.view_kind(), ViewKind::Filtered);
        assert_eq!(engine.view_len(), 2);
    }

    #[test]
    fn quit_keys() {
        let mut engine = engine();
        assert_eq!(handle_key(&mut engine, Key::Char('q')), vec![Effect::Quit]);
        handle_key(&mut engine, Key::Char('/'));
        assert!(handle_key(&mut engine, Key::Char('q')).is_empty());
        assert_eq!(engine.search_query(), Some("q"));
        assert_eq!(handle_key(&mut engine, Key::Interrupt), vec![Effect::Quit]);
    }

    #[test]
    fn edited_query_ignores_control_chars_and_empty_backspace() {
        assert_eq!(edited_query(Some("ab"), Some('c')).as_deref(), Some("abc"));
        assert_eq!(edited_query(Some("ab"), None).as_deref(), Some("a"));
        assert_eq!(edited_query(Some(""), None), None);
        assert_eq!(edited_query(Some("ab"), Some('\t')), None);
    }
}
