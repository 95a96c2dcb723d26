// src/terminal.rs

use crate::engine::{Engine, Event};
use crate::input::Key;
use crate::runtime::{Flow, Frontend};
use crate::view::{self, Context, Tone};
use chrono::Utc;
use crossbeam_channel::Sender;
use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{self, Event as TermEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{execute, queue};
use std::io::{self, Stdout, Write};
use std::thread;
use tracing::{debug, warn};

/// Full-screen frontend. Restores the terminal when dropped.
pub struct Terminal {
    out: Stdout,
    context: Context,
}

impl Terminal {
    pub fn enter(context: Context) -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        let mut out = io::stdout();
        execute!(out, EnterAlternateScreen, Hide)?;
        Ok(Terminal { out, context })
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        let _ = execute!(self.out, ResetColor, Show, LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

impl Frontend for Terminal {
    fn draw(&mut self, engine: &Engine) -> io::Result<Flow> {
        let (width, height) = terminal::size()?;
        let frame = view::render(engine, &self.context, width, height, Utc::now());

        for (row, line) in frame.lines.iter().enumerate() {
            queue!(self.out, MoveTo(0, row as u16))?;
            for span in &line.spans {
                queue!(self.out, SetForegroundColor(color(span.tone)), Print(&span.text))?;
            }
            queue!(self.out, ResetColor, Clear(ClearType::UntilNewLine))?;
        }
        queue!(self.out, Clear(ClearType::FromCursorDown))?;
        self.out.flush()?;
        Ok(Flow::Continue)
    }
}

/// Forwards key presses and resizes into the event loop from a background thread.
pub fn spawn_input(tx: Sender<Event>) {
    thread::spawn(move || loop {
        let event = match event::read() {
            Ok(TermEvent::Key(key)) if key.kind == KeyEventKind::Press => match map_key(key) {
                Some(key) => Event::Key(key),
                None => continue,
            },
            Ok(TermEvent::Resize(..)) => Event::Resize,
            Ok(_) => continue,
            Err(e) => {
                warn!(error = %e, "terminal input closed");
                break;
            }
        };
        if tx.send(event).is_err() {
            debug!("event loop gone, stopping input thread");
            break;
        }
    });
}

fn map_key(key: KeyEvent) -> Option<Key> {
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Key::Interrupt),
        KeyCode::Char(c) => Some(Key::Char(c)),
        KeyCode::Enter => Some(Key::Enter),
        KeyCode::Esc => Some(Key::Esc),
        KeyCode::Backspace => Some(Key::Backspace),
        KeyCode::Up => Some(Key::Up),
        KeyCode::Down => Some(Key::Down),
        KeyCode::Home => Some(Key::Home),
        KeyCode::End => Some(Key::End),
        _ => None,
    }
}

fn color(tone: Tone) -> Color {
    match tone {
        Tone::Plain => Color::Reset,
        Tone::Muted => Color::DarkGrey,
        Tone::Accent => Color::Rgb { r: 0x7a, g: 0xa2, b: 0xf7 },
        Tone::Added => Color::Rgb { r: 0x9e, g: 0xce, b: 0x6a },
        Tone::Deleted | Tone::Error => Color::Rgb { r: 0xf7, g: 0x76, b: 0x8e },
        Tone::Renamed => Color::Rgb { r: 0xbb, g: 0x9a, b: 0xf7 },
        Tone::Warning => Color::Rgb { r: 0xe0, g: 0xaf, b: 0x68 },
        Tone::Rgb([r, g, b]) => Color::Rgb { r, g, b },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn keys_map_to_engine_input() {
        assert_eq!(map_key(press(KeyCode::Char('j'), KeyModifiers::NONE)), Some(Key::Char('j')));
        assert_eq!(map_key(press(KeyCode::Char('G'), KeyModifiers::SHIFT)), Some(Key::Char('G')));
        assert_eq!(map_key(press(KeyCode::Char('c'), KeyModifiers::CONTROL)), Some(Key::Interrupt));
        assert_eq!(map_key(press(KeyCode::Esc, KeyModifiers::NONE)), Some(Key::Esc));
        assert_eq!(map_key(press(KeyCode::Tab, KeyModifiers::NONE)), None);
    }

    #[test]
    fn contributor_colors_pass_through() {
        assert_eq!(color(Tone::Rgb([1, 2, 3])), Color::Rgb { r: 1, g: 2, b: 3 });
        assert_eq!(color(Tone::Plain), Color::Reset);
    }
}
