//! Line editing on an interactive terminal.
//!
//! Cursor movement, history and Tab completion against the active shell.
//! Key handling is kept apart from terminal I/O so it can be driven by
//! synthetic key events.

use std::io::{self, Write};

use crossterm::cursor::MoveToColumn;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::queue;
use crossterm::terminal::{self, Clear, ClearType};

const HISTORY_LIMIT: usize = 500;

/// Result of one key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    /// Keep reading.
    Pending,
    /// Several completions match and none can be extended; show them.
    Candidates(Vec<String>),
    /// Enter pressed.
    Submit(String),
    /// Ctrl-C: the line is abandoned.
    Cancel,
    /// Ctrl-D on an empty line.
    Eof,
}

/// Edit buffer with history.
#[derive(Debug, Default)]
pub struct LineEditor {
    buffer: Vec<char>,
    cursor: usize,
    history: Vec<String>,
    history_pos: Option<usize>,
    saved: Vec<char>,
}

impl LineEditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current buffer contents.
    pub fn text(&self) -> String {
        self.buffer.iter().collect()
    }

    /// Apply `key`. `complete` maps the text before the cursor to candidates.
    pub fn handle_key(&mut self, key: KeyEvent, complete: &dyn Fn(&str) -> Vec<String>) -> Edit {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('c') => {
                    self.reset();
                    return Edit::Cancel;
                },
                KeyCode::Char('d') if self.buffer.is_empty() => return Edit::Eof,
                KeyCode::Char('a') => self.cursor = 0,
                KeyCode::Char('e') => self.cursor = self.buffer.len(),
                KeyCode::Char('u') => {
                    self.buffer.drain(..self.cursor);
                    self.cursor = 0;
                },
                KeyCode::Char('w') => self.delete_word_before(),
                _ => {},
            }
            return Edit::Pending;
        }

        match key.code {
            KeyCode::Enter => {
                let line = self.text();
                self.push_history(&line);
                self.reset();
                return Edit::Submit(line);
            },
            KeyCode::Tab => return self.complete(complete),
            KeyCode::Char(c) => {
                self.buffer.insert(self.cursor, c);
                self.cursor += 1;
            },
            KeyCode::Backspace if self.cursor > 0 => {
                self.cursor -= 1;
                self.buffer.remove(self.cursor);
            },
            KeyCode::Delete if self.cursor < self.buffer.len() => {
                self.buffer.remove(self.cursor);
            },
            KeyCode::Left => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Right => self.cursor = (self.cursor + 1).min(self.buffer.len()),
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.buffer.len(),
            KeyCode::Up => self.history_up(),
            KeyCode::Down => self.history_down(),
            _ => {},
        }
        Edit::Pending
    }

    /// Read one line from the terminal in raw mode.
    ///
    /// Returns `None` on Ctrl-D at an empty line.
    pub fn read_line(
        &mut self,
        prompt: &str,
        out: &mut impl Write,
        complete: &dyn Fn(&str) -> Vec<String>,
    ) -> io::Result<Option<String>> {
        let _raw = RawMode::enable()?;
        self.redraw(prompt, out)?;
        loop {
            let Event::Key(key) = event::read()? else {
                continue;
            };
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match self.handle_key(key, complete) {
                Edit::Pending => self.redraw(prompt, out)?,
                Edit::Candidates(list) => {
                    write!(out, "\r\n{}\r\n", list.join("  "))?;
                    self.redraw(prompt, out)?;
                },
                Edit::Cancel => {
                    write!(out, "^C\r\n")?;
                    self.redraw(prompt, out)?;
                },
                Edit::Submit(line) => {
                    write!(out, "\r\n")?;
                    out.flush()?;
                    return Ok(Some(line));
                },
                Edit::Eof => {
                    write!(out, "\r\n")?;
                    out.flush()?;
                    return Ok(None);
                },
            }
        }
    }

    fn redraw(&self, prompt: &str, out: &mut impl Write) -> io::Result<()> {
        let column = prompt.chars().count() + self.cursor;
        queue!(out, MoveToColumn(0), Clear(ClearType::CurrentLine))?;
        write!(out, "{prompt}{}", self.text())?;
        queue!(out, MoveToColumn(u16::try_from(column).unwrap_or(u16::MAX)))?;
        out.flush()
    }

    /// Complete the word before the cursor.
    ///
    /// A single candidate replaces the word; several extend it to their
    /// common prefix, or are handed back for display when nothing can be
    /// added.
    fn complete(&mut self, complete: &dyn Fn(&str) -> Vec<String>) -> Edit {
        let head: String = self.buffer[..self.cursor].iter().collect();
        let candidates = complete(&head);

        let word_len = self.buffer[..self.cursor]
            .iter()
            .rev()
            .take_while(|c| !c.is_whitespace())
            .count();
        let start = self.cursor - word_len;
        let first_word = self.buffer[..start].iter().all(|c| c.is_whitespace());

        let replacement = match candidates.as_slice() {
            [] => return Edit::Pending,
            [only] if first_word => format!("{only} "),
            [only] => only.clone(),
            many => {
                let common = common_prefix(many);
                if common.chars().count() <= word_len {
                    return Edit::Candidates(candidates);
                }
                common
            },
        };
        let tail = self.buffer.split_off(self.cursor);
        self.buffer.truncate(start);
        self.buffer.extend(replacement.chars());
        self.cursor = self.buffer.len();
        self.buffer.extend(tail);
        Edit::Pending
    }

    fn delete_word_before(&mut self) {
        while self.cursor > 0 && self.buffer[self.cursor - 1].is_whitespace() {
            self.cursor -= 1;
            self.buffer.remove(self.cursor);
        }
        while self.cursor > 0 && !self.buffer[self.cursor - 1].is_whitespace() {
            self.cursor -= 1;
            self.buffer.remove(self.cursor);
        }
    }

    fn push_history(&mut self, line: &str) {
        if line.trim().is_empty() || self.history.last().is_some_and(|last| last == line) {
            return;
        }
        self.history.push(line.to_string());
        if self.history.len() > HISTORY_LIMIT {
            self.history.remove(0);
        }
    }

    fn history_up(&mut self) {
        let pos = match self.history_pos {
            None if self.history.is_empty() => return,
            None => {
                self.saved = std::mem::take(&mut self.buffer);
                self.history.len() - 1
            },
            Some(0) => return,
            Some(pos) => pos - 1,
        };
        self.recall(pos);
    }

    fn history_down(&mut self) {
        match self.history_pos {
            None => {},
            Some(pos) if pos + 1 < self.history.len() => self.recall(pos + 1),
            Some(_) => {
                self.history_pos = None;
                self.buffer = std::mem::take(&mut self.saved);
                self.cursor = self.buffer.len();
            },
        }
    }

    fn recall(&mut self, pos: usize) {
        self.history_pos = Some(pos);
        self.buffer = self.history[pos].chars().collect();
        self.cursor = self.buffer.len();
    }

    fn reset(&mut self) {
        self.buffer.clear();
        self.cursor = 0;
        self.history_pos = None;
        self.saved.clear();
    }
}

fn common_prefix(words: &[String]) -> String {
    let Some((first, rest)) = words.split_first() else {
        return String::new();
    };
    let mut prefix: Vec<char> = first.chars().collect();
    for word in rest {
        let shared = prefix
            .iter()
            .zip(word.chars())
            .take_while(|(a, b)| **a == *b)
            .count();
        prefix.truncate(shared);
    }
    prefix.into_iter().collect()
}

/// Raw terminal mode for as long as the guard lives.
struct RawMode;

impl RawMode {
    fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}
