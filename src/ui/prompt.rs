//! Line-oriented terminal prompts.

use std::io::{BufRead, Write};

use tracing::debug;

use super::Ui;
use crate::i18n;

/// Fallback width when the terminal size is unknown (pipes, tests).
const DEFAULT_COLUMNS: usize = 80;

/// A [`Ui`] that reads answers line by line from `input` and writes
/// prompts and messages to `output`.
///
/// End of input aborts the current question.
pub struct LinePrompt<R, W> {
    input: R,
    output: W,
    columns: Option<usize>,
}

impl<R: BufRead, W: Write> LinePrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            columns: None,
        }
    }

    /// Use a fixed width instead of asking the terminal.
    pub fn with_columns(mut self, columns: usize) -> Self {
        self.columns = Some(columns);
        self
    }

    fn read_line(&mut self) -> Option<String> {
        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
            Err(e) => {
                debug!(error = %e, "Prompt input failed");
                None
            }
        }
    }

    fn show(&mut self, text: &str, newline: bool) {
        let result = if newline {
            writeln!(self.output, "{text}")
        } else {
            write!(self.output, "{text}")
        };
        if let Err(e) = result.and_then(|()| self.output.flush()) {
            debug!(error = %e, "Prompt output failed");
        }
    }
}

impl<R: BufRead, W: Write> Ui for LinePrompt<R, W> {
    fn get_field(&mut self, prompt: &str) -> Option<String> {
        self.show(prompt, false);
        self.read_line()
    }

    fn yes_or_no(&mut self, prompt: &str, default: bool) -> Option<bool> {
        let (yes, no) = (i18n::yes(), i18n::no());
        let hint = if default {
            format!("([{yes}]/{no}): ")
        } else {
            format!("({yes}/[{no}]): ")
        };
        loop {
            self.show(&format!("{prompt} {hint}"), false);
            let answer = self.read_line()?.trim().to_lowercase();
            if answer.is_empty() {
                return Some(default);
            }
            if yes.starts_with(&answer) || answer == "y" {
                return Some(true);
            }
            if no.starts_with(&answer) {
                return Some(false);
            }
        }
    }

    fn message(&mut self, text: &str) {
        self.show(text, true);
    }

    fn error(&mut self, text: &str) {
        self.show(text, true);
    }

    fn pause(&mut self) {
        self.show("-- Press Enter --", false);
        let _ = self.read_line();
    }

    fn columns(&self) -> usize {
        self.columns.unwrap_or_else(|| {
            crossterm::terminal::size()
                .map(|(cols, _)| usize::from(cols))
                .unwrap_or(DEFAULT_COLUMNS)
        })
    }
}
