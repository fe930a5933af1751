//! Interactive collaborators: prompts, confirmations and status messages.
//!
//! Command handlers only talk to the user through the [`Ui`] trait, so the
//! same flows run against a terminal or against a scripted double in tests.

pub mod prompt;

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::config::QuadOption;

/// Result of a yes/no question that the user may also abort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Yes,
    No,
    Abort,
}

/// What command handlers need from the user interface.
pub trait Ui {
    /// Read one line of input. `None` means the user aborted.
    fn get_field(&mut self, prompt: &str) -> Option<String>;

    /// Ask a yes/no question. `None` means the user aborted.
    fn yes_or_no(&mut self, prompt: &str, default: bool) -> Option<bool>;

    /// Show an informational message.
    fn message(&mut self, text: &str);

    /// Show an error message.
    fn error(&mut self, text: &str);

    /// Wait until the user has seen the last message.
    fn pause(&mut self);

    /// Width of the message line, in columns.
    fn columns(&self) -> usize;
}

/// Answer a quadoption: fixed settings answer without asking.
pub fn query_quadoption(ui: &mut dyn Ui, option: QuadOption, prompt: &str) -> Answer {
    let default = match option {
        QuadOption::Yes => return Answer::Yes,
        QuadOption::No => return Answer::No,
        QuadOption::AskYes => true,
        QuadOption::AskNo => false,
    };
    match ui.yes_or_no(prompt, default) {
        Some(true) => Answer::Yes,
        Some(false) => Answer::No,
        None => Answer::Abort,
    }
}

/// Fit `text` into `width` columns, appending `suffix` (or `ellipsis` when
/// the text had to be cut).
///
/// Display width is measured with `unicode-width`, so wide characters
/// count as two columns.
pub fn fit_prompt(text: &str, width: usize, suffix: &str, ellipsis: &str) -> String {
    if UnicodeWidthStr::width(text) <= width {
        return format!("{text}{suffix}");
    }
    let mut out = String::with_capacity(text.len());
    let mut used = 0;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w > width {
            break;
        }
        used += w;
        out.push(ch);
    }
    out.push_str(ellipsis);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Option<bool>);

    impl Ui for Fixed {
        fn get_field(&mut self, _prompt: &str) -> Option<String> {
            None
        }
        fn yes_or_no(&mut self, _prompt: &str, _default: bool) -> Option<bool> {
            self.0
        }
        fn message(&mut self, _text: &str) {}
        fn error(&mut self, _text: &str) {}
        fn pause(&mut self) {}
        fn columns(&self) -> usize {
            80
        }
    }

    #[test]
    fn test_quadoption_fixed_values_do_not_ask() {
        let mut ui = Fixed(None);
        assert_eq!(query_quadoption(&mut ui, QuadOption::Yes, "?"), Answer::Yes);
        assert_eq!(query_quadoption(&mut ui, QuadOption::No, "?"), Answer::No);
        assert_eq!(
            query_quadoption(&mut ui, QuadOption::AskYes, "?"),
            Answer::Abort
        );
    }

    #[test]
    fn test_quadoption_ask() {
        let mut ui = Fixed(Some(false));
        assert_eq!(query_quadoption(&mut ui, QuadOption::AskYes, "?"), Answer::No);
        let mut ui = Fixed(Some(true));
        assert_eq!(query_quadoption(&mut ui, QuadOption::AskNo, "?"), Answer::Yes);
    }

    #[test]
    fn test_fit_prompt() {
        assert_eq!(fit_prompt("Bounce to a@b", 40, "?", "...?"), "Bounce to a@b?");
        assert_eq!(fit_prompt("Bounce to a@b", 6, "?", "...?"), "Bounce...?");
        // Wide characters take two columns each.
        assert_eq!(fit_prompt("日本語テキスト", 5, "?", "...?"), "日本...?");
    }
}
