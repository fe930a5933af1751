//! `%`-templates for quote prefixes, attribution lines and forward banners.
//!
//! | Sequence | Expands to                               |
//! |----------|------------------------------------------|
//! | `%a`     | sender address                           |
//! | `%n`     | sender name, or address when unnamed     |
//! | `%f`     | full `From:` line value                  |
//! | `%s`     | subject                                  |
//! | `%d`     | date, formatted with `date_format`       |
//! | `%i`     | message-id                               |
//! | `%%`     | a literal `%`                            |
//!
//! Unknown sequences are kept as written.

use crate::config::ComposeConfig;
use crate::model::address::format_list;
use crate::model::mail::Envelope;

/// Expand `template` against the fields of `env`.
pub fn expand(template: &str, env: &Envelope, compose: &ComposeConfig) -> String {
    let sender = env.from.first();
    let mut out = String::with_capacity(template.len() + 32);
    let mut chars = template.chars();

    while let Some(ch) = chars.next() {
        if ch != '%' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('a') => out.push_str(sender.map_or("", |a| a.address.as_str())),
            Some('n') => out.push_str(sender.map_or("", |a| {
                if a.display_name.is_empty() {
                    a.address.as_str()
                } else {
                    a.display_name.as_str()
                }
            })),
            Some('f') => out.push_str(&format_list(&env.from)),
            Some('s') => out.push_str(env.subject.as_deref().unwrap_or("")),
            Some('d') => {
                if let Some(date) = env.date {
                    out.push_str(&date.format(&compose.date_format).to_string());
                }
            }
            Some('i') => out.push_str(env.message_id.as_deref().unwrap_or("")),
            Some('%') => out.push('%'),
            Some(other) => {
                out.push('%');
                out.push(other);
            }
            None => out.push('%'),
        }
    }
    out
}

/// The quote prefix: an explicit one wins, then the configured template,
/// and with flowed text the bare `>`.
pub fn quote_prefix(explicit: Option<&str>, env: &Envelope, compose: &ComposeConfig) -> String {
    match explicit {
        Some(prefix) => prefix.to_string(),
        None if !compose.text_flowed => expand(&compose.indent_string, env, compose),
        None => ">".to_string(),
    }
}

/// Attribution line written above a quoted message, with its line break.
pub fn attribution(env: &Envelope, compose: &ComposeConfig) -> String {
    line(&compose.attribution, env, compose)
}

/// Line written below a quoted message; empty when unset.
pub fn post_indent(env: &Envelope, compose: &ComposeConfig) -> String {
    line(&compose.post_indent_string, env, compose)
}

/// Banner above a forwarded message, followed by a blank line.
pub fn forward_intro(env: &Envelope, compose: &ComposeConfig) -> String {
    if compose.forward_intro.is_empty() {
        return String::new();
    }
    format!("{}\n\n", expand(&compose.forward_intro, env, compose))
}

/// Banner below a forwarded message, preceded by a blank line.
pub fn forward_trailer(env: &Envelope, compose: &ComposeConfig) -> String {
    if compose.forward_trailer.is_empty() {
        return String::new();
    }
    format!("\n{}\n", expand(&compose.forward_trailer, env, compose))
}

fn line(template: &str, env: &Envelope, compose: &ComposeConfig) -> String {
    if template.is_empty() {
        return String::new();
    }
    format!("{}\n", expand(template, env, compose))
}
