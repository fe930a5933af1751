//! RFC 5322 header parsing: folding, encoded-words (RFC 2047), envelopes,
//! and header weeding/reordering for display.

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::config::HeaderConfig;
use crate::model::address::EmailAddress;
use crate::model::mail::Envelope;

/// Headers that only make sense inside a local mailbox and are dropped
/// when a message is copied for transmission.
const LOCAL_HEADERS: &[&str] = &[
    "status",
    "x-status",
    "x-keywords",
    "x-label",
    "x-uid",
    "content-length",
    "lines",
    "x-mozilla-status",
    "x-mozilla-status2",
];

/// One header field as it appeared in the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderField {
    /// Field name with its original spelling.
    pub name: String,
    /// Unfolded value, leading/trailing whitespace removed.
    pub value: String,
    /// The field exactly as written, continuation lines included,
    /// without the final line break.
    pub raw: String,
}

impl HeaderField {
    fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// Which transformations to apply when rendering a header block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeaderStyle {
    /// Unfold and decode RFC 2047 encoded-words.
    pub decode: bool,
    /// Drop fields hidden by the ignore/unignore lists.
    pub weed: bool,
    /// Sort fields by the configured order.
    pub reorder: bool,
    /// Drop local mailbox bookkeeping fields.
    pub xmit: bool,
}

/// Build an [`Envelope`] from raw header bytes.
pub fn parse_envelope(raw_headers: &[u8]) -> Envelope {
    let fields = parse_fields(raw_headers);
    let get = |name: &str| {
        fields
            .iter()
            .find(|f| f.is(name))
            .map(|f| f.value.as_str())
    };
    let addresses =
        |name: &str| EmailAddress::parse_list(&decode_encoded_words(get(name).unwrap_or("")));

    Envelope {
        from: addresses("from"),
        to: addresses("to"),
        cc: addresses("cc"),
        bcc: addresses("bcc"),
        reply_to: addresses("reply-to"),
        mail_followup_to: addresses("mail-followup-to"),
        subject: get("subject").map(decode_encoded_words),
        message_id: get("message-id").map(extract_angle_bracket),
        in_reply_to: get("in-reply-to")
            .map(extract_all_angle_brackets)
            .unwrap_or_default(),
        references: get("references")
            .map(extract_all_angle_brackets)
            .unwrap_or_default(),
        date: get("date").and_then(parse_date),
    }
}

/// Split a header block into fields.
///
/// Continuation lines (starting with space or tab) belong to the previous
/// field. Parsing stops at the first empty line. A leading mbox `From `
/// line and lines without a colon are skipped.
pub fn parse_fields(raw_headers: &[u8]) -> Vec<HeaderField> {
    let text = decode_header_bytes(raw_headers);
    let mut result: Vec<HeaderField> = Vec::new();

    for line in text.lines() {
        if line.is_empty() {
            break;
        }
        if line.starts_with(' ') || line.starts_with('\t') {
            if let Some(last) = result.last_mut() {
                last.value.push(' ');
                last.value.push_str(line.trim());
                last.raw.push('\n');
                last.raw.push_str(line);
            }
        } else if line.starts_with("From ") && result.is_empty() {
            continue;
        } else if let Some(colon_pos) = line.find(':') {
            result.push(HeaderField {
                name: line[..colon_pos].trim().to_string(),
                value: line[colon_pos + 1..].trim().to_string(),
                raw: line.to_string(),
            });
        }
    }

    result
}

/// Render a header block as display lines (no trailing newlines).
pub fn render_fields(raw_headers: &[u8], style: HeaderStyle, config: &HeaderConfig) -> Vec<String> {
    let mut fields = parse_fields(raw_headers);

    if style.xmit {
        fields.retain(|f| !LOCAL_HEADERS.iter().any(|h| f.is(h)));
    }
    if style.weed {
        fields.retain(|f| !is_ignored(&f.name, config));
    }
    if style.reorder {
        // Stable: unlisted fields keep their relative order after the listed ones.
        fields.sort_by_key(|f| {
            config
                .order
                .iter()
                .position(|o| f.is(o))
                .unwrap_or(config.order.len())
        });
    }

    fields
        .into_iter()
        .map(|f| {
            if style.decode {
                format!("{}: {}", f.name, decode_encoded_words(&f.value))
            } else {
                f.raw
            }
        })
        .collect()
}

/// Is a header hidden by the ignore/unignore lists?
///
/// Both lists hold case-insensitive name prefixes; `*` matches every name.
pub fn is_ignored(name: &str, config: &HeaderConfig) -> bool {
    let name = name.to_ascii_lowercase();
    let matches = |pattern: &String| pattern == "*" || name.starts_with(&pattern.to_ascii_lowercase());
    config.ignore.iter().any(matches) && !config.unignore.iter().any(matches)
}

/// Decode raw header bytes to a string.
///
/// Tries UTF-8 first, then falls back to Windows-1252 (which accepts every byte).
fn decode_header_bytes(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);

    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

/// Decode RFC 2047 encoded-words in a header value.
///
/// Example: `"=?UTF-8?B?SG9sYQ==?= =?UTF-8?B?IG11bmRv?="` → `"Hola mundo"`
///
/// Values without encoded-words are returned unchanged. Decoding is done by
/// `mail-parser`, which also joins adjacent encoded-words.
pub fn decode_encoded_words(input: &str) -> String {
    if !input.contains("=?") {
        return input.to_string();
    }
    let wrapped = format!("Subject: {}\n\n", input.replace(['\r', '\n'], " "));
    let parser = mail_parser::MessageParser::default();
    parser
        .parse(wrapped.as_bytes())
        .and_then(|msg| msg.subject().map(str::to_string))
        .unwrap_or_else(|| {
            warn!(value = input, "Could not decode encoded-words");
            input.to_string()
        })
}

/// Extract content between `<` and `>` (for Message-ID), brackets included.
fn extract_angle_bracket(s: &str) -> String {
    let trimmed = s.trim();
    if let Some(start) = trimmed.find('<') {
        if let Some(end) = trimmed[start..].find('>') {
            return trimmed[start..start + end + 1].to_string();
        }
    }
    trimmed.to_string()
}

/// Extract all `<…>` tokens from a string (for References, In-Reply-To).
fn extract_all_angle_brackets(s: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut remaining = s;
    while let Some(start) = remaining.find('<') {
        if let Some(end) = remaining[start..].find('>') {
            result.push(remaining[start..start + end + 1].to_string());
            remaining = &remaining[start + end + 1..];
        } else {
            break;
        }
    }
    result
}

/// Parse an email date string.
///
/// RFC 2822 and RFC 3339 are tried directly; anything else is handed to
/// `mail-parser`'s lenient date parser.
pub fn parse_date(date_str: &str) -> Option<DateTime<Utc>> {
    let trimmed = date_str.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    let fake_msg = format!("Date: {trimmed}\n\n");
    let parser = mail_parser::MessageParser::default();
    let parsed = parser
        .parse(fake_msg.as_bytes())
        .and_then(|msg| msg.date().map(|d| d.to_rfc3339()))
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|d| d.with_timezone(&Utc));
    if parsed.is_none() {
        warn!(date = trimmed, "Could not parse date");
    }
    parsed
}
