//! Serialize drafts, bounces and resend templates as RFC 5322 `.eml` bytes.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::config::HeaderConfig;
use crate::error::Result;
use crate::model::address::{format_list, EmailAddress};
use crate::model::mail::{Draft, DraftPart, MessageHeader};
use crate::parser::header::{render_fields, HeaderStyle};

/// Headers replaced when a message is resent as a new draft.
const RESEND_DROPPED: &[&str] = &["message-id", "date", "return-path", "received", "delivered-to"];

/// Values stamped on every outgoing file.
#[derive(Debug, Clone)]
pub struct Stamp {
    pub date: DateTime<Utc>,
    /// Unique token for Message-ID and MIME boundaries.
    pub token: String,
    /// Domain for generated Message-IDs.
    pub domain: String,
}

impl Stamp {
    pub fn message_id(&self) -> String {
        format!("<{}@{}>", self.token, self.domain)
    }

    fn boundary(&self) -> String {
        format!("=_mboxsend_{}", self.token)
    }
}

/// Render a draft with its text body and attachments.
///
/// Without attachments the result is a single `text/plain` part; otherwise
/// `multipart/mixed` with the text first.
pub fn render_draft(draft: &Draft, from: &[EmailAddress], body: &str, stamp: &Stamp) -> Vec<u8> {
    let env = &draft.envelope;
    let mut out = String::with_capacity(body.len() + 512);

    push_header(&mut out, "Date", &stamp.date.to_rfc2822());
    let from = if env.from.is_empty() { from } else { env.from.as_slice() };
    push_addresses(&mut out, "From", from);
    push_addresses(&mut out, "To", &env.to);
    push_addresses(&mut out, "Cc", &env.cc);
    push_addresses(&mut out, "Bcc", &env.bcc);
    if let Some(subject) = &env.subject {
        push_header(&mut out, "Subject", subject);
    }
    push_header(&mut out, "Message-ID", &stamp.message_id());
    if !env.in_reply_to.is_empty() {
        push_header(&mut out, "In-Reply-To", &env.in_reply_to.join(" "));
    }
    if !env.references.is_empty() {
        push_header(&mut out, "References", &env.references.join("\n "));
    }
    push_header(&mut out, "MIME-Version", "1.0");

    let mut bytes = Vec::with_capacity(out.len() + body.len());
    if draft.parts.is_empty() {
        push_text_part_headers(&mut out);
        out.push('\n');
        out.push_str(body);
        bytes.extend_from_slice(out.as_bytes());
        return bytes;
    }

    let boundary = stamp.boundary();
    push_header(
        &mut out,
        "Content-Type",
        &format!("multipart/mixed; boundary=\"{boundary}\""),
    );
    out.push('\n');
    out.push_str(&format!("--{boundary}\n"));
    push_text_part_headers(&mut out);
    out.push('\n');
    out.push_str(body);
    if !body.ends_with('\n') {
        out.push('\n');
    }
    bytes.extend_from_slice(out.as_bytes());

    for part in &draft.parts {
        bytes.extend_from_slice(format!("--{boundary}\n").as_bytes());
        bytes.extend_from_slice(part_headers(part).as_bytes());
        bytes.push(b'\n');
        bytes.extend_from_slice(&part.data);
        if !part.data.ends_with(b"\n") {
            bytes.push(b'\n');
        }
    }
    bytes.extend_from_slice(format!("--{boundary}--\n").as_bytes());
    bytes
}

/// Render a bounce: `Resent-*` headers on top of the original message,
/// minus its local mailbox headers.
pub fn render_bounce(
    message: &MessageHeader,
    from: &[EmailAddress],
    to: &[EmailAddress],
    stamp: &Stamp,
    headers: &HeaderConfig,
) -> Result<Vec<u8>> {
    let mut out = String::new();
    push_addresses(&mut out, "Resent-From", from);
    push_header(&mut out, "Resent-Date", &stamp.date.to_rfc2822());
    push_header(&mut out, "Resent-Message-ID", &stamp.message_id());
    push_addresses(&mut out, "Resent-To", to);

    let style = HeaderStyle {
        xmit: true,
        ..HeaderStyle::default()
    };
    for line in render_fields(message.raw_header()?, style, headers) {
        out.push_str(&line);
        out.push('\n');
    }
    out.push('\n');

    let mut bytes = out.into_bytes();
    bytes.extend_from_slice(message.raw_body()?);
    Ok(bytes)
}

/// Render a message as a new draft: the original header without its
/// delivery trace and identity fields, then the original body.
pub fn render_resend(message: &MessageHeader, headers: &HeaderConfig) -> Result<Vec<u8>> {
    let style = HeaderStyle {
        xmit: true,
        ..HeaderStyle::default()
    };
    let mut out = String::new();
    for line in render_fields(message.raw_header()?, style, headers) {
        let name = line.split(':').next().unwrap_or("").trim();
        if RESEND_DROPPED.iter().any(|d| d.eq_ignore_ascii_case(name)) {
            continue;
        }
        out.push_str(&line);
        out.push('\n');
    }
    out.push('\n');

    let mut bytes = out.into_bytes();
    bytes.extend_from_slice(message.raw_body()?);
    Ok(bytes)
}

fn push_header(out: &mut String, name: &str, value: &str) {
    out.push_str(name);
    out.push_str(": ");
    out.push_str(value);
    out.push('\n');
}

fn push_addresses(out: &mut String, name: &str, addresses: &[EmailAddress]) {
    if !addresses.is_empty() {
        push_header(out, name, &format_list(addresses));
    }
}

fn push_text_part_headers(out: &mut String) {
    push_header(out, "Content-Type", "text/plain; charset=utf-8");
    push_header(out, "Content-Transfer-Encoding", "8bit");
}

fn part_headers(part: &DraftPart) -> String {
    let mut out = String::new();
    match &part.filename {
        Some(name) => push_header(
            &mut out,
            "Content-Type",
            &format!("{}; name=\"{}\"", part.content_type, name.replace('"', "")),
        ),
        None => push_header(&mut out, "Content-Type", &part.content_type),
    }
    push_header(&mut out, "Content-Transfer-Encoding", &part.encoding);
    if let Some(desc) = &part.description {
        push_header(&mut out, "Content-Description", desc);
    }
    let disposition = match &part.filename {
        Some(name) => format!("attachment; filename=\"{}\"", name.replace('"', "")),
        None if part.content_type == "message/rfc822" => "inline".to_string(),
        None => "attachment".to_string(),
    };
    push_header(&mut out, "Content-Disposition", &disposition);
    out
}

/// File name for an outgoing message: `{date}_{kind}_{subject}.eml`.
pub fn eml_filename(date: &DateTime<Utc>, kind: &str, subject: &str) -> String {
    let date = date.format("%Y%m%d_%H%M%S").to_string();
    let subject = sanitize_filename_part(subject, 80);
    format!("{date}_{kind}_{subject}.eml")
}

/// Replace characters that are unsafe in file names with `_` and truncate
/// to `max_len` characters.
pub fn sanitize_filename_part(s: &str, max_len: usize) -> String {
    let sanitized: String = s
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '.' | '_' | '@') {
                c
            } else {
                '_'
            }
        })
        .take(max_len)
        .collect();

    if sanitized.is_empty() {
        "unknown".to_string()
    } else {
        sanitized
    }
}

/// If `path` already exists, append a counter to make it unique.
pub fn unique_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }

    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("message");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let parent = path.parent().unwrap_or(Path::new("."));

    (1..)
        .map(|i| {
            if ext.is_empty() {
                parent.join(format!("{stem}_{i}"))
            } else {
                parent.join(format!("{stem}_{i}.{ext}"))
            }
        })
        .find(|candidate| !candidate.exists())
        .unwrap_or_else(|| path.to_path_buf())
}
