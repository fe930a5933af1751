//! MIME structure: the attachment listing builder and HTML-to-text conversion.

use std::sync::Arc;

use mail_parser::{Message, MessageParser, MessagePart, MimeHeaders, PartType};
use tracing::{debug, warn};

use super::header::parse_envelope;
use crate::config::DecodeConfig;
use crate::error::{Result, SendError};
use crate::model::attachment::{AttachmentEntry, AttachmentIndex, BodyPart, PartRange};
use crate::model::mail::{MessageHeader, MessageSource};

/// Maximum nesting of embedded messages and multiparts that is listed
/// (guards against adversarial input).
const MAX_DEPTH: usize = 10;

/// Build the attachment listing of one message.
///
/// Multiparts directly under the message (other than `multipart/alternative`)
/// are flattened into their children. Every other multipart and every
/// embedded message gets an entry of its own, followed by its parts one
/// level deeper.
pub fn build_index(source: Arc<MessageSource>, policy: &DecodeConfig) -> Result<AttachmentIndex> {
    let msg = parse(&source)?;
    let root_header = message_header(&msg, &source, 0);

    let mut builder = Builder::new(policy);
    builder.list(&msg, &[0], &source, 0, 0, true);
    debug!(
        source = %source.name,
        entries = builder.entries.len(),
        "Built attachment index"
    );

    Ok(AttachmentIndex {
        entries: builder.entries,
        root_source: source.clone(),
        root_header: Some(root_header),
    })
}

/// Build one listing over several top-level messages.
///
/// Each message becomes a level-0 `message/rfc822` entry with its parts
/// below it. The result has no root header.
pub fn build_virtual_index(
    sources: &[Arc<MessageSource>],
    policy: &DecodeConfig,
) -> Result<AttachmentIndex> {
    let mut builder = Builder::new(policy);

    for source in sources {
        let msg = parse(source)?;
        let header = message_header(&msg, source, 0);

        let mut part = BodyPart::new("message", "rfc822");
        part.range = PartRange {
            header: 0,
            body: header.body_offset,
            end: source.len(),
        };
        part.description = header.envelope.subject.clone();
        part.message = Some(header);
        builder.entries.push(AttachmentEntry {
            part,
            level: 0,
            source: source.clone(),
        });
        builder.list(&msg, &[0], source, 0, 1, false);
    }

    debug!(
        messages = sources.len(),
        entries = builder.entries.len(),
        "Built virtual attachment index"
    );

    Ok(AttachmentIndex {
        entries: builder.entries,
        root_source: sources
            .first()
            .cloned()
            .unwrap_or_else(|| MessageSource::new("<empty>", Vec::new())),
        root_header: None,
    })
}

/// Parse the full contents of a source.
pub fn parse(source: &MessageSource) -> Result<Message<'_>> {
    MessageParser::default()
        .parse(source.bytes())
        .ok_or_else(|| SendError::Mime(format!("{}: cannot parse message", source.name)))
}

/// Lowercase `(type, subtype)` of a part, with defaults from its parsed body.
pub fn content_type_of(part: &MessagePart<'_>) -> (String, String) {
    if let Some(ct) = part.content_type() {
        let sub = ct.subtype().unwrap_or(match ct.ctype() {
            t if t.eq_ignore_ascii_case("text") => "plain",
            t if t.eq_ignore_ascii_case("multipart") => "mixed",
            _ => "octet-stream",
        });
        return (ct.ctype().to_ascii_lowercase(), sub.to_ascii_lowercase());
    }
    let (ty, sub) = match &part.body {
        PartType::Text(_) => ("text", "plain"),
        PartType::Html(_) => ("text", "html"),
        PartType::Message(_) => ("message", "rfc822"),
        PartType::Multipart(_) => ("multipart", "mixed"),
        PartType::Binary(_) | PartType::InlineBinary(_) => ("application", "octet-stream"),
    };
    (ty.to_string(), sub.to_string())
}

/// Is `type/subtype` listed for automatic text rendering?
///
/// Entries are either exact (`text/calendar`) or a whole type (`application/*`).
pub fn is_autoview(policy: &DecodeConfig, mime_type: &str, subtype: &str) -> bool {
    policy.autoview.iter().any(|pattern| {
        let Some((ty, sub)) = pattern.split_once('/') else {
            return false;
        };
        ty.eq_ignore_ascii_case(mime_type) && (sub == "*" || sub.eq_ignore_ascii_case(subtype))
    })
}

/// Can part `id` of `msg` be rendered as text?
///
/// Text and embedded messages always can; a multipart can if any child can;
/// other leaves only when listed in the autoview policy.
pub fn part_decodable(msg: &Message<'_>, id: usize, policy: &DecodeConfig) -> bool {
    part_decodable_at(msg, id, policy, 0)
}

fn part_decodable_at(msg: &Message<'_>, id: usize, policy: &DecodeConfig, depth: usize) -> bool {
    let Some(part) = msg.parts.get(id) else {
        return false;
    };
    match &part.body {
        PartType::Text(_) | PartType::Html(_) | PartType::Message(_) => true,
        PartType::Multipart(children) => {
            depth < MAX_DEPTH
                && children
                    .iter()
                    .any(|&c| c != id && part_decodable_at(msg, c, policy, depth + 1))
        }
        PartType::Binary(_) | PartType::InlineBinary(_) => {
            let (ty, sub) = content_type_of(part);
            is_autoview(policy, &ty, &sub)
        }
    }
}

/// Header of a parsed message whose bytes start at `base` in `source`.
fn message_header(msg: &Message<'_>, source: &Arc<MessageSource>, base: usize) -> MessageHeader {
    let body_offset = msg
        .parts
        .first()
        .map_or(0, |root| root.offset_body.saturating_sub(base))
        .min(source.len());
    MessageHeader {
        envelope: parse_envelope(&source.bytes()[..body_offset]),
        source: source.clone(),
        body_offset,
    }
}

struct Builder<'p> {
    policy: &'p DecodeConfig,
    entries: Vec<AttachmentEntry>,
    embedded: usize,
}

impl<'p> Builder<'p> {
    fn new(policy: &'p DecodeConfig) -> Self {
        Self {
            policy,
            entries: Vec::new(),
            embedded: 0,
        }
    }

    /// List the parts `ids` of `msg`, whose offsets are shifted by `base`
    /// relative to `source`. `top` is set for the body of a message.
    fn list(
        &mut self,
        msg: &Message<'_>,
        ids: &[usize],
        source: &Arc<MessageSource>,
        base: usize,
        level: usize,
        top: bool,
    ) {
        if level > MAX_DEPTH {
            warn!(source = %source.name, level, "MIME nesting too deep, not listed");
            return;
        }

        for &id in ids {
            let Some(part) = msg.parts.get(id) else {
                continue;
            };
            let (mime_type, subtype) = content_type_of(part);

            if let PartType::Multipart(children) = &part.body {
                if top && !children.is_empty() && subtype != "alternative" {
                    self.list(msg, children, source, base, level, false);
                    continue;
                }
            }

            let mut body_part = BodyPart::new(&mime_type, &subtype);
            body_part.filename = part.attachment_name().map(str::to_string);
            body_part.description = part.content_description().map(str::to_string);
            if let Some(cte) = part.content_transfer_encoding() {
                body_part.encoding = cte.to_ascii_lowercase();
            }
            body_part.range = PartRange {
                header: part.offset_header.saturating_sub(base),
                body: part.offset_body.saturating_sub(base),
                end: part.offset_end.saturating_sub(base),
            };
            body_part.decodable = part_decodable(msg, id, self.policy);

            match &part.body {
                PartType::Message(nested) => {
                    let (nested_source, nested_base) = self.embedded_source(nested, source);
                    body_part.message = Some(message_header(nested, &nested_source, nested_base));
                    self.push(body_part, level, source);
                    self.list(nested, &[0], &nested_source, nested_base, level + 1, false);
                }
                PartType::Multipart(children) => {
                    self.push(body_part, level, source);
                    let children: Vec<usize> = children.iter().copied().filter(|&c| c != id).collect();
                    self.list(msg, &children, source, base, level + 1, false);
                }
                _ => self.push(body_part, level, source),
            }
        }
    }

    fn push(&mut self, part: BodyPart, level: usize, source: &Arc<MessageSource>) {
        self.entries.push(AttachmentEntry {
            part,
            level,
            source: source.clone(),
        });
    }

    /// Copy an embedded message into a source of its own.
    ///
    /// Returns the new source and the offset its bytes had in the embedded
    /// message's raw buffer, which part offsets must be shifted by.
    fn embedded_source(
        &mut self,
        nested: &Message<'_>,
        parent: &Arc<MessageSource>,
    ) -> (Arc<MessageSource>, usize) {
        let raw: &[u8] = nested.raw_message.as_ref();
        let start = nested
            .parts
            .first()
            .map_or(0, |p| p.offset_header)
            .min(raw.len());
        let end = nested
            .parts
            .iter()
            .map(|p| p.offset_end)
            .max()
            .unwrap_or(raw.len())
            .clamp(start, raw.len());

        self.embedded += 1;
        let name = format!("{}#{}", parent.name, self.embedded);
        (MessageSource::new(name, raw[start..end].to_vec()), start)
    }
}

/// Convert HTML to plain text.
///
/// - Preserves line breaks from `<br>`, `<p>`, `<div>`
/// - Removes scripts and styles
/// - Decodes common HTML entities
pub fn html_to_text(html: &str) -> String {
    let mut text = remove_tag_block(html, "script");
    text = remove_tag_block(&text, "style");

    for tag in &["br", "br/", "br /"] {
        text = replace_ignore_case(&text, &format!("<{tag}>"), "\n");
    }
    for tag in &["p", "div", "tr", "li", "h1", "h2", "h3", "h4", "h5", "h6"] {
        text = replace_ignore_case(&text, &format!("<{tag}>"), "\n");
        text = replace_ignore_case(&text, &format!("<{tag} "), "\n<");
        text = replace_ignore_case(&text, &format!("</{tag}>"), "\n");
    }

    let mut stripped = String::with_capacity(text.len());
    let mut in_tag = false;
    for ch in text.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => stripped.push(ch),
            _ => {}
        }
    }

    for (entity, ch) in [
        ("&lt;", "<"),
        ("&gt;", ">"),
        ("&quot;", "\""),
        ("&#39;", "'"),
        ("&apos;", "'"),
        ("&nbsp;", " "),
        ("&#160;", " "),
        ("&amp;", "&"),
    ] {
        stripped = stripped.replace(entity, ch);
    }

    // At most one blank line in a row.
    let mut prev_was_blank = false;
    let mut cleaned = String::with_capacity(stripped.len());
    for line in stripped.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if !prev_was_blank {
                cleaned.push('\n');
                prev_was_blank = true;
            }
        } else {
            cleaned.push_str(trimmed);
            cleaned.push('\n');
            prev_was_blank = false;
        }
    }

    cleaned.trim().to_string()
}

fn replace_ignore_case(haystack: &str, needle: &str, with: &str) -> String {
    let lower = haystack.to_ascii_lowercase();
    let mut result = String::with_capacity(haystack.len());
    let mut last = 0;
    for (pos, _) in lower.match_indices(needle) {
        result.push_str(&haystack[last..pos]);
        result.push_str(with);
        last = pos + needle.len();
    }
    result.push_str(&haystack[last..]);
    result
}

/// Remove an entire tag block (e.g. `<script>…</script>`).
fn remove_tag_block(html: &str, tag: &str) -> String {
    let open = format!("<{tag}");
    let close = format!("</{tag}>");
    let mut result = String::with_capacity(html.len());
    let mut remaining = html;

    while let Some(start) = remaining.to_ascii_lowercase().find(&open) {
        result.push_str(&remaining[..start]);
        let after = &remaining[start..];
        match after.to_ascii_lowercase().find(&close) {
            Some(end) => remaining = &after[end + close.len()..],
            None => {
                remaining = "";
                break;
            }
        }
    }
    result.push_str(remaining);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIXED: &[u8] = b"From: Alice <alice@example.com>\n\
To: bob@example.com\n\
Subject: Report\n\
MIME-Version: 1.0\n\
Content-Type: multipart/mixed; boundary=\"outer\"\n\
\n\
--outer\n\
Content-Type: text/plain\n\
\n\
See attached.\n\
--outer\n\
Content-Type: message/rfc822\n\
\n\
From: Carol <carol@example.com>\n\
Subject: Inner\n\
Content-Type: multipart/alternative; boundary=\"alt\"\n\
\n\
--alt\n\
Content-Type: text/plain\n\
\n\
inner plain\n\
--alt\n\
Content-Type: text/html\n\
\n\
<p>inner html</p>\n\
--alt--\n\
--outer\n\
Content-Type: application/pdf; name=\"r.pdf\"\n\
Content-Transfer-Encoding: base64\n\
\n\
JVBERi0xLjQK\n\
--outer--\n";

    fn policy() -> DecodeConfig {
        DecodeConfig::default()
    }

    fn shape(index: &AttachmentIndex) -> Vec<(usize, String)> {
        index
            .entries
            .iter()
            .map(|e| (e.level, e.part.content_type()))
            .collect()
    }

    #[test]
    fn test_build_index_flattens_top_multipart() {
        let idx = build_index(MessageSource::new("mem", MIXED.to_vec()), &policy()).unwrap();
        assert_eq!(
            shape(&idx),
            vec![
                (0, "text/plain".to_string()),
                (0, "message/rfc822".to_string()),
                (1, "multipart/alternative".to_string()),
                (2, "text/plain".to_string()),
                (2, "text/html".to_string()),
                (0, "application/pdf".to_string()),
            ]
        );
        let root = idx.root_header.as_ref().unwrap();
        assert_eq!(root.envelope.subject.as_deref(), Some("Report"));
    }

    #[test]
    fn test_embedded_message_has_own_source() {
        let idx = build_index(MessageSource::new("mem", MIXED.to_vec()), &policy()).unwrap();
        let msg_entry = &idx.entries[1];
        let header = msg_entry.part.message.as_ref().unwrap();
        assert_eq!(header.envelope.subject.as_deref(), Some("Inner"));
        assert!(header.raw_header().unwrap().starts_with(b"From: Carol"));

        let inner_plain = &idx.entries[3];
        assert!(Arc::ptr_eq(&inner_plain.source, &header.source));
        let body = inner_plain.source.slice(inner_plain.part.range.body()).unwrap();
        assert!(String::from_utf8_lossy(body).contains("inner plain"));
    }

    #[test]
    fn test_decodability_and_metadata() {
        let idx = build_index(MessageSource::new("mem", MIXED.to_vec()), &policy()).unwrap();
        assert!(idx.entries[0].part.decodable);
        assert!(idx.entries[2].part.decodable);
        let pdf = &idx.entries[5].part;
        assert!(!pdf.decodable);
        assert_eq!(pdf.filename.as_deref(), Some("r.pdf"));
        assert_eq!(pdf.encoding, "base64");
        let raw = idx.entries[5].source.slice(pdf.range.body()).unwrap();
        assert!(raw.starts_with(b"JVBERi0xLjQK"));
    }

    #[test]
    fn test_autoview_makes_part_decodable() {
        let policy = DecodeConfig {
            autoview: vec!["application/*".to_string()],
        };
        let idx = build_index(MessageSource::new("mem", MIXED.to_vec()), &policy).unwrap();
        assert!(idx.entries[5].part.decodable);
    }

    #[test]
    fn test_single_part_message() {
        let raw = b"Subject: hi\n\nplain body\n".to_vec();
        let idx = build_index(MessageSource::new("mem", raw), &policy()).unwrap();
        assert_eq!(shape(&idx), vec![(0, "text/plain".to_string())]);
    }

    #[test]
    fn test_virtual_index() {
        let a = MessageSource::new("a", b"Subject: one\n\nfirst\n".to_vec());
        let b = MessageSource::new("b", MIXED.to_vec());
        let idx = build_virtual_index(&[a, b], &policy()).unwrap();
        assert!(idx.root_header.is_none());
        assert_eq!(idx.entries[0].level, 0);
        assert!(idx.entries[0].part.is_message());
        assert_eq!(idx.entries[1].level, 1);
        let tops: Vec<usize> = idx
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.level == 0)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(tops.len(), 2);
        let second = &idx.entries[tops[1]];
        assert_eq!(
            second.part.message.as_ref().unwrap().envelope.subject.as_deref(),
            Some("Report")
        );
        // The second message's multipart body is an entry of its own.
        assert_eq!(idx.entries[tops[1] + 1].part.content_type(), "multipart/mixed");
    }

    #[test]
    fn test_is_autoview_patterns() {
        let policy = DecodeConfig {
            autoview: vec!["text/calendar".to_string(), "application/*".to_string()],
        };
        assert!(is_autoview(&policy, "text", "calendar"));
        assert!(is_autoview(&policy, "application", "json"));
        assert!(!is_autoview(&policy, "image", "png"));
    }

    #[test]
    fn test_html_to_text_basic() {
        let text = html_to_text("<P>Hello <b>world</b></P><p>Second paragraph</p>");
        assert!(text.contains("Hello world"));
        assert!(text.contains("Second paragraph"));
    }

    #[test]
    fn test_html_to_text_entities() {
        assert_eq!(html_to_text("Tom &amp; Jerry &lt;3&gt;"), "Tom & Jerry <3>");
        assert_eq!(html_to_text("&amp;lt;"), "&lt;");
    }

    #[test]
    fn test_html_to_text_removes_scripts() {
        assert_eq!(
            html_to_text("Before<SCRIPT>alert('xss')</script>After"),
            "BeforeAfter"
        );
    }
}
