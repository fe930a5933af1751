//! Render MIME parts and whole messages as text into a draft body.
//!
//! Every call takes an explicit [`RenderContext`]: where to write, the
//! quote prefix, and the [`CopyFlags`] in effect.

use std::io::Write;
use std::path::Path;

use bitflags::bitflags;
use humansize::{format_size, DECIMAL};
use mail_parser::{Message, MessageParser, PartType};
use tracing::debug;

use crate::config::Config;
use crate::error::{Result, SendError};
use crate::i18n;
use crate::model::attachment::AttachmentEntry;
use crate::model::mail::MessageHeader;
use crate::parser::header::{render_fields, HeaderStyle};
use crate::parser::mime::{content_type_of, html_to_text, is_autoview, part_decodable};

/// Nesting limit for rendering embedded messages and multiparts.
const MAX_RENDER_DEPTH: usize = 10;

bitflags! {
    /// How a part or message is copied into the draft body.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CopyFlags: u32 {
        /// Decode RFC 2047 headers and MIME bodies to text.
        const DECODE = 1 << 0;
        /// Convert text bodies to UTF-8 (raw bytes otherwise).
        const CHARCONV = 1 << 1;
        /// Hide ignored headers.
        const WEED = 1 << 2;
        /// Sort headers by the configured order.
        const REORDER = 1 << 3;
        /// Prefix every line with the quote prefix.
        const PREFIX = 1 << 4;
        /// Leave out the message header.
        const NOHEADER = 1 << 5;
        /// Drop local mailbox headers.
        const XMIT = 1 << 6;
    }
}

/// Destination and settings for one render call.
pub struct RenderContext<'a> {
    out: &'a mut dyn Write,
    /// Path of the destination, for error reports.
    path: &'a Path,
    prefix: Option<String>,
    flags: CopyFlags,
    config: &'a Config,
}

impl<'a> RenderContext<'a> {
    pub fn new(out: &'a mut dyn Write, path: &'a Path, config: &'a Config) -> Self {
        Self {
            out,
            path,
            prefix: None,
            flags: CopyFlags::empty(),
            config,
        }
    }

    /// Quote with `prefix`; also turns on [`CopyFlags::PREFIX`].
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self.flags |= CopyFlags::PREFIX;
        self
    }

    pub fn with_flags(mut self, flags: CopyFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub fn flags(&self) -> CopyFlags {
        self.flags
    }

    pub fn config(&self) -> &Config {
        self.config
    }

    /// Write text unchanged.
    pub fn write_raw(&mut self, text: &str) -> Result<()> {
        self.out
            .write_all(text.as_bytes())
            .map_err(|e| SendError::io(self.path, e))
    }

    /// Write text line by line, quoting each line when prefixing is on.
    ///
    /// Every line ends with a newline; empty quoted lines get the prefix
    /// without its trailing whitespace.
    pub fn write_text(&mut self, text: &str) -> Result<()> {
        let prefix = match (&self.prefix, self.flags.contains(CopyFlags::PREFIX)) {
            (Some(p), true) => Some(p.as_str()),
            _ => None,
        };
        let mut buf = String::with_capacity(text.len() + 16);
        for line in text.lines() {
            match prefix {
                Some(p) if line.is_empty() => buf.push_str(p.trim_end()),
                Some(p) => {
                    buf.push_str(p);
                    buf.push_str(line);
                }
                None => buf.push_str(line),
            }
            buf.push('\n');
        }
        self.write_raw(&buf)
    }

    fn header_style(&self) -> HeaderStyle {
        HeaderStyle {
            decode: self.flags.contains(CopyFlags::DECODE),
            weed: self.flags.contains(CopyFlags::WEED),
            reorder: self.flags.contains(CopyFlags::REORDER),
            xmit: self.flags.contains(CopyFlags::XMIT),
        }
    }
}

/// Copy a header block, honoring the context's decode/weed/reorder/prefix flags.
pub fn copy_header(raw_header: &[u8], ctx: &mut RenderContext<'_>) -> Result<()> {
    let lines = render_fields(raw_header, ctx.header_style(), &ctx.config.headers);
    ctx.write_text(&lines.join("\n"))
}

/// Copy a whole message: header (unless `NOHEADER`), blank line, body.
///
/// With `DECODE` the body is rendered to text; otherwise it is copied as is.
pub fn copy_message(message: &MessageHeader, ctx: &mut RenderContext<'_>) -> Result<()> {
    if !ctx.flags.contains(CopyFlags::NOHEADER) {
        copy_header(message.raw_header()?, ctx)?;
        ctx.write_text("\n")?;
    }

    let text = if ctx.flags.contains(CopyFlags::DECODE) {
        let msg = parse_bytes(message.source.bytes(), &message.source.name)?;
        let mut text = String::new();
        render_tree(&msg, 0, ctx, 0, &mut text);
        text
    } else {
        String::from_utf8_lossy(message.raw_body()?).into_owned()
    };
    debug!(source = %message.source.name, bytes = text.len(), "Copied message");
    ctx.write_text(&text)
}

/// Render one listing entry as text.
///
/// Embedded messages render their header (weeded per the context) followed
/// by the body; other parts are parsed from their own entity bytes.
pub fn render_part(entry: &AttachmentEntry, ctx: &mut RenderContext<'_>) -> Result<()> {
    let mut text = String::new();

    if let Some(message) = entry.part.message.as_ref() {
        let style = HeaderStyle {
            decode: true,
            weed: ctx.flags.contains(CopyFlags::WEED),
            reorder: ctx.flags.contains(CopyFlags::WEED),
            xmit: false,
        };
        let lines = render_fields(message.raw_header()?, style, &ctx.config.headers);
        text.push_str(&lines.join("\n"));
        text.push_str("\n\n");
        let msg = parse_bytes(message.source.bytes(), &message.source.name)?;
        render_tree(&msg, 0, ctx, 0, &mut text);
    } else {
        let range = entry.part.range;
        let entity = entry.source.slice(range.entity())?;
        // An entity without headers is plain text; a leading blank line
        // keeps the parser from reading the body as headers.
        let owned;
        let bytes = if range.header == range.body {
            owned = [b"\n".as_slice(), entity].concat();
            owned.as_slice()
        } else {
            entity
        };
        let msg = parse_bytes(bytes, &entry.source.name)?;
        render_tree(&msg, 0, ctx, 0, &mut text);
    }

    ctx.write_text(&text)
}

fn parse_bytes<'x>(bytes: &'x [u8], name: &str) -> Result<Message<'x>> {
    MessageParser::default()
        .parse(bytes)
        .ok_or_else(|| SendError::Mime(format!("{name}: cannot parse part")))
}

/// Append the text rendition of part `id` of `msg` to `out`.
fn render_tree(msg: &Message<'_>, id: usize, ctx: &RenderContext<'_>, depth: usize, out: &mut String) {
    let Some(part) = msg.parts.get(id) else {
        return;
    };
    let policy = &ctx.config.decode;

    match &part.body {
        PartType::Text(text) => {
            if ctx.flags.contains(CopyFlags::CHARCONV) {
                push_block(out, text);
            } else {
                let raw = msg
                    .raw_message
                    .get(part.offset_body..part.offset_end)
                    .unwrap_or_default();
                push_block(out, &String::from_utf8_lossy(raw));
            }
        }
        PartType::Html(html) => push_block(out, &html_to_text(html)),
        PartType::Message(nested) => {
            if let Some(root) = nested.parts.first() {
                let raw_header = nested
                    .raw_message
                    .get(root.offset_header..root.offset_body)
                    .unwrap_or_default();
                let style = HeaderStyle {
                    decode: true,
                    weed: ctx.flags.contains(CopyFlags::WEED),
                    reorder: ctx.flags.contains(CopyFlags::WEED),
                    xmit: false,
                };
                let lines = render_fields(raw_header, style, &ctx.config.headers);
                push_block(out, &lines.join("\n"));
                out.push('\n');
            }
            if depth < MAX_RENDER_DEPTH {
                render_tree(nested, 0, ctx, depth + 1, out);
            }
        }
        PartType::Multipart(children) => {
            if depth >= MAX_RENDER_DEPTH {
                return;
            }
            let (_, subtype) = content_type_of(part);
            let children: Vec<usize> = children.iter().copied().filter(|&c| c != id).collect();
            if subtype == "alternative" {
                let plain = children.iter().copied().find(|&c| {
                    msg.parts
                        .get(c)
                        .is_some_and(|p| matches!(p.body, PartType::Text(_)))
                });
                let chosen = plain.or_else(|| {
                    children
                        .iter()
                        .copied()
                        .find(|&c| part_decodable(msg, c, policy))
                });
                if let Some(c) = chosen {
                    render_tree(msg, c, ctx, depth + 1, out);
                }
            } else {
                for c in children {
                    if part_decodable(msg, c, policy) {
                        render_tree(msg, c, ctx, depth + 1, out);
                    } else if let Some(child) = msg.parts.get(c) {
                        push_block(out, &placeholder(child));
                    }
                }
            }
        }
        PartType::Binary(data) | PartType::InlineBinary(data) => {
            let (ty, sub) = content_type_of(part);
            if is_autoview(policy, &ty, &sub) {
                push_block(out, &String::from_utf8_lossy(data));
            } else {
                push_block(out, &placeholder(part));
            }
        }
    }
}

fn placeholder(part: &mail_parser::MessagePart<'_>) -> String {
    use mail_parser::MimeHeaders;

    let (ty, sub) = content_type_of(part);
    let size = part.offset_end.saturating_sub(part.offset_body);
    i18n::msg_attachment_placeholder(
        part.attachment_name().unwrap_or("-"),
        &format!("{ty}/{sub}"),
        &format_size(size, DECIMAL),
    )
}

/// Append `text` as a block that ends with exactly one newline.
fn push_block(out: &mut String, text: &str) {
    out.push_str(text.trim_end_matches(['\r', '\n']));
    out.push('\n');
}
