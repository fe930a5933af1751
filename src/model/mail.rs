//! Message sources, envelopes, and the outgoing draft.

use std::ops::Range;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::address::EmailAddress;
use crate::error::{Result, SendError};

/// Read-only backing store for the raw bytes of one message.
///
/// An embedded `message/rfc822` part gets its own source, so entries of one
/// attachment listing may point at different sources.
#[derive(Debug)]
pub struct MessageSource {
    /// Label used in logs and errors (file path, or `file#part`).
    pub name: String,
    data: Vec<u8>,
}

impl MessageSource {
    /// Wrap raw message bytes.
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            data,
        })
    }

    /// Read a message file from disk.
    ///
    /// A byte-order mark and a leading mbox `From ` separator line are
    /// dropped so that offsets start at the first header.
    pub fn open(path: &std::path::Path) -> Result<Arc<Self>> {
        let mut data = std::fs::read(path).map_err(|e| SendError::io(path, e))?;
        let skip = data.len() - skip_from_line(&data).len();
        data.drain(..skip);
        Ok(Self::new(path.display().to_string(), data))
    }

    /// All bytes of the message.
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Total length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// `true` if the source holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bounds-checked slice.
    pub fn slice(&self, range: Range<usize>) -> Result<&[u8]> {
        self.data
            .get(range.clone())
            .ok_or_else(|| SendError::PartOutOfRange {
                source_name: self.name.clone(),
                start: range.start,
                end: range.end,
                len: self.data.len(),
            })
    }
}

/// Skip the BOM and the `From ` separator line of an mbox-style file.
fn skip_from_line(data: &[u8]) -> &[u8] {
    let data = data.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(data);

    if data.starts_with(b"From ") {
        if let Some(pos) = data.iter().position(|&b| b == b'\n') {
            return &data[pos + 1..];
        }
    }
    data
}

/// Addressing and threading fields of a message.
///
/// The same type is used for source messages and for the draft being built.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Envelope {
    pub from: Vec<EmailAddress>,
    pub to: Vec<EmailAddress>,
    pub cc: Vec<EmailAddress>,
    pub bcc: Vec<EmailAddress>,
    pub reply_to: Vec<EmailAddress>,
    pub mail_followup_to: Vec<EmailAddress>,
    /// Decoded subject line (RFC 2047 encoded-words resolved).
    pub subject: Option<String>,
    pub message_id: Option<String>,
    pub in_reply_to: Vec<String>,
    pub references: Vec<String>,
    pub date: Option<DateTime<Utc>>,
}

/// The header of one message together with the source it was read from.
#[derive(Debug, Clone)]
pub struct MessageHeader {
    pub envelope: Envelope,
    /// Backing bytes of the whole message (header and body).
    pub source: Arc<MessageSource>,
    /// Offset of the first body byte; the header occupies `0..body_offset`.
    pub body_offset: usize,
}

impl MessageHeader {
    /// Raw header bytes, including the terminating blank line if present.
    pub fn raw_header(&self) -> Result<&[u8]> {
        self.source.slice(0..self.body_offset)
    }

    /// Raw body bytes.
    pub fn raw_body(&self) -> Result<&[u8]> {
        self.source.slice(self.body_offset..self.source.len())
    }

    /// The first `From:` address, if any.
    pub fn sender(&self) -> Option<&EmailAddress> {
        self.envelope.from.first()
    }
}

/// A MIME part carried literally into an outgoing draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftPart {
    /// `type/subtype`, lowercase.
    pub content_type: String,
    pub filename: Option<String>,
    /// Content-Transfer-Encoding of `data`.
    pub encoding: String,
    pub description: Option<String>,
    /// Still-encoded body bytes.
    pub data: Vec<u8>,
}

/// An outgoing message under construction.
///
/// The text body lives in a temporary file next to the draft; `parts` are
/// the attachments that follow it.
#[derive(Debug, Default)]
pub struct Draft {
    pub envelope: Envelope,
    pub parts: Vec<DraftPart>,
}

impl Draft {
    pub fn new() -> Self {
        Self::default()
    }
}
