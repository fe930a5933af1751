//! The attachment listing: a MIME tree flattened into depth-annotated entries.
//!
//! Entries are kept in display order. For an entry at index `i` with level
//! `L`, the entries `i+1 ..` with level `> L` (up to the first entry at
//! level `<= L`) are exactly its descendants. Every tree question is
//! answered with a linear scan over that invariant; there are no child or
//! parent pointers.

use std::ops::Range;
use std::sync::Arc;

use super::mail::{MessageHeader, MessageSource};

/// Byte offsets of one MIME entity inside its [`MessageSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PartRange {
    /// Start of the entity's own header block.
    pub header: usize,
    /// Start of the entity's body.
    pub body: usize,
    /// One past the last body byte.
    pub end: usize,
}

impl PartRange {
    /// The whole entity (header and body).
    pub fn entity(&self) -> Range<usize> {
        self.header..self.end
    }

    /// The body only.
    pub fn body(&self) -> Range<usize> {
        self.body..self.end
    }
}

/// One MIME part as shown in the attachment listing.
#[derive(Debug, Clone)]
pub struct BodyPart {
    /// Top-level media type, lowercase (`"text"`, `"message"`, …).
    pub mime_type: String,
    /// Subtype, lowercase (`"plain"`, `"rfc822"`, …).
    pub subtype: String,
    pub filename: Option<String>,
    pub description: Option<String>,
    /// Content-Transfer-Encoding, lowercase (`"7bit"` when absent).
    pub encoding: String,
    /// Location inside the owning entry's source.
    pub range: PartRange,
    /// Can this part be rendered as text?
    pub decodable: bool,
    /// Header of the embedded message, for `message/rfc822` parts.
    pub message: Option<MessageHeader>,
    /// Marked by the user for a bulk action.
    pub tagged: bool,
}

impl BodyPart {
    /// A part with the given type and the default decodability for it.
    pub fn new(mime_type: &str, subtype: &str) -> Self {
        let mime_type = mime_type.to_ascii_lowercase();
        let subtype = subtype.to_ascii_lowercase();
        let decodable = matches!(mime_type.as_str(), "text" | "message");
        Self {
            mime_type,
            subtype,
            filename: None,
            description: None,
            encoding: "7bit".to_string(),
            range: PartRange::default(),
            decodable,
            message: None,
            tagged: false,
        }
    }

    /// `type/subtype`.
    pub fn content_type(&self) -> String {
        format!("{}/{}", self.mime_type, self.subtype)
    }

    /// `true` if the part is an embedded message.
    pub fn is_message(&self) -> bool {
        is_message_type(&self.mime_type, &self.subtype)
    }

    /// Size of the still-encoded body.
    pub fn body_len(&self) -> usize {
        self.range.end.saturating_sub(self.range.body)
    }
}

/// Does this type/subtype pair denote an embedded message?
pub fn is_message_type(mime_type: &str, subtype: &str) -> bool {
    mime_type.eq_ignore_ascii_case("message")
        && (subtype.eq_ignore_ascii_case("rfc822") || subtype.eq_ignore_ascii_case("news"))
}

/// One row of the attachment listing.
#[derive(Debug, Clone)]
pub struct AttachmentEntry {
    pub part: BodyPart,
    /// Depth in the original MIME tree.
    pub level: usize,
    /// Source holding the bytes `part.range` points into.
    pub source: Arc<MessageSource>,
}

/// The flattened attachment listing of one displayed message (or of
/// several messages shown together).
#[derive(Debug, Clone)]
pub struct AttachmentIndex {
    pub entries: Vec<AttachmentEntry>,
    /// Source of the outer message.
    pub root_source: Arc<MessageSource>,
    /// Header of the outer message; `None` for a multi-message view.
    pub root_header: Option<MessageHeader>,
}

impl AttachmentIndex {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<&AttachmentEntry> {
        self.entries.get(i)
    }

    /// Mark or unmark entry `i`. Out-of-range indices are ignored.
    pub fn set_tagged(&mut self, i: usize, tagged: bool) {
        if let Some(entry) = self.entries.get_mut(i) {
            entry.part.tagged = tagged;
        }
    }

    /// Tagged entries in index order, with their positions.
    pub fn tagged(&self) -> impl Iterator<Item = (usize, &AttachmentEntry)> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.part.tagged)
    }

    /// The contiguous run of descendants of entry `i`.
    pub fn descendants(&self, i: usize) -> Range<usize> {
        let Some(entry) = self.entries.get(i) else {
            return i..i;
        };
        let end = self.entries[i + 1..]
            .iter()
            .position(|e| e.level <= entry.level)
            .map_or(self.entries.len(), |p| i + 1 + p);
        i + 1..end
    }
}
