//! Selection scope and the yes/no questions commands ask about it.
//!
//! A command acts either on one focused entry or on every tagged entry,
//! never both. The focused entry always wins when present.

pub mod parent;

use crate::error::{Command, Result, SendError};
use crate::model::attachment::{AttachmentEntry, AttachmentIndex, BodyPart};

/// The resolved scope of one command invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// A single entry, by position in the listing.
    Focused(usize),
    /// All tagged entries.
    Tagged,
}

impl Target {
    /// Resolve the scope, rejecting an empty or out-of-range selection.
    pub fn resolve(index: &AttachmentIndex, focused: Option<usize>) -> Result<Self> {
        match focused {
            Some(i) if i < index.len() => Ok(Self::Focused(i)),
            Some(i) => Err(SendError::NoSuchPart(i)),
            None if count_tagged(index) == 0 => Err(SendError::NothingSelected),
            None => Ok(Self::Tagged),
        }
    }

    /// The focused position, if this is a single-entry scope.
    pub fn focused(self) -> Option<usize> {
        match self {
            Self::Focused(i) => Some(i),
            Self::Tagged => None,
        }
    }

    /// Entries in scope, in index order.
    pub fn entries(self, index: &AttachmentIndex) -> Vec<(usize, &AttachmentEntry)> {
        match self {
            Self::Focused(i) => index.get(i).map(|e| (i, e)).into_iter().collect(),
            Self::Tagged => index.tagged().collect(),
        }
    }

    /// Does the scope consist of exactly one entry?
    pub fn is_single(self, index: &AttachmentIndex) -> bool {
        match self {
            Self::Focused(_) => true,
            Self::Tagged => count_tagged(index) == 1,
        }
    }
}

/// `true` iff the part is an embedded message.
pub fn is_message_part(part: &BodyPart) -> bool {
    part.is_message()
}

/// Probe: is every part in scope an embedded message?
///
/// With nothing focused and nothing tagged this is vacuously true.
pub fn all_messages(index: &AttachmentIndex, focused: Option<usize>) -> bool {
    match focused {
        Some(i) => index.get(i).is_some_and(|e| is_message_part(&e.part)),
        None => index.tagged().all(|(_, e)| is_message_part(&e.part)),
    }
}

/// Like [`all_messages`], but a failure is an error naming `command`.
pub fn require_all_messages(
    index: &AttachmentIndex,
    focused: Option<usize>,
    command: Command,
) -> Result<()> {
    if all_messages(index, focused) {
        Ok(())
    } else {
        Err(SendError::NotMessagePart(command))
    }
}

/// Can every part in scope be rendered as text?
pub fn all_decodable(index: &AttachmentIndex, focused: Option<usize>) -> bool {
    match focused {
        Some(i) => index.get(i).is_some_and(|e| e.part.decodable),
        None => index.tagged().all(|(_, e)| e.part.decodable),
    }
}

/// Number of tagged entries in the whole listing.
pub fn count_tagged(index: &AttachmentIndex) -> usize {
    index.entries.iter().filter(|e| e.part.tagged).count()
}

/// Number of tagged entries strictly inside the descendant run of entry `i`.
pub fn count_tagged_descendants(index: &AttachmentIndex, i: usize) -> usize {
    index.entries[index.descendants(i)]
        .iter()
        .filter(|e| e.part.tagged)
        .count()
}
