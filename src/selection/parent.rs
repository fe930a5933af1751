//! Find the embedded message that encloses the current selection.
//!
//! The parent supplies the header used for attribution, quoting and the
//! forward/reply subject. Without one, callers fall back to the outer
//! message.

use tracing::debug;

use super::count_tagged_descendants;
use crate::model::attachment::AttachmentIndex;

/// Is entry `target` inside the descendant run of entry `i`?
pub fn is_descendant_of(index: &AttachmentIndex, i: usize, target: usize) -> bool {
    index.descendants(i).contains(&target)
}

/// Resolve the parent message of the selection.
///
/// With a focused entry, this is the nearest message entry whose
/// descendant run contains it. Otherwise it is the common parent of the
/// `ntagged` tagged entries (see [`find_common_parent`]).
pub fn find_parent(
    index: &AttachmentIndex,
    focused: Option<usize>,
    ntagged: usize,
) -> Option<usize> {
    let parent = match focused {
        Some(cur) => {
            let mut parent = None;
            for (i, entry) in index.entries.iter().enumerate() {
                if entry.part.is_message() && is_descendant_of(index, i, cur) {
                    parent = Some(i);
                }
                if i == cur {
                    break;
                }
            }
            parent
        }
        None if ntagged > 0 => find_common_parent(index, ntagged),
        None => None,
    };
    debug!(?focused, ntagged, ?parent, "Resolved parent message");
    parent
}

/// Walk backwards from the first tagged entry and return the first message
/// entry whose descendants hold exactly `ntagged` tagged entries.
///
/// This assumes the ancestors of the first tagged entry precede it and that
/// only one of them can match the count. Tagged entries spread across
/// sibling messages yield no parent; a listing where two ancestors match is
/// resolved to the nearer one without further checks.
pub fn find_common_parent(index: &AttachmentIndex, ntagged: usize) -> Option<usize> {
    let first = index
        .entries
        .iter()
        .position(|e| e.part.tagged)
        .unwrap_or(index.len());

    (0..first).rev().find(|&i| {
        index.entries[i].part.is_message() && count_tagged_descendants(index, i) == ntagged
    })
}
