//! Assembly steps shared by forward and reply: header inclusion and
//! literal copies of parts into the draft.

use tracing::{debug, info};

use super::format::quote_prefix;
use super::render::{copy_header, CopyFlags};
use super::TempBody;
use crate::config::Config;
use crate::error::Result;
use crate::model::attachment::{AttachmentEntry, AttachmentIndex};
use crate::model::mail::{Draft, DraftPart, MessageHeader};

/// Copy the decoded header of `message` into the body.
///
/// With `quote`, every line carries a prefix: `explicit_prefix` if given,
/// otherwise the configured one for `message`. Weeding and reordering
/// follow the `weed` option.
pub fn include_header(
    quote: bool,
    message: &MessageHeader,
    body: &mut TempBody,
    explicit_prefix: Option<&str>,
    config: &Config,
) -> Result<()> {
    let mut flags = CopyFlags::DECODE;
    if config.compose.weed {
        flags |= CopyFlags::WEED | CopyFlags::REORDER;
    }
    let mut ctx = body.context(config).with_flags(flags);
    if quote {
        ctx = ctx.with_prefix(quote_prefix(explicit_prefix, &message.envelope, &config.compose));
    }
    copy_header(message.raw_header()?, &mut ctx)?;
    ctx.write_text("\n")
}

/// A literal copy of one listing entry, still transfer-encoded.
pub fn copy_body(entry: &AttachmentEntry) -> Result<DraftPart> {
    let part = &entry.part;
    let data = entry.source.slice(part.range.body())?.to_vec();
    Ok(DraftPart {
        content_type: part.content_type(),
        filename: part.filename.clone(),
        encoding: part.encoding.clone(),
        description: part.description.clone(),
        data,
    })
}

/// A whole message as a `message/rfc822` attachment.
pub fn attach_message(message: &MessageHeader) -> DraftPart {
    let data = message.source.bytes().to_vec();
    let encoding = if data.is_ascii() { "7bit" } else { "8bit" };
    DraftPart {
        content_type: "message/rfc822".to_string(),
        filename: None,
        encoding: encoding.to_string(),
        description: message.envelope.subject.clone(),
        data,
    }
}

/// Append tagged entries to the draft as literal attachments.
///
/// With `force` every tagged entry is copied; otherwise only the ones that
/// cannot be rendered as text. The first failed copy aborts.
pub fn copy_problematic_attachments(
    draft: &mut Draft,
    index: &AttachmentIndex,
    force: bool,
) -> Result<()> {
    let before = draft.parts.len();
    for (i, entry) in index.tagged() {
        if force || !entry.part.decodable {
            debug!(entry = i, content_type = %entry.part.content_type(), "Attaching part");
            draft.parts.push(copy_body(entry)?);
        }
    }
    info!(
        attached = draft.parts.len() - before,
        force, "Copied attachments into draft"
    );
    Ok(())
}
