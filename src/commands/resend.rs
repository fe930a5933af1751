//! Reopen embedded messages as new drafts.

use tracing::{info, warn};

use super::{message_of, Session};
use crate::error::{Command, Result, SendError};
use crate::model::attachment::AttachmentIndex;
use crate::model::mail::MessageHeader;
use crate::selection::{require_all_messages, Target};

/// Hand every message in scope to the resend pipeline, one at a time.
///
/// A failure on one message does not stop the others, but turns the
/// outcome into [`SendError::ResendFailed`].
pub fn resend(session: &mut Session<'_>, index: &AttachmentIndex, focused: Option<usize>) -> Result<()> {
    let target = Target::resolve(index, focused)?;
    require_all_messages(index, target.focused(), Command::Resend)?;

    let messages = target
        .entries(index)
        .into_iter()
        .map(|(_, entry)| message_of(entry))
        .collect::<Result<Vec<&MessageHeader>>>()?;

    let mut failed = false;
    for message in &messages {
        info!(source = %message.source.name, "Resending message");
        if let Err(e) = session.transport.resend(message) {
            warn!(source = %message.source.name, error = %e, "Resend failed");
            failed = true;
        }
    }
    if failed {
        return Err(SendError::ResendFailed {
            plural: !target.is_single(index),
        });
    }
    Ok(())
}
